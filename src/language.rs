//! Output-language selection for analysis and chat.
//!
//! Every generation prompt carries an explicit language instruction; the
//! chat session is additionally keyed on the selected language and
//! recreated when it changes (see `chat`).

use serde::{Deserialize, Serialize};

/// A supported response language.
///
/// The set mirrors the product's language selector. Unrecognized codes
/// resolve to `English` rather than failing, so a stale or garbled
/// selection can never block analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "bn")]
    Bengali,
    #[serde(rename = "te")]
    Telugu,
    #[serde(rename = "mr")]
    Marathi,
    #[serde(rename = "ta")]
    Tamil,
    #[serde(rename = "gu")]
    Gujarati,
    #[serde(rename = "kn")]
    Kannada,
    #[serde(rename = "pa")]
    Punjabi,
}

impl Language {
    /// All supported languages, in selector order.
    pub const ALL: [Language; 9] = [
        Language::English,
        Language::Hindi,
        Language::Bengali,
        Language::Telugu,
        Language::Marathi,
        Language::Tamil,
        Language::Gujarati,
        Language::Kannada,
        Language::Punjabi,
    ];

    /// Resolve an ISO 639-1 code. Unknown codes default to English.
    pub fn from_code(code: &str) -> Self {
        match code {
            "hi" => Language::Hindi,
            "bn" => Language::Bengali,
            "te" => Language::Telugu,
            "mr" => Language::Marathi,
            "ta" => Language::Tamil,
            "gu" => Language::Gujarati,
            "kn" => Language::Kannada,
            "pa" => Language::Punjabi,
            _ => Language::English,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Bengali => "bn",
            Language::Telugu => "te",
            Language::Marathi => "mr",
            Language::Tamil => "ta",
            Language::Gujarati => "gu",
            Language::Kannada => "kn",
            Language::Punjabi => "pa",
        }
    }

    /// English display name, as embedded in prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Bengali => "Bengali",
            Language::Telugu => "Telugu",
            Language::Marathi => "Marathi",
            Language::Tamil => "Tamil",
            Language::Gujarati => "Gujarati",
            Language::Kannada => "Kannada",
            Language::Punjabi => "Punjabi",
        }
    }

    /// Instruction suffix appended to every analysis prompt.
    pub fn instruction_suffix(&self) -> String {
        format!(" Respond ONLY in {}.", self.display_name())
    }

    /// Localized legal disclaimer, embedded in the chat system
    /// instruction so answers conclude with it in the answer language.
    pub fn disclaimer(&self) -> &'static str {
        match self {
            Language::English => {
                "Disclaimer: Clauselens provides informational summaries and is not a substitute for professional legal advice."
            }
            Language::Hindi => {
                "अस्वीकरण: Clauselens केवल सूचनात्मक सारांश प्रदान करता है और यह पेशेवर कानूनी सलाह का विकल्प नहीं है।"
            }
            Language::Bengali => {
                "দাবিত্যাগ: Clauselens তথ্যমূলক সারসংক্ষেপ প্রদান করে এবং এটি পেশাদার আইনি পরামর্শের বিকল্প নয়।"
            }
            Language::Telugu => {
                "నిరాకరణ: Clauselens సమాచార సారాంశాలను అందిస్తుంది మరియు ఇది వృత్తిపరమైన న్యాయ సలహాకు ప్రత్యామ్నాయం కాదు."
            }
            Language::Marathi => {
                "अस्वीकरण: Clauselens माहितीपूर्ण सारांश प्रदान करते आणि व्यावसायिक कायदेशीर सल्ल्याचा पर्याय नाही."
            }
            Language::Tamil => {
                "பொறுப்புத் துறப்பு: Clauselens தகவல் சுருக்கங்களை வழங்குகிறது மற்றும் இது தொழில்முறை சட்ட ஆலோசனைக்கு மாற்றாகாது."
            }
            Language::Gujarati => {
                "અસ્વીકરણ: Clauselens માહિતીપ્રદ સારાંશ પ્રદાન કરે છે અને તે વ્યાવસાયિક કાનૂની સલાહનો વિકલ્પ નથી."
            }
            Language::Kannada => {
                "ಹಕ್ಕು ನಿರಾಕರಣೆ: Clauselens ಮಾಹಿತಿಪೂರ್ಣ ಸಾರಾಂಶಗಳನ್ನು ಒದಗಿಸುತ್ತದೆ ಮತ್ತು ಇದು ವೃತ್ತಿಪರ ಕಾನೂನು ಸಲಹೆಗೆ ಪರ್ಯಾಯವಲ್ಲ."
            }
            Language::Punjabi => {
                "ਬੇਦਾਅਵਾ: Clauselens ਸਿਰਫ ਜਾਣਕਾਰੀ ਭਰਪੂਰ ਸੰਖੇਪ ਪ੍ਰਦਾਨ ਕਰਦਾ ਹੈ ਅਤੇ ਇਹ ਪੇਸ਼ੇਵਰ ਕਾਨੂੰਨੀ ਸਲਾਹ ਦਾ ਬਦਲ ਨਹੀਂ ਹੈ।"
            }
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

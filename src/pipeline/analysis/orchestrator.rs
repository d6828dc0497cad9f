//! Document analysis: three concurrent model calls, settled independently.
//!
//! The summary, risk scan and simplified explanation are fired together
//! and every outcome is inspected; one failing call never aborts the
//! others. Summary and risks are critical, the simplified explanation is
//! best-effort.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, info_span, warn, Instrument};

use super::types::{parse_risks, risk_response_schema, AnalysisResult};
use crate::gemini::GeminiError;
use crate::language::Language;
use crate::pipeline::extraction::NormalizedText;

/// Text-generation seam for the analysis calls.
#[async_trait]
pub trait LlmGenerate: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError>;

    /// Generation constrained to JSON matching `schema`.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<String, GeminiError>;
}

fn summary_prompt(text: &str, language: Language) -> String {
    format!(
        "You are a legal expert. Summarize the following legal text in plain, \
         easy-to-understand language. Use markdown.{} Legal Text: \n\n{}",
        language.instruction_suffix(),
        text
    )
}

fn risks_prompt(text: &str, language: Language) -> String {
    format!(
        "You are an AI legal assistant. Analyze the following legal text for risks. \
         For each risk, identify the clause, explain the risk, and provide a concrete, \
         actionable suggestion.{} Legal Text: \n\n{}",
        language.instruction_suffix(),
        text
    )
}

fn eli15_prompt(text: &str, language: Language) -> String {
    format!(
        "Explain the following legal text like I'm 15 years old. \
         Use simple words and analogies.{} Legal Text: \n\n{}",
        language.instruction_suffix(),
        text
    )
}

pub struct AnalysisOrchestrator {
    llm: Arc<dyn LlmGenerate>,
}

impl AnalysisOrchestrator {
    pub fn new(llm: Arc<dyn LlmGenerate>) -> Self {
        Self { llm }
    }

    /// Run all three analysis calls over the document text.
    ///
    /// Never fails: every failure is folded into the result. `degraded`
    /// is set when the summary or risks outcome is unusable.
    pub async fn analyze(&self, text: &NormalizedText, language: Language) -> AnalysisResult {
        let span = info_span!(
            "analyze",
            language = %language,
            chars = text.as_str().len(),
        );
        async {
            let start = Instant::now();

            let summary_prompt = summary_prompt(text.as_str(), language);
            let risks_prompt = risks_prompt(text.as_str(), language);
            let eli15_prompt = eli15_prompt(text.as_str(), language);

            let (summary_res, risks_res, eli15_res) = tokio::join!(
                self.llm.generate(&summary_prompt),
                self.llm
                    .generate_structured(&risks_prompt, risk_response_schema()),
                self.llm.generate(&eli15_prompt),
            );

            let mut result = AnalysisResult::default();

            match summary_res {
                Ok(text) if !text.is_empty() => result.summary = Some(text),
                Ok(_) => {
                    warn!("summary call returned empty text");
                    result.degraded = true;
                }
                Err(e) => {
                    warn!(error = %e, "summary call failed");
                    result.degraded = true;
                }
            }

            // Best-effort: a missing simplified explanation is not worth
            // flagging the whole analysis for.
            match eli15_res {
                Ok(text) if !text.is_empty() => result.eli15 = Some(text),
                Ok(_) => warn!("simplified explanation returned empty text"),
                Err(e) => warn!(error = %e, "simplified explanation failed"),
            }

            match risks_res {
                Ok(text) if !text.is_empty() => match parse_risks(&text) {
                    Ok(risks) => result.risks = risks,
                    Err(e) => {
                        let snippet: String = text.chars().take(200).collect();
                        warn!(error = %e, response = %snippet, "risks response was not valid JSON");
                        result.degraded = true;
                    }
                },
                Ok(_) => {
                    warn!("risks call returned empty text");
                    result.degraded = true;
                }
                Err(e) => {
                    warn!(error = %e, "risks call failed");
                    result.degraded = true;
                }
            }

            info!(
                summary = result.summary.is_some(),
                risks = result.risks.len(),
                eli15 = result.eli15.is_some(),
                degraded = result.degraded,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "analysis settled"
            );
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    enum Reply {
        Text(&'static str),
        Fail,
    }

    impl Reply {
        fn to_result(&self) -> Result<String, GeminiError> {
            match self {
                Reply::Text(s) => Ok(s.to_string()),
                Reply::Fail => Err(GeminiError::Api {
                    code: 500,
                    message: "mock failure".to_string(),
                }),
            }
        }
    }

    struct MockLlm {
        summary: Reply,
        risks: Reply,
        eli15: Reply,
        calls: Mutex<Vec<(&'static str, String)>>,
    }

    impl MockLlm {
        fn new(summary: Reply, risks: Reply, eli15: Reply) -> Arc<Self> {
            Arc::new(Self {
                summary,
                risks,
                eli15,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_kinds(&self) -> Vec<&'static str> {
            let mut kinds: Vec<_> = self.calls.lock().unwrap().iter().map(|c| c.0).collect();
            kinds.sort_unstable();
            kinds
        }

        fn prompt_for(&self, kind: &str) -> String {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.0 == kind)
                .map(|c| c.1.clone())
                .expect("call not recorded")
        }
    }

    #[async_trait]
    impl LlmGenerate for MockLlm {
        async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
            if prompt.starts_with("You are a legal expert.") {
                self.calls
                    .lock()
                    .unwrap()
                    .push(("summary", prompt.to_string()));
                self.summary.to_result()
            } else {
                self.calls
                    .lock()
                    .unwrap()
                    .push(("eli15", prompt.to_string()));
                self.eli15.to_result()
            }
        }

        async fn generate_structured(
            &self,
            prompt: &str,
            schema: serde_json::Value,
        ) -> Result<String, GeminiError> {
            assert_eq!(schema, risk_response_schema());
            self.calls
                .lock()
                .unwrap()
                .push(("risks", prompt.to_string()));
            self.risks.to_result()
        }
    }

    fn doc_text() -> NormalizedText {
        NormalizedText::new("The tenant shall indemnify the landlord without limit.".to_string())
            .unwrap()
    }

    const RISKS_JSON: &str = r#"{"risks": [{"clause": "Indemnity", "explanation": "Unlimited exposure.", "suggestion": "Cap the indemnity."}]}"#;

    #[tokio::test]
    async fn successful_analysis_populates_all_fields() {
        let llm = MockLlm::new(
            Reply::Text("## Summary"),
            Reply::Text(RISKS_JSON),
            Reply::Text("It's like lending your bike."),
        );
        let orchestrator = AnalysisOrchestrator::new(llm.clone());

        let result = orchestrator.analyze(&doc_text(), Language::English).await;

        assert_eq!(result.summary.as_deref(), Some("## Summary"));
        assert_eq!(result.eli15.as_deref(), Some("It's like lending your bike."));
        assert_eq!(result.risks.len(), 1);
        assert_eq!(result.risks[0].clause, "Indemnity");
        assert!(!result.degraded);
        assert_eq!(llm.call_kinds(), vec!["eli15", "risks", "summary"]);
    }

    #[tokio::test]
    async fn prompts_carry_language_and_document_text() {
        let llm = MockLlm::new(
            Reply::Text("s"),
            Reply::Text("{}"),
            Reply::Text("e"),
        );
        let orchestrator = AnalysisOrchestrator::new(llm.clone());

        orchestrator.analyze(&doc_text(), Language::Hindi).await;

        for kind in ["summary", "risks", "eli15"] {
            let prompt = llm.prompt_for(kind);
            assert!(prompt.contains(" Respond ONLY in Hindi."), "{kind}: {prompt}");
            assert!(
                prompt.ends_with("The tenant shall indemnify the landlord without limit."),
                "{kind} prompt must end with the document text"
            );
            assert!(prompt.contains("Legal Text: \n\n"), "{kind}: {prompt}");
        }
    }

    #[tokio::test]
    async fn empty_risks_envelope_is_a_clean_result() {
        let llm = MockLlm::new(Reply::Text("s"), Reply::Text("{}"), Reply::Text("e"));
        let orchestrator = AnalysisOrchestrator::new(llm);

        let result = orchestrator.analyze(&doc_text(), Language::English).await;

        assert!(result.risks.is_empty());
        assert!(!result.degraded, "missing risks key is not a failure");
    }

    #[tokio::test]
    async fn summary_failure_degrades_but_other_calls_still_land() {
        let llm = MockLlm::new(Reply::Fail, Reply::Text(RISKS_JSON), Reply::Text("e"));
        let orchestrator = AnalysisOrchestrator::new(llm.clone());

        let result = orchestrator.analyze(&doc_text(), Language::English).await;

        assert!(result.degraded);
        assert!(result.summary.is_none());
        assert_eq!(result.risks.len(), 1);
        assert_eq!(result.eli15.as_deref(), Some("e"));
        assert_eq!(llm.call_kinds(), vec!["eli15", "risks", "summary"]);
    }

    #[tokio::test]
    async fn eli15_failure_does_not_degrade() {
        let llm = MockLlm::new(Reply::Text("s"), Reply::Text("{}"), Reply::Fail);
        let orchestrator = AnalysisOrchestrator::new(llm);

        let result = orchestrator.analyze(&doc_text(), Language::English).await;

        assert!(result.eli15.is_none());
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn malformed_risks_json_degrades_with_empty_risks() {
        // Two of three fail at once: the run still settles with
        // whatever succeeded.
        let llm = MockLlm::new(
            Reply::Text("s"),
            Reply::Text("Here are the risks I found:"),
            Reply::Fail,
        );
        let orchestrator = AnalysisOrchestrator::new(llm);

        let result = orchestrator.analyze(&doc_text(), Language::English).await;

        assert!(result.risks.is_empty());
        assert!(result.degraded);
        assert_eq!(result.summary.as_deref(), Some("s"), "summary survives");
        assert!(result.eli15.is_none());
    }

    #[tokio::test]
    async fn empty_summary_text_degrades() {
        let llm = MockLlm::new(Reply::Text(""), Reply::Text("{}"), Reply::Text("e"));
        let orchestrator = AnalysisOrchestrator::new(llm);

        let result = orchestrator.analyze(&doc_text(), Language::English).await;

        assert!(result.summary.is_none());
        assert!(result.degraded);
    }

    #[tokio::test]
    async fn total_failure_still_settles_every_call() {
        let llm = MockLlm::new(Reply::Fail, Reply::Fail, Reply::Fail);
        let orchestrator = AnalysisOrchestrator::new(llm.clone());

        let result = orchestrator.analyze(&doc_text(), Language::English).await;

        assert_eq!(llm.call_kinds(), vec!["eli15", "risks", "summary"]);
        assert!(result.degraded);
        assert_eq!(result, AnalysisResult {
            summary: None,
            eli15: None,
            risks: vec![],
            degraded: true,
        });
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ImportError;

/// Document formats accepted for analysis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaType {
    PlainText,
    Pdf,
    Png,
    Jpeg,
    WebP,
    Docx,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
            Self::Docx => "docx",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "text/plain" => Some(Self::PlainText),
            "application/pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg | Self::WebP)
    }
}

pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024; // 100MB

/// Detect a format from magic bytes. Magic bytes are trusted over the
/// declared MIME type, which callers can get wrong.
pub fn detect_format(bytes: &[u8]) -> Option<MediaType> {
    match bytes {
        // PDF: starts with %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => Some(MediaType::Pdf),
        // JPEG: starts with FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some(MediaType::Jpeg),
        // PNG: starts with 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some(MediaType::Png),
        // WebP: RIFF container with WEBP fourcc at offset 8
        [0x52, 0x49, 0x46, 0x46, ..] if bytes.len() >= 12 && &bytes[8..12] == b"WEBP" => {
            Some(MediaType::WebP)
        }
        // DOCX: a ZIP local-file header. Whether the archive really holds
        // word/document.xml is checked at extraction time.
        [0x50, 0x4B, 0x03, 0x04, ..] => Some(MediaType::Docx),
        _ if is_likely_text(bytes) => Some(MediaType::PlainText),
        _ => None,
    }
}

/// Check that the content of `bytes` agrees with the declared format.
///
/// A mismatch is rejected as [`ImportError::UnsupportedFormat`]; the
/// declared/detected pair is logged, not surfaced. Plain text accepts
/// empty input; emptiness is reported at extraction time so the caller
/// sees the extraction-specific message.
pub fn verify_content(declared: MediaType, bytes: &[u8]) -> Result<(), ImportError> {
    let ok = match declared {
        MediaType::PlainText => bytes.is_empty() || is_likely_text(bytes),
        expected => detect_format(bytes) == Some(expected),
    };
    if ok {
        Ok(())
    } else {
        warn!(
            declared = declared.as_str(),
            detected = detect_format(bytes).map(|f| f.as_str()).unwrap_or("unknown"),
            "file content does not match its declared type"
        );
        Err(ImportError::UnsupportedFormat {
            declared: declared.mime().to_string(),
        })
    }
}

/// Check if bytes look like plain text (valid UTF-8, mostly printable).
/// Only the first 4KB are inspected.
fn is_likely_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let sample = &bytes[..bytes.len().min(4096)];
    let text = match std::str::from_utf8(sample) {
        Ok(t) => t,
        // A multi-byte character cut off by the sample window is fine.
        Err(e) if sample.len() < bytes.len() && e.error_len().is_none() => {
            std::str::from_utf8(&sample[..e.valid_up_to()]).unwrap_or("")
        }
        Err(_) => return false,
    };

    // At least 80% printable characters (or whitespace). Counted in
    // chars, not bytes, so non-Latin scripts are not penalized.
    let total = text.chars().count().max(1);
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    printable as f64 / total as f64 > 0.80
}

/// Sanitize a filename — strip path components, limit length
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_jpeg_from_magic_bytes() {
        assert_eq!(
            detect_format(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            Some(MediaType::Jpeg)
        );
    }

    #[test]
    fn detect_png_from_magic_bytes() {
        assert_eq!(
            detect_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            Some(MediaType::Png)
        );
    }

    #[test]
    fn detect_webp_requires_fourcc() {
        let mut webp = b"RIFF".to_vec();
        webp.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        webp.extend_from_slice(b"WEBPVP8 ");
        assert_eq!(detect_format(&webp), Some(MediaType::WebP));

        let mut wav = b"RIFF".to_vec();
        wav.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        wav.extend_from_slice(b"WAVEfmt ");
        assert_ne!(detect_format(&wav), Some(MediaType::WebP));
    }

    #[test]
    fn detect_pdf_and_docx() {
        assert_eq!(detect_format(b"%PDF-1.4 content"), Some(MediaType::Pdf));
        assert_eq!(
            detect_format(&[0x50, 0x4B, 0x03, 0x04, 0x14, 0x00]),
            Some(MediaType::Docx)
        );
    }

    #[test]
    fn detect_text_including_non_latin_scripts() {
        assert_eq!(
            detect_format("This agreement is entered into on 2024-01-15.".as_bytes()),
            Some(MediaType::PlainText)
        );
        // Devanagari is multi-byte UTF-8 and must still count as text.
        assert_eq!(
            detect_format("यह अनुबंध दोनों पक्षों के बीच है।".as_bytes()),
            Some(MediaType::PlainText)
        );
    }

    #[test]
    fn detect_binary_as_unknown() {
        assert_eq!(detect_format(&[0x4D, 0x5A, 0x90, 0x00, 0x03, 0x00]), None);
        assert_eq!(detect_format(&[]), None);
    }

    #[test]
    fn verify_accepts_matching_content() {
        assert!(verify_content(MediaType::Jpeg, &[0xFF, 0xD8, 0xFF, 0xE0]).is_ok());
        assert!(verify_content(MediaType::PlainText, b"hello contract").is_ok());
    }

    #[test]
    fn verify_rejects_mismatched_content() {
        // JPEG bytes declared as PDF
        let err = verify_content(MediaType::Pdf, &[0xFF, 0xD8, 0xFF, 0xE0]).unwrap_err();
        assert!(matches!(
            err,
            ImportError::UnsupportedFormat { ref declared } if declared == "application/pdf"
        ));
    }

    #[test]
    fn verify_allows_empty_plain_text() {
        // Emptiness is an extraction-level concern, not a mismatch.
        assert!(verify_content(MediaType::PlainText, &[]).is_ok());
    }

    #[test]
    fn mime_round_trip() {
        for media_type in [
            MediaType::PlainText,
            MediaType::Pdf,
            MediaType::Png,
            MediaType::Jpeg,
            MediaType::WebP,
            MediaType::Docx,
        ] {
            assert_eq!(MediaType::from_mime(media_type.mime()), Some(media_type));
        }
        assert_eq!(MediaType::from_mime("application/zip"), None);
    }

    #[test]
    fn media_type_categories() {
        assert!(MediaType::Png.is_image());
        assert!(MediaType::WebP.is_image());
        assert!(!MediaType::Pdf.is_image());
        assert!(!MediaType::Docx.is_image());
    }

    #[test]
    fn sanitize_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("normal_file.pdf"), "normal_file.pdf");
        assert_eq!(sanitize_filename(""), "document");
        assert_eq!(sanitize_filename("file\0name.pdf"), "filename.pdf");
    }

    #[test]
    fn sanitize_preserves_normal_names() {
        assert_eq!(sanitize_filename("rental_agreement_2024.pdf"), "rental_agreement_2024.pdf");
        assert_eq!(sanitize_filename("lease (signed).jpg"), "lease (signed).jpg");
    }
}

//! Plain-text extraction: strict UTF-8 decode, nothing more.

use super::ExtractionError;

pub fn extract_plain_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ExtractionError::EncodingError(format!("Invalid UTF-8 in text file: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf8() {
        let text = extract_plain_text("Clause 4: दंड खंड".as_bytes()).unwrap();
        assert_eq!(text, "Clause 4: दंड खंड");
    }

    #[test]
    fn rejects_invalid_utf8() {
        // Import sniffing samples only a prefix; a bad byte deep in the
        // file still has to be caught here.
        let mut bytes = b"valid prefix ".to_vec();
        bytes.push(0xFF);
        let err = extract_plain_text(&bytes).unwrap_err();
        assert!(matches!(err, ExtractionError::EncodingError(_)));
    }

    #[test]
    fn empty_input_is_empty_string() {
        // Emptiness is judged by the caller against the trimmed text.
        assert_eq!(extract_plain_text(&[]).unwrap(), "");
    }
}

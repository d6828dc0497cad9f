//! Analysis result types and the structured risk schema.

use serde::{Deserialize, Serialize};

/// Notice shown when a critical analysis call failed.
pub const ANALYSIS_ERROR_NOTICE: &str = "An error occurred during analysis. Please try again.";

/// One identified risk in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskItem {
    pub clause: String,
    pub explanation: String,
    pub suggestion: String,
}

/// The envelope the model is asked to produce for the risks call.
///
/// `risks` is defaulted: a well-formed response without the key means
/// "no risks found", which is a success, not a failure.
#[derive(Debug, Deserialize)]
pub struct RiskEnvelope {
    #[serde(default)]
    pub risks: Vec<RiskItem>,
}

/// Combined output of the three analysis calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: Option<String>,
    pub eli15: Option<String>,
    pub risks: Vec<RiskItem>,
    /// True when the summary or risks call failed. The ELI15 view is
    /// best-effort and never sets this.
    pub degraded: bool,
}

/// Parse the risks response. The raw text is trimmed first because the
/// model occasionally pads the JSON with whitespace.
pub fn parse_risks(raw: &str) -> Result<Vec<RiskItem>, serde_json::Error> {
    let envelope: RiskEnvelope = serde_json::from_str(raw.trim())?;
    Ok(envelope.risks)
}

/// Response schema constraining the risks call to the envelope shape.
/// Type names follow the generateContent schema dialect (uppercase).
pub fn risk_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "risks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "clause": {
                            "type": "STRING",
                            "description": "The specific risky clause."
                        },
                        "explanation": {
                            "type": "STRING",
                            "description": "Why this is a risk."
                        },
                        "suggestion": {
                            "type": "STRING",
                            "description": "An actionable suggestion for the user."
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_envelope() {
        let raw = r#"{"risks": [{"clause": "Clause 7", "explanation": "Unlimited liability.", "suggestion": "Negotiate a cap."}]}"#;
        let risks = parse_risks(raw).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].clause, "Clause 7");
        assert_eq!(risks[0].suggestion, "Negotiate a cap.");
    }

    #[test]
    fn missing_risks_key_means_no_risks() {
        let risks = parse_risks("{}").unwrap();
        assert!(risks.is_empty());
    }

    #[test]
    fn padded_json_is_tolerated() {
        let risks = parse_risks("\n  {\"risks\": []}  \n").unwrap();
        assert!(risks.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_risks("I found three risks:").is_err());
        assert!(parse_risks("").is_err());
    }

    #[test]
    fn item_missing_a_field_is_an_error() {
        // Items are not defaulted; a partial item means the response
        // cannot be trusted.
        let raw = r#"{"risks": [{"clause": "Clause 2"}]}"#;
        assert!(parse_risks(raw).is_err());
    }

    #[test]
    fn schema_describes_the_envelope() {
        let schema = risk_response_schema();
        assert_eq!(schema["type"], "OBJECT");
        let item = &schema["properties"]["risks"]["items"];
        assert_eq!(item["type"], "OBJECT");
        for field in ["clause", "explanation", "suggestion"] {
            assert_eq!(item["properties"][field]["type"], "STRING");
        }
    }

    #[test]
    fn default_result_is_clean() {
        let result = AnalysisResult::default();
        assert!(result.summary.is_none());
        assert!(result.eli15.is_none());
        assert!(result.risks.is_empty());
        assert!(!result.degraded);
    }
}

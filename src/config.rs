//! Application constants and environment-backed configuration.

/// Application-level constants
pub const APP_NAME: &str = "Clauselens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the Gemini API key.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable overriding the generation API base URL.
pub const ENV_API_BASE: &str = "CLAUSELENS_API_BASE";
/// Environment variable overriding the generation model id.
pub const ENV_MODEL: &str = "CLAUSELENS_MODEL";

/// Model used for every generation call: extraction, analysis, and chat.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini generateContent API base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Resolve the model id, honoring the env override.
pub fn model_id() -> String {
    std::env::var(ENV_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string())
}

/// Resolve the API base URL, honoring the env override.
pub fn api_base() -> String {
    std::env::var(ENV_API_BASE).unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
}

/// Default tracing filter when RUST_LOG is unset.
/// Quiet dependencies, info-level for our own modules.
pub fn default_log_filter() -> String {
    format!("warn,{}=info", env!("CARGO_PKG_NAME"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_clauselens() {
        assert_eq!(APP_NAME, "Clauselens");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn default_model_is_flash() {
        assert_eq!(DEFAULT_MODEL, "gemini-2.5-flash");
    }

    #[test]
    fn default_log_filter_scopes_crate_to_info() {
        let filter = default_log_filter();
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("clauselens=info"));
    }

    #[test]
    fn api_base_points_at_models_endpoint() {
        assert!(DEFAULT_API_BASE.ends_with("/models"));
    }
}

//! Clauselens: legal document analysis and grounded Q&A.
//!
//! Import a document (`pipeline::import`), run it through extraction and
//! analysis (`pipeline::processor`), then ask questions about it
//! (`core_state::CoreState::ask`). All model calls go through the Gemini
//! client in `gemini`; output language is selected via `language`.

pub mod chat;
pub mod config;
pub mod core_state;
pub mod gemini;
pub mod language;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Initialize tracing from `RUST_LOG`, falling back to the built-in
/// filter. Call once at startup; embedding applications that install
/// their own subscriber should skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}

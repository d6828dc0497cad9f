pub mod orchestrator;
pub mod types;

pub use orchestrator::*;
pub use types::*;

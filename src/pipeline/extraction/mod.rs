pub mod docx;
pub mod image;
pub mod orchestrator;
pub mod pdf;
pub mod text;
pub mod types;

pub use docx::*;
pub use image::*;
pub use orchestrator::*;
pub use pdf::*;
pub use text::*;
pub use types::*;

use thiserror::Error;

use crate::gemini::GeminiError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Could not extract any text from the document.")]
    EmptyExtraction,

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("Document container error: {0}")]
    Container(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDF is password-protected — please decrypt it first")]
    PdfEncrypted,

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Vision model error: {0}")]
    Vision(#[from] GeminiError),
}

pub mod document;
pub mod format;

pub use document::*;
pub use format::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type. Please upload a .txt, .docx, .pdf, .jpg, .jpeg, .png, or .webp file.")]
    UnsupportedFormat { declared: String },

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },
}

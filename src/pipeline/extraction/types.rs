//! Shared types and seams for the extraction stage.

use async_trait::async_trait;

use super::ExtractionError;

/// Extracted document text, guaranteed non-blank.
///
/// The text is stored exactly as extracted; the only guarantee is that its
/// trimmed form is non-empty, so downstream prompts never receive a blank
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(text: String) -> Result<Self, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyExtraction);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// An image attachment for a vision call.
#[derive(Clone)]
pub struct InlineImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Vision-capable model client that turns document images into text.
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    async fn extract_text(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> Result<String, ExtractionError>;
}

/// Renders PDF pages to PNG images.
///
/// Synchronous: rendering is CPU-bound and short enough to run inline on
/// the calling task.
pub trait PdfPageRenderer: Send + Sync {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// Progress events emitted while a document is being extracted, in the
/// order a UI would display them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionProgress {
    /// A single-shot format (text, image, OOXML) is being read.
    ExtractingText { file: String },
    /// A PDF page is being rendered (1-based out of the total).
    RenderingPage { page: usize, page_count: usize },
    /// All rendered pages were handed to the vision model.
    SubmittingPages { page_count: usize },
}

/// Receives extraction progress. Implementations must be cheap; events
/// fire from inside the extraction loop.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: ExtractionProgress);
}

/// Discards all progress events.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&self, _progress: ExtractionProgress) {}
}

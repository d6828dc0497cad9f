//! Extraction orchestration: one entry point per document, dispatching on
//! the verified media type.

use std::sync::Arc;

use tracing::{info_span, Instrument};

use super::docx::extract_docx_text;
use super::image::extract_image_text;
use super::pdf::{extract_pdf_text, PdfiumRenderer};
use super::text::extract_plain_text;
use super::types::{
    ExtractionProgress, NormalizedText, NullProgress, PdfPageRenderer, ProgressSink,
    VisionExtractor,
};
use super::ExtractionError;
use crate::pipeline::import::{Document, MediaType};

/// Turns a validated [`Document`] into [`NormalizedText`].
///
/// Uses trait objects for the vision model and PDF renderer, enabling
/// dependency injection in tests.
pub struct DocumentExtractor {
    vision: Arc<dyn VisionExtractor>,
    renderer: Arc<dyn PdfPageRenderer>,
    progress: Arc<dyn ProgressSink>,
}

impl DocumentExtractor {
    /// Build with the default PDFium renderer. Fails fast when the PDFium
    /// library cannot be loaded, before any document is accepted.
    pub fn new(vision: Arc<dyn VisionExtractor>) -> Result<Self, ExtractionError> {
        Ok(Self {
            vision,
            renderer: Arc::new(PdfiumRenderer::new()?),
            progress: Arc::new(NullProgress),
        })
    }

    /// Build with an explicit PDF renderer.
    pub fn with_renderer(
        vision: Arc<dyn VisionExtractor>,
        renderer: Arc<dyn PdfPageRenderer>,
    ) -> Self {
        Self {
            vision,
            renderer,
            progress: Arc::new(NullProgress),
        }
    }

    /// Attach a progress sink for extraction events.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Extract text from a document. Local formats (.txt, .docx) never
    /// leave the machine; PDFs and images go through the vision model.
    pub async fn extract(&self, document: &Document) -> Result<NormalizedText, ExtractionError> {
        let span = info_span!(
            "extract",
            document = %document.name(),
            media_type = document.media_type().as_str(),
        );
        async {
            // PDFs report per-page progress from the render loop instead.
            if document.media_type() != MediaType::Pdf {
                self.progress.on_progress(ExtractionProgress::ExtractingText {
                    file: document.name().to_string(),
                });
            }

            let text = match document.media_type() {
                MediaType::PlainText => extract_plain_text(document.bytes())?,
                MediaType::Docx => extract_docx_text(document.bytes())?,
                MediaType::Pdf => {
                    extract_pdf_text(document, &self.renderer, &self.vision, &self.progress)
                        .await?
                }
                MediaType::Png | MediaType::Jpeg | MediaType::WebP => {
                    extract_image_text(document, &self.vision).await?
                }
            };

            NormalizedText::new(text)
        }
        .instrument(span)
        .await
    }
}

//! Single-image text extraction via the vision model.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::types::{InlineImage, VisionExtractor};
use super::ExtractionError;
use crate::pipeline::import::Document;

/// Instruction sent along with a photographed or scanned document.
pub const IMAGE_EXTRACTION_PROMPT: &str = "Extract all text from this document image. \
Preserve formatting like paragraphs and line breaks where possible.";

pub async fn extract_image_text(
    document: &Document,
    vision: &Arc<dyn VisionExtractor>,
) -> Result<String, ExtractionError> {
    let start = Instant::now();
    let image = InlineImage {
        mime_type: document.media_type().mime(),
        bytes: document.bytes().to_vec(),
    };

    let text = vision
        .extract_text(IMAGE_EXTRACTION_PROMPT, &[image])
        .await?;

    info!(
        document = %document.name(),
        chars = text.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "image text extraction complete"
    );
    Ok(text)
}

//! Document run orchestrator.
//!
//! Single entry point that drives a full run against shared state:
//! import → extract → analyze, with every result committed under the
//! run's epoch so a newer run supersedes a slower older one.
//!
//! Uses trait-based DI underneath (VisionExtractor, LlmGenerate) so the
//! pipeline remains fully testable with mock implementations.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::core_state::{ActiveDocument, CoreState};
use crate::gemini::GeminiClient;
use crate::pipeline::analysis::{AnalysisOrchestrator, LlmGenerate};
use crate::pipeline::extraction::{
    DocumentExtractor, ExtractionError, ProgressSink, VisionExtractor,
};
use crate::pipeline::import::Document;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs documents through extraction and analysis.
///
/// A run never returns an error: failures become user-facing notices on
/// the [`CoreState`], mirroring how results are committed there. The
/// returned epoch identifies the run in state and logs.
pub struct DocumentPipeline {
    extractor: DocumentExtractor,
    analyzer: AnalysisOrchestrator,
}

impl DocumentPipeline {
    /// Build the production pipeline on one Gemini client.
    ///
    /// Fails only when the PDF renderer cannot be initialized, which is
    /// checked eagerly so a missing PDFium library surfaces at startup
    /// rather than on the first PDF.
    pub fn new(client: GeminiClient) -> Result<Self, ExtractionError> {
        let vision: Arc<dyn VisionExtractor> = Arc::new(client.clone());
        let llm: Arc<dyn LlmGenerate> = Arc::new(client);
        Ok(Self {
            extractor: DocumentExtractor::new(vision)?,
            analyzer: AnalysisOrchestrator::new(llm),
        })
    }

    /// Assemble from pre-built stages. Test seam.
    pub fn with_parts(extractor: DocumentExtractor, analyzer: AnalysisOrchestrator) -> Self {
        Self {
            extractor,
            analyzer,
        }
    }

    /// Report extraction progress (page rendering etc.) to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.extractor = self.extractor.with_progress(progress);
        self
    }

    /// Run an already-imported document.
    ///
    /// 1. Start a new run (clears previous results and conversation)
    /// 2. Extract text — on failure, post the error as a notice and stop
    /// 3. Commit the document, making Q&A available
    /// 4. Analyze and commit the settled result
    ///
    /// Stale commits are dropped by the state; the run then just ends.
    pub async fn run(&self, state: &CoreState, document: Document) -> u64 {
        let epoch = state.begin_run().await;
        let language = state.language();
        let span = info_span!("run", epoch, document = %document.name());

        async move {
            let text = match self.extractor.extract(&document).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "extraction failed");
                    state.fail_run(epoch, e.to_string());
                    return epoch;
                }
            };

            let active = ActiveDocument {
                id: document.id(),
                name: document.name().to_string(),
                text: text.clone(),
            };
            if !state.commit_document(epoch, active) {
                info!("superseded before document commit");
                return epoch;
            }

            let analysis = self.analyzer.analyze(&text, language).await;
            if !state.commit_analysis(epoch, analysis) {
                info!("superseded before analysis commit");
            }
            epoch
        }
        .instrument(span)
        .await
    }

    /// Import a file from disk and run it.
    ///
    /// An import failure still starts a run: previous results are cleared
    /// and the import error is posted as the notice, so the caller sees a
    /// clean state with one message rather than stale results.
    pub async fn run_path(&self, state: &CoreState, path: &Path) -> u64 {
        match Document::from_path(path) {
            Ok(document) => self.run(state, document).await,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "import failed");
                let epoch = state.begin_run().await;
                state.fail_run(epoch, e.to_string());
                epoch
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::gemini::GeminiError;
    use crate::pipeline::analysis::{risk_response_schema, ANALYSIS_ERROR_NOTICE};
    use crate::pipeline::extraction::pdf::MockPdfPageRenderer;
    use crate::pipeline::extraction::PdfPageRenderer;

    struct StubVision;

    #[async_trait]
    impl VisionExtractor for StubVision {
        async fn extract_text(
            &self,
            _prompt: &str,
            _images: &[crate::pipeline::extraction::InlineImage],
        ) -> Result<String, ExtractionError> {
            Ok("scanned text".to_string())
        }
    }

    struct MockLlm {
        risks_reply: &'static str,
        generate_calls: AtomicUsize,
    }

    impl MockLlm {
        fn new() -> Self {
            Self {
                risks_reply: r#"{"risks": []}"#,
                generate_calls: AtomicUsize::new(0),
            }
        }

        fn with_risks_reply(risks_reply: &'static str) -> Self {
            Self {
                risks_reply,
                generate_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmGenerate for MockLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, GeminiError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            Ok("Looks fine.".to_string())
        }

        async fn generate_structured(
            &self,
            _prompt: &str,
            schema: serde_json::Value,
        ) -> Result<String, GeminiError> {
            assert_eq!(schema, risk_response_schema());
            Ok(self.risks_reply.to_string())
        }
    }

    fn pipeline_with(llm: Arc<MockLlm>) -> DocumentPipeline {
        let renderer: Arc<dyn PdfPageRenderer> = Arc::new(MockPdfPageRenderer::new(1));
        let extractor = DocumentExtractor::with_renderer(Arc::new(StubVision), renderer);
        DocumentPipeline::with_parts(extractor, AnalysisOrchestrator::new(llm))
    }

    fn text_document(name: &str, body: &str) -> Document {
        Document::new(name, "text/plain", body.as_bytes().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn happy_path_commits_document_and_analysis() {
        let llm = Arc::new(MockLlm::new());
        let pipeline = pipeline_with(llm.clone());
        let state = CoreState::new();

        let epoch = pipeline
            .run(&state, text_document("lease.txt", "The tenant pays rent."))
            .await;

        assert_eq!(epoch, 1);
        let document = state.document().unwrap();
        assert_eq!(document.name, "lease.txt");
        assert_eq!(document.text.as_str(), "The tenant pays rent.");

        let analysis = state.analysis().unwrap();
        assert!(!analysis.degraded);
        assert_eq!(analysis.summary.as_deref(), Some("Looks fine."));
        assert!(state.notice().is_none());
        assert_eq!(llm.generate_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_extraction_posts_notice_and_skips_analysis() {
        let llm = Arc::new(MockLlm::new());
        let pipeline = pipeline_with(llm.clone());
        let state = CoreState::new();

        pipeline.run(&state, text_document("empty.txt", "")).await;

        assert_eq!(
            state.notice().as_deref(),
            Some("Could not extract any text from the document.")
        );
        assert!(state.document().is_none());
        assert!(state.analysis().is_none());
        assert_eq!(llm.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn degraded_analysis_posts_notice() {
        let llm = Arc::new(MockLlm::with_risks_reply("not json at all"));
        let pipeline = pipeline_with(llm);
        let state = CoreState::new();

        pipeline
            .run(&state, text_document("lease.txt", "The tenant pays rent."))
            .await;

        let analysis = state.analysis().unwrap();
        assert!(analysis.degraded);
        assert!(analysis.risks.is_empty());
        assert_eq!(state.notice().as_deref(), Some(ANALYSIS_ERROR_NOTICE));
    }

    #[tokio::test]
    async fn run_path_with_unsupported_file_posts_notice() {
        let pipeline = pipeline_with(Arc::new(MockLlm::new()));
        let state = CoreState::new();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.xyz");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"whatever").unwrap();

        let epoch = pipeline.run_path(&state, &path).await;

        assert_eq!(epoch, 1);
        assert!(state
            .notice()
            .unwrap()
            .starts_with("Unsupported file type."));
        assert!(state.document().is_none());
    }

    #[tokio::test]
    async fn new_run_clears_previous_results() {
        let pipeline = pipeline_with(Arc::new(MockLlm::new()));
        let state = CoreState::new();

        pipeline
            .run(&state, text_document("first.txt", "First document."))
            .await;
        assert!(state.document().is_some());

        let epoch = pipeline.run(&state, text_document("empty.txt", "")).await;

        assert_eq!(epoch, 2);
        assert!(state.document().is_none(), "previous run cleared");
        assert!(state.analysis().is_none());
        assert!(state.notice().is_some());
    }
}

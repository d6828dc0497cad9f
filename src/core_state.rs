//! Shared application state, keyed by run epoch.
//!
//! One `CoreState` instance is wrapped in `Arc` at startup and shared by
//! every caller. Each document run (import, extract, analyze) is stamped
//! with an epoch taken at its start; results only land if the epoch still
//! matches when they arrive, so a newer run silently wins over a slower
//! older one. Uses `RwLock` for concurrent read access to results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;
use uuid::Uuid;

use crate::chat::{AnswerStream, ChatBackend, ConversationManager, QaTurn};
use crate::language::Language;
use crate::pipeline::analysis::{AnalysisResult, ANALYSIS_ERROR_NOTICE};
use crate::pipeline::extraction::NormalizedText;

// ═══════════════════════════════════════════════════════════
// Active document
// ═══════════════════════════════════════════════════════════

/// The document whose extraction succeeded in the current run.
#[derive(Debug, Clone)]
pub struct ActiveDocument {
    pub id: Uuid,
    pub name: String,
    pub text: NormalizedText,
}

// ═══════════════════════════════════════════════════════════
// CoreState — shared by every transport
// ═══════════════════════════════════════════════════════════

/// Transport-agnostic application state.
///
/// Results are committed by the pipeline and read by callers; the Q&A
/// conversation lives behind a tokio `Mutex` because asking a question
/// awaits the model while holding it.
pub struct CoreState {
    /// Monotonic run counter. A commit carrying an older value is stale.
    epoch: AtomicU64,
    /// Extracted document of the current run. `None` until extraction lands.
    document: RwLock<Option<ActiveDocument>>,
    /// Output language for analysis and Q&A.
    language: RwLock<Language>,
    /// Settled analysis of the current run.
    analysis: RwLock<Option<AnalysisResult>>,
    /// User-facing notice: import/extraction failure or degraded analysis.
    notice: RwLock<Option<String>>,
    /// Q&A conversation over the active document. Created lazily on the
    /// first question, dropped whenever a new run begins.
    conversation: tokio::sync::Mutex<Option<ConversationManager>>,
}

impl CoreState {
    pub fn new() -> Self {
        Self {
            epoch: AtomicU64::new(0),
            document: RwLock::new(None),
            language: RwLock::new(Language::default()),
            analysis: RwLock::new(None),
            notice: RwLock::new(None),
            conversation: tokio::sync::Mutex::new(None),
        }
    }

    // ── Run lifecycle ───────────────────────────────────────

    /// Current run epoch. Mostly useful for diagnostics; the pipeline
    /// holds the value returned by [`begin_run`](Self::begin_run).
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Start a new run: bump the epoch and clear every result of the
    /// previous one, including the Q&A conversation. Returns the new
    /// epoch, which gates all commits for this run.
    pub async fn begin_run(&self) -> u64 {
        // The bump comes before the clears; commits re-check the epoch
        // under the write lock, so a stale store never outlives a clear.
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut document) = self.document.write() {
            *document = None;
        }
        if let Ok(mut analysis) = self.analysis.write() {
            *analysis = None;
        }
        if let Ok(mut notice) = self.notice.write() {
            *notice = None;
        }
        *self.conversation.lock().await = None;
        debug!(epoch, "run started, previous results cleared");
        epoch
    }

    /// Record the extracted document. Returns `false` (and stores
    /// nothing) when a newer run has started since `epoch` was taken.
    pub fn commit_document(&self, epoch: u64, document: ActiveDocument) -> bool {
        match self.document.write() {
            Ok(mut guard) => {
                // Checked under the lock: a run that started in the
                // meantime has either bumped already, or is still
                // waiting to clear this slot.
                if epoch != self.epoch.load(Ordering::SeqCst) {
                    debug!(epoch, "stale document commit dropped");
                    return false;
                }
                *guard = Some(document);
                true
            }
            Err(_) => false,
        }
    }

    /// Record the settled analysis. A degraded result additionally posts
    /// the analysis-error notice. Stale commits are dropped.
    pub fn commit_analysis(&self, epoch: u64, analysis: AnalysisResult) -> bool {
        let degraded = analysis.degraded;
        match self.analysis.write() {
            Ok(mut guard) => {
                if epoch != self.epoch.load(Ordering::SeqCst) {
                    debug!(epoch, "stale analysis commit dropped");
                    return false;
                }
                *guard = Some(analysis);
            }
            Err(_) => return false,
        }
        if degraded {
            if let Ok(mut guard) = self.notice.write() {
                if epoch == self.epoch.load(Ordering::SeqCst) {
                    *guard = Some(ANALYSIS_ERROR_NOTICE.to_string());
                }
            }
        }
        true
    }

    /// Record a run failure as a user-facing notice. Stale failures are
    /// dropped just like stale results.
    pub fn fail_run(&self, epoch: u64, message: String) -> bool {
        match self.notice.write() {
            Ok(mut guard) => {
                if epoch != self.epoch.load(Ordering::SeqCst) {
                    debug!(epoch, "stale failure dropped");
                    return false;
                }
                *guard = Some(message);
                true
            }
            Err(_) => false,
        }
    }

    // ── Results (read path) ─────────────────────────────────

    pub fn document(&self) -> Option<ActiveDocument> {
        self.document
            .read()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }

    pub fn analysis(&self) -> Option<AnalysisResult> {
        self.analysis
            .read()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }

    pub fn notice(&self) -> Option<String> {
        self.notice
            .read()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }

    /// Dismiss the current notice.
    pub fn clear_notice(&self) {
        if let Ok(mut guard) = self.notice.write() {
            *guard = None;
        }
    }

    // ── Language ────────────────────────────────────────────

    pub fn language(&self) -> Language {
        self.language
            .read()
            .map(|guard| *guard)
            .unwrap_or_default()
    }

    /// Select the output language. Takes effect on the next analysis run
    /// and the next question; an open conversation is reset by
    /// [`ConversationManager`] when it sees the new language.
    pub fn set_language(&self, language: Language) {
        if let Ok(mut guard) = self.language.write() {
            *guard = language;
        }
    }

    // ── Q&A ─────────────────────────────────────────────────

    /// Ask a question about the active document.
    ///
    /// The conversation is created on the first question, seeded with the
    /// document text, and kept for follow-ups until the next run. Fails
    /// only when no document has been analyzed; everything after that
    /// point surfaces inside the stream as a fallback answer.
    pub async fn ask(
        &self,
        backend: &Arc<dyn ChatBackend>,
        question: &str,
    ) -> Result<AnswerStream, CoreError> {
        let document = self.document().ok_or(CoreError::NoDocument)?;
        let language = self.language();

        let mut guard = self.conversation.lock().await;
        let manager = guard.get_or_insert_with(|| {
            ConversationManager::new(Arc::clone(backend), document.text.clone())
        });
        Ok(manager.ask(question, language).await)
    }

    /// Snapshot of the Q&A transcript, empty before the first question.
    pub async fn qa_transcript(&self) -> Vec<QaTurn> {
        self.conversation
            .lock()
            .await
            .as_ref()
            .map(|manager| manager.transcript())
            .unwrap_or_default()
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("No document has been analyzed yet.")]
    NoDocument,
}

//! Grounded Q&A over the analyzed document.
//!
//! A conversation is seeded with the document text and a rule set
//! (answer from the document first, general knowledge second, respond in
//! the selected language, always close with the disclaimer). Sessions are
//! created lazily on the first question and keyed on language: switching
//! languages discards the session and the visible transcript.
//!
//! Asking never fails. Every failure path converges on a fallback answer
//! in the transcript, and a failed exchange is rolled back from the model
//! session so later questions are unaffected.

use std::pin::Pin;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::gemini::GeminiError;
use crate::language::Language;
use crate::pipeline::extraction::NormalizedText;

/// Initial text of a pending answer, visible until the first delta lands.
pub const ANSWER_PLACEHOLDER: &str = "...";

/// Shown in place of an answer when the exchange failed.
pub const CHAT_FALLBACK_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

// ═══════════════════════════════════════════
// Transcript and session types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaRole {
    User,
    Assistant,
}

/// One visible transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaTurn {
    pub role: QaRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Role names on the generateContent wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

/// One turn of model-session history (seed plus committed exchanges).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat backend error: {0}")]
    Backend(#[from] GeminiError),
}

/// Raw answer deltas from the model.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// Progressive snapshots of the answer text. Each item is the full
/// answer so far; the final item is the completed (or fallback) answer.
pub type AnswerStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Creates model chat sessions from a seeded history.
pub trait ChatBackend: Send + Sync {
    fn create_session(&self, seed: Vec<ChatTurn>) -> Box<dyn ChatSession>;
}

/// A stateful multi-turn session with the model.
///
/// Implementations must leave their history untouched by failed sends:
/// a turn is committed only when its answer stream completed cleanly.
#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send_streaming(&mut self, message: &str) -> Result<DeltaStream, ChatError>;

    fn history(&self) -> Vec<ChatTurn>;
}

// ═══════════════════════════════════════════
// Session seeding
// ═══════════════════════════════════════════

/// Build the seed history for a new session: the system instruction as a
/// user turn, acknowledged by a canned model turn.
fn seed_history(context: &NormalizedText, language: Language) -> Vec<ChatTurn> {
    let name = language.display_name();
    let system_instruction = format!(
        "You are a helpful AI legal assistant. Your task is to answer user questions about the provided legal document.\n\
         1.  **Prioritize the Document:** First, always try to answer based on the text of the document provided below.\n\
         2.  **Use General Knowledge:** If the document doesn't contain the answer, you can use your general knowledge to explain related legal concepts, suggest potential solutions for risks, or answer 'what if' questions.\n\
         3.  **Language:** Respond ONLY in {name}.\n\
         4.  **Disclaimer:** IMPORTANT: Conclude EVERY response with the following disclaimer on a new line: \"{disclaimer}\"\n\
         \n\
         LEGAL DOCUMENT CONTEXT:\n\
         ---\n\
         {context}\n\
         ---",
        name = name,
        disclaimer = language.disclaimer(),
        context = context.as_str(),
    );
    let ack = format!(
        "Understood. I will answer questions about the document, use my general \
         knowledge when needed, respond in {name}, and always include the disclaimer."
    );

    vec![
        ChatTurn {
            role: ChatRole::User,
            text: system_instruction,
        },
        ChatTurn {
            role: ChatRole::Model,
            text: ack,
        },
    ]
}

// ═══════════════════════════════════════════
// Conversation manager
// ═══════════════════════════════════════════

struct ActiveSession {
    language: Language,
    session: Box<dyn ChatSession>,
}

/// Owns the visible transcript and the underlying model session for one
/// analyzed document.
pub struct ConversationManager {
    backend: Arc<dyn ChatBackend>,
    context: NormalizedText,
    active: Option<ActiveSession>,
    transcript: Arc<RwLock<Vec<QaTurn>>>,
}

impl ConversationManager {
    pub fn new(backend: Arc<dyn ChatBackend>, context: NormalizedText) -> Self {
        Self {
            backend,
            context,
            active: None,
            transcript: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot of the visible transcript.
    pub fn transcript(&self) -> Vec<QaTurn> {
        self.transcript
            .read()
            .map(|turns| turns.clone())
            .unwrap_or_default()
    }

    /// Ask a question about the document.
    ///
    /// The question and a placeholder answer are appended to the
    /// transcript before the network call; the placeholder is then
    /// overwritten as the returned stream is polled. Failures surface as
    /// a fallback answer, never as an error.
    pub async fn ask(&mut self, question: &str, language: Language) -> AnswerStream {
        // A language switch invalidates both the session and the
        // transcript it produced.
        if let Some(active) = &self.active {
            if active.language != language {
                debug!(from = %active.language, to = %language, "language changed, resetting chat");
                self.active = None;
                if let Ok(mut turns) = self.transcript.write() {
                    turns.clear();
                }
            }
        }

        let active = self.active.get_or_insert_with(|| ActiveSession {
            language,
            session: self
                .backend
                .create_session(seed_history(&self.context, language)),
        });

        if let Ok(mut turns) = self.transcript.write() {
            turns.push(QaTurn {
                role: QaRole::User,
                text: question.to_string(),
                timestamp: Utc::now(),
            });
            turns.push(QaTurn {
                role: QaRole::Assistant,
                text: ANSWER_PLACEHOLDER.to_string(),
                timestamp: Utc::now(),
            });
        }

        match active.session.send_streaming(question).await {
            Ok(deltas) => answer_stream(deltas, Arc::clone(&self.transcript)),
            Err(e) => {
                warn!(error = %e, "chat send failed");
                overwrite_last_answer(&self.transcript, CHAT_FALLBACK_MESSAGE);
                Box::pin(futures_util::stream::iter([
                    CHAT_FALLBACK_MESSAGE.to_string()
                ]))
            }
        }
    }
}

struct AnswerState {
    deltas: DeltaStream,
    transcript: Arc<RwLock<Vec<QaTurn>>>,
    acc: String,
    done: bool,
}

/// Fold deltas into answer snapshots, mirroring each one into the
/// transcript. A mid-stream failure replaces the partial answer with the
/// fallback message and ends the stream; completion without any delta
/// leaves the placeholder in place.
fn answer_stream(deltas: DeltaStream, transcript: Arc<RwLock<Vec<QaTurn>>>) -> AnswerStream {
    Box::pin(futures_util::stream::unfold(
        AnswerState {
            deltas,
            transcript,
            acc: String::new(),
            done: false,
        },
        |mut state| async move {
            if state.done {
                return None;
            }
            match state.deltas.next().await {
                Some(Ok(delta)) => {
                    state.acc.push_str(&delta);
                    overwrite_last_answer(&state.transcript, &state.acc);
                    Some((state.acc.clone(), state))
                }
                Some(Err(e)) => {
                    warn!(error = %e, "answer stream failed");
                    state.done = true;
                    overwrite_last_answer(&state.transcript, CHAT_FALLBACK_MESSAGE);
                    Some((CHAT_FALLBACK_MESSAGE.to_string(), state))
                }
                None => None,
            }
        },
    ))
}

fn overwrite_last_answer(transcript: &Arc<RwLock<Vec<QaTurn>>>, text: &str) {
    if let Ok(mut turns) = transcript.write() {
        if let Some(last) = turns.last_mut() {
            if last.role == QaRole::Assistant {
                last.text = text.to_string();
            }
        }
    }
}

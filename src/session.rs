//! Session orchestration: the submit/stop/reset surface the interface layer
//! drives.
//!
//! `submit` owns the whole lifecycle of one exchange: draft validation, the
//! generating flag, a fresh cancellation token, streaming, and converting
//! any failure into a single error entry in the transcript. The flag admits
//! at most one live stream per session; the token lives only for the
//! duration of that stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::config::ChatConfig;
use crate::errors::ChatResult;
use crate::models::message::Message;
use crate::stream::StreamClient;
use crate::transcript::Transcript;

/// Outcome of a submit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The exchange ran to completion (including surfaced errors).
    Completed,
    /// The draft was blank after trimming; nothing changed.
    EmptyDraft,
    /// A stream is already in flight; nothing changed.
    AlreadyGenerating,
}

/// Cancels the in-flight stream of the session it was taken from, if any.
/// Cloneable so the interface can hold it apart from the session itself.
#[derive(Clone)]
pub struct StopHandle {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl StopHandle {
    pub fn stop(&self) {
        if let Some(token) = self.active.lock().unwrap().as_ref() {
            token.cancel();
        }
    }
}

/// One user-facing chat session.
#[derive(Clone)]
pub struct Session {
    transcript: Transcript,
    stream: StreamClient,
    caller: String,
    generating: Arc<AtomicBool>,
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl Session {
    pub fn new(config: &ChatConfig) -> ChatResult<Self> {
        Ok(Session {
            transcript: Transcript::new(),
            stream: StreamClient::new(&config.backend_url)?,
            caller: config.caller.clone(),
            generating: Arc::new(AtomicBool::new(false)),
            active: Arc::new(Mutex::new(None)),
        })
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            active: Arc::clone(&self.active),
        }
    }

    /// Submit a draft and stream the assistant's reply to completion.
    ///
    /// Blank drafts and submissions while a stream is in flight are rejected
    /// without touching any state. Stream failures are appended to the
    /// transcript as one error message rather than returned; the generating
    /// flag is cleared on every path.
    pub async fn submit(&self, draft: &str) -> SubmitOutcome {
        let draft = draft.trim();
        if draft.is_empty() {
            return SubmitOutcome::EmptyDraft;
        }
        if self
            .generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return SubmitOutcome::AlreadyGenerating;
        }

        // Register the token before the transcript changes: a watcher that
        // reacts to the user message by stopping must find it in place.
        let token = CancellationToken::new();
        *self.active.lock().unwrap() = Some(token.clone());

        self.transcript.append(Message::user(draft));

        let result = self.stream.consume(&self.transcript, &token, &self.caller).await;
        if let Err(e) = result {
            tracing::error!(error = %e, "exchange failed");
            self.transcript.append(Message::error(e.to_string()));
        }

        *self.active.lock().unwrap() = None;
        self.generating.store(false, Ordering::SeqCst);
        SubmitOutcome::Completed
    }

    /// Stop the in-flight stream, if any. Partial content stays in place.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// Start a new conversation: cancel anything in flight and clear the
    /// transcript.
    pub fn reset(&self) {
        self.stop();
        self.transcript.reset();
    }
}

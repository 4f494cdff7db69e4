//! The transcript store: ordered conversation history plus a revision
//! counter the presentation layer can watch for re-rendering.
//!
//! Messages are append-only. The single mutation primitive beyond `append`
//! is `replace_last`, which edits the most recent message matching a role
//! predicate; it exists so streamed deltas can merge into the in-progress
//! assistant or tool message. Nothing is ever reordered or deleted short of
//! a full `reset`.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::models::message::Message;

struct Inner {
    messages: Vec<Message>,
    revision: watch::Sender<u64>,
}

/// Shared handle to the conversation transcript. Clones refer to the same
/// underlying history; locks are never held across await points.
#[derive(Clone)]
pub struct Transcript {
    inner: Arc<Mutex<Inner>>,
}

impl Transcript {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Transcript {
            inner: Arc::new(Mutex::new(Inner {
                messages: Vec::new(),
                revision,
            })),
        }
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Message>) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        let result = f(&mut inner.messages);
        inner.revision.send_modify(|revision| *revision += 1);
        result
    }

    /// Append a message at the end of the transcript.
    pub fn append(&self, message: Message) {
        self.mutate(|messages| messages.push(message));
    }

    /// Mutate the most recent message satisfying `predicate`, or append
    /// `fallback()` when none matches.
    pub fn replace_last<P, U, F>(&self, predicate: P, update: U, fallback: F)
    where
        P: Fn(&Message) -> bool,
        U: FnOnce(&mut Message),
        F: FnOnce() -> Message,
    {
        self.mutate(|messages| {
            match messages.iter_mut().rev().find(|m| predicate(m)) {
                Some(message) => update(message),
                None => messages.push(fallback()),
            }
        });
    }

    /// Clear the transcript (new conversation).
    pub fn reset(&self) {
        self.mutate(|messages| messages.clear());
    }

    /// Snapshot of the current messages, in display order.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().unwrap().messages.clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.inner.lock().unwrap().messages.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to transcript revisions. The receiver resolves whenever any
    /// mutation lands, carrying a monotonically increasing counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.lock().unwrap().revision.subscribe()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

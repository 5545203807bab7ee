//! Transient user feedback with automatic expiry.
//!
//! Setting a notice schedules a delayed clear; setting another notice before
//! it fires cancels that clear and schedules a fresh one, so the newest
//! message always gets the full TTL.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Tone of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// A message shown to the user for a short time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Holder of the current notice for one store.
///
/// Cheaply cloneable; clones share the same notice.
#[derive(Clone)]
pub struct NoticeBoard {
    inner: Arc<NoticeBoardInner>,
}

struct NoticeBoardInner {
    ttl: Duration,
    state: watch::Sender<Option<Notice>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for NoticeBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeBoard")
            .field("ttl", &self.inner.ttl)
            .field("current", &*self.inner.state.borrow())
            .finish()
    }
}

impl NoticeBoard {
    /// Create an empty board whose notices expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            inner: Arc::new(NoticeBoardInner {
                ttl,
                state,
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// How long a notice stays visible.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Show `notice`, replacing any current one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set(&self, notice: Notice) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(kind = ?notice.kind, text = %notice.text, "Notice set");
        self.inner.state.send_replace(Some(notice));

        let inner = Arc::clone(&self.inner);
        let clear = tokio::spawn(async move {
            tokio::time::sleep(inner.ttl).await;
            // A newer notice may have landed between the sleep and the abort.
            if inner.generation.load(Ordering::SeqCst) == generation {
                inner.state.send_replace(None);
            }
        });

        let previous = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(clear);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Show a success notice.
    pub fn success(&self, text: impl Into<String>) {
        self.set(Notice::success(text));
    }

    /// Show an informational notice.
    pub fn info(&self, text: impl Into<String>) {
        self.set(Notice::info(text));
    }

    /// Show an error notice.
    pub fn error(&self, text: impl Into<String>) {
        self.set(Notice::error(text));
    }

    /// Remove the current notice and cancel its pending clear.
    pub fn clear(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pending) = pending {
            pending.abort();
        }
        self.inner.state.send_replace(None);
    }

    /// The notice currently shown.
    #[must_use]
    pub fn current(&self) -> Option<Notice> {
        self.inner.state.borrow().clone()
    }

    /// Watch the notice as it is set and cleared.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Notice>> {
        self.inner.state.subscribe()
    }
}

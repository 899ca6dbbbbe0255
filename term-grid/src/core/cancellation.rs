//! Cooperative cancellation built on `tokio::sync::watch`.
//!
//! A token is a shared flag. Child tokens observe their parent: cancelling a
//! parent cancels every child created from it, while cancelling a child leaves
//! the parent untouched. The coordinator owns one child per operation, linked
//! to the caller's token, and hands a grandchild to every batch.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;

struct Inner {
    flag: watch::Sender<bool>,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag,
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self) {
        if self.flag.send_replace(true) {
            return;
        }
        let children = std::mem::take(
            &mut *self
                .children
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

/// A cloneable handle used to request and observe cancellation.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Creates a token that is cancelled whenever `self` is.
    pub fn child_token(&self) -> Self {
        let child = Self::new();
        let mut children = self
            .inner
            .children
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Checked under the lock so a concurrent cancel() cannot slip between
        // the check and the registration.
        if self.is_cancelled() {
            drop(children);
            child.cancel();
        } else {
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.flag.borrow()
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.inner.flag.subscribe();
        // The sender lives as long as `self`, so this only ends on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

//! Single-flight coordination of bulk operations.
//!
//! An [`OperationCoordinator`] lets at most one bulk operation run per engine.
//! Admission goes through a one-permit semaphore; the admitted operation gets
//! an [`OperationGuard`] carrying a cancellation token linked to the caller's,
//! and the coordinator publishes its [`OperationState`] on a watch channel.
//!
//! ```text
//! Idle ──► Running ──► Completed | Cancelled | Faulted ──► Running ──► ...
//! ```
//!
//! The terminal state of the last operation is kept until the next one is
//! admitted; `dispose()` returns the coordinator to `Idle` for good.

use crate::core::{panic_message, CancellationToken, RunStatus};
use crate::prelude::*;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{watch, Semaphore, SemaphorePermit, TryAcquireError};
use tracing::{debug, info};

/// Lifecycle state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Faulted,
}

impl OperationState {
    fn from_status(status: &RunStatus) -> Self {
        match status {
            RunStatus::Completed => OperationState::Completed,
            RunStatus::Cancelled => OperationState::Cancelled,
            RunStatus::Faulted(_) => OperationState::Faulted,
        }
    }

    pub fn is_running(&self) -> bool {
        *self == OperationState::Running
    }
}

/// Kind of bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    RowValidation,
    CrossRowValidation,
    Search,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::RowValidation => "row_validation",
            OperationKind::CrossRowValidation => "cross_row_validation",
            OperationKind::Search => "search",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializes bulk operations on one engine.
#[derive(Debug)]
pub struct OperationCoordinator {
    gate: Semaphore,
    state: watch::Sender<OperationState>,
    current: Mutex<Option<CancellationToken>>,
    disposed: AtomicBool,
}

impl Default for OperationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(OperationState::Idle);
        Self {
            gate: Semaphore::new(1),
            state,
            current: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    /// Admits an operation only if none is running.
    ///
    /// Fails with `Busy` when the slot is taken and `Disposed` after
    /// [`dispose`](Self::dispose).
    pub fn try_begin(
        &self,
        kind: OperationKind,
        cancellation: &CancellationToken,
    ) -> Result<OperationGuard<'_>> {
        self.ensure_live()?;
        let permit = match self.gate.try_acquire() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => return Err(EngineError::busy(kind.as_str())),
            Err(TryAcquireError::Closed) => return Err(EngineError::Disposed),
        };
        self.admit(kind, cancellation, permit)
    }

    /// Waits for the slot, then admits the operation.
    pub async fn begin(
        &self,
        kind: OperationKind,
        cancellation: &CancellationToken,
    ) -> Result<OperationGuard<'_>> {
        self.ensure_live()?;
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| EngineError::Disposed)?;
        self.admit(kind, cancellation, permit)
    }

    fn admit<'a>(
        &'a self,
        kind: OperationKind,
        cancellation: &CancellationToken,
        permit: SemaphorePermit<'a>,
    ) -> Result<OperationGuard<'a>> {
        // dispose() may have started while we waited for the permit
        self.ensure_live()?;
        let token = cancellation.child_token();
        *self.current_slot() = Some(token.clone());
        self.state.send_replace(OperationState::Running);
        debug!(operation.kind = %kind, "Operation admitted");
        Ok(OperationGuard {
            coordinator: self,
            kind,
            token,
            finished: false,
            _permit: permit,
        })
    }

    /// Cancels the running operation, if any.
    ///
    /// The caller's token is left alone; only the operation's linked token is
    /// cancelled.
    pub fn cancel(&self) {
        if let Some(token) = self.current_slot().as_ref() {
            debug!("Cancelling running operation");
            token.cancel();
        }
    }

    pub fn state(&self) -> OperationState {
        *self.state.borrow()
    }

    /// Receiver observing every state change.
    pub fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.state.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Cancels the running operation, waits for it to settle and closes the
    /// gate. Later admissions fail with `Disposed`.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel();
        if let Ok(permit) = self.gate.acquire().await {
            drop(permit);
        }
        self.gate.close();
        self.state.send_replace(OperationState::Idle);
        info!("Operation coordinator disposed");
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(EngineError::Disposed)
        } else {
            Ok(())
        }
    }

    fn current_slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The admitted operation's hold on the coordinator.
///
/// Dropping the guard without [`finish`](Self::finish) marks the operation
/// cancelled and frees the slot.
#[derive(Debug)]
pub struct OperationGuard<'a> {
    coordinator: &'a OperationCoordinator,
    kind: OperationKind,
    token: CancellationToken,
    finished: bool,
    _permit: SemaphorePermit<'a>,
}

impl OperationGuard<'_> {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Token cancelled by the caller's token or by the coordinator.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Runs `future`, turning a panic that escapes it into an error message.
    pub async fn supervise<F: Future>(&self, future: F) -> std::result::Result<F::Output, String> {
        AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .map_err(|payload| panic_message(payload.as_ref()))
    }

    /// Publishes the terminal state matching `status` and frees the slot.
    pub fn finish(mut self, status: &RunStatus) {
        let state = OperationState::from_status(status);
        self.coordinator.state.send_replace(state);
        self.finished = true;
        debug!(operation.kind = %self.kind, operation.state = ?state, "Operation finished");
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.current_slot().take();
        if !self.finished {
            self.coordinator
                .state
                .send_replace(OperationState::Cancelled);
        }
    }
}

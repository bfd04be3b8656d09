//! One-shot completion cell for in-flight calls.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use osprey_wire::{RpcError, Value};

/// Outcome of a completed call.
pub type CallOutcome = Result<Value, RpcError>;

type Callback = Box<dyn FnOnce(CallOutcome) + Send + 'static>;

struct State {
    outcome: Option<CallOutcome>,
    callback: Option<Callback>,
    /// Remaining sweep ticks. `None` means the call is exempt from
    /// sweep-based expiry (non-positive configured timeout).
    ticks: Option<u32>,
}

struct Shared {
    state: Mutex<State>,
    notify: Notify,
}

/// Handle to the eventual outcome of an in-flight call.
///
/// The cell transitions once, from pending to completed; the first
/// writer wins and later completions are silently ignored. The handle
/// is shared between the owning session (which completes it on
/// response, sweep, or shutdown) and any number of waiters.
#[derive(Clone)]
pub struct CallFuture {
    shared: Arc<Shared>,
}

impl CallFuture {
    /// New pending future seeded with the given sweep countdown.
    pub fn new(timeout_ticks: Option<u32>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    outcome: None,
                    callback: None,
                    ticks: timeout_ticks,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Complete the call. One-shot: returns `false` (and does nothing)
    /// if the future was already completed.
    ///
    /// Wakes every waiter and, if a callback is attached, dispatches
    /// it on the runtime's worker pool, never inline on the caller,
    /// so the completing thread (typically the demux loop or the
    /// sweeper) never runs user code.
    pub fn complete(&self, outcome: CallOutcome) -> bool {
        let callback = {
            let mut state = self.shared.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            state.callback.take()
        };
        self.shared.notify.notify_waiters();
        if let Some(callback) = callback {
            tokio::spawn(async move { callback(outcome) });
        }
        true
    }

    /// Whether the call has completed.
    pub fn is_complete(&self) -> bool {
        self.shared.state.lock().outcome.is_some()
    }

    /// The recorded outcome, if the call has completed.
    pub fn outcome(&self) -> Option<CallOutcome> {
        self.shared.state.lock().outcome.clone()
    }

    /// Attach a completion callback.
    ///
    /// If the call is still pending the callback fires on completion;
    /// if it already completed the callback is spawned immediately
    /// with the recorded outcome. Either way it runs on the worker
    /// pool, never inline. A later callback replaces an earlier one
    /// that has not fired yet.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(CallOutcome) + Send + 'static,
    {
        let already = {
            let mut state = self.shared.state.lock();
            match &state.outcome {
                Some(outcome) => Some((outcome.clone(), callback)),
                None => {
                    state.callback = Some(Box::new(callback));
                    None
                }
            }
        };
        if let Some((outcome, callback)) = already {
            tokio::spawn(async move { callback(outcome) });
        }
    }

    /// Wait until the call completes.
    pub async fn wait(&self) -> CallOutcome {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Wait until the call completes or the deadline elapses.
    ///
    /// The deadline belongs to the waiter, not to the shared cell: its
    /// expiry yields [`RpcError::Timeout`] without completing the
    /// future, which stays in the pending table until a response, the
    /// sweep, or shutdown resolves it.
    pub async fn wait_deadline(&self, deadline: Duration) -> CallOutcome {
        match tokio::time::timeout(deadline, self.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RpcError::Timeout),
        }
    }

    /// Decrement the sweep countdown, returning `true` when it reaches
    /// zero and the session should force-complete this call with
    /// [`RpcError::Timeout`]. Exempt and already-completed futures
    /// never expire.
    pub(crate) fn step_timeout(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.outcome.is_some() {
            return false;
        }
        match &mut state.ticks {
            None => false,
            Some(ticks) => {
                *ticks = ticks.saturating_sub(1);
                *ticks == 0
            }
        }
    }
}

impl std::fmt::Debug for CallFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("CallFuture")
            .field("complete", &state.outcome.is_some())
            .field("ticks", &state.ticks)
            .finish()
    }
}

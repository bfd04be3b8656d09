//! Pending-call table: call id → in-flight future.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::future::CallFuture;

/// Table of in-flight calls, owned exclusively by one session.
///
/// Entries are inserted before the request is handed to the transport
/// (so a fast reply can never race an unknown id) and removed exactly
/// once: by a matching response, by the timeout sweep, or by session
/// shutdown. All mutation happens under one lock; the sweep snapshots
/// expired entries under the lock and completes them outside it.
pub(crate) struct PendingCalls {
    calls: Mutex<HashMap<u32, CallFuture>>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(&self, call_id: u32, future: CallFuture) {
        self.calls.lock().insert(call_id, future);
    }

    pub(crate) fn remove(&self, call_id: u32) -> Option<CallFuture> {
        self.calls.lock().remove(&call_id)
    }

    /// Step every entry's countdown and remove the expired ones.
    /// The caller force-completes the returned futures.
    pub(crate) fn sweep(&self) -> Vec<(u32, CallFuture)> {
        let mut calls = self.calls.lock();
        let expired: Vec<u32> = calls
            .iter()
            .filter(|(_, future)| future.step_timeout())
            .map(|(id, _)| *id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| calls.remove(&id).map(|future| (id, future)))
            .collect()
    }

    /// Remove and return every entry. Used on session shutdown.
    pub(crate) fn drain(&self) -> Vec<CallFuture> {
        self.calls.lock().drain().map(|(_, future)| future).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.calls.lock().len()
    }
}

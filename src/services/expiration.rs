//! Expiration monitor: per-marker countdowns.
//!
//! DESIGN
//! ======
//! Every record with an `expires_at` owns one spawned task that ticks at
//! `expiry_tick` resolution. Each tick compares `expires_at` against the
//! injected clock; once the remaining time is <= 0 the task removes the
//! record locally and issues the backend delete. Countdowns never share
//! state, so one marker expiring leaves every other countdown untouched.
//!
//! INVARIANTS
//! ==========
//! - At most one countdown per key. Replacing or removing a record aborts
//!   its countdown (see `MapSession::insert_record` / `remove_marker`).
//! - A countdown that fires detaches itself from `ExpiryTimers` before
//!   removing the record, so the removal cannot abort the task mid-delete.
//! - The backend delete is issued only by the path that actually removed
//!   the record, so it happens at most once per expiry.
//!
//! ERROR HANDLING
//! ==============
//! A failed backend delete is logged and not retried. The record is already
//! gone locally; `load_markers` deletes stale documents on the next load.

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::clock::Timestamp;
use crate::geo::CoordinateKey;
use crate::state::AppState;

/// Live countdown tasks keyed by marker.
#[derive(Debug, Default)]
pub struct ExpiryTimers {
    tasks: HashMap<CoordinateKey, JoinHandle<()>>,
}

impl ExpiryTimers {
    /// Track `handle` for `key`, aborting any countdown it replaces.
    pub(crate) fn insert(&mut self, key: CoordinateKey, handle: JoinHandle<()>) {
        if let Some(previous) = self.tasks.insert(key, handle) {
            previous.abort();
        }
    }

    pub(crate) fn cancel(&mut self, key: &CoordinateKey) {
        if let Some(handle) = self.tasks.remove(key) {
            handle.abort();
        }
    }

    /// Forget the countdown for `key` without aborting it.
    pub(crate) fn release(&mut self, key: &CoordinateKey) {
        self.tasks.remove(key);
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn contains(&self, key: &CoordinateKey) -> bool {
        self.tasks.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Spawn the countdown for `key`. The caller must hold the session write
/// lock and store the handle with `ExpiryTimers::insert`. The task reaches
/// the session only through that lock, so it never sees a half-inserted
/// record.
pub(crate) fn spawn_countdown(state: AppState, key: CoordinateKey, expires_at: Timestamp) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.expiry_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let remaining_ms = expires_at - state.clock.now_ms();
            if remaining_ms > 0 {
                debug!(key = %key, remaining_ms, "countdown tick");
                continue;
            }
            expire_marker(&state, &key).await;
            break;
        }
    })
}

/// Remove an expired marker locally, then delete its backing document.
///
/// Returns false when the record was already gone, in which case no
/// delete is issued.
pub async fn expire_marker(state: &AppState, key: &CoordinateKey) -> bool {
    let position = {
        let mut session = state.session.write().await;
        session.timers.release(key);
        match session.remove_marker(key) {
            Some(record) => record.position(),
            None => return false,
        }
    };

    info!(key = %key, "marker expired");
    if let Err(e) = state.backend.delete_marker(position).await {
        error!(error = %e, key = %key, "expired marker delete failed");
    }
    true
}

/// Number of markers with a running countdown.
pub async fn active_countdowns(state: &AppState) -> usize {
    state.session.read().await.timers.len()
}

#[cfg(test)]
#[path = "expiration_test.rs"]
mod tests;

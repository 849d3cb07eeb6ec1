//! Shared application state for one map session.
//!
//! DESIGN
//! ======
//! `AppState` is a cheap `Clone` handle passed to every service: the
//! session behind an `RwLock`, the backend, the clock, and the config.
//! `MapSession` holds everything the map shows: the marker registry, the
//! current expansion, UI/drop-mode state, the acting user, the surface
//! outbox, and the per-marker countdown tasks.
//!
//! CONCURRENCY
//! ===========
//! The binary runs on a current-thread runtime, so handlers interleave only
//! at `.await` points. Services never hold the session lock across a
//! backend call: they read what they need, release, await the backend,
//! then re-acquire and apply one mutation step. A continuation that finds
//! its marker gone becomes a no-op.
//!
//! LIFECYCLE
//! =========
//! `AppState::new` (init) -> `reset_on_logout` (registry cleared, user
//! dropped, drop mode forced idle) -> `teardown` (countdowns aborted,
//! everything detached) when the map goes away.

pub mod auth;
pub mod marker;
pub mod registry;
pub mod surface;
pub mod ui;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::geo::CoordinateKey;
use crate::net::api::Backend;
use crate::services::expiration::ExpiryTimers;

use auth::AuthState;
use marker::MarkerRecord;
use registry::MarkerRegistry;
use surface::{Surface, SurfaceOp};
use ui::{DropMode, UiState};

// =============================================================================
// MAP SESSION
// =============================================================================

pub struct MapSession {
    pub registry: MarkerRegistry,
    /// Key of the single expanded record, if any. Never owns the record.
    pub expansion: Option<CoordinateKey>,
    pub ui: UiState,
    pub auth: AuthState,
    pub surface: Surface,
    pub(crate) timers: ExpiryTimers,
    /// (`comment_id`, `user_id`) pairs with a vote round trip in flight.
    pub(crate) votes_in_flight: HashSet<(String, String)>,
}

impl MapSession {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            registry: MarkerRegistry::new(),
            expansion: None,
            ui: UiState::new(config.default_zoom),
            auth: AuthState::default(),
            surface: Surface::default(),
            timers: ExpiryTimers::default(),
            votes_in_flight: HashSet::new(),
        }
    }

    /// The currently expanded record.
    #[must_use]
    pub fn current(&self) -> Option<&MarkerRecord> {
        self.expansion
            .as_ref()
            .and_then(|key| self.registry.lookup(key))
    }

    /// Insert a record, honouring the category filter. A record replaced at
    /// the same key loses its countdown and, if expanded, the expansion.
    pub fn insert_record(&mut self, mut record: MarkerRecord) -> Option<MarkerRecord> {
        if !self.ui.is_category_visible(record.category) {
            record.pin.visible = false;
            record.preview.open = false;
            record.info.open = false;
        }
        self.timers.cancel(&record.key);
        if self.expansion.as_ref() == Some(&record.key) {
            self.expansion = None;
        }
        self.registry.upsert(record, &mut self.surface)
    }

    /// Remove a record with its countdown. Idempotent.
    pub fn remove_marker(&mut self, key: &CoordinateKey) -> Option<MarkerRecord> {
        self.timers.cancel(key);
        if self.expansion.as_ref() == Some(key) {
            self.expansion = None;
        }
        self.registry.remove(key, &mut self.surface)
    }

    /// Drop every record and countdown.
    pub fn clear_markers(&mut self) {
        self.timers.cancel_all();
        self.expansion = None;
        self.registry.clear_all(&mut self.surface);
    }

    /// Force drop mode back to idle and hide its overlay.
    pub fn disarm(&mut self) {
        self.ui.drop_mode = DropMode::Idle;
        self.ui.pending_drop = None;
        self.ui.delete_enabled = true;
        self.ui.guide = None;
        if self.ui.drop_radius_visible {
            self.ui.drop_radius_visible = false;
            self.surface.push(SurfaceOp::SetDropRadiusVisible(false));
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Handle shared by every service call and background task.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<MapSession>>,
    pub backend: Arc<dyn Backend>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<EngineConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let session = MapSession::new(&config);
        Self { session: Arc::new(RwLock::new(session)), backend, clock, config: Arc::new(config) }
    }

    /// Clear markers, the acting user, and drop mode ahead of a rebuild.
    pub async fn reset_on_logout(&self) {
        let mut session = self.session.write().await;
        session.clear_markers();
        session.disarm();
        session.auth.user = None;
        session.votes_in_flight.clear();
    }

    /// Abort every countdown and detach everything from the map.
    pub async fn teardown(&self) {
        let mut session = self.session.write().await;
        let count = session.registry.len();
        session.clear_markers();
        session.disarm();
        info!(count, "map session torn down");
    }

    /// Take pending surface commands for the renderer.
    pub async fn drain_surface(&self) -> Vec<SurfaceOp> {
        self.session.write().await.surface.drain()
    }

    /// Drain the outbox for a headless run, logging each command. Returns
    /// how many were flushed.
    pub async fn flush_surface(&self) -> usize {
        let ops = self.drain_surface().await;
        for op in &ops {
            debug!(?op, "surface command");
        }
        ops.len()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

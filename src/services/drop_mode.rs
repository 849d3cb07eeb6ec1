//! Drop-mode state machine and marker creation.
//!
//! DESIGN
//! ======
//! One `DropMode` per session: `Idle` or `Armed`. Arming requires a logged
//! in user and shows the drop radius around their position. While armed, a
//! click on the radius picks the drop location and opens the creation form;
//! submitting the form creates the marker, expands it, and disarms.
//!
//! ```text
//!            toggle_drop (authenticated)
//!   Idle  ---------------------------------->  Armed
//!    ^                                           |
//!    +---- toggle_drop (cancel) / submit_drop ---+
//! ```
//!
//! EDGE CASES
//! ==========
//! - Unauthenticated arming bumps the login prompt and stays `Idle`.
//! - Armed clicks outside the radius only show a warning.
//! - Zooming out past `min_drop_zoom` hides the radius and warns; the mode
//!   stays `Armed`.
//! - Submitting claims the pending drop location before any request, so a
//!   second submit while the first is in flight gets `NoPendingDrop`. A
//!   failed submit puts the location back for a retry.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::EngineError;
use crate::geo::{CoordinateKey, LatLng};
use crate::net::types::{Category, MarkerDto, NewCommentDto};
use crate::services::{markers, visibility};
use crate::state::AppState;
use crate::state::marker::MarkerRecord;
use crate::state::surface::SurfaceOp;
use crate::state::ui::{
    DropMode, GUIDE_DROP_HERE, GUIDE_NEXT_MOVE, GUIDE_POSITION_UNKNOWN, GUIDE_REQUEST_FAILED, GUIDE_WRONG_AREA,
    GUIDE_ZOOMED_OUT, UserIconSize,
};

// =============================================================================
// TYPES
// =============================================================================

/// Where a map click landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapClick {
    /// The general map surface.
    Surface(LatLng),
    /// Inside the drop radius overlay.
    DropRadius(LatLng),
}

/// What a map click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Idle click that collapsed the current expansion (if any).
    Collapsed(Option<CoordinateKey>),
    /// Click with no effect.
    Ignored,
    /// Armed click outside the radius; a warning is shown.
    Rejected,
    /// Armed click on the radius; the creation form is open.
    DropSelected,
}

/// Contents of the marker creation form.
#[derive(Debug, Clone, PartialEq)]
pub struct DropForm {
    pub topic: String,
    pub category: Category,
    /// Main comment shown in the expanded view.
    pub comment: String,
    /// Marker lifetime; `None` never expires.
    pub lifetime: Option<Duration>,
}

// =============================================================================
// TOGGLE
// =============================================================================

/// Flip drop mode. Returns the new mode.
///
/// # Errors
///
/// Returns `Unauthenticated` (and prompts login) when arming without a
/// user. Disarming always succeeds.
pub async fn toggle_drop(state: &AppState) -> Result<DropMode, EngineError> {
    let mut guard = state.session.write().await;
    let session = &mut *guard;

    if session.ui.drop_mode == DropMode::Armed {
        session.disarm();
        info!("drop mode cancelled");
        return Ok(DropMode::Idle);
    }

    if !session.auth.is_authenticated() {
        session.ui.prompt_login();
        return Err(EngineError::Unauthenticated);
    }

    session.ui.drop_mode = DropMode::Armed;
    session.ui.delete_enabled = false;
    session.ui.pending_drop = None;
    if let Some(position) = session.auth.position {
        session.ui.center = Some(position);
        session.surface.push(SurfaceOp::PanTo(position));
    }
    session.ui.zoom = state.config.drop_zoom;
    session.ui.user_icon = UserIconSize::for_zoom(state.config.drop_zoom);
    session.surface.push(SurfaceOp::SetZoom(state.config.drop_zoom));
    session.ui.drop_radius_visible = true;
    session.surface.push(SurfaceOp::SetDropRadiusVisible(true));
    session.ui.show_guide(GUIDE_DROP_HERE);
    info!("drop mode armed");
    Ok(DropMode::Armed)
}

// =============================================================================
// ZOOM
// =============================================================================

/// Record a zoom change from the map. While armed, the drop radius is shown
/// only at or above `min_drop_zoom`.
pub async fn set_zoom(state: &AppState, zoom: u8) {
    let mut guard = state.session.write().await;
    let session = &mut *guard;
    session.ui.zoom = zoom;
    session.ui.user_icon = UserIconSize::for_zoom(zoom);

    if session.ui.drop_mode != DropMode::Armed {
        return;
    }
    let radius_visible = zoom >= state.config.min_drop_zoom;
    if radius_visible {
        session.ui.show_guide(GUIDE_DROP_HERE);
    } else {
        session.ui.show_warning(GUIDE_ZOOMED_OUT);
    }
    if session.ui.drop_radius_visible != radius_visible {
        session.ui.drop_radius_visible = radius_visible;
        session.surface.push(SurfaceOp::SetDropRadiusVisible(radius_visible));
    }
}

// =============================================================================
// CLICK
// =============================================================================

/// Route a map click according to the current drop mode.
///
/// # Errors
///
/// On an armed radius click: `TooFarZoomedOut` below `min_drop_zoom`,
/// `PositionUnknown` without a tracked position, `OutOfRange` when the
/// point lies outside the drop radius.
pub async fn map_click(state: &AppState, click: MapClick) -> Result<ClickOutcome, EngineError> {
    let mut guard = state.session.write().await;
    let session = &mut *guard;

    match (session.ui.drop_mode, click) {
        (DropMode::Idle, MapClick::Surface(_)) => {
            let current = session.expansion.clone();
            if let Some(key) = &current {
                visibility::collapse_in(session, key);
            }
            Ok(ClickOutcome::Collapsed(current))
        }
        (DropMode::Idle, MapClick::DropRadius(_)) => Ok(ClickOutcome::Ignored),
        (DropMode::Armed, MapClick::Surface(_)) => {
            session.ui.show_warning(GUIDE_WRONG_AREA);
            Ok(ClickOutcome::Rejected)
        }
        (DropMode::Armed, MapClick::DropRadius(at)) => {
            let min = state.config.min_drop_zoom;
            if session.ui.zoom < min {
                session.ui.show_warning(GUIDE_ZOOMED_OUT);
                return Err(EngineError::TooFarZoomedOut { zoom: session.ui.zoom, min });
            }
            let Some(user_at) = session.auth.position else {
                session.ui.show_warning(GUIDE_POSITION_UNKNOWN);
                return Err(EngineError::PositionUnknown);
            };
            let radius_m = state.config.drop_radius_m;
            if !user_at.within(&at, radius_m) {
                session.ui.show_warning(GUIDE_WRONG_AREA);
                return Err(EngineError::OutOfRange { distance_m: user_at.distance_m(&at), radius_m });
            }
            CoordinateKey::from_position(at)?;
            session.ui.pending_drop = Some(at);
            session.ui.drop_form_seq += 1;
            session.ui.show_guide(GUIDE_NEXT_MOVE);
            Ok(ClickOutcome::DropSelected)
        }
    }
}

// =============================================================================
// SUBMIT
// =============================================================================

/// Create a marker at the pending drop location, expand it, and disarm.
///
/// # Errors
///
/// `NotArmed`, `NoPendingDrop`, `Unauthenticated`, `IncompleteForm` for a
/// blank topic or comment, or `Backend` if either create request fails
/// (drop mode then stays armed so the user can retry).
pub async fn submit_drop(state: &AppState, form: DropForm) -> Result<CoordinateKey, EngineError> {
    let topic = form.topic.trim();
    let comment = form.comment.trim();

    let (at, owner_id) = {
        let mut session = state.session.write().await;
        if session.ui.drop_mode != DropMode::Armed {
            return Err(EngineError::NotArmed);
        }
        let at = session.ui.pending_drop.ok_or(EngineError::NoPendingDrop)?;
        let owner_id = session
            .auth
            .user_id()
            .map(str::to_owned)
            .ok_or(EngineError::Unauthenticated)?;
        if topic.is_empty() {
            return Err(EngineError::IncompleteForm("topic"));
        }
        if comment.is_empty() {
            return Err(EngineError::IncompleteForm("comment"));
        }
        // Claimed before the first request so a repeated submit finds
        // nothing to create.
        session.ui.pending_drop = None;
        (at, owner_id)
    };

    let now = state.clock.now_ms();
    let expires_at = form
        .lifetime
        .map(|d| now.saturating_add(i64::try_from(d.as_millis()).unwrap_or(i64::MAX)));
    let dto = MarkerDto {
        topic: topic.to_owned(),
        category: form.category,
        lat: at.lat,
        lng: at.lng,
        owner_id: Some(owner_id),
        created_at: now,
        expires_at,
        num_comments: 1,
    };
    let key = dto.key()?;

    let created = async {
        state.backend.create_marker(&dto).await?;
        state
            .backend
            .add_comment(&NewCommentDto { content: comment.to_owned(), lat: at.lat, lng: at.lng, date: now })
            .await
    }
    .await;
    let main_comment = match created {
        Ok(main_comment) => main_comment,
        Err(e) => {
            warn!(error = %e, key = %key, "marker create failed");
            let mut session = state.session.write().await;
            session.ui.show_warning(GUIDE_REQUEST_FAILED);
            if session.ui.drop_mode == DropMode::Armed && session.ui.pending_drop.is_none() {
                session.ui.pending_drop = Some(at);
            }
            return Err(e.into());
        }
    };

    let record = MarkerRecord::from_dto(&dto, Some(main_comment))?;
    let mut guard = state.session.write().await;
    let session = &mut *guard;
    markers::install_record(state, session, record);
    if visibility::expand_in(session, &key).is_err() {
        info!(key = %key, category = ?form.category, "dropped marker hidden by category filter");
    }
    session.disarm();
    info!(key = %key, topic = %dto.topic, ?expires_at, "marker dropped");
    Ok(key)
}

#[cfg(test)]
#[path = "drop_mode_test.rs"]
mod tests;

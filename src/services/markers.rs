//! Marker service: load, login/logout rebuild, delete-own, comments,
//! category filter.
//!
//! DESIGN
//! ======
//! Each operation follows the same shape: read what it needs under the
//! session lock, release, await the backend, then re-acquire the lock for
//! a single mutation. Local state changes only after the backend call that
//! justifies them succeeds, so a failed request leaves the map as it was.
//!
//! EDGE CASES
//! ==========
//! - Documents that expired while no client was watching are skipped on
//!   load and their deletion is issued once.
//! - A continuation that finds its marker gone (expired or deleted while
//!   the request was in flight) does nothing.

use tracing::{error, info, warn};

use crate::error::EngineError;
use crate::geo::{CoordinateKey, LatLng};
use crate::net::types::{Category, MarkerDto, NewCommentDto, UserDto};
use crate::services::expiration;
use crate::state::marker::MarkerRecord;
use crate::state::surface::{SurfaceOp, ViewKind};
use crate::state::ui::{DropMode, GUIDE_REQUEST_FAILED};
use crate::state::{AppState, MapSession};

// =============================================================================
// INSTALL
// =============================================================================

/// Insert `record` and start its countdown if it has a lifetime. Must be
/// called with the session write lock held.
pub(crate) fn install_record(state: &AppState, session: &mut MapSession, record: MarkerRecord) {
    let key = record.key.clone();
    let expires_at = record.expires_at;
    session.insert_record(record);
    if let Some(expires_at) = expires_at {
        let handle = expiration::spawn_countdown(state.clone(), key.clone(), expires_at);
        session.timers.insert(key, handle);
    }
}

// =============================================================================
// LOAD
// =============================================================================

/// Fetch every marker with its main comment and install it on the map.
/// Returns the number of markers installed.
///
/// # Errors
///
/// Returns `Backend` if the marker list cannot be fetched. Failures on
/// individual main comments are logged and the marker is shown without one.
pub async fn load_markers(state: &AppState) -> Result<usize, EngineError> {
    let docs = state.backend.fetch_all_markers().await?;
    let now = state.clock.now_ms();

    let (expired, live): (Vec<MarkerDto>, Vec<MarkerDto>) = docs.into_iter().partition(|d| d.is_expired_at(now));

    let mut records = Vec::with_capacity(live.len());
    for dto in &live {
        let main_comment = match state.backend.fetch_comment(dto.position(), 0).await {
            Ok(comment) => comment,
            Err(e) => {
                warn!(error = %e, topic = %dto.topic, "main comment fetch failed");
                None
            }
        };
        match MarkerRecord::from_dto(dto, main_comment) {
            Ok(record) => records.push(record),
            Err(e) => warn!(error = %e, topic = %dto.topic, "skipping marker with invalid coordinates"),
        }
    }

    let count = records.len();
    {
        let mut session = state.session.write().await;
        for record in records {
            install_record(state, &mut session, record);
        }
    }

    for dto in &expired {
        if let Err(e) = state.backend.delete_marker(dto.position()).await {
            error!(error = %e, topic = %dto.topic, "stale marker delete failed");
        }
    }

    info!(count, expired = expired.len(), "markers loaded");
    Ok(count)
}

// =============================================================================
// LOGIN / LOGOUT / POSITION
// =============================================================================

/// Authenticate and rebuild the map for the new user.
///
/// # Errors
///
/// Returns `InvalidCredentials` when the backend rejects the pair, or
/// `Backend` if authentication or the reload fails.
pub async fn login(state: &AppState, username: &str, password: &str) -> Result<UserDto, EngineError> {
    let user = state
        .backend
        .authenticate(username, password)
        .await?
        .ok_or(EngineError::InvalidCredentials)?;

    {
        let mut session = state.session.write().await;
        session.auth.user = Some(user.clone());
        session.clear_markers();
    }
    info!(user_id = %user.id, "user logged in");

    load_markers(state).await?;
    Ok(user)
}

/// Drop the acting user and rebuild the map.
///
/// # Errors
///
/// Returns `Backend` if the reload fails; the user is logged out regardless.
pub async fn logout(state: &AppState) -> Result<(), EngineError> {
    state.reset_on_logout().await;
    info!("user logged out");
    load_markers(state).await?;
    Ok(())
}

/// Track the user's geolocation and re-centre the map on it.
///
/// # Errors
///
/// Returns `InvalidCoordinate` for non-finite positions.
pub async fn update_position(state: &AppState, position: LatLng) -> Result<(), EngineError> {
    CoordinateKey::from_position(position)?;
    let mut session = state.session.write().await;
    session.auth.position = Some(position);
    session.ui.center = Some(position);
    session.surface.push(SurfaceOp::PanTo(position));
    Ok(())
}

// =============================================================================
// DELETE
// =============================================================================

/// Delete the expanded marker if the acting user owns it.
///
/// # Errors
///
/// `DeleteDisabled` while drop mode is armed, `NothingExpanded`,
/// `Unauthenticated`, `NotOwner`, or `Backend` if the delete request fails
/// (the marker then stays on the map).
pub async fn delete_current(state: &AppState) -> Result<CoordinateKey, EngineError> {
    let (key, position) = {
        let mut session = state.session.write().await;
        if session.ui.drop_mode == DropMode::Armed || !session.ui.delete_enabled {
            return Err(EngineError::DeleteDisabled);
        }
        let record = session.current().ok_or(EngineError::NothingExpanded)?;
        let (key, position, owner) = (record.key.clone(), record.position(), record.owner_id.clone());
        let Some(user_id) = session.auth.user_id().map(str::to_owned) else {
            session.ui.prompt_login();
            return Err(EngineError::Unauthenticated);
        };
        if owner.as_deref() != Some(user_id.as_str()) {
            return Err(EngineError::NotOwner);
        }
        (key, position)
    };

    if let Err(e) = state.backend.delete_marker(position).await {
        warn!(error = %e, key = %key, "marker delete failed");
        state.session.write().await.ui.show_warning(GUIDE_REQUEST_FAILED);
        return Err(e.into());
    }

    state.session.write().await.remove_marker(&key);
    info!(key = %key, "marker deleted by owner");
    Ok(key)
}

// =============================================================================
// COMMENTS
// =============================================================================

/// Fetch every comment of the expanded marker and open the comments panel.
/// Returns the number of comments shown.
///
/// # Errors
///
/// `NothingExpanded`, `MarkerNotFound` if the marker vanished while the
/// request was in flight, or `Backend`.
pub async fn load_comments(state: &AppState) -> Result<usize, EngineError> {
    let (key, position) = {
        let session = state.session.read().await;
        let record = session.current().ok_or(EngineError::NothingExpanded)?;
        (record.key.clone(), record.position())
    };

    let comments = state.backend.fetch_comments(position).await?;
    let count = comments.len();

    let mut session = state.session.write().await;
    let record = session
        .registry
        .lookup_mut(&key)
        .ok_or_else(|| EngineError::MarkerNotFound(key.clone()))?;
    record.replace_comments(comments);
    session.ui.comments_panel_seq += 1;
    Ok(count)
}

/// Append a comment to the expanded marker and refresh its rows.
///
/// # Errors
///
/// `Unauthenticated` (prompts login), `IncompleteForm` for blank content,
/// `NothingExpanded`, `MarkerNotFound`, or `Backend`.
pub async fn add_comment(state: &AppState, content: &str) -> Result<String, EngineError> {
    let content = content.trim();
    let (key, position) = {
        let mut session = state.session.write().await;
        if !session.auth.is_authenticated() {
            session.ui.prompt_login();
            return Err(EngineError::Unauthenticated);
        }
        if content.is_empty() {
            return Err(EngineError::IncompleteForm("comment"));
        }
        let record = session.current().ok_or(EngineError::NothingExpanded)?;
        (record.key.clone(), record.position())
    };

    let created = state
        .backend
        .add_comment(&NewCommentDto {
            content: content.to_owned(),
            lat: position.lat,
            lng: position.lng,
            date: state.clock.now_ms(),
        })
        .await?;
    let comments = state.backend.fetch_comments(position).await?;

    let mut session = state.session.write().await;
    let record = session
        .registry
        .lookup_mut(&key)
        .ok_or_else(|| EngineError::MarkerNotFound(key.clone()))?;
    record.replace_comments(comments);
    info!(key = %key, comment_id = %created.id, "comment added");
    Ok(created.id)
}

// =============================================================================
// CATEGORY FILTER
// =============================================================================

/// Show or hide every marker of `category`. Hidden markers lose their
/// expansion; shown markers come back collapsed.
pub async fn set_category_visible(state: &AppState, category: Category, visible: bool) {
    let mut guard = state.session.write().await;
    let session = &mut *guard;
    if visible {
        session.ui.hidden_categories.remove(&category);
    } else {
        session.ui.hidden_categories.insert(category);
    }

    let mut keys: Vec<CoordinateKey> = session
        .registry
        .records()
        .filter(|r| r.category == category && r.pin.visible != visible)
        .map(|r| r.key.clone())
        .collect();
    keys.sort();

    for key in &keys {
        let Some(record) = session.registry.lookup_mut(key) else {
            continue;
        };
        record.pin.visible = visible;
        session.surface.push(SurfaceOp::SetPinVisible { key: key.clone(), visible });
        if visible {
            record.preview.open = true;
            session.surface.push(SurfaceOp::OpenView { key: key.clone(), view: ViewKind::Preview });
        } else {
            if record.info.open {
                record.info.open = false;
                session.surface.push(SurfaceOp::CloseView { key: key.clone(), view: ViewKind::Info });
            }
            if record.preview.open {
                record.preview.open = false;
                session.surface.push(SurfaceOp::CloseView { key: key.clone(), view: ViewKind::Preview });
            }
            if session.expansion.as_ref() == Some(key) {
                session.expansion = None;
            }
        }
    }
    info!(?category, visible, changed = keys.len(), "category filter applied");
}

#[cfg(test)]
#[path = "markers_test.rs"]
mod tests;

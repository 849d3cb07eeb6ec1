//! Visibility controller: which single marker is expanded.
//!
//! DESIGN
//! ======
//! Each record is Collapsed (preview open, info closed) or Expanded (info
//! open, preview closed). `MapSession::expansion` names the one expanded
//! record. The `*_in` functions work on an already-locked session so other
//! services can expand or collapse as part of a larger mutation; the async
//! wrappers take the lock themselves.
//!
//! INVARIANTS
//! ==========
//! - At most one record is Expanded. `expand` collapses the previous one
//!   before opening the next.
//! - Collapsing a collapsed record emits nothing.
//! - Hidden pins show nothing on hover.
//! - Hover never touches `expansion`. Each hover schedules its own revert;
//!   a revert that finds the hover already cleared does nothing.

use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::EngineError;
use crate::geo::CoordinateKey;
use crate::state::surface::{SurfaceOp, ViewKind};
use crate::state::{AppState, MapSession};

// =============================================================================
// EXPAND / COLLAPSE
// =============================================================================

/// Expand `key`, collapsing whatever was expanded before.
///
/// # Errors
///
/// Returns `MarkerNotFound` if `key` is not on the map or its pin is
/// hidden by the category filter.
pub fn expand_in(session: &mut MapSession, key: &CoordinateKey) -> Result<(), EngineError> {
    let visible = session
        .registry
        .lookup(key)
        .is_some_and(|r| r.pin.visible);
    if !visible {
        return Err(EngineError::MarkerNotFound(key.clone()));
    }

    if let Some(previous) = session.expansion.clone()
        && &previous != key
    {
        collapse_in(session, &previous);
    }

    let Some(record) = session.registry.lookup_mut(key) else {
        return Err(EngineError::MarkerNotFound(key.clone()));
    };
    if !record.info.open {
        record.info.open = true;
        session.surface.push(SurfaceOp::OpenView { key: key.clone(), view: ViewKind::Info });
    }
    if record.preview.open {
        record.preview.open = false;
        session.surface.push(SurfaceOp::CloseView { key: key.clone(), view: ViewKind::Preview });
    }
    let position = record.position();
    session.surface.push(SurfaceOp::PanTo(position));
    session.ui.center = Some(position);
    session.expansion = Some(key.clone());
    Ok(())
}

/// Collapse `key`. Absent keys and already-collapsed records are no-ops.
pub fn collapse_in(session: &mut MapSession, key: &CoordinateKey) {
    if session.expansion.as_ref() == Some(key) {
        session.expansion = None;
    }
    let Some(record) = session.registry.lookup_mut(key) else {
        return;
    };
    if record.info.open {
        record.info.open = false;
        session.surface.push(SurfaceOp::CloseView { key: key.clone(), view: ViewKind::Info });
    }
    if !record.preview.open && record.pin.visible {
        record.preview.open = true;
        session.surface.push(SurfaceOp::OpenView { key: key.clone(), view: ViewKind::Preview });
    }
}

/// Expand the marker at `key`.
///
/// # Errors
///
/// See [`expand_in`].
pub async fn expand(state: &AppState, key: &CoordinateKey) -> Result<(), EngineError> {
    let mut session = state.session.write().await;
    expand_in(&mut session, key)
}

pub async fn collapse(state: &AppState, key: &CoordinateKey) {
    let mut session = state.session.write().await;
    collapse_in(&mut session, key);
}

/// Collapse the current expansion, if any. Returns its key.
pub async fn collapse_current(state: &AppState) -> Option<CoordinateKey> {
    let mut session = state.session.write().await;
    let key = session.expansion.clone()?;
    collapse_in(&mut session, &key);
    Some(key)
}

// =============================================================================
// HOVER
// =============================================================================

/// Show the preview of `key` briefly. The revert fires after
/// `config.hover_revert` regardless of later hovers.
///
/// Returns `None` when `key` is not on the map or its pin is hidden by the
/// category filter.
pub async fn hover(state: &AppState, key: &CoordinateKey) -> Option<JoinHandle<()>> {
    {
        let mut guard = state.session.write().await;
        let session = &mut *guard;
        let record = session.registry.lookup_mut(key)?;
        if !record.pin.visible {
            return None;
        }
        record.hover_preview = true;
        if !record.preview.open {
            session.surface.push(SurfaceOp::OpenView { key: key.clone(), view: ViewKind::Preview });
        }
    }

    let state = state.clone();
    let key = key.clone();
    Some(tokio::spawn(async move {
        tokio::time::sleep(state.config.hover_revert).await;
        end_hover(&state, &key).await;
    }))
}

async fn end_hover(state: &AppState, key: &CoordinateKey) {
    let mut guard = state.session.write().await;
    let session = &mut *guard;
    let Some(record) = session.registry.lookup_mut(key) else {
        return;
    };
    if !record.hover_preview {
        return;
    }
    record.hover_preview = false;
    if !record.preview.open {
        session.surface.push(SurfaceOp::CloseView { key: key.clone(), view: ViewKind::Preview });
    }
    debug!(key = %key, "hover preview reverted");
}

#[cfg(test)]
#[path = "visibility_test.rs"]
mod tests;

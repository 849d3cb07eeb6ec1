//! Vote/score synchronizer.
//!
//! DESIGN
//! ======
//! A user's vote on a comment is one backend document per
//! (comment, user), score in {-1, 0, 1}; no document means 0. The comment's
//! aggregate score is maintained incrementally: every accepted click moves
//! it by exactly the click's delta, locally and then on the backend.
//!
//! ```text
//!   fetch_vote ──> none            ──> create_vote(delta)        ──> score += delta
//!              ──> same as delta   ──> highlight only (no double count)
//!              ──> otherwise       ──> update_vote(prev + delta) ──> score += delta
//! ```
//!
//! The session lock is released across every backend call. The local
//! update is applied only after the vote write succeeds; the aggregate
//! update that follows is best effort. The in-flight entry for a
//! (comment, user) pair is owned by an `InFlightVote` guard, so it is
//! released even when the caller drops the vote future mid-request.
//!
//! ERROR HANDLING
//! ==============
//! Auth and proximity checks run before any request and leave state
//! untouched. A failed fetch or vote write changes nothing locally. A
//! failed aggregate update is logged; the local score is not rolled back
//! and the server aggregate is not resynced.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::geo::{CoordinateKey, LatLng};
use crate::net::types::VoteDto;
use crate::state::{AppState, MapSession};
use crate::state::ui::{GUIDE_POSITION_UNKNOWN, GUIDE_TOO_FAR_TO_VOTE};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    #[must_use]
    pub fn delta(self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First vote by this user; the aggregate moved by the delta.
    Created,
    /// Existing vote moved toward the delta; the aggregate moved with it.
    Changed,
    /// The user already voted this way.
    Unchanged,
    /// Another vote by this user on this comment is still in flight.
    InFlight,
    /// The marker left the map while the vote was in flight.
    MarkerGone,
}

/// Everything a vote needs, captured under one read of the session.
struct VoteTarget {
    key: CoordinateKey,
    position: LatLng,
    index: u32,
    comment_id: String,
    user_id: String,
}

// =============================================================================
// APPLY
// =============================================================================

/// Apply one vote click by the acting user on `comment_id` of marker `key`.
///
/// # Errors
///
/// `Unauthenticated` (login prompted), `PositionUnknown` or `OutOfRange`
/// (guide warning shown), `MarkerNotFound` / `CommentNotFound`, or
/// `Backend` if the vote lookup or write fails.
pub async fn apply_vote(
    state: &AppState,
    key: &CoordinateKey,
    comment_id: &str,
    direction: VoteDirection,
) -> Result<VoteOutcome, EngineError> {
    let target = check_vote(state, key, comment_id).await?;

    let Some(_in_flight) = InFlightVote::claim(state, &target).await else {
        return Ok(VoteOutcome::InFlight);
    };
    sync_vote(state, &target, direction.delta()).await
}

/// Membership in `MapSession::votes_in_flight`, released on drop.
struct InFlightVote {
    session: Arc<RwLock<MapSession>>,
    pair: (String, String),
}

impl InFlightVote {
    async fn claim(state: &AppState, target: &VoteTarget) -> Option<Self> {
        let pair = (target.comment_id.clone(), target.user_id.clone());
        if !state
            .session
            .write()
            .await
            .votes_in_flight
            .insert(pair.clone())
        {
            return None;
        }
        Some(Self { session: Arc::clone(&state.session), pair })
    }
}

impl Drop for InFlightVote {
    fn drop(&mut self) {
        let pair = std::mem::take(&mut self.pair);
        if let Ok(mut session) = self.session.try_write() {
            session.votes_in_flight.remove(&pair);
            return;
        }
        // Lock busy: finish the release once it frees up.
        let session = Arc::clone(&self.session);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    session.write().await.votes_in_flight.remove(&pair);
                });
            }
            Err(_) => debug!(comment_id = %pair.0, "vote guard dropped outside the runtime"),
        }
    }
}

/// Auth, proximity, and existence checks. Rejections surface a prompt or
/// guide message and change nothing else.
async fn check_vote(state: &AppState, key: &CoordinateKey, comment_id: &str) -> Result<VoteTarget, EngineError> {
    let mut session = state.session.write().await;

    let Some(user_id) = session.auth.user_id().map(str::to_owned) else {
        session.ui.prompt_login();
        return Err(EngineError::Unauthenticated);
    };

    let record = session
        .registry
        .lookup(key)
        .ok_or_else(|| EngineError::MarkerNotFound(key.clone()))?;
    let position = record.position();
    let index = record
        .comment(comment_id)
        .map(|c| c.index)
        .ok_or_else(|| EngineError::CommentNotFound(comment_id.to_owned()))?;

    let Some(user_at) = session.auth.position else {
        session.ui.show_warning(GUIDE_POSITION_UNKNOWN);
        return Err(EngineError::PositionUnknown);
    };
    let radius_m = state.config.vote_radius_m;
    if !user_at.within(&position, radius_m) {
        session.ui.show_warning(GUIDE_TOO_FAR_TO_VOTE);
        return Err(EngineError::OutOfRange { distance_m: user_at.distance_m(&position), radius_m });
    }

    Ok(VoteTarget { key: key.clone(), position, index, comment_id: comment_id.to_owned(), user_id })
}

async fn sync_vote(state: &AppState, target: &VoteTarget, delta: i8) -> Result<VoteOutcome, EngineError> {
    let existing = state
        .backend
        .fetch_vote(&target.comment_id, &target.user_id)
        .await?;

    let (next, created) = match existing {
        None => (delta, true),
        Some(vote) if vote.score == delta => return Ok(highlight_stored(state, target, vote.score).await),
        Some(vote) => ((vote.score + delta).clamp(-1, 1), false),
    };

    if !comment_on_map(state, target).await {
        return Ok(VoteOutcome::MarkerGone);
    }

    let vote = VoteDto { comment_id: target.comment_id.clone(), user_id: target.user_id.clone(), score: next };
    if created {
        state.backend.create_vote(&vote).await?;
    } else {
        state.backend.update_vote(&vote).await?;
    }

    let aggregate = {
        let mut session = state.session.write().await;
        let Some(row) = session
            .registry
            .lookup_mut(&target.key)
            .and_then(|r| r.comment_mut(&target.comment_id))
        else {
            return Ok(VoteOutcome::MarkerGone);
        };
        row.score += i64::from(delta);
        row.up_active = next == 1;
        row.down_active = next == -1;
        row.score
    };

    if let Err(e) = state
        .backend
        .update_comment_score(target.position, target.index, aggregate)
        .await
    {
        warn!(error = %e, key = %target.key, comment_id = %target.comment_id, "score update failed");
    }

    info!(
        key = %target.key,
        comment_id = %target.comment_id,
        user_id = %target.user_id,
        vote = next,
        score = aggregate,
        "vote applied"
    );
    Ok(if created { VoteOutcome::Created } else { VoteOutcome::Changed })
}

/// Align the row's controls with a stored vote that the click leaves as is.
/// The score is not touched.
async fn highlight_stored(state: &AppState, target: &VoteTarget, stored: i8) -> VoteOutcome {
    let mut session = state.session.write().await;
    let Some(row) = session
        .registry
        .lookup_mut(&target.key)
        .and_then(|r| r.comment_mut(&target.comment_id))
    else {
        return VoteOutcome::MarkerGone;
    };
    row.up_active = stored == 1;
    row.down_active = stored == -1;
    VoteOutcome::Unchanged
}

async fn comment_on_map(state: &AppState, target: &VoteTarget) -> bool {
    state
        .session
        .read()
        .await
        .registry
        .lookup(&target.key)
        .is_some_and(|r| r.comment(&target.comment_id).is_some())
}

#[cfg(test)]
#[path = "vote_test.rs"]
mod tests;

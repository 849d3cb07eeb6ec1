use super::*;
use crate::net::memory::MemoryBackend;
use crate::state::test_helpers::{act_as, record_at, seed_record, test_app_state, user};
use crate::state::ui::NoticeTone;

const HOME: LatLng = LatLng::new(32.88, -117.23);
/// About 55m from `HOME`.
const NEARBY: LatLng = LatLng::new(32.8805, -117.23);
/// About 1.1km from `HOME`.
const FAR_AWAY: LatLng = LatLng::new(32.89, -117.23);

async fn armed_state() -> (AppState, std::sync::Arc<MemoryBackend>) {
    let (state, backend) = test_app_state();
    act_as(&state, &user("u1"), HOME.lat, HOME.lng).await;
    toggle_drop(&state).await.unwrap();
    (state, backend)
}

fn form(topic: &str, comment: &str) -> DropForm {
    DropForm { topic: topic.into(), category: Category::Food, comment: comment.into(), lifetime: None }
}

// =============================================================================
// toggle_drop
// =============================================================================

#[tokio::test]
async fn unauthenticated_arming_stays_idle_and_prompts() {
    let (state, _backend) = test_app_state();

    let err = toggle_drop(&state).await.unwrap_err();

    assert!(matches!(err, EngineError::Unauthenticated));
    let session = state.session.read().await;
    assert_eq!(session.ui.drop_mode, DropMode::Idle);
    assert_eq!(session.ui.login_prompt_seq, 1);
    assert!(!session.ui.drop_radius_visible);
}

#[tokio::test]
async fn arming_shows_radius_and_disables_delete() {
    let (state, _backend) = test_app_state();
    act_as(&state, &user("u1"), HOME.lat, HOME.lng).await;

    assert_eq!(toggle_drop(&state).await.unwrap(), DropMode::Armed);

    let ops = state.drain_surface().await;
    assert!(ops.contains(&SurfaceOp::PanTo(HOME)));
    assert!(ops.contains(&SurfaceOp::SetZoom(18)));
    assert!(ops.contains(&SurfaceOp::SetDropRadiusVisible(true)));
    let session = state.session.read().await;
    assert_eq!(session.ui.drop_mode, DropMode::Armed);
    assert!(session.ui.drop_radius_visible);
    assert!(!session.ui.delete_enabled);
    assert_eq!(session.ui.zoom, 18);
    assert_eq!(session.ui.guide.as_ref().map(|n| n.text.as_str()), Some(GUIDE_DROP_HERE));
}

#[tokio::test]
async fn toggling_again_cancels() {
    let (state, _backend) = armed_state().await;

    assert_eq!(toggle_drop(&state).await.unwrap(), DropMode::Idle);

    let session = state.session.read().await;
    assert_eq!(session.ui.drop_mode, DropMode::Idle);
    assert!(!session.ui.drop_radius_visible);
    assert!(session.ui.delete_enabled);
    assert!(session.ui.guide.is_none());
}

// =============================================================================
// set_zoom
// =============================================================================

#[tokio::test]
async fn zooming_out_while_armed_hides_radius_but_stays_armed() {
    let (state, _backend) = armed_state().await;

    set_zoom(&state, 15).await;

    let session = state.session.read().await;
    assert_eq!(session.ui.drop_mode, DropMode::Armed);
    assert!(!session.ui.drop_radius_visible);
    let guide = session.ui.guide.as_ref().unwrap();
    assert_eq!(guide.tone, NoticeTone::Warning);
    assert_eq!(guide.text, GUIDE_ZOOMED_OUT);
}

#[tokio::test]
async fn zooming_back_in_restores_radius() {
    let (state, _backend) = armed_state().await;
    set_zoom(&state, 15).await;
    state.drain_surface().await;

    set_zoom(&state, 17).await;

    assert_eq!(state.drain_surface().await, vec![SurfaceOp::SetDropRadiusVisible(true)]);
    let session = state.session.read().await;
    assert!(session.ui.drop_radius_visible);
    assert_eq!(session.ui.guide.as_ref().map(|n| n.tone), Some(NoticeTone::Guide));
}

#[tokio::test]
async fn zoom_while_idle_only_updates_icon() {
    let (state, _backend) = test_app_state();

    set_zoom(&state, 21).await;

    let session = state.session.read().await;
    assert_eq!(session.ui.zoom, 21);
    assert_eq!(session.ui.user_icon, UserIconSize::Large);
    assert!(session.ui.guide.is_none());
    assert!(session.surface.pending().is_empty());
}

// =============================================================================
// map_click
// =============================================================================

#[tokio::test]
async fn idle_surface_click_collapses_current() {
    let (state, _backend) = test_app_state();
    let key = seed_record(&state, record_at(1.0, 1.0, "a")).await;
    visibility::expand(&state, &key).await.unwrap();

    let outcome = map_click(&state, MapClick::Surface(LatLng::new(5.0, 5.0))).await.unwrap();

    assert_eq!(outcome, ClickOutcome::Collapsed(Some(key.clone())));
    let session = state.session.read().await;
    assert!(session.expansion.is_none());
    assert!(!session.registry.lookup(&key).unwrap().is_expanded());
}

#[tokio::test]
async fn idle_radius_click_is_ignored() {
    let (state, _backend) = test_app_state();
    let outcome = map_click(&state, MapClick::DropRadius(HOME)).await.unwrap();
    assert_eq!(outcome, ClickOutcome::Ignored);
}

#[tokio::test]
async fn armed_surface_click_is_rejected_without_state_change() {
    let (state, _backend) = armed_state().await;

    let outcome = map_click(&state, MapClick::Surface(FAR_AWAY)).await.unwrap();

    assert_eq!(outcome, ClickOutcome::Rejected);
    let session = state.session.read().await;
    assert_eq!(session.ui.drop_mode, DropMode::Armed);
    assert!(session.ui.pending_drop.is_none());
    assert_eq!(session.ui.drop_form_seq, 0);
    assert_eq!(session.ui.guide, Some(crate::state::ui::Notice::warning(GUIDE_WRONG_AREA)));
}

#[tokio::test]
async fn armed_radius_click_opens_form() {
    let (state, _backend) = armed_state().await;

    let outcome = map_click(&state, MapClick::DropRadius(NEARBY)).await.unwrap();

    assert_eq!(outcome, ClickOutcome::DropSelected);
    let session = state.session.read().await;
    assert_eq!(session.ui.pending_drop, Some(NEARBY));
    assert_eq!(session.ui.drop_form_seq, 1);
    assert_eq!(session.ui.guide.as_ref().map(|n| n.text.as_str()), Some(GUIDE_NEXT_MOVE));
}

#[tokio::test]
async fn armed_radius_click_outside_radius_is_out_of_range() {
    let (state, _backend) = armed_state().await;

    let err = map_click(&state, MapClick::DropRadius(FAR_AWAY)).await.unwrap_err();

    assert!(matches!(err, EngineError::OutOfRange { .. }));
    assert!(state.session.read().await.ui.pending_drop.is_none());
}

#[tokio::test]
async fn armed_radius_click_zoomed_out_is_refused() {
    let (state, _backend) = armed_state().await;
    set_zoom(&state, 12).await;

    let err = map_click(&state, MapClick::DropRadius(NEARBY)).await.unwrap_err();

    assert!(matches!(err, EngineError::TooFarZoomedOut { zoom: 12, min: 17 }));
    assert!(state.session.read().await.ui.pending_drop.is_none());
}

// =============================================================================
// submit_drop
// =============================================================================

#[tokio::test]
async fn submit_creates_expands_and_disarms() {
    let (state, backend) = armed_state().await;
    map_click(&state, MapClick::DropRadius(NEARBY)).await.unwrap();

    let key = submit_drop(&state, form("Free pizza", "Come get it")).await.unwrap();

    let stored = backend.markers();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].topic, "Free pizza");
    assert_eq!(stored[0].owner_id.as_deref(), Some("u1"));
    assert_eq!(backend.comments_at(NEARBY)[0].content, "Come get it");

    let session = state.session.read().await;
    assert_eq!(session.expansion.as_ref(), Some(&key));
    let record = session.registry.lookup(&key).unwrap();
    assert!(record.is_expanded());
    assert_eq!(record.main_comment().map(|c| c.content.as_str()), Some("Come get it"));
    assert_eq!(session.ui.drop_mode, DropMode::Idle);
    assert!(session.ui.pending_drop.is_none());
    assert!(session.ui.delete_enabled);
}

#[tokio::test(start_paused = true)]
async fn submit_with_lifetime_starts_countdown() {
    let (state, backend) = armed_state().await;
    map_click(&state, MapClick::DropRadius(NEARBY)).await.unwrap();
    let mut drop_form = form("Garage sale", "Today only");
    drop_form.lifetime = Some(Duration::from_secs(2));

    let key = submit_drop(&state, drop_form).await.unwrap();
    assert_eq!(crate::services::expiration::active_countdowns(&state).await, 1);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    let session = state.session.read().await;
    assert!(!session.registry.contains(&key));
    assert!(session.expansion.is_none());
    assert_eq!(backend.deleted(), vec![NEARBY]);
}

#[tokio::test]
async fn submit_blank_topic_is_incomplete() {
    let (state, backend) = armed_state().await;
    map_click(&state, MapClick::DropRadius(NEARBY)).await.unwrap();

    let err = submit_drop(&state, form("   ", "hi")).await.unwrap_err();

    assert!(matches!(err, EngineError::IncompleteForm("topic")));
    assert!(backend.markers().is_empty());
    assert_eq!(state.session.read().await.ui.drop_mode, DropMode::Armed);
}

#[tokio::test]
async fn submit_blank_comment_is_incomplete() {
    let (state, _backend) = armed_state().await;
    map_click(&state, MapClick::DropRadius(NEARBY)).await.unwrap();

    let err = submit_drop(&state, form("Topic", "")).await.unwrap_err();
    assert!(matches!(err, EngineError::IncompleteForm("comment")));
}

#[tokio::test]
async fn submit_requires_armed_and_pending_location() {
    let (state, _backend) = test_app_state();
    act_as(&state, &user("u1"), HOME.lat, HOME.lng).await;
    let err = submit_drop(&state, form("t", "c")).await.unwrap_err();
    assert!(matches!(err, EngineError::NotArmed));

    toggle_drop(&state).await.unwrap();
    let err = submit_drop(&state, form("t", "c")).await.unwrap_err();
    assert!(matches!(err, EngineError::NoPendingDrop));
}

#[tokio::test(start_paused = true)]
async fn double_submit_creates_one_marker() {
    let (state, backend) = armed_state().await;
    map_click(&state, MapClick::DropRadius(NEARBY)).await.unwrap();
    backend.set_latency(Duration::from_millis(50));

    let (first, second) = tokio::join!(
        submit_drop(&state, form("Free pizza", "Come get it")),
        submit_drop(&state, form("Free pizza", "Come get it")),
    );

    let key = first.unwrap();
    assert!(matches!(second, Err(EngineError::NoPendingDrop)));
    assert_eq!(backend.markers().len(), 1);
    let indexes: Vec<u32> = backend.comments_at(NEARBY).iter().map(|c| c.index).collect();
    assert_eq!(indexes, vec![0]);
    let session = state.session.read().await;
    let record = session.registry.lookup(&key).unwrap();
    assert_eq!(record.main_comment().map(|c| c.index), Some(0));
    assert_eq!(session.ui.drop_mode, DropMode::Idle);
}

#[tokio::test]
async fn submit_backend_failure_keeps_drop_armed() {
    let (state, backend) = armed_state().await;
    map_click(&state, MapClick::DropRadius(NEARBY)).await.unwrap();
    backend.set_offline(true);

    let err = submit_drop(&state, form("t", "c")).await.unwrap_err();

    assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    let session = state.session.read().await;
    assert_eq!(session.ui.drop_mode, DropMode::Armed);
    assert_eq!(session.ui.pending_drop, Some(NEARBY));
    assert!(session.registry.is_empty());
}

use std::time::Duration;

use super::*;
use crate::state::test_helpers::{act_as, seed_marker, test_app_state, user};
use crate::state::ui::NoticeTone;

const LAT: f64 = 32.87;
const LNG: f64 = -117.22;

async fn row(state: &AppState, key: &CoordinateKey, comment_id: &str) -> (i64, bool, bool) {
    let session = state.session.read().await;
    let row = session
        .registry
        .lookup(key)
        .and_then(|r| r.comment(comment_id))
        .unwrap();
    (row.score, row.up_active, row.down_active)
}

// =============================================================================
// synchronization
// =============================================================================

#[tokio::test]
async fn first_upvote_creates_vote_and_highlights_up() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;

    let outcome = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();

    assert_eq!(outcome, VoteOutcome::Created);
    assert_eq!(row(&state, &key, &comment_id).await, (1, true, false));
    assert_eq!(backend.vote(&comment_id, "u1").map(|v| v.score), Some(1));
    assert_eq!(backend.score_updates(), vec![(LatLng::new(LAT, LNG), 0, 1)]);
}

#[tokio::test]
async fn repeated_upvote_does_not_double_count() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;

    apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();
    for _ in 0..3 {
        let outcome = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::Unchanged);
    }

    assert_eq!(row(&state, &key, &comment_id).await, (1, true, false));
    assert_eq!(backend.score_updates().len(), 1);
}

#[tokio::test]
async fn stored_upvote_repeated_lights_up_control_without_scoring() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;
    backend.insert_vote(VoteDto { comment_id: comment_id.clone(), user_id: "u1".into(), score: 1 });
    assert_eq!(row(&state, &key, &comment_id).await, (0, false, false));

    let outcome = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();

    assert_eq!(outcome, VoteOutcome::Unchanged);
    assert_eq!(row(&state, &key, &comment_id).await, (0, true, false));
    assert!(backend.score_updates().is_empty());
}

#[tokio::test]
async fn stored_downvote_repeated_lights_down_control() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;
    backend.insert_vote(VoteDto { comment_id: comment_id.clone(), user_id: "u1".into(), score: -1 });

    let outcome = apply_vote(&state, &key, &comment_id, VoteDirection::Down)
        .await
        .unwrap();

    assert_eq!(outcome, VoteOutcome::Unchanged);
    assert_eq!(row(&state, &key, &comment_id).await, (0, false, true));
    assert_eq!(backend.vote(&comment_id, "u1").map(|v| v.score), Some(-1));
}

#[tokio::test]
async fn upvote_then_downvote_returns_to_starting_score() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;

    apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();
    let outcome = apply_vote(&state, &key, &comment_id, VoteDirection::Down)
        .await
        .unwrap();

    assert_eq!(outcome, VoteOutcome::Changed);
    assert_eq!(row(&state, &key, &comment_id).await, (0, false, false));
    assert_eq!(backend.vote(&comment_id, "u1").map(|v| v.score), Some(0));
}

#[tokio::test]
async fn neutral_vote_moves_to_down() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;
    backend.insert_vote(VoteDto { comment_id: comment_id.clone(), user_id: "u1".into(), score: 0 });

    let outcome = apply_vote(&state, &key, &comment_id, VoteDirection::Down)
        .await
        .unwrap();

    assert_eq!(outcome, VoteOutcome::Changed);
    assert_eq!(row(&state, &key, &comment_id).await, (-1, false, true));
    assert_eq!(backend.vote(&comment_id, "u1").map(|v| v.score), Some(-1));
}

#[tokio::test]
async fn downvote_to_neutral_clears_down_without_activating_up() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;

    apply_vote(&state, &key, &comment_id, VoteDirection::Down)
        .await
        .unwrap();
    assert_eq!(row(&state, &key, &comment_id).await, (-1, false, true));

    apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();
    assert_eq!(row(&state, &key, &comment_id).await, (0, false, false));
}

#[tokio::test]
async fn votes_from_two_users_accumulate() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;

    act_as(&state, &user("u1"), LAT, LNG).await;
    apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();
    act_as(&state, &user("u2"), LAT, LNG).await;
    apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();

    assert_eq!(row(&state, &key, &comment_id).await.0, 2);
}

// =============================================================================
// rejections
// =============================================================================

#[tokio::test]
async fn unauthenticated_vote_prompts_login() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;

    let err = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Unauthenticated));
    assert_eq!(state.session.read().await.ui.login_prompt_seq, 1);
    assert_eq!(row(&state, &key, &comment_id).await, (0, false, false));
}

#[tokio::test]
async fn vote_far_from_marker_is_out_of_range() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT + 0.05, LNG).await;

    let err = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::OutOfRange { .. }));
    let guide = state.session.read().await.ui.guide.clone().unwrap();
    assert_eq!(guide.tone, NoticeTone::Warning);
    assert_eq!(guide.text, GUIDE_TOO_FAR_TO_VOTE);
    assert!(backend.vote(&comment_id, "u1").is_none());
}

#[tokio::test]
async fn vote_without_position_is_refused() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    state.session.write().await.auth.user = Some(user("u1"));

    let err = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::PositionUnknown));
    assert!(backend.vote(&comment_id, "u1").is_none());
}

#[tokio::test]
async fn unknown_comment_is_rejected() {
    let (state, backend) = test_app_state();
    let (key, _) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;

    let err = apply_vote(&state, &key, "nope", VoteDirection::Up)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CommentNotFound(_)));
}

#[tokio::test]
async fn vote_in_flight_is_not_repeated() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;
    state
        .session
        .write()
        .await
        .votes_in_flight
        .insert((comment_id.clone(), "u1".to_owned()));

    let outcome = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();

    assert_eq!(outcome, VoteOutcome::InFlight);
    assert!(backend.vote(&comment_id, "u1").is_none());
}

// =============================================================================
// backend failures
// =============================================================================

#[tokio::test]
async fn backend_failure_leaves_local_state_and_releases_guard() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;
    backend.set_offline(true);

    let err = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Backend(_)));
    assert_eq!(row(&state, &key, &comment_id).await, (0, false, false));
    assert!(state.session.read().await.votes_in_flight.is_empty());

    backend.set_offline(false);
    let outcome = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();
    assert_eq!(outcome, VoteOutcome::Created);
}

#[tokio::test(start_paused = true)]
async fn abandoned_vote_releases_in_flight_entry() {
    let (state, backend) = test_app_state();
    let (key, comment_id) = seed_marker(&state, &backend, LAT, LNG, None).await;
    act_as(&state, &user("u1"), LAT, LNG).await;
    backend.set_latency(Duration::from_millis(100));

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        apply_vote(&state, &key, &comment_id, VoteDirection::Up),
    )
    .await;
    assert!(abandoned.is_err());
    tokio::task::yield_now().await;
    assert!(state.session.read().await.votes_in_flight.is_empty());

    let outcome = apply_vote(&state, &key, &comment_id, VoteDirection::Up)
        .await
        .unwrap();
    assert_eq!(outcome, VoteOutcome::Created);
}

#[test]
fn direction_deltas() {
    assert_eq!(VoteDirection::Up.delta(), 1);
    assert_eq!(VoteDirection::Down.delta(), -1);
}

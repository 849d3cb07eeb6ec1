//! In-process backend.
//!
//! DESIGN
//! ======
//! Holds marker, comment, vote, and user documents in a mutex-guarded store
//! with the same matching rules as the document backend (markers and
//! comments are matched by exact coordinates). It backs the `memory`
//! backend mode of the binary and doubles as the test backend: every
//! deletion is recorded, the whole store can be switched offline to
//! exercise failure paths, and every call can be given a fixed latency so
//! overlapping requests actually overlap.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::api::{Backend, BackendError};
use super::types::{Category, CommentDto, MarkerDto, NewCommentDto, UserDto, VoteDto};
use crate::clock::Timestamp;
use crate::geo::LatLng;

#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<MemoryStore>,
}

#[derive(Default)]
struct MemoryStore {
    markers: Vec<MarkerDto>,
    comments: Vec<CommentDto>,
    /// Votes keyed by (`comment_id`, `user_id`).
    votes: HashMap<(String, String), VoteDto>,
    /// (user, password) pairs.
    users: Vec<(UserDto, String)>,
    offline: bool,
    latency: Option<Duration>,
    deleted: Vec<LatLng>,
    score_updates: Vec<(LatLng, u32, i64)>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the demo fixtures: two markers with a main
    /// comment each, and two users.
    #[must_use]
    pub fn seeded(now: Timestamp) -> Self {
        let backend = Self::new();
        let fixtures = [
            ("Pizza Hut", Category::Food, 32.869_864_595_442_8, -117.221_894_860_267_64, "It's great"),
            ("Geisel 1st Floor", Category::Event, 32.879_964_595_442_8, -117.221_994_860_267_61, "Amazing"),
        ];
        for (topic, category, lat, lng, comment) in fixtures {
            backend.insert_marker(MarkerDto {
                topic: topic.to_owned(),
                category,
                lat,
                lng,
                owner_id: None,
                created_at: now,
                expires_at: None,
                num_comments: 0,
            });
            backend.insert_comment(LatLng::new(lat, lng), comment, now);
        }
        backend.insert_user("Phillip", "boom");
        backend.insert_user("Ricky", "mongo");
        backend
    }

    fn store(&self) -> MutexGuard<'_, MemoryStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for the configured latency, if any. The store lock is not held.
    async fn delay(&self) {
        let latency = self.store().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn online(&self) -> Result<MutexGuard<'_, MemoryStore>, BackendError> {
        let store = self.store();
        if store.offline {
            return Err(BackendError::Unavailable);
        }
        Ok(store)
    }

    // =========================================================================
    // SEEDING / INSPECTION
    // =========================================================================

    pub fn insert_marker(&self, marker: MarkerDto) {
        self.store().markers.push(marker);
    }

    /// Append a comment at the marker's next index and return it.
    pub fn insert_comment(&self, at: LatLng, content: &str, date: Timestamp) -> CommentDto {
        self.store().append_comment(at, content, date)
    }

    /// Register a user and return it.
    pub fn insert_user(&self, username: &str, password: &str) -> UserDto {
        let user = UserDto { id: Uuid::new_v4().to_string(), username: username.to_owned() };
        self.store().users.push((user.clone(), password.to_owned()));
        user
    }

    pub fn insert_vote(&self, vote: VoteDto) {
        self.store()
            .votes
            .insert((vote.comment_id.clone(), vote.user_id.clone()), vote);
    }

    /// Make every subsequent call fail with `Unavailable` until turned back on.
    pub fn set_offline(&self, offline: bool) {
        self.store().offline = offline;
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.store().latency = Some(latency);
    }

    #[must_use]
    pub fn markers(&self) -> Vec<MarkerDto> {
        self.store().markers.clone()
    }

    #[must_use]
    pub fn comments_at(&self, at: LatLng) -> Vec<CommentDto> {
        self.store().comments_at(at)
    }

    #[must_use]
    pub fn vote(&self, comment_id: &str, user_id: &str) -> Option<VoteDto> {
        self.store()
            .votes
            .get(&(comment_id.to_owned(), user_id.to_owned()))
            .cloned()
    }

    /// Positions passed to `delete_marker`, in call order.
    #[must_use]
    pub fn deleted(&self) -> Vec<LatLng> {
        self.store().deleted.clone()
    }

    /// `(position, index, score)` passed to `update_comment_score`, in call order.
    #[must_use]
    pub fn score_updates(&self) -> Vec<(LatLng, u32, i64)> {
        self.store().score_updates.clone()
    }
}

impl MemoryStore {
    fn comments_at(&self, at: LatLng) -> Vec<CommentDto> {
        let mut found: Vec<CommentDto> = self
            .comments
            .iter()
            .filter(|c| same_point(c.lat, c.lng, at))
            .cloned()
            .collect();
        found.sort_by_key(|c| c.index);
        found
    }

    fn append_comment(&mut self, at: LatLng, content: &str, date: Timestamp) -> CommentDto {
        #[allow(clippy::cast_possible_truncation)]
        let index = self
            .comments
            .iter()
            .filter(|c| same_point(c.lat, c.lng, at))
            .count() as u32;
        let comment = CommentDto {
            id: Uuid::new_v4().to_string(),
            content: content.to_owned(),
            score: 0,
            index,
            lat: at.lat,
            lng: at.lng,
            date,
        };
        self.comments.push(comment.clone());
        if let Some(marker) = self
            .markers
            .iter_mut()
            .find(|m| same_point(m.lat, m.lng, at))
        {
            marker.num_comments = index + 1;
        }
        comment
    }
}

#[allow(clippy::float_cmp)]
fn same_point(lat: f64, lng: f64, at: LatLng) -> bool {
    lat == at.lat && lng == at.lng
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn fetch_all_markers(&self) -> Result<Vec<MarkerDto>, BackendError> {
        self.delay().await;
        Ok(self.online()?.markers.clone())
    }

    async fn fetch_marker(&self, at: LatLng) -> Result<Option<MarkerDto>, BackendError> {
        self.delay().await;
        Ok(self
            .online()?
            .markers
            .iter()
            .find(|m| same_point(m.lat, m.lng, at))
            .cloned())
    }

    async fn fetch_comment(&self, at: LatLng, index: u32) -> Result<Option<CommentDto>, BackendError> {
        self.delay().await;
        Ok(self
            .online()?
            .comments_at(at)
            .into_iter()
            .find(|c| c.index == index))
    }

    async fn fetch_comments(&self, at: LatLng) -> Result<Vec<CommentDto>, BackendError> {
        self.delay().await;
        Ok(self.online()?.comments_at(at))
    }

    async fn create_marker(&self, marker: &MarkerDto) -> Result<(), BackendError> {
        self.delay().await;
        self.online()?.markers.push(marker.clone());
        Ok(())
    }

    async fn delete_marker(&self, at: LatLng) -> Result<(), BackendError> {
        self.delay().await;
        let mut store = self.online()?;
        store.deleted.push(at);
        store.markers.retain(|m| !same_point(m.lat, m.lng, at));
        Ok(())
    }

    async fn add_comment(&self, comment: &NewCommentDto) -> Result<CommentDto, BackendError> {
        self.delay().await;
        let at = LatLng::new(comment.lat, comment.lng);
        Ok(self
            .online()?
            .append_comment(at, &comment.content, comment.date))
    }

    async fn update_comment_score(&self, at: LatLng, index: u32, score: i64) -> Result<(), BackendError> {
        self.delay().await;
        let mut store = self.online()?;
        store.score_updates.push((at, index, score));
        if let Some(comment) = store
            .comments
            .iter_mut()
            .find(|c| same_point(c.lat, c.lng, at) && c.index == index)
        {
            comment.score = score;
        }
        Ok(())
    }

    async fn fetch_vote(&self, comment_id: &str, user_id: &str) -> Result<Option<VoteDto>, BackendError> {
        self.delay().await;
        Ok(self
            .online()?
            .votes
            .get(&(comment_id.to_owned(), user_id.to_owned()))
            .cloned())
    }

    async fn create_vote(&self, vote: &VoteDto) -> Result<(), BackendError> {
        self.delay().await;
        self.online()?
            .votes
            .insert((vote.comment_id.clone(), vote.user_id.clone()), vote.clone());
        Ok(())
    }

    async fn update_vote(&self, vote: &VoteDto) -> Result<(), BackendError> {
        self.delay().await;
        let mut store = self.online()?;
        let key = (vote.comment_id.clone(), vote.user_id.clone());
        match store.votes.get_mut(&key) {
            Some(existing) => {
                existing.score = vote.score;
                Ok(())
            }
            None => Err(BackendError::Status { status: 404 }),
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserDto>, BackendError> {
        self.delay().await;
        Ok(self
            .online()?
            .users
            .iter()
            .find(|(user, pw)| user.username == username && pw == password)
            .map(|(user, _)| user.clone()))
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

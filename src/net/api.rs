//! Backend collaborator consumed by the marker engine.
//!
//! DESIGN
//! ======
//! The engine only needs single-shot, request/response operations against
//! the document store. `Backend` is object-safe (via `async_trait`) so the
//! application state can hold an `Arc<dyn Backend>` and tests can substitute
//! an in-process store.
//!
//! ERROR HANDLING
//! ==============
//! Every operation may fail. Callers log and surface failures; nothing here
//! retries.

use async_trait::async_trait;

use super::types::{CommentDto, MarkerDto, NewCommentDto, UserDto, VoteDto};
use crate::geo::LatLng;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The request never produced a response (connect, timeout, I/O).
    #[error("request failed: {0}")]
    Request(String),
    /// The backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status { status: u16 },
    /// The response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),
    /// The backend is unreachable or refused the operation outright.
    #[error("backend unavailable")]
    Unavailable,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// All marker documents.
    async fn fetch_all_markers(&self) -> Result<Vec<MarkerDto>, BackendError>;

    /// The marker document at `at`, if any.
    async fn fetch_marker(&self, at: LatLng) -> Result<Option<MarkerDto>, BackendError>;

    /// The comment with position `index` on the marker at `at`.
    async fn fetch_comment(&self, at: LatLng, index: u32) -> Result<Option<CommentDto>, BackendError>;

    /// All comments of the marker at `at`, ordered by index.
    async fn fetch_comments(&self, at: LatLng) -> Result<Vec<CommentDto>, BackendError>;

    async fn create_marker(&self, marker: &MarkerDto) -> Result<(), BackendError>;

    async fn delete_marker(&self, at: LatLng) -> Result<(), BackendError>;

    /// Append a comment; the backend assigns its id and next index.
    async fn add_comment(&self, comment: &NewCommentDto) -> Result<CommentDto, BackendError>;

    /// Overwrite the aggregate score of one comment.
    async fn update_comment_score(&self, at: LatLng, index: u32, score: i64) -> Result<(), BackendError>;

    async fn fetch_vote(&self, comment_id: &str, user_id: &str) -> Result<Option<VoteDto>, BackendError>;

    async fn create_vote(&self, vote: &VoteDto) -> Result<(), BackendError>;

    async fn update_vote(&self, vote: &VoteDto) -> Result<(), BackendError>;

    /// Check credentials; `None` when they do not match a user.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserDto>, BackendError>;
}

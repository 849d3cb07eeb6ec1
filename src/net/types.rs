//! Wire types exchanged with the marker backend.
//!
//! DESIGN
//! ======
//! Field names follow the backing document store (`topic`, `type`, `lat`,
//! `lng`, `score`, `index`, ...) so the same structs serve the HTTP adapter
//! and the in-process backend. Timestamps are unix milliseconds.

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::geo::{CoordinateKey, GeoError, LatLng};

// =============================================================================
// CATEGORY
// =============================================================================

/// Marker category, chosen when the marker is dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Event,
    Sales,
    #[default]
    #[serde(other)]
    Other,
}

impl Category {
    /// Categories offered by the type filter, in display order.
    pub const FILTERABLE: [Category; 3] = [Category::Food, Category::Event, Category::Sales];

    /// Pin icon for this category.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Food => "img/cow-food.png",
            Self::Event => "img/cow-event.png",
            Self::Sales => "img/cow-sales.png",
            Self::Other => "img/cow.png",
        }
    }
}

// =============================================================================
// MARKERS
// =============================================================================

/// A marker document as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerDto {
    pub topic: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub num_comments: u32,
}

impl MarkerDto {
    #[must_use]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Registry key for this marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored coordinates are not finite.
    pub fn key(&self) -> Result<CoordinateKey, GeoError> {
        CoordinateKey::from_coords(self.lat, self.lng)
    }

    /// Whether the marker's lifetime has elapsed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// =============================================================================
// COMMENTS
// =============================================================================

/// A comment attached to a marker. Index 0 is the marker's main comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: String,
    pub content: String,
    pub score: i64,
    pub index: u32,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub date: Timestamp,
}

/// Payload for creating a comment; the backend assigns id and index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentDto {
    pub content: String,
    pub lat: f64,
    pub lng: f64,
    pub date: Timestamp,
}

// =============================================================================
// VOTES
// =============================================================================

/// One user's vote on one comment. A missing vote means score 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDto {
    pub comment_id: String,
    pub user_id: String,
    pub score: i8,
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: String,
    pub username: String,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

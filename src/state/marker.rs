//! Marker records: one pin, its two overlay views, and its comment rows.

use crate::clock::Timestamp;
use crate::geo::{CoordinateKey, GeoError, LatLng};
use crate::net::types::{Category, CommentDto, MarkerDto};

use super::surface::ViewKind;

/// The drawable map pin of a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub position: LatLng,
    pub icon: &'static str,
    /// False while the marker's category is filtered out.
    pub visible: bool,
}

/// Display state of one overlay view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    pub kind: ViewKind,
    pub open: bool,
}

/// One comment as displayed, with the vote controls for the acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRow {
    pub id: String,
    pub index: u32,
    pub content: String,
    /// Aggregate score as displayed; maintained incrementally by votes.
    pub score: i64,
    pub up_active: bool,
    pub down_active: bool,
}

impl From<CommentDto> for CommentRow {
    fn from(dto: CommentDto) -> Self {
        Self {
            id: dto.id,
            index: dto.index,
            content: dto.content,
            score: dto.score,
            up_active: false,
            down_active: false,
        }
    }
}

/// Everything the map shows for one coordinate key.
///
/// New records start Collapsed: preview open, info closed.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRecord {
    pub key: CoordinateKey,
    pub pin: Pin,
    pub info: View,
    pub preview: View,
    /// Transient hover presentation, independent of Collapsed/Expanded.
    pub hover_preview: bool,
    pub owner_id: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub topic: String,
    pub category: Category,
    /// Comment rows ordered by index; row 0 is shown in the info view.
    pub comments: Vec<CommentRow>,
}

impl MarkerRecord {
    /// Build a collapsed record from a marker document and its main comment.
    ///
    /// # Errors
    ///
    /// Returns an error if the document's coordinates are not finite.
    pub fn from_dto(dto: &MarkerDto, main_comment: Option<CommentDto>) -> Result<Self, GeoError> {
        Ok(Self {
            key: dto.key()?,
            pin: Pin { position: dto.position(), icon: dto.category.icon(), visible: true },
            info: View { kind: ViewKind::Info, open: false },
            preview: View { kind: ViewKind::Preview, open: true },
            hover_preview: false,
            owner_id: dto.owner_id.clone(),
            created_at: dto.created_at,
            expires_at: dto.expires_at,
            topic: dto.topic.clone(),
            category: dto.category,
            comments: main_comment.into_iter().map(CommentRow::from).collect(),
        })
    }

    #[must_use]
    pub fn position(&self) -> LatLng {
        self.pin.position
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.info.open
    }

    #[must_use]
    pub fn main_comment(&self) -> Option<&CommentRow> {
        self.comments.first()
    }

    #[must_use]
    pub fn comment(&self, comment_id: &str) -> Option<&CommentRow> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn comment_mut(&mut self, comment_id: &str) -> Option<&mut CommentRow> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }

    /// Replace comment rows with a fresh fetch, keeping the acting user's
    /// vote highlighting for rows that survive.
    pub fn replace_comments(&mut self, fresh: Vec<CommentDto>) {
        let rows = fresh
            .into_iter()
            .map(|dto| {
                let mut row = CommentRow::from(dto);
                if let Some(old) = self.comment(&row.id) {
                    row.up_active = old.up_active;
                    row.down_active = old.down_active;
                }
                row
            })
            .collect();
        self.comments = rows;
    }

    /// Owner check for deletion.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }
}

#[cfg(test)]
#[path = "marker_test.rs"]
mod tests;

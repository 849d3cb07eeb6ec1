//! Engine error taxonomy.
//!
//! DESIGN
//! ======
//! Every rejection the engine can produce is recoverable: authorization and
//! out-of-bounds rejections surface a prompt or guide message and leave
//! state untouched, backend failures are logged and leave prior local state
//! in place. `kind()` groups variants so callers can pick a presentation
//! without matching every variant.

use crate::geo::{CoordinateKey, GeoError};
use crate::net::api::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The acting user must log in first.
    Authorization,
    /// The action targets a place outside the allowed area.
    OutOfBounds,
    /// The backend could not complete the request.
    Network,
    /// The request is malformed or does not apply to current state.
    Invalid,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("login required")]
    Unauthenticated,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("marker belongs to another user")]
    NotOwner,

    #[error("outside allowed radius: {distance_m:.0}m from target, limit {radius_m:.0}m")]
    OutOfRange { distance_m: f64, radius_m: f64 },
    #[error("current position unknown")]
    PositionUnknown,
    #[error("zoom {zoom} is below minimum drop zoom {min}")]
    TooFarZoomedOut { zoom: u8, min: u8 },

    #[error("drop mode is not armed")]
    NotArmed,
    #[error("no drop location selected")]
    NoPendingDrop,
    #[error("drop form incomplete: {0} is empty")]
    IncompleteForm(&'static str),
    #[error("no marker is expanded")]
    NothingExpanded,
    #[error("delete is disabled while drop mode is armed")]
    DeleteDisabled,
    #[error("marker not found: {0}")]
    MarkerNotFound(CoordinateKey),
    #[error("comment not found: {0}")]
    CommentNotFound(String),
    #[error(transparent)]
    InvalidCoordinate(#[from] GeoError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl EngineError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "E_UNAUTHENTICATED",
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::NotOwner => "E_NOT_OWNER",
            Self::OutOfRange { .. } => "E_OUT_OF_RANGE",
            Self::PositionUnknown => "E_POSITION_UNKNOWN",
            Self::TooFarZoomedOut { .. } => "E_TOO_FAR_ZOOMED_OUT",
            Self::NotArmed => "E_NOT_ARMED",
            Self::NoPendingDrop => "E_NO_PENDING_DROP",
            Self::IncompleteForm(_) => "E_INCOMPLETE_FORM",
            Self::NothingExpanded => "E_NOTHING_EXPANDED",
            Self::DeleteDisabled => "E_DELETE_DISABLED",
            Self::MarkerNotFound(_) => "E_MARKER_NOT_FOUND",
            Self::CommentNotFound(_) => "E_COMMENT_NOT_FOUND",
            Self::InvalidCoordinate(_) => "E_INVALID_COORDINATE",
            Self::Backend(_) => "E_BACKEND",
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials | Self::NotOwner => ErrorKind::Authorization,
            Self::OutOfRange { .. } | Self::PositionUnknown | Self::TooFarZoomedOut { .. } => ErrorKind::OutOfBounds,
            Self::Backend(_) => ErrorKind::Network,
            Self::NotArmed
            | Self::NoPendingDrop
            | Self::IncompleteForm(_)
            | Self::NothingExpanded
            | Self::DeleteDisabled
            | Self::MarkerNotFound(_)
            | Self::CommentNotFound(_)
            | Self::InvalidCoordinate(_) => ErrorKind::Invalid,
        }
    }
}

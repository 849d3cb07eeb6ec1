//! Map UI state: drop mode, guide footer, prompts, zoom, filters.
//!
//! DESIGN
//! ======
//! Keeps presentation concerns out of the registry. Modal openings are
//! modelled as sequence counters (a renderer reacts when the number
//! changes) so repeated prompts are never coalesced.

use std::collections::HashSet;

use crate::geo::LatLng;
use crate::net::types::Category;

pub const GUIDE_DROP_HERE: &str = "Drop a cow within the gray area.";
pub const GUIDE_NEXT_MOVE: &str = "What's your next moove?";
pub const GUIDE_WRONG_AREA: &str = "Incorrect area - select a place within the grey circle.";
pub const GUIDE_ZOOMED_OUT: &str = "Too far zoomed out!";
pub const GUIDE_TOO_FAR_TO_VOTE: &str = "Get closer to this cow to vote on it.";
pub const GUIDE_POSITION_UNKNOWN: &str = "Waiting for your location...";
pub const GUIDE_REQUEST_FAILED: &str = "Something went wrong. Please try again.";

/// Global drop mode. Armed only while the user is placing a new marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DropMode {
    #[default]
    Idle,
    Armed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeTone {
    /// Instructional (blue) text.
    Guide,
    /// Rejection (red) text.
    Warning,
}

/// Message shown in the guide footer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub tone: NoticeTone,
    pub text: String,
}

impl Notice {
    #[must_use]
    pub fn guide(text: &str) -> Self {
        Self { tone: NoticeTone::Guide, text: text.to_owned() }
    }

    #[must_use]
    pub fn warning(text: &str) -> Self {
        Self { tone: NoticeTone::Warning, text: text.to_owned() }
    }
}

/// Size of the user's own position icon, chosen by zoom.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserIconSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl UserIconSize {
    #[must_use]
    pub fn for_zoom(zoom: u8) -> Self {
        match zoom {
            0..17 => Self::Small,
            17..20 => Self::Medium,
            _ => Self::Large,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UiState {
    pub drop_mode: DropMode,
    /// Location picked on the drop radius, awaiting the creation form.
    pub pending_drop: Option<LatLng>,
    pub drop_radius_visible: bool,
    /// The delete control is greyed out while drop mode is armed.
    pub delete_enabled: bool,
    pub zoom: u8,
    pub center: Option<LatLng>,
    pub user_icon: UserIconSize,
    /// Guide footer; `None` hides it.
    pub guide: Option<Notice>,
    pub hidden_categories: HashSet<Category>,
    pub login_prompt_seq: u64,
    pub drop_form_seq: u64,
    pub comments_panel_seq: u64,
}

impl UiState {
    #[must_use]
    pub fn new(zoom: u8) -> Self {
        Self {
            drop_mode: DropMode::Idle,
            pending_drop: None,
            drop_radius_visible: false,
            delete_enabled: true,
            zoom,
            center: None,
            user_icon: UserIconSize::for_zoom(zoom),
            guide: None,
            hidden_categories: HashSet::new(),
            login_prompt_seq: 0,
            drop_form_seq: 0,
            comments_panel_seq: 0,
        }
    }

    pub fn show_guide(&mut self, text: &str) {
        self.guide = Some(Notice::guide(text));
    }

    pub fn show_warning(&mut self, text: &str) {
        self.guide = Some(Notice::warning(text));
    }

    pub fn prompt_login(&mut self) {
        self.login_prompt_seq += 1;
    }

    #[must_use]
    pub fn is_category_visible(&self, category: Category) -> bool {
        !self.hidden_categories.contains(&category)
    }
}

#[cfg(test)]
#[path = "ui_test.rs"]
mod tests;

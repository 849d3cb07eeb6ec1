//! Acting user and tracked position.
//!
//! SYSTEM CONTEXT
//! ==============
//! Drop mode and voting are gated on `user`; proximity checks measure from
//! `position`, which follows the device's geolocation updates.

use crate::geo::LatLng;
use crate::net::types::UserDto;

#[derive(Clone, Debug, Default)]
pub struct AuthState {
    pub user: Option<UserDto>,
    pub position: Option<LatLng>,
}

impl AuthState {
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

//! dejamoo: client-side marker state engine for geotagged, time-limited
//! map messages ("cows").
//!
//! ARCHITECTURE
//! ============
//! `state` holds the session (registry, expansion, drop mode, acting user,
//! surface outbox). `services` implement the engine operations over it.
//! `net` defines the backend the engine talks to, with an HTTP adapter and
//! an in-process store.

pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod net;
pub mod services;
pub mod state;

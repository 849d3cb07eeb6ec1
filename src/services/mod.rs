//! Engine services invoked by map events.
//!
//! ARCHITECTURE
//! ============
//! Services own the engine's behavior: each is a set of free async
//! functions over `&AppState` that the map front end calls on clicks,
//! hovers, zoom changes, and form submissions. Background work (expiry
//! countdowns, hover reverts) is spawned from here as well.

pub mod drop_mode;
pub mod expiration;
pub mod markers;
pub mod visibility;
pub mod vote;

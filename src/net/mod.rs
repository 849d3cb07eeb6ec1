//! Backend access: wire types, the `Backend` trait, and its adapters.

pub mod api;
pub mod http;
pub mod memory;
pub mod types;

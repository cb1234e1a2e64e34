//! Session persistence.
//!
//! - `cache`: the `CacheStore` port (JSON values with TTL) and its boxed form
//! - `memory`: in-process `CacheStore` backed by `DashMap`
//! - `session_store`: typed session/aux-item access over a `CacheStore`

pub mod cache;
pub mod memory;
pub mod session_store;

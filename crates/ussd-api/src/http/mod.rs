//! HTTP layer: the gateway endpoint plus a small admin surface.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;

//! Shared domain types for the USSD session service.
//!
//! This crate contains the types every layer agrees on: the gateway request and
//! reply, the persisted session record, the step catalog shape, customers,
//! configuration and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod customer;
pub mod error;
pub mod session;
pub mod step;
pub mod ussd;

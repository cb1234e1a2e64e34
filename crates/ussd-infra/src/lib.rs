//! Infrastructure layer for the USSD service.
//!
//! Implements the ports defined in `ussd-core`: SQLite customer repository and
//! session cache, phone hashing and display-name encryption, and loading of
//! the service config, step catalog and locales from disk.

pub mod config;
pub mod crypto;
pub mod sqlite;

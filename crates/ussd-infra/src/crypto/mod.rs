//! Cryptographic operations for customer records.
//!
//! - `hash`: SHA-256 phone hashing for lookups
//! - `vault`: AES-256-GCM encryption of display names

pub mod hash;
pub mod vault;

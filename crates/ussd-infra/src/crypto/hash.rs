//! One-way phone number hashing for customer lookup.
//!
//! Phone numbers never reach the database in clear text; the `customers`
//! table is keyed by the lowercase hex SHA-256 of the normalized number.

use sha2::{Digest, Sha256};

/// Deterministic SHA-256 hasher for phone numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneHasher;

impl PhoneHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a phone number after normalization.
    pub fn hash(&self, phone: &str) -> String {
        let digest = Sha256::digest(normalize(phone).as_bytes());
        format!("{:x}", digest)
    }
}

/// Strip formatting so `+250 700 000 000` and `250700000000` hash the same.
fn normalize(phone: &str) -> String {
    phone
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

//! AES-256-GCM encryption of customer display names at rest.
//!
//! The 32-byte key comes from, in order:
//! - the `USSD_CUSTOMER_KEY` environment variable (64 hex chars)
//! - the configured key file (hex), generated on first use when missing
//!
//! Encrypted format: `nonce (12 bytes) || ciphertext`, stored hex-encoded.
//!
//! SECURITY: Error types never contain plaintext or key material.

use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use thiserror::Error;

/// Nonce size for AES-256-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Environment variable holding the hex key. Takes precedence over the key file.
pub const CUSTOMER_KEY_ENV: &str = "USSD_CUSTOMER_KEY";

/// Errors from customer-name encryption.
///
/// IMPORTANT: These errors never include plaintext, key material, or ciphertext
/// in their Display/Debug output to prevent accidental logging of secrets.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid ciphertext: too short")]
    CiphertextTooShort,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("key file error: {0}")]
    KeyFile(String),
}

/// Symmetric cipher for customer display names.
///
/// Each encryption uses a fresh random nonce, so the same name encrypts to
/// different ciphertexts.
#[derive(Clone)]
pub struct VaultCrypto {
    cipher: Aes256Gcm,
}

impl VaultCrypto {
    /// Create from a raw 32-byte key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Create from a 64-character hex key.
    pub fn from_hex(hex_key: &str) -> Result<Self, VaultError> {
        let bytes = hex_decode(hex_key.trim())
            .map_err(|_| VaultError::InvalidKey("not valid hex".to_string()))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VaultError::InvalidKey("expected 32 bytes".to_string()))?;
        Ok(Self::new(&key))
    }

    /// Load the key from `path`, generating and saving a random one if the
    /// file does not exist yet.
    pub fn from_key_file(path: &Path) -> Result<Self, VaultError> {
        match std::fs::read_to_string(path) {
            Ok(hex_key) => Self::from_hex(&hex_key),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let key: [u8; 32] = rand_bytes();
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| VaultError::KeyFile(e.to_string()))?;
                }
                write_key_file(path, &hex_encode(&key))
                    .map_err(|e| VaultError::KeyFile(e.to_string()))?;
                tracing::info!(path = %path.display(), "generated new customer key");
                Ok(Self::new(&key))
            }
            Err(e) => Err(VaultError::KeyFile(e.to_string())),
        }
    }

    /// Resolve the key: environment variable first, then the key file.
    pub fn resolve(key_file: &Path) -> Result<Self, VaultError> {
        match std::env::var(CUSTOMER_KEY_ENV) {
            Ok(hex_key) if !hex_key.trim().is_empty() => Self::from_hex(&hex_key),
            _ => Self::from_key_file(key_file),
        }
    }

    /// Encrypt plaintext. Returns `nonce (12 bytes) || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| VaultError::EncryptionFailed)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data produced by `encrypt()`.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, VaultError> {
        if data.len() < NONCE_SIZE {
            return Err(VaultError::CiphertextTooShort);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)
    }

    /// Encrypt a string into the hex text stored in the database.
    pub fn encrypt_to_hex(&self, plaintext: &str) -> Result<String, VaultError> {
        self.encrypt(plaintext.as_bytes()).map(|bytes| hex_encode(&bytes))
    }

    /// Decrypt hex text produced by `encrypt_to_hex()`.
    pub fn decrypt_hex(&self, hex_data: &str) -> Result<String, VaultError> {
        let data = hex_decode(hex_data).map_err(|_| VaultError::DecryptionFailed)?;
        let plaintext = self.decrypt(&data)?;
        String::from_utf8(plaintext).map_err(|_| VaultError::DecryptionFailed)
    }
}

/// Create the key file readable by the owner only.
fn write_key_file(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)?.write_all(contents.as_bytes())
}

/// Generate 32 random bytes using the OS CSPRNG.
fn rand_bytes() -> [u8; 32] {
    use aes_gcm::aead::rand_core::RngCore;
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return Err("malformed hex string".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| format!("invalid hex at position {i}: {e}"))
        })
        .collect()
}

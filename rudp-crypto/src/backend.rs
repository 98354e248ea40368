//! Cipher Backend Interface

use thiserror::Error;

/// Crypto errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Ciphertext too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed (authentication tag mismatch)")]
    DecryptionFailed,

    #[error("Random number generation failed")]
    RandomFailed,
}

/// Symmetric cipher applied to frame bodies
///
/// Implementations must be self-describing: whatever `encrypt` needs to
/// undo itself (nonce, tag) travels inside the returned bytes.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Bytes added to every encrypted body
    fn overhead(&self) -> usize {
        0
    }
}

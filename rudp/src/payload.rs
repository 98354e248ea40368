//! Payload Contract
//!
//! Application messages cross the engine as bytes. A [`Payload`] knows how
//! to turn itself into bytes, how to come back from them, and may refuse to
//! be sent at all through [`Payload::validate`].

use bytes::Bytes;
use thiserror::Error;

/// Payload errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload rejected: {0}")]
    Invalid(String),

    #[error("Payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Application message carried in Data frames
pub trait Payload: Sized {
    fn to_bytes(&self) -> Bytes;

    fn from_bytes(bytes: Bytes) -> Result<Self, PayloadError>;

    /// Shape check run before the payload is queued; accepts by default
    fn validate(&self) -> Result<(), PayloadError> {
        Ok(())
    }
}

impl Payload for Bytes {
    fn to_bytes(&self) -> Bytes {
        self.clone()
    }

    fn from_bytes(bytes: Bytes) -> Result<Self, PayloadError> {
        Ok(bytes)
    }
}

impl Payload for Vec<u8> {
    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }

    fn from_bytes(bytes: Bytes) -> Result<Self, PayloadError> {
        Ok(bytes.to_vec())
    }
}

impl Payload for String {
    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }

    fn from_bytes(bytes: Bytes) -> Result<Self, PayloadError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

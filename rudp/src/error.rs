//! Engine Errors
//!
//! Errors returned to callers of the engine. Problems with inbound network
//! traffic are not errors; they are reported as
//! [`DiscardReason`](crate::pipeline::DiscardReason)s.

use crate::config::ConfigError;
use crate::payload::PayloadError;
use rudp_crypto::CryptoError;
use rudp_io::SocketError;
use rudp_protocol::{ChecksumError, CodecError, FrameError, MessageType};
use rudp_queue::SequenceError;
use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine is shut down")]
    ShutDown,

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    #[error("Payload of {size} bytes exceeds limit of {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("{0} is not a control message type")]
    NotControl(MessageType),

    #[error("Compression error: {0}")]
    Codec(#[from] CodecError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Encrypted flag set but no cipher configured")]
    CipherUnavailable,

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Checksum error: {0}")]
    Checksum(#[from] ChecksumError),

    #[error("Queue error: {0}")]
    Queue(#[from] SequenceError),

    #[error("Socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to spawn sender thread: {0}")]
    Spawn(#[from] std::io::Error),
}

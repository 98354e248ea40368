//! Frame Pipeline
//!
//! Turns payload bytes into a finished datagram and back:
//!
//! ```text
//! encode: body -> compress? -> encrypt? -> header (checksum 0) -> checksum -> datagram
//! decode: datagram -> header -> protocol id -> version -> checksum -> decrypt? -> decompress? -> body
//! ```
//!
//! The checksum is computed with the configured model and stored as its low
//! 16 bits. With the full-frame flag it covers the header (checksum field
//! read as zero) plus the body; otherwise only the body.
//!
//! Encoding failures are errors. Decoding failures are [`DiscardReason`]s:
//! the receive path drops such datagrams instead of raising.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::payload::PayloadError;
use bytes::Bytes;
use rudp_crypto::{Cipher, CryptoError};
use rudp_protocol::{
    ChecksumEngine, CodecError, Frame, FrameError, FrameFlags, FrameHeader, LzfCodec, MessageType,
    Priority, ProtocolVersion, SeqNumber, CHECKSUM_OFFSET, HEADER_SIZE,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why an inbound datagram was dropped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] FrameError),

    #[error("Foreign protocol id {protocol_id:#06x}")]
    ForeignProtocol { protocol_id: u16 },

    #[error("Unsupported protocol version {0}")]
    UnsupportedVersion(ProtocolVersion),

    #[error("Checksum mismatch: header {expected:#06x}, computed {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Encrypted frame but no cipher configured")]
    NoCipher,

    #[error("Decryption failed: {0}")]
    Decrypt(#[from] CryptoError),

    #[error("Decompression failed: {0}")]
    Codec(#[from] CodecError),

    #[error("Payload deserialization failed: {0}")]
    Deserialize(#[from] PayloadError),
}

/// Encoder/decoder for one protocol instance
pub struct FramePipeline {
    protocol_id: u16,
    version: ProtocolVersion,
    checksum: ChecksumEngine,
    codec: LzfCodec,
    cipher: Option<Arc<dyn Cipher>>,
    max_datagram_size: usize,
}

impl FramePipeline {
    pub fn new(
        config: &EngineConfig,
        cipher: Option<Arc<dyn Cipher>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(FramePipeline {
            protocol_id: config.protocol_id,
            version: config.version()?,
            checksum: ChecksumEngine::new(config.checksum_model()?)?,
            codec: LzfCodec::new(config.compression_level)?
                .with_max_output(config.max_payload_size),
            cipher,
            max_datagram_size: config.max_datagram_size,
        })
    }

    pub fn protocol_id(&self) -> u16 {
        self.protocol_id
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn checksum_engine(&self) -> &ChecksumEngine {
        &self.checksum
    }

    pub fn has_cipher(&self) -> bool {
        self.cipher.is_some()
    }

    /// Reject frames that cannot fit in one datagram, before any encoding
    ///
    /// Only compressed frames are let through unchecked: their wire size is
    /// known after compression, and [`encode`](Self::encode) checks it then.
    pub fn check_size(&self, flags: FrameFlags, body_len: usize) -> Result<(), EngineError> {
        if flags.contains(FrameFlags::COMPRESSED) {
            return Ok(());
        }
        let overhead = match (&self.cipher, flags.contains(FrameFlags::ENCRYPTED)) {
            (Some(cipher), true) => cipher.overhead(),
            (None, true) => return Err(EngineError::CipherUnavailable),
            (_, false) => 0,
        };
        let size = HEADER_SIZE + body_len + overhead;
        if size > self.max_datagram_size {
            return Err(FrameError::FrameTooLarge {
                size,
                max: self.max_datagram_size,
            }
            .into());
        }
        Ok(())
    }

    /// Build a complete datagram around `body`
    pub fn encode(
        &self,
        message_type: MessageType,
        priority: Priority,
        flags: FrameFlags,
        sequence: SeqNumber,
        body: &[u8],
    ) -> Result<Bytes, EngineError> {
        let mut wire_body = body.to_vec();

        if flags.contains(FrameFlags::COMPRESSED) {
            wire_body = self.codec.compress(&wire_body)?;
        }
        if flags.contains(FrameFlags::ENCRYPTED) {
            let cipher = self.cipher.as_ref().ok_or(EngineError::CipherUnavailable)?;
            wire_body = cipher.encrypt(&wire_body)?;
        }

        let header = FrameHeader::new(
            self.protocol_id,
            self.version,
            message_type,
            priority,
            flags,
            sequence,
        );
        let frame = Frame::new(header, Bytes::from(wire_body));
        if frame.size() > self.max_datagram_size {
            return Err(FrameError::FrameTooLarge {
                size: frame.size(),
                max: self.max_datagram_size,
            }
            .into());
        }

        let mut datagram = frame.to_bytes();
        let checksum = if frame.header.covers_full_frame() {
            truncate(self.checksum.generate(&datagram))
        } else {
            truncate(self.checksum.generate(&frame.body))
        };
        datagram[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());

        Ok(datagram.freeze())
    }

    /// Verify and unwrap an inbound datagram
    ///
    /// The returned frame carries the plaintext body.
    pub fn decode(&self, datagram: &[u8]) -> Result<Frame, DiscardReason> {
        if datagram.len() < HEADER_SIZE {
            return Err(FrameError::InsufficientData {
                expected: HEADER_SIZE,
                actual: datagram.len(),
            }
            .into());
        }

        // Foreign traffic is recognised before anything else is parsed
        let protocol_id = u16::from_be_bytes([datagram[0], datagram[1]]);
        if protocol_id != self.protocol_id {
            return Err(DiscardReason::ForeignProtocol { protocol_id });
        }

        let Frame { header, body } = Frame::from_bytes(datagram)?;
        if header.version.major != self.version.major {
            return Err(DiscardReason::UnsupportedVersion(header.version));
        }

        let actual = self.verify_checksum(&header, datagram);
        if actual != header.checksum {
            return Err(DiscardReason::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let mut body = body.to_vec();
        if header.flags.contains(FrameFlags::ENCRYPTED) {
            let cipher = self.cipher.as_ref().ok_or(DiscardReason::NoCipher)?;
            body = cipher.decrypt(&body)?;
        }
        if header.flags.contains(FrameFlags::COMPRESSED) {
            body = self.codec.decompress(&body)?;
        }

        Ok(Frame::new(header, Bytes::from(body)))
    }

    fn verify_checksum(&self, header: &FrameHeader, datagram: &[u8]) -> u16 {
        if header.covers_full_frame() {
            let mut digest = self.checksum.digest();
            digest.update(&datagram[..CHECKSUM_OFFSET]);
            digest.update(&[0, 0]);
            digest.update(&datagram[CHECKSUM_OFFSET + 2..]);
            truncate(digest.finalize())
        } else {
            truncate(self.checksum.generate(&datagram[HEADER_SIZE..]))
        }
    }
}

/// Low 16 bits of a checksum, as stored in the header
#[inline]
fn truncate(checksum: u64) -> u16 {
    (checksum & 0xFFFF) as u16
}

impl fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePipeline")
            .field("protocol_id", &self.protocol_id)
            .field("version", &self.version)
            .field("checksum", &self.checksum.model().name)
            .field("codec", &self.codec)
            .field("cipher", &self.cipher.is_some())
            .field("max_datagram_size", &self.max_datagram_size)
            .finish()
    }
}

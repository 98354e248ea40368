//! rudp Protocol Core
//!
//! Wire-level building blocks of the framed datagram transport: the frame
//! header and its flag, type and priority fields, wrapping sequence numbers,
//! the parameterized CRC engine used to integrity-check frames, and the LZF
//! codec used to compress frame bodies.

pub mod checksum;
pub mod compress;
pub mod frame;
pub mod sequence;

pub use checksum::{reflect, ChecksumEngine, ChecksumError, ChecksumModel, Digest};
pub use compress::{CodecError, LzfCodec};
pub use frame::{
    Frame, FrameError, FrameFlags, FrameHeader, MessageType, Priority, ProtocolVersion,
    CHECKSUM_OFFSET, HEADER_SIZE, MAX_DATAGRAM_SIZE,
};
pub use sequence::SeqNumber;

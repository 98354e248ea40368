//! Frame Structures and Serialization
//!
//! Every datagram starts with a fixed 12-byte header followed by the frame
//! body. All multi-byte fields are in network byte order.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      protocol identifier      | major | minor |  message type |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   priority    |   reserved    |             flags             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |        sequence number        |            checksum           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use crate::sequence::SeqNumber;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use thiserror::Error;

/// Size of the frame header in bytes
pub const HEADER_SIZE: usize = 12;

/// Byte offset of the checksum field within the header
pub const CHECKSUM_OFFSET: usize = 10;

/// Largest UDP payload over IPv4 (65535 - 8 UDP - 20 IP)
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Frame message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Application payload
    Data = 0,
    /// Sequence synchronization
    Sync = 1,
    /// Negative acknowledgement
    Nack = 2,
    /// Request for a negative acknowledgement report
    NackRequest = 3,
    /// Reset of the peer's sequence state
    Reset = 4,
    /// Empty frame
    Null = 5,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MessageType::Data),
            1 => Some(MessageType::Sync),
            2 => Some(MessageType::Nack),
            3 => Some(MessageType::NackRequest),
            4 => Some(MessageType::Reset),
            5 => Some(MessageType::Null),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Anything other than `Data`
    #[inline]
    pub fn is_control(self) -> bool {
        self != MessageType::Data
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Transmission priority
///
/// Numerically lower values are more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Priority {
    Highest = 1,
    Higher = 2,
    High = 3,
    AboveNormal = 4,
    #[default]
    Normal = 5,
    BelowNormal = 6,
    Low = 7,
    Lowest = 8,
}

impl Priority {
    /// All levels, most urgent first
    pub const ALL: [Priority; 8] = [
        Priority::Highest,
        Priority::Higher,
        Priority::High,
        Priority::AboveNormal,
        Priority::Normal,
        Priority::BelowNormal,
        Priority::Low,
        Priority::Lowest,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get((value as usize).wrapping_sub(1)).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Frame flag bitset
///
/// | Bit | Flag |
/// |---|---|
/// | `0x0001` | reliable delivery requested |
/// | `0x0002` | sequenced delivery requested |
/// | `0x0004` | checksum covers the whole frame (otherwise payload only) |
/// | `0x0008` | body is LZF compressed |
/// | `0x0010` | body is encrypted |
///
/// Remaining bits are reserved and carried through unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameFlags(u16);

impl FrameFlags {
    pub const NONE: FrameFlags = FrameFlags(0);
    pub const RELIABLE: FrameFlags = FrameFlags(0x0001);
    pub const SEQUENCED: FrameFlags = FrameFlags(0x0002);
    pub const FULL_CHECKSUM: FrameFlags = FrameFlags(0x0004);
    pub const COMPRESSED: FrameFlags = FrameFlags(0x0008);
    pub const ENCRYPTED: FrameFlags = FrameFlags(0x0010);

    /// Flags from their raw wire value, keeping unknown bits
    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        FrameFlags(bits)
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn contains(self, other: FrameFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: FrameFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: FrameFlags) {
        self.0 &= !other.0;
    }

    /// Copy with `other` set or cleared
    #[inline]
    pub fn with(mut self, other: FrameFlags, enabled: bool) -> Self {
        if enabled {
            self.insert(other);
        } else {
            self.remove(other);
        }
        self
    }
}

impl BitOr for FrameFlags {
    type Output = FrameFlags;

    fn bitor(self, rhs: FrameFlags) -> FrameFlags {
        FrameFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for FrameFlags {
    fn bitor_assign(&mut self, rhs: FrameFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for FrameFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(FrameFlags, &str); 5] = [
            (FrameFlags::RELIABLE, "RELIABLE"),
            (FrameFlags::SEQUENCED, "SEQUENCED"),
            (FrameFlags::FULL_CHECKSUM, "FULL_CHECKSUM"),
            (FrameFlags::COMPRESSED, "COMPRESSED"),
            (FrameFlags::ENCRYPTED, "ENCRYPTED"),
        ];

        write!(f, "FrameFlags(")?;
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        if first {
            write!(f, "{:#06x}", self.0)?;
        }
        write!(f, ")")
    }
}

/// Protocol version packed into one byte as two nibbles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    /// Create a version; each part must fit in a nibble
    pub fn new(major: u8, minor: u8) -> Result<Self, FrameError> {
        if major > 0x0F || minor > 0x0F {
            return Err(FrameError::InvalidVersion { major, minor });
        }
        Ok(ProtocolVersion { major, minor })
    }

    pub fn from_byte(byte: u8) -> Self {
        ProtocolVersion {
            major: byte >> 4,
            minor: byte & 0x0F,
        }
    }

    pub fn to_byte(self) -> u8 {
        (self.major << 4) | (self.minor & 0x0F)
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion { major: 1, minor: 0 }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Frame header (12 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Identifies traffic belonging to this protocol instance
    pub protocol_id: u16,
    pub version: ProtocolVersion,
    pub message_type: MessageType,
    pub priority: Priority,
    /// Unused; zero on send, ignored on receive
    pub reserved: u8,
    pub flags: FrameFlags,
    pub sequence: SeqNumber,
    pub checksum: u16,
}

impl FrameHeader {
    /// Create a header with a zeroed checksum
    pub fn new(
        protocol_id: u16,
        version: ProtocolVersion,
        message_type: MessageType,
        priority: Priority,
        flags: FrameFlags,
        sequence: SeqNumber,
    ) -> Self {
        FrameHeader {
            protocol_id,
            version,
            message_type,
            priority,
            reserved: 0,
            flags,
            sequence,
            checksum: 0,
        }
    }

    /// Whether the checksum covers header and body rather than the body only
    #[inline]
    pub fn covers_full_frame(&self) -> bool {
        self.flags.contains(FrameFlags::FULL_CHECKSUM)
    }

    /// Parse header from bytes (network byte order)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::InsufficientData {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[..HEADER_SIZE];
        let protocol_id = buf.get_u16();
        let version = ProtocolVersion::from_byte(buf.get_u8());

        let raw_type = buf.get_u8();
        let message_type =
            MessageType::from_u8(raw_type).ok_or(FrameError::InvalidMessageType(raw_type))?;

        let raw_priority = buf.get_u8();
        let priority =
            Priority::from_u8(raw_priority).ok_or(FrameError::InvalidPriority(raw_priority))?;

        Ok(FrameHeader {
            protocol_id,
            version,
            message_type,
            priority,
            reserved: buf.get_u8(),
            flags: FrameFlags::from_bits(buf.get_u16()),
            sequence: SeqNumber::new(buf.get_u16()),
            checksum: buf.get_u16(),
        })
    }

    /// Serialize header to bytes (network byte order)
    pub fn to_bytes(&self, buf: &mut BytesMut) {
        buf.put_u16(self.protocol_id);
        buf.put_u8(self.version.to_byte());
        buf.put_u8(self.message_type.as_u8());
        buf.put_u8(self.priority.as_u8());
        buf.put_u8(self.reserved);
        buf.put_u16(self.flags.bits());
        buf.put_u16(self.sequence.as_raw());
        buf.put_u16(self.checksum);
    }
}

/// Header plus body as carried in one datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    /// Wire body when outbound; plaintext once a receiver has decoded it
    pub body: Bytes,
}

impl Frame {
    pub fn new(header: FrameHeader, body: Bytes) -> Self {
        Frame { header, body }
    }

    /// Total size of the frame (header + body)
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// Serialize the frame to bytes
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());
        self.header.to_bytes(&mut buf);
        buf.put_slice(&self.body);
        buf
    }

    /// Parse a frame from bytes; the checksum is not verified here
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let header = FrameHeader::from_bytes(bytes)?;
        let body = Bytes::copy_from_slice(&bytes[HEADER_SIZE..]);
        Ok(Frame { header, body })
    }
}

/// Frame parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("Invalid priority: {0}")]
    InvalidPriority(u8),

    #[error("Invalid version {major}.{minor}: each part must fit in four bits")]
    InvalidVersion { major: u8, minor: u8 },

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

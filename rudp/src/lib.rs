//! rudp - Framed Datagram Transport
//!
//! High-level API: a connectionless transport engine that sends prioritized,
//! checksummed, optionally compressed and encrypted frames over UDP.
//!
//! ```no_run
//! use rudp::{EngineConfig, Priority, TransportEngine};
//!
//! let engine: TransportEngine<String> =
//!     TransportEngine::bind_udp("127.0.0.1:0".parse()?, EngineConfig::default(), None)?;
//! engine.send(&"hello".to_string(), "127.0.0.1:9000".parse()?, Priority::Normal)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod payload;
pub mod pipeline;

pub use rudp_crypto as crypto;
pub use rudp_io as io;
pub use rudp_protocol as protocol;
pub use rudp_queue as queue;

pub use config::{ConfigError, CustomChecksumModel, EngineConfig, SocketConfig};
pub use engine::{ControlFrame, Delivery, EngineStats, Inbound, TransportEngine};
pub use error::EngineError;
pub use payload::{Payload, PayloadError};
pub use pipeline::{DiscardReason, FramePipeline};

// Re-export commonly used types
pub use protocol::{Frame, FrameFlags, MessageType, Priority, SeqNumber};

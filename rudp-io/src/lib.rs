//! Datagram I/O
//!
//! This crate provides the datagram transports the engine sends through: a
//! UDP socket wrapper, an in-process loopback network for tests, and the
//! background receive loop that feeds inbound datagrams to a handler.

pub mod datagram;
pub mod loopback;
pub mod receiver;
pub mod socket;

pub use datagram::{Datagram, DatagramSocket, SocketError};
pub use loopback::{LoopbackNetwork, LoopbackSocket};
pub use receiver::{spawn_receiver, ReceiverHandle};
pub use socket::{SocketOptions, UdpDatagramSocket};

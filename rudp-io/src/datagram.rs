//! Datagram Socket Interface

use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Socket errors
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Address already bound: {0}")]
    AddressInUse(SocketAddr),

    #[error("Datagram of {size} bytes exceeds limit of {limit}")]
    DatagramTooLarge { size: usize, limit: usize },
}

/// One received datagram and the address it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Bytes,
    pub source: SocketAddr,
}

/// Unreliable, connectionless datagram transport
pub trait DatagramSocket: Send + Sync {
    /// Send one datagram; returns the number of bytes sent
    fn send_to(&self, datagram: &[u8], destination: SocketAddr) -> Result<usize, SocketError>;

    /// Wait up to the socket's poll interval for one datagram
    ///
    /// `Ok(None)` means nothing arrived in time.
    fn poll_recv(&self) -> Result<Option<Datagram>, SocketError>;

    fn local_addr(&self) -> Result<SocketAddr, SocketError>;
}

//! UDP socket wrapper
//!
//! Configures a UDP socket through socket2 and exposes it as a
//! [`DatagramSocket`]. The socket runs in blocking mode with a read timeout,
//! so a receive thread can wake up periodically to check for shutdown.

use crate::datagram::{Datagram, DatagramSocket, SocketError};
use bytes::Bytes;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// Largest UDP payload over IPv4
const MAX_UDP_PAYLOAD: usize = 65_507;

/// Socket configuration applied at bind time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOptions {
    /// Kernel send buffer size; `None` keeps the OS default
    pub send_buffer_size: Option<usize>,
    /// Kernel receive buffer size; `None` keeps the OS default
    pub recv_buffer_size: Option<usize>,
    /// How long a receive waits before reporting nothing arrived
    pub read_timeout: Duration,
    pub reuse_address: bool,
}

impl Default for SocketOptions {
    fn default() -> Self {
        SocketOptions {
            send_buffer_size: None,
            recv_buffer_size: None,
            read_timeout: Duration::from_millis(50),
            reuse_address: true,
        }
    }
}

/// UDP implementation of [`DatagramSocket`]
pub struct UdpDatagramSocket {
    inner: UdpSocket,
    recv_buf: Mutex<Vec<u8>>,
}

impl UdpDatagramSocket {
    /// Create a socket bound to `addr`
    pub fn bind(addr: SocketAddr, options: &SocketOptions) -> Result<Self, SocketError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(options.reuse_address)?;
        if let Some(size) = options.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        if let Some(size) = options.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }

        socket.bind(&addr.into())?;
        socket.set_nonblocking(false)?;
        socket.set_read_timeout(Some(options.read_timeout))?;

        let inner: UdpSocket = socket.into();
        tracing::debug!(local = ?inner.local_addr().ok(), "UDP socket bound");

        Ok(UdpDatagramSocket {
            inner,
            recv_buf: Mutex::new(vec![0u8; MAX_UDP_PAYLOAD]),
        })
    }

    /// Get the send buffer size
    pub fn send_buffer_size(&self) -> Result<usize, SocketError> {
        Ok(SockRef::from(&self.inner).send_buffer_size()?)
    }

    /// Get the receive buffer size
    pub fn recv_buffer_size(&self) -> Result<usize, SocketError> {
        Ok(SockRef::from(&self.inner).recv_buffer_size()?)
    }

    pub fn read_timeout(&self) -> Result<Option<Duration>, SocketError> {
        Ok(self.inner.read_timeout()?)
    }

    /// Get a reference to the underlying socket
    pub fn as_udp_socket(&self) -> &UdpSocket {
        &self.inner
    }
}

impl DatagramSocket for UdpDatagramSocket {
    fn send_to(&self, datagram: &[u8], destination: SocketAddr) -> Result<usize, SocketError> {
        if datagram.len() > MAX_UDP_PAYLOAD {
            return Err(SocketError::DatagramTooLarge {
                size: datagram.len(),
                limit: MAX_UDP_PAYLOAD,
            });
        }
        Ok(self.inner.send_to(datagram, destination)?)
    }

    fn poll_recv(&self) -> Result<Option<Datagram>, SocketError> {
        let mut buf = self.recv_buf.lock();
        match self.inner.recv_from(&mut buf) {
            Ok((n, source)) => Ok(Some(Datagram {
                payload: Bytes::copy_from_slice(&buf[..n]),
                source,
            })),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(SocketError::Io(e)),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.inner.local_addr()?)
    }
}

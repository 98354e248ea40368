//! In-Process Loopback Network
//!
//! A [`LoopbackNetwork`] routes datagrams between [`LoopbackSocket`]s over
//! crossbeam channels. Like UDP, a datagram sent to an address nobody is
//! bound to is dropped without an error.

use crate::datagram::{Datagram, DatagramSocket, SocketError};
use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Registry of bound loopback sockets
#[derive(Default)]
pub struct LoopbackNetwork {
    routes: RwLock<HashMap<SocketAddr, Sender<Datagram>>>,
}

impl LoopbackNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(LoopbackNetwork::default())
    }

    /// Bind a socket to `addr` on this network
    pub fn bind(
        self: &Arc<Self>,
        addr: SocketAddr,
        poll_interval: Duration,
    ) -> Result<LoopbackSocket, SocketError> {
        let mut routes = self.routes.write();
        if routes.contains_key(&addr) {
            return Err(SocketError::AddressInUse(addr));
        }
        let (tx, rx) = channel::unbounded();
        routes.insert(addr, tx);

        Ok(LoopbackSocket {
            local: addr,
            network: Arc::clone(self),
            inbox: rx,
            poll_interval,
        })
    }

    fn route(&self, datagram: Datagram, destination: SocketAddr) -> bool {
        match self.routes.read().get(&destination) {
            Some(tx) => tx.send(datagram).is_ok(),
            None => false,
        }
    }

    fn unbind(&self, addr: SocketAddr) {
        self.routes.write().remove(&addr);
    }
}

/// Socket bound on a [`LoopbackNetwork`]
pub struct LoopbackSocket {
    local: SocketAddr,
    network: Arc<LoopbackNetwork>,
    inbox: Receiver<Datagram>,
    poll_interval: Duration,
}

impl LoopbackSocket {
    /// Number of datagrams waiting to be received
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Receive without waiting
    pub fn try_recv(&self) -> Option<Datagram> {
        self.inbox.try_recv().ok()
    }
}

impl DatagramSocket for LoopbackSocket {
    fn send_to(&self, datagram: &[u8], destination: SocketAddr) -> Result<usize, SocketError> {
        let delivered = self.network.route(
            Datagram {
                payload: Bytes::copy_from_slice(datagram),
                source: self.local,
            },
            destination,
        );
        if !delivered {
            tracing::trace!(%destination, "Loopback datagram dropped: no socket bound");
        }
        Ok(datagram.len())
    }

    fn poll_recv(&self) -> Result<Option<Datagram>, SocketError> {
        match self.inbox.recv_timeout(self.poll_interval) {
            Ok(datagram) => Ok(Some(datagram)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.local)
    }
}

impl Drop for LoopbackSocket {
    fn drop(&mut self) {
        self.network.unbind(self.local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_send_between_sockets() {
        let network = LoopbackNetwork::new();
        let a = network.bind(addr(1000), Duration::from_millis(10)).unwrap();
        let b = network.bind(addr(2000), Duration::from_millis(10)).unwrap();

        assert_eq!(a.send_to(b"ping", addr(2000)).unwrap(), 4);
        let datagram = b.poll_recv().unwrap().unwrap();
        assert_eq!(datagram.payload, Bytes::from_static(b"ping"));
        assert_eq!(datagram.source, addr(1000));
        assert!(b.poll_recv().unwrap().is_none());
    }

    #[test]
    fn test_unbound_destination_is_dropped() {
        let network = LoopbackNetwork::new();
        let a = network.bind(addr(1000), Duration::from_millis(10)).unwrap();
        assert_eq!(a.send_to(b"lost", addr(9999)).unwrap(), 4);
    }

    #[test]
    fn test_address_in_use_and_release() {
        let network = LoopbackNetwork::new();
        let first = network.bind(addr(1000), Duration::from_millis(10)).unwrap();
        assert!(matches!(
            network.bind(addr(1000), Duration::from_millis(10)),
            Err(SocketError::AddressInUse(_))
        ));
        drop(first);
        assert!(network.bind(addr(1000), Duration::from_millis(10)).is_ok());
    }
}

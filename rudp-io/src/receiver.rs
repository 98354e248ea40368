//! Background Receive Loop
//!
//! Polls a [`DatagramSocket`] on a dedicated thread and hands every datagram
//! to a callback. The thread checks a stop flag between polls, so it exits
//! within one poll interval of being stopped.

use crate::datagram::{Datagram, DatagramSocket, SocketError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Backoff after a receive error, so a persistently failing socket does not spin
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Handle to a running receive thread; stops and joins it on drop
pub struct ReceiverHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Receive thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some() && !self.stop.load(Ordering::SeqCst)
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start a thread feeding datagrams from `socket` into `handler`
pub fn spawn_receiver<S, F>(socket: Arc<S>, handler: F) -> Result<ReceiverHandle, SocketError>
where
    S: DatagramSocket + ?Sized + 'static,
    F: Fn(Datagram) + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = stop.clone();

    let thread = thread::Builder::new()
        .name("rudp-recv".to_string())
        .spawn(move || {
            tracing::debug!(local = ?socket.local_addr().ok(), "Receive thread started");
            while !thread_stop.load(Ordering::SeqCst) {
                match socket.poll_recv() {
                    Ok(Some(datagram)) => handler(datagram),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Receive failed");
                        thread::sleep(ERROR_BACKOFF);
                    }
                }
            }
            tracing::debug!("Receive thread stopped");
        })?;

    Ok(ReceiverHandle {
        stop,
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackNetwork;
    use crossbeam::channel;
    use std::net::SocketAddr;

    #[test]
    fn test_receiver_delivers_and_stops() {
        let network = LoopbackNetwork::new();
        let a: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let b: SocketAddr = "127.0.0.1:2".parse().unwrap();
        let sender = network.bind(a, Duration::from_millis(5)).unwrap();
        let socket = Arc::new(network.bind(b, Duration::from_millis(5)).unwrap());

        let (tx, rx) = channel::unbounded();
        let mut handle = spawn_receiver(socket, move |datagram| {
            let _ = tx.send(datagram);
        })
        .unwrap();
        assert!(handle.is_running());

        sender.send_to(b"one", b).unwrap();
        sender.send_to(b"two", b).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(&first.payload[..], b"one");
        assert_eq!(&second.payload[..], b"two");
        assert_eq!(first.source, a);

        handle.stop();
        assert!(!handle.is_running());
    }
}

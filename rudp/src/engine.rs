//! Transport Engine
//!
//! Connectionless framed transport over a [`DatagramSocket`].
//!
//! Sending is asynchronous: [`TransportEngine::send`] validates and queues
//! the payload, and a single sender thread drains the priority queue, most
//! urgent entry first, encoding each entry through the [`FramePipeline`].
//!
//! Receiving runs [`TransportEngine::receive`] on each inbound datagram,
//! either called directly or from a receive thread started by
//! [`TransportEngine::start`] / [`TransportEngine::bind_udp`]. Data frames
//! arrive on the delivery channel, other message types on the control
//! channel. Corrupt, foreign or undecodable datagrams are logged, counted
//! and dropped.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::payload::Payload;
use crate::pipeline::{DiscardReason, FramePipeline};
use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use rudp_crypto::Cipher;
use rudp_io::{spawn_receiver, DatagramSocket, ReceiverHandle, UdpDatagramSocket};
use rudp_protocol::{FrameFlags, MessageType, Priority, SeqNumber};
use rudp_queue::{Prioritized, PriorityQueue, SequenceError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Engine counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Entries accepted by `send` / `send_control`
    pub frames_enqueued: u64,
    /// Datagrams handed to the socket
    pub frames_sent: u64,
    pub bytes_sent: u64,
    /// Entries dropped by the sender thread (encode or socket failure)
    pub send_failures: u64,
    /// Entries still queued when the engine shut down
    pub dropped_at_shutdown: u64,

    /// Datagrams passed to `receive`
    pub frames_received: u64,
    pub bytes_received: u64,
    /// Data frames delivered upstream
    pub delivered: u64,
    /// Non-data frames delivered upstream
    pub control_received: u64,

    pub discarded_malformed: u64,
    pub discarded_foreign: u64,
    pub discarded_version: u64,
    pub discarded_checksum: u64,
    pub discarded_crypto: u64,
    pub discarded_codec: u64,
    pub discarded_payload: u64,
}

impl EngineStats {
    /// Sum of all discard counters
    pub fn discarded(&self) -> u64 {
        self.discarded_malformed
            + self.discarded_foreign
            + self.discarded_version
            + self.discarded_checksum
            + self.discarded_crypto
            + self.discarded_codec
            + self.discarded_payload
    }

    fn record_discard(&mut self, reason: &DiscardReason) {
        match reason {
            DiscardReason::Malformed(_) => self.discarded_malformed += 1,
            DiscardReason::ForeignProtocol { .. } => self.discarded_foreign += 1,
            DiscardReason::UnsupportedVersion(_) => self.discarded_version += 1,
            DiscardReason::ChecksumMismatch { .. } => self.discarded_checksum += 1,
            DiscardReason::NoCipher | DiscardReason::Decrypt(_) => self.discarded_crypto += 1,
            DiscardReason::Codec(_) => self.discarded_codec += 1,
            DiscardReason::Deserialize(_) => self.discarded_payload += 1,
        }
    }
}

/// A data frame delivered to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery<P> {
    pub payload: P,
    pub source: SocketAddr,
    pub sequence: SeqNumber,
    pub priority: Priority,
    pub flags: FrameFlags,
}

/// A non-data frame (Sync, Nack, NackRequest, Reset, Null)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub message_type: MessageType,
    pub body: Bytes,
    pub source: SocketAddr,
    pub sequence: SeqNumber,
    pub priority: Priority,
}

/// Outcome of processing one inbound datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Data frame decoded and put on the delivery channel
    Delivered { sequence: SeqNumber },
    /// Control frame put on the control channel
    Control(MessageType),
    /// Datagram dropped
    Discarded(DiscardReason),
}

/// Pending outbound frame
struct QueueEntry {
    message_type: MessageType,
    body: Bytes,
    destination: SocketAddr,
    priority: Priority,
    flags: FrameFlags,
}

impl Prioritized for QueueEntry {
    fn priority(&self) -> u8 {
        self.priority.as_u8()
    }
}

/// Entries accepted by `enqueue` that are not yet sent or dropped
#[derive(Default)]
struct InFlight {
    count: Mutex<u64>,
    settled: Condvar,
}

impl InFlight {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn settle(&self, n: u64) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(n);
        if *count == 0 {
            self.settled.notify_all();
        }
    }

    fn wake_all(&self) {
        let _count = self.count.lock();
        self.settled.notify_all();
    }

    /// Block until the count reaches zero, `deadline` passes or `running`
    /// turns false
    fn wait_settled(&self, deadline: Instant, running: &AtomicBool) -> bool {
        let mut count = self.count.lock();
        while *count > 0 {
            if !running.load(Ordering::SeqCst) {
                return false;
            }
            if self.settled.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }
}

/// Everything the receive path needs, shared with a receive thread
struct ReceivePath<P> {
    pipeline: Arc<FramePipeline>,
    stats: Arc<RwLock<EngineStats>>,
    deliveries: Sender<Delivery<P>>,
    control: Sender<ControlFrame>,
}

impl<P: Payload> ReceivePath<P> {
    fn receive(&self, datagram: &[u8], source: SocketAddr) -> Inbound {
        {
            let mut stats = self.stats.write();
            stats.frames_received += 1;
            stats.bytes_received += datagram.len() as u64;
        }

        match self.process(datagram, source) {
            Ok(inbound) => inbound,
            Err(reason) => {
                tracing::debug!("Discarded datagram from {}: {}", source, reason);
                self.stats.write().record_discard(&reason);
                Inbound::Discarded(reason)
            }
        }
    }

    fn process(&self, datagram: &[u8], source: SocketAddr) -> Result<Inbound, DiscardReason> {
        let frame = self.pipeline.decode(datagram)?;
        let header = frame.header;
        tracing::trace!(
            "Frame {} {} from {} ({} bytes)",
            header.message_type,
            header.sequence,
            source,
            datagram.len()
        );

        if header.message_type.is_control() {
            let control = ControlFrame {
                message_type: header.message_type,
                body: frame.body,
                source,
                sequence: header.sequence,
                priority: header.priority,
            };
            if self.control.send(control).is_err() {
                tracing::warn!("Control channel closed, frame dropped");
            }
            self.stats.write().control_received += 1;
            return Ok(Inbound::Control(header.message_type));
        }

        let payload = P::from_bytes(frame.body)?;
        let delivery = Delivery {
            payload,
            source,
            sequence: header.sequence,
            priority: header.priority,
            flags: header.flags,
        };
        if self.deliveries.send(delivery).is_err() {
            tracing::warn!("Delivery channel closed, frame dropped");
        }
        self.stats.write().delivered += 1;
        Ok(Inbound::Delivered {
            sequence: header.sequence,
        })
    }
}

/// Framed datagram transport
pub struct TransportEngine<P> {
    config: EngineConfig,
    default_flags: FrameFlags,
    socket: Arc<dyn DatagramSocket>,
    queue: Arc<PriorityQueue<QueueEntry>>,
    receive_path: Arc<ReceivePath<P>>,
    stats: Arc<RwLock<EngineStats>>,
    in_flight: Arc<InFlight>,
    deliveries: Receiver<Delivery<P>>,
    control: Receiver<ControlFrame>,
    running: AtomicBool,
    sender: Mutex<Option<JoinHandle<()>>>,
    receiver: Mutex<Option<ReceiverHandle>>,
}

impl<P: Payload + Send + 'static> TransportEngine<P> {
    /// Create an engine sending through `socket` and start its sender thread
    ///
    /// No receive thread is started; feed inbound datagrams to
    /// [`receive`](Self::receive).
    pub fn new(
        config: EngineConfig,
        socket: Arc<dyn DatagramSocket>,
        cipher: Option<Arc<dyn Cipher>>,
    ) -> Result<Self, EngineError> {
        let pipeline = Arc::new(FramePipeline::new(&config, cipher)?);
        let stats = Arc::new(RwLock::new(EngineStats::default()));
        let queue = Arc::new(PriorityQueue::new());
        let in_flight = Arc::new(InFlight::default());
        let (delivery_tx, delivery_rx) = channel::unbounded();
        let (control_tx, control_rx) = channel::unbounded();

        let sender = {
            let queue = queue.clone();
            let pipeline = pipeline.clone();
            let socket = socket.clone();
            let stats = stats.clone();
            let in_flight = in_flight.clone();
            thread::Builder::new()
                .name("rudp-send".to_string())
                .spawn(move || {
                    run_sender(&queue, &pipeline, socket.as_ref(), &stats, &in_flight)
                })?
        };

        tracing::info!(
            "Transport engine started (protocol {:#06x}, version {}, checksum {})",
            pipeline.protocol_id(),
            pipeline.version(),
            pipeline.checksum_engine().model().name
        );

        Ok(TransportEngine {
            default_flags: config.default_flags(),
            config,
            socket,
            queue,
            receive_path: Arc::new(ReceivePath {
                pipeline,
                stats: stats.clone(),
                deliveries: delivery_tx,
                control: control_tx,
            }),
            stats,
            in_flight,
            deliveries: delivery_rx,
            control: control_rx,
            running: AtomicBool::new(true),
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(None),
        })
    }

    /// Create an engine and a receive thread polling the same socket
    pub fn start<S>(
        config: EngineConfig,
        socket: Arc<S>,
        cipher: Option<Arc<dyn Cipher>>,
    ) -> Result<Self, EngineError>
    where
        S: DatagramSocket + 'static,
    {
        let engine = Self::new(config, socket.clone(), cipher)?;
        let path = engine.receive_path.clone();
        let handle = spawn_receiver(socket, move |datagram| {
            path.receive(&datagram.payload, datagram.source);
        })?;
        *engine.receiver.lock() = Some(handle);
        Ok(engine)
    }

    /// Bind a UDP socket at `addr` and start sending and receiving on it
    pub fn bind_udp(
        addr: SocketAddr,
        config: EngineConfig,
        cipher: Option<Arc<dyn Cipher>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let socket = Arc::new(UdpDatagramSocket::bind(addr, &config.socket_options())?);
        Self::start(config, socket, cipher)
    }

    /// Queue a data frame with the configured default flags
    pub fn send(
        &self,
        payload: &P,
        destination: SocketAddr,
        priority: Priority,
    ) -> Result<(), EngineError> {
        self.send_with_flags(payload, destination, priority, self.default_flags)
    }

    /// Queue a data frame with explicit flags
    pub fn send_with_flags(
        &self,
        payload: &P,
        destination: SocketAddr,
        priority: Priority,
        flags: FrameFlags,
    ) -> Result<(), EngineError> {
        payload.validate()?;
        let body = payload.to_bytes();
        self.enqueue(MessageType::Data, body, destination, priority, flags)
    }

    /// Queue a non-data frame
    pub fn send_control(
        &self,
        message_type: MessageType,
        body: Bytes,
        destination: SocketAddr,
        priority: Priority,
    ) -> Result<(), EngineError> {
        if !message_type.is_control() {
            return Err(EngineError::NotControl(message_type));
        }
        self.enqueue(message_type, body, destination, priority, self.default_flags)
    }

    fn enqueue(
        &self,
        message_type: MessageType,
        body: Bytes,
        destination: SocketAddr,
        priority: Priority,
        flags: FrameFlags,
    ) -> Result<(), EngineError> {
        if !self.is_running() {
            return Err(EngineError::ShutDown);
        }
        if body.len() > self.config.max_payload_size {
            return Err(EngineError::PayloadTooLarge {
                size: body.len(),
                max: self.config.max_payload_size,
            });
        }
        if flags.contains(FrameFlags::ENCRYPTED) && !self.receive_path.pipeline.has_cipher() {
            return Err(EngineError::CipherUnavailable);
        }
        self.receive_path.pipeline.check_size(flags, body.len())?;

        // Counted before the push so the sender can never settle it first
        self.in_flight.add();
        let queued = self.queue.enqueue(QueueEntry {
            message_type,
            body,
            destination,
            priority,
            flags,
        });
        match queued {
            Ok(_) => {
                self.stats.write().frames_enqueued += 1;
                Ok(())
            }
            Err(e) => {
                self.in_flight.settle(1);
                match e {
                    SequenceError::Closed => Err(EngineError::ShutDown),
                    other => Err(other.into()),
                }
            }
        }
    }

    /// Process one inbound datagram
    ///
    /// Never fails: problems are reported as [`Inbound::Discarded`].
    pub fn receive(&self, datagram: &[u8], source: SocketAddr) -> Inbound {
        self.receive_path.receive(datagram, source)
    }

    /// Channel of decoded data frames
    pub fn deliveries(&self) -> &Receiver<Delivery<P>> {
        &self.deliveries
    }

    /// Channel of decoded control frames
    pub fn control_frames(&self) -> &Receiver<ControlFrame> {
        &self.control
    }

    /// Wait up to `timeout` for the next data frame
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Delivery<P>> {
        match self.deliveries.recv_timeout(timeout) {
            Ok(delivery) => Some(delivery),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Wait until every queued entry has been sent or dropped
    ///
    /// Returns `false` if `timeout` expired first or the engine shut down.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.in_flight.wait_settled(Instant::now() + timeout, &self.running)
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.read().clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn local_addr(&self) -> Result<SocketAddr, EngineError> {
        Ok(self.socket.local_addr()?)
    }

    /// Entries waiting for the sender thread
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl<P> TransportEngine<P> {
    /// Stop both threads; safe to call more than once
    ///
    /// Entries still queued are dropped and counted in
    /// [`EngineStats::dropped_at_shutdown`].
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(mut receiver) = self.receiver.lock().take() {
            receiver.stop();
        }

        self.queue.close();
        if let Some(sender) = self.sender.lock().take() {
            if sender.join().is_err() {
                tracing::error!("Sender thread panicked");
            }
        }

        let dropped = self.queue.drain().len() as u64;
        if dropped > 0 {
            tracing::debug!("Dropped {} queued frames at shutdown", dropped);
            self.stats.write().dropped_at_shutdown += dropped;
        }
        self.in_flight.settle(dropped);
        self.in_flight.wake_all();
        tracing::info!("Transport engine shut down");
    }
}

impl<P> Drop for TransportEngine<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sender loop: runs until the queue is closed
fn run_sender(
    queue: &PriorityQueue<QueueEntry>,
    pipeline: &FramePipeline,
    socket: &dyn DatagramSocket,
    stats: &RwLock<EngineStats>,
    in_flight: &InFlight,
) {
    let mut sequence = SeqNumber::new(0);

    while let Some(entry) = queue.wait_dequeue() {
        let datagram = match pipeline.encode(
            entry.message_type,
            entry.priority,
            entry.flags,
            sequence,
            &entry.body,
        ) {
            Ok(datagram) => datagram,
            Err(e) => {
                tracing::error!(
                    "Failed to encode {} frame for {}: {}",
                    entry.message_type,
                    entry.destination,
                    e
                );
                stats.write().send_failures += 1;
                in_flight.settle(1);
                continue;
            }
        };

        match socket.send_to(&datagram, entry.destination) {
            Ok(sent) => {
                tracing::trace!(
                    "Sent {} {} to {} ({} bytes)",
                    entry.message_type,
                    sequence,
                    entry.destination,
                    sent
                );
                let mut stats = stats.write();
                stats.frames_sent += 1;
                stats.bytes_sent += sent as u64;
            }
            Err(e) => {
                tracing::error!("Failed to send to {}: {}", entry.destination, e);
                stats.write().send_failures += 1;
            }
        }
        in_flight.settle(1);
        sequence.increment();
    }

    tracing::debug!("Sender thread stopped");
}

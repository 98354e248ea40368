//! Engines bound to real UDP sockets on localhost

use rudp::{EngineConfig, Priority, TransportEngine};
use rudp_tests::{init_tracing, shared_cipher, WAIT};
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Instant;

fn bind(config: EngineConfig) -> TransportEngine<Vec<u8>> {
    let any: SocketAddr = "127.0.0.1:0".parse().unwrap();
    TransportEngine::bind_udp(any, config, Some(shared_cipher())).unwrap()
}

#[test]
fn test_udp_exchange() {
    init_tracing();
    let config = EngineConfig {
        compress: true,
        encrypt: true,
        ..EngineConfig::default()
    };
    let left = bind(config.clone());
    let right = bind(config);
    let right_addr = right.local_addr().unwrap();

    let payloads: Vec<Vec<u8>> = (0..20u8)
        .map(|i| std::iter::repeat(i).take(100 + i as usize * 50).collect())
        .collect();
    for payload in &payloads {
        left.send(payload, right_addr, Priority::Normal).unwrap();
    }

    // Localhost UDP does not reorder; equal priorities keep enqueue order
    for expected in &payloads {
        let delivery = right.recv_timeout(WAIT).expect("delivery");
        assert_eq!(&delivery.payload, expected);
        assert_eq!(delivery.source, left.local_addr().unwrap());
    }
    assert!(left.flush(WAIT));
    assert_eq!(left.stats().frames_sent, payloads.len() as u64);
}

#[test]
fn test_corrupted_datagram_is_counted() {
    init_tracing();
    let engine = bind(EngineConfig::default());
    let target = engine.local_addr().unwrap();
    let raw = UdpSocket::bind("127.0.0.1:0").unwrap();

    // Valid-looking header for this protocol with a wrong checksum
    let mut datagram = vec![0x52, 0x44, 0x10, 0x00, 0x05, 0x00, 0x00, 0x04, 0x00, 0x01];
    datagram.extend_from_slice(&[0xDE, 0xAD]);
    datagram.extend_from_slice(b"payload");
    raw.send_to(&datagram, target).unwrap();
    // Too short to carry a header at all
    raw.send_to(&[0x52, 0x44, 0x10], target).unwrap();

    let deadline = Instant::now() + WAIT;
    while engine.stats().discarded() < 2 && Instant::now() < deadline {
        thread::sleep(rudp_tests::POLL);
    }

    let stats = engine.stats();
    assert_eq!(stats.frames_received, 2);
    assert_eq!(stats.discarded_checksum, 1);
    assert_eq!(stats.discarded_malformed, 1);
    assert_eq!(stats.delivered, 0);
}

#[test]
fn test_shutdown_releases_threads() {
    init_tracing();
    let engine = bind(EngineConfig::default());
    let target = engine.local_addr().unwrap();
    for i in 0..10u8 {
        engine.send(&vec![i; 32], target, Priority::Low).unwrap();
    }

    engine.shutdown();
    engine.shutdown();
    assert!(!engine.is_running());

    let stats = engine.stats();
    assert_eq!(
        stats.frames_sent + stats.send_failures + stats.dropped_at_shutdown,
        10
    );
}

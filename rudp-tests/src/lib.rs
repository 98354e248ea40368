//! Shared fixtures for the integration tests

use rudp::{EngineConfig, TransportEngine};
use rudp_crypto::{AesGcmCipher, Cipher};
use rudp_io::LoopbackNetwork;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Poll interval for loopback sockets in tests
pub const POLL: Duration = Duration::from_millis(5);

/// Generous upper bound for anything a test waits on
pub const WAIT: Duration = Duration::from_secs(5);

/// Route `tracing` output through the test harness; `RUST_LOG` selects levels
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn localhost(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Cipher with a fixed key, so two engines can talk to each other
pub fn shared_cipher() -> Arc<dyn Cipher> {
    Arc::new(AesGcmCipher::new(&[0x5Au8; 32]).expect("32-byte key"))
}

/// Two engines on one loopback network, each with a receive thread
pub fn engine_pair<P>(
    config: EngineConfig,
    ports: (u16, u16),
) -> (TransportEngine<P>, TransportEngine<P>)
where
    P: rudp::Payload + Send + 'static,
{
    let network = LoopbackNetwork::new();
    let a = Arc::new(network.bind(localhost(ports.0), POLL).expect("bind a"));
    let b = Arc::new(network.bind(localhost(ports.1), POLL).expect("bind b"));
    let left = TransportEngine::start(config.clone(), a, Some(shared_cipher())).expect("engine a");
    let right = TransportEngine::start(config, b, Some(shared_cipher())).expect("engine b");
    (left, right)
}

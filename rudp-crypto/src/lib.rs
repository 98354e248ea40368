//! Frame Encryption
//!
//! This crate defines the pluggable cipher interface the transport uses for
//! frame bodies, and an AES-256-GCM backend built on the Ring library.

pub mod backend;
pub mod ring_impl;

pub use backend::{Cipher, CryptoError};
pub use ring_impl::{AesGcmCipher, KEY_LEN};

//! Engine configuration
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration.

use rudp_io::SocketOptions;
use rudp_protocol::{
    ChecksumModel, FrameFlags, ProtocolVersion, HEADER_SIZE, MAX_DATAGRAM_SIZE,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Socket section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Kernel send buffer size in bytes (OS default when absent)
    pub send_buffer_size: Option<usize>,
    /// Kernel receive buffer size in bytes (OS default when absent)
    pub recv_buffer_size: Option<usize>,
    /// Receive poll interval in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for SocketConfig {
    fn default() -> Self {
        SocketConfig {
            send_buffer_size: None,
            recv_buffer_size: None,
            read_timeout_ms: 50,
        }
    }
}

/// A checksum model spelled out in the configuration file
///
/// Numeric fields accept integers or `"0x..."` strings, since 64-bit masks
/// do not fit a TOML integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomChecksumModel {
    pub name: String,
    pub width: u8,
    #[serde(with = "hex_u64")]
    pub polynomial: u64,
    #[serde(with = "hex_u64", default)]
    pub initial: u64,
    #[serde(default)]
    pub input_reflected: bool,
    #[serde(default)]
    pub output_reflected: bool,
    #[serde(with = "hex_u64", default)]
    pub xor_output: u64,
}

impl From<&CustomChecksumModel> for ChecksumModel {
    fn from(custom: &CustomChecksumModel) -> Self {
        ChecksumModel {
            name: Cow::Owned(custom.name.clone()),
            width: custom.width,
            polynomial: custom.polynomial,
            initial: custom.initial,
            input_reflected: custom.input_reflected,
            output_reflected: custom.output_reflected,
            xor_output: custom.xor_output,
        }
    }
}

/// Transport engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Identifier shared by every peer of one protocol instance
    pub protocol_id: u16,
    pub version_major: u8,
    pub version_minor: u8,

    // Default flags for outbound data frames
    pub reliable: bool,
    pub sequenced: bool,
    /// Checksum covers header and body; otherwise the body only
    pub full_frame_checksum: bool,
    pub compress: bool,
    pub encrypt: bool,

    /// Catalog name of the checksum model, ignored when `custom_checksum` is set
    pub checksum_model: String,
    pub custom_checksum: Option<CustomChecksumModel>,

    /// LZF hash table size as a power of two (8..=16)
    pub compression_level: u8,
    /// Largest datagram the engine will build
    pub max_datagram_size: usize,
    /// Largest payload accepted for sending and after decompression
    ///
    /// Not capped by `max_datagram_size`: a compressed payload may be far
    /// larger than the datagram carrying it. Uncompressed frames are checked
    /// against the datagram limit when they are sent.
    pub max_payload_size: usize,

    pub socket: SocketConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            protocol_id: 0x5244,
            version_major: 1,
            version_minor: 0,
            reliable: false,
            sequenced: false,
            full_frame_checksum: true,
            compress: false,
            encrypt: false,
            checksum_model: ChecksumModel::CRC16_IBM_3740.name.to_string(),
            custom_checksum: None,
            compression_level: 14,
            max_datagram_size: MAX_DATAGRAM_SIZE,
            max_payload_size: 16 * 1024 * 1024,
            socket: SocketConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.version()?;
        self.checksum_model()?;

        if !(8..=16).contains(&self.compression_level) {
            return Err(ConfigError::Invalid(format!(
                "compression_level {} outside 8..=16",
                self.compression_level
            )));
        }
        if self.max_datagram_size <= HEADER_SIZE || self.max_datagram_size > MAX_DATAGRAM_SIZE {
            return Err(ConfigError::Invalid(format!(
                "max_datagram_size {} outside {}..={}",
                self.max_datagram_size,
                HEADER_SIZE + 1,
                MAX_DATAGRAM_SIZE
            )));
        }
        if self.max_payload_size == 0 || self.max_payload_size > u32::MAX as usize {
            return Err(ConfigError::Invalid(format!(
                "max_payload_size {} outside 1..={}",
                self.max_payload_size,
                u32::MAX
            )));
        }
        if self.socket.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "socket.read_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn version(&self) -> Result<ProtocolVersion, ConfigError> {
        ProtocolVersion::new(self.version_major, self.version_minor)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Resolve the checksum model, preferring the custom one
    pub fn checksum_model(&self) -> Result<ChecksumModel, ConfigError> {
        let model = match &self.custom_checksum {
            Some(custom) => ChecksumModel::from(custom),
            None => ChecksumModel::by_name(&self.checksum_model)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
        };
        model
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(model)
    }

    /// Flags applied to data frames sent without explicit flags
    pub fn default_flags(&self) -> FrameFlags {
        FrameFlags::NONE
            .with(FrameFlags::RELIABLE, self.reliable)
            .with(FrameFlags::SEQUENCED, self.sequenced)
            .with(FrameFlags::FULL_CHECKSUM, self.full_frame_checksum)
            .with(FrameFlags::COMPRESSED, self.compress)
            .with(FrameFlags::ENCRYPTED, self.encrypt)
    }

    pub fn socket_options(&self) -> SocketOptions {
        SocketOptions {
            send_buffer_size: self.socket.send_buffer_size,
            recv_buffer_size: self.socket.recv_buffer_size,
            read_timeout: Duration::from_millis(self.socket.read_timeout_ms),
            ..SocketOptions::default()
        }
    }
}

mod hex_u64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(value) => Ok(value),
            Raw::Text(text) => {
                let text = text.trim();
                let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
                    None => text.replace('_', "").parse(),
                };
                parsed.map_err(|e| D::Error::custom(format!("invalid number '{}': {}", text, e)))
            }
        }
    }
}

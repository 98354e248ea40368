//! Loading engine configuration from TOML files

use rudp::{ConfigError, CustomChecksumModel, EngineConfig, FramePipeline};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("rudp-{}-{}.toml", name, std::process::id()))
}

#[test]
fn test_file_round_trip() {
    let path = temp_path("round-trip");
    let config = EngineConfig {
        protocol_id: 0x4242,
        compress: true,
        checksum_model: "CRC-32/ISO-HDLC".to_string(),
        compression_level: 12,
        ..EngineConfig::default()
    };

    config.to_file(&path).unwrap();
    let loaded = EngineConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_custom_model_from_file() {
    let path = temp_path("custom-model");
    std::fs::write(
        &path,
        r#"
protocol_id = 17

[custom_checksum]
name = "CRC-64/XZ"
width = 64
polynomial = "0x42F0E1EBA9EA3693"
initial = "0xFFFFFFFFFFFFFFFF"
input_reflected = true
output_reflected = true
xor_output = "0xFFFFFFFFFFFFFFFF"
"#,
    )
    .unwrap();
    let config = EngineConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let custom: &CustomChecksumModel = config.custom_checksum.as_ref().unwrap();
    assert_eq!(custom.polynomial, 0x42F0_E1EB_A9EA_3693);

    let pipeline = FramePipeline::new(&config, None).unwrap();
    assert_eq!(pipeline.protocol_id(), 17);
    assert_eq!(pipeline.checksum_engine().model().width, 64);
    // Check value of CRC-64/XZ
    assert_eq!(
        pipeline.checksum_engine().generate(b"123456789"),
        0x995D_C9BB_DF19_39FA
    );
}

#[test]
fn test_missing_file() {
    let err = EngineConfig::from_file(temp_path("does-not-exist")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_invalid_file_rejected() {
    let path = temp_path("invalid");
    std::fs::write(&path, "compression_level = 3\n").unwrap();
    let err = EngineConfig::from_file(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

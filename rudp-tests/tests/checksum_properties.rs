//! Property tests for the checksum engine

use proptest::prelude::*;
use rudp_protocol::{ChecksumEngine, ChecksumModel};
use std::borrow::Cow;

const CHECK_INPUT: &[u8] = b"123456789";

#[test]
fn test_catalog_check_values() {
    let expected: &[(&str, u64)] = &[
        ("CRC-8/SMBUS", 0xF4),
        ("CRC-16/ARC", 0xBB3D),
        ("CRC-16/IBM-3740", 0x29B1),
        ("CRC-16/XMODEM", 0x31C3),
        ("CRC-16/KERMIT", 0x2189),
        ("CRC-32/ISO-HDLC", 0xCBF4_3926),
        ("CRC-32/ISCSI", 0xE306_9283),
        ("CRC-32/BZIP2", 0xFC89_1918),
        ("CRC-64/XZ", 0x995D_C9BB_DF19_39FA),
        ("CRC-64/ECMA-182", 0x6C40_DF5F_0B49_7347),
    ];

    for &(name, check) in expected {
        // Lookup is case-insensitive
        let model = ChecksumModel::by_name(&name.to_lowercase()).unwrap();
        let engine = ChecksumEngine::new(model).unwrap();
        assert_eq!(engine.generate(CHECK_INPUT), check, "{}", name);
        assert_eq!(engine.generate_bitwise(CHECK_INPUT), check, "{} (bitwise)", name);
    }
}

fn model_strategy() -> impl Strategy<Value = ChecksumModel> {
    (8u8..=64, any::<u64>(), any::<u64>(), any::<bool>(), any::<bool>(), any::<u64>()).prop_map(
        |(width, poly, init, refin, refout, xorout)| {
            let mask = if width == 64 {
                u64::MAX
            } else {
                (1u64 << width) - 1
            };
            ChecksumModel {
                name: Cow::Borrowed("random"),
                width,
                polynomial: (poly & mask) | 1,
                initial: init & mask,
                input_reflected: refin,
                output_reflected: refout,
                xor_output: xorout & mask,
            }
        },
    )
}

proptest! {
    #[test]
    fn prop_table_matches_bitwise(
        model in model_strategy(),
        data in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let engine = ChecksumEngine::new(model).unwrap();
        prop_assert_eq!(engine.generate(&data), engine.generate_bitwise(&data));
    }

    #[test]
    fn prop_digest_split_anywhere(
        data in prop::collection::vec(any::<u8>(), 0..512),
        split in any::<prop::sample::Index>(),
    ) {
        let engine = ChecksumEngine::new(ChecksumModel::CRC16_IBM_3740).unwrap();
        let at = split.index(data.len() + 1);

        let mut digest = engine.digest();
        digest.update(&data[..at]);
        digest.update(&data[at..]);
        prop_assert_eq!(digest.finalize(), engine.generate(&data));
    }
}

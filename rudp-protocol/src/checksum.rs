//! Parameterized CRC Engine
//!
//! A single table-driven engine that emulates any CRC variant described by a
//! Rocksoft-style model: width, polynomial, initial value, input/output
//! reflection and an output XOR mask. Widths from 8 to 64 bits are supported.
//!
//! The lookup table is built lazily per engine instance and discarded
//! whenever the engine is reconfigured with a different model.

use std::borrow::Cow;
use std::sync::OnceLock;
use thiserror::Error;

/// Smallest supported register width in bits
pub const MIN_WIDTH: u8 = 8;

/// Largest supported register width in bits
pub const MAX_WIDTH: u8 = 64;

/// Checksum errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("Invalid checksum model '{name}': {reason}")]
    InvalidModel { name: String, reason: &'static str },

    #[error("Range {offset}..{offset}+{length} out of bounds for buffer of {len} bytes")]
    OutOfRange {
        offset: usize,
        length: usize,
        len: usize,
    },

    #[error("Unknown checksum model: {0}")]
    UnknownModel(String),
}

/// Declarative CRC parameterization
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChecksumModel {
    /// Catalog name, e.g. `CRC-32/ISO-HDLC`
    pub name: Cow<'static, str>,
    /// Register width in bits
    pub width: u8,
    /// Generator polynomial (without the implicit top bit)
    pub polynomial: u64,
    /// Initial register value (direct form)
    pub initial: u64,
    /// Reflect each input byte
    pub input_reflected: bool,
    /// Reflect the final register before the output XOR
    pub output_reflected: bool,
    /// Mask XORed into the final value
    pub xor_output: u64,
}

impl ChecksumModel {
    /// CRC-8/SMBUS
    pub const CRC8_SMBUS: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-8/SMBUS"),
        width: 8,
        polynomial: 0x07,
        initial: 0x00,
        input_reflected: false,
        output_reflected: false,
        xor_output: 0x00,
    };

    /// CRC-16/ARC
    pub const CRC16_ARC: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-16/ARC"),
        width: 16,
        polynomial: 0x8005,
        initial: 0x0000,
        input_reflected: true,
        output_reflected: true,
        xor_output: 0x0000,
    };

    /// CRC-16/IBM-3740 (also known as CRC-16/CCITT-FALSE)
    pub const CRC16_IBM_3740: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-16/IBM-3740"),
        width: 16,
        polynomial: 0x1021,
        initial: 0xFFFF,
        input_reflected: false,
        output_reflected: false,
        xor_output: 0x0000,
    };

    /// CRC-16/XMODEM
    pub const CRC16_XMODEM: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-16/XMODEM"),
        width: 16,
        polynomial: 0x1021,
        initial: 0x0000,
        input_reflected: false,
        output_reflected: false,
        xor_output: 0x0000,
    };

    /// CRC-16/KERMIT
    pub const CRC16_KERMIT: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-16/KERMIT"),
        width: 16,
        polynomial: 0x1021,
        initial: 0x0000,
        input_reflected: true,
        output_reflected: true,
        xor_output: 0x0000,
    };

    /// CRC-32/ISO-HDLC, the standard 32-bit checksum used by Ethernet, zip and PNG
    pub const CRC32: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-32/ISO-HDLC"),
        width: 32,
        polynomial: 0x04C1_1DB7,
        initial: 0xFFFF_FFFF,
        input_reflected: true,
        output_reflected: true,
        xor_output: 0xFFFF_FFFF,
    };

    /// CRC-32/ISCSI (CRC-32C, Castagnoli)
    pub const CRC32C: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-32/ISCSI"),
        width: 32,
        polynomial: 0x1EDC_6F41,
        initial: 0xFFFF_FFFF,
        input_reflected: true,
        output_reflected: true,
        xor_output: 0xFFFF_FFFF,
    };

    /// CRC-32/BZIP2
    pub const CRC32_BZIP2: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-32/BZIP2"),
        width: 32,
        polynomial: 0x04C1_1DB7,
        initial: 0xFFFF_FFFF,
        input_reflected: false,
        output_reflected: false,
        xor_output: 0xFFFF_FFFF,
    };

    /// CRC-64/XZ
    pub const CRC64_XZ: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-64/XZ"),
        width: 64,
        polynomial: 0x42F0_E1EB_A9EA_3693,
        initial: 0xFFFF_FFFF_FFFF_FFFF,
        input_reflected: true,
        output_reflected: true,
        xor_output: 0xFFFF_FFFF_FFFF_FFFF,
    };

    /// CRC-64/ECMA-182
    pub const CRC64_ECMA_182: ChecksumModel = ChecksumModel {
        name: Cow::Borrowed("CRC-64/ECMA-182"),
        width: 64,
        polynomial: 0x42F0_E1EB_A9EA_3693,
        initial: 0x0000_0000_0000_0000,
        input_reflected: false,
        output_reflected: false,
        xor_output: 0x0000_0000_0000_0000,
    };

    /// All built-in models
    pub const CATALOG: &'static [ChecksumModel] = &[
        Self::CRC8_SMBUS,
        Self::CRC16_ARC,
        Self::CRC16_IBM_3740,
        Self::CRC16_XMODEM,
        Self::CRC16_KERMIT,
        Self::CRC32,
        Self::CRC32C,
        Self::CRC32_BZIP2,
        Self::CRC64_XZ,
        Self::CRC64_ECMA_182,
    ];

    /// Look up a built-in model by its catalog name (case-insensitive)
    pub fn by_name(name: &str) -> Result<ChecksumModel, ChecksumError> {
        Self::CATALOG
            .iter()
            .find(|model| model.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| ChecksumError::UnknownModel(name.to_string()))
    }

    /// Mask covering `width` bits
    #[inline]
    pub fn mask(&self) -> u64 {
        low_mask(self.width as u32)
    }

    /// Highest bit of the register
    #[inline]
    fn high_bit(&self) -> u64 {
        1u64 << (self.width - 1)
    }

    /// Check that the model describes a usable CRC
    pub fn validate(&self) -> Result<(), ChecksumError> {
        let invalid = |reason| ChecksumError::InvalidModel {
            name: self.name.to_string(),
            reason,
        };

        if !(MIN_WIDTH..=MAX_WIDTH).contains(&self.width) {
            return Err(invalid("width must be between 8 and 64 bits"));
        }

        let mask = self.mask();
        if self.polynomial & 1 == 0 {
            return Err(invalid("polynomial must have its x^0 term set"));
        }
        if self.polynomial & !mask != 0 {
            return Err(invalid("polynomial wider than the register"));
        }
        if self.initial & !mask != 0 {
            return Err(invalid("initial value wider than the register"));
        }
        if self.xor_output & !mask != 0 {
            return Err(invalid("output XOR wider than the register"));
        }

        Ok(())
    }

    /// Starting register for the augmented (bit-at-a-time) formulation
    ///
    /// Runs the division backwards `width` times from the direct initial
    /// value: a set low bit means the polynomial was applied, so it is
    /// removed and the shifted-out top bit restored.
    pub fn indirect_initial(&self) -> u64 {
        let high_bit = self.high_bit();
        let mut register = self.initial;

        for _ in 0..self.width {
            let carried = register & 1 != 0;
            if carried {
                register ^= self.polynomial;
            }
            register >>= 1;
            if carried {
                register |= high_bit;
            }
        }

        register & self.mask()
    }
}

impl Default for ChecksumModel {
    fn default() -> Self {
        ChecksumModel::CRC32
    }
}

/// Mask of the lowest `bits` bits
#[inline]
fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Reverse the order of the lowest `bit_count` bits of `value`
///
/// Bits above `bit_count` are left untouched.
pub fn reflect(value: u64, bit_count: u32) -> u64 {
    let bit_count = bit_count.min(64);
    let mask = low_mask(bit_count);
    let mut reflected = 0u64;

    for bit in 0..bit_count {
        if value & (1u64 << bit) != 0 {
            reflected |= 1u64 << (bit_count - 1 - bit);
        }
    }

    (value & !mask) | reflected
}

/// Table-driven CRC engine bound to one model
#[derive(Debug)]
pub struct ChecksumEngine {
    model: ChecksumModel,
    table: OnceLock<Box<[u64; 256]>>,
}

impl ChecksumEngine {
    /// Create an engine for `model`
    pub fn new(model: ChecksumModel) -> Result<Self, ChecksumError> {
        model.validate()?;
        Ok(ChecksumEngine {
            model,
            table: OnceLock::new(),
        })
    }

    /// Replace the model, discarding the lookup table
    pub fn configure(&mut self, model: ChecksumModel) -> Result<(), ChecksumError> {
        model.validate()?;
        if model != self.model {
            self.model = model;
            self.table = OnceLock::new();
        }
        Ok(())
    }

    /// The active model
    pub fn model(&self) -> &ChecksumModel {
        &self.model
    }

    fn table(&self) -> &[u64; 256] {
        self.table.get_or_init(|| build_table(&self.model))
    }

    /// Compute the checksum of `data`
    pub fn generate(&self, data: &[u8]) -> u64 {
        let mut digest = self.digest();
        digest.update(data);
        digest.finalize()
    }

    /// Compute the checksum of `data[offset..offset + length]`
    pub fn generate_range(
        &self,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<u64, ChecksumError> {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= data.len())
            .ok_or(ChecksumError::OutOfRange {
                offset,
                length,
                len: data.len(),
            })?;

        Ok(self.generate(&data[offset..end]))
    }

    /// Start an incremental computation
    pub fn digest(&self) -> Digest<'_> {
        let model = &self.model;
        let register = if model.input_reflected {
            reflect(model.initial, model.width as u32)
        } else {
            model.initial
        };

        Digest {
            model,
            table: self.table(),
            register,
        }
    }

    /// Compute the checksum one bit at a time using the augmented form
    ///
    /// Much slower than [`generate`](Self::generate); kept as a reference
    /// implementation that does not depend on the lookup table.
    pub fn generate_bitwise(&self, data: &[u8]) -> u64 {
        let model = &self.model;
        let mask = model.mask();
        let high_bit = model.high_bit();
        let mut register = model.indirect_initial();

        let shift_in = |register: &mut u64, bit: u64| {
            let top = *register & high_bit != 0;
            *register = ((*register << 1) | bit) & mask;
            if top {
                *register ^= model.polynomial;
            }
        };

        for &byte in data {
            let byte = if model.input_reflected {
                reflect(byte as u64, 8)
            } else {
                byte as u64
            };
            for bit in (0..8).rev() {
                shift_in(&mut register, (byte >> bit) & 1);
            }
        }

        // Augment with `width` zero bits
        for _ in 0..model.width {
            shift_in(&mut register, 0);
        }

        if model.output_reflected {
            register = reflect(register, model.width as u32);
        }

        (register ^ model.xor_output) & mask
    }
}

/// Incremental checksum computation
pub struct Digest<'a> {
    model: &'a ChecksumModel,
    table: &'a [u64; 256],
    register: u64,
}

impl Digest<'_> {
    /// Feed more bytes
    pub fn update(&mut self, data: &[u8]) {
        let width = self.model.width as u32;
        let mask = self.model.mask();
        let mut crc = self.register;

        if self.model.input_reflected {
            for &byte in data {
                let index = ((crc ^ byte as u64) & 0xFF) as usize;
                crc = (crc >> 8) ^ self.table[index];
            }
        } else {
            for &byte in data {
                let index = (((crc >> (width - 8)) ^ byte as u64) & 0xFF) as usize;
                crc = ((crc << 8) ^ self.table[index]) & mask;
            }
        }

        self.register = crc;
    }

    /// Finish and return the checksum
    pub fn finalize(self) -> u64 {
        let model = self.model;
        let mut crc = self.register;

        if model.input_reflected != model.output_reflected {
            crc = reflect(crc, model.width as u32);
        }

        (crc ^ model.xor_output) & model.mask()
    }
}

fn build_table(model: &ChecksumModel) -> Box<[u64; 256]> {
    let width = model.width as u32;
    let mask = model.mask();
    let high_bit = model.high_bit();
    let mut table = Box::new([0u64; 256]);

    tracing::trace!(model = %model.name, "building checksum lookup table");

    for (i, slot) in table.iter_mut().enumerate() {
        let seed = if model.input_reflected {
            reflect(i as u64, 8)
        } else {
            i as u64
        };

        let mut crc = seed << (width - 8);
        for _ in 0..8 {
            let top = crc & high_bit != 0;
            crc <<= 1;
            if top {
                crc ^= model.polynomial;
            }
        }

        if model.input_reflected {
            crc = reflect(crc & mask, width);
        }
        *slot = crc & mask;
    }

    table
}

//! Opus decoder config.
//!
//! IAMF carries the Opus identification header fields in network byte
//! order, unlike the little-endian `OpusHead` of the Ogg mapping.

use iamf_core::{Error, ReadBitBuffer, Result, WriteBitBuffer};

/// The `decoder_config` for `Opus` streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusDecoderConfig {
    /// Identification header version; must be 1.
    pub version: u8,
    /// Fixed to 2 and ignored; channel counts come from the audio element.
    pub output_channel_count: u8,
    /// Samples to discard at the start of the stream, at 48 kHz.
    pub pre_skip: u16,
    /// Sample rate of the original input.
    pub input_sample_rate: u32,
    /// Fixed to 0 in IAMF.
    pub output_gain: i16,
    /// Fixed to 0 in IAMF.
    pub mapping_family: u8,
}

impl OpusDecoderConfig {
    /// The fixed `output_channel_count` field value.
    pub const OUTPUT_CHANNEL_COUNT: u8 = 2;

    /// Validate the IAMF-pinned fields.
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(Error::invalid_argument(format!(
                "Opus version must be 1, got {}",
                self.version
            )));
        }
        if self.output_channel_count != Self::OUTPUT_CHANNEL_COUNT {
            return Err(Error::invalid_argument(format!(
                "Opus output_channel_count must be {}, got {}",
                Self::OUTPUT_CHANNEL_COUNT,
                self.output_channel_count
            )));
        }
        if self.output_gain != 0 {
            return Err(Error::invalid_argument(format!(
                "Opus output_gain must be 0, got {}",
                self.output_gain
            )));
        }
        if self.mapping_family != 0 {
            return Err(Error::invalid_argument(format!(
                "Opus mapping_family must be 0, got {}",
                self.mapping_family
            )));
        }
        Ok(())
    }

    /// Serialize the config.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        wb.write_unsigned(u64::from(self.version), 8)?;
        wb.write_unsigned(u64::from(self.output_channel_count), 8)?;
        wb.write_unsigned(u64::from(self.pre_skip), 16)?;
        wb.write_unsigned(u64::from(self.input_sample_rate), 32)?;
        wb.write_signed16(self.output_gain)?;
        wb.write_unsigned(u64::from(self.mapping_family), 8)
    }

    /// Parse the config.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let config = Self {
            version: rb.read_unsigned8(8)?,
            output_channel_count: rb.read_unsigned8(8)?,
            pre_skip: rb.read_unsigned16(16)?,
            input_sample_rate: rb.read_unsigned32(32)?,
            output_gain: rb.read_signed16()?,
            mapping_family: rb.read_unsigned8(8)?,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for OpusDecoderConfig {
    fn default() -> Self {
        Self {
            version: 1,
            output_channel_count: Self::OUTPUT_CHANNEL_COUNT,
            pre_skip: 0,
            input_sample_rate: 48_000,
            output_gain: 0,
            mapping_family: 0,
        }
    }
}

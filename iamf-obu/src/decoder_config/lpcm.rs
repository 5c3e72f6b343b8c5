//! LPCM decoder config.

use iamf_core::{Error, ReadBitBuffer, Result, WriteBitBuffer};

/// Byte order of LPCM samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpcmSampleFormat {
    /// Big-endian samples.
    BigEndian,
    /// Little-endian samples.
    LittleEndian,
}

impl LpcmSampleFormat {
    fn to_u8(self) -> u8 {
        match self {
            LpcmSampleFormat::BigEndian => 0,
            LpcmSampleFormat::LittleEndian => 1,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LpcmSampleFormat::BigEndian),
            1 => Ok(LpcmSampleFormat::LittleEndian),
            other => Err(Error::invalid_argument(format!(
                "Unknown sample_format_flags {other}"
            ))),
        }
    }
}

/// The `decoder_config` for `ipcm` streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpcmDecoderConfig {
    /// Sample byte order.
    pub sample_format_flags: LpcmSampleFormat,
    /// Bits per sample: 16, 24 or 32.
    pub sample_size: u8,
    /// Samples per second.
    pub sample_rate: u32,
}

impl LpcmDecoderConfig {
    const SUPPORTED_SAMPLE_SIZES: [u8; 3] = [16, 24, 32];
    const SUPPORTED_SAMPLE_RATES: [u32; 6] = [16_000, 32_000, 44_100, 48_000, 96_000, 192_000];

    /// Validate the config against the supported LPCM parameter space.
    pub fn validate(&self) -> Result<()> {
        if !Self::SUPPORTED_SAMPLE_SIZES.contains(&self.sample_size) {
            return Err(Error::invalid_argument(format!(
                "Unsupported LPCM sample_size {}",
                self.sample_size
            )));
        }
        if !Self::SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(Error::invalid_argument(format!(
                "Unsupported LPCM sample_rate {}",
                self.sample_rate
            )));
        }
        Ok(())
    }

    /// Serialize the config.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        wb.write_unsigned(u64::from(self.sample_format_flags.to_u8()), 8)?;
        wb.write_unsigned(u64::from(self.sample_size), 8)?;
        wb.write_unsigned(u64::from(self.sample_rate), 32)
    }

    /// Parse the config.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let config = Self {
            sample_format_flags: LpcmSampleFormat::from_u8(rb.read_unsigned8(8)?)?,
            sample_size: rb.read_unsigned8(8)?,
            sample_rate: rb.read_unsigned32(32)?,
        };
        config.validate()?;
        Ok(config)
    }
}

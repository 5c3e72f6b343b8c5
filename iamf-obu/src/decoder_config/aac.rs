//! AAC-LC decoder config.
//!
//! The payload is an ISO 14496-1 `DecoderConfigDescriptor` with expandable
//! size fields, nesting a `DecoderSpecificInfo` that carries the
//! AudioSpecificConfig. IAMF pins the object type to AAC-LC.

use iamf_core::{Error, ReadBitBuffer, Result, WriteBitBuffer};

const DECODER_CONFIG_DESCRIPTOR_TAG: u8 = 0x04;
const DECODER_SPECIFIC_INFO_TAG: u8 = 0x05;
const OBJECT_TYPE_INDICATION_AAC: u8 = 0x40;
/// streamType = 5 (audio), upstream = 0, reserved = 1.
const STREAM_TYPE_BYTE: u8 = 0x15;

const AUDIO_OBJECT_TYPE_AAC_LC: u8 = 2;
const SAMPLE_FREQUENCY_INDEX_ESCAPE: u8 = 15;

/// The AudioSpecificConfig nested in the decoder specific info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    /// Index into the AAC sampling-frequency table; 15 escapes to an
    /// explicit 24-bit frequency.
    pub sample_frequency_index: u8,
    /// Explicit frequency, present only with the escape index.
    pub sampling_frequency: Option<u32>,
    /// Channel configuration; fixed to 2 and ignored in IAMF.
    pub channel_configuration: u8,
}

impl AudioSpecificConfig {
    const FREQUENCY_TABLE: [u32; 13] = [
        96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025,
        8_000, 7_350,
    ];

    /// The sample rate this config represents.
    pub fn sample_rate(&self) -> Result<u32> {
        if self.sample_frequency_index == SAMPLE_FREQUENCY_INDEX_ESCAPE {
            return self.sampling_frequency.ok_or_else(|| {
                Error::invalid_argument(
                    "Escape frequency index without an explicit frequency".to_string(),
                )
            });
        }
        Self::FREQUENCY_TABLE
            .get(self.sample_frequency_index as usize)
            .copied()
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "Reserved sample_frequency_index {}",
                    self.sample_frequency_index
                ))
            })
    }

    fn validate(&self) -> Result<()> {
        if self.channel_configuration != 2 {
            return Err(Error::invalid_argument(format!(
                "AAC channel_configuration must be 2, got {}",
                self.channel_configuration
            )));
        }
        self.sample_rate().map(|_| ())
    }

    fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_unsigned(u64::from(AUDIO_OBJECT_TYPE_AAC_LC), 5)?;
        wb.write_unsigned(u64::from(self.sample_frequency_index), 4)?;
        if self.sample_frequency_index == SAMPLE_FREQUENCY_INDEX_ESCAPE {
            let frequency = self.sampling_frequency.ok_or_else(|| {
                Error::invalid_argument(
                    "Escape frequency index without an explicit frequency".to_string(),
                )
            })?;
            wb.write_unsigned(u64::from(frequency), 24)?;
        }
        wb.write_unsigned(u64::from(self.channel_configuration), 4)?;
        // GASpecificConfig: frame length flag, depends on core coder,
        // extension flag.
        wb.write_unsigned(0, 3)
    }

    fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let audio_object_type = rb.read_unsigned8(5)?;
        if audio_object_type != AUDIO_OBJECT_TYPE_AAC_LC {
            return Err(Error::invalid_argument(format!(
                "audio_object_type must be {AUDIO_OBJECT_TYPE_AAC_LC} (AAC-LC), \
                 got {audio_object_type}"
            )));
        }
        let sample_frequency_index = rb.read_unsigned8(4)?;
        let sampling_frequency = if sample_frequency_index == SAMPLE_FREQUENCY_INDEX_ESCAPE {
            Some(rb.read_unsigned32(24)?)
        } else {
            None
        };
        let channel_configuration = rb.read_unsigned8(4)?;
        let _ga_specific_config = rb.read_unsigned8(3)?;
        let config = Self {
            sample_frequency_index,
            sampling_frequency,
            channel_configuration,
        };
        config.validate()?;
        Ok(config)
    }

    fn encoded_len(&self) -> u32 {
        if self.sample_frequency_index == SAMPLE_FREQUENCY_INDEX_ESCAPE {
            5
        } else {
            2
        }
    }
}

/// The `decoder_config` for `mp4a` streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AacDecoderConfig {
    /// Decoder input buffer size, 24 bits.
    pub buffer_size_db: u32,
    /// Maximum bitrate in bits per second.
    pub max_bitrate: u32,
    /// Average bitrate in bits per second.
    pub average_bitrate: u32,
    /// The nested AudioSpecificConfig.
    pub decoder_specific_info: AudioSpecificConfig,
}

impl AacDecoderConfig {
    /// The sample rate represented in the decoder specific info.
    pub fn sample_rate(&self) -> Result<u32> {
        self.decoder_specific_info.sample_rate()
    }

    /// Validate the descriptor fields.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size_db >= (1 << 24) {
            return Err(Error::invalid_argument(format!(
                "buffer_size_db {} does not fit in 24 bits",
                self.buffer_size_db
            )));
        }
        self.decoder_specific_info.validate()
    }

    fn expanded_len(value: u32) -> u32 {
        let mut groups = 1;
        while (value >> (7 * groups)) != 0 {
            groups += 1;
        }
        groups
    }

    /// Serialize the descriptor chain.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        let asc_len = self.decoder_specific_info.encoded_len();
        // DecoderSpecificInfo: tag, size, AudioSpecificConfig.
        let dsi_len = 1 + Self::expanded_len(asc_len) + asc_len;
        // Object type, stream byte, buffer size, two bitrates, nested info.
        let descriptor_len = 1 + 1 + 3 + 4 + 4 + dsi_len;

        wb.write_unsigned(u64::from(DECODER_CONFIG_DESCRIPTOR_TAG), 8)?;
        wb.write_iso14496_1_expanded(descriptor_len)?;
        wb.write_unsigned(u64::from(OBJECT_TYPE_INDICATION_AAC), 8)?;
        wb.write_unsigned(u64::from(STREAM_TYPE_BYTE), 8)?;
        wb.write_unsigned(u64::from(self.buffer_size_db), 24)?;
        wb.write_unsigned(u64::from(self.max_bitrate), 32)?;
        wb.write_unsigned(u64::from(self.average_bitrate), 32)?;
        wb.write_unsigned(u64::from(DECODER_SPECIFIC_INFO_TAG), 8)?;
        wb.write_iso14496_1_expanded(asc_len)?;
        self.decoder_specific_info.write(wb)
    }

    /// Parse the descriptor chain.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let tag = rb.read_unsigned8(8)?;
        if tag != DECODER_CONFIG_DESCRIPTOR_TAG {
            return Err(Error::invalid_argument(format!(
                "Expected DecoderConfigDescriptor tag {DECODER_CONFIG_DESCRIPTOR_TAG}, got {tag}"
            )));
        }
        let _descriptor_len = rb.read_iso14496_1_expanded(u32::MAX)?;
        let object_type = rb.read_unsigned8(8)?;
        if object_type != OBJECT_TYPE_INDICATION_AAC {
            return Err(Error::invalid_argument(format!(
                "Expected object_type_indication 0x{OBJECT_TYPE_INDICATION_AAC:02x}, \
                 got 0x{object_type:02x}"
            )));
        }
        let _stream_type = rb.read_unsigned8(8)?;
        let buffer_size_db = rb.read_unsigned32(24)?;
        let max_bitrate = rb.read_unsigned32(32)?;
        let average_bitrate = rb.read_unsigned32(32)?;
        let dsi_tag = rb.read_unsigned8(8)?;
        if dsi_tag != DECODER_SPECIFIC_INFO_TAG {
            return Err(Error::invalid_argument(format!(
                "Expected DecoderSpecificInfo tag {DECODER_SPECIFIC_INFO_TAG}, got {dsi_tag}"
            )));
        }
        let _asc_len = rb.read_iso14496_1_expanded(u32::MAX)?;
        let decoder_specific_info = AudioSpecificConfig::read(rb)?;
        let config = Self {
            buffer_size_db,
            max_bitrate,
            average_bitrate,
            decoder_specific_info,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aac_lc_48k() -> AacDecoderConfig {
        AacDecoderConfig {
            buffer_size_db: 0,
            max_bitrate: 128_000,
            average_bitrate: 128_000,
            decoder_specific_info: AudioSpecificConfig {
                sample_frequency_index: 3,
                sampling_frequency: None,
                channel_configuration: 2,
            },
        }
    }

    #[test]
    fn test_wire_format() {
        let mut wb = WriteBitBuffer::default();
        aac_lc_48k().write(&mut wb).unwrap();
        let data = wb.into_data();
        assert_eq!(data[0], 0x04);
        // 13 fixed bytes + DecoderSpecificInfo(tag + size + 2-byte ASC).
        assert_eq!(data[1], 17);
        assert_eq!(data[2], 0x40);
        assert_eq!(data[3], 0x15);
        // ASC: 00010 0011 0010 000 -> 0x11, 0x90.
        assert_eq!(&data[data.len() - 2..], &[0x11, 0x90]);
    }

    #[test]
    fn test_round_trip() {
        let config = aac_lc_48k();
        let mut wb = WriteBitBuffer::default();
        config.write(&mut wb).unwrap();
        let mut rb = ReadBitBuffer::new(1024, wb.into_data());
        assert_eq!(AacDecoderConfig::read(&mut rb).unwrap(), config);
    }

    #[test]
    fn test_escape_frequency_round_trip() {
        let config = AacDecoderConfig {
            decoder_specific_info: AudioSpecificConfig {
                sample_frequency_index: 15,
                sampling_frequency: Some(48_001),
                channel_configuration: 2,
            },
            ..aac_lc_48k()
        };
        let mut wb = WriteBitBuffer::default();
        config.write(&mut wb).unwrap();
        let mut rb = ReadBitBuffer::new(1024, wb.into_data());
        assert_eq!(AacDecoderConfig::read(&mut rb).unwrap(), config);
    }

    #[test]
    fn test_sample_rate_lookup() {
        assert_eq!(aac_lc_48k().sample_rate().unwrap(), 48_000);
    }

    #[test]
    fn test_reserved_frequency_index_rejected() {
        let config = AacDecoderConfig {
            decoder_specific_info: AudioSpecificConfig {
                sample_frequency_index: 13,
                sampling_frequency: None,
                channel_configuration: 2,
            },
            ..aac_lc_48k()
        };
        assert!(config.validate().is_err());
    }
}

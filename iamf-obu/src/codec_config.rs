//! Codec Config OBU.

use iamf_core::{DecodedUleb128, Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::decoder_config::{
    AacDecoderConfig, FlacDecoderConfig, LpcmDecoderConfig, OpusDecoderConfig,
};
use crate::header::{Obu, ObuHeader};
use crate::types::ObuType;

/// The FourCC `codec_id` of a Codec Config OBU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    /// Opus, `Opus`.
    Opus,
    /// AAC-LC, `mp4a`.
    AacLc,
    /// FLAC, `fLaC`.
    Flac,
    /// Uncompressed PCM, `ipcm`.
    Lpcm,
}

impl CodecId {
    /// The FourCC bytes.
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            CodecId::Opus => *b"Opus",
            CodecId::AacLc => *b"mp4a",
            CodecId::Flac => *b"fLaC",
            CodecId::Lpcm => *b"ipcm",
        }
    }

    /// Interpret FourCC bytes.
    pub fn from_fourcc(fourcc: [u8; 4]) -> Result<Self> {
        match &fourcc {
            b"Opus" => Ok(CodecId::Opus),
            b"mp4a" => Ok(CodecId::AacLc),
            b"fLaC" => Ok(CodecId::Flac),
            b"ipcm" => Ok(CodecId::Lpcm),
            other => Err(Error::invalid_argument(format!(
                "Unknown codec_id {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

/// Codec-specific decoder config variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderConfig {
    /// Opus.
    Opus(OpusDecoderConfig),
    /// AAC-LC.
    Aac(AacDecoderConfig),
    /// FLAC.
    Flac(FlacDecoderConfig),
    /// LPCM.
    Lpcm(LpcmDecoderConfig),
}

impl DecoderConfig {
    /// The codec id this config belongs to.
    pub fn codec_id(&self) -> CodecId {
        match self {
            DecoderConfig::Opus(_) => CodecId::Opus,
            DecoderConfig::Aac(_) => CodecId::AacLc,
            DecoderConfig::Flac(_) => CodecId::Flac,
            DecoderConfig::Lpcm(_) => CodecId::Lpcm,
        }
    }

    /// The output sample rate represented by the config.
    pub fn output_sample_rate(&self) -> Result<u32> {
        match self {
            // Opus decodes at 48 kHz regardless of the input rate.
            DecoderConfig::Opus(_) => Ok(48_000),
            DecoderConfig::Aac(config) => config.sample_rate(),
            DecoderConfig::Flac(config) => config.sample_rate(),
            DecoderConfig::Lpcm(config) => Ok(config.sample_rate),
        }
    }

    /// The bit depth the stream should be decoded to for measurement.
    pub fn bit_depth_to_measure_loudness(&self) -> Result<u8> {
        match self {
            DecoderConfig::Opus(_) => Ok(32),
            DecoderConfig::Aac(_) => Ok(16),
            DecoderConfig::Flac(config) => Ok(config.stream_info()?.bit_depth()),
            DecoderConfig::Lpcm(config) => Ok(config.sample_size),
        }
    }
}

/// The codec parameters shared by every substream coded against this
/// config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// The FourCC naming the codec.
    pub codec_id: CodecId,
    /// Samples per audio frame.
    pub num_samples_per_frame: DecodedUleb128,
    /// Frames a decoder must process before output is valid, per codec.
    pub audio_roll_distance: i16,
    /// Codec-specific decoder config.
    pub decoder_config: DecoderConfig,
}

impl CodecConfig {
    /// The roll distance the codec requires for `num_samples_per_frame`.
    pub fn required_audio_roll_distance(
        codec_id: CodecId,
        num_samples_per_frame: DecodedUleb128,
    ) -> Result<i16> {
        if num_samples_per_frame == 0 {
            return Err(Error::invalid_argument(
                "num_samples_per_frame must be non-zero".to_string(),
            ));
        }
        Ok(match codec_id {
            // Opus pre-roll is 80 ms = 3840 samples at 48 kHz.
            CodecId::Opus => -((3840u32.div_ceil(num_samples_per_frame)) as i16),
            CodecId::AacLc => -1,
            CodecId::Flac | CodecId::Lpcm => 0,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.codec_id != self.decoder_config.codec_id() {
            return Err(Error::invalid_argument(format!(
                "codec_id {:?} disagrees with the decoder config",
                self.codec_id
            )));
        }
        let required =
            Self::required_audio_roll_distance(self.codec_id, self.num_samples_per_frame)?;
        if self.audio_roll_distance != required {
            return Err(Error::invalid_argument(format!(
                "audio_roll_distance must be {required} for {:?} at {} samples per frame, got {}",
                self.codec_id, self.num_samples_per_frame, self.audio_roll_distance
            )));
        }
        Ok(())
    }
}

/// Codec Config OBU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfigObu {
    /// The OBU header.
    pub header: ObuHeader,
    /// Identifier referenced by audio elements.
    pub codec_config_id: DecodedUleb128,
    /// The codec parameters.
    pub codec_config: CodecConfig,
}

impl CodecConfigObu {
    /// Create a codec config OBU. The header's type is forced to
    /// [`ObuType::CodecConfig`].
    pub fn new(
        header: ObuHeader,
        codec_config_id: DecodedUleb128,
        codec_config: CodecConfig,
    ) -> Self {
        Self {
            header: ObuHeader {
                obu_type: ObuType::CodecConfig,
                ..header
            },
            codec_config_id,
            codec_config,
        }
    }

    /// Samples per frame declared by this config.
    pub fn num_samples_per_frame(&self) -> DecodedUleb128 {
        self.codec_config.num_samples_per_frame
    }

    /// Output sample rate declared by this config.
    pub fn output_sample_rate(&self) -> Result<u32> {
        self.codec_config.decoder_config.output_sample_rate()
    }

    /// Read the payload of a codec config OBU whose header was already
    /// consumed.
    pub fn read_and_validate(header: ObuHeader, rb: &mut ReadBitBuffer) -> Result<Self> {
        let codec_config_id = rb.read_uleb128()?;
        let mut fourcc = [0u8; 4];
        rb.read_uint8_span(&mut fourcc)?;
        let codec_id = CodecId::from_fourcc(fourcc)?;
        let num_samples_per_frame = rb.read_uleb128()?;
        let audio_roll_distance = rb.read_signed16()?;
        let decoder_config = match codec_id {
            CodecId::Opus => DecoderConfig::Opus(OpusDecoderConfig::read(rb)?),
            CodecId::AacLc => DecoderConfig::Aac(AacDecoderConfig::read(rb)?),
            CodecId::Flac => DecoderConfig::Flac(FlacDecoderConfig::read(rb)?),
            CodecId::Lpcm => DecoderConfig::Lpcm(LpcmDecoderConfig::read(rb)?),
        };
        let obu = Self {
            header,
            codec_config_id,
            codec_config: CodecConfig {
                codec_id,
                num_samples_per_frame,
                audio_roll_distance,
                decoder_config,
            },
        };
        obu.validate()?;
        Ok(obu)
    }
}

impl Obu for CodecConfigObu {
    fn header(&self) -> &ObuHeader {
        &self.header
    }

    fn validate(&self) -> Result<()> {
        self.codec_config.validate()
    }

    fn write_payload(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_uleb128(self.codec_config_id)?;
        wb.write_bytes(&self.codec_config.codec_id.fourcc())?;
        wb.write_uleb128(self.codec_config.num_samples_per_frame)?;
        wb.write_signed16(self.codec_config.audio_roll_distance)?;
        match &self.codec_config.decoder_config {
            DecoderConfig::Opus(config) => config.write(wb),
            DecoderConfig::Aac(config) => config.write(wb),
            DecoderConfig::Flac(config) => config.write(wb),
            DecoderConfig::Lpcm(config) => config.write(wb),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder_config::LpcmSampleFormat;

    pub(crate) fn lpcm_codec_config(num_samples_per_frame: DecodedUleb128) -> CodecConfig {
        CodecConfig {
            codec_id: CodecId::Lpcm,
            num_samples_per_frame,
            audio_roll_distance: 0,
            decoder_config: DecoderConfig::Lpcm(LpcmDecoderConfig {
                sample_format_flags: LpcmSampleFormat::LittleEndian,
                sample_size: 16,
                sample_rate: 48_000,
            }),
        }
    }

    #[test]
    fn test_constructor_sets_obu_type() {
        let obu = CodecConfigObu::new(ObuHeader::default(), 1, lpcm_codec_config(8));
        assert_eq!(obu.header.obu_type, ObuType::CodecConfig);
    }

    #[test]
    fn test_lpcm_wire_format() {
        let obu = CodecConfigObu::new(ObuHeader::default(), 200, lpcm_codec_config(8));
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&mut wb).unwrap();
        assert_eq!(
            wb.into_data(),
            vec![
                // Header: type 0, obu_size.
                0x00,
                15,
                // codec_config_id.
                0x80 | 0x48,
                0x01,
                // codec_id = "ipcm".
                b'i',
                b'p',
                b'c',
                b'm',
                // num_samples_per_frame.
                8,
                // audio_roll_distance.
                0x00,
                0x00,
                // LPCM decoder config.
                0x01,
                16,
                0x00,
                0x00,
                0xbb,
                0x80
            ]
        );
    }

    #[test]
    fn test_lpcm_round_trip() {
        let obu = CodecConfigObu::new(ObuHeader::default(), 1, lpcm_codec_config(1024));
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&mut wb).unwrap();
        let mut rb = ReadBitBuffer::new(1024, wb.into_data());
        let (header, _) = ObuHeader::read_and_validate(&mut rb).unwrap();
        assert_eq!(
            CodecConfigObu::read_and_validate(header, &mut rb).unwrap(),
            obu
        );
    }

    #[test]
    fn test_opus_roll_distance() {
        assert_eq!(
            CodecConfig::required_audio_roll_distance(CodecId::Opus, 960).unwrap(),
            -4
        );
        assert_eq!(
            CodecConfig::required_audio_roll_distance(CodecId::Opus, 120).unwrap(),
            -32
        );
    }

    #[test]
    fn test_wrong_roll_distance_rejected() {
        let mut config = lpcm_codec_config(8);
        config.audio_roll_distance = -1;
        let obu = CodecConfigObu::new(ObuHeader::default(), 1, config);
        let mut wb = WriteBitBuffer::default();
        assert!(obu.validate_and_write(&mut wb).is_err());
    }

    #[test]
    fn test_zero_samples_per_frame_rejected() {
        let obu = CodecConfigObu::new(ObuHeader::default(), 1, lpcm_codec_config(0));
        assert!(obu.validate().is_err());
    }

    #[test]
    fn test_opus_round_trip() {
        let config = CodecConfig {
            codec_id: CodecId::Opus,
            num_samples_per_frame: 960,
            audio_roll_distance: -4,
            decoder_config: DecoderConfig::Opus(OpusDecoderConfig {
                pre_skip: 312,
                ..Default::default()
            }),
        };
        let obu = CodecConfigObu::new(ObuHeader::default(), 7, config);
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&mut wb).unwrap();
        let mut rb = ReadBitBuffer::new(1024, wb.into_data());
        let (header, _) = ObuHeader::read_and_validate(&mut rb).unwrap();
        assert_eq!(
            CodecConfigObu::read_and_validate(header, &mut rb).unwrap(),
            obu
        );
    }
}

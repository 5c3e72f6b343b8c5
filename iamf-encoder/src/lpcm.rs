//! The LPCM codec collaborator.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use iamf_core::{Error, Result};
use iamf_obu::decoder_config::LpcmSampleFormat;
use iamf_obu::{CodecConfig, DecoderConfig};

use crate::data::InternalSampleType;
use crate::traits::{AudioCodec, AudioCodecFactory};

/// Uncompressed PCM packing for `ipcm` substreams.
#[derive(Debug, Clone)]
pub struct LpcmCodec {
    sample_format: LpcmSampleFormat,
    sample_size: u8,
    num_samples_per_frame: u32,
    num_channels: usize,
}

impl LpcmCodec {
    /// Create a codec for one substream of `num_channels` channels.
    pub fn new(codec_config: &CodecConfig, num_channels: usize) -> Result<Self> {
        let DecoderConfig::Lpcm(decoder_config) = &codec_config.decoder_config else {
            return Err(Error::invalid_argument(
                "LpcmCodec requires an LPCM decoder config".to_string(),
            ));
        };
        decoder_config.validate()?;
        if num_channels == 0 {
            return Err(Error::invalid_argument(
                "LpcmCodec requires at least one channel".to_string(),
            ));
        }
        Ok(Self {
            sample_format: decoder_config.sample_format_flags,
            sample_size: decoder_config.sample_size,
            num_samples_per_frame: codec_config.num_samples_per_frame,
            num_channels,
        })
    }

    fn bytes_per_sample(&self) -> usize {
        usize::from(self.sample_size / 8)
    }

    fn pack_sample(&self, sample: InternalSampleType, out: &mut Vec<u8>) {
        let clamped = sample.clamp(-1.0, 1.0);
        match (self.sample_size, self.sample_format) {
            (16, LpcmSampleFormat::LittleEndian) => {
                let mut buf = [0u8; 2];
                LittleEndian::write_i16(&mut buf, (clamped * 32767.0) as i16);
                out.extend_from_slice(&buf);
            }
            (16, LpcmSampleFormat::BigEndian) => {
                let mut buf = [0u8; 2];
                BigEndian::write_i16(&mut buf, (clamped * 32767.0) as i16);
                out.extend_from_slice(&buf);
            }
            (24, LpcmSampleFormat::LittleEndian) => {
                let value = (clamped * 8_388_607.0) as i32;
                out.push((value & 0xff) as u8);
                out.push(((value >> 8) & 0xff) as u8);
                out.push(((value >> 16) & 0xff) as u8);
            }
            (24, LpcmSampleFormat::BigEndian) => {
                let value = (clamped * 8_388_607.0) as i32;
                out.push(((value >> 16) & 0xff) as u8);
                out.push(((value >> 8) & 0xff) as u8);
                out.push((value & 0xff) as u8);
            }
            (32, LpcmSampleFormat::LittleEndian) => {
                let mut buf = [0u8; 4];
                LittleEndian::write_i32(&mut buf, (clamped * 2_147_483_647.0) as i32);
                out.extend_from_slice(&buf);
            }
            (32, LpcmSampleFormat::BigEndian) => {
                let mut buf = [0u8; 4];
                BigEndian::write_i32(&mut buf, (clamped * 2_147_483_647.0) as i32);
                out.extend_from_slice(&buf);
            }
            // Unreachable; the decoder config was validated at creation.
            _ => {}
        }
    }

    fn unpack_sample(&self, bytes: &[u8]) -> InternalSampleType {
        match (self.sample_size, self.sample_format) {
            (16, LpcmSampleFormat::LittleEndian) => {
                InternalSampleType::from(LittleEndian::read_i16(bytes)) / 32768.0
            }
            (16, LpcmSampleFormat::BigEndian) => {
                InternalSampleType::from(BigEndian::read_i16(bytes)) / 32768.0
            }
            (24, LpcmSampleFormat::LittleEndian) => {
                let value = (i32::from(bytes[2] as i8) << 16)
                    | (i32::from(bytes[1]) << 8)
                    | i32::from(bytes[0]);
                InternalSampleType::from(value) / 8_388_608.0
            }
            (24, LpcmSampleFormat::BigEndian) => {
                let value = (i32::from(bytes[0] as i8) << 16)
                    | (i32::from(bytes[1]) << 8)
                    | i32::from(bytes[2]);
                InternalSampleType::from(value) / 8_388_608.0
            }
            (32, LpcmSampleFormat::LittleEndian) => {
                InternalSampleType::from(LittleEndian::read_i32(bytes)) / 2_147_483_648.0
            }
            (32, LpcmSampleFormat::BigEndian) => {
                InternalSampleType::from(BigEndian::read_i32(bytes)) / 2_147_483_648.0
            }
            _ => 0.0,
        }
    }
}

impl AudioCodec for LpcmCodec {
    fn encode_frame(&mut self, samples: &[Vec<InternalSampleType>]) -> Result<Vec<u8>> {
        if samples.len() != self.num_samples_per_frame as usize {
            return Err(Error::invalid_argument(format!(
                "Expected {} samples per frame, got {}",
                self.num_samples_per_frame,
                samples.len()
            )));
        }
        let mut payload =
            Vec::with_capacity(samples.len() * self.num_channels * self.bytes_per_sample());
        for tick in samples {
            if tick.len() != self.num_channels {
                return Err(Error::invalid_argument(format!(
                    "Expected {} channels, got {}",
                    self.num_channels,
                    tick.len()
                )));
            }
            for &sample in tick {
                self.pack_sample(sample, &mut payload);
            }
        }
        Ok(payload)
    }

    fn decode_frame(&mut self, payload: &[u8]) -> Result<Vec<Vec<InternalSampleType>>> {
        let stride = self.num_channels * self.bytes_per_sample();
        if stride == 0 || payload.len() % stride != 0 {
            return Err(Error::invalid_argument(format!(
                "LPCM payload of {} bytes is not a whole number of ticks",
                payload.len()
            )));
        }
        let bytes_per_sample = self.bytes_per_sample();
        let mut samples = Vec::with_capacity(payload.len() / stride);
        for tick in payload.chunks_exact(stride) {
            samples.push(
                tick.chunks_exact(bytes_per_sample)
                    .map(|bytes| self.unpack_sample(bytes))
                    .collect(),
            );
        }
        Ok(samples)
    }

    fn num_samples_per_frame(&self) -> u32 {
        self.num_samples_per_frame
    }
}

/// Factory producing [`LpcmCodec`] instances; other codecs are external
/// collaborators and yield `None`.
#[derive(Debug, Clone, Default)]
pub struct LpcmCodecFactory;

impl AudioCodecFactory for LpcmCodecFactory {
    fn create(
        &self,
        codec_config: &CodecConfig,
        num_channels: usize,
    ) -> Option<Box<dyn AudioCodec>> {
        LpcmCodec::new(codec_config, num_channels)
            .ok()
            .map(|codec| Box::new(codec) as Box<dyn AudioCodec>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iamf_obu::decoder_config::LpcmDecoderConfig;
    use iamf_obu::CodecId;

    fn codec_config(sample_size: u8, sample_format_flags: LpcmSampleFormat) -> CodecConfig {
        CodecConfig {
            codec_id: CodecId::Lpcm,
            num_samples_per_frame: 4,
            audio_roll_distance: 0,
            decoder_config: DecoderConfig::Lpcm(LpcmDecoderConfig {
                sample_format_flags,
                sample_size,
                sample_rate: 48_000,
            }),
        }
    }

    #[test]
    fn test_encode_s16le() {
        let mut codec = LpcmCodec::new(&codec_config(16, LpcmSampleFormat::LittleEndian), 2)
            .unwrap();
        let frame = vec![
            vec![0.0, 1.0],
            vec![-1.0, 0.5],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
        ];
        let payload = codec.encode_frame(&frame).unwrap();
        assert_eq!(payload.len(), 16);
        assert_eq!(LittleEndian::read_i16(&payload[0..2]), 0);
        assert_eq!(LittleEndian::read_i16(&payload[2..4]), 32767);
        assert_eq!(LittleEndian::read_i16(&payload[4..6]), -32767);
    }

    #[test]
    fn test_round_trip_all_sizes() {
        for sample_size in [16u8, 24, 32] {
            for format in [LpcmSampleFormat::LittleEndian, LpcmSampleFormat::BigEndian] {
                let mut codec =
                    LpcmCodec::new(&codec_config(sample_size, format), 1).unwrap();
                let frame = vec![vec![0.0], vec![0.5], vec![-0.5], vec![0.25]];
                let payload = codec.encode_frame(&frame).unwrap();
                let decoded = codec.decode_frame(&payload).unwrap();
                for (expected, actual) in frame.iter().zip(decoded.iter()) {
                    assert!((expected[0] - actual[0]).abs() < 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_wrong_frame_size_rejected() {
        let mut codec =
            LpcmCodec::new(&codec_config(16, LpcmSampleFormat::LittleEndian), 1).unwrap();
        assert!(codec.encode_frame(&[vec![0.0]]).is_err());
    }

    #[test]
    fn test_factory_rejects_non_lpcm() {
        use iamf_obu::decoder_config::OpusDecoderConfig;
        let opus = CodecConfig {
            codec_id: CodecId::Opus,
            num_samples_per_frame: 960,
            audio_roll_distance: -4,
            decoder_config: DecoderConfig::Opus(OpusDecoderConfig::default()),
        };
        assert!(LpcmCodecFactory.create(&opus, 2).is_none());
        assert!(LpcmCodecFactory
            .create(&codec_config(16, LpcmSampleFormat::LittleEndian), 2)
            .is_some());
    }
}

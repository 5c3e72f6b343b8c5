//! FLAC decoder config.
//!
//! The payload is a sequence of FLAC metadata blocks. The first block must
//! be STREAMINFO; IAMF pins several of its fields and ignores others.

use iamf_core::{Error, ReadBitBuffer, Result, WriteBitBuffer};

/// The header portion of a FLAC metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlacMetaBlockHeader {
    /// Set on the final metadata block.
    pub last_metadata_block_flag: bool,
    /// `BLOCK_TYPE` from the FLAC spec, 7 bits.
    pub block_type: u8,
    /// Length of the block payload in bytes, 24 bits.
    pub metadata_data_block_length: u32,
}

impl FlacMetaBlockHeader {
    /// `BLOCK_TYPE` of a STREAMINFO block.
    pub const BLOCK_TYPE_STREAMINFO: u8 = 0;

    fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_boolean(self.last_metadata_block_flag)?;
        wb.write_unsigned(u64::from(self.block_type), 7)?;
        wb.write_unsigned(u64::from(self.metadata_data_block_length), 24)
    }

    fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        Ok(Self {
            last_metadata_block_flag: rb.read_boolean()?,
            block_type: rb.read_unsigned8(7)?,
            metadata_data_block_length: rb.read_unsigned32(24)?,
        })
    }
}

/// The STREAMINFO block payload. Fields hold raw wire values; IAMF fixes
/// the frame sizes to zero, the channel field to 1 (it is ignored, channel
/// counts come from the audio element) and the MD5 signature to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlacMetaBlockStreamInfo {
    /// Minimum block size in samples.
    pub minimum_block_size: u16,
    /// Maximum block size in samples.
    pub maximum_block_size: u16,
    /// Minimum frame size; fixed to 0. 24 bits.
    pub minimum_frame_size: u32,
    /// Maximum frame size; fixed to 0. 24 bits.
    pub maximum_frame_size: u32,
    /// Sample rate, 20 bits.
    pub sample_rate: u32,
    /// Raw channel field; fixed to 1 and ignored. 3 bits.
    pub number_of_channels: u8,
    /// Raw bits-per-sample field, one less than the depth. 5 bits.
    pub bits_per_sample: u8,
    /// Total samples in the stream, 36 bits; 0 means unknown.
    pub total_samples_in_stream: u64,
    /// MD5 of the unencoded audio; fixed to zero.
    pub md5_signature: [u8; 16],
}

impl FlacMetaBlockStreamInfo {
    /// Encoded size of a STREAMINFO payload in bytes.
    pub const ENCODED_SIZE: u32 = 34;
    /// FLAC bounds on the sample rate.
    pub const MIN_SAMPLE_RATE: u32 = 1;
    /// Upper bound from the 20-bit field as constrained by FLAC.
    pub const MAX_SAMPLE_RATE: u32 = 655_350;
    /// FLAC bounds on the raw bits-per-sample field.
    pub const MIN_BITS_PER_SAMPLE: u8 = 3;
    /// Upper bound of the raw 5-bit field.
    pub const MAX_BITS_PER_SAMPLE: u8 = 31;
    /// Upper bound of the 36-bit total-samples field.
    pub const MAX_TOTAL_SAMPLES_IN_STREAM: u64 = 0xf_ffff_ffff;
    /// The pinned raw channel field value.
    pub const NUMBER_OF_CHANNELS: u8 = 1;

    /// The bit depth represented by the raw field.
    pub fn bit_depth(&self) -> u8 {
        self.bits_per_sample + 1
    }

    fn validate(&self) -> Result<()> {
        if self.minimum_frame_size != 0 || self.maximum_frame_size != 0 {
            return Err(Error::invalid_argument(
                "FLAC frame sizes must be 0 in IAMF".to_string(),
            ));
        }
        if self.number_of_channels != Self::NUMBER_OF_CHANNELS {
            return Err(Error::invalid_argument(format!(
                "FLAC number_of_channels field must be {}, got {}",
                Self::NUMBER_OF_CHANNELS,
                self.number_of_channels
            )));
        }
        if self.md5_signature != [0u8; 16] {
            return Err(Error::invalid_argument(
                "FLAC md5_signature must be zero in IAMF".to_string(),
            ));
        }
        if self.sample_rate < Self::MIN_SAMPLE_RATE || self.sample_rate > Self::MAX_SAMPLE_RATE {
            return Err(Error::invalid_argument(format!(
                "FLAC sample_rate {} out of [{}, {}]",
                self.sample_rate,
                Self::MIN_SAMPLE_RATE,
                Self::MAX_SAMPLE_RATE
            )));
        }
        if self.bits_per_sample < Self::MIN_BITS_PER_SAMPLE {
            return Err(Error::invalid_argument(format!(
                "FLAC bits_per_sample field {} below minimum {}",
                self.bits_per_sample,
                Self::MIN_BITS_PER_SAMPLE
            )));
        }
        if self.total_samples_in_stream > Self::MAX_TOTAL_SAMPLES_IN_STREAM {
            return Err(Error::invalid_argument(format!(
                "FLAC total_samples_in_stream {} does not fit in 36 bits",
                self.total_samples_in_stream
            )));
        }
        Ok(())
    }

    fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        wb.write_unsigned(u64::from(self.minimum_block_size), 16)?;
        wb.write_unsigned(u64::from(self.maximum_block_size), 16)?;
        wb.write_unsigned(u64::from(self.minimum_frame_size), 24)?;
        wb.write_unsigned(u64::from(self.maximum_frame_size), 24)?;
        wb.write_unsigned(u64::from(self.sample_rate), 20)?;
        wb.write_unsigned(u64::from(self.number_of_channels), 3)?;
        wb.write_unsigned(u64::from(self.bits_per_sample), 5)?;
        wb.write_unsigned(self.total_samples_in_stream, 36)?;
        wb.write_bytes(&self.md5_signature)
    }

    fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let minimum_block_size = rb.read_unsigned16(16)?;
        let maximum_block_size = rb.read_unsigned16(16)?;
        let minimum_frame_size = rb.read_unsigned32(24)?;
        let maximum_frame_size = rb.read_unsigned32(24)?;
        let sample_rate = rb.read_unsigned32(20)?;
        let number_of_channels = rb.read_unsigned8(3)?;
        let bits_per_sample = rb.read_unsigned8(5)?;
        let total_samples_in_stream = rb.read_unsigned64(36)?;
        let mut md5_signature = [0u8; 16];
        rb.read_uint8_span(&mut md5_signature)?;
        let info = Self {
            minimum_block_size,
            maximum_block_size,
            minimum_frame_size,
            maximum_frame_size,
            sample_rate,
            number_of_channels,
            bits_per_sample,
            total_samples_in_stream,
            md5_signature,
        };
        info.validate()?;
        Ok(info)
    }
}

/// One FLAC metadata block: STREAMINFO is parsed, any other type is passed
/// along opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlacMetadataBlock {
    /// The block header.
    pub header: FlacMetaBlockHeader,
    /// The block payload.
    pub payload: FlacBlockPayload,
}

/// Payload of a FLAC metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlacBlockPayload {
    /// A parsed STREAMINFO block.
    StreamInfo(FlacMetaBlockStreamInfo),
    /// Opaque bytes of any other block type.
    Opaque(Vec<u8>),
}

/// The `decoder_config` for `fLaC` streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlacDecoderConfig {
    /// The metadata blocks, STREAMINFO first.
    pub metadata_blocks: Vec<FlacMetadataBlock>,
}

impl FlacDecoderConfig {
    /// The parsed STREAMINFO block.
    pub fn stream_info(&self) -> Result<&FlacMetaBlockStreamInfo> {
        match self.metadata_blocks.first().map(|block| &block.payload) {
            Some(FlacBlockPayload::StreamInfo(info)) => Ok(info),
            _ => Err(Error::invalid_argument(
                "FLAC decoder config must start with a STREAMINFO block".to_string(),
            )),
        }
    }

    /// The output sample rate represented within the decoder config.
    pub fn sample_rate(&self) -> Result<u32> {
        Ok(self.stream_info()?.sample_rate)
    }

    /// Validate block ordering and the last-block flags.
    pub fn validate(&self) -> Result<()> {
        self.stream_info()?;
        for (i, block) in self.metadata_blocks.iter().enumerate() {
            let is_last = i + 1 == self.metadata_blocks.len();
            if block.header.last_metadata_block_flag != is_last {
                return Err(Error::invalid_argument(format!(
                    "last_metadata_block_flag wrong on block {i}"
                )));
            }
            let expected_length = match &block.payload {
                FlacBlockPayload::StreamInfo(_) => FlacMetaBlockStreamInfo::ENCODED_SIZE,
                FlacBlockPayload::Opaque(bytes) => bytes.len() as u32,
            };
            if block.header.metadata_data_block_length != expected_length {
                return Err(Error::invalid_argument(format!(
                    "Block {i} declares {} payload bytes but carries {expected_length}",
                    block.header.metadata_data_block_length
                )));
            }
        }
        Ok(())
    }

    /// Serialize the metadata blocks.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        for block in &self.metadata_blocks {
            block.header.write(wb)?;
            match &block.payload {
                FlacBlockPayload::StreamInfo(info) => info.write(wb)?,
                FlacBlockPayload::Opaque(bytes) => wb.write_bytes(bytes)?,
            }
        }
        Ok(())
    }

    /// Parse the metadata blocks.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let mut metadata_blocks = Vec::new();
        loop {
            let header = FlacMetaBlockHeader::read(rb)?;
            let payload = if metadata_blocks.is_empty() {
                if header.block_type != FlacMetaBlockHeader::BLOCK_TYPE_STREAMINFO {
                    return Err(Error::invalid_argument(
                        "First FLAC metadata block must be STREAMINFO".to_string(),
                    ));
                }
                FlacBlockPayload::StreamInfo(FlacMetaBlockStreamInfo::read(rb)?)
            } else {
                let mut bytes = vec![0u8; header.metadata_data_block_length as usize];
                rb.read_uint8_span(&mut bytes)?;
                FlacBlockPayload::Opaque(bytes)
            };
            let is_last = header.last_metadata_block_flag;
            metadata_blocks.push(FlacMetadataBlock { header, payload });
            if is_last {
                break;
            }
        }
        let config = Self { metadata_blocks };
        config.validate()?;
        Ok(config)
    }
}

//! Codec-specific decoder configs carried by Codec Config OBUs.

pub mod aac;
pub mod flac;
pub mod lpcm;
pub mod opus;

pub use aac::{AacDecoderConfig, AudioSpecificConfig};
pub use flac::{
    FlacBlockPayload, FlacDecoderConfig, FlacMetaBlockHeader, FlacMetaBlockStreamInfo,
    FlacMetadataBlock,
};
pub use lpcm::{LpcmDecoderConfig, LpcmSampleFormat};
pub use opus::OpusDecoderConfig;

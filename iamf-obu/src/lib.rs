//! # IAMF OBU
//!
//! The OBU (Open Bitstream Unit) model for the IAMF encoder toolchain.
//!
//! Every OBU is a closed tagged variant dispatched by `obu_type` and exposes
//! the same capability set: serialize into a [`iamf_core::WriteBitBuffer`],
//! validate, and compare for equality. Serialization always proceeds in two
//! passes through the write buffer's nested sub-buffer so that the encoded
//! `obu_size` is exact.

#![warn(missing_docs)]

pub mod arbitrary;
pub mod audio_element;
pub mod audio_frame;
pub mod codec_config;
pub mod decoder_config;
pub mod header;
pub mod ia_sequence_header;
pub mod mix_presentation;
pub mod param_definitions;
pub mod parameter_block;
pub mod parameter_data;
pub mod temporal_delimiter;
pub mod types;

pub use arbitrary::{ArbitraryObu, InsertionHook};
pub use audio_element::{
    AmbisonicsConfig, AudioElementConfig, AudioElementObu, AudioElementParam, AudioElementType,
    ChannelAudioLayerConfig, ChannelNumbers, LoudspeakerLayout, ScalableChannelLayoutConfig,
};
pub use audio_frame::AudioFrameObu;
pub use codec_config::{CodecConfig, CodecConfigObu, CodecId, DecoderConfig};
pub use header::{Obu, ObuHeader};
pub use ia_sequence_header::IaSequenceHeaderObu;
pub use mix_presentation::{
    AnchoredLoudnessElement, HeadphonesRenderingMode, Layout, LoudnessInfo, MixPresentationLayout,
    MixPresentationObu, MixPresentationSubMix, RenderingConfig, SoundSystem, SubMixAudioElement,
};
pub use param_definitions::{
    DemixingParamDefinition, MixGainParamDefinition, ParamDefinition, ParamDefinitionType,
    ParamDefinitionVariant, ReconGainParamDefinition,
};
pub use parameter_block::{ParameterBlockObu, ParameterSubblock, PerIdParameterMetadata};
pub use parameter_data::{
    DMixPMode, DemixingInfoParameterData, MixGainParameterData, ParameterData, ReconGainElement,
    ReconGainInfoParameterData,
};
pub use temporal_delimiter::TemporalDelimiterObu;
pub use types::{ObuType, ProfileVersion};

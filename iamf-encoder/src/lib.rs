//! # IAMF Encoder
//!
//! The temporal-unit sequencing layer of the IAMF toolchain: user-metadata
//! ingestion, descriptor generation, the parameter engine, the
//! temporal-unit assembler, the OBU sequencer, and the encoder façade.
//!
//! Audio codecs beyond LPCM, renderers, and loudness calculators are
//! external collaborators wired in through the traits in [`traits`].

#![warn(missing_docs)]

pub mod channel_label;
pub mod config;
pub mod data;
pub mod encoder;
pub mod generators;
pub mod lpcm;
pub mod parameters;
pub mod sequencer;
pub mod temporal_unit;
pub mod traits;

pub use channel_label::ChannelLabel;
pub use data::{
    AudioElementWithData, AudioFrameWithData, IdLabeledFrameMap, InternalSampleType, LabeledFrame,
    ParameterBlockWithData,
};
pub use encoder::{DescriptorObus, IamfEncoder, TemporalUnitData};
pub use lpcm::{LpcmCodec, LpcmCodecFactory};
pub use sequencer::{ObuSequencer, SequencerOutput};
pub use temporal_unit::{generate_temporal_unit_map, TemporalUnit, TemporalUnitMap};
pub use traits::{
    AudioCodec, AudioCodecFactory, LoudnessCalculator, LoudnessCalculatorFactory, Renderer,
    RendererFactory,
};

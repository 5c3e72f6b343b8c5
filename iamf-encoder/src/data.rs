//! Data carriers binding OBUs to the time axis and to their descriptors.
//!
//! Audio frames reference their audio element by id rather than by
//! pointer; the sequencer resolves the id against the descriptor map at
//! emit time and fails with `FailedPrecondition` when it is absent.

use std::collections::BTreeMap;

use iamf_core::DecodedUleb128;
use iamf_obu::{AudioElementObu, AudioFrameObu, ChannelNumbers, ParameterBlockObu};

use crate::channel_label::ChannelLabel;

/// The sample type carried between the façade and its collaborators.
pub type InternalSampleType = f64;

/// An audio element OBU together with the side data the engine resolves
/// from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioElementWithData {
    /// The descriptor OBU.
    pub obu: AudioElementObu,
    /// The codec config the element references.
    pub codec_config_id: DecodedUleb128,
    /// Channel tuples per scalable layer; empty for scene-based elements.
    pub channel_numbers_for_layers: Vec<ChannelNumbers>,
}

/// An audio frame OBU on the time axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrameWithData {
    /// The data OBU.
    pub obu: AudioFrameObu,
    /// Start of the frame on the audio time axis.
    pub start_timestamp: i64,
    /// End of the frame on the audio time axis.
    pub end_timestamp: i64,
    /// The audio element this frame's substream belongs to.
    pub audio_element_id: DecodedUleb128,
}

/// A parameter block OBU on the time axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBlockWithData {
    /// The data OBU.
    pub obu: ParameterBlockObu,
    /// Start of the block on the audio time axis.
    pub start_timestamp: i64,
    /// End of the block on the audio time axis.
    pub end_timestamp: i64,
}

/// The decoded samples of one audio element over one temporal unit,
/// keyed by channel label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledFrame {
    /// End of the frame on the audio time axis.
    pub end_timestamp: i64,
    /// Channel-wise samples.
    pub label_to_samples: BTreeMap<ChannelLabel, Vec<InternalSampleType>>,
}

/// Labeled frames per audio element id for one temporal unit.
pub type IdLabeledFrameMap = BTreeMap<DecodedUleb128, LabeledFrame>;

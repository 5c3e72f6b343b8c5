//! The user-metadata configuration record.
//!
//! These types mirror the recognized configuration keys one-to-one. The
//! CLI deserializes them from JSON; the generators in [`crate::generators`]
//! turn them into descriptor OBUs. Enum value names follow the original
//! metadata vocabulary so existing configuration carries over unchanged.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use iamf_core::{DecodedUleb128, Error, Result};
use iamf_obu::DMixPMode;

/// The complete user-supplied metadata driving one encoding session.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserMetadata {
    /// Exactly one entry is required.
    #[serde(default)]
    pub ia_sequence_header_metadata: Vec<IaSequenceHeaderMetadata>,
    /// One entry per Codec Config OBU.
    #[serde(default)]
    pub codec_config_metadata: Vec<CodecConfigMetadata>,
    /// One entry per Audio Element OBU.
    #[serde(default)]
    pub audio_element_metadata: Vec<AudioElementMetadata>,
    /// One entry per Mix Presentation OBU.
    #[serde(default)]
    pub mix_presentation_metadata: Vec<MixPresentationMetadata>,
    /// One entry per audio element that receives samples.
    #[serde(default)]
    pub audio_frame_metadata: Vec<AudioFrameMetadata>,
    /// Parameter blocks, ordered by start timestamp.
    #[serde(default)]
    pub parameter_block_metadata: Vec<ParameterBlockMetadata>,
    /// User-injected arbitrary OBUs.
    #[serde(default)]
    pub arbitrary_obu_metadata: Vec<ArbitraryObuMetadata>,
}

/// A profile named in the sequence header metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ProfileVersionMetadata {
    /// Simple profile.
    #[serde(rename = "SIMPLE")]
    Simple,
    /// Base profile.
    #[serde(rename = "BASE")]
    Base,
    /// Base-Enhanced profile.
    #[serde(rename = "BASE_ENHANCED")]
    BaseEnhanced,
}

/// `ia_sequence_header_metadata`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IaSequenceHeaderMetadata {
    /// The primary profile.
    pub primary_profile: ProfileVersionMetadata,
    /// The additional profile.
    pub additional_profile: ProfileVersionMetadata,
}

/// A codec named in codec config metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CodecIdMetadata {
    /// Uncompressed PCM.
    #[serde(rename = "LPCM")]
    Lpcm,
    /// Opus.
    #[serde(rename = "OPUS")]
    Opus,
    /// AAC-LC.
    #[serde(rename = "AAC")]
    Aac,
    /// FLAC.
    #[serde(rename = "FLAC")]
    Flac,
}

/// LPCM sample byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LpcmFormatFlagsMetadata {
    /// Little-endian samples.
    #[serde(rename = "LPCM_LITTLE_ENDIAN")]
    LittleEndian,
    /// Big-endian samples.
    #[serde(rename = "LPCM_BIG_ENDIAN")]
    BigEndian,
}

/// `decoder_config_lpcm`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LpcmDecoderConfigMetadata {
    /// Sample byte order.
    pub sample_format_flags: LpcmFormatFlagsMetadata,
    /// Bits per sample.
    pub sample_size: u8,
    /// Samples per second.
    pub sample_rate: u32,
}

/// `decoder_config_opus`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpusDecoderConfigMetadata {
    /// Identification header version.
    #[serde(default = "default_opus_version")]
    pub version: u8,
    /// Samples to discard at the start of the stream, at 48 kHz.
    #[serde(default)]
    pub pre_skip: u16,
    /// Sample rate of the original input.
    pub input_sample_rate: u32,
}

fn default_opus_version() -> u8 {
    1
}

/// `decoder_config_aac`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AacDecoderConfigMetadata {
    /// Decoder input buffer size.
    #[serde(default)]
    pub buffer_size_db: u32,
    /// Maximum bitrate in bits per second.
    #[serde(default)]
    pub max_bitrate: u32,
    /// Average bitrate in bits per second.
    #[serde(default)]
    pub average_bitrate: u32,
    /// Index into the AAC sampling-frequency table.
    pub sample_frequency_index: u8,
    /// Explicit frequency when the index escapes.
    #[serde(default)]
    pub sampling_frequency: Option<u32>,
}

/// `decoder_config_flac`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlacDecoderConfigMetadata {
    /// STREAMINFO minimum block size; defaults to the frame size.
    #[serde(default)]
    pub minimum_block_size: Option<u16>,
    /// STREAMINFO maximum block size; defaults to the frame size.
    #[serde(default)]
    pub maximum_block_size: Option<u16>,
    /// Samples per second.
    pub sample_rate: u32,
    /// Bits per sample.
    pub sample_size: u8,
    /// Total samples in the stream; 0 when unknown.
    #[serde(default)]
    pub total_samples_in_stream: u64,
}

/// The codec-parameter record nested in `codec_config_metadata`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodecConfigSpecMetadata {
    /// The codec.
    pub codec_id: CodecIdMetadata,
    /// Samples per audio frame.
    pub num_samples_per_frame: DecodedUleb128,
    /// Roll distance; validated against the codec's requirement.
    pub audio_roll_distance: i16,
    /// Present when `codec_id` is LPCM.
    #[serde(default)]
    pub decoder_config_lpcm: Option<LpcmDecoderConfigMetadata>,
    /// Present when `codec_id` is OPUS.
    #[serde(default)]
    pub decoder_config_opus: Option<OpusDecoderConfigMetadata>,
    /// Present when `codec_id` is AAC.
    #[serde(default)]
    pub decoder_config_aac: Option<AacDecoderConfigMetadata>,
    /// Present when `codec_id` is FLAC.
    #[serde(default)]
    pub decoder_config_flac: Option<FlacDecoderConfigMetadata>,
}

/// `codec_config_metadata`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodecConfigMetadata {
    /// The id audio elements reference.
    pub codec_config_id: DecodedUleb128,
    /// The codec parameters.
    pub codec_config: CodecConfigSpecMetadata,
}

/// An audio element type named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AudioElementTypeMetadata {
    /// Channel-based.
    #[serde(rename = "AUDIO_ELEMENT_CHANNEL_BASED")]
    ChannelBased,
    /// Scene-based.
    #[serde(rename = "AUDIO_ELEMENT_SCENE_BASED")]
    SceneBased,
}

/// A loudspeaker layout named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LoudspeakerLayoutMetadata {
    /// Mono.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_MONO")]
    Mono,
    /// Stereo.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_STEREO")]
    Stereo,
    /// 5.1.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_5_1_CH")]
    Surround5_1,
    /// 5.1.2.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_5_1_2_CH")]
    Surround5_1_2,
    /// 5.1.4.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_5_1_4_CH")]
    Surround5_1_4,
    /// 7.1.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_7_1_CH")]
    Surround7_1,
    /// 7.1.2.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_7_1_2_CH")]
    Surround7_1_2,
    /// 7.1.4.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_7_1_4_CH")]
    Surround7_1_4,
    /// 3.1.2.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_3_1_2_CH")]
    Surround3_1_2,
    /// Binaural.
    #[serde(rename = "LOUDSPEAKER_LAYOUT_BINAURAL")]
    Binaural,
}

/// One layer of `scalable_channel_layout_config`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelAudioLayerConfigMetadata {
    /// The layout this layer reconstructs.
    pub loudspeaker_layout: LoudspeakerLayoutMetadata,
    /// Whether the layer carries an output gain.
    #[serde(default)]
    pub output_gain_is_present_flag: u8,
    /// Whether recon gain applies to this layer.
    #[serde(default)]
    pub recon_gain_is_present_flag: u8,
    /// Substreams introduced by this layer.
    pub substream_count: u8,
    /// Coupled substreams among them.
    pub coupled_substream_count: u8,
    /// Mask of channels the output gain applies to.
    #[serde(default)]
    pub output_gain_flags: u8,
    /// Output gain in Q7.8 dB.
    #[serde(default)]
    pub output_gain: i16,
}

/// `channel_layout_config` for channel-based elements.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScalableChannelLayoutConfigMetadata {
    /// The layers, lowest first.
    pub channel_audio_layer_configs: Vec<ChannelAudioLayerConfigMetadata>,
}

/// The ambisonics mode named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AmbisonicsModeMetadata {
    /// One substream per channel.
    #[serde(rename = "AMBISONICS_MODE_MONO")]
    Mono,
    /// Substreams mixed through a demixing matrix.
    #[serde(rename = "AMBISONICS_MODE_PROJECTION")]
    Projection,
}

/// `scene_based_config` for scene-based elements.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AmbisonicsConfigMetadata {
    /// The ambisonics mode.
    pub ambisonics_mode: AmbisonicsModeMetadata,
    /// Number of ambisonics channels.
    pub output_channel_count: u8,
    /// Number of substreams.
    pub substream_count: u8,
    /// Coupled substreams; projection mode only.
    #[serde(default)]
    pub coupled_substream_count: u8,
    /// ACN channel to substream mapping; mono mode only.
    #[serde(default)]
    pub channel_mapping: Vec<u8>,
    /// Row-major demixing matrix in Q7.8; projection mode only.
    #[serde(default)]
    pub demixing_matrix: Vec<i16>,
}

/// A parameter definition type named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ParamDefinitionTypeMetadata {
    /// Mix gain.
    #[serde(rename = "PARAM_DEFINITION_TYPE_MIX_GAIN")]
    MixGain,
    /// Demixing.
    #[serde(rename = "PARAM_DEFINITION_TYPE_DEMIXING")]
    Demixing,
    /// Recon gain.
    #[serde(rename = "PARAM_DEFINITION_TYPE_RECON_GAIN")]
    ReconGain,
    /// Any unrecognized type; skipped with a warning.
    #[serde(other)]
    Unknown,
}

/// The base fields shared by every parameter definition in metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParamDefinitionMetadata {
    /// The parameter id.
    pub parameter_id: DecodedUleb128,
    /// Ticks per second of the parameter time base.
    pub parameter_rate: DecodedUleb128,
    /// Whether parameter blocks carry their own schedule.
    #[serde(default)]
    pub param_definition_mode: u8,
    /// Reserved bits.
    #[serde(default)]
    pub reserved: u32,
    /// Total duration in parameter-rate ticks.
    #[serde(default)]
    pub duration: DecodedUleb128,
    /// Declared number of subblocks.
    #[serde(default)]
    pub num_subblocks: DecodedUleb128,
    /// Duration shared by every subblock; 0 selects the explicit list.
    #[serde(default)]
    pub constant_subblock_duration: DecodedUleb128,
    /// Explicit per-subblock durations.
    #[serde(default)]
    pub subblock_durations: Vec<DecodedUleb128>,
}

/// The demixing mode named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DMixPModeMetadata {
    /// Mode 1.
    #[serde(rename = "DMIXP_MODE_1")]
    Mode1,
    /// Mode 2.
    #[serde(rename = "DMIXP_MODE_2")]
    Mode2,
    /// Mode 3.
    #[serde(rename = "DMIXP_MODE_3")]
    Mode3,
    /// Mode 1, frame-adaptive.
    #[serde(rename = "DMIXP_MODE_1_N")]
    Mode1N,
    /// Mode 2, frame-adaptive.
    #[serde(rename = "DMIXP_MODE_2_N")]
    Mode2N,
    /// Mode 3, frame-adaptive.
    #[serde(rename = "DMIXP_MODE_3_N")]
    Mode3N,
}

/// The named-mode pairs shared by both directions of the lookup.
const DMIXP_MODE_PAIRS: [(DMixPModeMetadata, DMixPMode); 6] = [
    (DMixPModeMetadata::Mode1, DMixPMode::Mode1),
    (DMixPModeMetadata::Mode2, DMixPMode::Mode2),
    (DMixPModeMetadata::Mode3, DMixPMode::Mode3),
    (DMixPModeMetadata::Mode1N, DMixPMode::Mode1N),
    (DMixPModeMetadata::Mode2N, DMixPMode::Mode2N),
    (DMixPModeMetadata::Mode3N, DMixPMode::Mode3N),
];

impl DMixPModeMetadata {
    /// Map the named mode to its wire enum through the process-lifetime
    /// table.
    pub fn to_internal(self) -> DMixPMode {
        static MAP: OnceLock<BTreeMap<u8, DMixPMode>> = OnceLock::new();
        let map = MAP.get_or_init(|| {
            DMIXP_MODE_PAIRS
                .iter()
                .map(|&(metadata, internal)| (metadata as u8, internal))
                .collect()
        });
        map[&(self as u8)]
    }

    /// Map a wire enum back to its named mode; exact inverse of
    /// [`Self::to_internal`] for every named mode.
    pub fn from_internal(mode: DMixPMode) -> Result<Self> {
        static MAP: OnceLock<BTreeMap<u8, DMixPModeMetadata>> = OnceLock::new();
        let map = MAP.get_or_init(|| {
            DMIXP_MODE_PAIRS
                .iter()
                .map(|&(metadata, internal)| (internal.to_u8(), metadata))
                .collect()
        });
        map.get(&mode.to_u8()).copied().ok_or_else(|| {
            Error::invalid_argument(format!("dmixp_mode {mode:?} has no metadata name"))
        })
    }
}

/// `audio_element_params[]` entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioElementParamMetadata {
    /// The declared definition type.
    pub param_definition_type: ParamDefinitionTypeMetadata,
    /// Present for demixing definitions.
    #[serde(default)]
    pub demixing_param: Option<DemixingParamDefinitionMetadata>,
    /// Present for recon gain definitions.
    #[serde(default)]
    pub recon_gain_param: Option<ReconGainParamDefinitionMetadata>,
}

/// A demixing parameter definition in metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemixingParamDefinitionMetadata {
    /// The base definition.
    pub param_definition: ParamDefinitionMetadata,
    /// The default demixing mode.
    pub default_dmixp_mode: DMixPModeMetadata,
    /// The default weighting index.
    #[serde(default)]
    pub default_w: u8,
}

/// A recon gain parameter definition in metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconGainParamDefinitionMetadata {
    /// The base definition.
    pub param_definition: ParamDefinitionMetadata,
}

/// `audio_element_metadata`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioElementMetadata {
    /// The element id.
    pub audio_element_id: DecodedUleb128,
    /// The element type.
    pub audio_element_type: AudioElementTypeMetadata,
    /// Reserved bits.
    #[serde(default)]
    pub reserved: u32,
    /// The referenced codec config.
    pub codec_config_id: DecodedUleb128,
    /// Declared substream count; must match the id list.
    pub num_substreams: DecodedUleb128,
    /// The substream ids.
    pub audio_substream_ids: Vec<DecodedUleb128>,
    /// Present for channel-based elements.
    #[serde(default)]
    pub scalable_channel_layout_config: Option<ScalableChannelLayoutConfigMetadata>,
    /// Present for scene-based elements.
    #[serde(default)]
    pub ambisonics_config: Option<AmbisonicsConfigMetadata>,
    /// Nested parameter definitions.
    #[serde(default)]
    pub audio_element_params: Vec<AudioElementParamMetadata>,
}

/// The headphones rendering mode named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum HeadphonesRenderingModeMetadata {
    /// Downmix to stereo.
    #[serde(rename = "HEADPHONES_RENDERING_MODE_STEREO")]
    Stereo,
    /// Render binaurally.
    #[serde(rename = "HEADPHONES_RENDERING_MODE_BINAURAL")]
    Binaural,
}

/// `rendering_config`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderingConfigMetadata {
    /// Rendering mode for headphones playback.
    pub headphones_rendering_mode: HeadphonesRenderingModeMetadata,
}

/// A mix gain definition with its default value.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MixGainParamDefinitionMetadata {
    /// The base definition.
    pub param_definition: ParamDefinitionMetadata,
    /// Gain applied when no parameter block supplies one.
    #[serde(default)]
    pub default_mix_gain: i16,
}

/// An audio element bound into a sub-mix.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubMixAudioElementMetadata {
    /// The referenced element.
    pub audio_element_id: DecodedUleb128,
    /// One label per annotation language.
    #[serde(default)]
    pub localized_element_annotations: Vec<String>,
    /// How to render this element.
    pub rendering_config: RenderingConfigMetadata,
    /// The element's mix gain.
    pub element_mix_gain: MixGainParamDefinitionMetadata,
}

/// The layout type named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LayoutTypeMetadata {
    /// A loudspeaker layout in SS convention.
    #[serde(rename = "LAYOUT_TYPE_LOUDSPEAKERS_SS_CONVENTION")]
    LoudspeakersSsConvention,
    /// Binaural playback.
    #[serde(rename = "LAYOUT_TYPE_BINAURAL")]
    Binaural,
}

/// The sound system named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[allow(missing_docs)]
pub enum SoundSystemMetadata {
    #[serde(rename = "SOUND_SYSTEM_A_0_2_0")]
    A0_2_0,
    #[serde(rename = "SOUND_SYSTEM_B_0_5_0")]
    B0_5_0,
    #[serde(rename = "SOUND_SYSTEM_C_2_5_0")]
    C2_5_0,
    #[serde(rename = "SOUND_SYSTEM_D_4_5_0")]
    D4_5_0,
    #[serde(rename = "SOUND_SYSTEM_E_4_5_1")]
    E4_5_1,
    #[serde(rename = "SOUND_SYSTEM_F_3_7_0")]
    F3_7_0,
    #[serde(rename = "SOUND_SYSTEM_G_4_9_0")]
    G4_9_0,
    #[serde(rename = "SOUND_SYSTEM_H_9_10_3")]
    H9_10_3,
    #[serde(rename = "SOUND_SYSTEM_I_0_7_0")]
    I0_7_0,
    #[serde(rename = "SOUND_SYSTEM_J_4_7_0")]
    J4_7_0,
    #[serde(rename = "SOUND_SYSTEM_EXT_7_1_2")]
    Extended7_1_2,
    #[serde(rename = "SOUND_SYSTEM_EXT_3_1_2")]
    Extended3_1_2,
    #[serde(rename = "SOUND_SYSTEM_MONO")]
    Mono,
    #[serde(rename = "SOUND_SYSTEM_EXT_9_1_6")]
    Extended9_1_6,
}

/// `ss_layout`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SsLayoutMetadata {
    /// The sound system.
    pub sound_system: SoundSystemMetadata,
    /// Reserved bits.
    #[serde(default)]
    pub reserved: u32,
}

/// `loudness_layout`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoudnessLayoutMetadata {
    /// The layout type.
    pub layout_type: LayoutTypeMetadata,
    /// Present for SS-convention layouts.
    #[serde(default)]
    pub ss_layout: Option<SsLayoutMetadata>,
}

/// Loudness info-type bits named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LoudnessInfoTypeMetadata {
    /// The true peak field is present.
    #[serde(rename = "LOUDNESS_INFO_TYPE_TRUE_PEAK")]
    TruePeak,
    /// Anchored loudness entries are present.
    #[serde(rename = "LOUDNESS_INFO_TYPE_ANCHORED_LOUDNESS")]
    AnchoredLoudness,
}

/// `loudness`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoudnessMetadata {
    /// The optional-field bits to set.
    #[serde(default)]
    pub info_type_bit_masks: Vec<LoudnessInfoTypeMetadata>,
    /// Integrated loudness, Q7.8 LKFS.
    #[serde(default)]
    pub integrated_loudness: i16,
    /// Digital peak, Q7.8 dBFS.
    #[serde(default)]
    pub digital_peak: i16,
    /// True peak, used when its bit is set.
    #[serde(default)]
    pub true_peak: i16,
}

/// `layouts[]` entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MixPresentationLayoutMetadata {
    /// The layout loudness is measured on.
    pub loudness_layout: LoudnessLayoutMetadata,
    /// The measurement results, or targets to validate against.
    #[serde(default)]
    pub loudness: LoudnessMetadata,
}

/// `sub_mixes[]` entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MixPresentationSubMixMetadata {
    /// The audio elements mixed together.
    pub audio_elements: Vec<SubMixAudioElementMetadata>,
    /// The gain applied to the mixed output.
    pub output_mix_gain: MixGainParamDefinitionMetadata,
    /// The loudness layouts.
    pub layouts: Vec<MixPresentationLayoutMetadata>,
}

/// `mix_presentation_metadata`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MixPresentationMetadata {
    /// The presentation id.
    pub mix_presentation_id: DecodedUleb128,
    /// Number of annotation languages.
    #[serde(default)]
    pub count_label: DecodedUleb128,
    /// BCP-47 tags, `count_label` entries.
    #[serde(default)]
    pub annotations_language: Vec<String>,
    /// Presentation labels, `count_label` entries.
    #[serde(default)]
    pub localized_presentation_annotations: Vec<String>,
    /// The sub-mixes.
    pub sub_mixes: Vec<MixPresentationSubMixMetadata>,
}

/// `audio_frame_metadata`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioFrameMetadata {
    /// WAV file carrying this element's channels, relative to the input
    /// directory. Defaults to `audio_element_<id>.wav`.
    #[serde(default)]
    pub wav_filename: Option<String>,
    /// Samples to trim from the end of the final frame.
    #[serde(default)]
    pub samples_to_trim_at_end: DecodedUleb128,
    /// Samples to trim from the start of the stream.
    #[serde(default)]
    pub samples_to_trim_at_start: DecodedUleb128,
    /// The element these channels feed.
    pub audio_element_id: DecodedUleb128,
    /// Input channel indices, aligned with `channel_labels`.
    pub channel_ids: Vec<u32>,
    /// Channel labels, aligned with `channel_ids`.
    pub channel_labels: Vec<String>,
}

/// The mix gain animation named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AnimationTypeMetadata {
    /// Constant gain.
    #[serde(rename = "ANIMATE_STEP")]
    Step,
    /// Linear interpolation.
    #[serde(rename = "ANIMATE_LINEAR")]
    Linear,
    /// Bezier interpolation.
    #[serde(rename = "ANIMATE_BEZIER")]
    Bezier,
}

/// `mix_gain_parameter_data`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MixGainParameterDataMetadata {
    /// The animation type.
    pub animation_type: AnimationTypeMetadata,
    /// Gain at the start of the subblock.
    #[serde(default)]
    pub start_point_value: i16,
    /// Gain at the end; linear and bezier only.
    #[serde(default)]
    pub end_point_value: i16,
    /// Control point gain; bezier only.
    #[serde(default)]
    pub control_point_value: i16,
    /// Control point relative time; bezier only.
    #[serde(default)]
    pub control_point_relative_time: u8,
}

/// `demixing_info_parameter_data`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemixingInfoParameterDataMetadata {
    /// The demixing mode.
    pub dmixp_mode: DMixPModeMetadata,
    /// Reserved bits.
    #[serde(default)]
    pub reserved: u32,
}

/// One layer's recon gains: channel index to gain byte.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReconGainsForLayerMetadata {
    /// Gains keyed by channel bit position.
    #[serde(default)]
    pub recon_gain: BTreeMap<u8, u8>,
}

/// `recon_gain_info_parameter_data`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReconGainInfoParameterDataMetadata {
    /// Per-layer gains, aligned with the element's layers.
    #[serde(default)]
    pub recon_gains_for_layer: Vec<ReconGainsForLayerMetadata>,
}

/// `subblocks[]` entries of a parameter block.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParameterSubblockMetadata {
    /// Duration in parameter-rate ticks; explicit-schedule blocks only.
    #[serde(default)]
    pub subblock_duration: DecodedUleb128,
    /// Present for mix gain blocks.
    #[serde(default)]
    pub mix_gain_parameter_data: Option<MixGainParameterDataMetadata>,
    /// Present for demixing blocks.
    #[serde(default)]
    pub demixing_info_parameter_data: Option<DemixingInfoParameterDataMetadata>,
    /// Present for recon gain blocks.
    #[serde(default)]
    pub recon_gain_info_parameter_data: Option<ReconGainInfoParameterDataMetadata>,
}

/// `parameter_block_metadata`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParameterBlockMetadata {
    /// The parameter id.
    pub parameter_id: DecodedUleb128,
    /// Start of the block on the audio time axis.
    #[serde(default)]
    pub start_timestamp: i64,
    /// Total duration in parameter-rate ticks.
    pub duration: DecodedUleb128,
    /// Declared number of subblocks.
    #[serde(default)]
    pub num_subblocks: DecodedUleb128,
    /// Duration shared by every subblock; 0 selects explicit durations.
    #[serde(default)]
    pub constant_subblock_duration: DecodedUleb128,
    /// The subblock payloads.
    pub subblocks: Vec<ParameterSubblockMetadata>,
}

/// The insertion hook named in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum InsertionHookMetadata {
    /// After the IA Sequence Header.
    #[serde(rename = "INSERTION_HOOK_AFTER_IA_SEQUENCE_HEADER")]
    AfterIaSequenceHeader,
    /// After the Codec Config OBUs.
    #[serde(rename = "INSERTION_HOOK_AFTER_CODEC_CONFIGS")]
    AfterCodecConfigs,
    /// After the Audio Element OBUs.
    #[serde(rename = "INSERTION_HOOK_AFTER_AUDIO_ELEMENTS")]
    AfterAudioElements,
    /// After the Mix Presentation OBUs.
    #[serde(rename = "INSERTION_HOOK_AFTER_MIX_PRESENTATIONS")]
    AfterMixPresentations,
    /// After the whole descriptor prologue.
    #[serde(rename = "INSERTION_HOOK_AFTER_DESCRIPTORS")]
    AfterDescriptors,
    /// Before the parameter blocks at the insertion tick.
    #[serde(rename = "INSERTION_HOOK_BEFORE_PARAMETER_BLOCKS_AT_TICK")]
    BeforeParameterBlocksAtTick,
    /// After the parameter blocks at the insertion tick.
    #[serde(rename = "INSERTION_HOOK_AFTER_PARAMETER_BLOCKS_AT_TICK")]
    AfterParameterBlocksAtTick,
    /// After the audio frames at the insertion tick.
    #[serde(rename = "INSERTION_HOOK_AFTER_AUDIO_FRAMES_AT_TICK")]
    AfterAudioFramesAtTick,
}

/// `arbitrary_obu_metadata`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArbitraryObuMetadata {
    /// Where to splice the OBU.
    pub insertion_hook: InsertionHookMetadata,
    /// The temporal unit to splice into, for tick-bound hooks.
    #[serde(default)]
    pub insertion_tick: Option<i64>,
    /// The raw 5-bit OBU type code.
    pub obu_type: u8,
    /// The opaque payload.
    #[serde(default)]
    pub payload: String,
    /// Marks the containing temporal unit as intentionally invalid.
    #[serde(default)]
    pub invalidate_temporal_unit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dmixp_mode_table_round_trips() {
        for (metadata, internal) in DMIXP_MODE_PAIRS {
            assert_eq!(metadata.to_internal(), internal);
            assert_eq!(DMixPModeMetadata::from_internal(internal).unwrap(), metadata);
        }
    }

    #[test]
    fn test_dmixp_mode_reserved_has_no_name() {
        assert!(DMixPModeMetadata::from_internal(DMixPMode::ReservedA).is_err());
    }
}

//! Generators turning user metadata into descriptor and data OBUs.

use std::collections::BTreeMap;

use tracing::warn;

use iamf_core::{DecodedUleb128, Error, Result};
use iamf_obu::decoder_config::{
    AacDecoderConfig, AudioSpecificConfig, FlacBlockPayload, FlacDecoderConfig,
    FlacMetaBlockHeader, FlacMetaBlockStreamInfo, FlacMetadataBlock, LpcmDecoderConfig,
    LpcmSampleFormat, OpusDecoderConfig,
};
use iamf_obu::{
    AmbisonicsConfig, ArbitraryObu, AudioElementConfig, AudioElementObu, AudioElementParam,
    AudioElementType, ChannelAudioLayerConfig, CodecConfig, CodecConfigObu, CodecId,
    DecoderConfig, DemixingInfoParameterData, DemixingParamDefinition, HeadphonesRenderingMode,
    IaSequenceHeaderObu, InsertionHook, Layout, LoudnessInfo, LoudspeakerLayout,
    MixGainParamDefinition, MixGainParameterData, MixPresentationLayout, MixPresentationObu,
    MixPresentationSubMix, ObuHeader, ObuType, ParamDefinition, ParameterBlockObu,
    ParameterData, ParameterSubblock, PerIdParameterMetadata, ProfileVersion,
    ReconGainElement, ReconGainInfoParameterData, ReconGainParamDefinition, RenderingConfig,
    ScalableChannelLayoutConfig, SoundSystem, SubMixAudioElement,
};
use iamf_obu::param_definitions::ParamDefinitionType;
use iamf_obu::Obu;

use crate::config::{
    AmbisonicsModeMetadata, AnimationTypeMetadata, ArbitraryObuMetadata, AudioElementMetadata,
    AudioElementTypeMetadata, CodecConfigMetadata, CodecIdMetadata, HeadphonesRenderingModeMetadata,
    IaSequenceHeaderMetadata, InsertionHookMetadata, LayoutTypeMetadata, LoudnessInfoTypeMetadata,
    LoudnessMetadata, LoudspeakerLayoutMetadata, LpcmFormatFlagsMetadata,
    MixGainParamDefinitionMetadata, MixPresentationMetadata, ParamDefinitionMetadata,
    ParamDefinitionTypeMetadata, ParameterBlockMetadata, ProfileVersionMetadata,
    SoundSystemMetadata,
};
use crate::data::{AudioElementWithData, ParameterBlockWithData};

impl ProfileVersionMetadata {
    fn to_internal(self) -> ProfileVersion {
        match self {
            ProfileVersionMetadata::Simple => ProfileVersion::Simple,
            ProfileVersionMetadata::Base => ProfileVersion::Base,
            ProfileVersionMetadata::BaseEnhanced => ProfileVersion::BaseEnhanced,
        }
    }
}

/// Generate the IA Sequence Header OBU. Exactly one metadata entry is
/// required per IA sequence.
pub fn generate_ia_sequence_header(
    metadata: &[IaSequenceHeaderMetadata],
) -> Result<IaSequenceHeaderObu> {
    let [entry] = metadata else {
        return Err(Error::invalid_argument(format!(
            "Only one IA Sequence Header is allowed in an IA Sequence, got {}",
            metadata.len()
        )));
    };
    Ok(IaSequenceHeaderObu::new(
        ObuHeader::default(),
        IaSequenceHeaderObu::IA_CODE,
        entry.primary_profile.to_internal(),
        entry.additional_profile.to_internal(),
    ))
}

fn generate_decoder_config(metadata: &CodecConfigMetadata) -> Result<DecoderConfig> {
    let spec = &metadata.codec_config;
    match spec.codec_id {
        CodecIdMetadata::Lpcm => {
            let lpcm = spec.decoder_config_lpcm.as_ref().ok_or_else(|| {
                Error::invalid_argument("LPCM codec config is missing decoder_config_lpcm")
            })?;
            Ok(DecoderConfig::Lpcm(LpcmDecoderConfig {
                sample_format_flags: match lpcm.sample_format_flags {
                    LpcmFormatFlagsMetadata::LittleEndian => LpcmSampleFormat::LittleEndian,
                    LpcmFormatFlagsMetadata::BigEndian => LpcmSampleFormat::BigEndian,
                },
                sample_size: lpcm.sample_size,
                sample_rate: lpcm.sample_rate,
            }))
        }
        CodecIdMetadata::Opus => {
            let opus = spec.decoder_config_opus.as_ref().ok_or_else(|| {
                Error::invalid_argument("Opus codec config is missing decoder_config_opus")
            })?;
            Ok(DecoderConfig::Opus(OpusDecoderConfig {
                version: opus.version,
                output_channel_count: OpusDecoderConfig::OUTPUT_CHANNEL_COUNT,
                pre_skip: opus.pre_skip,
                input_sample_rate: opus.input_sample_rate,
                output_gain: 0,
                mapping_family: 0,
            }))
        }
        CodecIdMetadata::Aac => {
            let aac = spec.decoder_config_aac.as_ref().ok_or_else(|| {
                Error::invalid_argument("AAC codec config is missing decoder_config_aac")
            })?;
            Ok(DecoderConfig::Aac(AacDecoderConfig {
                buffer_size_db: aac.buffer_size_db,
                max_bitrate: aac.max_bitrate,
                average_bitrate: aac.average_bitrate,
                decoder_specific_info: AudioSpecificConfig {
                    sample_frequency_index: aac.sample_frequency_index,
                    sampling_frequency: aac.sampling_frequency,
                    channel_configuration: 2,
                },
            }))
        }
        CodecIdMetadata::Flac => {
            let flac = spec.decoder_config_flac.as_ref().ok_or_else(|| {
                Error::invalid_argument("FLAC codec config is missing decoder_config_flac")
            })?;
            let block_size = u16::try_from(spec.num_samples_per_frame).map_err(|_| {
                Error::invalid_argument("FLAC frame size does not fit a 16-bit block size")
            })?;
            if flac.sample_size == 0 {
                return Err(Error::invalid_argument("FLAC sample_size must be non-zero"));
            }
            Ok(DecoderConfig::Flac(FlacDecoderConfig {
                metadata_blocks: vec![FlacMetadataBlock {
                    header: FlacMetaBlockHeader {
                        last_metadata_block_flag: true,
                        block_type: FlacMetaBlockHeader::BLOCK_TYPE_STREAMINFO,
                        metadata_data_block_length: FlacMetaBlockStreamInfo::ENCODED_SIZE,
                    },
                    payload: FlacBlockPayload::StreamInfo(FlacMetaBlockStreamInfo {
                        minimum_block_size: flac.minimum_block_size.unwrap_or(block_size),
                        maximum_block_size: flac.maximum_block_size.unwrap_or(block_size),
                        minimum_frame_size: 0,
                        maximum_frame_size: 0,
                        sample_rate: flac.sample_rate,
                        number_of_channels: FlacMetaBlockStreamInfo::NUMBER_OF_CHANNELS,
                        bits_per_sample: flac.sample_size - 1,
                        total_samples_in_stream: flac.total_samples_in_stream,
                        md5_signature: [0u8; 16],
                    }),
                }],
            }))
        }
    }
}

/// Generate Codec Config OBUs keyed by `codec_config_id`.
pub fn generate_codec_configs(
    metadata: &[CodecConfigMetadata],
) -> Result<BTreeMap<DecodedUleb128, CodecConfigObu>> {
    let mut codec_configs = BTreeMap::new();
    for entry in metadata {
        let codec_id = match entry.codec_config.codec_id {
            CodecIdMetadata::Lpcm => CodecId::Lpcm,
            CodecIdMetadata::Opus => CodecId::Opus,
            CodecIdMetadata::Aac => CodecId::AacLc,
            CodecIdMetadata::Flac => CodecId::Flac,
        };
        let obu = CodecConfigObu::new(
            ObuHeader::default(),
            entry.codec_config_id,
            CodecConfig {
                codec_id,
                num_samples_per_frame: entry.codec_config.num_samples_per_frame,
                audio_roll_distance: entry.codec_config.audio_roll_distance,
                decoder_config: generate_decoder_config(entry)?,
            },
        );
        obu.validate()?;
        if codec_configs.insert(entry.codec_config_id, obu).is_some() {
            return Err(Error::invalid_argument(format!(
                "Duplicate codec_config_id = {}",
                entry.codec_config_id
            )));
        }
    }
    Ok(codec_configs)
}

/// Copy the base fields of a parameter definition out of metadata,
/// resolving the subblock schedule.
pub fn generate_param_definition(metadata: &ParamDefinitionMetadata) -> Result<ParamDefinition> {
    let mut definition = ParamDefinition {
        parameter_id: metadata.parameter_id,
        parameter_rate: metadata.parameter_rate,
        param_definition_mode: metadata.param_definition_mode != 0,
        reserved: u8::try_from(metadata.reserved).map_err(|_| {
            Error::invalid_argument("ParamDefinition.reserved does not fit in 8 bits")
        })?,
        duration: metadata.duration,
        constant_subblock_duration: metadata.constant_subblock_duration,
        subblock_durations: Vec::new(),
    };
    if !definition.param_definition_mode && definition.constant_subblock_duration == 0 {
        if metadata.num_subblocks != 0
            && metadata.num_subblocks as usize != metadata.subblock_durations.len()
        {
            return Err(Error::invalid_argument(format!(
                "Parameter definition for parameter_id = {} declares {} subblocks but \
                 lists {}",
                metadata.parameter_id,
                metadata.num_subblocks,
                metadata.subblock_durations.len()
            )));
        }
        definition.subblock_durations = metadata.subblock_durations.clone();
    }
    definition.validate()?;
    Ok(definition)
}

impl LoudspeakerLayoutMetadata {
    fn to_internal(self) -> LoudspeakerLayout {
        match self {
            LoudspeakerLayoutMetadata::Mono => LoudspeakerLayout::Mono,
            LoudspeakerLayoutMetadata::Stereo => LoudspeakerLayout::Stereo,
            LoudspeakerLayoutMetadata::Surround5_1 => LoudspeakerLayout::Surround5_1,
            LoudspeakerLayoutMetadata::Surround5_1_2 => LoudspeakerLayout::Surround5_1_2,
            LoudspeakerLayoutMetadata::Surround5_1_4 => LoudspeakerLayout::Surround5_1_4,
            LoudspeakerLayoutMetadata::Surround7_1 => LoudspeakerLayout::Surround7_1,
            LoudspeakerLayoutMetadata::Surround7_1_2 => LoudspeakerLayout::Surround7_1_2,
            LoudspeakerLayoutMetadata::Surround7_1_4 => LoudspeakerLayout::Surround7_1_4,
            LoudspeakerLayoutMetadata::Surround3_1_2 => LoudspeakerLayout::Surround3_1_2,
            LoudspeakerLayoutMetadata::Binaural => LoudspeakerLayout::Binaural,
        }
    }
}

/// Generate Audio Element OBUs with their resolved side data, keyed by
/// `audio_element_id`.
pub fn generate_audio_elements(
    metadata: &[AudioElementMetadata],
    codec_configs: &BTreeMap<DecodedUleb128, CodecConfigObu>,
) -> Result<BTreeMap<DecodedUleb128, AudioElementWithData>> {
    let mut audio_elements = BTreeMap::new();
    for entry in metadata {
        if !codec_configs.contains_key(&entry.codec_config_id) {
            return Err(Error::invalid_argument(format!(
                "Audio element {} references unknown codec_config_id = {}",
                entry.audio_element_id, entry.codec_config_id
            )));
        }
        if entry.num_substreams as usize != entry.audio_substream_ids.len() {
            return Err(Error::invalid_argument(format!(
                "Audio element {} declares {} substreams but lists {}",
                entry.audio_element_id,
                entry.num_substreams,
                entry.audio_substream_ids.len()
            )));
        }

        let mut audio_element_params = Vec::new();
        for param in &entry.audio_element_params {
            match param.param_definition_type {
                ParamDefinitionTypeMetadata::Demixing => {
                    let demixing = param.demixing_param.as_ref().ok_or_else(|| {
                        Error::invalid_argument("Demixing parameter is missing demixing_param")
                    })?;
                    audio_element_params.push(AudioElementParam::Demixing(
                        DemixingParamDefinition {
                            base: generate_param_definition(&demixing.param_definition)?,
                            default_demixing_info: DemixingInfoParameterData {
                                dmixp_mode: demixing.default_dmixp_mode.to_internal(),
                                reserved: 0,
                            },
                            default_w: demixing.default_w,
                            reserved_for_future_use: 0,
                        },
                    ));
                }
                ParamDefinitionTypeMetadata::ReconGain => {
                    let recon_gain = param.recon_gain_param.as_ref().ok_or_else(|| {
                        Error::invalid_argument("Recon gain parameter is missing recon_gain_param")
                    })?;
                    audio_element_params.push(AudioElementParam::ReconGain(
                        ReconGainParamDefinition {
                            base: generate_param_definition(&recon_gain.param_definition)?,
                            audio_element_id: entry.audio_element_id,
                        },
                    ));
                }
                ParamDefinitionTypeMetadata::MixGain => {
                    return Err(Error::invalid_argument(format!(
                        "Mix gain parameters are not allowed in audio element = {}",
                        entry.audio_element_id
                    )));
                }
                ParamDefinitionTypeMetadata::Unknown => {
                    warn!(
                        audio_element_id = entry.audio_element_id,
                        "Ignoring parameter definition of unknown type"
                    );
                    continue;
                }
            }
        }

        let (audio_element_type, config, channel_numbers_for_layers) =
            match entry.audio_element_type {
                AudioElementTypeMetadata::ChannelBased => {
                    let layout_config =
                        entry.scalable_channel_layout_config.as_ref().ok_or_else(|| {
                            Error::invalid_argument(format!(
                                "Channel-based audio element {} is missing \
                                 scalable_channel_layout_config",
                                entry.audio_element_id
                            ))
                        })?;
                    let mut layers = Vec::new();
                    let mut channel_numbers = Vec::new();
                    for layer in &layout_config.channel_audio_layer_configs {
                        let loudspeaker_layout = layer.loudspeaker_layout.to_internal();
                        channel_numbers.push(
                            loudspeaker_layout.channel_numbers().ok_or_else(|| {
                                Error::invalid_argument("Reserved loudspeaker layout")
                            })?,
                        );
                        layers.push(ChannelAudioLayerConfig {
                            loudspeaker_layout,
                            output_gain_is_present_flag: layer.output_gain_is_present_flag != 0,
                            recon_gain_is_present_flag: layer.recon_gain_is_present_flag != 0,
                            reserved_a: 0,
                            substream_count: layer.substream_count,
                            coupled_substream_count: layer.coupled_substream_count,
                            output_gain_flags: layer.output_gain_flags,
                            reserved_b: 0,
                            output_gain: layer.output_gain,
                        });
                    }
                    (
                        AudioElementType::ChannelBased,
                        AudioElementConfig::Channel(ScalableChannelLayoutConfig {
                            reserved: 0,
                            channel_audio_layer_configs: layers,
                        }),
                        channel_numbers,
                    )
                }
                AudioElementTypeMetadata::SceneBased => {
                    let ambisonics = entry.ambisonics_config.as_ref().ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "Scene-based audio element {} is missing ambisonics_config",
                            entry.audio_element_id
                        ))
                    })?;
                    let config = match ambisonics.ambisonics_mode {
                        AmbisonicsModeMetadata::Mono => AmbisonicsConfig::Mono {
                            output_channel_count: ambisonics.output_channel_count,
                            substream_count: ambisonics.substream_count,
                            channel_mapping: ambisonics.channel_mapping.clone(),
                        },
                        AmbisonicsModeMetadata::Projection => AmbisonicsConfig::Projection {
                            output_channel_count: ambisonics.output_channel_count,
                            substream_count: ambisonics.substream_count,
                            coupled_substream_count: ambisonics.coupled_substream_count,
                            demixing_matrix: ambisonics.demixing_matrix.clone(),
                        },
                    };
                    (
                        AudioElementType::SceneBased,
                        AudioElementConfig::Scene(config),
                        Vec::new(),
                    )
                }
            };

        let obu = AudioElementObu::new(
            ObuHeader::default(),
            entry.audio_element_id,
            audio_element_type,
            entry.codec_config_id,
            entry.audio_substream_ids.clone(),
            audio_element_params,
            config,
        );
        let element = AudioElementWithData {
            obu,
            codec_config_id: entry.codec_config_id,
            channel_numbers_for_layers,
        };
        if audio_elements
            .insert(entry.audio_element_id, element)
            .is_some()
        {
            return Err(Error::invalid_argument(format!(
                "Duplicate audio_element_id = {}",
                entry.audio_element_id
            )));
        }
    }
    Ok(audio_elements)
}

fn generate_mix_gain(metadata: &MixGainParamDefinitionMetadata) -> Result<MixGainParamDefinition> {
    Ok(MixGainParamDefinition {
        base: generate_param_definition(&metadata.param_definition)?,
        default_mix_gain: metadata.default_mix_gain,
    })
}

fn generate_loudness(metadata: &LoudnessMetadata) -> LoudnessInfo {
    let mut info_type = 0;
    for bit in &metadata.info_type_bit_masks {
        info_type |= match bit {
            LoudnessInfoTypeMetadata::TruePeak => LoudnessInfo::INFO_TYPE_TRUE_PEAK,
            LoudnessInfoTypeMetadata::AnchoredLoudness => {
                LoudnessInfo::INFO_TYPE_ANCHORED_LOUDNESS
            }
        };
    }
    LoudnessInfo {
        info_type,
        integrated_loudness: metadata.integrated_loudness,
        digital_peak: metadata.digital_peak,
        true_peak: metadata.true_peak,
        anchored_loudness: Vec::new(),
        info_type_extension_bytes: Vec::new(),
    }
}

impl SoundSystemMetadata {
    fn to_internal(self) -> SoundSystem {
        match self {
            SoundSystemMetadata::A0_2_0 => SoundSystem::A0_2_0,
            SoundSystemMetadata::B0_5_0 => SoundSystem::B0_5_0,
            SoundSystemMetadata::C2_5_0 => SoundSystem::C2_5_0,
            SoundSystemMetadata::D4_5_0 => SoundSystem::D4_5_0,
            SoundSystemMetadata::E4_5_1 => SoundSystem::E4_5_1,
            SoundSystemMetadata::F3_7_0 => SoundSystem::F3_7_0,
            SoundSystemMetadata::G4_9_0 => SoundSystem::G4_9_0,
            SoundSystemMetadata::H9_10_3 => SoundSystem::H9_10_3,
            SoundSystemMetadata::I0_7_0 => SoundSystem::I0_7_0,
            SoundSystemMetadata::J4_7_0 => SoundSystem::J4_7_0,
            SoundSystemMetadata::Extended7_1_2 => SoundSystem::Extended7_1_2,
            SoundSystemMetadata::Extended3_1_2 => SoundSystem::Extended3_1_2,
            SoundSystemMetadata::Mono => SoundSystem::Mono,
            SoundSystemMetadata::Extended9_1_6 => SoundSystem::Extended9_1_6,
        }
    }
}

/// Generate Mix Presentation OBUs in metadata order.
pub fn generate_mix_presentations(
    metadata: &[MixPresentationMetadata],
) -> Result<Vec<MixPresentationObu>> {
    let mut mix_presentations = Vec::with_capacity(metadata.len());
    for entry in metadata {
        let mut sub_mixes = Vec::with_capacity(entry.sub_mixes.len());
        for sub_mix in &entry.sub_mixes {
            let mut audio_elements = Vec::with_capacity(sub_mix.audio_elements.len());
            for element in &sub_mix.audio_elements {
                audio_elements.push(SubMixAudioElement {
                    audio_element_id: element.audio_element_id,
                    localized_element_annotations: element.localized_element_annotations.clone(),
                    rendering_config: RenderingConfig {
                        headphones_rendering_mode: match element
                            .rendering_config
                            .headphones_rendering_mode
                        {
                            HeadphonesRenderingModeMetadata::Stereo => {
                                HeadphonesRenderingMode::Stereo
                            }
                            HeadphonesRenderingModeMetadata::Binaural => {
                                HeadphonesRenderingMode::Binaural
                            }
                        },
                        reserved: 0,
                        rendering_config_extension_bytes: Vec::new(),
                    },
                    element_mix_gain: generate_mix_gain(&element.element_mix_gain)?,
                });
            }
            let mut layouts = Vec::with_capacity(sub_mix.layouts.len());
            for layout in &sub_mix.layouts {
                let loudness_layout = match layout.loudness_layout.layout_type {
                    LayoutTypeMetadata::LoudspeakersSsConvention => {
                        let ss_layout =
                            layout.loudness_layout.ss_layout.as_ref().ok_or_else(|| {
                                Error::invalid_argument(
                                    "SS-convention layout is missing ss_layout",
                                )
                            })?;
                        Layout::SsConvention {
                            sound_system: ss_layout.sound_system.to_internal(),
                            reserved: 0,
                        }
                    }
                    LayoutTypeMetadata::Binaural => Layout::Binaural { reserved: 0 },
                };
                layouts.push(MixPresentationLayout {
                    loudness_layout,
                    loudness: generate_loudness(&layout.loudness),
                });
            }
            sub_mixes.push(MixPresentationSubMix {
                audio_elements,
                output_mix_gain: generate_mix_gain(&sub_mix.output_mix_gain)?,
                layouts,
            });
        }
        mix_presentations.push(MixPresentationObu::new(
            ObuHeader::default(),
            entry.mix_presentation_id,
            entry.count_label,
            entry.annotations_language.clone(),
            entry.localized_presentation_annotations.clone(),
            sub_mixes,
        ));
    }
    Ok(mix_presentations)
}

impl InsertionHookMetadata {
    fn to_internal(self) -> InsertionHook {
        match self {
            InsertionHookMetadata::AfterIaSequenceHeader => InsertionHook::AfterIaSequenceHeader,
            InsertionHookMetadata::AfterCodecConfigs => InsertionHook::AfterCodecConfigs,
            InsertionHookMetadata::AfterAudioElements => InsertionHook::AfterAudioElements,
            InsertionHookMetadata::AfterMixPresentations => InsertionHook::AfterMixPresentations,
            InsertionHookMetadata::AfterDescriptors => InsertionHook::AfterDescriptors,
            InsertionHookMetadata::BeforeParameterBlocksAtTick => {
                InsertionHook::BeforeParameterBlocksAtTick
            }
            InsertionHookMetadata::AfterParameterBlocksAtTick => {
                InsertionHook::AfterParameterBlocksAtTick
            }
            InsertionHookMetadata::AfterAudioFramesAtTick => InsertionHook::AfterAudioFramesAtTick,
        }
    }
}

/// Generate arbitrary OBUs in metadata order.
pub fn generate_arbitrary_obus(metadata: &[ArbitraryObuMetadata]) -> Result<Vec<ArbitraryObu>> {
    let mut arbitrary_obus = Vec::with_capacity(metadata.len());
    for entry in metadata {
        let mut obu = ArbitraryObu::new(
            ObuType::from_code(entry.obu_type)?,
            ObuHeader::default(),
            entry.payload.as_bytes().to_vec(),
            entry.insertion_hook.to_internal(),
            entry.insertion_tick,
        );
        obu.invalidates_bitstream = entry.invalidate_temporal_unit;
        arbitrary_obus.push(obu);
    }
    Ok(arbitrary_obus)
}

/// Generate one parameter block, resolved against its per-id metadata.
pub fn generate_parameter_block(
    metadata: &ParameterBlockMetadata,
    per_id_metadata: &PerIdParameterMetadata,
) -> Result<ParameterBlockWithData> {
    if metadata.subblocks.is_empty() {
        return Err(Error::invalid_argument(format!(
            "Parameter block for parameter_id = {} has no subblocks",
            metadata.parameter_id
        )));
    }
    if metadata.num_subblocks != 0 && metadata.num_subblocks as usize != metadata.subblocks.len() {
        return Err(Error::invalid_argument(format!(
            "Parameter block declares {} subblocks but lists {}",
            metadata.num_subblocks,
            metadata.subblocks.len()
        )));
    }

    let mut subblocks = Vec::with_capacity(metadata.subblocks.len());
    for subblock in &metadata.subblocks {
        let param_data = match per_id_metadata.param_definition_type {
            ParamDefinitionType::MixGain => {
                let mix_gain = subblock.mix_gain_parameter_data.as_ref().ok_or_else(|| {
                    Error::invalid_argument("Subblock is missing mix_gain_parameter_data")
                })?;
                ParameterData::MixGain(match mix_gain.animation_type {
                    AnimationTypeMetadata::Step => MixGainParameterData::Step {
                        start_point_value: mix_gain.start_point_value,
                    },
                    AnimationTypeMetadata::Linear => MixGainParameterData::Linear {
                        start_point_value: mix_gain.start_point_value,
                        end_point_value: mix_gain.end_point_value,
                    },
                    AnimationTypeMetadata::Bezier => MixGainParameterData::Bezier {
                        start_point_value: mix_gain.start_point_value,
                        end_point_value: mix_gain.end_point_value,
                        control_point_value: mix_gain.control_point_value,
                        control_point_relative_time: mix_gain.control_point_relative_time,
                    },
                })
            }
            ParamDefinitionType::Demixing => {
                let demixing = subblock
                    .demixing_info_parameter_data
                    .as_ref()
                    .ok_or_else(|| {
                        Error::invalid_argument(
                            "Subblock is missing demixing_info_parameter_data",
                        )
                    })?;
                ParameterData::Demixing(DemixingInfoParameterData {
                    dmixp_mode: demixing.dmixp_mode.to_internal(),
                    reserved: 0,
                })
            }
            ParamDefinitionType::ReconGain => {
                let recon_gain = subblock
                    .recon_gain_info_parameter_data
                    .as_ref()
                    .ok_or_else(|| {
                        Error::invalid_argument(
                            "Subblock is missing recon_gain_info_parameter_data",
                        )
                    })?;
                let mut recon_gain_elements =
                    Vec::with_capacity(per_id_metadata.num_layers as usize);
                for (layer, &present) in per_id_metadata
                    .recon_gain_is_present_flags
                    .iter()
                    .enumerate()
                {
                    if !present {
                        recon_gain_elements.push(None);
                        continue;
                    }
                    let gains = recon_gain
                        .recon_gains_for_layer
                        .get(layer)
                        .ok_or_else(|| {
                            Error::invalid_argument(format!(
                                "Recon gains missing for layer {layer}"
                            ))
                        })?;
                    let mut recon_gain_flag = 0;
                    let mut gain_bytes = Vec::with_capacity(gains.recon_gain.len());
                    for (&bit, &gain) in &gains.recon_gain {
                        recon_gain_flag |= 1 << bit;
                        gain_bytes.push(gain);
                    }
                    recon_gain_elements.push(Some(ReconGainElement {
                        recon_gain_flag,
                        recon_gain: gain_bytes,
                    }));
                }
                ParameterData::ReconGain(ReconGainInfoParameterData {
                    recon_gain_elements,
                })
            }
            ParamDefinitionType::Reserved(tag) => {
                return Err(Error::invalid_argument(format!(
                    "Cannot generate parameter blocks for reserved definition type {tag}"
                )))
            }
        };
        subblocks.push(ParameterSubblock {
            subblock_duration: subblock.subblock_duration,
            param_data,
        });
    }

    let obu = ParameterBlockObu::new(
        ObuHeader::default(),
        metadata.parameter_id,
        per_id_metadata,
        metadata.duration,
        metadata.constant_subblock_duration,
        subblocks,
    );
    Ok(ParameterBlockWithData {
        obu,
        start_timestamp: metadata.start_timestamp,
        end_timestamp: metadata.start_timestamp + i64::from(metadata.duration),
    })
}

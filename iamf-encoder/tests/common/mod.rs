//! Shared builders for sequencer and encoder integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use iamf_core::DecodedUleb128;
use iamf_obu::decoder_config::{LpcmDecoderConfig, LpcmSampleFormat};
use iamf_obu::param_definitions::ParamDefinitionType;
use iamf_obu::{
    AmbisonicsConfig, AudioElementConfig, AudioElementObu, AudioElementType, AudioFrameObu,
    CodecConfig, CodecConfigObu, CodecId, DMixPMode, DecoderConfig, DemixingInfoParameterData,
    HeadphonesRenderingMode, IaSequenceHeaderObu, Layout, LoudnessInfo, MixGainParamDefinition,
    MixPresentationLayout, MixPresentationObu, MixPresentationSubMix, ObuHeader, ParamDefinition,
    ParameterBlockObu, ParameterData, ParameterSubblock, PerIdParameterMetadata, ProfileVersion,
    RenderingConfig, SoundSystem, SubMixAudioElement,
};

use iamf_encoder::{AudioElementWithData, AudioFrameWithData, ParameterBlockWithData};

pub const NUM_SAMPLES_PER_FRAME: DecodedUleb128 = 8;
pub const SAMPLE_RATE: u32 = 48_000;

pub fn simple_profile_sequence_header() -> IaSequenceHeaderObu {
    IaSequenceHeaderObu::new(
        ObuHeader::default(),
        IaSequenceHeaderObu::IA_CODE,
        ProfileVersion::Simple,
        ProfileVersion::Simple,
    )
}

pub fn add_lpcm_codec_config(
    codec_config_id: DecodedUleb128,
    sample_rate: u32,
    codec_configs: &mut BTreeMap<DecodedUleb128, CodecConfigObu>,
) {
    let obu = CodecConfigObu::new(
        ObuHeader::default(),
        codec_config_id,
        CodecConfig {
            codec_id: CodecId::Lpcm,
            num_samples_per_frame: NUM_SAMPLES_PER_FRAME,
            audio_roll_distance: 0,
            decoder_config: DecoderConfig::Lpcm(LpcmDecoderConfig {
                sample_format_flags: LpcmSampleFormat::LittleEndian,
                sample_size: 16,
                sample_rate,
            }),
        },
    );
    codec_configs.insert(codec_config_id, obu);
}

pub fn add_ambisonics_mono_audio_element(
    audio_element_id: DecodedUleb128,
    codec_config_id: DecodedUleb128,
    substream_ids: &[DecodedUleb128],
    audio_elements: &mut BTreeMap<DecodedUleb128, AudioElementWithData>,
) {
    let n = substream_ids.len() as u8;
    let obu = AudioElementObu::new(
        ObuHeader::default(),
        audio_element_id,
        AudioElementType::SceneBased,
        codec_config_id,
        substream_ids.to_vec(),
        Vec::new(),
        AudioElementConfig::Scene(AmbisonicsConfig::Mono {
            output_channel_count: n,
            substream_count: n,
            channel_mapping: (0..n).collect(),
        }),
    );
    audio_elements.insert(
        audio_element_id,
        AudioElementWithData {
            obu,
            codec_config_id,
            channel_numbers_for_layers: Vec::new(),
        },
    );
}

pub fn mix_gain_param_definition(
    parameter_id: DecodedUleb128,
    parameter_rate: DecodedUleb128,
) -> MixGainParamDefinition {
    MixGainParamDefinition {
        base: ParamDefinition {
            parameter_id,
            parameter_rate,
            param_definition_mode: true,
            reserved: 0,
            duration: 0,
            constant_subblock_duration: 0,
            subblock_durations: Vec::new(),
        },
        default_mix_gain: 0,
    }
}

pub fn add_mix_presentation(
    mix_presentation_id: DecodedUleb128,
    audio_element_ids: &[DecodedUleb128],
    mix_gain_parameter_id: DecodedUleb128,
    mix_gain_parameter_rate: DecodedUleb128,
    mix_presentations: &mut Vec<MixPresentationObu>,
) {
    let audio_elements = audio_element_ids
        .iter()
        .map(|&audio_element_id| SubMixAudioElement {
            audio_element_id,
            localized_element_annotations: Vec::new(),
            rendering_config: RenderingConfig {
                headphones_rendering_mode: HeadphonesRenderingMode::Stereo,
                reserved: 0,
                rendering_config_extension_bytes: Vec::new(),
            },
            element_mix_gain: mix_gain_param_definition(
                mix_gain_parameter_id,
                mix_gain_parameter_rate,
            ),
        })
        .collect();
    mix_presentations.push(MixPresentationObu::new(
        ObuHeader::default(),
        mix_presentation_id,
        0,
        Vec::new(),
        Vec::new(),
        vec![MixPresentationSubMix {
            audio_elements,
            output_mix_gain: mix_gain_param_definition(
                mix_gain_parameter_id,
                mix_gain_parameter_rate,
            ),
            layouts: vec![MixPresentationLayout {
                loudness_layout: Layout::SsConvention {
                    sound_system: SoundSystem::A0_2_0,
                    reserved: 0,
                },
                loudness: LoudnessInfo::empty(),
            }],
        }],
    ));
}

pub fn empty_audio_frame(
    audio_element_id: DecodedUleb128,
    substream_id: DecodedUleb128,
    start_timestamp: i64,
    end_timestamp: i64,
) -> AudioFrameWithData {
    AudioFrameWithData {
        obu: AudioFrameObu::new(ObuHeader::default(), substream_id, Vec::new()),
        start_timestamp,
        end_timestamp,
        audio_element_id,
    }
}

pub fn demixing_per_id_metadata(parameter_id: DecodedUleb128) -> PerIdParameterMetadata {
    PerIdParameterMetadata::new(
        ParamDefinitionType::Demixing,
        ParamDefinition::new_constant(
            parameter_id,
            SAMPLE_RATE,
            NUM_SAMPLES_PER_FRAME,
            NUM_SAMPLES_PER_FRAME,
        ),
    )
}

pub fn demixing_parameter_block(
    parameter_id: DecodedUleb128,
    start_timestamp: i64,
) -> ParameterBlockWithData {
    let metadata = demixing_per_id_metadata(parameter_id);
    ParameterBlockWithData {
        obu: ParameterBlockObu::new(
            ObuHeader::default(),
            parameter_id,
            &metadata,
            0,
            0,
            vec![ParameterSubblock {
                subblock_duration: NUM_SAMPLES_PER_FRAME,
                param_data: ParameterData::Demixing(DemixingInfoParameterData {
                    dmixp_mode: DMixPMode::Mode1,
                    reserved: 0,
                }),
            }],
        ),
        start_timestamp,
        end_timestamp: start_timestamp + i64::from(NUM_SAMPLES_PER_FRAME),
    }
}

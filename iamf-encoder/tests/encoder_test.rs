//! Integration tests for the encoder facade.

mod common;

use common::*;

use iamf_core::{LebGenerator, ReadBitBuffer};
use iamf_obu::{ObuHeader, ObuType};

use iamf_encoder::config::UserMetadata;
use iamf_encoder::{ChannelLabel, IamfEncoder, LpcmCodecFactory, ObuSequencer};

const CODEC_CONFIG_ID: u32 = 200;
const AUDIO_ELEMENT_ID: u32 = 300;

fn stereo_user_metadata() -> UserMetadata {
    serde_json::from_value(serde_json::json!({
        "ia_sequence_header_metadata": [{
            "primary_profile": "SIMPLE",
            "additional_profile": "BASE"
        }],
        "codec_config_metadata": [{
            "codec_config_id": CODEC_CONFIG_ID,
            "codec_config": {
                "codec_id": "LPCM",
                "num_samples_per_frame": NUM_SAMPLES_PER_FRAME,
                "audio_roll_distance": 0,
                "decoder_config_lpcm": {
                    "sample_format_flags": "LPCM_LITTLE_ENDIAN",
                    "sample_size": 16,
                    "sample_rate": SAMPLE_RATE
                }
            }
        }],
        "audio_element_metadata": [{
            "audio_element_id": AUDIO_ELEMENT_ID,
            "audio_element_type": "AUDIO_ELEMENT_CHANNEL_BASED",
            "codec_config_id": CODEC_CONFIG_ID,
            "num_substreams": 1,
            "audio_substream_ids": [0],
            "scalable_channel_layout_config": {
                "channel_audio_layer_configs": [{
                    "loudspeaker_layout": "LOUDSPEAKER_LAYOUT_STEREO",
                    "substream_count": 1,
                    "coupled_substream_count": 1
                }]
            }
        }],
        "mix_presentation_metadata": [{
            "mix_presentation_id": 42,
            "count_label": 0,
            "sub_mixes": [{
                "audio_elements": [{
                    "audio_element_id": AUDIO_ELEMENT_ID,
                    "rendering_config": {
                        "headphones_rendering_mode": "HEADPHONES_RENDERING_MODE_STEREO"
                    },
                    "element_mix_gain": {
                        "param_definition": {
                            "parameter_id": 100,
                            "parameter_rate": 16000,
                            "param_definition_mode": 1
                        },
                        "default_mix_gain": 0
                    }
                }],
                "output_mix_gain": {
                    "param_definition": {
                        "parameter_id": 100,
                        "parameter_rate": 16000,
                        "param_definition_mode": 1
                    },
                    "default_mix_gain": 0
                },
                "layouts": [{
                    "loudness_layout": {
                        "layout_type": "LAYOUT_TYPE_LOUDSPEAKERS_SS_CONVENTION",
                        "ss_layout": { "sound_system": "SOUND_SYSTEM_A_0_2_0" }
                    },
                    "loudness": { "integrated_loudness": 0, "digital_peak": 0 }
                }]
            }]
        }],
        "audio_frame_metadata": [{
            "samples_to_trim_at_end": 0,
            "samples_to_trim_at_start": 0,
            "audio_element_id": AUDIO_ELEMENT_ID,
            "channel_ids": [0, 1],
            "channel_labels": ["L2", "R2"]
        }]
    }))
    .unwrap()
}

fn parameter_block_json(start_timestamp: i64) -> iamf_encoder::config::ParameterBlockMetadata {
    serde_json::from_value(serde_json::json!({
        "parameter_id": 100,
        "start_timestamp": start_timestamp,
        "duration": NUM_SAMPLES_PER_FRAME,
        "num_subblocks": 1,
        "constant_subblock_duration": NUM_SAMPLES_PER_FRAME,
        "subblocks": [{
            "mix_gain_parameter_data": {
                "animation_type": "ANIMATE_STEP",
                "start_point_value": 0
            }
        }]
    }))
    .unwrap()
}

#[test]
fn test_create_fails_on_empty_user_metadata() {
    let user_metadata = UserMetadata::default();
    assert!(IamfEncoder::create(&user_metadata, &LpcmCodecFactory).is_err());
}

#[test]
fn test_create_generates_descriptor_obus() {
    let encoder = IamfEncoder::create(&stereo_user_metadata(), &LpcmCodecFactory).unwrap();
    let descriptors = encoder.descriptors();
    assert_eq!(descriptors.codec_configs.len(), 1);
    assert_eq!(descriptors.audio_elements.len(), 1);
    assert_eq!(descriptors.mix_presentations.len(), 1);
    assert!(descriptors.arbitrary_obus.is_empty());
    assert_eq!(
        descriptors.ia_sequence_header.header.obu_type,
        ObuType::IaSequenceHeader
    );
}

#[test]
fn test_create_generates_arbitrary_obus() {
    let mut user_metadata = stereo_user_metadata();
    user_metadata.arbitrary_obu_metadata = vec![serde_json::from_value(serde_json::json!({
        "insertion_hook": "INSERTION_HOOK_AFTER_AUDIO_ELEMENTS",
        "obu_type": 26,
        "payload": "Imaginary descriptor OBU."
    }))
    .unwrap()];

    let encoder = IamfEncoder::create(&user_metadata, &LpcmCodecFactory).unwrap();
    assert_eq!(encoder.descriptors().arbitrary_obus.len(), 1);
}

#[test]
fn test_generate_data_obus_two_iterations() {
    let user_metadata = stereo_user_metadata();
    let mut encoder = IamfEncoder::create(&user_metadata, &LpcmCodecFactory).unwrap();

    let zero_samples = vec![0.0; NUM_SAMPLES_PER_FRAME as usize];
    let mut iteration = 0;
    while encoder.generating_data_obus() {
        encoder.begin_temporal_unit();
        encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::L2, zero_samples.clone());
        encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::R2, zero_samples.clone());

        // Signal stopping at the second iteration.
        if iteration == 1 {
            encoder.finalize_add_samples();
        }

        encoder
            .add_parameter_block_metadata(&parameter_block_json(
                iteration * i64::from(NUM_SAMPLES_PER_FRAME),
            ))
            .unwrap();

        let unit = encoder.output_temporal_unit().unwrap();
        assert_eq!(unit.audio_frames.len(), 1);
        assert_eq!(unit.parameter_blocks.len(), 1);
        assert_eq!(unit.timestamp, iteration * i64::from(NUM_SAMPLES_PER_FRAME));
        assert!(unit.id_to_labeled_frame.contains_key(&AUDIO_ELEMENT_ID));

        iteration += 1;
    }

    assert_eq!(iteration, 2);
}

#[test]
fn test_safe_to_use_after_move() {
    let user_metadata = stereo_user_metadata();
    let encoder_to_move_from =
        IamfEncoder::create(&user_metadata, &LpcmCodecFactory).unwrap();

    let mut encoder = encoder_to_move_from;
    assert!(encoder.generating_data_obus());
    encoder.begin_temporal_unit();
    let zero_samples = vec![0.0; NUM_SAMPLES_PER_FRAME as usize];
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::L2, zero_samples.clone());
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::R2, zero_samples);
    encoder
        .add_parameter_block_metadata(&parameter_block_json(0))
        .unwrap();
    encoder.finalize_add_samples();

    let unit = encoder.output_temporal_unit().unwrap();
    assert_eq!(unit.audio_frames.len(), 1);
    assert_eq!(unit.parameter_blocks.len(), 1);
}

#[test]
fn test_samples_after_finalize_are_discarded() {
    let user_metadata = stereo_user_metadata();
    let mut encoder = IamfEncoder::create(&user_metadata, &LpcmCodecFactory).unwrap();

    encoder.begin_temporal_unit();
    encoder.finalize_add_samples();
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::L2, vec![0.0; 8]);

    let unit = encoder.output_temporal_unit().unwrap();
    assert!(unit.audio_frames.is_empty());
    assert!(!encoder.generating_data_obus());
}

#[test]
fn test_trim_accounting_on_first_and_final_frames() {
    let mut user_metadata = stereo_user_metadata();
    user_metadata.audio_frame_metadata[0].samples_to_trim_at_start = 1;
    user_metadata.audio_frame_metadata[0].samples_to_trim_at_end = 2;
    let mut encoder = IamfEncoder::create(&user_metadata, &LpcmCodecFactory).unwrap();

    let zero_samples = vec![0.0; NUM_SAMPLES_PER_FRAME as usize];

    // First unit: start trim lands on the frame.
    encoder.begin_temporal_unit();
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::L2, zero_samples.clone());
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::R2, zero_samples.clone());
    let first = encoder.output_temporal_unit().unwrap();
    let first_header = &first.audio_frames[0].obu.header;
    assert!(first_header.obu_trimming_status_flag);
    assert_eq!(first_header.num_samples_to_trim_at_start, 1);
    assert_eq!(first_header.num_samples_to_trim_at_end, 0);

    // Final unit: end trim lands on the last frame.
    encoder.begin_temporal_unit();
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::L2, zero_samples.clone());
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::R2, zero_samples);
    encoder.finalize_add_samples();
    let last = encoder.output_temporal_unit().unwrap();
    let last_header = &last.audio_frames[0].obu.header;
    assert!(last_header.obu_trimming_status_flag);
    assert_eq!(last_header.num_samples_to_trim_at_start, 0);
    assert_eq!(last_header.num_samples_to_trim_at_end, 2);
    assert!(!encoder.generating_data_obus());
}

#[test]
fn test_short_final_frame_is_padded_into_end_trim() {
    let user_metadata = stereo_user_metadata();
    let mut encoder = IamfEncoder::create(&user_metadata, &LpcmCodecFactory).unwrap();

    encoder.begin_temporal_unit();
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::L2, vec![0.0; 5]);
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::R2, vec![0.0; 5]);
    encoder.finalize_add_samples();

    let unit = encoder.output_temporal_unit().unwrap();
    let header = &unit.audio_frames[0].obu.header;
    assert_eq!(header.num_samples_to_trim_at_end, 3);
    // The coded frame still carries a full frame of samples.
    assert_eq!(
        unit.audio_frames[0].obu.audio_frame.len(),
        NUM_SAMPLES_PER_FRAME as usize * 2 * 2
    );
}

#[test]
fn test_partial_frame_before_finalize_rejected() {
    let user_metadata = stereo_user_metadata();
    let mut encoder = IamfEncoder::create(&user_metadata, &LpcmCodecFactory).unwrap();

    encoder.begin_temporal_unit();
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::L2, vec![0.0; 5]);
    encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::R2, vec![0.0; 5]);
    assert!(encoder.output_temporal_unit().is_err());
}

#[test]
fn test_finalize_mix_presentations_requires_drained_encoder() {
    let user_metadata = stereo_user_metadata();
    let mut encoder = IamfEncoder::create(&user_metadata, &LpcmCodecFactory).unwrap();
    assert!(matches!(
        encoder.finalize_mix_presentations(),
        Err(iamf_core::Error::FailedPrecondition(_))
    ));

    encoder.begin_temporal_unit();
    encoder.finalize_add_samples();
    encoder.output_temporal_unit().unwrap();

    // Without loudness collaborators the user loudness passes through.
    let finalized = encoder.finalize_mix_presentations().unwrap();
    assert_eq!(finalized, encoder.descriptors().mix_presentations);
}

#[test]
fn test_end_to_end_stream_through_the_sequencer() {
    let user_metadata = stereo_user_metadata();
    let mut encoder = IamfEncoder::create(&user_metadata, &LpcmCodecFactory).unwrap();

    let zero_samples = vec![0.0; NUM_SAMPLES_PER_FRAME as usize];
    let mut audio_frames = Vec::new();
    let mut parameter_blocks = Vec::new();
    let mut iteration = 0;
    while encoder.generating_data_obus() {
        encoder.begin_temporal_unit();
        encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::L2, zero_samples.clone());
        encoder.add_samples(AUDIO_ELEMENT_ID, ChannelLabel::R2, zero_samples.clone());
        if iteration == 1 {
            encoder.finalize_add_samples();
        }
        encoder
            .add_parameter_block_metadata(&parameter_block_json(
                iteration * i64::from(NUM_SAMPLES_PER_FRAME),
            ))
            .unwrap();
        let mut unit = encoder.output_temporal_unit().unwrap();
        audio_frames.append(&mut unit.audio_frames);
        parameter_blocks.append(&mut unit.parameter_blocks);
        iteration += 1;
    }

    let descriptors = encoder.descriptors();
    let mut sequencer = ObuSequencer::new_memory(false, LebGenerator::Minimal);
    sequencer
        .pick_and_place(
            &descriptors.ia_sequence_header,
            &descriptors.codec_configs,
            &descriptors.audio_elements,
            &descriptors.mix_presentations,
            audio_frames,
            parameter_blocks,
            descriptors.arbitrary_obus.clone(),
            encoder.parameter_id_to_metadata(),
        )
        .unwrap();

    // The stream opens with an IA Sequence Header carrying the magic.
    let stream = sequencer.memory().unwrap().to_vec();
    let mut rb = ReadBitBuffer::new(1024, stream);
    let (header, payload_size) = ObuHeader::read_and_validate(&mut rb).unwrap();
    assert_eq!(header.obu_type, ObuType::IaSequenceHeader);
    assert_eq!(payload_size, 6);
    assert_eq!(rb.read_unsigned32(32).unwrap(), u32::from_be_bytes(*b"iamf"));
}

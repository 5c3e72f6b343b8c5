//! Integration tests for the OBU sequencer.

mod common;

use std::collections::BTreeMap;

use common::*;

use iamf_core::{LebGenerator, WriteBitBuffer};
use iamf_obu::{
    ArbitraryObu, IaSequenceHeaderObu, InsertionHook, Obu, ObuHeader, ObuType, ProfileVersion,
    TemporalDelimiterObu,
};

use iamf_encoder::sequencer::validate_and_get_common_trim;
use iamf_encoder::{generate_temporal_unit_map, ObuSequencer, TemporalUnit};

const INCLUDE_TEMPORAL_DELIMITERS: bool = true;
const NO_TEMPORAL_DELIMITERS: bool = false;

struct DescriptorFixture {
    ia_sequence_header: IaSequenceHeaderObu,
    codec_configs: BTreeMap<u32, iamf_obu::CodecConfigObu>,
    audio_elements: BTreeMap<u32, iamf_encoder::AudioElementWithData>,
    mix_presentations: Vec<iamf_obu::MixPresentationObu>,
    arbitrary_obus: Vec<ArbitraryObu>,
}

impl DescriptorFixture {
    fn one_element() -> Self {
        let mut codec_configs = BTreeMap::new();
        let mut audio_elements = BTreeMap::new();
        let mut mix_presentations = Vec::new();
        add_lpcm_codec_config(1, SAMPLE_RATE, &mut codec_configs);
        add_ambisonics_mono_audio_element(1, 1, &[1], &mut audio_elements);
        add_mix_presentation(100, &[1], 999, SAMPLE_RATE, &mut mix_presentations);
        Self {
            ia_sequence_header: simple_profile_sequence_header(),
            codec_configs,
            audio_elements,
            mix_presentations,
            arbitrary_obus: Vec::new(),
        }
    }

    fn write(&self) -> iamf_core::Result<Vec<u8>> {
        let mut wb = WriteBitBuffer::default();
        ObuSequencer::write_descriptor_obus(
            &self.ia_sequence_header,
            &self.codec_configs,
            &self.audio_elements,
            &self.mix_presentations,
            &self.arbitrary_obus,
            &mut wb,
        )?;
        Ok(wb.into_data())
    }
}

fn arbitrary_obu_with_hook(hook: InsertionHook) -> ArbitraryObu {
    ArbitraryObu::new(ObuType::Reserved(25), ObuHeader::default(), vec![0xab], hook, None)
}

fn expected_bytes(obus: &[&dyn Obu]) -> Vec<u8> {
    let mut wb = WriteBitBuffer::default();
    for obu in obus {
        obu.validate_and_write(&mut wb).unwrap();
    }
    wb.into_data()
}

#[test]
fn test_descriptor_prologue_order() {
    let fixture = DescriptorFixture::one_element();
    let expected = expected_bytes(&[
        &fixture.ia_sequence_header,
        &fixture.codec_configs[&1],
        &fixture.audio_elements[&1].obu,
        &fixture.mix_presentations[0],
    ]);
    assert_eq!(fixture.write().unwrap(), expected);
}

#[test]
fn test_arbitrary_obu_hooks_in_prologue() {
    for hook in [
        InsertionHook::AfterIaSequenceHeader,
        InsertionHook::AfterCodecConfigs,
        InsertionHook::AfterAudioElements,
        InsertionHook::AfterMixPresentations,
    ] {
        let mut fixture = DescriptorFixture::one_element();
        fixture.arbitrary_obus.push(arbitrary_obu_with_hook(hook));
        let arbitrary = &fixture.arbitrary_obus[0];

        let expected: Vec<u8> = match hook {
            InsertionHook::AfterIaSequenceHeader => expected_bytes(&[
                &fixture.ia_sequence_header,
                arbitrary,
                &fixture.codec_configs[&1],
                &fixture.audio_elements[&1].obu,
                &fixture.mix_presentations[0],
            ]),
            InsertionHook::AfterCodecConfigs => expected_bytes(&[
                &fixture.ia_sequence_header,
                &fixture.codec_configs[&1],
                arbitrary,
                &fixture.audio_elements[&1].obu,
                &fixture.mix_presentations[0],
            ]),
            InsertionHook::AfterAudioElements => expected_bytes(&[
                &fixture.ia_sequence_header,
                &fixture.codec_configs[&1],
                &fixture.audio_elements[&1].obu,
                arbitrary,
                &fixture.mix_presentations[0],
            ]),
            _ => expected_bytes(&[
                &fixture.ia_sequence_header,
                &fixture.codec_configs[&1],
                &fixture.audio_elements[&1].obu,
                &fixture.mix_presentations[0],
                arbitrary,
            ]),
        };
        assert_eq!(fixture.write().unwrap(), expected, "hook {hook:?}");
    }
}

#[test]
fn test_after_descriptors_hook_is_not_emitted_inline() {
    let mut fixture = DescriptorFixture::one_element();
    fixture
        .arbitrary_obus
        .push(arbitrary_obu_with_hook(InsertionHook::AfterDescriptors));
    let expected = expected_bytes(&[
        &fixture.ia_sequence_header,
        &fixture.codec_configs[&1],
        &fixture.audio_elements[&1].obu,
        &fixture.mix_presentations[0],
    ]);
    assert_eq!(fixture.write().unwrap(), expected);
}

#[test]
fn test_descriptor_groups_are_ascending_by_id() {
    let mut fixture = DescriptorFixture::one_element();
    add_lpcm_codec_config(101, SAMPLE_RATE, &mut fixture.codec_configs);
    add_ambisonics_mono_audio_element(101, 1, &[9], &mut fixture.audio_elements);
    // Insert a second mix presentation with a smaller id; it must come out
    // first regardless of submission order.
    add_mix_presentation(99, &[1], 999, SAMPLE_RATE, &mut fixture.mix_presentations);

    let expected = expected_bytes(&[
        &fixture.ia_sequence_header,
        &fixture.codec_configs[&1],
        &fixture.codec_configs[&101],
        &fixture.audio_elements[&1].obu,
        &fixture.audio_elements[&101].obu,
        &fixture.mix_presentations[1],
        &fixture.mix_presentations[0],
    ]);
    assert_eq!(fixture.write().unwrap(), expected);
}

#[test]
fn test_multi_element_mix_needs_more_than_simple_profile() {
    let mut fixture = DescriptorFixture::one_element();
    add_ambisonics_mono_audio_element(2, 1, &[2], &mut fixture.audio_elements);
    fixture.mix_presentations.clear();
    add_mix_presentation(100, &[1, 2], 999, SAMPLE_RATE, &mut fixture.mix_presentations);

    // Simple/Simple rejects a two-element sub-mix.
    assert!(fixture.write().is_err());

    // Simple/Base admits it.
    fixture.ia_sequence_header = IaSequenceHeaderObu::new(
        ObuHeader::default(),
        IaSequenceHeaderObu::IA_CODE,
        ProfileVersion::Simple,
        ProfileVersion::Base,
    );
    assert!(fixture.write().is_ok());
}

#[test]
fn test_mismatched_samples_per_frame_rejected() {
    let mut fixture = DescriptorFixture::one_element();
    let mut other = BTreeMap::new();
    add_lpcm_codec_config(2, SAMPLE_RATE, &mut other);
    let mut obu = other.remove(&2).unwrap();
    obu.codec_config.num_samples_per_frame = 16;
    fixture.codec_configs.insert(2, obu);

    assert!(fixture.write().is_err());
}

fn write_unit(
    include_temporal_delimiters: bool,
    fixture: &DescriptorFixture,
    temporal_unit: &TemporalUnit,
    num_samples: &mut u32,
) -> iamf_core::Result<Vec<u8>> {
    let parameter_id_to_metadata =
        BTreeMap::from([(998, demixing_per_id_metadata(998)), (9, demixing_per_id_metadata(9)), (9000, demixing_per_id_metadata(9000))]);
    let mut wb = WriteBitBuffer::default();
    ObuSequencer::write_temporal_unit(
        include_temporal_delimiters,
        temporal_unit,
        &fixture.audio_elements,
        &fixture.codec_configs,
        &parameter_id_to_metadata,
        &mut wb,
        num_samples,
    )?;
    Ok(wb.into_data())
}

fn one_block_one_frame_unit(hook_obus: Vec<ArbitraryObu>) -> TemporalUnit {
    generate_temporal_unit_map(
        vec![empty_audio_frame(1, 1, 0, 16)],
        vec![demixing_parameter_block(998, 0)],
        hook_obus,
    )
    .unwrap()
    .remove(&0)
    .unwrap()
}

#[test]
fn test_temporal_unit_order_with_delimiter_and_before_hook() {
    let fixture = DescriptorFixture::one_element();
    let mut hook_obu =
        arbitrary_obu_with_hook(InsertionHook::BeforeParameterBlocksAtTick);
    hook_obu.insertion_tick = Some(0);
    let unit = one_block_one_frame_unit(vec![hook_obu.clone()]);

    let metadata = demixing_per_id_metadata(998);
    let mut expected = WriteBitBuffer::default();
    TemporalDelimiterObu::new(ObuHeader::default())
        .validate_and_write(&mut expected)
        .unwrap();
    hook_obu.validate_and_write(&mut expected).unwrap();
    unit.parameter_blocks[0]
        .obu
        .validate_and_write(&metadata, &mut expected)
        .unwrap();
    unit.audio_frames[0].obu.validate_and_write(&mut expected).unwrap();

    let mut num_samples = 0;
    let written = write_unit(INCLUDE_TEMPORAL_DELIMITERS, &fixture, &unit, &mut num_samples).unwrap();
    assert_eq!(written, expected.into_data());
}

#[test]
fn test_arbitrary_obu_between_parameter_blocks_and_audio_frames() {
    let fixture = DescriptorFixture::one_element();
    let mut hook_obu = arbitrary_obu_with_hook(InsertionHook::AfterParameterBlocksAtTick);
    hook_obu.insertion_tick = Some(0);
    let unit = one_block_one_frame_unit(vec![hook_obu.clone()]);

    let metadata = demixing_per_id_metadata(998);
    let mut expected = WriteBitBuffer::default();
    unit.parameter_blocks[0]
        .obu
        .validate_and_write(&metadata, &mut expected)
        .unwrap();
    hook_obu.validate_and_write(&mut expected).unwrap();
    unit.audio_frames[0].obu.validate_and_write(&mut expected).unwrap();

    let mut num_samples = 0;
    let written = write_unit(NO_TEMPORAL_DELIMITERS, &fixture, &unit, &mut num_samples).unwrap();
    assert_eq!(written, expected.into_data());
}

#[test]
fn test_arbitrary_obu_after_audio_frames() {
    let fixture = DescriptorFixture::one_element();
    let mut hook_obu = arbitrary_obu_with_hook(InsertionHook::AfterAudioFramesAtTick);
    hook_obu.insertion_tick = Some(0);
    let unit = one_block_one_frame_unit(vec![hook_obu.clone()]);

    let metadata = demixing_per_id_metadata(998);
    let mut expected = WriteBitBuffer::default();
    unit.parameter_blocks[0]
        .obu
        .validate_and_write(&metadata, &mut expected)
        .unwrap();
    unit.audio_frames[0].obu.validate_and_write(&mut expected).unwrap();
    hook_obu.validate_and_write(&mut expected).unwrap();

    let mut num_samples = 0;
    let written = write_unit(NO_TEMPORAL_DELIMITERS, &fixture, &unit, &mut num_samples).unwrap();
    assert_eq!(written, expected.into_data());
}

#[test]
fn test_parameter_blocks_emitted_in_ascending_id_order() {
    let fixture = DescriptorFixture::one_element();
    // Submit the higher id first.
    let map = generate_temporal_unit_map(
        vec![empty_audio_frame(1, 1, 0, 16)],
        vec![demixing_parameter_block(9000, 0), demixing_parameter_block(9, 0)],
        Vec::new(),
    )
    .unwrap();
    let unit = &map[&0];

    let ids: Vec<_> = unit
        .parameter_blocks
        .iter()
        .map(|block| block.obu.parameter_id)
        .collect();
    assert_eq!(ids, vec![9, 9000]);

    let mut expected = WriteBitBuffer::default();
    unit.parameter_blocks[0]
        .obu
        .validate_and_write(&demixing_per_id_metadata(9), &mut expected)
        .unwrap();
    unit.parameter_blocks[1]
        .obu
        .validate_and_write(&demixing_per_id_metadata(9000), &mut expected)
        .unwrap();
    unit.audio_frames[0].obu.validate_and_write(&mut expected).unwrap();

    let mut num_samples = 0;
    let written = write_unit(NO_TEMPORAL_DELIMITERS, &fixture, unit, &mut num_samples).unwrap();
    assert_eq!(written, expected.into_data());
}

#[test]
fn test_substream_ordering_across_audio_elements() {
    let mut fixture = DescriptorFixture::one_element();
    fixture.audio_elements.clear();
    add_ambisonics_mono_audio_element(100, 1, &[2000, 4000], &mut fixture.audio_elements);
    add_ambisonics_mono_audio_element(200, 1, &[3000, 5000], &mut fixture.audio_elements);

    // Frames submitted in an arbitrary order.
    let map = generate_temporal_unit_map(
        vec![
            empty_audio_frame(200, 5000, 0, 16),
            empty_audio_frame(100, 2000, 0, 16),
            empty_audio_frame(200, 3000, 0, 16),
            empty_audio_frame(100, 4000, 0, 16),
        ],
        Vec::new(),
        Vec::new(),
    )
    .unwrap();
    let unit = &map[&0];

    let mut expected = WriteBitBuffer::default();
    for (element_id, substream_id) in [(100, 2000), (100, 4000), (200, 3000), (200, 5000)] {
        let frame = unit
            .audio_frames
            .iter()
            .find(|frame| {
                frame.audio_element_id == element_id && frame.obu.substream_id() == substream_id
            })
            .unwrap();
        frame.obu.validate_and_write(&mut expected).unwrap();
    }

    let mut num_samples = 0;
    let written = write_unit(NO_TEMPORAL_DELIMITERS, &fixture, unit, &mut num_samples).unwrap();
    assert_eq!(written, expected.into_data());
}

#[test]
fn test_num_samples_accumulates_untrimmed_samples() {
    let fixture = DescriptorFixture::one_element();
    let mut frame = empty_audio_frame(1, 1, 0, 16);
    frame.obu.header.obu_trimming_status_flag = true;
    frame.obu.header.num_samples_to_trim_at_start = 1;
    frame.obu.header.num_samples_to_trim_at_end = 2;
    let unit = generate_temporal_unit_map(vec![frame], Vec::new(), Vec::new())
        .unwrap()
        .remove(&0)
        .unwrap();

    let mut num_samples = 0;
    write_unit(NO_TEMPORAL_DELIMITERS, &fixture, &unit, &mut num_samples).unwrap();
    assert_eq!(num_samples, 5);

    // Another write keeps adding to the running count.
    write_unit(NO_TEMPORAL_DELIMITERS, &fixture, &unit, &mut num_samples).unwrap();
    assert_eq!(num_samples, 10);
}

#[test]
fn test_fails_when_audio_frame_has_no_audio_element() {
    let fixture = DescriptorFixture::one_element();
    let unit = generate_temporal_unit_map(
        vec![empty_audio_frame(404, 1, 0, 16)],
        Vec::new(),
        Vec::new(),
    )
    .unwrap()
    .remove(&0)
    .unwrap();

    let mut num_samples = 0;
    let result = write_unit(NO_TEMPORAL_DELIMITERS, &fixture, &unit, &mut num_samples);
    assert!(matches!(result, Err(iamf_core::Error::FailedPrecondition(_))));
}

#[test]
fn test_trim_validation() {
    // Two frames on one substream both trimming at the end.
    let mut first = empty_audio_frame(1, 1, 0, 16);
    first.obu.header.obu_trimming_status_flag = true;
    first.obu.header.num_samples_to_trim_at_end = 1;
    let mut second = empty_audio_frame(1, 1, 16, 32);
    second.obu.header.obu_trimming_status_flag = true;
    second.obu.header.num_samples_to_trim_at_end = 1;
    assert!(validate_and_get_common_trim(8, &[first.clone(), second]).is_err());

    // A frame fully trimmed from the end.
    let mut fully_trimmed = empty_audio_frame(1, 1, 0, 16);
    fully_trimmed.obu.header.obu_trimming_status_flag = true;
    fully_trimmed.obu.header.num_samples_to_trim_at_end = 8;
    assert!(validate_and_get_common_trim(8, &[fully_trimmed]).is_err());

    // Non-contiguous start trim.
    let untrimmed = empty_audio_frame(1, 1, 0, 16);
    let mut late_start_trim = empty_audio_frame(1, 1, 16, 32);
    late_start_trim.obu.header.obu_trimming_status_flag = true;
    late_start_trim.obu.header.num_samples_to_trim_at_start = 1;
    assert!(validate_and_get_common_trim(8, &[untrimmed, late_start_trim]).is_err());

    // Substreams disagreeing on cumulative trim.
    let mut trimmed = empty_audio_frame(1, 1, 0, 16);
    trimmed.obu.header.obu_trimming_status_flag = true;
    trimmed.obu.header.num_samples_to_trim_at_start = 2;
    let other_substream = empty_audio_frame(1, 2, 0, 16);
    assert!(validate_and_get_common_trim(8, &[trimmed.clone(), other_substream]).is_err());

    // A consistent configuration reports the common counts.
    let mut partner = empty_audio_frame(1, 2, 0, 16);
    partner.obu.header.obu_trimming_status_flag = true;
    partner.obu.header.num_samples_to_trim_at_start = 2;
    assert_eq!(
        validate_and_get_common_trim(8, &[trimmed, partner]).unwrap(),
        (0, 2)
    );
}

#[test]
fn test_pick_and_place_writes_file_with_only_ia_sequence_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minimal.iamf");
    let ia_sequence_header = IaSequenceHeaderObu::new(
        ObuHeader::default(),
        IaSequenceHeaderObu::IA_CODE,
        ProfileVersion::Simple,
        ProfileVersion::Base,
    );

    let mut sequencer = ObuSequencer::new_file(
        Some(path.clone()),
        NO_TEMPORAL_DELIMITERS,
        LebGenerator::Minimal,
    );
    sequencer
        .pick_and_place(
            &ia_sequence_header,
            &BTreeMap::new(),
            &BTreeMap::new(),
            &[],
            Vec::new(),
            Vec::new(),
            Vec::new(),
            &BTreeMap::new(),
        )
        .unwrap();

    // The stream is exactly one OBU: header, size, magic, two profiles.
    let written = std::fs::read(&path).unwrap();
    assert_eq!(
        written,
        vec![31 << 3, 0x06, 0x69, 0x61, 0x6d, 0x66, 0x00, 0x01]
    );
}

#[test]
fn test_pick_and_place_succeeds_with_omitted_output_file() {
    let mut sequencer =
        ObuSequencer::new_file(None, NO_TEMPORAL_DELIMITERS, LebGenerator::Minimal);
    assert!(sequencer
        .pick_and_place(
            &simple_profile_sequence_header(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &[],
            Vec::new(),
            Vec::new(),
            Vec::new(),
            &BTreeMap::new(),
        )
        .is_ok());
}

#[test]
fn test_pick_and_place_memory_matches_file_output() {
    let fixture = DescriptorFixture::one_element();
    let parameter_id_to_metadata = BTreeMap::from([(998, demixing_per_id_metadata(998))]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one_frame.iamf");
    let mut file_sequencer = ObuSequencer::new_file(
        Some(path.clone()),
        NO_TEMPORAL_DELIMITERS,
        LebGenerator::Minimal,
    );
    file_sequencer
        .pick_and_place(
            &fixture.ia_sequence_header,
            &fixture.codec_configs,
            &fixture.audio_elements,
            &fixture.mix_presentations,
            vec![empty_audio_frame(1, 1, 0, 16)],
            vec![demixing_parameter_block(998, 0)],
            Vec::new(),
            &parameter_id_to_metadata,
        )
        .unwrap();

    let mut memory_sequencer =
        ObuSequencer::new_memory(NO_TEMPORAL_DELIMITERS, LebGenerator::Minimal);
    memory_sequencer
        .pick_and_place(
            &fixture.ia_sequence_header,
            &fixture.codec_configs,
            &fixture.audio_elements,
            &fixture.mix_presentations,
            vec![empty_audio_frame(1, 1, 0, 16)],
            vec![demixing_parameter_block(998, 0)],
            Vec::new(),
            &parameter_id_to_metadata,
        )
        .unwrap();

    let from_file = std::fs::read(&path).unwrap();
    assert_eq!(memory_sequencer.memory().unwrap(), from_file.as_slice());
    assert!(!from_file.is_empty());
}

#[test]
fn test_pick_and_place_leaves_no_file_when_descriptors_are_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid_descriptors.iamf");

    // A two-element sub-mix under a Simple/Simple sequence header.
    let mut fixture = DescriptorFixture::one_element();
    add_ambisonics_mono_audio_element(2, 1, &[2], &mut fixture.audio_elements);
    fixture.mix_presentations.clear();
    add_mix_presentation(100, &[1, 2], 999, SAMPLE_RATE, &mut fixture.mix_presentations);

    let mut sequencer = ObuSequencer::new_file(
        Some(path.clone()),
        NO_TEMPORAL_DELIMITERS,
        LebGenerator::Minimal,
    );
    assert!(sequencer
        .pick_and_place(
            &fixture.ia_sequence_header,
            &fixture.codec_configs,
            &fixture.audio_elements,
            &fixture.mix_presentations,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            &BTreeMap::new(),
        )
        .is_err());

    assert!(!path.exists());
}

#[test]
fn test_pick_and_place_removes_file_when_temporal_unit_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid_unit.iamf");

    let fixture = DescriptorFixture::one_element();
    let parameter_id_to_metadata = BTreeMap::from([(998, demixing_per_id_metadata(998))]);
    let mut invalidating = ArbitraryObu::new(
        ObuType::Reserved(25),
        ObuHeader::default(),
        Vec::new(),
        InsertionHook::AfterAudioFramesAtTick,
        Some(0),
    );
    invalidating.invalidates_bitstream = true;

    let mut sequencer = ObuSequencer::new_file(
        Some(path.clone()),
        NO_TEMPORAL_DELIMITERS,
        LebGenerator::Minimal,
    );
    assert!(sequencer
        .pick_and_place(
            &fixture.ia_sequence_header,
            &fixture.codec_configs,
            &fixture.audio_elements,
            &fixture.mix_presentations,
            vec![empty_audio_frame(1, 1, 0, 16)],
            vec![demixing_parameter_block(998, 0)],
            vec![invalidating],
            &parameter_id_to_metadata,
        )
        .is_err());

    assert!(!path.exists());
}

#[test]
fn test_pick_and_place_on_invalid_unit_fails_when_output_is_omitted() {
    let fixture = DescriptorFixture::one_element();
    let parameter_id_to_metadata = BTreeMap::from([(998, demixing_per_id_metadata(998))]);
    let mut invalidating = ArbitraryObu::new(
        ObuType::Reserved(25),
        ObuHeader::default(),
        Vec::new(),
        InsertionHook::AfterAudioFramesAtTick,
        Some(0),
    );
    invalidating.invalidates_bitstream = true;

    let mut sequencer =
        ObuSequencer::new_file(None, NO_TEMPORAL_DELIMITERS, LebGenerator::Minimal);
    assert!(sequencer
        .pick_and_place(
            &fixture.ia_sequence_header,
            &fixture.codec_configs,
            &fixture.audio_elements,
            &fixture.mix_presentations,
            vec![empty_audio_frame(1, 1, 0, 16)],
            vec![demixing_parameter_block(998, 0)],
            vec![invalidating],
            &parameter_id_to_metadata,
        )
        .is_err());
}

//! The OBU sequencer: descriptor prologue and temporal-unit emission.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::debug;

use iamf_core::{DecodedUleb128, Error, LebGenerator, Result, WriteBitBuffer};
use iamf_obu::{
    ArbitraryObu, CodecConfigObu, IaSequenceHeaderObu, InsertionHook, MixPresentationObu, Obu,
    ObuHeader, PerIdParameterMetadata, TemporalDelimiterObu,
};

use crate::data::{AudioElementWithData, AudioFrameWithData, ParameterBlockWithData};
use crate::temporal_unit::{generate_temporal_unit_map, TemporalUnit};

/// Where a sequencer sends its byte stream.
#[derive(Debug)]
pub enum SequencerOutput {
    /// Write to a file; `None` validates and serializes but discards the
    /// bytes.
    File(Option<PathBuf>),
    /// Accumulate the stream in memory.
    Memory(Vec<u8>),
}

/// Emits descriptor OBUs in the mandated order, then each temporal unit.
#[derive(Debug)]
pub struct ObuSequencer {
    output: SequencerOutput,
    include_temporal_delimiters: bool,
    leb_generator: LebGenerator,
}

/// The number of samples per frame every codec config must agree on.
pub fn get_common_samples_per_frame(
    codec_configs: &BTreeMap<DecodedUleb128, CodecConfigObu>,
) -> Result<DecodedUleb128> {
    let mut common_samples_per_frame = None;
    for codec_config in codec_configs.values() {
        match common_samples_per_frame {
            None => common_samples_per_frame = Some(codec_config.num_samples_per_frame()),
            Some(common) if common == codec_config.num_samples_per_frame() => {}
            Some(common) => {
                return Err(Error::invalid_argument(format!(
                    "Codec configs disagree on num_samples_per_frame: {} vs {}",
                    common,
                    codec_config.num_samples_per_frame()
                )))
            }
        }
    }
    common_samples_per_frame
        .ok_or_else(|| Error::invalid_argument("No codec configs present".to_string()))
}

#[derive(Default)]
struct TrimState {
    done_trimming_from_start: bool,
    cumulative_samples_to_trim_at_start: u64,
    cumulative_samples_to_trim_at_end: u64,
}

/// Validate the trim invariants across every audio frame and return the
/// cumulative (end, start) trim shared by all substreams.
///
/// Enforced invariants: at most one frame per substream trims from the
/// end, the trimmed-from-start prefix is contiguous, no frame is fully
/// trimmed from the end, total trim per frame fits in a frame, and the
/// cumulative counts agree across substreams.
pub fn validate_and_get_common_trim(
    common_samples_per_frame: DecodedUleb128,
    audio_frames: &[AudioFrameWithData],
) -> Result<(u64, u64)> {
    let mut substream_id_to_trim_state: BTreeMap<DecodedUleb128, TrimState> = BTreeMap::new();
    for audio_frame in audio_frames {
        let trim_state = substream_id_to_trim_state
            .entry(audio_frame.obu.substream_id())
            .or_default();

        if trim_state.cumulative_samples_to_trim_at_end > 0 {
            return Err(Error::invalid_argument(
                "Only one frame may have trim at the end".to_string(),
            ));
        }
        let trim_at_end = u64::from(audio_frame.obu.header.num_samples_to_trim_at_end);
        let trim_at_start = u64::from(audio_frame.obu.header.num_samples_to_trim_at_start);

        if trim_state.done_trimming_from_start && trim_at_start > 0 {
            return Err(Error::invalid_argument(
                "Samples trimmed from start must be consecutive".to_string(),
            ));
        }

        let total_trim_in_this_frame = trim_at_end + trim_at_start;
        if total_trim_in_this_frame > u64::from(common_samples_per_frame) {
            return Err(Error::invalid_argument(
                "More samples trimmed than possible in a frame".to_string(),
            ));
        }
        let remaining_samples = u64::from(common_samples_per_frame) - total_trim_in_this_frame;
        if remaining_samples == 0 && trim_at_end > 0 {
            return Err(Error::invalid_argument(
                "It is forbidden to fully trim samples from the end".to_string(),
            ));
        }

        if trim_at_start < u64::from(common_samples_per_frame) {
            trim_state.done_trimming_from_start = true;
        }
        trim_state.cumulative_samples_to_trim_at_start += trim_at_start;
        trim_state.cumulative_samples_to_trim_at_end += trim_at_end;
    }

    let Some(first_state) = substream_id_to_trim_state.values().next() else {
        // No audio frames. The end-user may be preparing descriptor OBUs
        // separately.
        return Ok((0, 0));
    };
    let common_trim_at_end = first_state.cumulative_samples_to_trim_at_end;
    let common_trim_at_start = first_state.cumulative_samples_to_trim_at_start;
    for (substream_id, trim_state) in &substream_id_to_trim_state {
        if trim_state.cumulative_samples_to_trim_at_end != common_trim_at_end
            || trim_state.cumulative_samples_to_trim_at_start != common_trim_at_start
        {
            return Err(Error::invalid_argument(format!(
                "Substream {substream_id} disagrees on cumulative trim"
            )));
        }
    }
    Ok((common_trim_at_end, common_trim_at_start))
}

impl ObuSequencer {
    /// A sequencer writing to `path`; `None` discards the stream after
    /// validating and serializing it.
    pub fn new_file(
        path: Option<PathBuf>,
        include_temporal_delimiters: bool,
        leb_generator: LebGenerator,
    ) -> Self {
        Self {
            output: SequencerOutput::File(path),
            include_temporal_delimiters,
            leb_generator,
        }
    }

    /// A sequencer accumulating the stream in memory.
    pub fn new_memory(include_temporal_delimiters: bool, leb_generator: LebGenerator) -> Self {
        Self {
            output: SequencerOutput::Memory(Vec::new()),
            include_temporal_delimiters,
            leb_generator,
        }
    }

    /// The accumulated stream of a memory-backed sequencer.
    pub fn memory(&self) -> Option<&[u8]> {
        match &self.output {
            SequencerOutput::Memory(bytes) => Some(bytes),
            SequencerOutput::File(_) => None,
        }
    }

    /// Validate the descriptor set and write the prologue in the mandated
    /// order: IA Sequence Header, Codec Configs, Audio Elements, Mix
    /// Presentations, each group in ascending id order and followed by its
    /// arbitrary-OBU hook. `after-Descriptors` OBUs are not emitted inline.
    pub fn write_descriptor_obus(
        ia_sequence_header: &IaSequenceHeaderObu,
        codec_configs: &BTreeMap<DecodedUleb128, CodecConfigObu>,
        audio_elements: &BTreeMap<DecodedUleb128, AudioElementWithData>,
        mix_presentations: &[MixPresentationObu],
        arbitrary_obus: &[ArbitraryObu],
        wb: &mut WriteBitBuffer,
    ) -> Result<()> {
        // The profiles must admit every mix presentation's structural
        // complexity, and every referenced audio element must exist.
        let max_admitted = ia_sequence_header
            .primary_profile
            .max_audio_elements_per_mix()
            .max(
                ia_sequence_header
                    .additional_profile
                    .max_audio_elements_per_mix(),
            );
        for mix_presentation in mix_presentations {
            let needed = mix_presentation.max_audio_elements_per_sub_mix();
            if needed > max_admitted {
                return Err(Error::invalid_argument(format!(
                    "Mix presentation {} binds {needed} audio elements in one sub-mix, \
                     but the profiles admit at most {max_admitted}",
                    mix_presentation.mix_presentation_id
                )));
            }
            for audio_element_id in mix_presentation.referenced_audio_element_ids() {
                if !audio_elements.contains_key(&audio_element_id) {
                    return Err(Error::invalid_argument(format!(
                        "Mix presentation {} references unknown audio element {audio_element_id}",
                        mix_presentation.mix_presentation_id
                    )));
                }
            }
        }

        // Every parameter id referenced from any descriptor must resolve to
        // equivalent definitions.
        crate::parameters::collect_param_definitions(audio_elements, mix_presentations)?;

        // All codec configs must agree on the frame size.
        if !codec_configs.is_empty() {
            get_common_samples_per_frame(codec_configs)?;
        }

        ia_sequence_header.validate_and_write(wb)?;
        ArbitraryObu::write_obus_with_hook(
            InsertionHook::AfterIaSequenceHeader,
            arbitrary_obus,
            wb,
        )?;

        for codec_config in codec_configs.values() {
            codec_config.validate_and_write(wb)?;
        }
        ArbitraryObu::write_obus_with_hook(InsertionHook::AfterCodecConfigs, arbitrary_obus, wb)?;

        for audio_element in audio_elements.values() {
            audio_element.obu.validate_and_write(wb)?;
        }
        ArbitraryObu::write_obus_with_hook(InsertionHook::AfterAudioElements, arbitrary_obus, wb)?;

        let mut presentation_order: Vec<&MixPresentationObu> = mix_presentations.iter().collect();
        presentation_order.sort_by_key(|obu| obu.mix_presentation_id);
        for mix_presentation in presentation_order {
            mix_presentation.validate_and_write(wb)?;
        }
        ArbitraryObu::write_obus_with_hook(
            InsertionHook::AfterMixPresentations,
            arbitrary_obus,
            wb,
        )?;

        Ok(())
    }

    /// Write one temporal unit: optional temporal delimiter, tick-bound
    /// arbitrary OBUs around the parameter blocks, then the audio frames.
    ///
    /// Adds the number of untrimmed samples in the unit to `num_samples`.
    pub fn write_temporal_unit(
        include_temporal_delimiters: bool,
        temporal_unit: &TemporalUnit,
        audio_elements: &BTreeMap<DecodedUleb128, AudioElementWithData>,
        codec_configs: &BTreeMap<DecodedUleb128, CodecConfigObu>,
        parameter_id_to_metadata: &BTreeMap<DecodedUleb128, PerIdParameterMetadata>,
        wb: &mut WriteBitBuffer,
        num_samples: &mut u32,
    ) -> Result<()> {
        if include_temporal_delimiters {
            TemporalDelimiterObu::new(ObuHeader::default()).validate_and_write(wb)?;
        }

        ArbitraryObu::write_obus_with_hook(
            InsertionHook::BeforeParameterBlocksAtTick,
            &temporal_unit.arbitrary_obus,
            wb,
        )?;

        for parameter_block in &temporal_unit.parameter_blocks {
            let metadata = parameter_id_to_metadata
                .get(&parameter_block.obu.parameter_id)
                .ok_or_else(|| {
                    Error::failed_precondition(format!(
                        "No descriptor declares parameter_id = {}",
                        parameter_block.obu.parameter_id
                    ))
                })?;
            parameter_block.obu.validate_and_write(metadata, wb)?;
        }
        ArbitraryObu::write_obus_with_hook(
            InsertionHook::AfterParameterBlocksAtTick,
            &temporal_unit.arbitrary_obus,
            wb,
        )?;

        for audio_frame in &temporal_unit.audio_frames {
            let audio_element = audio_elements
                .get(&audio_frame.audio_element_id)
                .ok_or_else(|| {
                    Error::failed_precondition(format!(
                        "Audio frame references unknown audio element {}",
                        audio_frame.audio_element_id
                    ))
                })?;
            let codec_config = codec_configs
                .get(&audio_element.codec_config_id)
                .ok_or_else(|| {
                    Error::failed_precondition(format!(
                        "Audio element {} references unknown codec config {}",
                        audio_frame.audio_element_id, audio_element.codec_config_id
                    ))
                })?;
            *num_samples = num_samples.saturating_add(
                audio_frame
                    .obu
                    .num_untrimmed_samples(codec_config.num_samples_per_frame()),
            );
            audio_frame.obu.validate_and_write(wb)?;
        }
        ArbitraryObu::write_obus_with_hook(
            InsertionHook::AfterAudioFramesAtTick,
            &temporal_unit.arbitrary_obus,
            wb,
        )?;

        Ok(())
    }

    /// Serialize the whole IA sequence: validate and write the descriptor
    /// prologue, then every temporal unit in timestamp order.
    ///
    /// An invalid descriptor set fails before the output file is created;
    /// a failure inside a temporal unit removes the partially-written
    /// file.
    #[allow(clippy::too_many_arguments)]
    pub fn pick_and_place(
        &mut self,
        ia_sequence_header: &IaSequenceHeaderObu,
        codec_configs: &BTreeMap<DecodedUleb128, CodecConfigObu>,
        audio_elements: &BTreeMap<DecodedUleb128, AudioElementWithData>,
        mix_presentations: &[MixPresentationObu],
        audio_frames: Vec<AudioFrameWithData>,
        parameter_blocks: Vec<ParameterBlockWithData>,
        arbitrary_obus: Vec<ArbitraryObu>,
        parameter_id_to_metadata: &BTreeMap<DecodedUleb128, PerIdParameterMetadata>,
    ) -> Result<()> {
        let mut wb = WriteBitBuffer::with_capacity(1024, self.leb_generator);

        // Validate and serialize the prologue before any file exists.
        Self::write_descriptor_obus(
            ia_sequence_header,
            codec_configs,
            audio_elements,
            mix_presentations,
            &arbitrary_obus,
            &mut wb,
        )?;

        if !audio_frames.is_empty() {
            let common_samples_per_frame = get_common_samples_per_frame(codec_configs)?;
            validate_and_get_common_trim(common_samples_per_frame, &audio_frames)?;
        }

        let mut file = match &self.output {
            SequencerOutput::File(Some(path)) => {
                Some(BufWriter::new(File::create(path).map_err(Error::from)?))
            }
            SequencerOutput::File(None) => None,
            SequencerOutput::Memory(_) => None,
        };
        let mut memory = Vec::new();

        let flush =
            |wb: &mut WriteBitBuffer, file: &mut Option<BufWriter<File>>, memory: &mut Vec<u8>| {
                match (&self.output, file) {
                    (SequencerOutput::Memory(_), _) => wb.flush_to(memory),
                    (_, Some(file)) => wb.flush_to(file),
                    _ => wb.flush_to(&mut std::io::sink()),
                }
            };

        let fail_and_cleanup = |file: Option<BufWriter<File>>, error: Error| -> Error {
            if let (SequencerOutput::File(Some(path)), Some(file)) = (&self.output, file) {
                drop(file);
                let _ = std::fs::remove_file(path);
            }
            error
        };

        if let Err(error) = flush(&mut wb, &mut file, &mut memory) {
            return Err(fail_and_cleanup(file, error));
        }

        let temporal_unit_map =
            match generate_temporal_unit_map(audio_frames, parameter_blocks, arbitrary_obus) {
                Ok(map) => map,
                Err(error) => return Err(fail_and_cleanup(file, error)),
            };

        let mut num_samples = 0u32;
        for (timestamp, temporal_unit) in &temporal_unit_map {
            let result = Self::write_temporal_unit(
                self.include_temporal_delimiters,
                temporal_unit,
                audio_elements,
                codec_configs,
                parameter_id_to_metadata,
                &mut wb,
                &mut num_samples,
            )
            .and_then(|()| flush(&mut wb, &mut file, &mut memory));
            if let Err(error) = result {
                debug!(timestamp, "Removing output after invalid temporal unit");
                return Err(fail_and_cleanup(file, error));
            }
        }
        debug!(num_samples, "Finished writing IA sequence");

        if let Err(error) = file.as_mut().map(Write::flush).transpose() {
            return Err(fail_and_cleanup(file, error.into()));
        }

        if let SequencerOutput::Memory(bytes) = &mut self.output {
            *bytes = memory;
        }
        Ok(())
    }
}

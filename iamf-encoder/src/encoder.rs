//! The encoder façade: descriptor build, per-frame sample intake, and
//! stream finalization.

use std::collections::BTreeMap;
use std::mem;
use std::sync::Mutex;

use tracing::warn;

use iamf_core::{DecodedUleb128, Error, Result};
use iamf_obu::{
    AmbisonicsConfig, ArbitraryObu, AudioElementConfig, AudioFrameObu, CodecConfigObu,
    IaSequenceHeaderObu, LoudspeakerLayout, MixPresentationObu, ObuHeader,
    ParamDefinitionVariant, PerIdParameterMetadata,
};

use crate::channel_label::ChannelLabel;
use crate::config::{AudioFrameMetadata, ParameterBlockMetadata, UserMetadata};
use crate::data::{
    AudioElementWithData, AudioFrameWithData, IdLabeledFrameMap, InternalSampleType, LabeledFrame,
    ParameterBlockWithData,
};
use crate::generators::{
    generate_arbitrary_obus, generate_audio_elements, generate_codec_configs,
    generate_ia_sequence_header, generate_mix_presentations, generate_parameter_block,
};
use crate::parameters::{collect_param_definitions, per_id_metadata_map};
use crate::traits::{
    AudioCodec, AudioCodecFactory, LoudnessCalculator, LoudnessCalculatorFactory, Renderer,
    RendererFactory,
};

/// The immutable descriptor OBUs built at encoder construction.
#[derive(Debug)]
pub struct DescriptorObus {
    /// The IA Sequence Header.
    pub ia_sequence_header: IaSequenceHeaderObu,
    /// Codec Configs keyed by id.
    pub codec_configs: BTreeMap<DecodedUleb128, CodecConfigObu>,
    /// Audio Elements keyed by id.
    pub audio_elements: BTreeMap<DecodedUleb128, AudioElementWithData>,
    /// Mix Presentations in metadata order.
    pub mix_presentations: Vec<MixPresentationObu>,
    /// User-injected arbitrary OBUs.
    pub arbitrary_obus: Vec<ArbitraryObu>,
}

/// One temporal unit's worth of data OBUs produced by the façade.
#[derive(Debug, Default)]
pub struct TemporalUnitData {
    /// The signed audio frames.
    pub audio_frames: Vec<AudioFrameWithData>,
    /// The parameter blocks belonging to this unit.
    pub parameter_blocks: Vec<ParameterBlockWithData>,
    /// The input samples per audio element, for rendering and loudness.
    pub id_to_labeled_frame: IdLabeledFrameMap,
    /// Start timestamp of the unit.
    pub timestamp: i64,
}

struct SubstreamState {
    substream_id: DecodedUleb128,
    labels: Vec<ChannelLabel>,
    codec: Box<dyn AudioCodec>,
}

struct ElementState {
    codec_config_id: DecodedUleb128,
    num_samples_per_frame: u32,
    substreams: Vec<SubstreamState>,
    /// User-configured stream-start trim not yet attached to a frame.
    trim_start_remaining: u32,
    /// User-configured stream-end trim, applied to the final frame.
    user_trim_end: u32,
    trim_end_applied: bool,
    /// Channel samples submitted for the current temporal unit.
    labeled_samples: BTreeMap<ChannelLabel, Vec<InternalSampleType>>,
}

struct LayoutMeasurement {
    mix_presentation_index: usize,
    sub_mix_index: usize,
    layout_index: usize,
    renderer: Box<dyn Renderer>,
    calculator: Box<dyn LoudnessCalculator>,
}

/// Renders pushed temporal units and measures loudness per layout.
///
/// The accumulators sit behind a mutex: the renderer collaborator is the
/// one component that may be internally parallel.
struct MixPresentationFinalizer {
    measurements: Mutex<Vec<LayoutMeasurement>>,
}

impl MixPresentationFinalizer {
    fn create(
        mix_presentations: &[MixPresentationObu],
        renderer_factory: Option<&dyn RendererFactory>,
        loudness_calculator_factory: Option<&dyn LoudnessCalculatorFactory>,
        rendered_sample_rate: u32,
    ) -> Self {
        let mut measurements = Vec::new();
        if let (Some(renderer_factory), Some(loudness_calculator_factory)) =
            (renderer_factory, loudness_calculator_factory)
        {
            for (mix_presentation_index, mix_presentation) in
                mix_presentations.iter().enumerate()
            {
                for (sub_mix_index, sub_mix) in mix_presentation.sub_mixes.iter().enumerate() {
                    for (layout_index, layout) in sub_mix.layouts.iter().enumerate() {
                        let renderer = renderer_factory.create(&layout.loudness_layout);
                        let calculator =
                            loudness_calculator_factory.create(layout, rendered_sample_rate);
                        if let (Some(renderer), Some(calculator)) = (renderer, calculator) {
                            measurements.push(LayoutMeasurement {
                                mix_presentation_index,
                                sub_mix_index,
                                layout_index,
                                renderer,
                                calculator,
                            });
                        }
                    }
                }
            }
        }
        Self {
            measurements: Mutex::new(measurements),
        }
    }

    fn push_temporal_unit(&self, id_to_labeled_frame: &IdLabeledFrameMap) -> Result<()> {
        let mut measurements = self
            .measurements
            .lock()
            .map_err(|_| Error::unknown("Loudness accumulator mutex poisoned".to_string()))?;
        for measurement in measurements.iter_mut() {
            for labeled_frame in id_to_labeled_frame.values() {
                let num_ticks = labeled_frame
                    .label_to_samples
                    .values()
                    .map(Vec::len)
                    .min()
                    .unwrap_or(0);
                let mut samples = vec![Vec::new(); num_ticks];
                for channel in labeled_frame.label_to_samples.values() {
                    for (tick, sample) in samples.iter_mut().zip(channel.iter()) {
                        tick.push(*sample);
                    }
                }
                let rendered = measurement.renderer.render(&samples)?;
                measurement.calculator.accumulate(&rendered)?;
            }
        }
        Ok(())
    }

    fn finalize(&self, mix_presentations: &[MixPresentationObu]) -> Result<Vec<MixPresentationObu>> {
        let measurements = self
            .measurements
            .lock()
            .map_err(|_| Error::unknown("Loudness accumulator mutex poisoned".to_string()))?;
        let mut finalized = mix_presentations.to_vec();
        for measurement in measurements.iter() {
            let loudness = measurement.calculator.finalize()?;
            finalized[measurement.mix_presentation_index].sub_mixes[measurement.sub_mix_index]
                .layouts[measurement.layout_index]
                .loudness = loudness;
        }
        Ok(finalized)
    }
}

/// The encoder façade.
///
/// Built once from user metadata; then driven per temporal unit with
/// `begin_temporal_unit` / `add_samples` / `add_parameter_block_metadata` /
/// `output_temporal_unit` until `generating_data_obus` turns false after
/// `finalize_add_samples`.
pub struct IamfEncoder {
    descriptors: DescriptorObus,
    param_definitions: BTreeMap<DecodedUleb128, ParamDefinitionVariant>,
    parameter_id_to_metadata: BTreeMap<DecodedUleb128, PerIdParameterMetadata>,
    elements: BTreeMap<DecodedUleb128, ElementState>,
    pending_parameter_blocks: Vec<ParameterBlockWithData>,
    timestamp: i64,
    add_samples_finalized: bool,
    frames_drained: bool,
    finalizer: MixPresentationFinalizer,
}

/// The ordered channel labels of each substream of a single-layer layout.
fn substream_label_groups(layout: LoudspeakerLayout) -> Result<Vec<Vec<ChannelLabel>>> {
    use ChannelLabel::*;
    let groups: Vec<Vec<ChannelLabel>> = match layout {
        LoudspeakerLayout::Mono => vec![vec![Mono]],
        LoudspeakerLayout::Stereo | LoudspeakerLayout::Binaural => vec![vec![L2, R2]],
        LoudspeakerLayout::Surround5_1 => {
            vec![vec![L5, R5], vec![Ls5, Rs5], vec![Centre], vec![Lfe]]
        }
        LoudspeakerLayout::Surround5_1_2 => vec![
            vec![L5, R5],
            vec![Ls5, Rs5],
            vec![Ltf2, Rtf2],
            vec![Centre],
            vec![Lfe],
        ],
        LoudspeakerLayout::Surround5_1_4 => vec![
            vec![L5, R5],
            vec![Ls5, Rs5],
            vec![Ltf4, Rtf4],
            vec![Ltb4, Rtb4],
            vec![Centre],
            vec![Lfe],
        ],
        LoudspeakerLayout::Surround7_1 => vec![
            vec![L7, R7],
            vec![Lss7, Rss7],
            vec![Lrs7, Rrs7],
            vec![Centre],
            vec![Lfe],
        ],
        LoudspeakerLayout::Surround7_1_2 => vec![
            vec![L7, R7],
            vec![Lss7, Rss7],
            vec![Lrs7, Rrs7],
            vec![Ltf2, Rtf2],
            vec![Centre],
            vec![Lfe],
        ],
        LoudspeakerLayout::Surround7_1_4 => vec![
            vec![L7, R7],
            vec![Lss7, Rss7],
            vec![Lrs7, Rrs7],
            vec![Ltf4, Rtf4],
            vec![Ltb4, Rtb4],
            vec![Centre],
            vec![Lfe],
        ],
        LoudspeakerLayout::Surround3_1_2 => vec![
            vec![L3, R3],
            vec![Ltf3, Rtf3],
            vec![Centre],
            vec![Lfe],
        ],
        LoudspeakerLayout::Reserved(value) => {
            return Err(Error::invalid_argument(format!(
                "Reserved loudspeaker layout {value} cannot take samples"
            )))
        }
    };
    Ok(groups)
}

fn build_element_state(
    frame_metadata: &AudioFrameMetadata,
    audio_element: &AudioElementWithData,
    codec_config: &CodecConfigObu,
    codec_factory: &dyn AudioCodecFactory,
) -> Result<ElementState> {
    let audio_element_id = frame_metadata.audio_element_id;
    let substream_ids = &audio_element.obu.audio_substream_ids;

    let label_groups: Vec<Vec<ChannelLabel>> = match &audio_element.obu.config {
        AudioElementConfig::Channel(layout_config) => {
            let [layer] = layout_config.channel_audio_layer_configs.as_slice() else {
                return Err(Error::invalid_argument(format!(
                    "Audio element {audio_element_id}: down-mixing for multi-layer scalable \
                     elements requires an external demixing collaborator"
                )));
            };
            substream_label_groups(layer.loudspeaker_layout)?
        }
        AudioElementConfig::Scene(AmbisonicsConfig::Mono {
            channel_mapping, ..
        }) => {
            let mut groups = vec![Vec::new(); substream_ids.len()];
            for (acn, &substream_index) in channel_mapping.iter().enumerate() {
                if substream_index == 255 {
                    continue;
                }
                let group = groups.get_mut(substream_index as usize).ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "Audio element {audio_element_id}: channel_mapping points past \
                         substream {substream_index}"
                    ))
                })?;
                group.push(ChannelLabel::ambisonics(acn as u8)?);
            }
            groups
        }
        AudioElementConfig::Scene(AmbisonicsConfig::Projection { .. }) => {
            return Err(Error::invalid_argument(format!(
                "Audio element {audio_element_id}: projection ambisonics requires an external \
                 matrix collaborator"
            )))
        }
        AudioElementConfig::Extension(_) => {
            return Err(Error::invalid_argument(format!(
                "Audio element {audio_element_id}: reserved element types cannot take samples"
            )))
        }
    };

    if label_groups.len() != substream_ids.len() {
        return Err(Error::invalid_argument(format!(
            "Audio element {audio_element_id} declares {} substreams but its layout \
             produces {}",
            substream_ids.len(),
            label_groups.len()
        )));
    }

    // The user-declared labels must cover exactly the layout's channels.
    let mut declared: Vec<ChannelLabel> = frame_metadata
        .channel_labels
        .iter()
        .map(|label| label.parse())
        .collect::<Result<_>>()?;
    declared.sort();
    let mut expected: Vec<ChannelLabel> = label_groups.iter().flatten().copied().collect();
    expected.sort();
    if declared != expected {
        return Err(Error::invalid_argument(format!(
            "Audio element {audio_element_id}: channel_labels do not match the layout"
        )));
    }

    let mut substreams = Vec::with_capacity(substream_ids.len());
    for (&substream_id, labels) in substream_ids.iter().zip(label_groups) {
        let codec = codec_factory
            .create(&codec_config.codec_config, labels.len())
            .ok_or_else(|| {
                Error::unknown(format!(
                    "No codec available for substream {substream_id} of audio element \
                     {audio_element_id}"
                ))
            })?;
        substreams.push(SubstreamState {
            substream_id,
            labels,
            codec,
        });
    }

    Ok(ElementState {
        codec_config_id: audio_element.codec_config_id,
        num_samples_per_frame: codec_config.num_samples_per_frame(),
        substreams,
        trim_start_remaining: frame_metadata.samples_to_trim_at_start,
        user_trim_end: frame_metadata.samples_to_trim_at_end,
        trim_end_applied: frame_metadata.samples_to_trim_at_end == 0,
        labeled_samples: BTreeMap::new(),
    })
}

impl IamfEncoder {
    /// Build the descriptor OBUs from user metadata and wire up one codec
    /// per substream.
    pub fn create(
        user_metadata: &UserMetadata,
        codec_factory: &dyn AudioCodecFactory,
    ) -> Result<Self> {
        Self::create_with_collaborators(user_metadata, codec_factory, None, None)
    }

    /// [`Self::create`] with rendering and loudness collaborators wired in.
    pub fn create_with_collaborators(
        user_metadata: &UserMetadata,
        codec_factory: &dyn AudioCodecFactory,
        renderer_factory: Option<&dyn RendererFactory>,
        loudness_calculator_factory: Option<&dyn LoudnessCalculatorFactory>,
    ) -> Result<Self> {
        let ia_sequence_header =
            generate_ia_sequence_header(&user_metadata.ia_sequence_header_metadata)?;
        let codec_configs = generate_codec_configs(&user_metadata.codec_config_metadata)?;
        let audio_elements =
            generate_audio_elements(&user_metadata.audio_element_metadata, &codec_configs)?;
        let mix_presentations =
            generate_mix_presentations(&user_metadata.mix_presentation_metadata)?;
        let arbitrary_obus = generate_arbitrary_obus(&user_metadata.arbitrary_obu_metadata)?;

        let param_definitions = collect_param_definitions(&audio_elements, &mix_presentations)?;
        let parameter_id_to_metadata = per_id_metadata_map(&param_definitions, &audio_elements)?;

        let mut elements = BTreeMap::new();
        for frame_metadata in &user_metadata.audio_frame_metadata {
            let audio_element = audio_elements
                .get(&frame_metadata.audio_element_id)
                .ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "audio_frame_metadata references unknown audio element {}",
                        frame_metadata.audio_element_id
                    ))
                })?;
            let codec_config =
                codec_configs
                    .get(&audio_element.codec_config_id)
                    .ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "Audio element {} references unknown codec config {}",
                            frame_metadata.audio_element_id, audio_element.codec_config_id
                        ))
                    })?;
            let state = build_element_state(
                frame_metadata,
                audio_element,
                codec_config,
                codec_factory,
            )?;
            if elements
                .insert(frame_metadata.audio_element_id, state)
                .is_some()
            {
                return Err(Error::invalid_argument(format!(
                    "Duplicate audio_frame_metadata for audio element {}",
                    frame_metadata.audio_element_id
                )));
            }
        }

        let rendered_sample_rate = codec_configs
            .values()
            .next()
            .and_then(|config| config.output_sample_rate().ok())
            .unwrap_or(48_000);
        let finalizer = MixPresentationFinalizer::create(
            &mix_presentations,
            renderer_factory,
            loudness_calculator_factory,
            rendered_sample_rate,
        );

        Ok(Self {
            descriptors: DescriptorObus {
                ia_sequence_header,
                codec_configs,
                audio_elements,
                mix_presentations,
                arbitrary_obus,
            },
            param_definitions,
            parameter_id_to_metadata,
            elements,
            pending_parameter_blocks: Vec::new(),
            timestamp: 0,
            add_samples_finalized: false,
            frames_drained: false,
            finalizer,
        })
    }

    /// The descriptor OBUs built at construction.
    pub fn descriptors(&self) -> &DescriptorObus {
        &self.descriptors
    }

    /// The resolved per-parameter-id metadata.
    pub fn parameter_id_to_metadata(&self) -> &BTreeMap<DecodedUleb128, PerIdParameterMetadata> {
        &self.parameter_id_to_metadata
    }

    /// The collected parameter definitions.
    pub fn param_definitions(&self) -> &BTreeMap<DecodedUleb128, ParamDefinitionVariant> {
        &self.param_definitions
    }

    /// True while the façade still has data OBUs to produce.
    pub fn generating_data_obus(&self) -> bool {
        if !self.add_samples_finalized {
            return true;
        }
        !self.frames_drained
    }

    /// Start timestamp of the next temporal unit.
    pub fn input_timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Clear the per-unit sample scratch.
    pub fn begin_temporal_unit(&mut self) {
        for element in self.elements.values_mut() {
            element.labeled_samples.clear();
        }
    }

    /// Accumulate channel samples for the current temporal unit. Samples
    /// submitted after `finalize_add_samples` are discarded with a
    /// warning.
    pub fn add_samples(
        &mut self,
        audio_element_id: DecodedUleb128,
        label: ChannelLabel,
        samples: Vec<InternalSampleType>,
    ) {
        if self.add_samples_finalized {
            warn!(
                audio_element_id,
                discarded = samples.len(),
                "add_samples after finalize_add_samples has no effect"
            );
            return;
        }
        if let Some(element) = self.elements.get_mut(&audio_element_id) {
            element.labeled_samples.insert(label, samples);
        } else {
            warn!(audio_element_id, "No audio_frame_metadata for element; samples dropped");
        }
    }

    /// Signal that no further samples will arrive.
    pub fn finalize_add_samples(&mut self) {
        self.add_samples_finalized = true;
    }

    /// Accept one pre-built parameter block for the current unit.
    pub fn add_parameter_block_metadata(
        &mut self,
        metadata: &ParameterBlockMetadata,
    ) -> Result<()> {
        let per_id_metadata = self
            .parameter_id_to_metadata
            .get(&metadata.parameter_id)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "No descriptor declares parameter_id = {}",
                    metadata.parameter_id
                ))
            })?;
        self.pending_parameter_blocks
            .push(generate_parameter_block(metadata, per_id_metadata)?);
        Ok(())
    }

    /// Run the codecs over the unit's samples and emit the signed frames,
    /// the unit's parameter blocks, and the labeled input frames.
    pub fn output_temporal_unit(&mut self) -> Result<TemporalUnitData> {
        if self.add_samples_finalized && self.frames_drained {
            return Err(Error::failed_precondition(
                "All data OBUs have already been drained".to_string(),
            ));
        }

        let mut output = TemporalUnitData {
            timestamp: self.timestamp,
            ..Default::default()
        };
        let mut emitted_any_frame = false;

        for (&audio_element_id, element) in self.elements.iter_mut() {
            let labeled_samples = mem::take(&mut element.labeled_samples);
            if labeled_samples.values().all(Vec::is_empty) {
                if self.add_samples_finalized && !element.trim_end_applied {
                    return Err(Error::invalid_argument(format!(
                        "Audio element {audio_element_id}: samples_to_trim_at_end was never \
                         applied to a final frame"
                    )));
                }
                continue;
            }

            let num_samples_per_frame = element.num_samples_per_frame as usize;
            let submitted = labeled_samples
                .values()
                .map(Vec::len)
                .max()
                .unwrap_or_default();
            if submitted > num_samples_per_frame {
                return Err(Error::invalid_argument(format!(
                    "Audio element {audio_element_id}: {submitted} samples exceed the frame \
                     size of {num_samples_per_frame}"
                )));
            }
            let padding = if submitted < num_samples_per_frame {
                if !self.add_samples_finalized {
                    return Err(Error::invalid_argument(format!(
                        "Audio element {audio_element_id}: partial frame of {submitted} \
                         samples before finalize_add_samples"
                    )));
                }
                (num_samples_per_frame - submitted) as u32
            } else {
                0
            };

            // Resolve the per-frame trim counters shared by every
            // substream of this element.
            let trim_at_start = element
                .trim_start_remaining
                .min(element.num_samples_per_frame);
            element.trim_start_remaining -= trim_at_start;
            let trim_at_end = if self.add_samples_finalized {
                element.trim_end_applied = true;
                element.user_trim_end.saturating_add(padding)
            } else {
                padding
            };
            let total_trim = u64::from(trim_at_start) + u64::from(trim_at_end);
            let untrimmed = u64::from(element.num_samples_per_frame)
                .checked_sub(total_trim)
                .ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "Audio element {audio_element_id}: trim exceeds the frame size"
                    ))
                })?;
            if untrimmed == 0 && trim_at_end > 0 {
                return Err(Error::invalid_argument(format!(
                    "Audio element {audio_element_id}: a frame may not be fully trimmed \
                     from the end"
                )));
            }

            let mut header = ObuHeader::default();
            if trim_at_start > 0 || trim_at_end > 0 {
                header.obu_trimming_status_flag = true;
                header.num_samples_to_trim_at_start = trim_at_start;
                header.num_samples_to_trim_at_end = trim_at_end;
            }

            let mut labeled_frame = LabeledFrame {
                end_timestamp: self.timestamp + element.num_samples_per_frame as i64,
                label_to_samples: BTreeMap::new(),
            };

            for substream in element.substreams.iter_mut() {
                let mut frame_samples =
                    vec![
                        Vec::with_capacity(substream.labels.len());
                        num_samples_per_frame
                    ];
                for &label in &substream.labels {
                    let channel = labeled_samples.get(&label).ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "Audio element {audio_element_id}: missing samples for \
                             channel {label}"
                        ))
                    })?;
                    for (tick, row) in frame_samples.iter_mut().enumerate() {
                        row.push(channel.get(tick).copied().unwrap_or(0.0));
                    }
                    labeled_frame
                        .label_to_samples
                        .entry(label)
                        .or_insert_with(|| {
                            let mut padded = channel.clone();
                            padded.resize(num_samples_per_frame, 0.0);
                            padded
                        });
                }

                let payload = substream.codec.encode_frame(&frame_samples)?;
                output.audio_frames.push(AudioFrameWithData {
                    obu: AudioFrameObu::new(header.clone(), substream.substream_id, payload),
                    start_timestamp: self.timestamp,
                    end_timestamp: self.timestamp + element.num_samples_per_frame as i64,
                    audio_element_id,
                });
            }

            output.id_to_labeled_frame.insert(audio_element_id, labeled_frame);
            emitted_any_frame = true;
        }

        // Move this unit's parameter blocks to the output.
        let timestamp = self.timestamp;
        let (current, pending): (Vec<_>, Vec<_>) = mem::take(&mut self.pending_parameter_blocks)
            .into_iter()
            .partition(|block| block.start_timestamp <= timestamp);
        output.parameter_blocks = current;
        self.pending_parameter_blocks = pending;

        if emitted_any_frame {
            self.finalizer.push_temporal_unit(&output.id_to_labeled_frame)?;
            self.timestamp += i64::from(
                self.elements
                    .values()
                    .map(|element| element.num_samples_per_frame)
                    .next()
                    .unwrap_or(0),
            );
        }

        if self.add_samples_finalized
            && self
                .elements
                .values()
                .all(|element| element.labeled_samples.is_empty())
        {
            self.frames_drained = true;
        }

        Ok(output)
    }

    /// Re-emit the mix presentations with measured loudness. Only legal
    /// once data-OBU generation has finished.
    pub fn finalize_mix_presentations(&self) -> Result<Vec<MixPresentationObu>> {
        if self.generating_data_obus() {
            return Err(Error::failed_precondition(
                "Cannot finalize mix presentations while generating data OBUs".to_string(),
            ));
        }
        self.finalizer.finalize(&self.descriptors.mix_presentations)
    }
}

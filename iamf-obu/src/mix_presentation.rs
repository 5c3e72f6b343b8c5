//! Mix Presentation OBU.

use iamf_core::{DecodedUleb128, Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::header::{Obu, ObuHeader};
use crate::param_definitions::MixGainParamDefinition;
use crate::types::ObuType;

/// The 2-bit `headphones_rendering_mode` of a rendering config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadphonesRenderingMode {
    /// Downmix to stereo for headphones.
    Stereo,
    /// Render binaurally for headphones.
    Binaural,
    /// Reserved values 2..=3.
    Reserved(u8),
}

impl HeadphonesRenderingMode {
    fn to_u8(self) -> u8 {
        match self {
            HeadphonesRenderingMode::Stereo => 0,
            HeadphonesRenderingMode::Binaural => 1,
            HeadphonesRenderingMode::Reserved(value) => value,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(HeadphonesRenderingMode::Stereo),
            1 => Ok(HeadphonesRenderingMode::Binaural),
            2..=3 => Ok(HeadphonesRenderingMode::Reserved(value)),
            _ => Err(Error::invalid_argument(format!(
                "headphones_rendering_mode {value} does not fit in 2 bits"
            ))),
        }
    }
}

/// ITU-R BS.2051 sound systems plus the IAMF extensions, 4 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundSystem {
    /// Sound system A (0+2+0): stereo.
    A0_2_0,
    /// Sound system B (0+5+0): 5.1.
    B0_5_0,
    /// Sound system C (2+5+0): 5.1.2.
    C2_5_0,
    /// Sound system D (4+5+0): 5.1.4.
    D4_5_0,
    /// Sound system E (4+5+1).
    E4_5_1,
    /// Sound system F (3+7+0).
    F3_7_0,
    /// Sound system G (4+9+0).
    G4_9_0,
    /// Sound system H (9+10+3).
    H9_10_3,
    /// Sound system I (0+7+0): 7.1.
    I0_7_0,
    /// Sound system J (4+7+0): 7.1.4.
    J4_7_0,
    /// 7.1.2.
    Extended7_1_2,
    /// 3.1.2.
    Extended3_1_2,
    /// Mono (0+1+0).
    Mono,
    /// 9.1.6.
    Extended9_1_6,
    /// Reserved values 14..=15.
    Reserved(u8),
}

impl SoundSystem {
    fn to_u8(self) -> u8 {
        match self {
            SoundSystem::A0_2_0 => 0,
            SoundSystem::B0_5_0 => 1,
            SoundSystem::C2_5_0 => 2,
            SoundSystem::D4_5_0 => 3,
            SoundSystem::E4_5_1 => 4,
            SoundSystem::F3_7_0 => 5,
            SoundSystem::G4_9_0 => 6,
            SoundSystem::H9_10_3 => 7,
            SoundSystem::I0_7_0 => 8,
            SoundSystem::J4_7_0 => 9,
            SoundSystem::Extended7_1_2 => 10,
            SoundSystem::Extended3_1_2 => 11,
            SoundSystem::Mono => 12,
            SoundSystem::Extended9_1_6 => 13,
            SoundSystem::Reserved(value) => value,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SoundSystem::A0_2_0),
            1 => Ok(SoundSystem::B0_5_0),
            2 => Ok(SoundSystem::C2_5_0),
            3 => Ok(SoundSystem::D4_5_0),
            4 => Ok(SoundSystem::E4_5_1),
            5 => Ok(SoundSystem::F3_7_0),
            6 => Ok(SoundSystem::G4_9_0),
            7 => Ok(SoundSystem::H9_10_3),
            8 => Ok(SoundSystem::I0_7_0),
            9 => Ok(SoundSystem::J4_7_0),
            10 => Ok(SoundSystem::Extended7_1_2),
            11 => Ok(SoundSystem::Extended3_1_2),
            12 => Ok(SoundSystem::Mono),
            13 => Ok(SoundSystem::Extended9_1_6),
            14..=15 => Ok(SoundSystem::Reserved(value)),
            _ => Err(Error::invalid_argument(format!(
                "sound_system {value} does not fit in 4 bits"
            ))),
        }
    }
}

/// A loudness layout: the speaker arrangement loudness was measured on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// A loudspeaker layout named by its SS convention sound system.
    SsConvention {
        /// The sound system.
        sound_system: SoundSystem,
        /// 2 reserved bits.
        reserved: u8,
    },
    /// Binaural playback.
    Binaural {
        /// 6 reserved bits.
        reserved: u8,
    },
    /// Reserved layout types 0..=1.
    Reserved {
        /// The raw layout type.
        layout_type: u8,
        /// 6 reserved bits.
        reserved: u8,
    },
}

impl Layout {
    const LAYOUT_TYPE_SS_CONVENTION: u8 = 2;
    const LAYOUT_TYPE_BINAURAL: u8 = 3;

    fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        match self {
            Layout::SsConvention {
                sound_system,
                reserved,
            } => {
                wb.write_unsigned(u64::from(Self::LAYOUT_TYPE_SS_CONVENTION), 2)?;
                wb.write_unsigned(u64::from(sound_system.to_u8()), 4)?;
                wb.write_unsigned(u64::from(*reserved), 2)
            }
            Layout::Binaural { reserved } => {
                wb.write_unsigned(u64::from(Self::LAYOUT_TYPE_BINAURAL), 2)?;
                wb.write_unsigned(u64::from(*reserved), 6)
            }
            Layout::Reserved {
                layout_type,
                reserved,
            } => {
                wb.write_unsigned(u64::from(*layout_type), 2)?;
                wb.write_unsigned(u64::from(*reserved), 6)
            }
        }
    }

    fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let layout_type = rb.read_unsigned8(2)?;
        match layout_type {
            Self::LAYOUT_TYPE_SS_CONVENTION => Ok(Layout::SsConvention {
                sound_system: SoundSystem::from_u8(rb.read_unsigned8(4)?)?,
                reserved: rb.read_unsigned8(2)?,
            }),
            Self::LAYOUT_TYPE_BINAURAL => Ok(Layout::Binaural {
                reserved: rb.read_unsigned8(6)?,
            }),
            _ => Ok(Layout::Reserved {
                layout_type,
                reserved: rb.read_unsigned8(6)?,
            }),
        }
    }
}

/// An anchored loudness measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredLoudnessElement {
    /// The anchor: 0 unknown, 1 dialogue, 2 album.
    pub anchor_element: u8,
    /// Loudness in Q7.8 LKFS relative to the anchor.
    pub anchored_loudness: i16,
}

/// Loudness information for one layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoudnessInfo {
    /// Bitmask gating the optional fields.
    pub info_type: u8,
    /// Integrated loudness, Q7.8 LKFS.
    pub integrated_loudness: i16,
    /// Digital (sample) peak, Q7.8 dBFS.
    pub digital_peak: i16,
    /// True peak, present when `info_type & TRUE_PEAK`.
    pub true_peak: i16,
    /// Anchored loudness entries, present when `info_type & ANCHORED_LOUDNESS`.
    pub anchored_loudness: Vec<AnchoredLoudnessElement>,
    /// Opaque extension bytes for reserved `info_type` bits.
    pub info_type_extension_bytes: Vec<u8>,
}

impl LoudnessInfo {
    /// `info_type` bit for the true peak field.
    pub const INFO_TYPE_TRUE_PEAK: u8 = 1;
    /// `info_type` bit for anchored loudness entries.
    pub const INFO_TYPE_ANCHORED_LOUDNESS: u8 = 2;
    const INFO_TYPE_EXTENSION_MASK: u8 = 0b1111_1100;

    /// Loudness info with every optional field absent and silent levels.
    pub fn empty() -> Self {
        Self {
            info_type: 0,
            integrated_loudness: 0,
            digital_peak: 0,
            true_peak: 0,
            anchored_loudness: Vec::new(),
            info_type_extension_bytes: Vec::new(),
        }
    }

    fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_unsigned(u64::from(self.info_type), 8)?;
        wb.write_signed16(self.integrated_loudness)?;
        wb.write_signed16(self.digital_peak)?;
        if self.info_type & Self::INFO_TYPE_TRUE_PEAK != 0 {
            wb.write_signed16(self.true_peak)?;
        }
        if self.info_type & Self::INFO_TYPE_ANCHORED_LOUDNESS != 0 {
            wb.write_unsigned(self.anchored_loudness.len() as u64, 8)?;
            for element in &self.anchored_loudness {
                wb.write_unsigned(u64::from(element.anchor_element), 8)?;
                wb.write_signed16(element.anchored_loudness)?;
            }
        }
        if self.info_type & Self::INFO_TYPE_EXTENSION_MASK != 0 {
            wb.write_uleb128(self.info_type_extension_bytes.len() as DecodedUleb128)?;
            wb.write_bytes(&self.info_type_extension_bytes)?;
        }
        Ok(())
    }

    fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let info_type = rb.read_unsigned8(8)?;
        let integrated_loudness = rb.read_signed16()?;
        let digital_peak = rb.read_signed16()?;
        let true_peak = if info_type & Self::INFO_TYPE_TRUE_PEAK != 0 {
            rb.read_signed16()?
        } else {
            0
        };
        let mut anchored_loudness = Vec::new();
        if info_type & Self::INFO_TYPE_ANCHORED_LOUDNESS != 0 {
            let num_anchored_loudness = rb.read_unsigned8(8)?;
            for _ in 0..num_anchored_loudness {
                anchored_loudness.push(AnchoredLoudnessElement {
                    anchor_element: rb.read_unsigned8(8)?,
                    anchored_loudness: rb.read_signed16()?,
                });
            }
        }
        let mut info_type_extension_bytes = Vec::new();
        if info_type & Self::INFO_TYPE_EXTENSION_MASK != 0 {
            let info_type_size = rb.read_uleb128()?;
            info_type_extension_bytes = vec![0u8; info_type_size as usize];
            rb.read_uint8_span(&mut info_type_extension_bytes)?;
        }
        Ok(Self {
            info_type,
            integrated_loudness,
            digital_peak,
            true_peak,
            anchored_loudness,
            info_type_extension_bytes,
        })
    }
}

/// A loudness layout together with its measured loudness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixPresentationLayout {
    /// The layout loudness was measured on.
    pub loudness_layout: Layout,
    /// The measurement results.
    pub loudness: LoudnessInfo,
}

/// How an audio element should be rendered into a sub-mix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingConfig {
    /// Rendering mode when played back over headphones.
    pub headphones_rendering_mode: HeadphonesRenderingMode,
    /// 6 reserved bits.
    pub reserved: u8,
    /// Opaque extension bytes.
    pub rendering_config_extension_bytes: Vec<u8>,
}

impl RenderingConfig {
    fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_unsigned(u64::from(self.headphones_rendering_mode.to_u8()), 2)?;
        wb.write_unsigned(u64::from(self.reserved), 6)?;
        wb.write_uleb128(self.rendering_config_extension_bytes.len() as DecodedUleb128)?;
        wb.write_bytes(&self.rendering_config_extension_bytes)
    }

    fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let headphones_rendering_mode = HeadphonesRenderingMode::from_u8(rb.read_unsigned8(2)?)?;
        let reserved = rb.read_unsigned8(6)?;
        let rendering_config_extension_size = rb.read_uleb128()?;
        let mut rendering_config_extension_bytes =
            vec![0u8; rendering_config_extension_size as usize];
        rb.read_uint8_span(&mut rendering_config_extension_bytes)?;
        Ok(Self {
            headphones_rendering_mode,
            reserved,
            rendering_config_extension_bytes,
        })
    }
}

/// An audio element bound into a sub-mix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubMixAudioElement {
    /// The referenced audio element.
    pub audio_element_id: DecodedUleb128,
    /// One localized label per annotation language.
    pub localized_element_annotations: Vec<String>,
    /// How to render this element.
    pub rendering_config: RenderingConfig,
    /// The element's mix gain.
    pub element_mix_gain: MixGainParamDefinition,
}

/// One sub-mix of a mix presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixPresentationSubMix {
    /// The audio elements mixed together.
    pub audio_elements: Vec<SubMixAudioElement>,
    /// The gain applied to the mixed output.
    pub output_mix_gain: MixGainParamDefinition,
    /// The layouts loudness was measured on.
    pub layouts: Vec<MixPresentationLayout>,
}

/// Mix Presentation OBU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixPresentationObu {
    /// The OBU header.
    pub header: ObuHeader,
    /// Identifier of this presentation.
    pub mix_presentation_id: DecodedUleb128,
    /// Number of annotation languages; every annotation list in this OBU
    /// must have exactly this many entries.
    pub count_label: DecodedUleb128,
    /// BCP-47 tags of the annotation languages.
    pub annotations_language: Vec<String>,
    /// One human-readable presentation label per language.
    pub localized_presentation_annotations: Vec<String>,
    /// The sub-mixes.
    pub sub_mixes: Vec<MixPresentationSubMix>,
}

impl MixPresentationObu {
    /// Create a mix presentation OBU. The header's type is forced to
    /// [`ObuType::MixPresentation`].
    pub fn new(
        header: ObuHeader,
        mix_presentation_id: DecodedUleb128,
        count_label: DecodedUleb128,
        annotations_language: Vec<String>,
        localized_presentation_annotations: Vec<String>,
        sub_mixes: Vec<MixPresentationSubMix>,
    ) -> Self {
        Self {
            header: ObuHeader {
                obu_type: ObuType::MixPresentation,
                ..header
            },
            mix_presentation_id,
            count_label,
            annotations_language,
            localized_presentation_annotations,
            sub_mixes,
        }
    }

    /// Ids of every audio element referenced from any sub-mix.
    pub fn referenced_audio_element_ids(&self) -> Vec<DecodedUleb128> {
        self.sub_mixes
            .iter()
            .flat_map(|sub_mix| sub_mix.audio_elements.iter())
            .map(|element| element.audio_element_id)
            .collect()
    }

    /// The largest number of audio elements bound by one sub-mix.
    pub fn max_audio_elements_per_sub_mix(&self) -> usize {
        self.sub_mixes
            .iter()
            .map(|sub_mix| sub_mix.audio_elements.len())
            .max()
            .unwrap_or(0)
    }

    /// Read the payload of a mix presentation OBU whose header was already
    /// consumed.
    pub fn read_and_validate(header: ObuHeader, rb: &mut ReadBitBuffer) -> Result<Self> {
        let mix_presentation_id = rb.read_uleb128()?;
        let count_label = rb.read_uleb128()?;
        let mut annotations_language = Vec::with_capacity(count_label as usize);
        for _ in 0..count_label {
            annotations_language.push(rb.read_string()?);
        }
        let mut localized_presentation_annotations = Vec::with_capacity(count_label as usize);
        for _ in 0..count_label {
            localized_presentation_annotations.push(rb.read_string()?);
        }

        let num_sub_mixes = rb.read_uleb128()?;
        let mut sub_mixes = Vec::with_capacity(num_sub_mixes as usize);
        for _ in 0..num_sub_mixes {
            let num_audio_elements = rb.read_uleb128()?;
            let mut audio_elements = Vec::with_capacity(num_audio_elements as usize);
            for _ in 0..num_audio_elements {
                let audio_element_id = rb.read_uleb128()?;
                let mut localized_element_annotations =
                    Vec::with_capacity(count_label as usize);
                for _ in 0..count_label {
                    localized_element_annotations.push(rb.read_string()?);
                }
                let rendering_config = RenderingConfig::read(rb)?;
                let element_mix_gain = MixGainParamDefinition::read(rb)?;
                audio_elements.push(SubMixAudioElement {
                    audio_element_id,
                    localized_element_annotations,
                    rendering_config,
                    element_mix_gain,
                });
            }
            let output_mix_gain = MixGainParamDefinition::read(rb)?;
            let num_layouts = rb.read_uleb128()?;
            let mut layouts = Vec::with_capacity(num_layouts as usize);
            for _ in 0..num_layouts {
                layouts.push(MixPresentationLayout {
                    loudness_layout: Layout::read(rb)?,
                    loudness: LoudnessInfo::read(rb)?,
                });
            }
            sub_mixes.push(MixPresentationSubMix {
                audio_elements,
                output_mix_gain,
                layouts,
            });
        }

        let obu = Self {
            header,
            mix_presentation_id,
            count_label,
            annotations_language,
            localized_presentation_annotations,
            sub_mixes,
        };
        obu.validate()?;
        Ok(obu)
    }
}

impl Obu for MixPresentationObu {
    fn header(&self) -> &ObuHeader {
        &self.header
    }

    fn validate(&self) -> Result<()> {
        let count_label = self.count_label as usize;
        if self.annotations_language.len() != count_label
            || self.localized_presentation_annotations.len() != count_label
        {
            return Err(Error::invalid_argument(format!(
                "Mix presentation {} annotation lists disagree with count_label = {count_label}",
                self.mix_presentation_id
            )));
        }
        if self.sub_mixes.is_empty() {
            return Err(Error::invalid_argument(format!(
                "Mix presentation {} has no sub-mixes",
                self.mix_presentation_id
            )));
        }
        for sub_mix in &self.sub_mixes {
            if sub_mix.audio_elements.is_empty() {
                return Err(Error::invalid_argument(format!(
                    "Mix presentation {} has a sub-mix with no audio elements",
                    self.mix_presentation_id
                )));
            }
            for element in &sub_mix.audio_elements {
                if element.localized_element_annotations.len() != count_label {
                    return Err(Error::invalid_argument(format!(
                        "Element {} annotation list disagrees with count_label = {count_label}",
                        element.audio_element_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn write_payload(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_uleb128(self.mix_presentation_id)?;
        wb.write_uleb128(self.count_label)?;
        for language in &self.annotations_language {
            wb.write_string(language)?;
        }
        for annotation in &self.localized_presentation_annotations {
            wb.write_string(annotation)?;
        }

        wb.write_uleb128(self.sub_mixes.len() as DecodedUleb128)?;
        for sub_mix in &self.sub_mixes {
            wb.write_uleb128(sub_mix.audio_elements.len() as DecodedUleb128)?;
            for element in &sub_mix.audio_elements {
                wb.write_uleb128(element.audio_element_id)?;
                for annotation in &element.localized_element_annotations {
                    wb.write_string(annotation)?;
                }
                element.rendering_config.write(wb)?;
                element.element_mix_gain.write(wb)?;
            }
            sub_mix.output_mix_gain.write(wb)?;
            wb.write_uleb128(sub_mix.layouts.len() as DecodedUleb128)?;
            for layout in &sub_mix.layouts {
                layout.loudness_layout.write(wb)?;
                layout.loudness.write(wb)?;
            }
        }
        Ok(())
    }
}

//! Audio Element OBU.

use iamf_core::{DecodedUleb128, Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::header::{Obu, ObuHeader};
use crate::param_definitions::{
    DemixingParamDefinition, ParamDefinitionType, ReconGainParamDefinition,
};
use crate::types::ObuType;

/// The 3-bit `audio_element_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioElementType {
    /// Channel-based audio with a scalable layout.
    ChannelBased,
    /// Scene-based (ambisonics) audio.
    SceneBased,
    /// Reserved types 2..=7, carried with an opaque config.
    Reserved(u8),
}

impl AudioElementType {
    /// The raw 3-bit wire value.
    pub fn to_u8(self) -> u8 {
        match self {
            AudioElementType::ChannelBased => 0,
            AudioElementType::SceneBased => 1,
            AudioElementType::Reserved(value) => value,
        }
    }

    /// Interpret a raw 3-bit wire value.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(AudioElementType::ChannelBased),
            1 => Ok(AudioElementType::SceneBased),
            2..=7 => Ok(AudioElementType::Reserved(value)),
            _ => Err(Error::invalid_argument(format!(
                "audio_element_type {value} does not fit in 3 bits"
            ))),
        }
    }
}

/// Channel layers per surround/LFE/height group, used to resolve recon gain
/// channel tuples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelNumbers {
    /// Surround channels.
    pub surround: u8,
    /// Low-frequency effects channels.
    pub lfe: u8,
    /// Height channels.
    pub height: u8,
}

/// The 4-bit `loudspeaker_layout` of a scalable channel layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoudspeakerLayout {
    /// Mono.
    Mono,
    /// Stereo.
    Stereo,
    /// 5.1.
    Surround5_1,
    /// 5.1.2.
    Surround5_1_2,
    /// 5.1.4.
    Surround5_1_4,
    /// 7.1.
    Surround7_1,
    /// 7.1.2.
    Surround7_1_2,
    /// 7.1.4.
    Surround7_1_4,
    /// 3.1.2.
    Surround3_1_2,
    /// Binaural.
    Binaural,
    /// Reserved values 10..=15.
    Reserved(u8),
}

impl LoudspeakerLayout {
    /// The raw 4-bit wire value.
    pub fn to_u8(self) -> u8 {
        match self {
            LoudspeakerLayout::Mono => 0,
            LoudspeakerLayout::Stereo => 1,
            LoudspeakerLayout::Surround5_1 => 2,
            LoudspeakerLayout::Surround5_1_2 => 3,
            LoudspeakerLayout::Surround5_1_4 => 4,
            LoudspeakerLayout::Surround7_1 => 5,
            LoudspeakerLayout::Surround7_1_2 => 6,
            LoudspeakerLayout::Surround7_1_4 => 7,
            LoudspeakerLayout::Surround3_1_2 => 8,
            LoudspeakerLayout::Binaural => 9,
            LoudspeakerLayout::Reserved(value) => value,
        }
    }

    /// Interpret a raw 4-bit wire value.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LoudspeakerLayout::Mono),
            1 => Ok(LoudspeakerLayout::Stereo),
            2 => Ok(LoudspeakerLayout::Surround5_1),
            3 => Ok(LoudspeakerLayout::Surround5_1_2),
            4 => Ok(LoudspeakerLayout::Surround5_1_4),
            5 => Ok(LoudspeakerLayout::Surround7_1),
            6 => Ok(LoudspeakerLayout::Surround7_1_2),
            7 => Ok(LoudspeakerLayout::Surround7_1_4),
            8 => Ok(LoudspeakerLayout::Surround3_1_2),
            9 => Ok(LoudspeakerLayout::Binaural),
            10..=15 => Ok(LoudspeakerLayout::Reserved(value)),
            _ => Err(Error::invalid_argument(format!(
                "loudspeaker_layout {value} does not fit in 4 bits"
            ))),
        }
    }

    /// The channel group sizes of this layout, `None` for reserved values.
    pub fn channel_numbers(self) -> Option<ChannelNumbers> {
        let tuple = match self {
            LoudspeakerLayout::Mono => (1, 0, 0),
            LoudspeakerLayout::Stereo | LoudspeakerLayout::Binaural => (2, 0, 0),
            LoudspeakerLayout::Surround5_1 => (5, 1, 0),
            LoudspeakerLayout::Surround5_1_2 => (5, 1, 2),
            LoudspeakerLayout::Surround5_1_4 => (5, 1, 4),
            LoudspeakerLayout::Surround7_1 => (7, 1, 0),
            LoudspeakerLayout::Surround7_1_2 => (7, 1, 2),
            LoudspeakerLayout::Surround7_1_4 => (7, 1, 4),
            LoudspeakerLayout::Surround3_1_2 => (3, 1, 2),
            LoudspeakerLayout::Reserved(_) => return None,
        };
        Some(ChannelNumbers {
            surround: tuple.0,
            lfe: tuple.1,
            height: tuple.2,
        })
    }
}

/// One layer of a scalable channel layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAudioLayerConfig {
    /// The layout this layer reconstructs.
    pub loudspeaker_layout: LoudspeakerLayout,
    /// Whether the layer carries an output gain.
    pub output_gain_is_present_flag: bool,
    /// Whether recon gain parameter blocks apply to this layer.
    pub recon_gain_is_present_flag: bool,
    /// 2 reserved bits.
    pub reserved_a: u8,
    /// Substreams introduced by this layer.
    pub substream_count: u8,
    /// Coupled substreams among them.
    pub coupled_substream_count: u8,
    /// 6-bit mask of channels the output gain applies to.
    pub output_gain_flags: u8,
    /// 2 reserved bits.
    pub reserved_b: u8,
    /// Output gain in Q7.8 dB, present when the flag is set.
    pub output_gain: i16,
}

impl ChannelAudioLayerConfig {
    fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_unsigned(u64::from(self.loudspeaker_layout.to_u8()), 4)?;
        wb.write_boolean(self.output_gain_is_present_flag)?;
        wb.write_boolean(self.recon_gain_is_present_flag)?;
        wb.write_unsigned(u64::from(self.reserved_a), 2)?;
        wb.write_unsigned(u64::from(self.substream_count), 8)?;
        wb.write_unsigned(u64::from(self.coupled_substream_count), 8)?;
        if self.output_gain_is_present_flag {
            wb.write_unsigned(u64::from(self.output_gain_flags), 6)?;
            wb.write_unsigned(u64::from(self.reserved_b), 2)?;
            wb.write_signed16(self.output_gain)?;
        }
        Ok(())
    }

    fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let loudspeaker_layout = LoudspeakerLayout::from_u8(rb.read_unsigned8(4)?)?;
        let output_gain_is_present_flag = rb.read_boolean()?;
        let recon_gain_is_present_flag = rb.read_boolean()?;
        let reserved_a = rb.read_unsigned8(2)?;
        let substream_count = rb.read_unsigned8(8)?;
        let coupled_substream_count = rb.read_unsigned8(8)?;
        let (output_gain_flags, reserved_b, output_gain) = if output_gain_is_present_flag {
            (
                rb.read_unsigned8(6)?,
                rb.read_unsigned8(2)?,
                rb.read_signed16()?,
            )
        } else {
            (0, 0, 0)
        };
        Ok(Self {
            loudspeaker_layout,
            output_gain_is_present_flag,
            recon_gain_is_present_flag,
            reserved_a,
            substream_count,
            coupled_substream_count,
            output_gain_flags,
            reserved_b,
            output_gain,
        })
    }
}

/// Scalable channel layout config for channel-based elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalableChannelLayoutConfig {
    /// 5 reserved bits after the layer count.
    pub reserved: u8,
    /// The layers, lowest first.
    pub channel_audio_layer_configs: Vec<ChannelAudioLayerConfig>,
}

impl ScalableChannelLayoutConfig {
    /// Number of layers.
    pub fn num_layers(&self) -> usize {
        self.channel_audio_layer_configs.len()
    }

    fn validate(&self) -> Result<()> {
        let num_layers = self.num_layers();
        if num_layers == 0 || num_layers > 6 {
            return Err(Error::invalid_argument(format!(
                "num_layers must be in [1, 6], got {num_layers}"
            )));
        }
        Ok(())
    }

    fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        wb.write_unsigned(self.num_layers() as u64, 3)?;
        wb.write_unsigned(u64::from(self.reserved), 5)?;
        for layer in &self.channel_audio_layer_configs {
            layer.write(wb)?;
        }
        Ok(())
    }

    fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let num_layers = rb.read_unsigned8(3)?;
        let reserved = rb.read_unsigned8(5)?;
        let mut channel_audio_layer_configs = Vec::with_capacity(num_layers as usize);
        for _ in 0..num_layers {
            channel_audio_layer_configs.push(ChannelAudioLayerConfig::read(rb)?);
        }
        let config = Self {
            reserved,
            channel_audio_layer_configs,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Ambisonics config for scene-based elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmbisonicsConfig {
    /// One substream per ambisonics channel, with a mapping table.
    Mono {
        /// Number of ambisonics channels.
        output_channel_count: u8,
        /// Number of substreams.
        substream_count: u8,
        /// ACN channel to substream mapping; 255 marks an inactive channel.
        channel_mapping: Vec<u8>,
    },
    /// Substreams mixed through a demixing matrix.
    Projection {
        /// Number of ambisonics channels.
        output_channel_count: u8,
        /// Number of substreams.
        substream_count: u8,
        /// Coupled substreams among them.
        coupled_substream_count: u8,
        /// Row-major (substream + coupled) x output matrix, Q7.8.
        demixing_matrix: Vec<i16>,
    },
}

impl AmbisonicsConfig {
    const MODE_MONO: DecodedUleb128 = 0;
    const MODE_PROJECTION: DecodedUleb128 = 1;

    fn validate(&self) -> Result<()> {
        match self {
            AmbisonicsConfig::Mono {
                output_channel_count,
                substream_count,
                channel_mapping,
            } => {
                if channel_mapping.len() != *output_channel_count as usize {
                    return Err(Error::invalid_argument(format!(
                        "channel_mapping has {} entries for {output_channel_count} channels",
                        channel_mapping.len()
                    )));
                }
                if substream_count > output_channel_count {
                    return Err(Error::invalid_argument(format!(
                        "substream_count = {substream_count} exceeds \
                         output_channel_count = {output_channel_count}"
                    )));
                }
                Ok(())
            }
            AmbisonicsConfig::Projection {
                output_channel_count,
                substream_count,
                coupled_substream_count,
                demixing_matrix,
            } => {
                let expected = (*substream_count as usize + *coupled_substream_count as usize)
                    * *output_channel_count as usize;
                if demixing_matrix.len() != expected {
                    return Err(Error::invalid_argument(format!(
                        "demixing_matrix has {} entries, expected {expected}",
                        demixing_matrix.len()
                    )));
                }
                Ok(())
            }
        }
    }

    fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        match self {
            AmbisonicsConfig::Mono {
                output_channel_count,
                substream_count,
                channel_mapping,
            } => {
                wb.write_uleb128(Self::MODE_MONO)?;
                wb.write_unsigned(u64::from(*output_channel_count), 8)?;
                wb.write_unsigned(u64::from(*substream_count), 8)?;
                wb.write_bytes(channel_mapping)
            }
            AmbisonicsConfig::Projection {
                output_channel_count,
                substream_count,
                coupled_substream_count,
                demixing_matrix,
            } => {
                wb.write_uleb128(Self::MODE_PROJECTION)?;
                wb.write_unsigned(u64::from(*output_channel_count), 8)?;
                wb.write_unsigned(u64::from(*substream_count), 8)?;
                wb.write_unsigned(u64::from(*coupled_substream_count), 8)?;
                for &coefficient in demixing_matrix {
                    wb.write_signed16(coefficient)?;
                }
                Ok(())
            }
        }
    }

    fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let ambisonics_mode = rb.read_uleb128()?;
        let config = match ambisonics_mode {
            Self::MODE_MONO => {
                let output_channel_count = rb.read_unsigned8(8)?;
                let substream_count = rb.read_unsigned8(8)?;
                let mut channel_mapping = vec![0u8; output_channel_count as usize];
                rb.read_uint8_span(&mut channel_mapping)?;
                AmbisonicsConfig::Mono {
                    output_channel_count,
                    substream_count,
                    channel_mapping,
                }
            }
            Self::MODE_PROJECTION => {
                let output_channel_count = rb.read_unsigned8(8)?;
                let substream_count = rb.read_unsigned8(8)?;
                let coupled_substream_count = rb.read_unsigned8(8)?;
                let entries = (substream_count as usize + coupled_substream_count as usize)
                    * output_channel_count as usize;
                let mut demixing_matrix = Vec::with_capacity(entries);
                for _ in 0..entries {
                    demixing_matrix.push(rb.read_signed16()?);
                }
                AmbisonicsConfig::Projection {
                    output_channel_count,
                    substream_count,
                    coupled_substream_count,
                    demixing_matrix,
                }
            }
            other => {
                return Err(Error::invalid_argument(format!(
                    "Unknown ambisonics_mode {other}"
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }
}

/// The type-specific configuration of an audio element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioElementConfig {
    /// Channel-based.
    Channel(ScalableChannelLayoutConfig),
    /// Scene-based.
    Scene(AmbisonicsConfig),
    /// Reserved element types carry sized opaque bytes.
    Extension(Vec<u8>),
}

/// A parameter definition nested in an audio element.
///
/// Mix gain is forbidden here by construction; reserved types are carried
/// as sized opaque payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioElementParam {
    /// A demixing parameter definition.
    Demixing(DemixingParamDefinition),
    /// A recon gain parameter definition.
    ReconGain(ReconGainParamDefinition),
    /// A reserved parameter definition type.
    Extension {
        /// The reserved wire tag.
        param_definition_type: DecodedUleb128,
        /// The opaque definition bytes.
        param_definition_bytes: Vec<u8>,
    },
}

/// Audio Element OBU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioElementObu {
    /// The OBU header.
    pub header: ObuHeader,
    /// Identifier referenced by mix presentations and audio frames.
    pub audio_element_id: DecodedUleb128,
    /// Element type.
    pub audio_element_type: AudioElementType,
    /// 5 reserved bits.
    pub reserved: u8,
    /// The codec config this element's substreams are coded with.
    pub codec_config_id: DecodedUleb128,
    /// The substreams making up this element.
    pub audio_substream_ids: Vec<DecodedUleb128>,
    /// Nested parameter definitions.
    pub audio_element_params: Vec<AudioElementParam>,
    /// Type-specific configuration.
    pub config: AudioElementConfig,
}

impl AudioElementObu {
    /// Create an audio element OBU. The header's type is forced to
    /// [`ObuType::AudioElement`].
    pub fn new(
        header: ObuHeader,
        audio_element_id: DecodedUleb128,
        audio_element_type: AudioElementType,
        codec_config_id: DecodedUleb128,
        audio_substream_ids: Vec<DecodedUleb128>,
        audio_element_params: Vec<AudioElementParam>,
        config: AudioElementConfig,
    ) -> Self {
        Self {
            header: ObuHeader {
                obu_type: ObuType::AudioElement,
                ..header
            },
            audio_element_id,
            audio_element_type,
            reserved: 0,
            codec_config_id,
            audio_substream_ids,
            audio_element_params,
            config,
        }
    }

    /// The scalable layout, when this element is channel-based.
    pub fn scalable_layout(&self) -> Option<&ScalableChannelLayoutConfig> {
        match &self.config {
            AudioElementConfig::Channel(config) => Some(config),
            _ => None,
        }
    }

    /// Read the payload of an audio element OBU whose header was already
    /// consumed.
    pub fn read_and_validate(header: ObuHeader, rb: &mut ReadBitBuffer) -> Result<Self> {
        let audio_element_id = rb.read_uleb128()?;
        let audio_element_type = AudioElementType::from_u8(rb.read_unsigned8(3)?)?;
        let reserved = rb.read_unsigned8(5)?;
        let codec_config_id = rb.read_uleb128()?;

        let num_substreams = rb.read_uleb128()?;
        let mut audio_substream_ids = Vec::with_capacity(num_substreams as usize);
        for _ in 0..num_substreams {
            audio_substream_ids.push(rb.read_uleb128()?);
        }

        let num_parameters = rb.read_uleb128()?;
        let mut audio_element_params = Vec::with_capacity(num_parameters as usize);
        for _ in 0..num_parameters {
            let param_definition_type = ParamDefinitionType::from_uleb(rb.read_uleb128()?);
            let param = match param_definition_type {
                ParamDefinitionType::Demixing => {
                    AudioElementParam::Demixing(DemixingParamDefinition::read(rb)?)
                }
                ParamDefinitionType::ReconGain => AudioElementParam::ReconGain(
                    ReconGainParamDefinition::read(audio_element_id, rb)?,
                ),
                ParamDefinitionType::MixGain => {
                    return Err(Error::invalid_argument(format!(
                        "Mix gain parameters are not allowed in audio element = {audio_element_id}"
                    )))
                }
                ParamDefinitionType::Reserved(tag) => {
                    let param_definition_size = rb.read_uleb128()?;
                    let mut param_definition_bytes = vec![0u8; param_definition_size as usize];
                    rb.read_uint8_span(&mut param_definition_bytes)?;
                    AudioElementParam::Extension {
                        param_definition_type: tag,
                        param_definition_bytes,
                    }
                }
            };
            audio_element_params.push(param);
        }

        let config = match audio_element_type {
            AudioElementType::ChannelBased => {
                AudioElementConfig::Channel(ScalableChannelLayoutConfig::read(rb)?)
            }
            AudioElementType::SceneBased => AudioElementConfig::Scene(AmbisonicsConfig::read(rb)?),
            AudioElementType::Reserved(_) => {
                let config_size = rb.read_uleb128()?;
                let mut bytes = vec![0u8; config_size as usize];
                rb.read_uint8_span(&mut bytes)?;
                AudioElementConfig::Extension(bytes)
            }
        };

        let obu = Self {
            header,
            audio_element_id,
            audio_element_type,
            reserved,
            codec_config_id,
            audio_substream_ids,
            audio_element_params,
            config,
        };
        obu.validate()?;
        Ok(obu)
    }
}

impl Obu for AudioElementObu {
    fn header(&self) -> &ObuHeader {
        &self.header
    }

    fn validate(&self) -> Result<()> {
        if self.audio_substream_ids.is_empty() {
            return Err(Error::invalid_argument(format!(
                "Audio element {} has no substreams",
                self.audio_element_id
            )));
        }
        match (&self.audio_element_type, &self.config) {
            (AudioElementType::ChannelBased, AudioElementConfig::Channel(_))
            | (AudioElementType::SceneBased, AudioElementConfig::Scene(_))
            | (AudioElementType::Reserved(_), AudioElementConfig::Extension(_)) => Ok(()),
            _ => Err(Error::invalid_argument(format!(
                "Audio element {} config does not match its type",
                self.audio_element_id
            ))),
        }
    }

    fn write_payload(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_uleb128(self.audio_element_id)?;
        wb.write_unsigned(u64::from(self.audio_element_type.to_u8()), 3)?;
        wb.write_unsigned(u64::from(self.reserved), 5)?;
        wb.write_uleb128(self.codec_config_id)?;

        wb.write_uleb128(self.audio_substream_ids.len() as DecodedUleb128)?;
        for &substream_id in &self.audio_substream_ids {
            wb.write_uleb128(substream_id)?;
        }

        wb.write_uleb128(self.audio_element_params.len() as DecodedUleb128)?;
        for param in &self.audio_element_params {
            match param {
                AudioElementParam::Demixing(definition) => {
                    wb.write_uleb128(ParamDefinitionType::Demixing.to_uleb())?;
                    definition.write(wb)?;
                }
                AudioElementParam::ReconGain(definition) => {
                    wb.write_uleb128(ParamDefinitionType::ReconGain.to_uleb())?;
                    definition.write(wb)?;
                }
                AudioElementParam::Extension {
                    param_definition_type,
                    param_definition_bytes,
                } => {
                    wb.write_uleb128(*param_definition_type)?;
                    wb.write_uleb128(param_definition_bytes.len() as DecodedUleb128)?;
                    wb.write_bytes(param_definition_bytes)?;
                }
            }
        }

        match &self.config {
            AudioElementConfig::Channel(config) => config.write(wb),
            AudioElementConfig::Scene(config) => config.write(wb),
            AudioElementConfig::Extension(bytes) => {
                wb.write_uleb128(bytes.len() as DecodedUleb128)?;
                wb.write_bytes(bytes)
            }
        }
    }
}

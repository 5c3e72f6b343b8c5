//! Parameter Block OBU.
//!
//! The wire form of a parameter block is not self-describing: which fields
//! appear depends on the parameter definition declared for its
//! `parameter_id` in the descriptors. Serialization and parsing therefore
//! go through a [`PerIdParameterMetadata`] resolved from the descriptor
//! set.

use iamf_core::{DecodedUleb128, Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::audio_element::ChannelNumbers;
use crate::header::ObuHeader;
use crate::param_definitions::{ParamDefinition, ParamDefinitionType};
use crate::parameter_data::{
    DemixingInfoParameterData, MixGainParameterData, ParameterData, ReconGainInfoParameterData,
};
use crate::types::ObuType;

/// The per-`parameter_id` view the engine resolves from the descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerIdParameterMetadata {
    /// Which subtype of parameter this id carries.
    pub param_definition_type: ParamDefinitionType,
    /// A copy of the base definition.
    pub param_definition: ParamDefinition,
    /// Recon gain only: layer count of the referenced audio element.
    pub num_layers: u8,
    /// Recon gain only: per-layer presence flags.
    pub recon_gain_is_present_flags: Vec<bool>,
    /// Recon gain only: channel tuples per layer.
    pub channel_numbers_for_layers: Vec<ChannelNumbers>,
}

impl PerIdParameterMetadata {
    /// Metadata for a non-recon-gain definition.
    pub fn new(
        param_definition_type: ParamDefinitionType,
        param_definition: ParamDefinition,
    ) -> Self {
        Self {
            param_definition_type,
            param_definition,
            num_layers: 0,
            recon_gain_is_present_flags: Vec::new(),
            channel_numbers_for_layers: Vec::new(),
        }
    }
}

/// One subblock of a parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSubblock {
    /// Duration in parameter-rate ticks. On the wire only when the
    /// definition has mode 1 and no constant subblock duration.
    pub subblock_duration: DecodedUleb128,
    /// The typed payload.
    pub param_data: ParameterData,
}

/// Parameter Block OBU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBlockObu {
    /// The OBU header.
    pub header: ObuHeader,
    /// The parameter id declared by a descriptor.
    pub parameter_id: DecodedUleb128,
    /// Copied from the definition: whether this block carries its own
    /// schedule on the wire.
    param_definition_mode: bool,
    /// Total duration, meaningful when `param_definition_mode` is set.
    pub duration: DecodedUleb128,
    /// Constant subblock duration, meaningful when `param_definition_mode`
    /// is set.
    pub constant_subblock_duration: DecodedUleb128,
    /// The subblocks.
    pub subblocks: Vec<ParameterSubblock>,
}

impl ParameterBlockObu {
    /// Create a parameter block for `parameter_id` under `metadata`. The
    /// header's type is forced to [`ObuType::ParameterBlock`].
    ///
    /// With `param_definition_mode == 0` the schedule is inherited from the
    /// definition; otherwise `duration` and `constant_subblock_duration`
    /// describe the block's own schedule.
    pub fn new(
        header: ObuHeader,
        parameter_id: DecodedUleb128,
        metadata: &PerIdParameterMetadata,
        duration: DecodedUleb128,
        constant_subblock_duration: DecodedUleb128,
        subblocks: Vec<ParameterSubblock>,
    ) -> Self {
        Self {
            header: ObuHeader {
                obu_type: ObuType::ParameterBlock,
                ..header
            },
            parameter_id,
            param_definition_mode: metadata.param_definition.param_definition_mode,
            duration,
            constant_subblock_duration,
            subblocks,
        }
    }

    /// Whether this block carries its own schedule on the wire.
    pub fn param_definition_mode(&self) -> bool {
        self.param_definition_mode
    }

    fn validate_subblock_types(&self, metadata: &PerIdParameterMetadata) -> Result<()> {
        for subblock in &self.subblocks {
            let matches = matches!(
                (&subblock.param_data, metadata.param_definition_type),
                (ParameterData::MixGain(_), ParamDefinitionType::MixGain)
                    | (ParameterData::Demixing(_), ParamDefinitionType::Demixing)
                    | (ParameterData::ReconGain(_), ParamDefinitionType::ReconGain)
            );
            if !matches {
                return Err(Error::invalid_argument(format!(
                    "Subblock payload does not match {:?} for parameter_id = {}",
                    metadata.param_definition_type, self.parameter_id
                )));
            }
        }
        Ok(())
    }

    /// Validate against the metadata and serialize the complete OBU.
    pub fn validate_and_write(
        &self,
        metadata: &PerIdParameterMetadata,
        wb: &mut WriteBitBuffer,
    ) -> Result<()> {
        if self.subblocks.is_empty() {
            return Err(Error::invalid_argument(format!(
                "Parameter block for parameter_id = {} has no subblocks",
                self.parameter_id
            )));
        }
        self.validate_subblock_types(metadata)?;

        self.header.write_with_payload(wb, |nested| {
            nested.write_uleb128(self.parameter_id)?;
            let constant_subblock_duration = if self.param_definition_mode {
                nested.write_uleb128(self.duration)?;
                nested.write_uleb128(self.constant_subblock_duration)?;
                if self.constant_subblock_duration == 0 {
                    nested.write_uleb128(self.subblocks.len() as DecodedUleb128)?;
                }
                self.constant_subblock_duration
            } else {
                metadata.param_definition.constant_subblock_duration
            };
            for subblock in &self.subblocks {
                if self.param_definition_mode && constant_subblock_duration == 0 {
                    nested.write_uleb128(subblock.subblock_duration)?;
                }
                subblock.param_data.write(nested)?;
            }
            Ok(())
        })
    }

    /// Read the payload of a parameter block OBU whose header was already
    /// consumed, resolving the schedule through `metadata`.
    pub fn read_and_validate(
        header: ObuHeader,
        metadata: &PerIdParameterMetadata,
        parameter_id: DecodedUleb128,
        rb: &mut ReadBitBuffer,
    ) -> Result<Self> {
        let mode = metadata.param_definition.param_definition_mode;
        let (duration, constant_subblock_duration, num_subblocks) = if mode {
            let duration = rb.read_uleb128()?;
            let constant_subblock_duration = rb.read_uleb128()?;
            let num_subblocks = if constant_subblock_duration == 0 {
                rb.read_uleb128()? as usize
            } else {
                (u64::from(duration).div_ceil(u64::from(constant_subblock_duration))) as usize
            };
            (duration, constant_subblock_duration, num_subblocks)
        } else {
            (0, 0, metadata.param_definition.num_subblocks())
        };

        let mut subblocks = Vec::with_capacity(num_subblocks);
        for i in 0..num_subblocks {
            let subblock_duration = if mode {
                if constant_subblock_duration == 0 {
                    rb.read_uleb128()?
                } else {
                    constant_subblock_duration
                }
            } else {
                metadata.param_definition.subblock_duration(i)?
            };
            let param_data = match metadata.param_definition_type {
                ParamDefinitionType::MixGain => {
                    ParameterData::MixGain(MixGainParameterData::read(rb)?)
                }
                ParamDefinitionType::Demixing => {
                    ParameterData::Demixing(DemixingInfoParameterData::read(rb)?)
                }
                ParamDefinitionType::ReconGain => {
                    ParameterData::ReconGain(ReconGainInfoParameterData::read(
                        &metadata.recon_gain_is_present_flags,
                        rb,
                    )?)
                }
                ParamDefinitionType::Reserved(tag) => {
                    return Err(Error::invalid_argument(format!(
                        "Cannot parse parameter blocks for reserved definition type {tag}"
                    )))
                }
            };
            subblocks.push(ParameterSubblock {
                subblock_duration,
                param_data,
            });
        }

        Ok(Self {
            header,
            parameter_id,
            param_definition_mode: mode,
            duration,
            constant_subblock_duration,
            subblocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_data::DMixPMode;

    fn demixing_metadata(parameter_id: DecodedUleb128) -> PerIdParameterMetadata {
        PerIdParameterMetadata::new(
            ParamDefinitionType::Demixing,
            ParamDefinition::new_constant(parameter_id, 48_000, 8, 8),
        )
    }

    fn demixing_block(parameter_id: DecodedUleb128) -> ParameterBlockObu {
        let metadata = demixing_metadata(parameter_id);
        ParameterBlockObu::new(
            ObuHeader::default(),
            parameter_id,
            &metadata,
            0,
            0,
            vec![ParameterSubblock {
                subblock_duration: 8,
                param_data: ParameterData::Demixing(DemixingInfoParameterData {
                    dmixp_mode: DMixPMode::Mode1,
                    reserved: 0,
                }),
            }],
        )
    }

    #[test]
    fn test_mode_zero_wire_format() {
        let metadata = demixing_metadata(9);
        let obu = demixing_block(9);
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&metadata, &mut wb).unwrap();
        // Header, obu_size = 2: parameter_id then one demixing byte.
        assert_eq!(wb.into_data(), vec![3 << 3, 2, 9, 0x00]);
    }

    #[test]
    fn test_mode_zero_round_trip() {
        let metadata = demixing_metadata(9);
        let obu = demixing_block(9);
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&metadata, &mut wb).unwrap();

        let mut rb = ReadBitBuffer::new(1024, wb.into_data());
        let (header, _) = ObuHeader::read_and_validate(&mut rb).unwrap();
        let parameter_id = rb.read_uleb128().unwrap();
        let parsed =
            ParameterBlockObu::read_and_validate(header, &metadata, parameter_id, &mut rb)
                .unwrap();
        assert_eq!(parsed, obu);
    }

    #[test]
    fn test_mode_one_carries_schedule() {
        let metadata = PerIdParameterMetadata::new(
            ParamDefinitionType::MixGain,
            ParamDefinition {
                parameter_id: 100,
                parameter_rate: 48_000,
                param_definition_mode: true,
                reserved: 0,
                duration: 0,
                constant_subblock_duration: 0,
                subblock_durations: Vec::new(),
            },
        );
        let obu = ParameterBlockObu::new(
            ObuHeader::default(),
            100,
            &metadata,
            16,
            0,
            vec![
                ParameterSubblock {
                    subblock_duration: 8,
                    param_data: ParameterData::MixGain(MixGainParameterData::Step {
                        start_point_value: 0,
                    }),
                },
                ParameterSubblock {
                    subblock_duration: 8,
                    param_data: ParameterData::MixGain(MixGainParameterData::Linear {
                        start_point_value: 0,
                        end_point_value: -256,
                    }),
                },
            ],
        );
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&metadata, &mut wb).unwrap();

        let mut rb = ReadBitBuffer::new(1024, wb.into_data());
        let (header, _) = ObuHeader::read_and_validate(&mut rb).unwrap();
        let parameter_id = rb.read_uleb128().unwrap();
        let parsed =
            ParameterBlockObu::read_and_validate(header, &metadata, parameter_id, &mut rb)
                .unwrap();
        assert_eq!(parsed, obu);
    }

    #[test]
    fn test_payload_type_mismatch_rejected() {
        let metadata = demixing_metadata(9);
        let mut obu = demixing_block(9);
        obu.subblocks[0].param_data = ParameterData::MixGain(MixGainParameterData::Step {
            start_point_value: 0,
        });
        let mut wb = WriteBitBuffer::default();
        assert!(obu.validate_and_write(&metadata, &mut wb).is_err());
    }

    #[test]
    fn test_empty_subblocks_rejected() {
        let metadata = demixing_metadata(9);
        let mut obu = demixing_block(9);
        obu.subblocks.clear();
        let mut wb = WriteBitBuffer::default();
        assert!(obu.validate_and_write(&metadata, &mut wb).is_err());
    }
}

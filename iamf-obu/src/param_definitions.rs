//! Parameter definitions embedded in descriptor OBUs.
//!
//! A `ParamDefinition` declares the time base and subblock schedule for a
//! `parameter_id`. Subtypes add a default payload: demixing and recon gain
//! definitions live in Audio Elements, mix gain definitions in Mix
//! Presentations. Every reference to the same `parameter_id` must be
//! equivalent; the engine enforces this with plain equality.

use iamf_core::{DecodedUleb128, Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::parameter_data::{DMixPMode, DemixingInfoParameterData};

/// Wire tags for `param_definition_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamDefinitionType {
    /// Mix gain; only legal inside Mix Presentations.
    MixGain,
    /// Demixing info; only legal inside Audio Elements.
    Demixing,
    /// Recon gain; only legal inside Audio Elements.
    ReconGain,
    /// A reserved type carried as an opaque extension.
    Reserved(DecodedUleb128),
}

impl ParamDefinitionType {
    /// The raw ULEB128 tag.
    pub fn to_uleb(self) -> DecodedUleb128 {
        match self {
            ParamDefinitionType::MixGain => 0,
            ParamDefinitionType::Demixing => 1,
            ParamDefinitionType::ReconGain => 2,
            ParamDefinitionType::Reserved(tag) => tag,
        }
    }

    /// Interpret a raw ULEB128 tag.
    pub fn from_uleb(tag: DecodedUleb128) -> Self {
        match tag {
            0 => ParamDefinitionType::MixGain,
            1 => ParamDefinitionType::Demixing,
            2 => ParamDefinitionType::ReconGain,
            other => ParamDefinitionType::Reserved(other),
        }
    }
}

/// The base fields shared by every parameter definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDefinition {
    /// The id parameter blocks use to reference this definition.
    pub parameter_id: DecodedUleb128,
    /// Ticks per second of the parameter time base.
    pub parameter_rate: DecodedUleb128,
    /// When set, parameter blocks carry their own subblock schedule.
    pub param_definition_mode: bool,
    /// 7 reserved bits.
    pub reserved: u8,
    /// Total duration covered by one parameter block, in parameter-rate
    /// ticks. Only on the wire when `param_definition_mode` is clear.
    pub duration: DecodedUleb128,
    /// Duration shared by every subblock; `0` selects the explicit list.
    pub constant_subblock_duration: DecodedUleb128,
    /// Explicit per-subblock durations, used when
    /// `constant_subblock_duration == 0`.
    pub subblock_durations: Vec<DecodedUleb128>,
}

impl ParamDefinition {
    /// Create a definition with an implicit (constant) subblock schedule.
    pub fn new_constant(
        parameter_id: DecodedUleb128,
        parameter_rate: DecodedUleb128,
        duration: DecodedUleb128,
        constant_subblock_duration: DecodedUleb128,
    ) -> Self {
        Self {
            parameter_id,
            parameter_rate,
            param_definition_mode: false,
            reserved: 0,
            duration,
            constant_subblock_duration,
            subblock_durations: Vec::new(),
        }
    }

    /// Number of subblocks in one parameter block under this definition.
    pub fn num_subblocks(&self) -> usize {
        if self.constant_subblock_duration != 0 {
            let csd = self.constant_subblock_duration as u64;
            (u64::from(self.duration).div_ceil(csd)) as usize
        } else {
            self.subblock_durations.len()
        }
    }

    /// Duration of the `i`-th subblock.
    pub fn subblock_duration(&self, i: usize) -> Result<DecodedUleb128> {
        if self.constant_subblock_duration != 0 {
            return Ok(self.constant_subblock_duration);
        }
        self.subblock_durations.get(i).copied().ok_or_else(|| {
            Error::invalid_argument(format!(
                "Subblock index {i} out of range for {} subblocks",
                self.subblock_durations.len()
            ))
        })
    }

    /// Validate the schedule invariants.
    pub fn validate(&self) -> Result<()> {
        if self.parameter_rate == 0 {
            return Err(Error::invalid_argument(format!(
                "parameter_rate must be non-zero for parameter_id = {}",
                self.parameter_id
            )));
        }
        if !self.param_definition_mode && self.constant_subblock_duration == 0 {
            if self.subblock_durations.is_empty() {
                return Err(Error::invalid_argument(format!(
                    "Explicit subblock schedule is empty for parameter_id = {}",
                    self.parameter_id
                )));
            }
            if self.subblock_durations.iter().any(|&d| d == 0) {
                return Err(Error::invalid_argument(format!(
                    "Zero-length subblock for parameter_id = {}",
                    self.parameter_id
                )));
            }
            let total: u64 = self.subblock_durations.iter().map(|&d| u64::from(d)).sum();
            if total != u64::from(self.duration) {
                return Err(Error::invalid_argument(format!(
                    "Subblock durations sum to {total} but duration = {} for parameter_id = {}",
                    self.duration, self.parameter_id
                )));
            }
        }
        Ok(())
    }

    /// Serialize the base fields.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        wb.write_uleb128(self.parameter_id)?;
        wb.write_uleb128(self.parameter_rate)?;
        wb.write_boolean(self.param_definition_mode)?;
        wb.write_unsigned(u64::from(self.reserved), 7)?;
        if !self.param_definition_mode {
            wb.write_uleb128(self.duration)?;
            wb.write_uleb128(self.constant_subblock_duration)?;
            if self.constant_subblock_duration == 0 {
                wb.write_uleb128(self.subblock_durations.len() as DecodedUleb128)?;
                for &subblock_duration in &self.subblock_durations {
                    wb.write_uleb128(subblock_duration)?;
                }
            }
        }
        Ok(())
    }

    /// Parse the base fields.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let parameter_id = rb.read_uleb128()?;
        let parameter_rate = rb.read_uleb128()?;
        let param_definition_mode = rb.read_boolean()?;
        let reserved = rb.read_unsigned8(7)?;
        let mut duration = 0;
        let mut constant_subblock_duration = 0;
        let mut subblock_durations = Vec::new();
        if !param_definition_mode {
            duration = rb.read_uleb128()?;
            constant_subblock_duration = rb.read_uleb128()?;
            if constant_subblock_duration == 0 {
                let num_subblocks = rb.read_uleb128()?;
                subblock_durations.reserve(num_subblocks as usize);
                for _ in 0..num_subblocks {
                    subblock_durations.push(rb.read_uleb128()?);
                }
            }
        }
        let definition = Self {
            parameter_id,
            parameter_rate,
            param_definition_mode,
            reserved,
            duration,
            constant_subblock_duration,
            subblock_durations,
        };
        definition.validate()?;
        Ok(definition)
    }
}

/// A mix gain parameter definition, carried by Mix Presentations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixGainParamDefinition {
    /// The base definition.
    pub base: ParamDefinition,
    /// Gain in Q7.8 dB applied when no parameter block supplies one.
    pub default_mix_gain: i16,
}

impl MixGainParamDefinition {
    /// Serialize the definition with its default gain.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.base.write(wb)?;
        wb.write_signed16(self.default_mix_gain)
    }

    /// Parse the definition with its default gain.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let base = ParamDefinition::read(rb)?;
        let default_mix_gain = rb.read_signed16()?;
        Ok(Self {
            base,
            default_mix_gain,
        })
    }
}

/// A demixing parameter definition, carried by Audio Elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemixingParamDefinition {
    /// The base definition.
    pub base: ParamDefinition,
    /// Demixing info applied when no parameter block supplies one.
    pub default_demixing_info: DemixingInfoParameterData,
    /// Default weighting factor index, 4 bits.
    pub default_w: u8,
    /// 4 reserved bits.
    pub reserved_for_future_use: u8,
}

impl DemixingParamDefinition {
    /// A definition with default demixing mode 1 and zero weighting.
    pub fn with_mode(base: ParamDefinition, dmixp_mode: DMixPMode) -> Self {
        Self {
            base,
            default_demixing_info: DemixingInfoParameterData {
                dmixp_mode,
                reserved: 0,
            },
            default_w: 0,
            reserved_for_future_use: 0,
        }
    }

    /// Serialize the definition with its default demixing payload.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.base.write(wb)?;
        self.default_demixing_info.write(wb)?;
        wb.write_unsigned(u64::from(self.default_w), 4)?;
        wb.write_unsigned(u64::from(self.reserved_for_future_use), 4)
    }

    /// Parse the definition with its default demixing payload.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let base = ParamDefinition::read(rb)?;
        let default_demixing_info = DemixingInfoParameterData::read(rb)?;
        let default_w = rb.read_unsigned8(4)?;
        let reserved_for_future_use = rb.read_unsigned8(4)?;
        Ok(Self {
            base,
            default_demixing_info,
            default_w,
            reserved_for_future_use,
        })
    }
}

/// A recon gain parameter definition, carried by Audio Elements.
///
/// The audio element id is contextual rather than on the wire: it names the
/// element whose scalable layout the recon gains apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconGainParamDefinition {
    /// The base definition.
    pub base: ParamDefinition,
    /// The referenced audio element.
    pub audio_element_id: DecodedUleb128,
}

impl ReconGainParamDefinition {
    /// Serialize the definition.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.base.write(wb)
    }

    /// Parse the definition in the context of `audio_element_id`.
    pub fn read(audio_element_id: DecodedUleb128, rb: &mut ReadBitBuffer) -> Result<Self> {
        let base = ParamDefinition::read(rb)?;
        Ok(Self {
            base,
            audio_element_id,
        })
    }
}

/// A parameter definition together with its subtype payload, as collected
/// from descriptor OBUs for the equivalence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamDefinitionVariant {
    /// Mix gain.
    MixGain(MixGainParamDefinition),
    /// Demixing.
    Demixing(DemixingParamDefinition),
    /// Recon gain.
    ReconGain(ReconGainParamDefinition),
}

impl ParamDefinitionVariant {
    /// The base definition.
    pub fn base(&self) -> &ParamDefinition {
        match self {
            ParamDefinitionVariant::MixGain(definition) => &definition.base,
            ParamDefinitionVariant::Demixing(definition) => &definition.base,
            ParamDefinitionVariant::ReconGain(definition) => &definition.base,
        }
    }

    /// The wire tag of this subtype.
    pub fn param_definition_type(&self) -> ParamDefinitionType {
        match self {
            ParamDefinitionVariant::MixGain(_) => ParamDefinitionType::MixGain,
            ParamDefinitionVariant::Demixing(_) => ParamDefinitionType::Demixing,
            ParamDefinitionVariant::ReconGain(_) => ParamDefinitionType::ReconGain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_definition() -> ParamDefinition {
        ParamDefinition::new_constant(998, 48_000, 8, 8)
    }

    #[test]
    fn test_constant_schedule_num_subblocks() {
        let definition = ParamDefinition::new_constant(1, 48_000, 24, 8);
        assert_eq!(definition.num_subblocks(), 3);
        assert_eq!(definition.subblock_duration(2).unwrap(), 8);
    }

    #[test]
    fn test_explicit_schedule() {
        let mut definition = ParamDefinition::new_constant(1, 48_000, 24, 0);
        definition.subblock_durations = vec![8, 16];
        assert_eq!(definition.num_subblocks(), 2);
        assert_eq!(definition.subblock_duration(1).unwrap(), 16);
        assert!(definition.subblock_duration(2).is_err());
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn test_explicit_schedule_must_sum_to_duration() {
        let mut definition = ParamDefinition::new_constant(1, 48_000, 24, 0);
        definition.subblock_durations = vec![8, 8];
        assert!(definition.validate().is_err());
    }

    #[test]
    fn test_zero_parameter_rate_rejected() {
        let definition = ParamDefinition::new_constant(1, 0, 8, 8);
        assert!(definition.validate().is_err());
    }

    #[test]
    fn test_base_wire_format() {
        let mut wb = WriteBitBuffer::default();
        base_definition().write(&mut wb).unwrap();
        assert_eq!(
            wb.into_data(),
            vec![
                // parameter_id.
                0x80 | 0x66,
                0x07,
                // parameter_rate = 48000.
                0x80 | 0x00,
                0x80 | 0x77,
                0x02,
                // mode + reserved.
                0x00,
                // duration, constant_subblock_duration.
                8,
                8
            ]
        );
    }

    #[test]
    fn test_mode_one_omits_schedule() {
        let definition = ParamDefinition {
            parameter_id: 100,
            parameter_rate: 16_000,
            param_definition_mode: true,
            reserved: 0,
            duration: 0,
            constant_subblock_duration: 0,
            subblock_durations: Vec::new(),
        };
        let mut wb = WriteBitBuffer::default();
        definition.write(&mut wb).unwrap();
        // id, rate (2 bytes), mode bit set + reserved. No schedule fields.
        assert_eq!(wb.into_data(), vec![100, 0x80, 0x7d, 0x80]);
    }

    #[test]
    fn test_round_trip_explicit_schedule() {
        let mut definition = ParamDefinition::new_constant(9, 44_100, 24, 0);
        definition.subblock_durations = vec![8, 8, 8];
        let mut wb = WriteBitBuffer::default();
        definition.write(&mut wb).unwrap();
        let mut rb = ReadBitBuffer::new(1024, wb.into_data());
        assert_eq!(ParamDefinition::read(&mut rb).unwrap(), definition);
    }

    #[test]
    fn test_mix_gain_round_trip() {
        let definition = MixGainParamDefinition {
            base: base_definition(),
            default_mix_gain: -256,
        };
        let mut wb = WriteBitBuffer::default();
        definition.write(&mut wb).unwrap();
        let mut rb = ReadBitBuffer::new(1024, wb.into_data());
        assert_eq!(MixGainParamDefinition::read(&mut rb).unwrap(), definition);
    }

    #[test]
    fn test_demixing_round_trip() {
        let definition = DemixingParamDefinition::with_mode(base_definition(), DMixPMode::Mode2);
        let mut wb = WriteBitBuffer::default();
        definition.write(&mut wb).unwrap();
        let mut rb = ReadBitBuffer::new(1024, wb.into_data());
        assert_eq!(DemixingParamDefinition::read(&mut rb).unwrap(), definition);
    }

    #[test]
    fn test_variant_equivalence_is_structural() {
        let lhs = ParamDefinitionVariant::Demixing(DemixingParamDefinition::with_mode(
            base_definition(),
            DMixPMode::Mode1,
        ));
        let rhs = ParamDefinitionVariant::Demixing(DemixingParamDefinition::with_mode(
            base_definition(),
            DMixPMode::Mode1,
        ));
        assert_eq!(lhs, rhs);

        let different = ParamDefinitionVariant::Demixing(DemixingParamDefinition::with_mode(
            base_definition(),
            DMixPMode::Mode3,
        ));
        assert_ne!(lhs, different);
    }
}

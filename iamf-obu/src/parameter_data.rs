//! Typed subblock payloads carried by Parameter Block OBUs.

use iamf_core::{DecodedUleb128, Error, ReadBitBuffer, Result, WriteBitBuffer};

/// Demixing mode selector, 3 bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DMixPMode {
    /// Mode 1.
    Mode1,
    /// Mode 2.
    Mode2,
    /// Mode 3.
    Mode3,
    /// Reserved value 3.
    ReservedA,
    /// Mode 1, frame-adaptive.
    Mode1N,
    /// Mode 2, frame-adaptive.
    Mode2N,
    /// Mode 3, frame-adaptive.
    Mode3N,
    /// Reserved value 7.
    ReservedB,
}

impl DMixPMode {
    /// The raw 3-bit wire value.
    pub fn to_u8(self) -> u8 {
        match self {
            DMixPMode::Mode1 => 0,
            DMixPMode::Mode2 => 1,
            DMixPMode::Mode3 => 2,
            DMixPMode::ReservedA => 3,
            DMixPMode::Mode1N => 4,
            DMixPMode::Mode2N => 5,
            DMixPMode::Mode3N => 6,
            DMixPMode::ReservedB => 7,
        }
    }

    /// Interpret a raw 3-bit wire value.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DMixPMode::Mode1),
            1 => Ok(DMixPMode::Mode2),
            2 => Ok(DMixPMode::Mode3),
            3 => Ok(DMixPMode::ReservedA),
            4 => Ok(DMixPMode::Mode1N),
            5 => Ok(DMixPMode::Mode2N),
            6 => Ok(DMixPMode::Mode3N),
            7 => Ok(DMixPMode::ReservedB),
            _ => Err(Error::invalid_argument(format!(
                "dmixp_mode {value} does not fit in 3 bits"
            ))),
        }
    }
}

/// Mix gain animation over one subblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixGainParameterData {
    /// A constant gain.
    Step {
        /// Gain in Q7.8 dB.
        start_point_value: i16,
    },
    /// Linear interpolation from start to end.
    Linear {
        /// Gain at the start of the subblock.
        start_point_value: i16,
        /// Gain at the end of the subblock.
        end_point_value: i16,
    },
    /// Quadratic Bezier interpolation.
    Bezier {
        /// Gain at the start of the subblock.
        start_point_value: i16,
        /// Gain at the end of the subblock.
        end_point_value: i16,
        /// Gain at the control point.
        control_point_value: i16,
        /// Control point time as a fraction of the subblock, Q0.8.
        control_point_relative_time: u8,
    },
}

impl MixGainParameterData {
    const ANIMATE_STEP: DecodedUleb128 = 0;
    const ANIMATE_LINEAR: DecodedUleb128 = 1;
    const ANIMATE_BEZIER: DecodedUleb128 = 2;

    /// Serialize the animation tag and its values.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        match *self {
            MixGainParameterData::Step { start_point_value } => {
                wb.write_uleb128(Self::ANIMATE_STEP)?;
                wb.write_signed16(start_point_value)
            }
            MixGainParameterData::Linear {
                start_point_value,
                end_point_value,
            } => {
                wb.write_uleb128(Self::ANIMATE_LINEAR)?;
                wb.write_signed16(start_point_value)?;
                wb.write_signed16(end_point_value)
            }
            MixGainParameterData::Bezier {
                start_point_value,
                end_point_value,
                control_point_value,
                control_point_relative_time,
            } => {
                wb.write_uleb128(Self::ANIMATE_BEZIER)?;
                wb.write_signed16(start_point_value)?;
                wb.write_signed16(end_point_value)?;
                wb.write_signed16(control_point_value)?;
                wb.write_unsigned(u64::from(control_point_relative_time), 8)
            }
        }
    }

    /// Parse the animation tag and its values.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let animation_type = rb.read_uleb128()?;
        match animation_type {
            Self::ANIMATE_STEP => Ok(MixGainParameterData::Step {
                start_point_value: rb.read_signed16()?,
            }),
            Self::ANIMATE_LINEAR => Ok(MixGainParameterData::Linear {
                start_point_value: rb.read_signed16()?,
                end_point_value: rb.read_signed16()?,
            }),
            Self::ANIMATE_BEZIER => Ok(MixGainParameterData::Bezier {
                start_point_value: rb.read_signed16()?,
                end_point_value: rb.read_signed16()?,
                control_point_value: rb.read_signed16()?,
                control_point_relative_time: rb.read_unsigned8(8)?,
            }),
            other => Err(Error::invalid_argument(format!(
                "Unknown mix gain animation type {other}"
            ))),
        }
    }
}

/// Demixing info for one subblock: `dmixp_mode` plus reserved bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemixingInfoParameterData {
    /// The demixing mode.
    pub dmixp_mode: DMixPMode,
    /// 5 reserved bits.
    pub reserved: u8,
}

impl DemixingInfoParameterData {
    /// Serialize the demixing info.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_unsigned(u64::from(self.dmixp_mode.to_u8()), 3)?;
        wb.write_unsigned(u64::from(self.reserved), 5)
    }

    /// Parse the demixing info.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Self> {
        let dmixp_mode = DMixPMode::from_u8(rb.read_unsigned8(3)?)?;
        let reserved = rb.read_unsigned8(5)?;
        Ok(Self {
            dmixp_mode,
            reserved,
        })
    }
}

/// Recon gains for one scalable layer: a bitmask of channels followed by a
/// gain byte per set bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconGainElement {
    /// ULEB128 bitmask selecting which channels carry a gain.
    pub recon_gain_flag: DecodedUleb128,
    /// One gain byte per set bit, in ascending bit order.
    pub recon_gain: Vec<u8>,
}

impl ReconGainElement {
    fn validate(&self) -> Result<()> {
        let set_bits = self.recon_gain_flag.count_ones() as usize;
        if set_bits != self.recon_gain.len() {
            return Err(Error::invalid_argument(format!(
                "recon_gain_flag has {set_bits} set bits but {} gains are present",
                self.recon_gain.len()
            )));
        }
        Ok(())
    }
}

/// Recon gain payload for one subblock, with one entry per layer of the
/// referenced audio element. Layers whose `recon_gain_is_present` flag is
/// clear contribute nothing to the wire and hold `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconGainInfoParameterData {
    /// Per-layer elements, aligned with the element's layer list.
    pub recon_gain_elements: Vec<Option<ReconGainElement>>,
}

impl ReconGainInfoParameterData {
    /// Serialize the per-layer elements.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        for element in self.recon_gain_elements.iter().flatten() {
            element.validate()?;
            wb.write_uleb128(element.recon_gain_flag)?;
            wb.write_bytes(&element.recon_gain)?;
        }
        Ok(())
    }

    /// Parse the payload given the per-layer presence flags of the
    /// referenced audio element.
    pub fn read(recon_gain_is_present_flags: &[bool], rb: &mut ReadBitBuffer) -> Result<Self> {
        let mut recon_gain_elements = Vec::with_capacity(recon_gain_is_present_flags.len());
        for &present in recon_gain_is_present_flags {
            if !present {
                recon_gain_elements.push(None);
                continue;
            }
            let recon_gain_flag = rb.read_uleb128()?;
            let mut recon_gain = vec![0u8; recon_gain_flag.count_ones() as usize];
            rb.read_uint8_span(&mut recon_gain)?;
            recon_gain_elements.push(Some(ReconGainElement {
                recon_gain_flag,
                recon_gain,
            }));
        }
        Ok(Self {
            recon_gain_elements,
        })
    }
}

/// The typed payload of one parameter subblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterData {
    /// Mix gain animation.
    MixGain(MixGainParameterData),
    /// Demixing info.
    Demixing(DemixingInfoParameterData),
    /// Recon gain per layer.
    ReconGain(ReconGainInfoParameterData),
}

impl ParameterData {
    /// Serialize the payload.
    pub fn write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        match self {
            ParameterData::MixGain(data) => data.write(wb),
            ParameterData::Demixing(data) => data.write(wb),
            ParameterData::ReconGain(data) => data.write(wb),
        }
    }
}

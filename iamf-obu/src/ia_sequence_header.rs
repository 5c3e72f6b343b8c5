//! IA Sequence Header OBU.

use iamf_core::{Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::header::{Obu, ObuHeader};
use crate::types::{ObuType, ProfileVersion};

/// The OBU that opens every IA sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaSequenceHeaderObu {
    /// The OBU header.
    pub header: ObuHeader,
    /// The four-byte magic; must decode to `iamf`.
    pub ia_code: u32,
    /// The profile this sequence conforms to.
    pub primary_profile: ProfileVersion,
    /// A second profile the sequence also conforms to.
    pub additional_profile: ProfileVersion,
}

impl IaSequenceHeaderObu {
    /// The required `ia_code` magic, spelling `iamf`.
    pub const IA_CODE: u32 = u32::from_be_bytes(*b"iamf");

    /// Create a sequence header OBU. The header's type is forced to
    /// [`ObuType::IaSequenceHeader`].
    pub fn new(
        header: ObuHeader,
        ia_code: u32,
        primary_profile: ProfileVersion,
        additional_profile: ProfileVersion,
    ) -> Self {
        Self {
            header: ObuHeader {
                obu_type: ObuType::IaSequenceHeader,
                ..header
            },
            ia_code,
            primary_profile,
            additional_profile,
        }
    }

    /// Read the payload of a sequence header OBU whose header was already
    /// consumed.
    pub fn read_and_validate(header: ObuHeader, rb: &mut ReadBitBuffer) -> Result<Self> {
        let ia_code = rb.read_unsigned32(32)?;
        let primary_profile = ProfileVersion::from_u8(rb.read_unsigned8(8)?);
        let additional_profile = ProfileVersion::from_u8(rb.read_unsigned8(8)?);
        let obu = Self {
            header,
            ia_code,
            primary_profile,
            additional_profile,
        };
        obu.validate()?;
        Ok(obu)
    }
}

impl Obu for IaSequenceHeaderObu {
    fn header(&self) -> &ObuHeader {
        &self.header
    }

    fn validate(&self) -> Result<()> {
        if self.ia_code != Self::IA_CODE {
            return Err(Error::invalid_argument(format!(
                "ia_code must be 0x{:08x}, got 0x{:08x}",
                Self::IA_CODE,
                self.ia_code
            )));
        }
        if matches!(self.primary_profile, ProfileVersion::Unknown(_)) {
            return Err(Error::invalid_argument(format!(
                "Unsupported primary_profile: {}",
                self.primary_profile.to_u8()
            )));
        }
        Ok(())
    }

    fn write_payload(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_unsigned(u64::from(self.ia_code), 32)?;
        wb.write_unsigned(u64::from(self.primary_profile.to_u8()), 8)?;
        wb.write_unsigned(u64::from(self.additional_profile.to_u8()), 8)
    }
}

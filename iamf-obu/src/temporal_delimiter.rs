//! Temporal Delimiter OBU.

use iamf_core::{Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::header::{Obu, ObuHeader};
use crate::types::ObuType;

/// An empty OBU marking the start of a temporal unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalDelimiterObu {
    /// The OBU header.
    pub header: ObuHeader,
}

impl TemporalDelimiterObu {
    /// Create a temporal delimiter. The header's type is forced to
    /// [`ObuType::TemporalDelimiter`].
    pub fn new(header: ObuHeader) -> Self {
        Self {
            header: ObuHeader {
                obu_type: ObuType::TemporalDelimiter,
                ..header
            },
        }
    }

    /// Read a temporal delimiter whose header was already consumed.
    pub fn read_and_validate(
        header: ObuHeader,
        payload_size: usize,
        _rb: &mut ReadBitBuffer,
    ) -> Result<Self> {
        if payload_size != 0 {
            return Err(Error::invalid_argument(format!(
                "Temporal delimiter payload must be empty, got {payload_size} bytes"
            )));
        }
        let obu = Self { header };
        obu.validate()?;
        Ok(obu)
    }
}

impl Obu for TemporalDelimiterObu {
    fn header(&self) -> &ObuHeader {
        &self.header
    }

    fn validate(&self) -> Result<()> {
        if self.header.obu_extension_flag {
            return Err(Error::invalid_argument(
                "Temporal delimiters do not carry extension headers".to_string(),
            ));
        }
        Ok(())
    }

    fn write_payload(&self, _wb: &mut WriteBitBuffer) -> Result<()> {
        Ok(())
    }
}

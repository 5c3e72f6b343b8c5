//! OBU header serialization and the common OBU capability trait.

use iamf_core::{DecodedUleb128, Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::types::ObuType;

/// The header shared by every OBU.
///
/// `obu_size` is not stored: it is derived at write time from the serialized
/// payload and re-derived at read time. The trim counters and extension
/// fields are written after the size field and count toward it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObuHeader {
    /// The 5-bit type code.
    pub obu_type: ObuType,
    /// Marks a redundant copy of a descriptor OBU.
    pub obu_redundant_copy: bool,
    /// Signals the presence of the trim counters.
    pub obu_trimming_status_flag: bool,
    /// Signals the presence of the extension header.
    pub obu_extension_flag: bool,
    /// Samples to discard at the end of the decoded frame. On the wire this
    /// precedes `num_samples_to_trim_at_start`.
    pub num_samples_to_trim_at_end: DecodedUleb128,
    /// Samples to discard at the start of the decoded frame.
    pub num_samples_to_trim_at_start: DecodedUleb128,
    /// Declared size of the extension header payload.
    pub extension_header_size: DecodedUleb128,
    /// Opaque extension header payload.
    pub extension_header_bytes: Vec<u8>,
}

impl Default for ObuHeader {
    fn default() -> Self {
        Self {
            obu_type: ObuType::Reserved(24),
            obu_redundant_copy: false,
            obu_trimming_status_flag: false,
            obu_extension_flag: false,
            num_samples_to_trim_at_end: 0,
            num_samples_to_trim_at_start: 0,
            extension_header_size: 0,
            extension_header_bytes: Vec::new(),
        }
    }
}

impl ObuHeader {
    /// A header of the given type with every flag clear.
    pub fn new(obu_type: ObuType) -> Self {
        Self {
            obu_type,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.obu_trimming_status_flag && !self.obu_type.is_audio_frame() {
            return Err(Error::invalid_argument(format!(
                "obu_trimming_status_flag is illegal on {:?}",
                self.obu_type
            )));
        }
        if self.obu_extension_flag
            && self.extension_header_size as usize != self.extension_header_bytes.len()
        {
            return Err(Error::invalid_argument(format!(
                "extension_header_size = {} disagrees with {} extension bytes",
                self.extension_header_size,
                self.extension_header_bytes.len()
            )));
        }
        Ok(())
    }

    /// Write the flag byte, then the size-prefixed remainder: trim counters
    /// and extension fields (when signalled) followed by `payload`.
    pub fn write_with_payload<F>(&self, wb: &mut WriteBitBuffer, payload: F) -> Result<()>
    where
        F: FnOnce(&mut WriteBitBuffer) -> Result<()>,
    {
        self.validate()?;
        wb.write_unsigned(u64::from(self.obu_type.to_code()), 5)?;
        wb.write_boolean(self.obu_redundant_copy)?;
        wb.write_boolean(self.obu_trimming_status_flag)?;
        wb.write_boolean(self.obu_extension_flag)?;
        wb.write_nested(|nested| {
            if self.obu_trimming_status_flag {
                nested.write_uleb128(self.num_samples_to_trim_at_end)?;
                nested.write_uleb128(self.num_samples_to_trim_at_start)?;
            }
            if self.obu_extension_flag {
                nested.write_uleb128(self.extension_header_size)?;
                nested.write_bytes(&self.extension_header_bytes)?;
            }
            payload(nested)
        })
    }

    /// Read a header from the buffer.
    ///
    /// Returns the header together with the number of payload bytes left
    /// after the trim and extension fields, derived from `obu_size`.
    pub fn read_and_validate(rb: &mut ReadBitBuffer) -> Result<(Self, usize)> {
        let obu_type = ObuType::from_code(rb.read_unsigned8(5)?)?;
        let obu_redundant_copy = rb.read_boolean()?;
        let obu_trimming_status_flag = rb.read_boolean()?;
        let obu_extension_flag = rb.read_boolean()?;
        let obu_size = rb.read_uleb128()? as usize;

        let mut consumed = 0usize;
        let mut num_samples_to_trim_at_end = 0;
        let mut num_samples_to_trim_at_start = 0;
        if obu_trimming_status_flag {
            let (trim_end, trim_end_size) = rb.read_uleb128_with_size()?;
            let (trim_start, trim_start_size) = rb.read_uleb128_with_size()?;
            num_samples_to_trim_at_end = trim_end;
            num_samples_to_trim_at_start = trim_start;
            consumed += trim_end_size + trim_start_size;
        }

        let mut extension_header_size = 0;
        let mut extension_header_bytes = Vec::new();
        if obu_extension_flag {
            let (ext_size, ext_size_len) = rb.read_uleb128_with_size()?;
            extension_header_size = ext_size;
            extension_header_bytes = vec![0u8; ext_size as usize];
            rb.read_uint8_span(&mut extension_header_bytes)?;
            consumed += ext_size_len + ext_size as usize;
        }

        let payload_size = obu_size.checked_sub(consumed).ok_or_else(|| {
            Error::invalid_argument(format!(
                "obu_size = {obu_size} is smaller than its {consumed} header field bytes"
            ))
        })?;

        let header = Self {
            obu_type,
            obu_redundant_copy,
            obu_trimming_status_flag,
            obu_extension_flag,
            num_samples_to_trim_at_end,
            num_samples_to_trim_at_start,
            extension_header_size,
            extension_header_bytes,
        };
        header.validate()?;
        Ok((header, payload_size))
    }
}

/// The capability set shared by every OBU variant.
pub trait Obu {
    /// The header carried by this OBU.
    fn header(&self) -> &ObuHeader;

    /// Validate the OBU's payload invariants.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Serialize the payload that follows the header fields.
    fn write_payload(&self, wb: &mut WriteBitBuffer) -> Result<()>;

    /// Validate, then serialize the complete OBU: flag byte, exact
    /// `obu_size`, trim/extension fields, payload.
    fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        self.header().write_with_payload(wb, |nested| self.write_payload(nested))
    }
}

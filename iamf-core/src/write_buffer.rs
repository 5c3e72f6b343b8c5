//! Bit-level write buffer.
//!
//! All OBU serialization funnels through [`WriteBitBuffer`]. Writes are
//! MSB-first within each byte, with a fast path when both the cursor and the
//! requested width are byte-aligned. The buffer carries the stream's
//! [`LebGenerator`] so every ULEB128 field in an IA sequence is emitted
//! under one policy.

use std::io::Write;

use crate::error::{Error, Result};
use crate::leb::LebGenerator;
use crate::{DecodedUleb128, MAX_STRING_SIZE};

/// A growable bit-level write buffer.
#[derive(Debug, Clone)]
pub struct WriteBitBuffer {
    data: Vec<u8>,
    /// Bit position within the trailing partial byte; 0 means byte-aligned.
    bit_pos: u8,
    leb_generator: LebGenerator,
}

impl WriteBitBuffer {
    /// Create a new write buffer with the given ULEB128 policy.
    pub fn new(leb_generator: LebGenerator) -> Self {
        Self {
            data: Vec::new(),
            bit_pos: 0,
            leb_generator,
        }
    }

    /// Create a new write buffer with a byte capacity hint.
    pub fn with_capacity(bytes: usize, leb_generator: LebGenerator) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            bit_pos: 0,
            leb_generator,
        }
    }

    /// The ULEB128 policy carried by this buffer.
    pub fn leb_generator(&self) -> LebGenerator {
        self.leb_generator
    }

    /// Check if the cursor is on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// Number of whole and partial bytes written so far.
    pub fn len_bytes(&self) -> usize {
        self.data.len()
    }

    /// Get the written data. Meaningful once the buffer is byte-aligned.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the written data, consuming the buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Write a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        if self.bit_pos == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.data.len() - 1;
            self.data[idx] |= 1 << (7 - self.bit_pos);
        }
        self.bit_pos = (self.bit_pos + 1) % 8;
    }

    /// Write the lower `num_bits` of `value`, MSB first.
    ///
    /// `num_bits` must be in 1..=64 and `value` must be representable in
    /// `num_bits` bits; otherwise the write fails with `OutOfRange`.
    pub fn write_unsigned(&mut self, value: u64, num_bits: u32) -> Result<()> {
        if num_bits == 0 || num_bits > 64 {
            return Err(Error::out_of_range(format!(
                "num_bits must be in [1, 64], got {num_bits}"
            )));
        }
        if num_bits < 64 && value >= (1u64 << num_bits) {
            return Err(Error::out_of_range(format!(
                "Value {value} does not fit in {num_bits} bits"
            )));
        }

        if self.bit_pos == 0 && num_bits % 8 == 0 {
            // Aligned fast path: copy whole bytes.
            let num_bytes = (num_bits / 8) as usize;
            for i in (0..num_bytes).rev() {
                self.data.push(((value >> (8 * i)) & 0xff) as u8);
            }
            return Ok(());
        }

        for i in (0..num_bits).rev() {
            self.write_bit((value >> i) & 1 != 0);
        }
        Ok(())
    }

    /// Write a boolean as a single bit.
    pub fn write_boolean(&mut self, value: bool) -> Result<()> {
        self.write_unsigned(u64::from(value), 1)
    }

    /// Write a 16-bit signed value as raw two's complement.
    pub fn write_signed16(&mut self, value: i16) -> Result<()> {
        self.write_unsigned(u64::from(value as u16), 16)
    }

    /// Write a ULEB128 field under the buffer's generation policy.
    pub fn write_uleb128(&mut self, value: DecodedUleb128) -> Result<()> {
        let encoded = self.leb_generator.encode(value)?;
        self.write_bytes(&encoded)
    }

    /// Write an ISO 14496-1 expandable size field: big-endian-accumulated
    /// 7-bit groups, minimal form.
    pub fn write_iso14496_1_expanded(&mut self, value: u32) -> Result<()> {
        let mut groups = 1;
        while (value >> (7 * groups)) != 0 {
            groups += 1;
        }
        for i in (0..groups).rev() {
            let mut byte = ((value >> (7 * i)) & 0x7f) as u8;
            if i != 0 {
                byte |= 0x80;
            }
            self.write_unsigned(u64::from(byte), 8)?;
        }
        Ok(())
    }

    /// Write a null-terminated string of at most [`MAX_STRING_SIZE`] bytes
    /// including the terminator.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        if value.len() + 1 > MAX_STRING_SIZE {
            return Err(Error::invalid_argument(format!(
                "String with terminator exceeds {MAX_STRING_SIZE} bytes"
            )));
        }
        if value.as_bytes().contains(&0) {
            return Err(Error::invalid_argument(
                "String must not contain an interior NUL".to_string(),
            ));
        }
        self.write_bytes(value.as_bytes())?;
        self.write_unsigned(0, 8)
    }

    /// Write a span of bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.bit_pos == 0 {
            self.data.extend_from_slice(bytes);
            return Ok(());
        }
        for &byte in bytes {
            self.write_unsigned(u64::from(byte), 8)?;
        }
        Ok(())
    }

    /// Serialize a payload into a nested scratch buffer, then splice it into
    /// this buffer prefixed with its ULEB128 byte length.
    ///
    /// This is the mechanism by which every OBU obtains an exact size
    /// prefix without a second formatting pass: the header's flag byte is
    /// written to the parent, everything covered by `obu_size` is written
    /// inside the nested scope, and the length is patched in on exit.
    pub fn write_nested<F>(&mut self, serialize_payload: F) -> Result<()>
    where
        F: FnOnce(&mut WriteBitBuffer) -> Result<()>,
    {
        let mut nested = WriteBitBuffer::new(self.leb_generator);
        serialize_payload(&mut nested)?;
        if !nested.is_byte_aligned() {
            return Err(Error::invalid_argument(
                "Nested payload must end byte-aligned".to_string(),
            ));
        }
        let size = DecodedUleb128::try_from(nested.data.len()).map_err(|_| {
            Error::invalid_argument("Nested payload exceeds the ULEB128 range".to_string())
        })?;
        self.write_uleb128(size)?;
        self.write_bytes(&nested.data)
    }

    /// Flush the accumulated bytes to `sink` and clear the buffer.
    ///
    /// Fails with `InvalidArgument` when the cursor is not byte-aligned.
    pub fn flush_to<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        if !self.is_byte_aligned() {
            return Err(Error::invalid_argument(
                "Cannot flush a buffer that is not byte-aligned".to_string(),
            ));
        }
        sink.write_all(&self.data)?;
        self.data.clear();
        Ok(())
    }
}

impl Default for WriteBitBuffer {
    fn default() -> Self {
        Self::new(LebGenerator::Minimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits_msb_first() {
        let mut wb = WriteBitBuffer::default();
        wb.write_unsigned(0b1011, 4).unwrap();
        wb.write_unsigned(0b0100, 4).unwrap();
        assert_eq!(wb.data(), &[0b1011_0100]);
    }

    #[test]
    fn test_aligned_fast_path_matches_bitwise() {
        let mut aligned = WriteBitBuffer::default();
        aligned.write_unsigned(0xdead_beef, 32).unwrap();

        let mut bitwise = WriteBitBuffer::default();
        bitwise.write_unsigned(0b1101, 4).unwrap();
        bitwise.write_unsigned(0xdead_beef, 32).unwrap();
        bitwise.write_unsigned(0b1110, 4).unwrap();

        assert_eq!(aligned.data(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(bitwise.data(), &[0xdd, 0xea, 0xdb, 0xee, 0xfe]);
    }

    #[test]
    fn test_value_too_wide_is_rejected() {
        let mut wb = WriteBitBuffer::default();
        assert!(wb.write_unsigned(4, 2).is_err());
        assert!(wb.write_unsigned(0, 0).is_err());
        assert!(wb.write_unsigned(0, 65).is_err());
    }

    #[test]
    fn test_write_signed16() {
        let mut wb = WriteBitBuffer::default();
        wb.write_signed16(-1).unwrap();
        wb.write_signed16(257).unwrap();
        assert_eq!(wb.data(), &[0xff, 0xff, 0x01, 0x01]);
    }

    #[test]
    fn test_write_uleb128_respects_generator() {
        let mut wb = WriteBitBuffer::new(LebGenerator::fixed_size(2).unwrap());
        wb.write_uleb128(13).unwrap();
        assert_eq!(wb.data(), &[0x80 | 13, 0x00]);
    }

    #[test]
    fn test_write_iso14496_1_expanded() {
        let mut wb = WriteBitBuffer::default();
        wb.write_iso14496_1_expanded(0).unwrap();
        wb.write_iso14496_1_expanded(128).unwrap();
        assert_eq!(wb.data(), &[0x00, 0x81, 0x00]);
    }

    #[test]
    fn test_write_string() {
        let mut wb = WriteBitBuffer::default();
        wb.write_string("en-us").unwrap();
        assert_eq!(wb.data(), b"en-us\0");
    }

    #[test]
    fn test_write_string_too_long() {
        let mut wb = WriteBitBuffer::default();
        let long = "a".repeat(MAX_STRING_SIZE);
        assert!(wb.write_string(&long).is_err());
    }

    #[test]
    fn test_write_nested_prefixes_length() {
        let mut wb = WriteBitBuffer::default();
        wb.write_unsigned(0xaa, 8).unwrap();
        wb.write_nested(|payload| {
            payload.write_unsigned(0x1234, 16)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(wb.data(), &[0xaa, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_write_nested_fixed_size_leb() {
        let mut wb = WriteBitBuffer::new(LebGenerator::fixed_size(2).unwrap());
        wb.write_nested(|payload| payload.write_bytes(&[1, 2, 3]))
            .unwrap();
        assert_eq!(wb.data(), &[0x80 | 3, 0x00, 1, 2, 3]);
    }

    #[test]
    fn test_write_nested_requires_alignment() {
        let mut wb = WriteBitBuffer::default();
        let result = wb.write_nested(|payload| payload.write_boolean(true));
        assert!(result.is_err());
    }

    #[test]
    fn test_flush_to_clears_buffer() {
        let mut wb = WriteBitBuffer::default();
        wb.write_bytes(&[1, 2, 3]).unwrap();
        let mut sink = Vec::new();
        wb.flush_to(&mut sink).unwrap();
        assert_eq!(sink, vec![1, 2, 3]);
        assert!(wb.data().is_empty());
    }
}

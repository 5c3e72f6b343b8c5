//! Bit-level read buffer.
//!
//! [`ReadBitBuffer`] consumes bits strictly left-to-right, MSB first within
//! each source byte. An internal bit buffer of fixed capacity is topped up
//! from the source on demand; `load_bits` discards previously read bits
//! before loading more.

use crate::error::{Error, Result};
use crate::{DecodedUleb128, MAX_LEB128_SIZE, MAX_STRING_SIZE};

/// A bit-level read buffer over a byte source.
#[derive(Debug, Clone)]
pub struct ReadBitBuffer {
    source: Vec<u8>,
    /// Bit position of the next unloaded bit in `source`.
    source_bit_offset: usize,
    bit_buffer: Vec<u8>,
    /// Capacity of `bit_buffer` in bytes.
    capacity: usize,
    /// Bit position of the next unread bit in `bit_buffer`.
    buffer_bit_offset: usize,
    /// Number of valid bits in `bit_buffer`.
    buffer_size_bits: usize,
}

fn upper_bit(bit_offset: usize, data: &[u8]) -> u8 {
    (data[bit_offset / 8] >> (7 - (bit_offset % 8))) & 0x01
}

impl ReadBitBuffer {
    /// Create a read buffer with an internal capacity of `capacity` bytes
    /// over `source`.
    pub fn new(capacity: usize, source: Vec<u8>) -> Self {
        Self {
            source,
            source_bit_offset: 0,
            bit_buffer: Vec::with_capacity(capacity),
            capacity,
            buffer_bit_offset: 0,
            buffer_size_bits: 0,
        }
    }

    /// True if unread bits remain in the internal buffer or the source.
    pub fn is_data_available(&self) -> bool {
        let in_buffer = self.buffer_bit_offset < self.buffer_size_bits;
        let in_source = self.source_bit_offset / 8 < self.source.len();
        in_buffer || in_source
    }

    /// Ensure at least `required_num_bits` are loaded, discarding previously
    /// read bits. With `fill_to_capacity`, tops the buffer up to its full
    /// capacity but only as far as the source allows.
    ///
    /// Fails with `ResourceExhausted` (restoring the source position) when
    /// the source cannot satisfy the required minimum.
    pub fn load_bits(&mut self, required_num_bits: usize, fill_to_capacity: bool) -> Result<()> {
        self.discard_all_bits();
        let bit_capacity = self.capacity * 8;
        let num_bits_to_load = if fill_to_capacity {
            if required_num_bits > bit_capacity {
                return Err(Error::invalid_argument(format!(
                    "Requested {required_num_bits} bits exceeds buffer capacity of {bit_capacity}"
                )));
            }
            bit_capacity
        } else {
            required_num_bits
        };

        let original_source_offset = self.source_bit_offset;
        let mut bits_loaded = 0usize;
        while self.source_bit_offset / 8 < self.source.len() && bits_loaded < num_bits_to_load {
            if (num_bits_to_load - bits_loaded) % 8 != 0
                || self.source_bit_offset % 8 != 0
                || self.buffer_size_bits % 8 != 0
            {
                // Load bit by bit.
                let bit = upper_bit(self.source_bit_offset, &self.source);
                if self.buffer_size_bits % 8 == 0 {
                    self.bit_buffer.push(0);
                }
                if bit != 0 {
                    let idx = self.buffer_size_bits / 8;
                    self.bit_buffer[idx] |= 1 << (7 - (self.buffer_size_bits % 8));
                }
                self.source_bit_offset += 1;
                self.buffer_size_bits += 1;
                bits_loaded += 1;
            } else {
                // Load byte by byte.
                self.bit_buffer.push(self.source[self.source_bit_offset / 8]);
                self.source_bit_offset += 8;
                self.buffer_size_bits += 8;
                bits_loaded += 8;
            }
        }

        if bits_loaded < required_num_bits {
            self.source_bit_offset = original_source_offset;
            self.discard_all_bits();
            return Err(Error::resource_exhausted(
                "Not enough bits in source".to_string(),
            ));
        }
        Ok(())
    }

    fn discard_all_bits(&mut self) {
        self.buffer_bit_offset = 0;
        self.buffer_size_bits = 0;
        self.bit_buffer.clear();
    }

    /// Read bits out of the internal buffer into the low bits of `output`.
    fn drain_buffer(&mut self, remaining: &mut u32, output: &mut u64) {
        if self.buffer_bit_offset % 8 == 0
            && *remaining % 8 == 0
            && self.buffer_size_bits % 8 == 0
        {
            // Byte-aligned fast path.
            while self.buffer_bit_offset < self.buffer_size_bits && *remaining > 0 {
                *output = (*output << 8) | u64::from(self.bit_buffer[self.buffer_bit_offset / 8]);
                self.buffer_bit_offset += 8;
                *remaining -= 8;
            }
        } else {
            while self.buffer_bit_offset < self.buffer_size_bits && *remaining > 0 {
                let bit = upper_bit(self.buffer_bit_offset, &self.bit_buffer);
                *output |= u64::from(bit) << (*remaining - 1);
                self.buffer_bit_offset += 1;
                *remaining -= 1;
            }
        }
    }

    fn read_unsigned_internal(&mut self, num_bits: u32, max_num_bits: u32) -> Result<u64> {
        if num_bits > max_num_bits {
            return Err(Error::out_of_range(format!(
                "Cannot read {num_bits} bits into a {max_num_bits}-bit output"
            )));
        }
        let mut output = 0u64;
        let mut remaining = num_bits;
        self.drain_buffer(&mut remaining, &mut output);
        if remaining != 0 {
            self.load_bits(remaining as usize, false)?;
            self.drain_buffer(&mut remaining, &mut output);
        }
        debug_assert_eq!(remaining, 0);
        Ok(output)
    }

    /// Read up to 64 bits as an unsigned integer.
    pub fn read_unsigned64(&mut self, num_bits: u32) -> Result<u64> {
        self.read_unsigned_internal(num_bits, 64)
    }

    /// Read up to 32 bits as an unsigned integer.
    pub fn read_unsigned32(&mut self, num_bits: u32) -> Result<u32> {
        Ok(self.read_unsigned_internal(num_bits, 32)? as u32)
    }

    /// Read up to 16 bits as an unsigned integer.
    pub fn read_unsigned16(&mut self, num_bits: u32) -> Result<u16> {
        Ok(self.read_unsigned_internal(num_bits, 16)? as u16)
    }

    /// Read up to 8 bits as an unsigned integer.
    pub fn read_unsigned8(&mut self, num_bits: u32) -> Result<u8> {
        Ok(self.read_unsigned_internal(num_bits, 8)? as u8)
    }

    /// Read a 16-bit signed value stored as raw two's complement.
    pub fn read_signed16(&mut self) -> Result<i16> {
        Ok(self.read_unsigned16(16)? as i16)
    }

    /// Read a single bit as a boolean.
    pub fn read_boolean(&mut self) -> Result<bool> {
        Ok(self.read_unsigned8(1)? != 0)
    }

    /// Read a ULEB128 field.
    pub fn read_uleb128(&mut self) -> Result<DecodedUleb128> {
        self.read_uleb128_with_size().map(|(value, _)| value)
    }

    /// Read a ULEB128 field, also reporting its encoded size in bytes.
    pub fn read_uleb128_with_size(&mut self) -> Result<(DecodedUleb128, usize)> {
        let mut accumulated: u64 = 0;
        for i in 0..MAX_LEB128_SIZE {
            let byte = self.read_unsigned8(8)?;
            accumulated |= u64::from(byte & 0x7f) << (7 * i);
            if accumulated > u64::from(u32::MAX) {
                return Err(Error::invalid_argument(format!(
                    "ULEB128 overflow - decoded value exceeds {}",
                    u32::MAX
                )));
            }
            let is_terminal_block = byte & 0x80 == 0;
            if is_terminal_block {
                return Ok((accumulated as DecodedUleb128, i + 1));
            }
        }
        Err(Error::invalid_argument(format!(
            "Read the max allowable {MAX_LEB128_SIZE} bytes for a ULEB128, \
             but the bitstream says to keep reading"
        )))
    }

    /// Read an ISO 14496-1 expandable size field with a caller-supplied
    /// payload-class ceiling.
    pub fn read_iso14496_1_expanded(&mut self, max_class_size: u32) -> Result<u32> {
        let mut accumulated: u64 = 0;
        for _ in 0..MAX_LEB128_SIZE {
            let byte = self.read_unsigned8(8)?;
            accumulated = (accumulated << 7) | u64::from(byte & 0x7f);
            if accumulated > u64::from(max_class_size) {
                return Err(Error::invalid_argument(format!(
                    "Expandable size exceeds class maximum of {max_class_size}"
                )));
            }
            if byte & 0x80 == 0 {
                return Ok(accumulated as u32);
            }
        }
        Err(Error::invalid_argument(
            "Expandable size field too long".to_string(),
        ))
    }

    /// Read a null-terminated string of at most [`MAX_STRING_SIZE`] bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let mut output = String::new();
        for _ in 0..MAX_STRING_SIZE {
            let byte = self.read_unsigned8(8)?;
            if byte == 0 {
                return Ok(output);
            }
            output.push(byte as char);
        }
        Err(Error::invalid_argument(format!(
            "Missing null terminator within {MAX_STRING_SIZE} bytes"
        )))
    }

    /// Fill `output` with bytes from the stream.
    pub fn read_uint8_span(&mut self, output: &mut [u8]) -> Result<()> {
        for byte in output.iter_mut() {
            *byte = self.read_unsigned8(8)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_msb_first() {
        let mut rb = ReadBitBuffer::new(64, vec![0b1011_0100, 0b1100_1010]);
        assert_eq!(rb.read_unsigned8(4).unwrap(), 0b1011);
        assert_eq!(rb.read_unsigned8(4).unwrap(), 0b0100);
        assert_eq!(rb.read_unsigned8(8).unwrap(), 0b1100_1010);
    }

    #[test]
    fn test_read_across_load_boundary() {
        let mut rb = ReadBitBuffer::new(1, vec![0xab, 0xcd, 0xef]);
        assert_eq!(rb.read_unsigned32(24).unwrap(), 0x00ab_cdef);
    }

    #[test]
    fn test_width_enforcement() {
        let mut rb = ReadBitBuffer::new(64, vec![0; 8]);
        assert!(rb.read_unsigned8(9).is_err());
        assert!(rb.read_unsigned16(17).is_err());
        assert!(rb.read_unsigned32(33).is_err());
        assert!(rb.read_unsigned64(65).is_err());
    }

    #[test]
    fn test_source_underflow() {
        let mut rb = ReadBitBuffer::new(64, vec![0xff]);
        assert!(matches!(
            rb.read_unsigned16(16),
            Err(Error::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_read_uleb128() {
        let mut rb = ReadBitBuffer::new(64, vec![0x80, 0x01]);
        assert_eq!(rb.read_uleb128_with_size().unwrap(), (128, 2));
    }

    #[test]
    fn test_read_uleb128_accepts_non_minimal_form() {
        let mut rb = ReadBitBuffer::new(64, vec![0x80 | 13, 0x00]);
        assert_eq!(rb.read_uleb128().unwrap(), 13);
    }

    #[test]
    fn test_read_uleb128_rejects_unterminated_max_length() {
        let source = vec![0x80; MAX_LEB128_SIZE];
        let mut rb = ReadBitBuffer::new(64, source);
        assert!(matches!(
            rb.read_uleb128(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_read_uleb128_rejects_overflow() {
        // Decodes past u32::MAX on the fifth byte.
        let mut rb = ReadBitBuffer::new(64, vec![0xff, 0xff, 0xff, 0xff, 0x1f]);
        assert!(matches!(
            rb.read_uleb128(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_read_iso14496_1_expanded() {
        let mut rb = ReadBitBuffer::new(64, vec![0x81, 0x00]);
        assert_eq!(rb.read_iso14496_1_expanded(u32::MAX).unwrap(), 128);
    }

    #[test]
    fn test_read_iso14496_1_expanded_respects_ceiling() {
        let mut rb = ReadBitBuffer::new(64, vec![0x81, 0x00]);
        assert!(rb.read_iso14496_1_expanded(100).is_err());
    }

    #[test]
    fn test_read_string() {
        let mut rb = ReadBitBuffer::new(64, b"en-us\0trailing".to_vec());
        assert_eq!(rb.read_string().unwrap(), "en-us");
    }

    #[test]
    fn test_read_string_missing_terminator() {
        let mut rb = ReadBitBuffer::new(256, vec![b'a'; MAX_STRING_SIZE + 1]);
        assert!(rb.read_string().is_err());
    }

    #[test]
    fn test_read_signed16() {
        let mut rb = ReadBitBuffer::new(64, vec![0xff, 0xff, 0x01, 0x01]);
        assert_eq!(rb.read_signed16().unwrap(), -1);
        assert_eq!(rb.read_signed16().unwrap(), 257);
    }

    #[test]
    fn test_is_data_available() {
        let mut rb = ReadBitBuffer::new(64, vec![0xf0]);
        assert!(rb.is_data_available());
        rb.read_unsigned8(8).unwrap();
        assert!(!rb.is_data_available());
    }

    #[test]
    fn test_fill_to_capacity_partial_fill() {
        // Source holds fewer bits than capacity but more than the minimum;
        // the load fills only what is available.
        let mut rb = ReadBitBuffer::new(16, vec![0x01, 0x02]);
        rb.load_bits(8, true).unwrap();
        assert_eq!(rb.read_unsigned8(8).unwrap(), 0x01);
        assert_eq!(rb.read_unsigned8(8).unwrap(), 0x02);
    }

    #[test]
    fn test_reads_through_a_partially_filled_final_byte() {
        // Consume 4 bits so the source is unaligned, then top up; the
        // buffer ends in a partial byte that must drain bitwise.
        let mut rb = ReadBitBuffer::new(16, vec![0xab, 0xcd]);
        assert_eq!(rb.read_unsigned8(4).unwrap(), 0xa);
        rb.load_bits(8, true).unwrap();
        assert_eq!(rb.read_unsigned8(8).unwrap(), 0xbc);
        assert_eq!(rb.read_unsigned8(4).unwrap(), 0xd);
        assert!(!rb.is_data_available());
    }

    #[test]
    fn test_fill_to_capacity_rejects_oversized_request() {
        let mut rb = ReadBitBuffer::new(1, vec![0x01, 0x02]);
        assert!(rb.load_bits(16, true).is_err());
    }

    #[test]
    fn test_load_bits_restores_source_on_underflow() {
        let mut rb = ReadBitBuffer::new(64, vec![0xab]);
        assert!(rb.load_bits(16, false).is_err());
        // The single available byte is still readable.
        assert_eq!(rb.read_unsigned8(8).unwrap(), 0xab);
    }
}

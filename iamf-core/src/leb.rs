//! ULEB128 generation policies.
//!
//! IAMF permits a ULEB128 field to be encoded with trailing padding bytes as
//! long as it decodes to the same value. Writers choose between the minimal
//! form and a fixed-width form; the choice affects every size and trim field
//! in the stream, so it is carried by the write buffer rather than passed
//! per call.

use crate::error::{Error, Result};
use crate::{DecodedUleb128, MAX_LEB128_SIZE};

/// Policy for emitting ULEB128 fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LebGenerator {
    /// Emit the fewest bytes that represent the value.
    Minimal,
    /// Emit exactly `n` bytes, padding with continuation bytes.
    FixedSize(u8),
}

impl Default for LebGenerator {
    fn default() -> Self {
        LebGenerator::Minimal
    }
}

impl LebGenerator {
    /// Create a fixed-size generator emitting `num_bytes` per field.
    pub fn fixed_size(num_bytes: u8) -> Result<Self> {
        if num_bytes == 0 || num_bytes as usize > MAX_LEB128_SIZE {
            return Err(Error::invalid_argument(format!(
                "Fixed ULEB128 size must be in [1, {MAX_LEB128_SIZE}], got {num_bytes}"
            )));
        }
        Ok(LebGenerator::FixedSize(num_bytes))
    }

    /// Encode `value` under this policy.
    pub fn encode(&self, value: DecodedUleb128) -> Result<Vec<u8>> {
        match *self {
            LebGenerator::Minimal => Ok(encode_minimal(value)),
            LebGenerator::FixedSize(n) => {
                let n = n as usize;
                if minimal_size(value) > n {
                    return Err(Error::invalid_argument(format!(
                        "Value {value} does not fit in a fixed {n}-byte ULEB128"
                    )));
                }
                let mut out = Vec::with_capacity(n);
                for i in 0..n {
                    let mut byte = ((value as u64 >> (7 * i)) & 0x7f) as u8;
                    if i + 1 < n {
                        byte |= 0x80;
                    }
                    out.push(byte);
                }
                Ok(out)
            }
        }
    }

    /// Number of bytes `encode` would emit for `value`.
    pub fn encoded_size(&self, value: DecodedUleb128) -> Result<usize> {
        match *self {
            LebGenerator::Minimal => Ok(minimal_size(value)),
            LebGenerator::FixedSize(n) => {
                if minimal_size(value) > n as usize {
                    return Err(Error::invalid_argument(format!(
                        "Value {value} does not fit in a fixed {n}-byte ULEB128"
                    )));
                }
                Ok(n as usize)
            }
        }
    }
}

/// Size of the minimal encoding of `value`.
fn minimal_size(value: DecodedUleb128) -> usize {
    let mut size = 1;
    let mut rest = value >> 7;
    while rest != 0 {
        size += 1;
        rest >>= 7;
    }
    size
}

fn encode_minimal(value: DecodedUleb128) -> Vec<u8> {
    let mut out = Vec::with_capacity(minimal_size(value));
    let mut rest = value;
    loop {
        let mut byte = (rest & 0x7f) as u8;
        rest >>= 7;
        if rest != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if rest == 0 {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_single_byte() {
        assert_eq!(LebGenerator::Minimal.encode(0).unwrap(), vec![0x00]);
        assert_eq!(LebGenerator::Minimal.encode(127).unwrap(), vec![0x7f]);
    }

    #[test]
    fn test_minimal_multi_byte() {
        assert_eq!(LebGenerator::Minimal.encode(128).unwrap(), vec![0x80, 0x01]);
        assert_eq!(
            LebGenerator::Minimal.encode(u32::MAX).unwrap(),
            vec![0xff, 0xff, 0xff, 0xff, 0x0f]
        );
    }

    #[test]
    fn test_fixed_size_pads_with_continuation_bytes() {
        let leb = LebGenerator::fixed_size(2).unwrap();
        assert_eq!(leb.encode(13).unwrap(), vec![0x80 | 13, 0x00]);
        assert_eq!(leb.encoded_size(13).unwrap(), 2);
    }

    #[test]
    fn test_fixed_size_rejects_overflow() {
        let leb = LebGenerator::fixed_size(1).unwrap();
        assert!(leb.encode(128).is_err());
    }

    #[test]
    fn test_fixed_size_bounds() {
        assert!(LebGenerator::fixed_size(0).is_err());
        assert!(LebGenerator::fixed_size(9).is_err());
        assert!(LebGenerator::fixed_size(8).is_ok());
    }
}

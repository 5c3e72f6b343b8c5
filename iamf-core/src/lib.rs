//! # IAMF Core
//!
//! Core types and utilities for the IAMF encoder toolchain.
//!
//! This crate provides the fundamental building blocks used across all
//! workspace crates:
//! - Error handling types
//! - ULEB128 generation policies
//! - Bit-level write and read buffers

#![warn(missing_docs)]

pub mod error;
pub mod leb;
pub mod read_buffer;
pub mod write_buffer;

pub use error::{Error, Result};
pub use leb::LebGenerator;
pub use read_buffer::ReadBitBuffer;
pub use write_buffer::WriteBitBuffer;

/// A decoded ULEB128 value. IAMF requires every `leb128()` field to decode
/// to a value representable in 32 bits.
pub type DecodedUleb128 = u32;

/// Maximum number of bytes in an encoded ULEB128 field.
pub const MAX_LEB128_SIZE: usize = 8;

/// Maximum length of a null-terminated string field, including the
/// terminator.
pub const MAX_STRING_SIZE: usize = 128;

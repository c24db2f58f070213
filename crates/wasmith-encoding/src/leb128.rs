//! Signed and unsigned LEB128 ("Little Endian Base 128").
//!
//! Every length, count, index and integer immediate in a module is written
//! in this encoding: seven payload bits per byte, least-significant group
//! first, with the high bit of each byte set while more bytes follow.
//!
//! The checked encoders take a bit width and reject values that do not fit
//! in it.  Arithmetic is carried out in 128 bits so that the 64-bit
//! boundary cases (and anything up to 128 bits) are exact.
//!
//! ```
//! use wasmith_encoding::{encode_signed, encode_unsigned};
//!
//! assert_eq!(encode_unsigned(32, 624485).unwrap(), [0xE5, 0x8E, 0x26]);
//! assert_eq!(encode_signed(32, -1).unwrap(), [0x7F]);
//! ```
//!
//! The assembler itself goes through the infallible [`write_u32`] /
//! [`write_i64`] family, whose argument types already guarantee the range.

use std::fmt;
use std::str::FromStr;

use crate::error::{EncodeError, EncodeResult};

const CONTINUATION_BIT: u8 = 0x80;
const SIGN_BIT: u8 = 0x40;
const LOW_BITS: u8 = 0x7f;

// ══════════════════════════════════════════════════════════════════════════════
// Width descriptor
// ══════════════════════════════════════════════════════════════════════════════

/// Bit width and signedness of an encoded integer, e.g. `u32` or `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntWidth {
    bits: u32,
    signed: bool,
}

impl IntWidth {
    /// Widest supported integer.
    pub const MAX_BITS: u32 = 128;

    pub const U32: Self = Self { bits: 32, signed: false };
    pub const U64: Self = Self { bits: 64, signed: false };
    pub const I32: Self = Self { bits: 32, signed: true };
    pub const I64: Self = Self { bits: 64, signed: true };
    /// Block-type immediates are signed 33-bit integers.
    pub const S33: Self = Self { bits: 33, signed: true };

    /// Build a width, rejecting bit counts outside `1..=128`.
    pub fn new(bits: u32, signed: bool) -> EncodeResult<Self> {
        if bits == 0 || bits > Self::MAX_BITS {
            let prefix = if signed { 'i' } else { 'u' };
            return Err(EncodeError::MalformedWidth(format!("{prefix}{bits}")));
        }
        Ok(Self { bits, signed })
    }

    pub fn unsigned(bits: u32) -> EncodeResult<Self> {
        Self::new(bits, false)
    }

    pub fn signed(bits: u32) -> EncodeResult<Self> {
        Self::new(bits, true)
    }

    pub fn bits(self) -> u32 {
        self.bits
    }

    pub fn is_signed(self) -> bool {
        self.signed
    }

    /// Upper bound on the encoded size: one byte per started 7-bit group.
    pub fn max_bytes(self) -> usize {
        self.bits.div_ceil(7) as usize
    }

    /// Largest value representable when read as unsigned.
    pub fn max_unsigned(self) -> u128 {
        if self.bits == 128 {
            u128::MAX
        } else {
            (1u128 << self.bits) - 1
        }
    }

    /// Inclusive two's-complement range when read as signed.
    pub fn signed_range(self) -> (i128, i128) {
        if self.bits == 128 {
            (i128::MIN, i128::MAX)
        } else {
            let half = 1i128 << (self.bits - 1);
            (-half, half - 1)
        }
    }
}

impl fmt::Display for IntWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.signed { 'i' } else { 'u' };
        write!(f, "{prefix}{}", self.bits)
    }
}

impl FromStr for IntWidth {
    type Err = EncodeError;

    /// Parse `u<bits>` (unsigned) or `i<bits>` / `s<bits>` (signed).
    fn from_str(s: &str) -> EncodeResult<Self> {
        let malformed = || EncodeError::MalformedWidth(s.to_string());
        let signed = match s.as_bytes().first() {
            Some(b'u') => false,
            Some(b'i') | Some(b's') => true,
            _ => return Err(malformed()),
        };
        let digits = &s[1..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let bits: u32 = digits.parse().map_err(|_| malformed())?;
        Self::new(bits, signed).map_err(|_| malformed())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Checked encoders
// ══════════════════════════════════════════════════════════════════════════════

/// Encode `value` as an unsigned LEB128 integer of `bits` width.
///
/// Fails with [`EncodeError::OutOfRange`] unless `0 <= value <= 2^bits - 1`.
pub fn encode_unsigned(bits: u32, value: u128) -> EncodeResult<Vec<u8>> {
    let width = IntWidth::unsigned(bits)?;
    if value > width.max_unsigned() {
        return Err(EncodeError::OutOfRange {
            value: value.to_string(),
            width,
        });
    }

    let max = width.max_bytes();
    let mut out = Vec::with_capacity(max);
    let mut rest = value;
    loop {
        let mut byte = (rest as u8) & LOW_BITS;
        rest >>= 7;
        if rest != 0 {
            byte |= CONTINUATION_BIT;
        }
        out.push(byte);
        if out.len() > max {
            return Err(EncodeError::Overlong { width, max });
        }
        if rest == 0 {
            return Ok(out);
        }
    }
}

/// Encode `value` as a signed LEB128 integer of `bits` width.
///
/// Fails with [`EncodeError::OutOfRange`] unless
/// `-2^(bits-1) <= value <= 2^(bits-1) - 1`.
pub fn encode_signed(bits: u32, value: i128) -> EncodeResult<Vec<u8>> {
    let width = IntWidth::signed(bits)?;
    let (min, max_value) = width.signed_range();
    if value < min || value > max_value {
        return Err(EncodeError::OutOfRange {
            value: value.to_string(),
            width,
        });
    }

    let max = width.max_bytes();
    let mut out = Vec::with_capacity(max);
    let mut rest = value;
    loop {
        let byte = (rest as u8) & LOW_BITS;
        // Arithmetic shift: negative values converge on -1.
        rest >>= 7;
        let done = (rest == 0 && byte & SIGN_BIT == 0) || (rest == -1 && byte & SIGN_BIT != 0);
        out.push(if done { byte } else { byte | CONTINUATION_BIT });
        if out.len() > max {
            return Err(EncodeError::Overlong { width, max });
        }
        if done {
            return Ok(out);
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Decoders
// ══════════════════════════════════════════════════════════════════════════════

/// Decode an unsigned LEB128 integer of `bits` width from the front of
/// `bytes`, returning the value and the number of bytes consumed.
pub fn decode_unsigned(bytes: &[u8], bits: u32) -> EncodeResult<(u128, usize)> {
    let width = IntWidth::unsigned(bits)?;
    let max = width.max_bytes();
    let mut result = 0u128;

    for (i, &byte) in bytes.iter().enumerate() {
        let last = byte & CONTINUATION_BIT == 0;
        if !last && i + 1 == max {
            return Err(EncodeError::Overlong { width, max });
        }
        let shift = 7 * i as u32;
        let remaining = bits - shift;
        let payload = byte & LOW_BITS;
        if remaining < 7 && payload >> remaining != 0 {
            return Err(EncodeError::ExcessBits { width });
        }
        result |= u128::from(payload) << shift;
        if last {
            return Ok((result, i + 1));
        }
    }
    Err(EncodeError::UnexpectedEof { read: bytes.len() })
}

/// Decode a signed LEB128 integer of `bits` width from the front of
/// `bytes`, returning the value and the number of bytes consumed.
pub fn decode_signed(bytes: &[u8], bits: u32) -> EncodeResult<(i128, usize)> {
    let width = IntWidth::signed(bits)?;
    let max = width.max_bytes();
    let mut result = 0u128;

    for (i, &byte) in bytes.iter().enumerate() {
        let last = byte & CONTINUATION_BIT == 0;
        if !last && i + 1 == max {
            return Err(EncodeError::Overlong { width, max });
        }
        let shift = 7 * i as u32;
        let remaining = bits - shift;
        let payload = byte & LOW_BITS;
        if last && remaining < 7 {
            // Bits above the width must all copy the sign bit.
            let upper = payload >> (remaining - 1);
            if upper != 0 && upper != LOW_BITS >> (remaining - 1) {
                return Err(EncodeError::ExcessBits { width });
            }
        }
        result |= u128::from(payload) << shift;
        if last {
            let consumed = shift + 7;
            if consumed < 128 && payload & SIGN_BIT != 0 {
                result |= u128::MAX << consumed;
            }
            return Ok((result as i128, i + 1));
        }
    }
    Err(EncodeError::UnexpectedEof { read: bytes.len() })
}

// ══════════════════════════════════════════════════════════════════════════════
// Infallible fast paths
// ══════════════════════════════════════════════════════════════════════════════

/// Append `value` as unsigned LEB128; returns the number of bytes written.
pub fn write_u64(out: &mut Vec<u8>, mut value: u64) -> usize {
    let mut written = 0;
    loop {
        let mut byte = (value as u8) & LOW_BITS;
        value >>= 7;
        if value != 0 {
            byte |= CONTINUATION_BIT;
        }
        out.push(byte);
        written += 1;
        if value == 0 {
            return written;
        }
    }
}

pub fn write_u32(out: &mut Vec<u8>, value: u32) -> usize {
    write_u64(out, value.into())
}

/// Append `value` as signed LEB128; returns the number of bytes written.
pub fn write_i64(out: &mut Vec<u8>, mut value: i64) -> usize {
    let mut written = 0;
    loop {
        let byte = (value as u8) & LOW_BITS;
        value >>= 7;
        let done = (value == 0 && byte & SIGN_BIT == 0) || (value == -1 && byte & SIGN_BIT != 0);
        out.push(if done { byte } else { byte | CONTINUATION_BIT });
        written += 1;
        if done {
            return written;
        }
    }
}

pub fn write_i32(out: &mut Vec<u8>, value: i32) -> usize {
    write_i64(out, value.into())
}

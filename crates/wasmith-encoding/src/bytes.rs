//! Flat byte construction.
//!
//! Two helpers cover every place the assembler glues bytes together:
//!
//! - [`template!`] concatenates literal fragments and interpolated values.
//!   Strings contribute their raw UTF-8 bytes with no length prefix, nested
//!   arrays are flattened however deep they go, and single integers become
//!   single bytes.
//! - [`encode_name`] writes one string as `u32 length ++ UTF-8 bytes`, the
//!   format's `name` grammar.
//!
//! [`ByteBuffer`] is the growable sink the rest of the workspace encodes
//! into.

use crate::leb128;

/// A value that can be spliced into a byte template.
pub trait Splice {
    fn splice_into(&self, out: &mut Vec<u8>);
}

impl Splice for u8 {
    fn splice_into(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Splice for str {
    fn splice_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl Splice for String {
    fn splice_into(&self, out: &mut Vec<u8>) {
        self.as_str().splice_into(out);
    }
}

impl<T: Splice> Splice for [T] {
    fn splice_into(&self, out: &mut Vec<u8>) {
        for item in self {
            item.splice_into(out);
        }
    }
}

impl<T: Splice, const N: usize> Splice for [T; N] {
    fn splice_into(&self, out: &mut Vec<u8>) {
        self.as_slice().splice_into(out);
    }
}

impl<T: Splice> Splice for Vec<T> {
    fn splice_into(&self, out: &mut Vec<u8>) {
        self.as_slice().splice_into(out);
    }
}

impl<T: Splice + ?Sized> Splice for &T {
    fn splice_into(&self, out: &mut Vec<u8>) {
        T::splice_into(self, out);
    }
}

impl Splice for ByteBuffer {
    fn splice_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.bytes);
    }
}

/// Concatenate fragments into one flat `Vec<u8>`.
///
/// ```
/// use wasmith_encoding::template;
///
/// let header = template!("\0asm", [1u8, 0, 0, 0]);
/// assert_eq!(header, b"\0asm\x01\x00\x00\x00");
///
/// let nested = template!(0x41u8, vec![vec![1u8, 2], vec![3u8]], "A");
/// assert_eq!(nested, [0x41, 1, 2, 3, b'A']);
/// ```
#[macro_export]
macro_rules! template {
    ($($part:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut out: ::std::vec::Vec<u8> = ::std::vec::Vec::new();
        $( $crate::Splice::splice_into(&$part, &mut out); )*
        out
    }};
}

/// Encode a single string as `u32(byte length) ++ UTF-8 bytes`.
pub fn encode_name(name: &str) -> Vec<u8> {
    let mut buf = ByteBuffer::with_capacity(name.len() + 5);
    buf.name(name);
    buf.finish()
}

// ══════════════════════════════════════════════════════════════════════════════
// ByteBuffer
// ══════════════════════════════════════════════════════════════════════════════

/// Growable byte sink with format-aware writers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Append one raw byte.
    pub fn byte(&mut self, byte: u8) -> &mut Self {
        self.bytes.push(byte);
        self
    }

    /// Append raw bytes verbatim.
    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Append anything [`Splice`]able.
    pub fn splice(&mut self, part: &(impl Splice + ?Sized)) -> &mut Self {
        part.splice_into(&mut self.bytes);
        self
    }

    /// Unsigned LEB128 `u32`.
    pub fn u32(&mut self, value: u32) -> &mut Self {
        leb128::write_u32(&mut self.bytes, value);
        self
    }

    /// Unsigned LEB128 `u64`.
    pub fn u64(&mut self, value: u64) -> &mut Self {
        leb128::write_u64(&mut self.bytes, value);
        self
    }

    /// Unsigned LEB128 of a collection length.
    pub fn len_prefix(&mut self, len: usize) -> &mut Self {
        leb128::write_u64(&mut self.bytes, len as u64);
        self
    }

    /// Signed LEB128 `i32`.
    pub fn i32(&mut self, value: i32) -> &mut Self {
        leb128::write_i32(&mut self.bytes, value);
        self
    }

    /// Signed LEB128 `i64`.
    pub fn i64(&mut self, value: i64) -> &mut Self {
        leb128::write_i64(&mut self.bytes, value);
        self
    }

    /// IEEE 754 bits, little-endian.
    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_bits().to_le_bytes());
        self
    }

    /// IEEE 754 bits, little-endian.
    pub fn f64(&mut self, value: f64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_bits().to_le_bytes());
        self
    }

    /// Length-prefixed UTF-8 string.
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.len_prefix(name.len());
        self.bytes.extend_from_slice(name.as_bytes());
        self
    }

    /// `u32(payload length) ++ payload`.
    pub fn sized(&mut self, payload: &[u8]) -> &mut Self {
        self.len_prefix(payload.len());
        self.bytes.extend_from_slice(payload);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Take ownership of the accumulated bytes.
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

//! Wasmith encoding primitives.
//!
//! Everything the binary module format builds on lives here:
//!
//! - [`leb128`]: the variable-length integer encoding used for every
//!   length, count, index and immediate in the format.
//! - [`bytes`]: [`ByteBuffer`] and the [`template!`] macro for gluing
//!   literal byte runs, nested arrays and strings into flat byte vectors.
//!
//! Higher layers implement [`Encode`] for their own types and write into a
//! [`ByteBuffer`].

pub mod bytes;
mod error;
pub mod leb128;

pub use bytes::{encode_name, ByteBuffer, Splice};
pub use error::{EncodeError, EncodeResult};
pub use leb128::{
    decode_signed, decode_unsigned, encode_signed, encode_unsigned, IntWidth,
};

/// A value that knows its own binary encoding.
pub trait Encode {
    /// Append the encoding of `self` to `sink`.
    fn encode(&self, sink: &mut ByteBuffer);

    /// Encode `self` into a fresh byte vector.
    fn to_bytes(&self) -> Vec<u8> {
        let mut sink = ByteBuffer::new();
        self.encode(&mut sink);
        sink.finish()
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, sink: &mut ByteBuffer) {
        T::encode(self, sink)
    }
}

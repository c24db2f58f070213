//! Encoding error types.

use thiserror::Error;

use crate::leb128::IntWidth;

/// Errors raised while encoding or decoding variable-length integers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A width descriptor such as `"u32"` could not be parsed, or names a
    /// bit width outside `1..=128`.
    #[error("malformed integer width `{0}`")]
    MalformedWidth(String),

    /// The value does not fit in the declared width.
    #[error("value {value} out of range for {width}")]
    OutOfRange { value: String, width: IntWidth },

    /// The final byte of an encoding carries bits beyond the width.
    #[error("encoding sets bits beyond {width}")]
    ExcessBits { width: IntWidth },

    /// More bytes were produced (or consumed) than the width allows.
    #[error("encoding of {width} exceeds {max} bytes")]
    Overlong { width: IntWidth, max: usize },

    /// The input ended before the final byte of an encoding.
    #[error("unexpected end of input after {read} bytes")]
    UnexpectedEof { read: usize },
}

/// Encoding result type alias.
pub type EncodeResult<T> = Result<T, EncodeError>;

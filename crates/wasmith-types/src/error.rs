//! Assembler error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasmith_encoding::EncodeError;

use crate::types::{ExternalKind, FuncType, ValType};

/// Error category, matching how the caller is expected to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// A declaration call broke a module-level rule. Fix the declaration.
    Declaration,
    /// A value was outside the domain of its encoding.
    Encoding,
    /// The assembled module was rejected by the validator; an assembler bug.
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declaration => write!(f, "declaration"),
            Self::Encoding => write!(f, "encoding"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Errors raised while declaring or assembling a module.
///
/// Every declaration call checks its preconditions before touching the
/// module, so an `Err` leaves the assembler exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// A second function was marked as the start function.
    #[error("start function already declared (function index {existing})")]
    DuplicateStart { existing: u32 },

    /// The start function must have type `() -> ()`.
    #[error("start function must have type () -> (), found {found}")]
    InvalidStartSignature { found: FuncType },

    /// The module already has a memory, local or imported.
    #[error("module already declares a memory")]
    DuplicateMemory,

    /// Export names must be unique within a module.
    #[error("duplicate export name `{0}`")]
    DuplicateExport(String),

    /// Imports of a kind must precede local definitions of that kind.
    #[error("{kind} import `{namespace}.{name}` declared after a local {kind} definition")]
    ImportAfterDefinition {
        kind: ExternalKind,
        namespace: String,
        name: String,
    },

    /// An index does not exist in its index space.
    #[error("{kind} index {index} out of range ({count} defined)")]
    IndexOutOfRange {
        kind: ExternalKind,
        index: u32,
        count: u32,
    },

    /// A type index was never registered in the type table.
    #[error("type index {0} is not registered")]
    UnknownType(u32),

    /// Limits with a maximum below the minimum, or beyond the format cap.
    #[error("invalid limits: min {min}, max {max:?}")]
    InvalidLimits { min: u32, max: Option<u32> },

    /// A constant initializer produces the wrong type.
    #[error("initializer of type {found} does not match declared type {expected}")]
    InitializerMismatch { expected: ValType, found: ValType },

    /// Only imported globals may appear in constant expressions.
    #[error("constant expression reads global {0}, which is not imported")]
    NonImportedGlobalRef(u32),

    /// Constant expressions may not read mutable globals.
    #[error("constant expression reads mutable global {0}")]
    MutableGlobalRef(u32),

    /// A declaration exceeds a limit of the binary format.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// A varint or width descriptor was rejected.
    #[error(transparent)]
    Encoding(#[from] EncodeError),

    /// The assembled module failed validation.
    #[error("module validation failed: {0}")]
    ValidationFailed(String),
}

impl AssemblyError {
    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicateStart { .. }
            | Self::InvalidStartSignature { .. }
            | Self::DuplicateMemory
            | Self::DuplicateExport(_)
            | Self::ImportAfterDefinition { .. }
            | Self::IndexOutOfRange { .. }
            | Self::UnknownType(_)
            | Self::InvalidLimits { .. }
            | Self::InitializerMismatch { .. }
            | Self::NonImportedGlobalRef(_)
            | Self::MutableGlobalRef(_)
            | Self::LimitExceeded(_) => ErrorCategory::Declaration,
            Self::Encoding(EncodeError::MalformedWidth(_)) => ErrorCategory::Declaration,
            Self::Encoding(_) => ErrorCategory::Encoding,
            Self::ValidationFailed(_) => ErrorCategory::Validation,
        }
    }
}

/// Assembler result type alias.
pub type AssemblyResult<T> = Result<T, AssemblyError>;

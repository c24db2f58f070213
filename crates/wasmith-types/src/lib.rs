//! Shared types for the Wasmith assembler.
//!
//! This crate defines the value types, signatures, limits, constant
//! expressions and error types used by every assembler stage.

mod error;
pub mod types;

pub use error::{AssemblyError, AssemblyResult, ErrorCategory};
pub use types::{
    ConstExpr, ExternalKind, FuncType, GlobalType, Limits, RefType, SectionId, TableType, ValType,
    END, FUNC_TYPE_MARKER, MAGIC, MAX_MEMORY_PAGES, VERSION,
};

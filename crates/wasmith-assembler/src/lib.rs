//! Wasmith module assembler: declarations to `.wasm` binary.
//!
//! # Architecture
//!
//! A [`ModuleAssembler`] collects declarations in caller order:
//!
//! - imports (`new_import`, `import_function`), which occupy the low end of
//!   each index space
//! - functions (`new_function`), whose bodies are opaque pre-encoded
//!   instruction bytes, optionally built with [`Instructions`]
//! - tables, the single memory, globals, explicit exports, data segments and
//!   custom sections
//!
//! Function signatures are deduplicated through the [`TypeTable`].
//! [`ModuleAssembler::serialize`] then emits the header and each non-empty
//! section in format order; [`ModuleAssembler::assemble_executable`] also
//! runs the result through `wasmparser` validation.
//!
//! ## Example
//!
//! ```
//! use wasmith_assembler::{FunctionOptions, Instructions, ModuleAssembler};
//! use wasmith_types::{FuncType, ValType};
//!
//! let mut module = ModuleAssembler::new();
//! module
//!     .import_function("env", "log", FuncType::new([ValType::F32], []))
//!     .unwrap();
//! let get = module
//!     .new_function(
//!         FuncType::new([], [ValType::I32]),
//!         &[],
//!         Instructions::new().i32_const(42).to_vec(),
//!         FunctionOptions::new().export("get"),
//!     )
//!     .unwrap();
//! assert_eq!(get, 1);
//!
//! let wasm = module.assemble_executable().unwrap();
//! assert_eq!(&wasm[0..4], b"\0asm");
//! ```

pub mod instructions;
pub mod manifest;
pub mod module;
mod sections;
pub mod type_table;

pub use instructions::{BlockType, Instructions, MemArg};
pub use manifest::{ExportEntry, ImportEntry, ModuleManifest};
pub use module::{Export, FunctionOptions, Import, ImportDesc, ModuleAssembler};
pub use type_table::TypeTable;
pub use wasmith_types::{AssemblyError, AssemblyResult};

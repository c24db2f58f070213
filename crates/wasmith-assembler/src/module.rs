//! Module declarations.
//!
//! [`ModuleAssembler`] accumulates imports, functions, tables, memory,
//! globals, exports, data segments and custom sections in caller order and
//! hands out indices as it goes.  Sections are produced from this state by
//! [`ModuleAssembler::serialize`] (see `sections.rs`).
//!
//! Index spaces follow the binary format: imported entities of a kind come
//! first, locally defined ones after.  Because an index is returned at
//! declaration time, an import of a kind is rejected once a local entity of
//! the same kind exists.

use log::debug;
use wasmith_types::{
    AssemblyError, AssemblyResult, ConstExpr, ExternalKind, FuncType, GlobalType, Limits, RefType,
    TableType, ValType, END, MAX_MEMORY_PAGES,
};

use crate::manifest::{ExportEntry, ImportEntry, ModuleManifest};
use crate::type_table::TypeTable;

// ══════════════════════════════════════════════════════════════════════════════
// Declarations
// ══════════════════════════════════════════════════════════════════════════════

/// Kind-specific part of an import, as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportDesc {
    Func(FuncType),
    Table(TableType),
    Memory(Limits),
    Global(GlobalType),
}

impl ImportDesc {
    pub fn kind(&self) -> ExternalKind {
        match self {
            Self::Func(_) => ExternalKind::Func,
            Self::Table(_) => ExternalKind::Table,
            Self::Memory(_) => ExternalKind::Memory,
            Self::Global(_) => ExternalKind::Global,
        }
    }
}

/// An import whose signature has been resolved to a type index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntityType {
    Func(u32),
    Table(TableType),
    Memory(Limits),
    Global(GlobalType),
}

impl EntityType {
    fn kind(&self) -> ExternalKind {
        match self {
            Self::Func(_) => ExternalKind::Func,
            Self::Table(_) => ExternalKind::Table,
            Self::Memory(_) => ExternalKind::Memory,
            Self::Global(_) => ExternalKind::Global,
        }
    }
}

/// A declared import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub namespace: String,
    pub name: String,
    /// Index within the import's own index space.
    pub index: u32,
    pub(crate) entity: EntityType,
}

impl Import {
    pub fn kind(&self) -> ExternalKind {
        self.entity.kind()
    }
}

/// A declared export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub kind: ExternalKind,
    pub index: u32,
}

/// A locally defined function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Function {
    pub(crate) type_index: u32,
    /// Run-length local declarations `(count, type)`, as given.
    pub(crate) locals: Vec<(u32, ValType)>,
    /// Instruction bytes including the terminating `end`.
    pub(crate) body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Global {
    pub(crate) ty: GlobalType,
    pub(crate) init: ConstExpr,
}

/// An active data segment for memory 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DataSegment {
    pub(crate) offset: u32,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CustomSection {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
}

/// Per-function options for [`ModuleAssembler::new_function`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionOptions {
    /// Export the function under this name.
    pub export: Option<String>,
    /// Make this the module's start function.
    pub start: bool,
}

impl FunctionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export(mut self, name: impl Into<String>) -> Self {
        self.export = Some(name.into());
        self
    }

    pub fn start(mut self) -> Self {
        self.start = true;
        self
    }
}

/// Number of imported entities per index space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ImportCounts {
    pub(crate) funcs: u32,
    pub(crate) tables: u32,
    pub(crate) memories: u32,
    pub(crate) globals: u32,
}

// ══════════════════════════════════════════════════════════════════════════════
// ModuleAssembler
// ══════════════════════════════════════════════════════════════════════════════

/// Builder for a single binary module.
///
/// All collections are append-only and keep declaration order, which is
/// also their order in the output.
#[derive(Debug, Clone, Default)]
pub struct ModuleAssembler {
    pub(crate) types: TypeTable,
    pub(crate) imports: Vec<Import>,
    pub(crate) imported: ImportCounts,
    pub(crate) functions: Vec<Function>,
    pub(crate) tables: Vec<TableType>,
    pub(crate) memories: Vec<Limits>,
    pub(crate) globals: Vec<Global>,
    pub(crate) exports: Vec<Export>,
    pub(crate) start: Option<u32>,
    pub(crate) data: Vec<DataSegment>,
    pub(crate) customs: Vec<CustomSection>,
}

impl ModuleAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Imports ──────────────────────────────────────────────────────────

    /// Declare a batch of imports from one namespace, in order.
    ///
    /// Returns each import's index within its own index space.  Either all
    /// entries are declared or, on error, none are.
    pub fn new_import<N, I>(&mut self, namespace: &str, entries: I) -> AssemblyResult<Vec<u32>>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, ImportDesc)>,
    {
        let entries: Vec<(String, ImportDesc)> = entries
            .into_iter()
            .map(|(name, desc)| (name.into(), desc))
            .collect();

        let mut memory_declared = self.has_memory();
        for (name, desc) in &entries {
            self.check_import(namespace, name, desc)?;
            if let ImportDesc::Memory(_) = desc {
                if memory_declared {
                    return Err(AssemblyError::DuplicateMemory);
                }
                memory_declared = true;
            }
        }

        Ok(entries
            .into_iter()
            .map(|(name, desc)| self.push_import(namespace, name, desc))
            .collect())
    }

    /// Declare a single import.
    pub fn import(
        &mut self,
        namespace: &str,
        name: impl Into<String>,
        desc: ImportDesc,
    ) -> AssemblyResult<u32> {
        let name = name.into();
        self.check_import(namespace, &name, &desc)?;
        if matches!(desc, ImportDesc::Memory(_)) && self.has_memory() {
            return Err(AssemblyError::DuplicateMemory);
        }
        Ok(self.push_import(namespace, name, desc))
    }

    /// Shorthand for importing a function; returns its function index.
    pub fn import_function(
        &mut self,
        namespace: &str,
        name: impl Into<String>,
        ty: FuncType,
    ) -> AssemblyResult<u32> {
        self.import(namespace, name, ImportDesc::Func(ty))
    }

    fn check_import(&self, namespace: &str, name: &str, desc: &ImportDesc) -> AssemblyResult<()> {
        let defined_locally = match desc {
            ImportDesc::Func(_) => !self.functions.is_empty(),
            ImportDesc::Table(table) => {
                check_limits(table.limits, None)?;
                !self.tables.is_empty()
            }
            ImportDesc::Memory(limits) => {
                check_limits(*limits, Some(MAX_MEMORY_PAGES))?;
                false
            }
            ImportDesc::Global(_) => !self.globals.is_empty(),
        };
        if defined_locally {
            return Err(AssemblyError::ImportAfterDefinition {
                kind: desc.kind(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn push_import(&mut self, namespace: &str, name: String, desc: ImportDesc) -> u32 {
        let (entity, counter) = match desc {
            ImportDesc::Func(ty) => (
                EntityType::Func(self.types.register(&ty)),
                &mut self.imported.funcs,
            ),
            ImportDesc::Table(ty) => (EntityType::Table(ty), &mut self.imported.tables),
            ImportDesc::Memory(limits) => (EntityType::Memory(limits), &mut self.imported.memories),
            ImportDesc::Global(ty) => (EntityType::Global(ty), &mut self.imported.globals),
        };
        let index = *counter;
        *counter += 1;

        debug!(
            "import {namespace}.{name}: {} index {index}",
            entity.kind()
        );
        self.imports.push(Import {
            namespace: namespace.to_string(),
            name,
            index,
            entity,
        });
        index
    }

    // ── Functions ────────────────────────────────────────────────────────

    /// Define a function and return its index in the function index space
    /// (imported functions first).
    ///
    /// `locals` are run-length `(count, type)` declarations beyond the
    /// parameters; they are emitted exactly as given.  `body` is the
    /// instruction sequence without the final `end`, which is appended here.
    pub fn new_function(
        &mut self,
        ty: FuncType,
        locals: &[(u32, ValType)],
        body: impl Into<Vec<u8>>,
        options: FunctionOptions,
    ) -> AssemblyResult<u32> {
        self.check_function(&ty, locals, &options)?;
        let type_index = self.types.register(&ty);
        Ok(self.push_function(type_index, locals, body.into(), options))
    }

    /// Like [`new_function`](Self::new_function), with the signature given
    /// by an already-registered type index.
    pub fn new_function_of_type(
        &mut self,
        type_index: u32,
        locals: &[(u32, ValType)],
        body: impl Into<Vec<u8>>,
        options: FunctionOptions,
    ) -> AssemblyResult<u32> {
        let ty = self
            .types
            .get(type_index)
            .ok_or(AssemblyError::UnknownType(type_index))?;
        self.check_function(ty, locals, &options)?;
        Ok(self.push_function(type_index, locals, body.into(), options))
    }

    fn check_function(
        &self,
        ty: &FuncType,
        locals: &[(u32, ValType)],
        options: &FunctionOptions,
    ) -> AssemblyResult<()> {
        let total = ty.params().len() as u64
            + locals.iter().map(|&(count, _)| u64::from(count)).sum::<u64>();
        if total > u64::from(u32::MAX) {
            return Err(AssemblyError::LimitExceeded(format!(
                "function declares {total} locals including parameters, at most {} allowed",
                u32::MAX
            )));
        }
        if options.start {
            if let Some(existing) = self.start {
                return Err(AssemblyError::DuplicateStart { existing });
            }
            if !ty.is_empty() {
                return Err(AssemblyError::InvalidStartSignature { found: ty.clone() });
            }
        }
        if let Some(name) = &options.export {
            self.check_export_name(name)?;
        }
        Ok(())
    }

    fn push_function(
        &mut self,
        type_index: u32,
        locals: &[(u32, ValType)],
        mut body: Vec<u8>,
        options: FunctionOptions,
    ) -> u32 {
        let index = self.function_count();
        body.push(END);
        self.functions.push(Function {
            type_index,
            locals: locals.to_vec(),
            body,
        });
        debug!("function {index}: type {type_index}");

        if let Some(name) = options.export {
            self.push_export(name, ExternalKind::Func, index);
        }
        if options.start {
            self.start = Some(index);
        }
        index
    }

    // ── Tables, memory, globals ──────────────────────────────────────────

    /// Define a table; returns its table index.
    pub fn new_table(
        &mut self,
        element: RefType,
        limits: Limits,
        export: Option<&str>,
    ) -> AssemblyResult<u32> {
        check_limits(limits, None)?;
        if let Some(name) = export {
            self.check_export_name(name)?;
        }
        let index = self.imported.tables + self.tables.len() as u32;
        self.tables.push(TableType { element, limits });
        debug!("table {index}: {element} {limits:?}");
        if let Some(name) = export {
            self.push_export(name.to_string(), ExternalKind::Table, index);
        }
        Ok(index)
    }

    /// Define the module's memory; returns its memory index (always 0).
    ///
    /// A module holds at most one memory, local or imported.
    pub fn new_memory(&mut self, min: u32, max: Option<u32>, export: Option<&str>) -> AssemblyResult<u32> {
        if self.has_memory() {
            return Err(AssemblyError::DuplicateMemory);
        }
        let limits = Limits::new(min, max);
        check_limits(limits, Some(MAX_MEMORY_PAGES))?;
        if let Some(name) = export {
            self.check_export_name(name)?;
        }
        let index = self.memory_count();
        self.memories.push(limits);
        debug!("memory {index}: {limits:?}");
        if let Some(name) = export {
            self.push_export(name.to_string(), ExternalKind::Memory, index);
        }
        Ok(index)
    }

    /// Define a global; returns its global index.
    pub fn new_global(
        &mut self,
        ty: GlobalType,
        init: ConstExpr,
        export: Option<&str>,
    ) -> AssemblyResult<u32> {
        let found = match init {
            ConstExpr::GlobalGet(index) => {
                let imported = self
                    .imported_global_type(index)
                    .ok_or(AssemblyError::NonImportedGlobalRef(index))?;
                if imported.mutable {
                    return Err(AssemblyError::MutableGlobalRef(index));
                }
                imported.val_type
            }
            ConstExpr::RefFunc(index) => {
                self.check_index(ExternalKind::Func, index)?;
                ValType::FuncRef
            }
            other => other.value_type().unwrap_or(ty.val_type),
        };
        if found != ty.val_type {
            return Err(AssemblyError::InitializerMismatch {
                expected: ty.val_type,
                found,
            });
        }
        if let Some(name) = export {
            self.check_export_name(name)?;
        }

        let index = self.global_count();
        self.globals.push(Global { ty, init });
        debug!("global {index}: {} mutable={}", ty.val_type, ty.mutable);
        if let Some(name) = export {
            self.push_export(name.to_string(), ExternalKind::Global, index);
        }
        Ok(index)
    }

    fn imported_global_type(&self, index: u32) -> Option<GlobalType> {
        self.imports
            .iter()
            .filter_map(|import| match import.entity {
                EntityType::Global(ty) => Some(ty),
                _ => None,
            })
            .nth(index as usize)
    }

    // ── Exports ──────────────────────────────────────────────────────────

    /// Export an existing entity under `name`.
    pub fn new_export(&mut self, name: &str, kind: ExternalKind, index: u32) -> AssemblyResult<()> {
        self.check_export_name(name)?;
        self.check_index(kind, index)?;
        self.push_export(name.to_string(), kind, index);
        Ok(())
    }

    fn check_export_name(&self, name: &str) -> AssemblyResult<()> {
        if self.exports.iter().any(|export| export.name == name) {
            return Err(AssemblyError::DuplicateExport(name.to_string()));
        }
        Ok(())
    }

    fn push_export(&mut self, name: String, kind: ExternalKind, index: u32) {
        debug!("export `{name}`: {kind} {index}");
        self.exports.push(Export { name, kind, index });
    }

    fn check_index(&self, kind: ExternalKind, index: u32) -> AssemblyResult<()> {
        let count = self.count(kind);
        if index >= count {
            return Err(AssemblyError::IndexOutOfRange { kind, index, count });
        }
        Ok(())
    }

    // ── Data and custom sections ─────────────────────────────────────────

    /// Add an active data segment written to memory 0 at `offset`;
    /// returns the segment index.
    pub fn new_data(&mut self, offset: u32, bytes: impl Into<Vec<u8>>) -> AssemblyResult<u32> {
        self.check_index(ExternalKind::Memory, 0)?;
        let index = self.data.len() as u32;
        let bytes = bytes.into();
        debug!("data {index}: {} bytes at {offset}", bytes.len());
        self.data.push(DataSegment { offset, bytes });
        Ok(index)
    }

    /// Append a custom section; emitted after all standard sections.
    pub fn add_custom_section(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.customs.push(CustomSection {
            name: name.into(),
            data: data.into(),
        });
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Index of the start function, if one was declared.
    pub fn start(&self) -> Option<u32> {
        self.start
    }

    pub fn imported_function_count(&self) -> u32 {
        self.imported.funcs
    }

    /// Size of the function index space (imported + local).
    pub fn function_count(&self) -> u32 {
        self.imported.funcs + self.functions.len() as u32
    }

    pub fn table_count(&self) -> u32 {
        self.imported.tables + self.tables.len() as u32
    }

    pub fn memory_count(&self) -> u32 {
        self.imported.memories + self.memories.len() as u32
    }

    pub fn global_count(&self) -> u32 {
        self.imported.globals + self.globals.len() as u32
    }

    /// Size of the index space for `kind`.
    pub fn count(&self, kind: ExternalKind) -> u32 {
        match kind {
            ExternalKind::Func => self.function_count(),
            ExternalKind::Table => self.table_count(),
            ExternalKind::Memory => self.memory_count(),
            ExternalKind::Global => self.global_count(),
        }
    }

    pub fn has_memory(&self) -> bool {
        self.memory_count() > 0
    }

    /// Describe the module's instantiation boundary.
    pub fn manifest(&self) -> ModuleManifest {
        let imports = self
            .imports
            .iter()
            .map(|import| ImportEntry {
                namespace: import.namespace.clone(),
                name: import.name.clone(),
                kind: import.kind(),
                index: import.index,
                signature: match import.entity {
                    EntityType::Func(type_index) => self.types.get(type_index).cloned(),
                    _ => None,
                },
            })
            .collect();
        let exports = self
            .exports
            .iter()
            .map(|export| ExportEntry {
                name: export.name.clone(),
                kind: export.kind,
                index: export.index,
            })
            .collect();
        ModuleManifest {
            imports,
            exports,
            start: self.start,
        }
    }
}

fn check_limits(limits: Limits, cap: Option<u32>) -> AssemblyResult<()> {
    let within_cap = cap.map_or(true, |cap| {
        limits.min <= cap && limits.max.map_or(true, |max| max <= cap)
    });
    if !limits.is_ordered() || !within_cap {
        return Err(AssemblyError::InvalidLimits {
            min: limits.min,
            max: limits.max,
        });
    }
    Ok(())
}

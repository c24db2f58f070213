//! Binary-format vocabulary: value types, signatures, limits, entity types
//! and constant initializer expressions.
//!
//! Every type here implements [`Encode`] with the exact byte layout of the
//! binary format, so higher layers never hand-write tag bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use wasmith_encoding::{ByteBuffer, Encode};

// ── Format constants ─────────────────────────────────────────────────────────

/// `\0asm`
pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
/// Binary format version 1, little-endian.
pub const VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
/// Leading byte of a function type in the type section.
pub const FUNC_TYPE_MARKER: u8 = 0x60;
/// Terminates function bodies and constant expressions.
pub const END: u8 = 0x0b;
/// Largest number of 64 KiB pages a 32-bit memory may declare.
pub const MAX_MEMORY_PAGES: u32 = 65536;

// ══════════════════════════════════════════════════════════════════════════════
// Value types
// ══════════════════════════════════════════════════════════════════════════════

/// A value type as it appears in signatures, locals and globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValType {
    I32,
    I64,
    F32,
    F64,
    V128,
    FuncRef,
    ExternRef,
}

impl ValType {
    /// The single-byte type tag.
    pub const fn code(self) -> u8 {
        match self {
            Self::I32 => 0x7f,
            Self::I64 => 0x7e,
            Self::F32 => 0x7d,
            Self::F64 => 0x7c,
            Self::V128 => 0x7b,
            Self::FuncRef => 0x70,
            Self::ExternRef => 0x6f,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x7f => Self::I32,
            0x7e => Self::I64,
            0x7d => Self::F32,
            0x7c => Self::F64,
            0x7b => Self::V128,
            0x70 => Self::FuncRef,
            0x6f => Self::ExternRef,
            _ => return None,
        })
    }

    pub fn is_ref(self) -> bool {
        matches!(self, Self::FuncRef | Self::ExternRef)
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::V128 => "v128",
            Self::FuncRef => "funcref",
            Self::ExternRef => "externref",
        };
        f.write_str(name)
    }
}

impl Encode for ValType {
    fn encode(&self, sink: &mut ByteBuffer) {
        sink.byte(self.code());
    }
}

/// Reference types, the element types of tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    FuncRef,
    ExternRef,
}

impl From<RefType> for ValType {
    fn from(ty: RefType) -> Self {
        match ty {
            RefType::FuncRef => ValType::FuncRef,
            RefType::ExternRef => ValType::ExternRef,
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&ValType::from(*self), f)
    }
}

impl Encode for RefType {
    fn encode(&self, sink: &mut ByteBuffer) {
        ValType::from(*self).encode(sink);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Function signatures
// ══════════════════════════════════════════════════════════════════════════════

/// Ordered parameter and result types of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FuncType {
    params: Vec<ValType>,
    results: Vec<ValType>,
}

impl FuncType {
    pub fn new(
        params: impl IntoIterator<Item = ValType>,
        results: impl IntoIterator<Item = ValType>,
    ) -> Self {
        Self {
            params: params.into_iter().collect(),
            results: results.into_iter().collect(),
        }
    }

    /// `() -> ()`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &[ValType] {
        &self.params
    }

    pub fn results(&self) -> &[ValType] {
        &self.results
    }

    /// True for `() -> ()`, the only signature a start function may have.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.results.is_empty()
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |tys: &[ValType]| {
            tys.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "({}) -> ({})", join(&self.params), join(&self.results))
    }
}

impl Encode for FuncType {
    /// `0x60 ++ vec(params) ++ vec(results)`, also the dedup key of the
    /// type table.
    fn encode(&self, sink: &mut ByteBuffer) {
        sink.byte(FUNC_TYPE_MARKER);
        sink.len_prefix(self.params.len());
        for ty in &self.params {
            ty.encode(sink);
        }
        sink.len_prefix(self.results.len());
        for ty in &self.results {
            ty.encode(sink);
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Limits and entity types
// ══════════════════════════════════════════════════════════════════════════════

/// A minimum and optional maximum bounding a resizable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Limits {
    pub min: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max: Option<u32>,
}

impl Limits {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }

    pub fn bounded(min: u32, max: u32) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// True when the maximum (if any) is not below the minimum.
    pub fn is_ordered(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }
}

impl Encode for Limits {
    fn encode(&self, sink: &mut ByteBuffer) {
        match self.max {
            None => {
                sink.byte(0x00).u32(self.min);
            }
            Some(max) => {
                sink.byte(0x01).u32(self.min).u32(max);
            }
        }
    }
}

/// Element type and size limits of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableType {
    pub element: RefType,
    pub limits: Limits,
}

impl Encode for TableType {
    fn encode(&self, sink: &mut ByteBuffer) {
        self.element.encode(sink);
        self.limits.encode(sink);
    }
}

/// Value type and mutability of a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalType {
    pub val_type: ValType,
    pub mutable: bool,
}

impl GlobalType {
    pub fn immutable(val_type: ValType) -> Self {
        Self {
            val_type,
            mutable: false,
        }
    }

    pub fn mutable(val_type: ValType) -> Self {
        Self {
            val_type,
            mutable: true,
        }
    }
}

impl Encode for GlobalType {
    fn encode(&self, sink: &mut ByteBuffer) {
        self.val_type.encode(sink);
        sink.byte(u8::from(self.mutable));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Index spaces and sections
// ══════════════════════════════════════════════════════════════════════════════

/// The four importable/exportable kinds, each with its own index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalKind {
    Func,
    Table,
    Memory,
    Global,
}

impl ExternalKind {
    pub const fn code(self) -> u8 {
        match self {
            Self::Func => 0x00,
            Self::Table => 0x01,
            Self::Memory => 0x02,
            Self::Global => 0x03,
        }
    }
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Func => "function",
            Self::Table => "table",
            Self::Memory => "memory",
            Self::Global => "global",
        };
        f.write_str(name)
    }
}

impl Encode for ExternalKind {
    fn encode(&self, sink: &mut ByteBuffer) {
        sink.byte(self.code());
    }
}

/// Section identifiers, in the order sections must appear.
///
/// `DataCount` is numbered 12 but is placed before `Code`; see
/// [`SectionId::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SectionId {
    Custom = 0,
    Type = 1,
    Import = 2,
    Function = 3,
    Table = 4,
    Memory = 5,
    Global = 6,
    Export = 7,
    Start = 8,
    Element = 9,
    Code = 10,
    Data = 11,
    DataCount = 12,
}

impl SectionId {
    /// Emission order of the non-custom sections.
    pub const ORDER: [SectionId; 12] = [
        Self::Type,
        Self::Import,
        Self::Function,
        Self::Table,
        Self::Memory,
        Self::Global,
        Self::Export,
        Self::Start,
        Self::Element,
        Self::DataCount,
        Self::Code,
        Self::Data,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Custom,
            1 => Self::Type,
            2 => Self::Import,
            3 => Self::Function,
            4 => Self::Table,
            5 => Self::Memory,
            6 => Self::Global,
            7 => Self::Export,
            8 => Self::Start,
            9 => Self::Element,
            10 => Self::Code,
            11 => Self::Data,
            12 => Self::DataCount,
            _ => return None,
        })
    }
}

impl From<SectionId> for u8 {
    fn from(id: SectionId) -> u8 {
        id as u8
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Constant expressions
// ══════════════════════════════════════════════════════════════════════════════

/// A constant initializer expression (global initializers, segment offsets).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstExpr {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    /// Read an imported global.
    GlobalGet(u32),
    RefNull(RefType),
    RefFunc(u32),
}

impl ConstExpr {
    /// Type of the produced value; `None` for `global.get`, whose type is
    /// that of the referenced global.
    pub fn value_type(&self) -> Option<ValType> {
        match self {
            Self::I32(_) => Some(ValType::I32),
            Self::I64(_) => Some(ValType::I64),
            Self::F32(_) => Some(ValType::F32),
            Self::F64(_) => Some(ValType::F64),
            Self::GlobalGet(_) => None,
            Self::RefNull(ty) => Some((*ty).into()),
            Self::RefFunc(_) => Some(ValType::FuncRef),
        }
    }
}

impl Encode for ConstExpr {
    fn encode(&self, sink: &mut ByteBuffer) {
        match *self {
            Self::I32(v) => sink.byte(0x41).i32(v),
            Self::I64(v) => sink.byte(0x42).i64(v),
            Self::F32(v) => sink.byte(0x43).f32(v),
            Self::F64(v) => sink.byte(0x44).f64(v),
            Self::GlobalGet(idx) => sink.byte(0x23).u32(idx),
            Self::RefNull(ty) => sink.byte(0xd0).byte(ValType::from(ty).code()),
            Self::RefFunc(idx) => sink.byte(0xd2).u32(idx),
        };
        sink.byte(END);
    }
}

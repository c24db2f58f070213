//! Section assembly and module serialization.
//!
//! Each `assemble_*_section` builds the section payload in a scratch buffer
//! first and only then writes `id ++ u32(payload length) ++ payload`; the
//! length prefix is itself a varint, so it cannot be sized in advance.
//! Sections without entries are omitted entirely.

use log::{debug, trace};
use wasmith_encoding::{leb128, template, ByteBuffer, Encode};
use wasmith_types::{AssemblyError, AssemblyResult, ConstExpr, SectionId, MAGIC, VERSION};

use crate::module::{EntityType, ModuleAssembler};

impl ModuleAssembler {
    /// Serialize the module: header followed by every non-empty section in
    /// format order, then custom sections.
    ///
    /// Does not modify the assembler; repeated calls return identical bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = template!(MAGIC, VERSION);
        out.reserve(self.size_hint());
        for id in SectionId::ORDER {
            out.extend_from_slice(&self.assemble_section(id));
        }
        out.extend_from_slice(&self.assemble_custom_sections());
        debug!("serialized module: {} bytes", out.len());
        out
    }

    /// Serialize and validate, producing bytes ready for instantiation.
    pub fn assemble_executable(&self) -> AssemblyResult<Vec<u8>> {
        let bytes = self.serialize();
        wasmparser::validate(&bytes)
            .map_err(|e| AssemblyError::ValidationFailed(format!("{e}")))?;
        Ok(bytes)
    }

    /// The complete encoding of one section, or an empty vector when the
    /// module has nothing to put in it.
    pub fn assemble_section(&self, id: SectionId) -> Vec<u8> {
        match id {
            SectionId::Type => self.assemble_type_section(),
            SectionId::Import => self.assemble_import_section(),
            SectionId::Function => self.assemble_function_section(),
            SectionId::Table => self.assemble_table_section(),
            SectionId::Memory => self.assemble_memory_section(),
            SectionId::Global => self.assemble_global_section(),
            SectionId::Export => self.assemble_export_section(),
            SectionId::Start => self.assemble_start_section(),
            // No element segments can be declared.
            SectionId::Element => Vec::new(),
            SectionId::DataCount => self.assemble_data_count_section(),
            SectionId::Code => self.assemble_code_section(),
            SectionId::Data => self.assemble_data_section(),
            SectionId::Custom => self.assemble_custom_sections(),
        }
    }

    // ── Vector sections ──────────────────────────────────────────────────

    pub fn assemble_type_section(&self) -> Vec<u8> {
        let mut entries = ByteBuffer::new();
        for encoded in self.types.encoded_entries() {
            entries.bytes(encoded);
        }
        vec_section(SectionId::Type, self.types.len(), entries)
    }

    pub fn assemble_import_section(&self) -> Vec<u8> {
        let mut entries = ByteBuffer::new();
        for import in &self.imports {
            entries.name(&import.namespace).name(&import.name);
            import.kind().encode(&mut entries);
            match &import.entity {
                EntityType::Func(type_index) => {
                    entries.u32(*type_index);
                }
                EntityType::Table(ty) => ty.encode(&mut entries),
                EntityType::Memory(limits) => limits.encode(&mut entries),
                EntityType::Global(ty) => ty.encode(&mut entries),
            }
        }
        vec_section(SectionId::Import, self.imports.len(), entries)
    }

    /// Type index of each local function; bodies live in the code section.
    pub fn assemble_function_section(&self) -> Vec<u8> {
        let mut entries = ByteBuffer::new();
        for function in &self.functions {
            entries.u32(function.type_index);
        }
        vec_section(SectionId::Function, self.functions.len(), entries)
    }

    pub fn assemble_table_section(&self) -> Vec<u8> {
        let mut entries = ByteBuffer::new();
        for table in &self.tables {
            table.encode(&mut entries);
        }
        vec_section(SectionId::Table, self.tables.len(), entries)
    }

    pub fn assemble_memory_section(&self) -> Vec<u8> {
        let mut entries = ByteBuffer::new();
        for limits in &self.memories {
            limits.encode(&mut entries);
        }
        vec_section(SectionId::Memory, self.memories.len(), entries)
    }

    pub fn assemble_global_section(&self) -> Vec<u8> {
        let mut entries = ByteBuffer::new();
        for global in &self.globals {
            global.ty.encode(&mut entries);
            global.init.encode(&mut entries);
        }
        vec_section(SectionId::Global, self.globals.len(), entries)
    }

    pub fn assemble_export_section(&self) -> Vec<u8> {
        let mut entries = ByteBuffer::new();
        for export in &self.exports {
            entries.name(&export.name);
            export.kind.encode(&mut entries);
            entries.u32(export.index);
        }
        vec_section(SectionId::Export, self.exports.len(), entries)
    }

    /// Each entry is `u32(size) ++ vec(locals) ++ instructions`, where the
    /// size covers everything after itself.
    pub fn assemble_code_section(&self) -> Vec<u8> {
        let mut entries = ByteBuffer::new();
        for function in &self.functions {
            let mut body = ByteBuffer::with_capacity(function.body.len() + 8);
            body.len_prefix(function.locals.len());
            for (count, ty) in &function.locals {
                body.u32(*count);
                ty.encode(&mut body);
            }
            body.bytes(&function.body);
            entries.sized(body.as_slice());
        }
        vec_section(SectionId::Code, self.functions.len(), entries)
    }

    /// Active segments for memory 0: `0x00 ++ i32.const offset ++ vec(bytes)`.
    pub fn assemble_data_section(&self) -> Vec<u8> {
        let mut entries = ByteBuffer::new();
        for segment in &self.data {
            entries.u32(0);
            // i32.const carries the bit pattern; the offset is read back unsigned.
            let offset = i32::from_ne_bytes(segment.offset.to_ne_bytes());
            ConstExpr::I32(offset).encode(&mut entries);
            entries.sized(&segment.bytes);
        }
        vec_section(SectionId::Data, self.data.len(), entries)
    }

    // ── Scalar sections ──────────────────────────────────────────────────

    pub fn assemble_start_section(&self) -> Vec<u8> {
        match self.start {
            Some(index) => {
                let mut payload = ByteBuffer::new();
                payload.u32(index);
                section(SectionId::Start, payload.as_slice())
            }
            None => omitted(SectionId::Start),
        }
    }

    pub fn assemble_data_count_section(&self) -> Vec<u8> {
        if self.data.is_empty() {
            return omitted(SectionId::DataCount);
        }
        let mut payload = ByteBuffer::new();
        payload.len_prefix(self.data.len());
        section(SectionId::DataCount, payload.as_slice())
    }

    /// All custom sections, in declaration order.
    pub fn assemble_custom_sections(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for custom in &self.customs {
            let mut payload = ByteBuffer::with_capacity(custom.name.len() + custom.data.len() + 5);
            payload.name(&custom.name).bytes(&custom.data);
            out.extend_from_slice(&section(SectionId::Custom, payload.as_slice()));
        }
        out
    }

    fn size_hint(&self) -> usize {
        let code: usize = self.functions.iter().map(|f| f.body.len() + 8).sum();
        let data: usize = self.data.iter().map(|d| d.bytes.len() + 8).sum();
        64 + code + data
    }
}

/// `u32(count) ++ entries` wrapped as a section, or nothing when empty.
fn vec_section(id: SectionId, count: usize, entries: ByteBuffer) -> Vec<u8> {
    if count == 0 {
        return omitted(id);
    }
    let mut payload = ByteBuffer::with_capacity(entries.len() + 5);
    payload.len_prefix(count).bytes(entries.as_slice());
    debug!("{id:?} section: {count} entries");
    section(id, payload.as_slice())
}

/// `id ++ u32(payload length) ++ payload`.
fn section(id: SectionId, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 6);
    out.push(id.into());
    leb128::write_u64(&mut out, payload.len() as u64);
    out.extend_from_slice(payload);
    debug!("{id:?} section: {} payload bytes", payload.len());
    out
}

fn omitted(id: SectionId) -> Vec<u8> {
    trace!("{id:?} section omitted");
    Vec::new()
}

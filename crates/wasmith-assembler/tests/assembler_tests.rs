//! Integration tests for the module assembler.
//!
//! Tests validate:
//! - Assembled modules pass `wasmparser` validation
//! - Module structure (imports, exports, start, memory, globals, data)
//! - Index spaces (imported functions before local ones)
//! - Type deduplication across imports and functions
//! - Section omission and ordering
//! - Declaration errors (start, memory, exports, indices)
//! - Deterministic output (serialize twice → same bytes)

use wasmith_assembler::{
    AssemblyError, FunctionOptions, ImportDesc, Instructions, ModuleAssembler, ModuleManifest,
};
use wasmith_encoding::decode_unsigned;
use wasmith_types::{
    ConstExpr, ErrorCategory, ExternalKind, FuncType, GlobalType, Limits, RefType, SectionId,
    TableType, ValType,
};
use wasmparser::{Parser as WasmParser, Payload, TypeRef};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn void() -> FuncType {
    FuncType::empty()
}

fn returns_i32() -> FuncType {
    FuncType::new([], [ValType::I32])
}

/// Body that pushes a single i32 constant.
fn const_body(value: i32) -> Vec<u8> {
    Instructions::new().i32_const(value).to_vec()
}

/// Walk the section headers and return `(id, payload length)` pairs.
fn section_headers(wasm: &[u8]) -> Vec<(u8, usize)> {
    assert_eq!(&wasm[0..8], b"\0asm\x01\0\0\0");
    let mut headers = Vec::new();
    let mut pos = 8;
    while pos < wasm.len() {
        let id = wasm[pos];
        let (len, read) = decode_unsigned(&wasm[pos + 1..], 32).expect("valid section length");
        let len = len as usize;
        headers.push((id, len));
        pos += 1 + read + len;
    }
    assert_eq!(pos, wasm.len(), "sections overran the module");
    headers
}

fn section_ids(wasm: &[u8]) -> Vec<u8> {
    section_headers(wasm).into_iter().map(|(id, _)| id).collect()
}

fn get_exports(wasm: &[u8]) -> Vec<(String, wasmparser::ExternalKind, u32)> {
    let mut exports = Vec::new();
    for payload in WasmParser::new(0).parse_all(wasm) {
        if let Ok(Payload::ExportSection(reader)) = payload {
            for export in reader {
                let exp = export.expect("valid export");
                exports.push((exp.name.to_string(), exp.kind, exp.index));
            }
        }
    }
    exports
}

fn get_imports(wasm: &[u8]) -> Vec<(String, String, TypeRef)> {
    let mut imports = Vec::new();
    for payload in WasmParser::new(0).parse_all(wasm) {
        if let Ok(Payload::ImportSection(reader)) = payload {
            for import in reader {
                let imp = import.expect("valid import");
                imports.push((imp.module.to_string(), imp.name.to_string(), imp.ty));
            }
        }
    }
    imports
}

fn get_function_types(wasm: &[u8]) -> Vec<u32> {
    let mut types = Vec::new();
    for payload in WasmParser::new(0).parse_all(wasm) {
        if let Ok(Payload::FunctionSection(reader)) = payload {
            for ty in reader {
                types.push(ty.expect("valid function entry"));
            }
        }
    }
    types
}

fn get_start(wasm: &[u8]) -> Option<u32> {
    WasmParser::new(0)
        .parse_all(wasm)
        .find_map(|payload| match payload {
            Ok(Payload::StartSection { func, .. }) => Some(func),
            _ => None,
        })
}

fn get_custom(wasm: &[u8], name: &str) -> Option<Vec<u8>> {
    WasmParser::new(0)
        .parse_all(wasm)
        .find_map(|payload| match payload {
            Ok(Payload::CustomSection(reader)) if reader.name() == name => {
                Some(reader.data().to_vec())
            }
            _ => None,
        })
}

fn is_valid_wasm(wasm: &[u8]) -> bool {
    wasmparser::validate(wasm).is_ok()
}

/// `env.log (f32) -> ()` plus an exported `get` returning 42.
fn log_and_get() -> ModuleAssembler {
    let mut m = ModuleAssembler::new();
    m.import_function("env", "log", FuncType::new([ValType::F32], []))
        .unwrap();
    m.new_function(
        returns_i32(),
        &[],
        const_body(42),
        FunctionOptions::new().export("get"),
    )
    .unwrap();
    m
}

// ══════════════════════════════════════════════════════════════════════════════
// Basic Module Structure
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn empty_module_is_valid() {
    let wasm = ModuleAssembler::new().assemble_executable().unwrap();
    assert_eq!(wasm, b"\0asm\x01\0\0\0");
}

#[test]
fn import_and_export_are_visible_to_parser() {
    let wasm = log_and_get().assemble_executable().unwrap();
    assert!(is_valid_wasm(&wasm));

    let imports = get_imports(&wasm);
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].0, "env");
    assert_eq!(imports[0].1, "log");
    assert!(matches!(imports[0].2, TypeRef::Func(0)));

    assert_eq!(
        get_exports(&wasm),
        vec![("get".to_string(), wasmparser::ExternalKind::Func, 1)]
    );
}

#[test]
fn sections_appear_in_format_order() {
    let mut m = log_and_get();
    m.new_table(RefType::FuncRef, Limits::at_least(1), None).unwrap();
    m.new_memory(1, Some(2), Some("memory")).unwrap();
    m.new_global(GlobalType::mutable(ValType::I32), ConstExpr::I32(7), Some("g"))
        .unwrap();
    m.new_function(void(), &[], vec![], FunctionOptions::new().start())
        .unwrap();
    m.new_data(0, b"hello".to_vec()).unwrap();
    m.add_custom_section("meta", b"x".to_vec());

    let wasm = m.assemble_executable().unwrap();
    let expected: Vec<u8> = [
        SectionId::Type,
        SectionId::Import,
        SectionId::Function,
        SectionId::Table,
        SectionId::Memory,
        SectionId::Global,
        SectionId::Export,
        SectionId::Start,
        SectionId::DataCount,
        SectionId::Code,
        SectionId::Data,
        SectionId::Custom,
    ]
    .into_iter()
    .map(u8::from)
    .collect();
    assert_eq!(section_ids(&wasm), expected);
}

#[test]
fn sections_without_entries_are_omitted() {
    let wasm = log_and_get().serialize();
    let ids = section_ids(&wasm);
    assert!(!ids.contains(&u8::from(SectionId::Memory)));
    assert!(!ids.contains(&u8::from(SectionId::Table)));
    assert!(!ids.contains(&u8::from(SectionId::Global)));
    assert!(!ids.contains(&u8::from(SectionId::Start)));
    assert!(!ids.contains(&u8::from(SectionId::Data)));
    assert!(!ids.contains(&u8::from(SectionId::DataCount)));
}

#[test]
fn serialize_is_deterministic() {
    let m = log_and_get();
    let first = m.serialize();
    let second = m.serialize();
    assert_eq!(first, second);
    assert_eq!(m.assemble_executable().unwrap(), first);
}

// ══════════════════════════════════════════════════════════════════════════════
// Index Spaces and Types
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn local_functions_are_numbered_after_imports() {
    let mut m = ModuleAssembler::new();
    m.new_import(
        "env",
        [
            ("a", ImportDesc::Func(void())),
            ("b", ImportDesc::Func(FuncType::new([ValType::I32], []))),
        ],
    )
    .unwrap();
    let indices: Vec<u32> = (0..3)
        .map(|i| {
            m.new_function(
                returns_i32(),
                &[],
                const_body(i),
                FunctionOptions::new().export(format!("f{i}")),
            )
            .unwrap()
        })
        .collect();
    assert_eq!(indices, vec![2, 3, 4]);

    let wasm = m.assemble_executable().unwrap();
    let exports = get_exports(&wasm);
    assert_eq!(exports[2], ("f2".to_string(), wasmparser::ExternalKind::Func, 4));
}

#[test]
fn identical_signatures_share_one_type() {
    let mut m = ModuleAssembler::new();
    let sig = FuncType::new([ValType::I32], []);
    m.import_function("env", "a", sig.clone()).unwrap();
    m.new_function(sig.clone(), &[], vec![], FunctionOptions::new())
        .unwrap();
    m.new_function(sig, &[], vec![], FunctionOptions::new())
        .unwrap();
    m.new_function(returns_i32(), &[], const_body(0), FunctionOptions::new())
        .unwrap();
    assert_eq!(m.types().len(), 2);

    let wasm = m.assemble_executable().unwrap();
    assert_eq!(get_function_types(&wasm), vec![0, 0, 1]);
    assert!(matches!(get_imports(&wasm)[0].2, TypeRef::Func(0)));
}

#[test]
fn function_of_registered_type() {
    let mut m = log_and_get();
    let type_index = m.types().lookup(&returns_i32()).unwrap();
    let index = m
        .new_function_of_type(type_index, &[], const_body(1), FunctionOptions::new())
        .unwrap();
    assert_eq!(index, 2);
    assert_eq!(m.types().len(), 2);
    assert!(is_valid_wasm(&m.serialize()));
}

#[test]
fn locals_and_params_are_addressable() {
    let mut m = ModuleAssembler::new();
    let body = Instructions::new()
        .local_get(0)
        .local_set(1)
        .local_get(1)
        .to_vec();
    m.new_function(
        FuncType::new([ValType::I32], [ValType::I32]),
        &[(1, ValType::I32)],
        body,
        FunctionOptions::new().export("id"),
    )
    .unwrap();
    assert!(m.assemble_executable().is_ok());
}

// ══════════════════════════════════════════════════════════════════════════════
// Memory, Tables, Globals, Data
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn imported_memory_occupies_index_zero() {
    let mut m = ModuleAssembler::new();
    let index = m
        .import("env", "memory", ImportDesc::Memory(Limits::bounded(1, 4)))
        .unwrap();
    assert_eq!(index, 0);
    m.new_data(8, b"abc".to_vec()).unwrap();
    let wasm = m.assemble_executable().unwrap();
    assert!(matches!(get_imports(&wasm)[0].2, TypeRef::Memory(_)));
}

#[test]
fn imported_table_and_global_precede_local_ones() {
    let mut m = ModuleAssembler::new();
    m.import(
        "env",
        "table",
        ImportDesc::Table(TableType {
            element: RefType::FuncRef,
            limits: Limits::at_least(0),
        }),
    )
    .unwrap();
    m.import("env", "base", ImportDesc::Global(GlobalType::immutable(ValType::I32)))
        .unwrap();
    let table = m
        .new_table(RefType::ExternRef, Limits::bounded(0, 8), Some("refs"))
        .unwrap();
    let global = m
        .new_global(GlobalType::immutable(ValType::I32), ConstExpr::GlobalGet(0), Some("copy"))
        .unwrap();
    assert_eq!((table, global), (1, 1));
    assert!(m.assemble_executable().is_ok());
}

#[test]
fn global_initializers_of_every_kind_validate() {
    let mut m = ModuleAssembler::new();
    let f = m
        .new_function(void(), &[], vec![], FunctionOptions::new())
        .unwrap();
    m.new_global(GlobalType::immutable(ValType::I64), ConstExpr::I64(-5), None)
        .unwrap();
    m.new_global(GlobalType::mutable(ValType::F32), ConstExpr::F32(1.5), None)
        .unwrap();
    m.new_global(GlobalType::immutable(ValType::F64), ConstExpr::F64(-0.25), None)
        .unwrap();
    m.new_global(
        GlobalType::immutable(ValType::ExternRef),
        ConstExpr::RefNull(RefType::ExternRef),
        None,
    )
    .unwrap();
    m.new_global(GlobalType::immutable(ValType::FuncRef), ConstExpr::RefFunc(f), None)
        .unwrap();
    // ref.func in a global initializer declares the function as referenced.
    assert!(m.assemble_executable().is_ok());
}

#[test]
fn ref_func_initializer_checks_function_index() {
    let mut m = ModuleAssembler::new();
    let err = m
        .new_global(GlobalType::immutable(ValType::FuncRef), ConstExpr::RefFunc(0), None)
        .unwrap_err();
    assert_eq!(
        err,
        AssemblyError::IndexOutOfRange {
            kind: ExternalKind::Func,
            index: 0,
            count: 0,
        }
    );
}

#[test]
fn data_segments_validate_with_count() {
    let mut m = ModuleAssembler::new();
    m.new_memory(1, None, Some("memory")).unwrap();
    assert_eq!(m.new_data(0, b"first".to_vec()).unwrap(), 0);
    assert_eq!(m.new_data(1024, b"second".to_vec()).unwrap(), 1);
    let wasm = m.assemble_executable().unwrap();

    let count = WasmParser::new(0)
        .parse_all(&wasm)
        .find_map(|payload| match payload {
            Ok(Payload::DataCountSection { count, .. }) => Some(count),
            _ => None,
        });
    assert_eq!(count, Some(2));
}

// ══════════════════════════════════════════════════════════════════════════════
// Start Function
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn start_function_is_recorded() {
    let mut m = log_and_get();
    let start = m
        .new_function(void(), &[], vec![], FunctionOptions::new().start())
        .unwrap();
    assert_eq!(m.start(), Some(start));
    let wasm = m.assemble_executable().unwrap();
    assert_eq!(get_start(&wasm), Some(2));
}

#[test]
fn second_start_function_is_rejected() {
    let mut m = ModuleAssembler::new();
    m.new_function(void(), &[], vec![], FunctionOptions::new().start())
        .unwrap();
    let err = m
        .new_function(void(), &[], vec![], FunctionOptions::new().start())
        .unwrap_err();
    assert_eq!(err, AssemblyError::DuplicateStart { existing: 0 });
    assert_eq!(err.category(), ErrorCategory::Declaration);
    assert_eq!(m.function_count(), 1);
}

#[test]
fn start_function_with_params_or_results_is_rejected() {
    let mut m = ModuleAssembler::new();
    for ty in [FuncType::new([ValType::I32], []), returns_i32()] {
        let err = m
            .new_function(ty, &[], const_body(0), FunctionOptions::new().start())
            .unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidStartSignature { .. }));
    }
    assert_eq!(m.function_count(), 0);
    assert_eq!(m.start(), None);
}

// ══════════════════════════════════════════════════════════════════════════════
// Declaration Errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn second_memory_is_rejected() {
    let mut m = ModuleAssembler::new();
    m.new_memory(1, None, None).unwrap();
    assert_eq!(m.new_memory(1, None, None), Err(AssemblyError::DuplicateMemory));
    assert_eq!(
        m.import("env", "memory", ImportDesc::Memory(Limits::at_least(1))),
        Err(AssemblyError::DuplicateMemory)
    );
    assert_eq!(m.memory_count(), 1);
}

#[test]
fn local_memory_after_imported_memory_is_rejected() {
    let mut m = ModuleAssembler::new();
    m.import("env", "memory", ImportDesc::Memory(Limits::at_least(1)))
        .unwrap();
    assert_eq!(m.new_memory(1, None, None), Err(AssemblyError::DuplicateMemory));
}

#[test]
fn duplicate_export_names_are_rejected() {
    let mut m = log_and_get();
    let err = m
        .new_function(returns_i32(), &[], const_body(0), FunctionOptions::new().export("get"))
        .unwrap_err();
    assert_eq!(err, AssemblyError::DuplicateExport("get".into()));
    assert_eq!(
        m.new_memory(1, None, Some("get")),
        Err(AssemblyError::DuplicateExport("get".into()))
    );
    assert_eq!(m.function_count(), 2);
    assert!(!m.has_memory());
}

#[test]
fn explicit_export_checks_index_space() {
    let mut m = log_and_get();
    m.new_export("log", ExternalKind::Func, 0).unwrap();
    assert_eq!(
        m.new_export("nothing", ExternalKind::Func, 2),
        Err(AssemblyError::IndexOutOfRange {
            kind: ExternalKind::Func,
            index: 2,
            count: 2,
        })
    );
    assert!(matches!(
        m.new_export("table", ExternalKind::Table, 0),
        Err(AssemblyError::IndexOutOfRange { .. })
    ));

    let wasm = m.assemble_executable().unwrap();
    let names: Vec<String> = get_exports(&wasm).into_iter().map(|e| e.0).collect();
    assert_eq!(names, vec!["get", "log"]);
}

#[test]
fn global_import_after_local_global_is_rejected() {
    let mut m = ModuleAssembler::new();
    m.new_global(GlobalType::immutable(ValType::I32), ConstExpr::I32(0), None)
        .unwrap();
    let err = m
        .import("env", "g", ImportDesc::Global(GlobalType::immutable(ValType::I32)))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Declaration);
    assert!(err.to_string().contains("env"));
}

#[test]
fn ill_typed_body_fails_validation_only() {
    let mut m = ModuleAssembler::new();
    // Declared to return i32 but the body leaves nothing on the stack.
    m.new_function(returns_i32(), &[], vec![], FunctionOptions::new())
        .unwrap();
    let bytes = m.serialize();
    assert!(!is_valid_wasm(&bytes));

    let err = m.assemble_executable().unwrap_err();
    assert!(matches!(err, AssemblyError::ValidationFailed(_)));
    assert_eq!(err.category(), ErrorCategory::Validation);
}

// ══════════════════════════════════════════════════════════════════════════════
// Manifest
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn manifest_describes_the_boundary() {
    let mut m = log_and_get();
    m.new_memory(1, None, Some("memory")).unwrap();
    let manifest = m.manifest();

    assert_eq!(manifest.imports.len(), 1);
    let log = &manifest.imports[0];
    assert_eq!((log.namespace.as_str(), log.name.as_str()), ("env", "log"));
    assert_eq!(log.signature, Some(FuncType::new([ValType::F32], [])));

    let memory = manifest.find_export("memory").unwrap();
    assert_eq!((memory.kind, memory.index), (ExternalKind::Memory, 0));
    assert_eq!(manifest.start, None);
}

#[test]
fn manifest_travels_in_custom_section() {
    let mut m = log_and_get();
    let manifest = m.manifest();
    m.add_custom_section("wasmith.manifest", manifest.to_json().unwrap());

    let wasm = m.assemble_executable().unwrap();
    let data = get_custom(&wasm, "wasmith.manifest").expect("manifest section missing");
    assert_eq!(ModuleManifest::from_json(&data).unwrap(), manifest);
    assert_eq!(section_ids(&wasm).last(), Some(&u8::from(SectionId::Custom)));
}

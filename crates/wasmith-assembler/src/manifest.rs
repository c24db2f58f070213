//! Module manifest: what a host must supply and what it gets back.
//!
//! The manifest lists every import in declaration order (the order in which
//! a host resolves them) and every export.  It serializes to JSON so it can
//! travel next to the binary or be embedded in a custom section.

use serde::{Deserialize, Serialize};
use wasmith_types::{ExternalKind, FuncType};

/// Description of a module's instantiation boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub imports: Vec<ImportEntry>,
    pub exports: Vec<ExportEntry>,
    /// Function index of the start function.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start: Option<u32>,
}

/// One import the host must resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportEntry {
    pub namespace: String,
    pub name: String,
    pub kind: ExternalKind,
    /// Index within the kind's index space.
    pub index: u32,
    /// Signature the supplied callable must have (function imports only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<FuncType>,
}

/// One export the host can look up after instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub name: String,
    pub kind: ExternalKind,
    pub index: u32,
}

impl ModuleManifest {
    pub fn find_export(&self, name: &str) -> Option<&ExportEntry> {
        self.exports.iter().find(|e| e.name == name)
    }

    /// Imports from one namespace, in declaration order.
    pub fn imports_from<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a ImportEntry> + 'a {
        self.imports.iter().filter(move |i| i.namespace == namespace)
    }

    /// Serialize to JSON bytes for shipping or embedding in a custom section.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmith_types::ValType;

    fn sample() -> ModuleManifest {
        ModuleManifest {
            imports: vec![ImportEntry {
                namespace: "env".into(),
                name: "log".into(),
                kind: ExternalKind::Func,
                index: 0,
                signature: Some(FuncType::new([ValType::F32], [])),
            }],
            exports: vec![ExportEntry {
                name: "get".into(),
                kind: ExternalKind::Func,
                index: 1,
            }],
            start: None,
        }
    }

    #[test]
    fn round_trip_json() {
        let manifest = sample();
        let json = manifest.to_json().expect("serialize failed");
        let back = ModuleManifest::from_json(&json).expect("parse failed");
        assert_eq!(back, manifest);
    }

    #[test]
    fn json_shape() {
        let json = String::from_utf8(sample().to_json().unwrap()).unwrap();
        assert!(json.contains("\"kind\":\"func\""));
        assert!(json.contains("\"params\":[\"f32\"]"));
        assert!(!json.contains("\"start\""));
    }

    #[test]
    fn malformed_json_reports_error() {
        let err = ModuleManifest::from_json(b"{\"imports\":[").unwrap_err();
        assert!(err.is_eof());
        let err = ModuleManifest::from_json(b"{\"imports\":[],\"exports\":7}").unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn lookups() {
        let manifest = sample();
        assert_eq!(manifest.find_export("get").map(|e| e.index), Some(1));
        assert!(manifest.find_export("missing").is_none());
        assert_eq!(manifest.imports_from("env").count(), 1);
        assert_eq!(manifest.imports_from("wasi").count(), 0);
    }
}

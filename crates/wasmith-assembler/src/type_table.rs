//! Deduplicating registry of function signatures.
//!
//! The key of each entry is the signature's encoded form
//! (`0x60 ++ vec(params) ++ vec(results)`), so two signatures collapse to one
//! entry exactly when they would encode identically.  Indices are dense,
//! start at 0, follow first-registration order and never change.

use indexmap::IndexMap;
use wasmith_encoding::Encode;
use wasmith_types::FuncType;

#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    entries: IndexMap<Vec<u8>, FuncType>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signature, returning its (possibly pre-existing) index.
    pub fn register(&mut self, ty: &FuncType) -> u32 {
        let entry = self.entries.entry(ty.to_bytes());
        let index = entry.index();
        entry.or_insert_with(|| ty.clone());
        index as u32
    }

    /// Index of an already-registered signature.
    pub fn lookup(&self, ty: &FuncType) -> Option<u32> {
        self.entries.get_index_of(&ty.to_bytes()).map(|i| i as u32)
    }

    pub fn get(&self, index: u32) -> Option<&FuncType> {
        self.entries
            .get_index(index as usize)
            .map(|(_, ty)| ty)
    }

    /// Encoded form of the entry at `index`.
    pub fn encoded(&self, index: u32) -> Option<&[u8]> {
        self.entries
            .get_index(index as usize)
            .map(|(bytes, _)| bytes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FuncType)> + '_ {
        self.entries
            .values()
            .enumerate()
            .map(|(i, ty)| (i as u32, ty))
    }

    /// Encoded entries in index order, ready for the type section.
    pub(crate) fn encoded_entries(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.entries.keys().map(Vec::as_slice)
    }
}

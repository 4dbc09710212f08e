// Return Tuple Info
//
// The final output row shape of a context: field name, backing column (if the
// field maps straight to one) and position.

use linked_hash_map::LinkedHashMap;

use crate::metadata::TblColRef;

#[derive(Debug, Clone, Default)]
pub struct TupleInfo {
    /// field name -> position, in insertion order
    fields: LinkedHashMap<String, usize>,
    /// position -> backing column
    columns: Vec<Option<TblColRef>>,
}

impl TupleInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field at `index`, growing the tuple as needed
    pub fn set_field(&mut self, name: impl Into<String>, col: Option<TblColRef>, index: usize) {
        self.fields.insert(name.into(), index);
        if self.columns.len() <= index {
            self.columns.resize(index + 1, None);
        }
        self.columns[index] = col;
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.get(name).copied()
    }

    pub fn column_at(&self, index: usize) -> Option<&TblColRef> {
        self.columns.get(index).and_then(Option::as_ref)
    }

    pub fn column_index(&self, col: &TblColRef) -> Option<usize> {
        self.columns.iter().position(|c| c.as_ref() == Some(col))
    }

    pub fn has_column(&self, col: &TblColRef) -> bool {
        self.column_index(col).is_some()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn size(&self) -> usize {
        self.columns.len()
    }
}

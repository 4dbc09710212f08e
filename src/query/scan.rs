// Table Scan Module
//
// A table scan registered into a query context, and the column row type it
// outputs. The row type can be temporarily re-resolved against a canonical
// data model (model fixing) and restored exactly afterwards.

use serde::{Serialize, Deserialize};

use crate::metadata::{DataModelDesc, TableDesc, TblColRef};
use std::collections::HashMap;

/// Ordered output columns of a plan node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnRowType {
    columns: Vec<TblColRef>,
}

impl ColumnRowType {
    pub fn new(columns: Vec<TblColRef>) -> Self {
        ColumnRowType { columns }
    }

    pub fn all_columns(&self) -> &[TblColRef] {
        &self.columns
    }

    pub fn column_by_index(&self, index: usize) -> Option<&TblColRef> {
        self.columns.get(index)
    }

    pub fn index_of(&self, col: &TblColRef) -> Option<usize> {
        self.columns.iter().position(|c| c == col)
    }

    pub fn contains(&self, col: &TblColRef) -> bool {
        self.columns.contains(col)
    }

    /// Find a column by name, ignoring the alias
    pub fn column_by_name(&self, name: &str) -> Option<&TblColRef> {
        self.columns.iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Positional column substitution between two row types of the same scans
#[derive(Debug, Default)]
pub(crate) struct ColumnRebinder {
    map: HashMap<TblColRef, TblColRef>,
}

impl ColumnRebinder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Map every column of `from` to the column at the same position in `to`
    pub(crate) fn add(&mut self, from: &ColumnRowType, to: &ColumnRowType) {
        for (f, t) in from.all_columns().iter().zip(to.all_columns()) {
            self.map.insert(f.clone(), t.clone());
        }
    }

    pub(crate) fn rebind(&self, col: &TblColRef) -> Option<TblColRef> {
        self.map.get(col).cloned()
    }
}

/// A scan over one aliased source table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableScan {
    alias: String,
    table: TableDesc,
    column_row_type: ColumnRowType,
    /// Row type before model fixing, present only while fixed
    unfixed: Option<ColumnRowType>,
}

impl TableScan {
    /// Scan every column of `table` through `alias`
    pub fn new(alias: impl Into<String>, table: TableDesc) -> Self {
        let alias = alias.into();
        let columns = table
            .columns()
            .iter()
            .map(|c| TblColRef::new(alias.clone(), table.name(), c.clone()))
            .collect();
        TableScan {
            alias,
            table,
            column_row_type: ColumnRowType::new(columns),
            unfixed: None,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn table(&self) -> &TableDesc {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    pub fn column_row_type(&self) -> &ColumnRowType {
        &self.column_row_type
    }

    pub fn is_fixed(&self) -> bool {
        self.unfixed.is_some()
    }

    /// Reference to one of this scan's output columns by name
    pub fn column(&self, name: &str) -> Option<TblColRef> {
        self.column_row_type.column_by_name(name).cloned()
    }

    /// Resolve this scan's columns against `model`, without applying.
    ///
    /// The scan alias is translated through `alias_map`; an alias missing
    /// from the map is taken to already be canonical.
    pub(crate) fn resolve_with_model(
        &self,
        model: &DataModelDesc,
        alias_map: &HashMap<String, String>,
    ) -> Result<ColumnRowType, String> {
        let canonical = alias_map.get(&self.alias).map(String::as_str).unwrap_or(&self.alias);
        let model_table = model
            .find_table(canonical)
            .ok_or_else(|| format!("alias '{}' (scan '{}') is not a table of the model", canonical, self.alias))?;

        if model_table.table().name() != self.table.name() {
            return Err(format!(
                "alias '{}' is table {} in the model but scan '{}' reads {}",
                canonical,
                model_table.table().name(),
                self.alias,
                self.table.name()
            ));
        }

        let mut columns = Vec::with_capacity(self.column_row_type.len());
        for col in self.column_row_type.all_columns() {
            let fixed = model_table
                .column(col.name())
                .ok_or_else(|| format!("column {} is missing from model table {}", col, canonical))?;
            columns.push(fixed);
        }
        Ok(ColumnRowType::new(columns))
    }

    /// Swap in a model-resolved row type, remembering the current one
    pub(crate) fn apply_fixed(&mut self, fixed: ColumnRowType) {
        let original = std::mem::replace(&mut self.column_row_type, fixed);
        self.unfixed = Some(original);
    }

    /// Row type from before model fixing, while fixed
    pub(crate) fn unfixed_row_type(&self) -> Option<&ColumnRowType> {
        self.unfixed.as_ref()
    }

    /// Restore the row type captured by `apply_fixed`
    pub(crate) fn restore_unfixed(&mut self) {
        if let Some(original) = self.unfixed.take() {
            self.column_row_type = original;
        }
    }
}

// Column Reference Model
//
// This module defines column and table descriptors, and the TblColRef handle
// used as a map/set key throughout query contexts and digests.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use serde::{Serialize, Deserialize};

use super::types::DataType;

/// A column as declared by a source table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDesc {
    /// Column name
    name: String,
    /// Declared type
    data_type: DataType,
}

impl ColumnDesc {
    /// Create a new column descriptor
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        ColumnDesc {
            name: name.into(),
            data_type,
        }
    }

    /// Get the column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the declared data type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// A source table and its columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDesc {
    /// Fully qualified table identity, e.g. `DEFAULT.SALES`
    name: String,
    columns: Vec<ColumnDesc>,
}

impl TableDesc {
    /// Create a new table descriptor
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDesc>) -> Self {
        TableDesc {
            name: name.into(),
            columns,
        }
    }

    /// Get the table identity
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get all columns in declaration order
    pub fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }

    /// Find a column by name (case-insensitive, like SQL identifiers)
    pub fn find_column(&self, name: &str) -> Option<&ColumnDesc> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Reference to a column through a table alias.
///
/// Identity is the (table alias, column name) pair: two references to the
/// same physical column through different aliases are different keys, which
/// is what self-joins and repeated lookup tables need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TblColRef {
    /// Alias the column is reached through
    table_alias: String,
    /// Identity of the table the alias resolves to
    table: String,
    /// Column descriptor
    column: ColumnDesc,
}

impl TblColRef {
    /// Create a reference to `column` of `table` through `table_alias`
    pub fn new(table_alias: impl Into<String>, table: impl Into<String>, column: ColumnDesc) -> Self {
        TblColRef {
            table_alias: table_alias.into(),
            table: table.into(),
            column,
        }
    }

    /// Shorthand for a reference whose alias is the table's own name
    pub fn of_table(table: &TableDesc, column: &str) -> Option<Self> {
        let col = table.find_column(column)?;
        Some(TblColRef::new(table.name(), table.name(), col.clone()))
    }

    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn name(&self) -> &str {
        self.column.name()
    }

    pub fn column(&self) -> &ColumnDesc {
        &self.column
    }

    pub fn data_type(&self) -> DataType {
        self.column.data_type()
    }

    /// Same column reached through a different alias
    pub fn with_alias(&self, table_alias: impl Into<String>) -> Self {
        TblColRef {
            table_alias: table_alias.into(),
            table: self.table.clone(),
            column: self.column.clone(),
        }
    }
}

impl PartialEq for TblColRef {
    fn eq(&self, other: &Self) -> bool {
        self.table_alias == other.table_alias && self.column.name() == other.column.name()
    }
}

impl Eq for TblColRef {}

impl Hash for TblColRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table_alias.hash(state);
        self.column.name().hash(state);
    }
}

impl PartialOrd for TblColRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TblColRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.table_alias
            .cmp(&other.table_alias)
            .then_with(|| self.column.name().cmp(other.column.name()))
    }
}

impl fmt::Display for TblColRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table_alias, self.column.name())
    }
}

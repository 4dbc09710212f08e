// Column Data Types
//
// This module defines the declared SQL types a column reference can carry.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Data types a model column can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    BigInt,
    Decimal,
    Double,
    Varchar,
    Boolean,
    Date,
    Time,
    Timestamp,
}

impl DataType {
    /// Convert a string representation to a DataType
    pub fn from_str(s: &str) -> Result<Self, String> {
        // Strip precision suffixes like VARCHAR(256) or DECIMAL(19,4)
        let base = s.split('(').next().unwrap_or(s).trim();
        match base.to_uppercase().as_str() {
            "INT" | "INTEGER" | "SMALLINT" | "TINYINT" => Ok(DataType::Integer),
            "BIGINT" | "LONG" => Ok(DataType::BigInt),
            "DECIMAL" | "NUMERIC" => Ok(DataType::Decimal),
            "FLOAT" | "REAL" | "DOUBLE" => Ok(DataType::Double),
            "VARCHAR" | "CHAR" | "STRING" | "TEXT" => Ok(DataType::Varchar),
            "BOOL" | "BOOLEAN" => Ok(DataType::Boolean),
            "DATE" => Ok(DataType::Date),
            "TIME" => Ok(DataType::Time),
            "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp),
            _ => Err(format!("Unknown data type: {}", s)),
        }
    }

    /// Date, time and timestamp columns compare against epoch milliseconds
    pub fn is_datetime_family(&self) -> bool {
        matches!(self, DataType::Date | DataType::Time | DataType::Timestamp)
    }

    pub fn is_numeric_family(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::BigInt | DataType::Decimal | DataType::Double
        )
    }

    pub fn is_string_family(&self) -> bool {
        matches!(self, DataType::Varchar)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::BigInt => "BIGINT",
            DataType::Decimal => "DECIMAL",
            DataType::Double => "DOUBLE",
            DataType::Varchar => "VARCHAR",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP",
        };
        write!(f, "{}", name)
    }
}

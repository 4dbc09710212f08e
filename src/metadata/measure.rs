// Measures and Aggregate Functions
//
// Storage-level aggregate descriptors (what a realization precomputes) and the
// SQL-level calls that are layered on top of them.

use std::fmt;
use serde::{Serialize, Deserialize};

use super::column::TblColRef;
use super::types::DataType;

/// Aggregate expressions a storage layer can compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionExpr {
    Sum,
    Count,
    Min,
    Max,
    CountDistinct,
}

impl FunctionExpr {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_uppercase().as_str() {
            "SUM" => Ok(FunctionExpr::Sum),
            "COUNT" => Ok(FunctionExpr::Count),
            "MIN" => Ok(FunctionExpr::Min),
            "MAX" => Ok(FunctionExpr::Max),
            "COUNT_DISTINCT" => Ok(FunctionExpr::CountDistinct),
            _ => Err(format!("Unknown aggregate function: {}", s)),
        }
    }
}

impl fmt::Display for FunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FunctionExpr::Sum => "SUM",
            FunctionExpr::Count => "COUNT",
            FunctionExpr::Min => "MIN",
            FunctionExpr::Max => "MAX",
            FunctionExpr::CountDistinct => "COUNT_DISTINCT",
        };
        write!(f, "{}", name)
    }
}

/// A storage-level aggregate: expression, parameter column and return type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionDesc {
    pub expression: FunctionExpr,
    /// None for COUNT(*) / COUNT(1)
    pub parameter: Option<TblColRef>,
    pub return_type: DataType,
}

impl FunctionDesc {
    pub fn new(expression: FunctionExpr, parameter: Option<TblColRef>, return_type: DataType) -> Self {
        FunctionDesc { expression, parameter, return_type }
    }

    pub fn count_star() -> Self {
        FunctionDesc::new(FunctionExpr::Count, None, DataType::BigInt)
    }

    pub fn is_count(&self) -> bool {
        self.expression == FunctionExpr::Count
    }
}

impl fmt::Display for FunctionDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameter {
            Some(col) => write!(f, "{}({})", self.expression, col),
            None => write!(f, "{}(1)", self.expression),
        }
    }
}

/// A measure defined on a realization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasureDesc {
    pub name: String,
    pub function: FunctionDesc,
}

impl MeasureDesc {
    pub fn new(name: impl Into<String>, function: FunctionDesc) -> Self {
        MeasureDesc { name: name.into(), function }
    }
}

/// Argument to a SQL-level call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlCallArg {
    Column(TblColRef),
    Literal(String),
}

/// A SQL-level aggregate call, e.g. AVG(price) backed by SUM and COUNT
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlCall {
    pub function: String,
    pub args: Vec<SqlCallArg>,
}

impl SqlCall {
    pub fn new(function: impl Into<String>, args: Vec<SqlCallArg>) -> Self {
        SqlCall {
            function: function.into().to_uppercase(),
            args,
        }
    }
}

impl fmt::Display for SqlCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| match a {
                SqlCallArg::Column(c) => c.to_string(),
                SqlCallArg::Literal(l) => l.clone(),
            })
            .collect();
        write!(f, "{}({})", self.function, args.join(", "))
    }
}

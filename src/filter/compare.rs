// Compare Filter
//
// A leaf predicate comparing one column against constant operands, some of
// which may be named runtime placeholders bound just before execution.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::metadata::TblColRef;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    /// Parse an operator symbol or keyword
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_uppercase().as_str() {
            "=" | "==" | "EQ" => Ok(CompareOp::Eq),
            "<>" | "!=" | "NEQ" => Ok(CompareOp::Neq),
            "<" | "LT" => Ok(CompareOp::Lt),
            "<=" | "LTE" => Ok(CompareOp::Lte),
            ">" | "GT" => Ok(CompareOp::Gt),
            ">=" | "GTE" => Ok(CompareOp::Gte),
            "IN" => Ok(CompareOp::In),
            "NOT IN" | "NOT_IN" => Ok(CompareOp::NotIn),
            "IS NULL" | "IS_NULL" => Ok(CompareOp::IsNull),
            "IS NOT NULL" | "IS_NOT_NULL" => Ok(CompareOp::IsNotNull),
            _ => Err(format!("Unknown compare operator: {}", s)),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::In => "IN",
            CompareOp::NotIn => "NOT IN",
            CompareOp::IsNull => "IS NULL",
            CompareOp::IsNotNull => "IS NOT NULL",
        };
        write!(f, "{}", s)
    }
}

/// Right-hand operand of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Literal, already in the column's storage representation
    Constant(String),
    /// Named placeholder; `value` is filled by binding
    Dynamic { name: String, value: Option<String> },
}

/// `column <op> operands`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompareTupleFilter {
    op: CompareOp,
    column: TblColRef,
    operands: Vec<Operand>,
}

impl CompareTupleFilter {
    pub fn new(op: CompareOp, column: TblColRef) -> Self {
        CompareTupleFilter { op, column, operands: Vec::new() }
    }

    /// Builder: append a constant operand
    pub fn with_constant(mut self, value: impl Into<String>) -> Self {
        self.operands.push(Operand::Constant(value.into()));
        self
    }

    /// Builder: append an unbound placeholder
    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        self.operands.push(Operand::Dynamic { name: name.into(), value: None });
        self
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn column(&self) -> &TblColRef {
        &self.column
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub(crate) fn rebind_column(&mut self, rebind: &impl Fn(&TblColRef) -> Option<TblColRef>) {
        if let Some(to) = rebind(&self.column) {
            self.column = to;
        }
    }

    /// Names of all placeholders, bound or not, in operand order
    pub fn variables(&self) -> Vec<String> {
        self.operands
            .iter()
            .filter_map(|o| match o {
                Operand::Dynamic { name, .. } => Some(name.clone()),
                Operand::Constant(_) => None,
            })
            .collect()
    }

    /// Bind `value` to every placeholder called `name`. Returns whether any
    /// placeholder matched.
    pub fn bind_variable(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let mut bound = false;
        for operand in &mut self.operands {
            if let Operand::Dynamic { name: n, value: v } = operand {
                if n == name {
                    *v = Some(value.clone());
                    bound = true;
                }
            }
        }
        bound
    }

    /// Value currently bound to `name`
    pub fn bound_value(&self, name: &str) -> Option<&str> {
        self.operands.iter().find_map(|o| match o {
            Operand::Dynamic { name: n, value: Some(v) } if n == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// Constants plus bound placeholder values, in operand order
    pub fn values(&self) -> Vec<&str> {
        self.operands
            .iter()
            .filter_map(|o| match o {
                Operand::Constant(c) => Some(c.as_str()),
                Operand::Dynamic { value, .. } => value.as_deref(),
            })
            .collect()
    }

    /// True when no placeholder is left unbound
    pub fn is_evaluable(&self) -> bool {
        self.operands
            .iter()
            .all(|o| !matches!(o, Operand::Dynamic { value: None, .. }))
    }
}

impl fmt::Display for CompareTupleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands: Vec<String> = self
            .operands
            .iter()
            .map(|o| match o {
                Operand::Constant(c) => format!("'{}'", c),
                Operand::Dynamic { name, value: Some(v) } => format!("'{}' /*{}*/", v, name),
                Operand::Dynamic { name, value: None } => format!("${}", name),
            })
            .collect();
        match self.op {
            CompareOp::IsNull | CompareOp::IsNotNull => write!(f, "{} {}", self.column, self.op),
            CompareOp::In | CompareOp::NotIn => {
                write!(f, "{} {} ({})", self.column, self.op, operands.join(", "))
            }
            _ => write!(f, "{} {} {}", self.column, self.op, operands.join(", ")),
        }
    }
}

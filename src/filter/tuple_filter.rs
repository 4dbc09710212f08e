// Tuple Filter Tree
//
// The predicate tree pushed down to storage: logical connectives over compare
// leaves, plus constant true/false nodes left behind by simplification.

use std::collections::BTreeSet;
use std::fmt;
use serde::{Serialize, Deserialize};

use super::compare::CompareTupleFilter;
use crate::metadata::TblColRef;

/// Logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// A node of the predicate tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TupleFilter {
    Logical {
        op: LogicalOp,
        children: Vec<TupleFilter>,
    },
    Compare(CompareTupleFilter),
    Constant(bool),
}

impl TupleFilter {
    pub fn and(children: Vec<TupleFilter>) -> Self {
        TupleFilter::Logical { op: LogicalOp::And, children }
    }

    pub fn or(children: Vec<TupleFilter>) -> Self {
        TupleFilter::Logical { op: LogicalOp::Or, children }
    }

    pub fn not(child: TupleFilter) -> Self {
        TupleFilter::Logical { op: LogicalOp::Not, children: vec![child] }
    }

    pub fn children(&self) -> &[TupleFilter] {
        match self {
            TupleFilter::Logical { children, .. } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [TupleFilter] {
        match self {
            TupleFilter::Logical { children, .. } => children,
            _ => &mut [],
        }
    }

    /// Every column referenced by a compare leaf
    pub fn referenced_columns(&self) -> BTreeSet<TblColRef> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<TblColRef>) {
        if let TupleFilter::Compare(cmp) = self {
            out.insert(cmp.column().clone());
        }
        for child in self.children() {
            child.collect_columns(out);
        }
    }

    /// Replace the column of every compare leaf that `rebind` maps
    pub(crate) fn rebind_columns(&mut self, rebind: &impl Fn(&TblColRef) -> Option<TblColRef>) {
        if let TupleFilter::Compare(cmp) = self {
            cmp.rebind_column(rebind);
        }
        for child in self.children_mut() {
            child.rebind_columns(rebind);
        }
    }

    /// True when no compare leaf still carries an unbound placeholder
    pub fn is_evaluable(&self) -> bool {
        match self {
            TupleFilter::Compare(cmp) => cmp.is_evaluable(),
            _ => self.children().iter().all(TupleFilter::is_evaluable),
        }
    }
}

impl fmt::Display for TupleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TupleFilter::Constant(b) => write!(f, "{}", b),
            TupleFilter::Compare(cmp) => write!(f, "{}", cmp),
            TupleFilter::Logical { op: LogicalOp::Not, children } => match children.first() {
                Some(child) => write!(f, "NOT ({})", child),
                None => write!(f, "NOT ()"),
            },
            TupleFilter::Logical { op, children } => {
                let sep = if *op == LogicalOp::And { " AND " } else { " OR " };
                let parts: Vec<String> = children.iter().map(|c| format!("({})", c)).collect();
                write!(f, "{}", parts.join(sep))
            }
        }
    }
}

// Realization Contract
//
// What the query context needs to know about a realization assigned by
// routing, plus the record of why candidates were rejected.

use std::collections::HashMap;
use std::fmt;

/// Kinds of precomputed structures routing can pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RealizationType {
    Cube,
    Hybrid,
    Streaming,
    RawTable,
}

impl fmt::Display for RealizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RealizationType::Cube => "CUBE",
            RealizationType::Hybrid => "HYBRID",
            RealizationType::Streaming => "STREAMING",
            RealizationType::RawTable => "RAW_TABLE",
        };
        write!(f, "{}", s)
    }
}

/// A precomputed structure that can answer a query
pub trait Realization: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn realization_type(&self) -> RealizationType;

    /// Whether rows read from this realization carry precalculated measure
    /// fields that need rewriting back into SQL aggregates
    fn provides_precalculated_fields(&self) -> bool;
}

/// Why a candidate realization could not serve a context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncapableReason {
    ModelUnmatched,
    NotContainAllColumn(Vec<String>),
    NotContainAllMeasure(Vec<String>),
    UnsupportedJoin(String),
    Other(String),
}

impl fmt::Display for IncapableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncapableReason::ModelUnmatched => write!(f, "model unmatched"),
            IncapableReason::NotContainAllColumn(cols) => write!(f, "missing columns: {}", cols.join(", ")),
            IncapableReason::NotContainAllMeasure(ms) => write!(f, "missing measures: {}", ms.join(", ")),
            IncapableReason::UnsupportedJoin(j) => write!(f, "unsupported join: {}", j),
            IncapableReason::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Rejection log filled while routing tries candidates
#[derive(Debug, Clone, Default)]
pub struct RealizationCheck {
    model_incapable: HashMap<String, Vec<IncapableReason>>,
    realization_incapable: HashMap<String, Vec<IncapableReason>>,
}

impl RealizationCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model_incapable(&mut self, model: &str, reason: IncapableReason) {
        self.model_incapable.entry(model.to_string()).or_default().push(reason);
    }

    pub fn add_realization_incapable(&mut self, realization: &str, reason: IncapableReason) {
        self.realization_incapable
            .entry(realization.to_string())
            .or_default()
            .push(reason);
    }

    pub fn model_reasons(&self, model: &str) -> &[IncapableReason] {
        self.model_incapable.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn realization_reasons(&self, realization: &str) -> &[IncapableReason] {
        self.realization_incapable
            .get(realization)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.model_incapable.is_empty() && self.realization_incapable.is_empty()
    }
}

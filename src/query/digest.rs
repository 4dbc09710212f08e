// SQL Digest
//
// The immutable summary of a context's data and computation requirements.
// Routing matches digests against realizations; storage reads the filter,
// sort and aggregation lists from it.

use std::collections::BTreeSet;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::filter::TupleFilter;
use crate::metadata::{FunctionDesc, JoinDesc, MeasureDesc, SqlCall, TblColRef};
use super::context::QueryContext;
use super::error::{ContextError, Result};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ASC"),
            SortOrder::Descending => write!(f, "DESC"),
        }
    }
}

/// Snapshot of a query context taken for realization matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlDigest {
    pub fact_table: String,
    pub all_columns: BTreeSet<TblColRef>,
    pub joins: Vec<JoinDesc>,
    pub group_by_columns: Vec<TblColRef>,
    pub subquery_join_participants: BTreeSet<TblColRef>,
    pub metric_columns: BTreeSet<TblColRef>,
    pub aggregations: Vec<FunctionDesc>,
    pub aggr_sql_calls: Vec<SqlCall>,
    pub filter_columns: BTreeSet<TblColRef>,
    pub filter: Option<TupleFilter>,
    pub having_filter: Option<TupleFilter>,
    pub sort_columns: Vec<TblColRef>,
    pub sort_orders: Vec<SortOrder>,
    pub limit_precedes_aggr: bool,
    pub involved_measures: Vec<MeasureDesc>,
}

impl SqlDigest {
    /// Assemble the digest of `ctx`. The primary scan must be known.
    pub(crate) fn build(ctx: &QueryContext) -> Result<Self> {
        let fact = ctx.first_table_scan().ok_or(ContextError::MissingFactTable(ctx.id))?;

        Ok(SqlDigest {
            fact_table: fact.table_name().to_string(),
            all_columns: ctx.all_columns().clone(),
            joins: ctx.joins().to_vec(),
            group_by_columns: ctx.group_by_columns().to_vec(),
            subquery_join_participants: ctx.subquery_join_participants().clone(),
            metric_columns: ctx.metrics_columns().clone(),
            aggregations: ctx.aggregations().to_vec(),
            aggr_sql_calls: ctx.aggr_sql_calls().to_vec(),
            filter_columns: ctx.filter_columns().clone(),
            filter: ctx.filter().cloned(),
            having_filter: ctx.having_filter().cloned(),
            sort_columns: ctx.sort_columns().to_vec(),
            sort_orders: ctx.sort_orders().to_vec(),
            limit_precedes_aggr: ctx.limit_precedes_aggr(),
            involved_measures: ctx.involved_measures().to_vec(),
        })
    }

    /// No grouping and no aggregation: rows come back as stored
    pub fn is_raw_query(&self) -> bool {
        self.group_by_columns.is_empty() && self.aggregations.is_empty()
    }

    pub fn has_sort(&self) -> bool {
        !self.sort_columns.is_empty()
    }

    /// Group-by columns storage must honour. Subquery join participants only
    /// join the grouping when the query already groups by something.
    pub fn effective_group_by_columns(&self) -> Vec<TblColRef> {
        let mut out = self.group_by_columns.clone();
        if !out.is_empty() {
            for col in &self.subquery_join_participants {
                if !out.contains(col) {
                    out.push(col.clone());
                }
            }
        }
        out
    }

    /// Every column storage must be able to produce
    pub fn effective_all_columns(&self) -> BTreeSet<TblColRef> {
        self.all_columns
            .union(&self.subquery_join_participants)
            .cloned()
            .collect()
    }

    /// Sort keys paired with their directions
    pub fn sorts(&self) -> impl Iterator<Item = (&TblColRef, SortOrder)> {
        self.sort_columns.iter().zip(self.sort_orders.iter().copied())
    }
}

fn list<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items.into_iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for SqlDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fact table: {}", self.fact_table)?;
        writeln!(f, "all columns: {}", list(&self.all_columns))?;
        writeln!(f, "joins: {}", list(&self.joins))?;
        writeln!(f, "group by: {}", list(&self.group_by_columns))?;
        writeln!(f, "subquery join participants: {}", list(&self.subquery_join_participants))?;
        writeln!(f, "metric columns: {}", list(&self.metric_columns))?;
        writeln!(f, "aggregations: {}", list(&self.aggregations))?;
        writeln!(f, "sql calls: {}", list(&self.aggr_sql_calls))?;
        writeln!(f, "filter columns: {}", list(&self.filter_columns))?;
        match &self.filter {
            Some(filter) => writeln!(f, "filter: {}", filter)?,
            None => writeln!(f, "filter: <none>")?,
        }
        match &self.having_filter {
            Some(filter) => writeln!(f, "having: {}", filter)?,
            None => writeln!(f, "having: <none>")?,
        }
        writeln!(f, "sort: {}", list(self.sorts().map(|(c, o)| format!("{} {}", c, o))))?;
        write!(f, "limit precedes aggregation: {}", self.limit_precedes_aggr)
    }
}

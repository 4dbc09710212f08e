//! Scenario Loader
//!
//! Builds a query context from a JSON description of what a plan walk would
//! have registered: source tables, scans, joins, columns by role,
//! aggregations, filters and sort keys. Column references are written as
//! `ALIAS.COLUMN` and resolved against the registered scans.

use std::collections::HashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::filter::{CompareOp, CompareTupleFilter, TupleFilter};
use crate::metadata::{
    ColumnDesc, DataType, FunctionDesc, FunctionExpr, JoinDesc, JoinType, SqlCall, SqlCallArg, TableDesc,
    TblColRef,
};
use crate::query::context::QueryContext;
use crate::query::digest::SortOrder;
use crate::query::error::ContextError;
use crate::query::scan::TableScan;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column reference: {0}")]
    UnknownColumn(String),

    #[error("invalid scenario: {0}")]
    Invalid(String),

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanSpec {
    pub alias: String,
    pub table: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinSpec {
    #[serde(rename = "type", default = "default_join_type")]
    pub join_type: String,
    pub fk: Vec<String>,
    pub pk: Vec<String>,
}

fn default_join_type() -> String {
    "INNER".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationSpec {
    pub function: String,
    /// None for COUNT(*)
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub return_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlCallSpec {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompareSpec {
    pub column: String,
    pub op: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSpec {
    And(Vec<FilterSpec>),
    Or(Vec<FilterSpec>),
    Not(Box<FilterSpec>),
    Compare(CompareSpec),
    Constant(bool),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default = "default_sort_order")]
    pub order: String,
}

fn default_sort_order() -> String {
    "ASC".to_string()
}

/// JSON description of one query context
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub sql: String,
    pub tables: Vec<TableSpec>,
    pub scans: Vec<ScanSpec>,
    pub fact: Option<String>,
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub subquery_join_participants: Vec<String>,
    #[serde(default)]
    pub aggregations: Vec<AggregationSpec>,
    #[serde(default)]
    pub sql_calls: Vec<SqlCallSpec>,
    pub filter: Option<FilterSpec>,
    pub having: Option<FilterSpec>,
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    #[serde(default)]
    pub limit_precedes_aggr: bool,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Register everything the scenario describes into `ctx`
    pub fn populate(&self, ctx: &mut QueryContext) -> Result<()> {
        let tables = self.table_descs()?;

        for scan in &self.scans {
            let table = tables
                .get(&scan.table)
                .ok_or_else(|| ScenarioError::UnknownTable(scan.table.clone()))?;
            ctx.add_table_scan(TableScan::new(scan.alias.clone(), table.clone()))?;
        }
        if let Some(fact) = &self.fact {
            if !ctx.set_first_table_scan(fact) {
                return Err(ScenarioError::Invalid(format!("fact alias '{}' is not a scan", fact)));
            }
        }
        ctx.sql = self.sql.clone();

        for join in &self.joins {
            let join_type = match join.join_type.to_uppercase().as_str() {
                "INNER" => JoinType::Inner,
                "LEFT" => JoinType::Left,
                other => return Err(ScenarioError::Invalid(format!("unsupported join type {}", other))),
            };
            let fk = self.resolve_all(ctx, &join.fk)?;
            let pk = self.resolve_all(ctx, &join.pk)?;
            ctx.add_join(JoinDesc::new(join_type, fk, pk).map_err(ScenarioError::Invalid)?);
            ctx.after_join = true;
        }

        for col in &self.columns {
            ctx.add_column(self.resolve(ctx, col)?);
        }
        for col in &self.group_by {
            ctx.add_group_by_column(self.resolve(ctx, col)?);
        }
        for col in &self.subquery_join_participants {
            ctx.add_subquery_join_participant(self.resolve(ctx, col)?);
        }

        for agg in &self.aggregations {
            let expression = FunctionExpr::from_str(&agg.function).map_err(ScenarioError::Invalid)?;
            let parameter = agg.column.as_deref().map(|c| self.resolve(ctx, c)).transpose()?;
            let return_type = match (&agg.return_type, &parameter) {
                (Some(t), _) => DataType::from_str(t).map_err(ScenarioError::Invalid)?,
                (None, Some(p)) if expression != FunctionExpr::Count && expression != FunctionExpr::CountDistinct => {
                    p.data_type()
                }
                _ => DataType::BigInt,
            };
            ctx.add_aggregation(FunctionDesc::new(expression, parameter, return_type), None);
        }
        if !self.aggregations.is_empty() || !self.group_by.is_empty() {
            ctx.after_aggregate = true;
        }

        for call in &self.sql_calls {
            let args = call
                .args
                .iter()
                .map(|a| match self.resolve(ctx, a) {
                    Ok(col) => SqlCallArg::Column(col),
                    Err(_) => SqlCallArg::Literal(a.clone()),
                })
                .collect();
            ctx.add_sql_call(SqlCall::new(call.function.clone(), args));
        }

        if let Some(spec) = &self.filter {
            let filter = self.build_filter(ctx, spec)?;
            for col in filter.referenced_columns() {
                ctx.add_filter_column(col);
            }
            ctx.set_filter(Some(filter));
        }
        if let Some(spec) = &self.having {
            let having = self.build_filter(ctx, spec)?;
            ctx.set_having_filter(Some(having));
        }

        for sort in &self.sort {
            let order = match sort.order.to_uppercase().as_str() {
                "ASC" | "ASCENDING" => SortOrder::Ascending,
                "DESC" | "DESCENDING" => SortOrder::Descending,
                other => return Err(ScenarioError::Invalid(format!("unknown sort order {}", other))),
            };
            // sort keys that do not map to a column are dropped, as in a plan walk
            ctx.add_sort(self.resolve(ctx, &sort.column).ok(), order);
        }
        ctx.set_limit_precedes_aggr(self.limit_precedes_aggr);
        Ok(())
    }

    fn table_descs(&self) -> Result<HashMap<String, TableDesc>> {
        let mut tables = HashMap::new();
        for spec in &self.tables {
            let mut columns = Vec::with_capacity(spec.columns.len());
            for col in &spec.columns {
                let data_type = DataType::from_str(&col.data_type).map_err(ScenarioError::Invalid)?;
                columns.push(ColumnDesc::new(col.name.clone(), data_type));
            }
            tables.insert(spec.name.clone(), TableDesc::new(spec.name.clone(), columns));
        }
        Ok(tables)
    }

    fn resolve(&self, ctx: &QueryContext, reference: &str) -> Result<TblColRef> {
        let (alias, column) = reference
            .rsplit_once('.')
            .ok_or_else(|| ScenarioError::UnknownColumn(reference.to_string()))?;
        ctx.table_scan(alias)
            .and_then(|scan| scan.column(column))
            .ok_or_else(|| ScenarioError::UnknownColumn(reference.to_string()))
    }

    fn resolve_all(&self, ctx: &QueryContext, references: &[String]) -> Result<Vec<TblColRef>> {
        references.iter().map(|r| self.resolve(ctx, r)).collect()
    }

    fn build_filter(&self, ctx: &QueryContext, spec: &FilterSpec) -> Result<TupleFilter> {
        Ok(match spec {
            FilterSpec::And(children) => TupleFilter::and(self.build_filters(ctx, children)?),
            FilterSpec::Or(children) => TupleFilter::or(self.build_filters(ctx, children)?),
            FilterSpec::Not(child) => TupleFilter::not(self.build_filter(ctx, child)?),
            FilterSpec::Constant(b) => TupleFilter::Constant(*b),
            FilterSpec::Compare(cmp) => {
                let op = CompareOp::from_str(&cmp.op).map_err(ScenarioError::Invalid)?;
                let mut filter = CompareTupleFilter::new(op, self.resolve(ctx, &cmp.column)?);
                for value in &cmp.values {
                    filter = filter.with_constant(value.clone());
                }
                for variable in &cmp.variables {
                    filter = filter.with_variable(variable.clone());
                }
                TupleFilter::Compare(filter)
            }
        })
    }

    fn build_filters(&self, ctx: &QueryContext, specs: &[FilterSpec]) -> Result<Vec<TupleFilter>> {
        specs.iter().map(|s| self.build_filter(ctx, s)).collect()
    }
}

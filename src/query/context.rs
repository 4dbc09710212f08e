// Query Context Implementation
//
// A query context accumulates the requirements of one logical sub-query unit
// while the optimizer walks the plan: scans, joins, columns by role,
// aggregations, filters and sort keys. Routing reads its digest, may fix the
// context to a candidate model, and execution binds runtime variables into
// its filters.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use log::{debug, warn};

use crate::common::types::ContextId;
use crate::filter::TupleFilter;
use crate::metadata::{
    DataModelDesc, DataType, FunctionDesc, JoinDesc, JoinsTree, MeasureDesc, SqlCall, SqlCallArg, TblColRef,
};
use super::auth::QueryAuthentication;
use super::binder::{self, VariableSource};
use super::digest::{SortOrder, SqlDigest};
use super::error::{ContextError, Result};
use super::realization::{Realization, RealizationCheck};
use super::registry::{self, PRM_ACCEPT_PARTIAL_RESULT, PRM_USER_AUTHEN_INFO};
use super::scan::{ColumnRebinder, ColumnRowType, TableScan};
use super::storage::StorageContext;
use super::tuple_info::TupleInfo;

/// Requirements collected for one sub-query unit of a compilation pass.
///
/// Every mutator that changes a digest-visible field drops the cached
/// digest, so the next `digest()` call rebuilds it.
#[derive(Debug)]
pub struct QueryContext {
    pub id: ContextId,
    pub storage_context: StorageContext,
    pub authentication: QueryAuthentication,

    // query info
    pub schema_name: Option<String>,
    table_scans: Vec<TableScan>,
    /// Index into `table_scans`; the fact table except for lookup-only queries
    first_table_scan: Option<usize>,
    pub return_tuple_info: Option<TupleInfo>,
    pub after_aggregate: bool,
    pub after_having_clause_filter: bool,
    pub after_limit: bool,
    limit_precedes_aggr: bool,
    pub after_join: bool,
    pub has_join: bool,
    pub has_window: bool,

    // realization
    pub realization: Option<Arc<dyn Realization>>,
    pub realization_check: RealizationCheck,
    fixed_model: bool,

    // requirements, as seen by the digest
    all_columns: BTreeSet<TblColRef>,
    group_by_columns: Vec<TblColRef>,
    subquery_join_participants: BTreeSet<TblColRef>,
    metrics_columns: BTreeSet<TblColRef>,
    aggregations: Vec<FunctionDesc>,
    aggr_out_cols: Vec<TblColRef>,
    aggr_sql_calls: Vec<SqlCall>,
    filter_columns: BTreeSet<TblColRef>,
    filter: Option<TupleFilter>,
    having_filter: Option<TupleFilter>,
    joins: Vec<JoinDesc>,
    joins_tree: Option<JoinsTree>,
    sort_columns: Vec<TblColRef>,
    sort_orders: Vec<SortOrder>,
    involved_measures: Vec<MeasureDesc>,

    // rewrite info
    pub rewrite_fields: HashMap<String, DataType>,
    pub sql: String,

    digest: Option<Arc<SqlDigest>>,
}

impl QueryContext {
    /// Create a context, picking up the current pass parameters
    pub fn new(id: ContextId) -> Self {
        let mut storage_context = StorageContext::new(id);
        let mut authentication = QueryAuthentication::default();

        if let Some(parameters) = registry::current_parameters() {
            if let Some(accept) = parameters.get(PRM_ACCEPT_PARTIAL_RESULT) {
                storage_context.set_accept_partial_result(accept.trim().eq_ignore_ascii_case("true"));
            }
            if let Some(user_info) = parameters.get(PRM_USER_AUTHEN_INFO) {
                authentication = QueryAuthentication::parse_user_info(user_info);
            }
        }

        QueryContext {
            id,
            storage_context,
            authentication,
            schema_name: None,
            table_scans: Vec::new(),
            first_table_scan: None,
            return_tuple_info: None,
            after_aggregate: false,
            after_having_clause_filter: false,
            after_limit: false,
            limit_precedes_aggr: false,
            after_join: false,
            has_join: false,
            has_window: false,
            realization: None,
            realization_check: RealizationCheck::new(),
            fixed_model: false,
            all_columns: BTreeSet::new(),
            group_by_columns: Vec::new(),
            subquery_join_participants: BTreeSet::new(),
            metrics_columns: BTreeSet::new(),
            aggregations: Vec::new(),
            aggr_out_cols: Vec::new(),
            aggr_sql_calls: Vec::new(),
            filter_columns: BTreeSet::new(),
            filter: None,
            having_filter: None,
            joins: Vec::new(),
            joins_tree: None,
            sort_columns: Vec::new(),
            sort_orders: Vec::new(),
            involved_measures: Vec::new(),
            rewrite_fields: HashMap::new(),
            sql: String::new(),
            digest: None,
        }
    }

    // ------------------------------------------------------------------
    // scans

    /// Register a scan; returns its index. A scan with the same alias is
    /// registered once, and must read the same table. Scans cannot be added
    /// while the model is fixed.
    pub fn add_table_scan(&mut self, scan: TableScan) -> Result<usize> {
        if let Some(idx) = self.table_scans.iter().position(|s| s.alias() == scan.alias()) {
            let existing = &self.table_scans[idx];
            if existing.table() != scan.table() {
                warn!(
                    "context {} already scans '{}' as {}, rejecting {}",
                    self.id,
                    scan.alias(),
                    existing.table_name(),
                    scan.table_name()
                );
                return Err(ContextError::ScanConflict {
                    context: self.id,
                    alias: scan.alias().to_string(),
                    existing: existing.table_name().to_string(),
                    requested: scan.table_name().to_string(),
                });
            }
            return Ok(idx);
        }
        if self.fixed_model {
            return Err(ContextError::ModelFix {
                context: self.id,
                model: String::from("<current>"),
                reason: format!("scan '{}' added while the model is fixed", scan.alias()),
            });
        }
        self.table_scans.push(scan);
        self.reset_digest();
        Ok(self.table_scans.len() - 1)
    }

    /// Mark the scan with `alias` as the primary table. Returns false when no
    /// such scan is registered.
    pub fn set_first_table_scan(&mut self, alias: &str) -> bool {
        match self.table_scans.iter().position(|s| s.alias() == alias) {
            Some(idx) => {
                self.first_table_scan = Some(idx);
                self.reset_digest();
                true
            }
            None => false,
        }
    }

    pub fn first_table_scan(&self) -> Option<&TableScan> {
        self.first_table_scan.and_then(|idx| self.table_scans.get(idx))
    }

    pub fn table_scans(&self) -> &[TableScan] {
        &self.table_scans
    }

    pub fn table_scan(&self, alias: &str) -> Option<&TableScan> {
        self.table_scans.iter().find(|s| s.alias() == alias)
    }

    /// Whether `col` is output by one of this context's scans, as opposed to
    /// a sibling or subquery context
    pub fn belongs_to_context_tables(&self, col: &TblColRef) -> bool {
        self.table_scans
            .iter()
            .any(|scan| scan.column_row_type().contains(col))
    }

    // ------------------------------------------------------------------
    // joins

    pub fn add_join(&mut self, join: JoinDesc) {
        self.joins.push(join);
        self.has_join = true;
        self.joins_tree = None;
        self.reset_digest();
    }

    pub fn joins(&self) -> &[JoinDesc] {
        &self.joins
    }

    /// Derive the canonical join tree from the primary scan and the joins
    /// seen so far
    pub fn build_joins_tree(&mut self) -> Result<&JoinsTree> {
        let root = self
            .first_table_scan()
            .map(|s| s.alias().to_string())
            .ok_or(ContextError::MissingFactTable(self.id))?;
        Ok(self.joins_tree.insert(JoinsTree::new(&root, &self.joins)))
    }

    pub fn joins_tree(&self) -> Option<&JoinsTree> {
        self.joins_tree.as_ref()
    }

    // ------------------------------------------------------------------
    // columns

    pub fn add_column(&mut self, col: TblColRef) {
        self.all_columns.insert(col);
        self.reset_digest();
    }

    /// Group-by columns are also required columns
    pub fn add_group_by_column(&mut self, col: TblColRef) {
        if !self.group_by_columns.contains(&col) {
            self.group_by_columns.push(col.clone());
        }
        self.all_columns.insert(col);
        self.reset_digest();
    }

    /// Columns a subquery is joined on. Kept apart from group-by; the digest
    /// folds them into the grouping only if the query groups by anything.
    pub fn add_subquery_join_participant(&mut self, col: TblColRef) {
        self.subquery_join_participants.insert(col);
        self.reset_digest();
    }

    pub fn add_metrics_column(&mut self, col: TblColRef) {
        self.metrics_columns.insert(col.clone());
        self.all_columns.insert(col);
        self.reset_digest();
    }

    pub fn add_filter_column(&mut self, col: TblColRef) {
        self.filter_columns.insert(col.clone());
        self.all_columns.insert(col);
        self.reset_digest();
    }

    pub fn all_columns(&self) -> &BTreeSet<TblColRef> {
        &self.all_columns
    }

    pub fn group_by_columns(&self) -> &[TblColRef] {
        &self.group_by_columns
    }

    pub fn subquery_join_participants(&self) -> &BTreeSet<TblColRef> {
        &self.subquery_join_participants
    }

    pub fn metrics_columns(&self) -> &BTreeSet<TblColRef> {
        &self.metrics_columns
    }

    pub fn filter_columns(&self) -> &BTreeSet<TblColRef> {
        &self.filter_columns
    }

    // ------------------------------------------------------------------
    // aggregation

    /// Record a storage-level aggregate. Its parameter column becomes a
    /// metrics column; `out_col` is the inner column the aggregate produces.
    pub fn add_aggregation(&mut self, func: FunctionDesc, out_col: Option<TblColRef>) {
        if let Some(param) = &func.parameter {
            self.metrics_columns.insert(param.clone());
            self.all_columns.insert(param.clone());
        }
        if let Some(out) = out_col {
            self.aggr_out_cols.push(out);
        }
        self.aggregations.push(func);
        self.reset_digest();
    }

    /// Record the SQL-level call layered over the storage aggregates
    pub fn add_sql_call(&mut self, call: SqlCall) {
        self.aggr_sql_calls.push(call);
        self.reset_digest();
    }

    pub fn add_involved_measure(&mut self, measure: MeasureDesc) {
        if !self.involved_measures.contains(&measure) {
            self.involved_measures.push(measure);
            self.reset_digest();
        }
    }

    pub fn aggregations(&self) -> &[FunctionDesc] {
        &self.aggregations
    }

    pub fn aggr_out_cols(&self) -> &[TblColRef] {
        &self.aggr_out_cols
    }

    pub fn aggr_sql_calls(&self) -> &[SqlCall] {
        &self.aggr_sql_calls
    }

    pub fn involved_measures(&self) -> &[MeasureDesc] {
        &self.involved_measures
    }

    // ------------------------------------------------------------------
    // filters

    pub fn set_filter(&mut self, filter: Option<TupleFilter>) {
        self.filter = filter;
        self.reset_digest();
    }

    pub fn set_having_filter(&mut self, filter: Option<TupleFilter>) {
        self.having_filter = filter;
        self.after_having_clause_filter = self.having_filter.is_some();
        self.reset_digest();
    }

    pub fn filter(&self) -> Option<&TupleFilter> {
        self.filter.as_ref()
    }

    pub fn having_filter(&self) -> Option<&TupleFilter> {
        self.having_filter.as_ref()
    }

    // ------------------------------------------------------------------
    // sort & limit

    /// Append a sort key. A missing column (an expression that does not map
    /// to a column) is ignored, keeping both lists the same length.
    pub fn add_sort(&mut self, col: Option<TblColRef>, order: SortOrder) {
        if let Some(col) = col {
            self.sort_columns.push(col);
            self.sort_orders.push(order);
            self.reset_digest();
        }
    }

    pub fn sort_columns(&self) -> &[TblColRef] {
        &self.sort_columns
    }

    pub fn sort_orders(&self) -> &[SortOrder] {
        &self.sort_orders
    }

    pub fn limit_precedes_aggr(&self) -> bool {
        self.limit_precedes_aggr
    }

    pub fn set_limit_precedes_aggr(&mut self, precedes: bool) {
        self.limit_precedes_aggr = precedes;
        self.reset_digest();
    }

    // ------------------------------------------------------------------
    // routing helpers

    /// No joins, no grouping and no aggregation
    pub fn is_simple_query(&self) -> bool {
        self.joins.is_empty() && self.group_by_columns.is_empty() && self.aggregations.is_empty()
    }

    /// Whether the assigned realization returns precalculated measure fields
    pub fn has_precalculated_fields(&self) -> bool {
        self.realization
            .as_ref()
            .is_some_and(|r| r.provides_precalculated_fields())
    }

    /// Record the final output row shape. The column at position i is taken
    /// from `column_row_type` when one is given.
    pub fn set_return_tuple_info(&mut self, field_names: &[String], column_row_type: Option<&ColumnRowType>) {
        let mut info = TupleInfo::new();
        for (i, name) in field_names.iter().enumerate() {
            let col = column_row_type.and_then(|crt| crt.column_by_index(i)).cloned();
            info.set_field(name.clone(), col, i);
        }
        self.return_tuple_info = Some(info);
    }

    // ------------------------------------------------------------------
    // digest

    /// The digest of this context, built on first request and cached until
    /// invalidated
    pub fn digest(&mut self) -> Result<Arc<SqlDigest>> {
        if let Some(digest) = &self.digest {
            return Ok(Arc::clone(digest));
        }
        let digest = Arc::new(SqlDigest::build(self)?);
        debug!("built digest for context {} on fact table {}", self.id, digest.fact_table);
        self.digest = Some(Arc::clone(&digest));
        Ok(digest)
    }

    /// Drop the cached digest
    pub fn reset_digest(&mut self) {
        self.digest = None;
    }

    // ------------------------------------------------------------------
    // model fixing

    pub fn is_fixed_model(&self) -> bool {
        self.fixed_model
    }

    /// Re-resolve every scan's columns against `model`, translating scan
    /// aliases through `alias_map`, and rebind every recorded requirement
    /// (columns by role, aggregations, joins, filters, sort keys) to the
    /// resolved columns. All scans are resolved before anything changes; if
    /// one fails nothing is applied. No-op when already fixed.
    pub fn fix_model(&mut self, model: &DataModelDesc, alias_map: &HashMap<String, String>) -> Result<()> {
        if self.fixed_model {
            return Ok(());
        }

        let mut resolved = Vec::with_capacity(self.table_scans.len());
        let mut bound_aliases: HashMap<&str, &str> = HashMap::new();
        for scan in &self.table_scans {
            let canonical = alias_map.get(scan.alias()).map(String::as_str).unwrap_or(scan.alias());
            if let Some(other) = bound_aliases.insert(canonical, scan.alias()) {
                return Err(self.model_fix_failed(
                    model,
                    format!("scans '{}' and '{}' both map to model alias '{}'", other, scan.alias(), canonical),
                ));
            }
            match scan.resolve_with_model(model, alias_map) {
                Ok(row_type) => resolved.push(row_type),
                Err(reason) => return Err(self.model_fix_failed(model, reason)),
            }
        }

        let mut rebinder = ColumnRebinder::new();
        for (scan, row_type) in self.table_scans.iter().zip(&resolved) {
            rebinder.add(scan.column_row_type(), row_type);
        }
        for (scan, row_type) in self.table_scans.iter_mut().zip(resolved) {
            scan.apply_fixed(row_type);
        }
        self.rebind_requirements(&rebinder);

        self.fixed_model = true;
        self.reset_digest();
        debug!("context {} fixed to model {}", self.id, model.name());
        Ok(())
    }

    /// Restore every scan to its row type from before `fix_model` and
    /// rebind the requirements back. No-op when not fixed.
    pub fn unfix_model(&mut self) {
        if !self.fixed_model {
            return;
        }

        let mut rebinder = ColumnRebinder::new();
        for scan in &self.table_scans {
            if let Some(original) = scan.unfixed_row_type() {
                rebinder.add(scan.column_row_type(), original);
            }
        }
        for scan in &mut self.table_scans {
            scan.restore_unfixed();
        }
        self.rebind_requirements(&rebinder);

        self.fixed_model = false;
        self.reset_digest();
        debug!("context {} unfixed", self.id);
    }

    fn model_fix_failed(&self, model: &DataModelDesc, reason: String) -> ContextError {
        warn!("context {} cannot be fixed to model {}: {}", self.id, model.name(), reason);
        ContextError::ModelFix {
            context: self.id,
            model: model.name().to_string(),
            reason,
        }
    }

    fn rebind_requirements(&mut self, rebinder: &ColumnRebinder) {
        let rebind = |col: &TblColRef| rebinder.rebind(col);

        for set in [
            &mut self.all_columns,
            &mut self.subquery_join_participants,
            &mut self.metrics_columns,
            &mut self.filter_columns,
        ] {
            *set = set.iter().map(|c| rebind(c).unwrap_or_else(|| c.clone())).collect();
        }
        for col in self
            .group_by_columns
            .iter_mut()
            .chain(self.aggr_out_cols.iter_mut())
            .chain(self.sort_columns.iter_mut())
        {
            if let Some(to) = rebind(col) {
                *col = to;
            }
        }

        let params = self
            .aggregations
            .iter_mut()
            .chain(self.involved_measures.iter_mut().map(|m| &mut m.function))
            .filter_map(|f| f.parameter.as_mut());
        for param in params {
            if let Some(to) = rebind(param) {
                *param = to;
            }
        }
        for call in &mut self.aggr_sql_calls {
            for arg in &mut call.args {
                if let SqlCallArg::Column(col) = arg {
                    if let Some(to) = rebind(col) {
                        *col = to;
                    }
                }
            }
        }

        for join in &mut self.joins {
            join.rebind_columns(&rebind);
        }
        self.joins_tree = None;
        for filter in [self.filter.as_mut(), self.having_filter.as_mut()].into_iter().flatten() {
            filter.rebind_columns(&rebind);
        }
    }

    // ------------------------------------------------------------------
    // runtime variables

    /// Bind runtime variables into the filter and having filter. Without a
    /// source this does nothing; on error neither filter is changed.
    pub fn bind_variable(&mut self, source: Option<&dyn VariableSource>) -> Result<()> {
        let Some(source) = source else {
            return Ok(());
        };
        // bind copies so a failure leaves both filters as they were
        let mut filter = self.filter.clone();
        let mut having = self.having_filter.clone();
        for f in [filter.as_mut(), having.as_mut()].into_iter().flatten() {
            binder::bind_filter(f, source)?;
        }
        self.filter = filter;
        self.having_filter = having;
        self.reset_digest();
        Ok(())
    }
}

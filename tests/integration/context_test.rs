use anyhow::Result;
use std::sync::Arc;

use olapctx::config::QueryConfig;
use olapctx::metadata::{DataType, FunctionDesc, FunctionExpr, JoinDesc, JoinType};
use olapctx::query::access::{AccessControl, AccessController};
use olapctx::query::realization::{Realization, RealizationType};
use olapctx::query::scan::TableScan;
use olapctx::query::{ContextError, SortOrder};
use olapctx::{CompilationPass, ContextRef, QueryContext};

#[path = "../common/mod.rs"]
mod common;
use common::{account_table, col, sales_context};

#[test]
fn test_simple_query_until_join_group_or_aggregation() -> Result<()> {
    // each kind of requirement on its own makes the query non-simple
    let ctx = sales_context(0);
    assert!(ctx.is_simple_query());

    let mut with_group = sales_context(1);
    let dt = col(&with_group, "SALES", "PART_DT");
    with_group.add_group_by_column(dt);
    assert!(!with_group.is_simple_query());

    let mut with_aggr = sales_context(2);
    with_aggr.add_aggregation(FunctionDesc::count_star(), None);
    assert!(!with_aggr.is_simple_query());

    let mut with_join = sales_context(3);
    with_join.add_table_scan(TableScan::new("BUYER", account_table()))?;
    let fk = col(&with_join, "SALES", "BUYER_ID");
    let pk = col(&with_join, "BUYER", "ACCOUNT_ID");
    with_join.add_join(JoinDesc::new(JoinType::Inner, vec![fk], vec![pk]).unwrap());
    assert!(!with_join.is_simple_query());

    // plain columns, filters and sorts do not count
    let mut plain = sales_context(4);
    let price = col(&plain, "SALES", "PRICE");
    plain.add_column(price.clone());
    plain.add_filter_column(price.clone());
    plain.add_sort(Some(price), SortOrder::Descending);
    assert!(plain.is_simple_query());
    Ok(())
}

#[test]
fn test_sort_lists_stay_parallel() {
    let mut ctx = sales_context(0);
    let dt = col(&ctx, "SALES", "PART_DT");
    let price = col(&ctx, "SALES", "PRICE");

    let calls = vec![
        (Some(dt.clone()), SortOrder::Ascending),
        (None, SortOrder::Descending),
        (Some(price.clone()), SortOrder::Descending),
        (None, SortOrder::Ascending),
        (Some(dt.clone()), SortOrder::Descending),
    ];
    for (i, (key, order)) in calls.into_iter().enumerate() {
        let before = ctx.sort_columns().len();
        let is_none = key.is_none();
        ctx.add_sort(key, order);
        assert_eq!(ctx.sort_columns().len(), ctx.sort_orders().len(), "after call {}", i);
        if is_none {
            assert_eq!(ctx.sort_columns().len(), before);
        }
    }

    assert_eq!(ctx.sort_columns(), &[dt.clone(), price, dt]);
    assert_eq!(
        ctx.sort_orders(),
        &[SortOrder::Ascending, SortOrder::Descending, SortOrder::Descending]
    );
}

#[test]
fn test_belongs_to_context_tables() {
    let ctx = sales_context(0);
    let other = {
        let mut c = QueryContext::new(1);
        c.add_table_scan(TableScan::new("ACC", account_table())).unwrap();
        c
    };

    assert!(ctx.belongs_to_context_tables(&col(&ctx, "SALES", "PRICE")));
    assert!(!ctx.belongs_to_context_tables(&col(&other, "ACC", "ACCOUNT_ID")));
    // same physical column through another alias belongs elsewhere
    let aliased = col(&ctx, "SALES", "PRICE").with_alias("S2");
    assert!(!ctx.belongs_to_context_tables(&aliased));
}

#[derive(Debug)]
struct TestRealization {
    kind: RealizationType,
}

impl Realization for TestRealization {
    fn name(&self) -> &str {
        "test_realization"
    }

    fn realization_type(&self) -> RealizationType {
        self.kind
    }

    fn provides_precalculated_fields(&self) -> bool {
        matches!(self.kind, RealizationType::Cube | RealizationType::Hybrid)
    }
}

#[test]
fn test_precalculated_fields_follow_realization_capability() {
    let mut ctx = sales_context(0);
    assert!(!ctx.has_precalculated_fields());

    ctx.realization = Some(Arc::new(TestRealization { kind: RealizationType::Cube }));
    assert!(ctx.has_precalculated_fields());

    ctx.realization = Some(Arc::new(TestRealization { kind: RealizationType::RawTable }));
    assert!(!ctx.has_precalculated_fields());
}

struct RequireRole(&'static str);

impl AccessController for RequireRole {
    fn name(&self) -> &str {
        "require_role"
    }

    fn check(&self, contexts: &[ContextRef], _config: &QueryConfig) -> olapctx::query::Result<()> {
        for ctx in contexts {
            let ctx = ctx.read();
            if !ctx.authentication.has_role(self.0) {
                return Err(ContextError::AccessDenied(format!(
                    "context {} lacks role {}",
                    ctx.id, self.0
                )));
            }
        }
        Ok(())
    }
}

#[test]
fn test_access_control_over_pass_contexts() -> Result<()> {
    let config = QueryConfig {
        access_controllers: vec!["require_role".to_string()],
        ..QueryConfig::default()
    };

    {
        let mut pass = CompilationPass::begin(config.pass_parameters(Some("ANALYST\nROLE_READER")));
        pass.new_context();
        pass.new_context();
        let access = AccessControl::from_config(&config, vec![Box::new(RequireRole("ROLE_READER"))])?;
        access.check_current_pass(&config)?;
    }

    {
        let mut pass = CompilationPass::begin(config.pass_parameters(Some("GUEST")));
        pass.new_context();
        let access = AccessControl::from_config(&config, vec![Box::new(RequireRole("ROLE_READER"))])?;
        let err = access.check_current_pass(&config).unwrap_err();
        assert!(matches!(err, ContextError::AccessDenied(_)));
    }

    // a configured controller that nobody provides
    assert!(matches!(
        AccessControl::from_config(&config, Vec::new()),
        Err(ContextError::Config(_))
    ));
    Ok(())
}

#[test]
fn test_aggregation_records_out_column_and_sql_call() {
    let mut ctx = sales_context(0);
    let price = col(&ctx, "SALES", "PRICE");
    let out = price.with_alias("_KY_AGG");
    ctx.add_aggregation(
        FunctionDesc::new(FunctionExpr::Sum, Some(price.clone()), DataType::Decimal),
        Some(out.clone()),
    );
    ctx.add_aggregation(FunctionDesc::count_star(), None);

    assert_eq!(ctx.aggregations().len(), 2);
    assert_eq!(ctx.aggr_out_cols(), &[out]);
    assert!(ctx.metrics_columns().contains(&price));
}

#[test]
fn test_scan_alias_cannot_change_table() -> Result<()> {
    let mut ctx = sales_context(0);
    let before = ctx.table_scans().len();

    let err = ctx.add_table_scan(TableScan::new("SALES", account_table())).unwrap_err();
    match err {
        ContextError::ScanConflict { context, alias, existing, requested } => {
            assert_eq!(context, 0);
            assert_eq!(alias, "SALES");
            assert_eq!(existing, "DEFAULT.SALES");
            assert_eq!(requested, "DEFAULT.ACCOUNT");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(ctx.table_scans().len(), before);
    assert_eq!(col(&ctx, "SALES", "PRICE").table(), "DEFAULT.SALES");

    // the same table under the same alias is the scan already there
    let idx = ctx.add_table_scan(TableScan::new("SALES", common::sales_table()))?;
    assert_eq!(idx, 0);
    assert_eq!(ctx.table_scans().len(), before);
    Ok(())
}

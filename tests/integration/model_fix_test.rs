use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use olapctx::filter::{CompareOp, CompareTupleFilter, TupleFilter};
use olapctx::metadata::{
    ColumnDesc, DataType, FunctionDesc, FunctionExpr, JoinDesc, JoinType, SqlCall, SqlCallArg, TableDesc,
};
use olapctx::query::scan::{ColumnRowType, TableScan};
use olapctx::query::{ContextError, SortOrder};
use olapctx::QueryContext;

#[path = "../common/mod.rs"]
mod common;
use common::{account_table, col, country_table, sales_context, sales_model};

fn alias_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

fn row_types(ctx: &QueryContext) -> Vec<ColumnRowType> {
    ctx.table_scans()
        .iter()
        .map(|scan| scan.column_row_type().clone())
        .collect()
}

/// SALES joined to a buyer and a seller account, each with its country.
/// The query uses its own aliases for the repeated lookup tables.
fn snowflake_context() -> Result<QueryContext> {
    let mut ctx = sales_context(0);
    ctx.add_table_scan(TableScan::new("B", account_table()))?;
    ctx.add_table_scan(TableScan::new("S", account_table()))?;
    ctx.add_table_scan(TableScan::new("BC", country_table()))?;
    ctx.add_table_scan(TableScan::new("SC", country_table()))?;
    Ok(ctx)
}

fn snowflake_alias_map() -> HashMap<String, String> {
    alias_map(&[
        ("B", "BUYER_ACCOUNT"),
        ("S", "SELLER_ACCOUNT"),
        ("BC", "BUYER_COUNTRY"),
        ("SC", "SELLER_COUNTRY"),
    ])
}

#[test]
fn test_fix_then_unfix_restores_row_types() -> Result<()> {
    let mut ctx = snowflake_context()?;
    let before = row_types(&ctx);

    ctx.fix_model(&sales_model(), &snowflake_alias_map())?;
    assert!(ctx.is_fixed_model());
    assert!(ctx.table_scans().iter().all(|scan| scan.is_fixed()));

    ctx.unfix_model();
    assert!(!ctx.is_fixed_model());
    assert_eq!(row_types(&ctx), before);
    assert!(ctx.table_scans().iter().all(|scan| !scan.is_fixed()));
    Ok(())
}

#[test]
fn test_repeated_lookup_tables_resolve_to_model_aliases() -> Result<()> {
    let mut ctx = snowflake_context()?;
    ctx.fix_model(&sales_model(), &snowflake_alias_map())?;

    // same physical table, distinct canonical aliases
    let buyer_country = col(&ctx, "BC", "NAME");
    let seller_country = col(&ctx, "SC", "NAME");
    assert_eq!(buyer_country.table_alias(), "BUYER_COUNTRY");
    assert_eq!(seller_country.table_alias(), "SELLER_COUNTRY");
    assert_eq!(buyer_country.table(), seller_country.table());
    assert_ne!(buyer_country, seller_country);

    // the fact table keeps its own name when it is not in the map
    assert_eq!(col(&ctx, "SALES", "PRICE").table_alias(), "SALES");
    assert_eq!(col(&ctx, "B", "ACCOUNT_ID").to_string(), "BUYER_ACCOUNT.ACCOUNT_ID");
    Ok(())
}

#[test]
fn test_fix_and_unfix_are_idempotent() -> Result<()> {
    let mut ctx = snowflake_context()?;
    let model = sales_model();
    let map = snowflake_alias_map();

    ctx.fix_model(&model, &map)?;
    let fixed = row_types(&ctx);
    // a second fix must not re-resolve or overwrite the saved originals
    ctx.fix_model(&model, &map)?;
    assert_eq!(row_types(&ctx), fixed);

    ctx.unfix_model();
    let unfixed = row_types(&ctx);
    ctx.unfix_model();
    assert_eq!(row_types(&ctx), unfixed);
    assert_eq!(col(&ctx, "BC", "NAME").table_alias(), "BC");
    Ok(())
}

#[test]
fn test_failed_fix_leaves_every_scan_untouched() -> Result<()> {
    let mut ctx = snowflake_context()?;
    // a scan the model knows nothing about, added after the resolvable ones
    let promo = TableDesc::new(
        "DEFAULT.PROMO",
        vec![ColumnDesc::new("PROMO_ID", DataType::BigInt)],
    );
    ctx.add_table_scan(TableScan::new("P", promo))?;
    let before = row_types(&ctx);

    let err = ctx.fix_model(&sales_model(), &snowflake_alias_map()).unwrap_err();
    match err {
        ContextError::ModelFix { context, model, reason } => {
            assert_eq!(context, 0);
            assert_eq!(model, "sales_model");
            assert!(reason.contains("'P'"), "reason: {}", reason);
        }
        other => panic!("unexpected error: {}", other),
    }

    assert!(!ctx.is_fixed_model());
    assert_eq!(row_types(&ctx), before);
    assert!(ctx.table_scans().iter().all(|scan| !scan.is_fixed()));
    Ok(())
}

#[test]
fn test_alias_mapped_to_wrong_table_is_rejected() -> Result<()> {
    let mut ctx = snowflake_context()?;
    // BC reads COUNTRY but is mapped onto an ACCOUNT alias
    let map = alias_map(&[
        ("B", "BUYER_ACCOUNT"),
        ("S", "SELLER_ACCOUNT"),
        ("BC", "SELLER_ACCOUNT"),
        ("SC", "SELLER_COUNTRY"),
    ]);
    let before = row_types(&ctx);
    assert!(matches!(
        ctx.fix_model(&sales_model(), &map),
        Err(ContextError::ModelFix { .. })
    ));
    assert_eq!(row_types(&ctx), before);
    Ok(())
}

#[test]
fn test_fixing_invalidates_digest() -> Result<()> {
    let mut ctx = snowflake_context()?;
    let name = col(&ctx, "BC", "NAME");
    ctx.add_group_by_column(name.clone());
    let before = ctx.digest()?;

    ctx.fix_model(&sales_model(), &snowflake_alias_map())?;
    let fixed = ctx.digest()?;
    assert!(!Arc::ptr_eq(&before, &fixed));
    assert_ne!(*before, *fixed);
    assert_eq!(fixed.group_by_columns[0].to_string(), "BUYER_COUNTRY.NAME");

    ctx.unfix_model();
    let after = ctx.digest()?;
    assert!(!Arc::ptr_eq(&fixed, &after));
    assert_eq!(*before, *after);
    assert_eq!(after.group_by_columns, vec![name]);
    Ok(())
}

#[test]
fn test_requirements_follow_the_fixed_scans() -> Result<()> {
    let mut ctx = snowflake_context()?;
    let price = col(&ctx, "SALES", "PRICE");
    let buyer_id = col(&ctx, "SALES", "BUYER_ID");
    let account_id = col(&ctx, "B", "ACCOUNT_ID");
    let country_name = col(&ctx, "SC", "NAME");

    ctx.add_join(JoinDesc::new(JoinType::Inner, vec![buyer_id], vec![account_id.clone()]).unwrap());
    ctx.add_group_by_column(country_name.clone());
    ctx.add_aggregation(FunctionDesc::new(FunctionExpr::Sum, Some(price.clone()), DataType::Decimal), None);
    ctx.add_sql_call(SqlCall::new("sum", vec![SqlCallArg::Column(price)]));
    ctx.add_filter_column(account_id.clone());
    ctx.set_filter(Some(TupleFilter::Compare(
        CompareTupleFilter::new(CompareOp::Eq, account_id.clone()).with_variable("acct"),
    )));
    ctx.add_sort(Some(country_name.clone()), SortOrder::Descending);
    let before = ctx.digest()?;

    ctx.fix_model(&sales_model(), &snowflake_alias_map())?;
    let fixed_name = col(&ctx, "SC", "NAME");
    let fixed_account = col(&ctx, "B", "ACCOUNT_ID");
    assert_eq!(fixed_name.table_alias(), "SELLER_COUNTRY");

    // every recorded column is again one the scans output
    for c in ctx.all_columns() {
        assert!(ctx.belongs_to_context_tables(c), "{} left behind", c);
    }
    assert_eq!(ctx.group_by_columns(), &[fixed_name.clone()]);
    assert_eq!(ctx.sort_columns(), &[fixed_name]);
    assert!(ctx.filter_columns().contains(&fixed_account));
    assert_eq!(ctx.joins()[0].pk_alias(), "BUYER_ACCOUNT");
    assert_eq!(ctx.build_joins_tree()?.parent_of("BUYER_ACCOUNT"), Some("SALES"));
    let rendered = ctx.filter().unwrap().to_string();
    assert!(rendered.starts_with("BUYER_ACCOUNT.ACCOUNT_ID"), "{}", rendered);

    ctx.unfix_model();
    assert_eq!(*ctx.digest()?, *before);
    assert_eq!(ctx.joins()[0].pk_alias(), "B");
    Ok(())
}

#[test]
fn test_two_scans_on_one_model_alias_are_rejected() -> Result<()> {
    let mut ctx = snowflake_context()?;
    let map = alias_map(&[
        ("B", "BUYER_ACCOUNT"),
        ("S", "BUYER_ACCOUNT"),
        ("BC", "BUYER_COUNTRY"),
        ("SC", "SELLER_COUNTRY"),
    ]);
    let before = row_types(&ctx);
    let err = ctx.fix_model(&sales_model(), &map).unwrap_err();
    assert!(err.to_string().contains("BUYER_ACCOUNT"), "{}", err);
    assert!(!ctx.is_fixed_model());
    assert_eq!(row_types(&ctx), before);
    Ok(())
}

#![allow(dead_code)]

use olapctx::metadata::{ColumnDesc, DataModelDesc, DataType, JoinDesc, JoinType, TableDesc, TableRef, TblColRef};
use olapctx::query::scan::TableScan;
use olapctx::QueryContext;

// Fact table of the sample snowflake model
pub fn sales_table() -> TableDesc {
    TableDesc::new(
        "DEFAULT.SALES",
        vec![
            ColumnDesc::new("TRANS_ID", DataType::BigInt),
            ColumnDesc::new("PART_DT", DataType::Date),
            ColumnDesc::new("PRICE", DataType::Decimal),
            ColumnDesc::new("BUYER_ID", DataType::BigInt),
            ColumnDesc::new("SELLER_ID", DataType::BigInt),
        ],
    )
}

pub fn account_table() -> TableDesc {
    TableDesc::new(
        "DEFAULT.ACCOUNT",
        vec![
            ColumnDesc::new("ACCOUNT_ID", DataType::BigInt),
            ColumnDesc::new("ACCOUNT_COUNTRY", DataType::Varchar),
        ],
    )
}

pub fn country_table() -> TableDesc {
    TableDesc::new(
        "DEFAULT.COUNTRY",
        vec![
            ColumnDesc::new("COUNTRY", DataType::Varchar),
            ColumnDesc::new("NAME", DataType::Varchar),
        ],
    )
}

fn model_col(table: &TableRef, name: &str) -> TblColRef {
    table.column(name).expect("fixture column")
}

/// SALES -> BUYER_ACCOUNT -> BUYER_COUNTRY and SALES -> SELLER_ACCOUNT ->
/// SELLER_COUNTRY, with ACCOUNT and COUNTRY each used twice
pub fn sales_model() -> DataModelDesc {
    let sales = TableRef::new("SALES", sales_table());
    let buyer_account = TableRef::new("BUYER_ACCOUNT", account_table());
    let seller_account = TableRef::new("SELLER_ACCOUNT", account_table());
    let buyer_country = TableRef::new("BUYER_COUNTRY", country_table());
    let seller_country = TableRef::new("SELLER_COUNTRY", country_table());

    let joins = vec![
        JoinDesc::new(
            JoinType::Inner,
            vec![model_col(&sales, "BUYER_ID")],
            vec![model_col(&buyer_account, "ACCOUNT_ID")],
        )
        .unwrap(),
        JoinDesc::new(
            JoinType::Inner,
            vec![model_col(&sales, "SELLER_ID")],
            vec![model_col(&seller_account, "ACCOUNT_ID")],
        )
        .unwrap(),
        JoinDesc::new(
            JoinType::Left,
            vec![model_col(&buyer_account, "ACCOUNT_COUNTRY")],
            vec![model_col(&buyer_country, "COUNTRY")],
        )
        .unwrap(),
        JoinDesc::new(
            JoinType::Left,
            vec![model_col(&seller_account, "ACCOUNT_COUNTRY")],
            vec![model_col(&seller_country, "COUNTRY")],
        )
        .unwrap(),
    ];

    DataModelDesc::new(
        "sales_model",
        sales,
        vec![buyer_account, seller_account, buyer_country, seller_country],
        joins,
    )
}

/// Context with a single scan of SALES as the fact table
pub fn sales_context(id: u32) -> QueryContext {
    let mut ctx = QueryContext::new(id);
    ctx.add_table_scan(TableScan::new("SALES", sales_table())).unwrap();
    assert!(ctx.set_first_table_scan("SALES"));
    ctx
}

/// Column of a registered scan
pub fn col(ctx: &QueryContext, alias: &str, name: &str) -> TblColRef {
    ctx.table_scan(alias)
        .and_then(|scan| scan.column(name))
        .unwrap_or_else(|| panic!("no column {}.{}", alias, name))
}

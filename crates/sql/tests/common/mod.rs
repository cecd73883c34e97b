//! Shared fixtures: a TPC-H-flavored catalog and a pinned session.

use chrono::NaiveDate;
use fanout_sql::{
    ConfigSnapshot, MemoryCatalog, ResolveContext, SessionValues, TypeCode, TypeDescriptor,
};
use std::sync::Arc;

pub fn catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    catalog.add_table(
        "nation",
        vec![
            ("n_nationkey", TypeDescriptor::new(TypeCode::Int), false),
            (
                "n_name",
                TypeDescriptor::with_length(TypeCode::Char, 25),
                false,
            ),
            ("n_regionkey", TypeDescriptor::new(TypeCode::Int), false),
            (
                "n_comment",
                TypeDescriptor::with_length(TypeCode::VarChar, 152),
                true,
            ),
        ],
    );
    catalog.add_table(
        "region",
        vec![
            ("r_regionkey", TypeDescriptor::new(TypeCode::Int), false),
            (
                "r_name",
                TypeDescriptor::with_length(TypeCode::Char, 25),
                false,
            ),
        ],
    );
    catalog.add_table(
        "supplier",
        vec![
            ("s_suppkey", TypeDescriptor::new(TypeCode::Int), false),
            (
                "s_name",
                TypeDescriptor::with_length(TypeCode::Char, 25),
                false,
            ),
            ("s_nationkey", TypeDescriptor::new(TypeCode::Int), false),
            ("s_acctbal", TypeDescriptor::numeric(12, 2), true),
        ],
    );
    catalog
}

pub fn session() -> SessionValues {
    let now = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    SessionValues::at(now, "tester", "tpch", "1.0")
}

pub fn context<'a>(
    catalog: &'a MemoryCatalog,
    session: &'a SessionValues,
) -> ResolveContext<'a> {
    ResolveContext::new(catalog, Arc::new(ConfigSnapshot::default()), session)
}

//! Shared fixtures for function-rule tests.

use crate::catalog::MemoryCatalog;
use crate::config::ConfigSnapshot;
use crate::context::{ResolveContext, SessionValues};
use crate::error::Result;
use crate::expr::resolve::Resolver;
use crate::expr::Expression;
use crate::query::{QueryTree, RelationNode};
use crate::types::{TypeCode, TypeDescriptor};
use chrono::NaiveDate;
use std::sync::Arc;

/// Resolve one expression against a small fixed catalog.
pub(crate) fn resolve(expr: &mut Expression) -> Result<TypeDescriptor> {
    resolve_with(expr, ConfigSnapshot::default())
}

pub(crate) fn resolve_with(
    expr: &mut Expression,
    config: ConfigSnapshot,
) -> Result<TypeDescriptor> {
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
        ],
    );
    let now = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    let session = SessionValues::at(now, "tester", "tpch", "1.0");
    let ctx = ResolveContext::new(&catalog, Arc::new(config), &session);
    let mut tree = QueryTree::new();
    tree.add_from(RelationNode::table("nation"));
    Resolver::new(&mut tree, &ctx).resolve_expr(expr)
}

/// A pre-typed operand carrying the given descriptor.
pub(crate) fn of(ty: TypeDescriptor) -> Expression {
    Expression::typed_constant("x", ty)
}

pub(crate) fn of_code(code: TypeCode) -> Expression {
    of(TypeDescriptor::new(code))
}

pub(crate) fn chars(len: u32) -> Expression {
    of(TypeDescriptor::with_length(TypeCode::VarChar, len))
}

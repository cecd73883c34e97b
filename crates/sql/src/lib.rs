//! Expression typing and SQL fragment regeneration for the fanout federated
//! query engine.
//!
//! The coordinator parses each client statement into a [`QueryTree`] of
//! relation nodes plus [`Expression`] trees, resolves every expression to a
//! [`TypeDescriptor`] against the catalog and configuration, and then
//! rebuilds SQL text fragments to ship to individual shards. This crate is
//! that middle: it owns the type vocabulary, the function catalog with its
//! per-function type rules, resolution, and text regeneration. Parsing and
//! execution live elsewhere.

pub mod caching;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod expr;
pub mod functions;
pub mod query;
pub mod types;

pub use caching::{CacheStats, FragmentCache};
pub use catalog::{Catalog, ColumnMeta, MemoryCatalog};
pub use config::{ConfigSnapshot, ConfigStore, CustomSignature, TypeClass};
pub use context::{ResolveContext, SessionValues};
pub use error::{Error, Result};
pub use expr::rebuild::Rebuilder;
pub use expr::resolve::Resolver;
pub use expr::{BinaryOperator, ColumnRef, ExprKind, Expression, FunctionCall, UnaryOperator};
pub use functions::{normalize_date, normalize_time, normalize_timestamp, FunctionId};
pub use query::{NodeId, OrderItem, Projection, QueryTree, RelationKind, RelationNode};
pub use types::{TypeCode, TypeDescriptor};

/// Resolve one expression against a tree and context.
pub fn resolve_expression(
    tree: &mut QueryTree,
    ctx: &ResolveContext<'_>,
    expr: &mut Expression,
) -> Result<TypeDescriptor> {
    Resolver::new(tree, ctx).resolve_expr(expr)
}

/// Render one resolved expression back to SQL text.
pub fn rebuild_expression(
    tree: &QueryTree,
    ctx: &ResolveContext<'_>,
    expr: &Expression,
) -> Result<String> {
    Rebuilder::new(tree, ctx).rebuild_expr(expr)
}

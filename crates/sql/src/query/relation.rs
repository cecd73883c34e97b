//! Query-tree relation nodes
//!
//! One node per FROM-clause reference: either a base table or one of the
//! subquery kinds. Nodes participate in a join DAG with multiple parents;
//! edges and outer-join levels are maintained through `QueryTree`.

use crate::expr::{ColumnRef, Expression};
use crate::query::NodeId;
use serde::{Deserialize, Serialize};

/// Relation node kinds. The vocabulary is fixed; classification drives both
/// resolution and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    Table,
    SubqueryScalar,
    SubqueryRelation,
    SubqueryNonCorrelated,
    SubqueryCorrelated,
    SubqueryCorrelatedPlaceholder,
    /// A collapsed or placeholder node that no longer renders.
    Fake,
}

impl RelationKind {
    pub fn is_subquery(&self) -> bool {
        matches!(
            self,
            RelationKind::SubqueryScalar
                | RelationKind::SubqueryRelation
                | RelationKind::SubqueryNonCorrelated
                | RelationKind::SubqueryCorrelated
                | RelationKind::SubqueryCorrelatedPlaceholder
        )
    }

    pub fn is_correlated(&self) -> bool {
        matches!(
            self,
            RelationKind::SubqueryCorrelated | RelationKind::SubqueryCorrelatedPlaceholder
        )
    }
}

/// A projected output of a relation node. `label` is the AS alias from the
/// projection itself; `outer_alias` is the name the enclosing query
/// registered this output under, when different.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub expr: Expression,
    pub label: Option<String>,
    pub outer_alias: Option<String>,
}

impl Projection {
    pub fn new(expr: Expression) -> Self {
        Self {
            expr,
            label: None,
            outer_alias: None,
        }
    }

    pub fn labeled(expr: Expression, label: &str) -> Self {
        Self {
            expr,
            label: Some(label.to_string()),
            outer_alias: None,
        }
    }

    /// The name this projection answers to from the outside.
    pub fn output_name(&self) -> Option<&str> {
        if let Some(label) = &self.label {
            return Some(label);
        }
        match &self.expr.kind {
            crate::expr::ExprKind::Column(col) => Some(&col.name),
            _ => None,
        }
    }
}

/// One FROM-clause reference. Annotated during resolution, rewritten during
/// distributed planning (temp-table assignment), destroyed with its tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationNode {
    pub kind: RelationKind,
    /// Base table name for `Table` nodes.
    pub table: Option<String>,
    pub alias: Option<String>,
    /// Whether the alias came from the source text rather than being
    /// propagated from a collapsed parent.
    pub own_alias: bool,
    /// Projected outputs of this relation.
    pub projections: Vec<Projection>,
    /// Local filter predicates (WHERE fragments pushed to this node).
    pub conditions: Vec<Expression>,
    /// Join predicates against siblings.
    pub joins: Vec<Expression>,
    /// Columns of enclosing queries referenced by this (correlated) node.
    pub correlated: Vec<ColumnRef>,
    /// Outer-join nesting level; 0 means no outer join above this node.
    pub outer_level: u32,
    /// Join DAG edges. Multiple parents are allowed.
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
    /// Set once the distributed planner materializes this node; rendering
    /// then substitutes this name for the original reference.
    pub temp_table: Option<String>,
    pub(crate) resolved: bool,
}

impl RelationNode {
    pub fn table(name: &str) -> Self {
        Self {
            kind: RelationKind::Table,
            table: Some(name.to_string()),
            alias: None,
            own_alias: false,
            projections: Vec::new(),
            conditions: Vec::new(),
            joins: Vec::new(),
            correlated: Vec::new(),
            outer_level: 0,
            parents: Vec::new(),
            children: Vec::new(),
            temp_table: None,
            resolved: false,
        }
    }

    pub fn subquery(kind: RelationKind) -> Self {
        debug_assert!(kind.is_subquery());
        Self {
            kind,
            table: None,
            ..Self::table("")
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self.own_alias = true;
        self
    }

    /// Mark this node as materialized under the given temp-table name.
    pub fn set_temp_table(&mut self, name: &str) {
        self.temp_table = Some(name.to_string());
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// The name this relation renders under, in priority order: temp table,
    /// node alias, base table name.
    pub fn effective_name(&self) -> Option<&str> {
        self.temp_table
            .as_deref()
            .or(self.alias.as_deref())
            .or(self.table.as_deref())
    }
}

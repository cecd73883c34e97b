//! Statement query tree
//!
//! `QueryTree` is an arena of relation nodes plus the outermost query's
//! projection, condition, grouping and ordering lists. All cross-references
//! (join DAG edges, expression back-references, subquery links) are arena
//! indices, so the multiply-linked structure stays cycle-free at the
//! ownership level while the DAG itself may share children between parents.

pub mod relation;

pub use relation::{Projection, RelationKind, RelationNode};

use crate::error::{Error, Result};
use crate::expr::{ColumnRef, ExprKind, Expression};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena index of a relation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sort direction for one ORDER BY item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expr: Expression,
    pub ascending: bool,
}

/// Container for one statement's relation nodes and top-level lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTree {
    pub nodes: Vec<RelationNode>,
    /// FROM-clause entries of the outermost query.
    pub from: Vec<NodeId>,
    pub projections: Vec<Projection>,
    pub conditions: Vec<Expression>,
    pub group_by: Vec<Expression>,
    pub order_by: Vec<OrderItem>,
}

impl QueryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: RelationNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add a node and register it in the outer FROM list.
    pub fn add_from(&mut self, node: RelationNode) -> NodeId {
        let id = self.add_node(node);
        self.from.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &RelationNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut RelationNode {
        &mut self.nodes[id.0]
    }

    /// Whether `ancestor` can reach `node` downward through child edges,
    /// i.e. is one of its (transitive) parents.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut stack = self.nodes[node.0].parents.clone();
        let mut seen = vec![false; self.nodes.len()];
        while let Some(p) = stack.pop() {
            if p == ancestor {
                return true;
            }
            if !seen[p.0] {
                seen[p.0] = true;
                stack.extend(self.nodes[p.0].parents.iter().copied());
            }
        }
        false
    }

    /// Link `node` under `parents`, raising its outer level to the parents'
    /// maximum, and further to `new_level` for an outer join. The source of
    /// this structure never guarded against self-ancestry; we do.
    pub fn add_parent_nodes(
        &mut self,
        node: NodeId,
        parents: &[NodeId],
        is_outer: bool,
        new_level: u32,
    ) -> Result<()> {
        for &p in parents {
            if p == node || self.is_ancestor(node, p) {
                return Err(Error::Internal(format!(
                    "relation {} would become its own ancestor",
                    node
                )));
            }
        }

        let mut level = self.nodes[node.0].outer_level;
        for &p in parents {
            level = level.max(self.nodes[p.0].outer_level);
            if !self.nodes[p.0].children.contains(&node) {
                self.nodes[p.0].children.push(node);
            }
            if !self.nodes[node.0].parents.contains(&p) {
                self.nodes[node.0].parents.push(p);
            }
        }
        if is_outer {
            level = level.max(new_level);
        }
        self.nodes[node.0].outer_level = level;
        Ok(())
    }

    /// Merge an inner-joined sibling's parent set into `node`, matching
    /// outer levels between the two.
    pub fn add_sibling_join(&mut self, node: NodeId, sibling: NodeId) -> Result<()> {
        let sibling_parents = self.nodes[sibling.0].parents.clone();
        self.add_parent_nodes(node, &sibling_parents, false, 0)?;
        let level = self.nodes[node.0]
            .outer_level
            .max(self.nodes[sibling.0].outer_level);
        self.nodes[node.0].outer_level = level;
        self.nodes[sibling.0].outer_level = level;
        Ok(())
    }

    /// A new outer join was spliced in below an already-computed level:
    /// every node at or above `inserted_level` shifts up by one.
    pub fn notify_outer_level_inserted(&mut self, node: NodeId, inserted_level: u32) {
        if self.nodes[node.0].outer_level >= inserted_level {
            self.nodes[node.0].outer_level += 1;
        }
    }

    /// Resolve a column against a subquery relation's projection list.
    /// Three tiers: exact outer-alias equality; else unqualified reference
    /// matching the projection label; else underlying column-name equality
    /// with a matching table qualifier.
    pub fn matching_projection(&self, node: NodeId, col: &ColumnRef) -> Result<usize> {
        let relation = &self.nodes[node.0];

        for (i, p) in relation.projections.iter().enumerate() {
            if p.outer_alias.as_deref() == Some(col.name.as_str()) {
                return Ok(i);
            }
        }
        if col.table.is_none() {
            for (i, p) in relation.projections.iter().enumerate() {
                if p.label.as_deref() == Some(col.name.as_str()) {
                    return Ok(i);
                }
            }
        }
        for (i, p) in relation.projections.iter().enumerate() {
            if let ExprKind::Column(inner) = &p.expr.kind {
                if inner.name != col.name {
                    continue;
                }
                let qualifier_ok = match col.table.as_deref() {
                    None => true,
                    Some(q) => {
                        relation.alias.as_deref() == Some(q)
                            || relation.table.as_deref() == Some(q)
                            || inner.table.as_deref() == Some(q)
                    }
                };
                if qualifier_ok {
                    return Ok(i);
                }
            }
        }
        Err(Error::ColumnNotFound(match &col.table {
            Some(table) => format!("{}.{}", table, col.name),
            None => col.name.clone(),
        }))
    }

    /// `matching_projection`, returning the expression itself.
    pub fn get_matching_sql_expression(&self, node: NodeId, col: &ColumnRef) -> Result<&Expression> {
        let ordinal = self.matching_projection(node, col)?;
        Ok(&self.nodes[node.0].projections[ordinal].expr)
    }

    /// Collapse a pass-through single-table subquery: its alias moves to the
    /// sole child table, every reference is re-pointed at the child, and the
    /// subquery node degrades to `Fake`.
    pub fn handle_alias_for_single_table_subquery(&mut self, node: NodeId) -> Result<()> {
        if self.nodes[node.0].kind != RelationKind::SubqueryRelation {
            return Err(Error::Internal(format!(
                "relation {} is not a subquery relation",
                node
            )));
        }
        if self.nodes[node.0].children.len() != 1 {
            return Err(Error::Internal(format!(
                "relation {} is not a single-table subquery",
                node
            )));
        }
        let child = self.nodes[node.0].children[0];
        if self.nodes[child.0].kind != RelationKind::Table {
            return Err(Error::Internal(format!(
                "relation {} does not wrap a base table",
                node
            )));
        }

        // Alias propagates; the child keeps rendering under it but does not
        // own it.
        self.nodes[child.0].alias = self.nodes[node.0].alias.clone();
        self.nodes[child.0].own_alias = false;

        let mut projections = std::mem::take(&mut self.nodes[node.0].projections);
        for p in &mut projections {
            remap_relation(&mut p.expr, node, child);
        }
        self.nodes[child.0].projections = projections;

        let mut conditions = std::mem::take(&mut self.nodes[node.0].conditions);
        for c in &mut conditions {
            remap_relation(c, node, child);
        }
        self.nodes[child.0].conditions.extend(conditions);

        for p in &mut self.projections {
            remap_relation(&mut p.expr, node, child);
        }
        for c in &mut self.conditions {
            remap_relation(c, node, child);
        }
        for g in &mut self.group_by {
            remap_relation(g, node, child);
        }
        for o in &mut self.order_by {
            remap_relation(&mut o.expr, node, child);
        }
        for other in &mut self.nodes {
            for p in &mut other.projections {
                remap_relation(&mut p.expr, node, child);
            }
            for c in &mut other.conditions {
                remap_relation(c, node, child);
            }
            for j in &mut other.joins {
                remap_relation(j, node, child);
            }
        }

        for entry in &mut self.from {
            if *entry == node {
                *entry = child;
            }
        }
        self.nodes[node.0].kind = RelationKind::Fake;
        self.nodes[node.0].children.clear();
        self.nodes[child.0].parents.retain(|p| *p != node);
        Ok(())
    }

    /// Ensure every subquery node between a correlated subquery and the
    /// defining relation re-projects the correlated columns.
    pub fn propagate_correlated_columns(&mut self) {
        for id in 0..self.nodes.len() {
            if !self.nodes[id].kind.is_correlated() {
                continue;
            }
            let correlated = self.nodes[id].correlated.clone();
            let mut targets = vec![NodeId(id)];
            targets.extend(self.subquery_ancestors(NodeId(id)));
            for col in &correlated {
                for &target in &targets {
                    self.ensure_projected(target, col);
                }
            }
        }
    }

    fn subquery_ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.nodes[node.0].parents.clone();
        let mut seen = vec![false; self.nodes.len()];
        while let Some(p) = stack.pop() {
            if seen[p.0] {
                continue;
            }
            seen[p.0] = true;
            if self.nodes[p.0].kind.is_subquery() {
                out.push(p);
            }
            stack.extend(self.nodes[p.0].parents.iter().copied());
        }
        out
    }

    fn ensure_projected(&mut self, node: NodeId, col: &ColumnRef) {
        let exists = self.nodes[node.0].projections.iter().any(|p| {
            matches!(&p.expr.kind, ExprKind::Column(c) if c.name == col.name)
                || p.output_name() == Some(col.name.as_str())
        });
        if !exists {
            self.nodes[node.0]
                .projections
                .push(Projection::new(Expression::column(col.clone())));
        }
    }
}

/// Re-point column references from one relation to another after a node
/// collapse. Mapped ordinals no longer apply to the new target.
fn remap_relation(expr: &mut Expression, from: NodeId, to: NodeId) {
    match &mut expr.kind {
        ExprKind::Column(col) => {
            if col.relation == Some(from) {
                col.relation = Some(to);
                col.mapped = None;
            }
        }
        ExprKind::Unary { operand, .. } => remap_relation(operand, from, to),
        ExprKind::Binary { left, right, .. } => {
            remap_relation(left, from, to);
            remap_relation(right, from, to);
        }
        ExprKind::Function(call) => {
            for arg in &mut call.args {
                remap_relation(arg, from, to);
            }
        }
        ExprKind::Condition(inner) => remap_relation(inner, from, to),
        ExprKind::Case { branches, default } => {
            for (when, then) in branches {
                remap_relation(when, from, to);
                remap_relation(then, from, to);
            }
            if let Some(default) = default {
                remap_relation(default, from, to);
            }
        }
        ExprKind::List(items) => {
            for item in items {
                remap_relation(item, from, to);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_tables(n: usize) -> (QueryTree, Vec<NodeId>) {
        let mut tree = QueryTree::new();
        let ids = (0..n)
            .map(|i| tree.add_node(RelationNode::table(&format!("t{}", i))))
            .collect();
        (tree, ids)
    }

    #[test]
    fn outer_level_rises_with_parents() {
        let (mut tree, ids) = tree_with_tables(3);
        tree.nodes[ids[0].0].outer_level = 2;
        tree.add_parent_nodes(ids[2], &[ids[0], ids[1]], false, 0)
            .unwrap();
        assert_eq!(tree.node(ids[2]).outer_level, 2);

        tree.add_parent_nodes(ids[2], &[ids[1]], true, 5).unwrap();
        assert_eq!(tree.node(ids[2]).outer_level, 5);
    }

    #[test]
    fn sibling_join_merges_parents_and_levels() {
        let (mut tree, ids) = tree_with_tables(4);
        tree.add_parent_nodes(ids[2], &[ids[0]], false, 0).unwrap();
        tree.nodes[ids[2].0].outer_level = 1;
        tree.add_parent_nodes(ids[3], &[ids[1]], false, 0).unwrap();

        tree.add_sibling_join(ids[3], ids[2]).unwrap();
        assert!(tree.node(ids[3]).parents.contains(&ids[0]));
        assert!(tree.node(ids[3]).parents.contains(&ids[1]));
        assert_eq!(tree.node(ids[3]).outer_level, 1);
        assert_eq!(tree.node(ids[2]).outer_level, 1);
    }

    #[test]
    fn inserted_outer_level_shifts_existing_levels() {
        let (mut tree, ids) = tree_with_tables(2);
        tree.nodes[ids[0].0].outer_level = 2;
        tree.nodes[ids[1].0].outer_level = 1;
        tree.notify_outer_level_inserted(ids[0], 2);
        tree.notify_outer_level_inserted(ids[1], 2);
        assert_eq!(tree.node(ids[0]).outer_level, 3);
        assert_eq!(tree.node(ids[1]).outer_level, 1);
    }

    #[test]
    fn own_ancestor_is_rejected() {
        let (mut tree, ids) = tree_with_tables(2);
        tree.add_parent_nodes(ids[1], &[ids[0]], false, 0).unwrap();
        let err = tree.add_parent_nodes(ids[0], &[ids[1]], false, 0);
        assert!(matches!(err, Err(Error::Internal(_))));
        let err = tree.add_parent_nodes(ids[0], &[ids[0]], false, 0);
        assert!(matches!(err, Err(Error::Internal(_))));
    }

    #[test]
    fn three_tier_projection_match() {
        let mut tree = QueryTree::new();
        let nation = tree.add_node(RelationNode::table("nation"));
        let mut sub = RelationNode::subquery(RelationKind::SubqueryRelation).with_alias("ns");
        sub.projections.push(Projection {
            expr: Expression::column(ColumnRef::bound(nation, Some("nation"), "n_nationkey")),
            label: Some("ns".to_string()),
            outer_alias: Some("nation_key".to_string()),
        });
        let sub = tree.add_node(sub);

        // Registered outer alias.
        let by_outer = ColumnRef::new(None, "nation_key");
        // Projection label, unqualified.
        let by_label = ColumnRef::new(None, "ns");
        // Underlying column name with the subquery alias as qualifier.
        let by_name = ColumnRef::new(Some("ns"), "n_nationkey");

        let a = tree.matching_projection(sub, &by_outer).unwrap();
        let b = tree.matching_projection(sub, &by_label).unwrap();
        let c = tree.matching_projection(sub, &by_name).unwrap();
        assert_eq!(a, 0);
        assert_eq!(a, b);
        assert_eq!(b, c);

        let missing = ColumnRef::new(None, "n_regionkey");
        assert!(matches!(
            tree.matching_projection(sub, &missing),
            Err(Error::ColumnNotFound(_))
        ));
    }
}

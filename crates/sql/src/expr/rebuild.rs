//! SQL text regeneration
//!
//! Turns resolved trees back into SQL for shipping to shards. Rendering is
//! driven by the same context as resolution: cast and function templates
//! come from the configuration, coordinator-only functions become literals
//! from the session, and materialized relations render under their
//! temp-table names.

use crate::context::ResolveContext;
use crate::error::{Error, Result};
use crate::expr::{ColumnRef, Constant, ExprKind, Expression, FunctionCall};
use crate::functions::FunctionId;
use crate::query::{NodeId, QueryTree, RelationKind};
use crate::types::TypeCode;

pub struct Rebuilder<'a> {
    tree: &'a QueryTree,
    ctx: &'a ResolveContext<'a>,
}

impl<'a> Rebuilder<'a> {
    pub fn new(tree: &'a QueryTree, ctx: &'a ResolveContext<'a>) -> Self {
        Self { tree, ctx }
    }

    fn quote(&self, ident: &str) -> String {
        let q = self.ctx.config.identifier_quote;
        format!("{}{}{}", q, ident, q)
    }

    /// Render the whole statement from the outer query's lists.
    pub fn rebuild_tree(&self) -> Result<String> {
        let mut out = String::from("SELECT ");
        if self.tree.projections.is_empty() {
            out.push('*');
        } else {
            for (i, p) in self.tree.projections.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&self.rebuild_expr(&p.expr)?);
                if let Some(label) = &p.label {
                    out.push_str(" AS ");
                    out.push_str(label);
                }
            }
        }

        let mut first = true;
        for &id in &self.tree.from {
            if self.tree.node(id).kind == RelationKind::Fake {
                continue;
            }
            out.push_str(if first { " FROM " } else { ", " });
            first = false;
            out.push_str(&self.rebuild_relation(id)?);
        }

        // A collapsed subquery leaves its predicates on the base table node;
        // those ship in the statement's WHERE alongside the outer conditions.
        let mut predicates: Vec<&Expression> = self.tree.conditions.iter().collect();
        for &id in &self.tree.from {
            let node = self.tree.node(id);
            if node.kind == RelationKind::Table && node.temp_table.is_none() {
                predicates.extend(node.conditions.iter());
                predicates.extend(node.joins.iter());
            }
        }
        if !predicates.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(&self.conjunction(&predicates)?);
        }
        if !self.tree.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            for (i, g) in self.tree.group_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&self.rebuild_expr(g)?);
            }
        }
        if !self.tree.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            for (i, o) in self.tree.order_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&self.rebuild_expr(&o.expr)?);
                out.push_str(if o.ascending { " ASC" } else { " DESC" });
            }
        }
        Ok(out)
    }

    /// Render one FROM-clause entry.
    pub fn rebuild_relation(&self, id: NodeId) -> Result<String> {
        let node = self.tree.node(id);

        // A materialized node renders under its temp-table name whatever
        // kind it started as.
        if let Some(temp) = &node.temp_table {
            let mut out = self.quote(temp);
            if let Some(alias) = &node.alias {
                out.push_str(" AS ");
                out.push_str(&self.quote(alias));
            }
            return Ok(out);
        }

        match node.kind {
            RelationKind::Table => {
                let table = node
                    .table
                    .as_deref()
                    .ok_or_else(|| Error::Internal(format!("{} has no table name", id)))?;
                let mut out = match &self.ctx.shard_qualifier {
                    Some(q) => format!("{}.{}", self.quote(q), self.quote(table)),
                    None => self.quote(table),
                };
                if let Some(alias) = &node.alias {
                    out.push_str(" AS ");
                    out.push_str(&self.quote(alias));
                }
                Ok(out)
            }
            RelationKind::SubqueryRelation => {
                let block = self.rebuild_block(id)?;
                match &node.alias {
                    Some(alias) => Ok(format!("({}) AS {}", block, self.quote(alias))),
                    None => Ok(format!("({})", block)),
                }
            }
            RelationKind::Fake => Err(Error::Internal(format!(
                "collapsed relation {} does not render",
                id
            ))),
            _ => Err(Error::Internal(format!(
                "relation {} renders only inside its containing expression",
                id
            ))),
        }
    }

    /// Render a subquery node as a SELECT block.
    fn rebuild_block(&self, id: NodeId) -> Result<String> {
        let node = self.tree.node(id);
        let mut out = String::from("SELECT ");
        if node.projections.is_empty() {
            out.push('*');
        } else {
            for (i, p) in node.projections.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&self.rebuild_expr(&p.expr)?);
                if let Some(label) = &p.label {
                    out.push_str(" AS ");
                    out.push_str(label);
                }
            }
        }

        let mut first = true;
        for &child in &node.children {
            if self.tree.node(child).kind == RelationKind::Fake {
                continue;
            }
            out.push_str(if first { " FROM " } else { ", " });
            first = false;
            out.push_str(&self.rebuild_relation(child)?);
        }

        let mut predicates = Vec::new();
        predicates.extend(node.conditions.iter());
        predicates.extend(node.joins.iter());
        if !predicates.is_empty() {
            out.push_str(" WHERE ");
            for (i, p) in predicates.iter().enumerate() {
                if i > 0 {
                    out.push_str(" AND ");
                }
                out.push_str(&self.rebuild_expr(p)?);
            }
        }
        Ok(out)
    }

    fn conjunction(&self, predicates: &[&Expression]) -> Result<String> {
        let mut out = String::new();
        for (i, p) in predicates.iter().enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            out.push_str(&self.rebuild_expr(p)?);
        }
        Ok(out)
    }

    pub fn rebuild_expr(&self, expr: &Expression) -> Result<String> {
        match &expr.kind {
            ExprKind::Column(col) => Ok(self.column_text(col)),
            ExprKind::Constant(c) => Ok(self.constant_text(expr, c)),
            ExprKind::Unary { op, operand } => Ok(format!(
                "({}{})",
                op.symbol(),
                self.rebuild_expr(operand)?
            )),
            ExprKind::Binary { op, left, right } => Ok(format!(
                "({} {} {})",
                self.rebuild_expr(left)?,
                op.symbol(),
                self.rebuild_expr(right)?
            )),
            ExprKind::Function(call) => self.function_text(call),
            ExprKind::Subquery(node) => Ok(format!("({})", self.rebuild_block(*node)?)),
            ExprKind::Condition(inner) => self.rebuild_expr(inner),
            ExprKind::Case { branches, default } => {
                let mut out = String::from("CASE");
                for (when, then) in branches {
                    out.push_str(" WHEN ");
                    out.push_str(&self.rebuild_expr(when)?);
                    out.push_str(" THEN ");
                    out.push_str(&self.rebuild_expr(then)?);
                }
                if let Some(default) = default {
                    out.push_str(" ELSE ");
                    out.push_str(&self.rebuild_expr(default)?);
                }
                out.push_str(" END");
                Ok(out)
            }
            ExprKind::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.rebuild_expr(item)?);
                }
                Ok(format!("({})", parts.join(", ")))
            }
            ExprKind::Parameter(index) => Ok(self
                .ctx
                .bindings
                .get(*index)
                .cloned()
                .unwrap_or_else(|| "?".to_string())),
        }
    }

    /// Source qualifier priority: owning node's temp table, then its alias,
    /// then the written qualifier, then the base table name. Column name
    /// priority: temp alias, registered alias, bare name.
    fn column_text(&self, col: &ColumnRef) -> String {
        let node = col.relation.map(|id| self.tree.node(id));
        let source = node
            .and_then(|n| n.temp_table.as_deref())
            .or_else(|| node.and_then(|n| n.alias.as_deref()))
            .or(col.table.as_deref())
            .or_else(|| node.and_then(|n| n.table.as_deref()));
        let name = col
            .temp_alias
            .as_deref()
            .or(col.alias.as_deref())
            .unwrap_or(&col.name);
        match source {
            Some(source) => format!("{}.{}", source, name),
            None => name.to_string(),
        }
    }

    fn constant_text(&self, expr: &Expression, c: &Constant) -> String {
        if c.null {
            return "NULL".to_string();
        }
        match expr.resolved_type() {
            Some(ty) if ty.code == TypeCode::Interval && self.ctx.config.strip_interval_quotes => {
                c.text.replace('\'', "")
            }
            Some(ty) if ty.is_character() && !c.text.starts_with('\'') => {
                format!("'{}'", c.text.replace('\'', "''"))
            }
            _ => c.text.clone(),
        }
    }

    fn function_text(&self, call: &FunctionCall) -> Result<String> {
        if let Some(target) = &call.cast_target {
            let operand = call
                .args
                .first()
                .ok_or_else(|| Error::Internal("cast without an operand".to_string()))?;
            let source = operand
                .resolved_type()
                .map(|t| t.code)
                .unwrap_or(TypeCode::Unknown);
            let template = self
                .ctx
                .config
                .cast_template(source, target.code)
                .ok_or_else(|| Error::UnsupportedCast {
                    from: source.to_string(),
                    to: target.sql_name(),
                })?;
            let rendered = [self.rebuild_expr(operand)?, target.sql_name()];
            return Ok(crate::config::ConfigSnapshot::apply_template(
                template, &rendered,
            ));
        }

        if let Some(id) = call.id {
            if id.is_coordinator_only() {
                return Ok(self.session_literal(id));
            }
        }

        let mut rendered = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            rendered.push(self.rebuild_expr(arg)?);
        }

        if let Some(template) = self.ctx.config.function_template(&call.name) {
            return Ok(crate::config::ConfigSnapshot::apply_template(
                template, &rendered,
            ));
        }

        let mut out = String::new();
        out.push_str(&call.name);
        out.push('(');
        if call.distinct {
            out.push_str("DISTINCT ");
        }
        out.push_str(&rendered.join(&self.ctx.config.argument_separator));
        out.push(')');
        Ok(out)
    }

    /// Coordinator-only functions render as literals captured at statement
    /// start, so every shard evaluates against the same values.
    fn session_literal(&self, id: FunctionId) -> String {
        let session = self.ctx.session;
        match id {
            FunctionId::CurrentDate => {
                format!("'{}'", session.current_date.format("%Y-%m-%d"))
            }
            FunctionId::CurrentTime => {
                format!("'{}'", session.current_time.format("%H:%M:%S"))
            }
            FunctionId::CurrentTimestamp | FunctionId::Now => {
                format!(
                    "'{}'",
                    session.current_timestamp.format("%Y-%m-%d %H:%M:%S")
                )
            }
            FunctionId::CurrentUser | FunctionId::User | FunctionId::SessionUser => {
                format!("'{}'", session.user.replace('\'', "''"))
            }
            FunctionId::Database => format!("'{}'", session.database.replace('\'', "''")),
            FunctionId::Version => format!("'{}'", session.version.replace('\'', "''")),
            _ => id_name_fallback(id),
        }
    }
}

fn id_name_fallback(id: FunctionId) -> String {
    // Unreachable for the coordinator-only set; kept total for safety.
    format!("{:?}()", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::ConfigSnapshot;
    use crate::context::SessionValues;
    use crate::expr::resolve::Resolver;
    use crate::expr::BinaryOperator;
    use crate::query::RelationNode;
    use crate::types::TypeDescriptor;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn catalog() -> MemoryCatalog {
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
        catalog
    }

    fn session() -> SessionValues {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        SessionValues::at(now, "tester", "tpch", "1.0")
    }

    fn render(expr: &mut Expression, config: ConfigSnapshot) -> Result<String> {
        let catalog = catalog();
        let session = session();
        let ctx = ResolveContext::new(&catalog, Arc::new(config), &session);
        let mut tree = QueryTree::new();
        tree.add_from(RelationNode::table("nation"));
        Resolver::new(&mut tree, &ctx).resolve_expr(expr)?;
        Rebuilder::new(&tree, &ctx).rebuild_expr(expr)
    }

    #[test]
    fn cast_uses_pair_template_then_default() {
        let mut config = ConfigSnapshot::default();
        config.set_cast_template(TypeCode::Int, TypeCode::VarChar, "TO_CHAR({0})");

        let operand = Expression::typed_constant("7", TypeDescriptor::new(TypeCode::Int));
        let mut pair = Expression::cast(
            operand.clone(),
            TypeDescriptor::with_length(TypeCode::VarChar, 20),
        );
        assert_eq!(render(&mut pair, config.clone()).unwrap(), "TO_CHAR(7)");

        let mut fallback = Expression::cast(operand, TypeDescriptor::new(TypeCode::BigInt));
        assert_eq!(
            render(&mut fallback, config).unwrap(),
            "CAST(7 AS BIGINT)"
        );
    }

    #[test]
    fn cast_without_any_template_fails() {
        let mut config = ConfigSnapshot::default();
        config.clear_default_cast_template();
        let mut expr = Expression::cast(
            Expression::typed_constant("7", TypeDescriptor::new(TypeCode::Int)),
            TypeDescriptor::new(TypeCode::BigInt),
        );
        assert!(matches!(
            render(&mut expr, config),
            Err(Error::UnsupportedCast { .. })
        ));
    }

    #[test]
    fn coordinator_functions_render_as_session_literals() {
        let mut date = Expression::function("CURRENT_DATE", vec![]);
        assert_eq!(
            render(&mut date, ConfigSnapshot::default()).unwrap(),
            "'2024-03-01'"
        );

        let mut now = Expression::function("NOW", vec![]);
        assert_eq!(
            render(&mut now, ConfigSnapshot::default()).unwrap(),
            "'2024-03-01 10:30:00'"
        );

        let mut user = Expression::function("USER", vec![]);
        assert_eq!(
            render(&mut user, ConfigSnapshot::default()).unwrap(),
            "'tester'"
        );
    }

    #[test]
    fn function_template_overrides_default_rendering() {
        let mut config = ConfigSnapshot::default();
        config.set_function_template("NVL", "COALESCE({0}, {1})");
        let mut expr = Expression::function(
            "NVL",
            vec![
                Expression::typed_constant("1", TypeDescriptor::new(TypeCode::Int)),
                Expression::typed_constant("2", TypeDescriptor::new(TypeCode::Int)),
            ],
        );
        assert_eq!(render(&mut expr, config).unwrap(), "COALESCE(1, 2)");
    }

    #[test]
    fn column_renders_through_priority_chain() {
        let catalog = catalog();
        let session = session();
        let ctx = ResolveContext::new(&catalog, Arc::new(ConfigSnapshot::default()), &session);
        let mut tree = QueryTree::new();
        let id = tree.add_from(RelationNode::table("nation"));

        let mut col = ColumnRef::bound(id, None, "n_name");
        let expr = Expression::column(col.clone());
        let rebuilder = Rebuilder::new(&tree, &ctx);
        assert_eq!(rebuilder.rebuild_expr(&expr).unwrap(), "nation.n_name");

        tree.node_mut(id).alias = Some("n".to_string());
        let rebuilder = Rebuilder::new(&tree, &ctx);
        assert_eq!(
            rebuilder.rebuild_expr(&Expression::column(col.clone())).unwrap(),
            "n.n_name"
        );

        tree.node_mut(id).set_temp_table("tmp_7");
        col.temp_alias = Some("c1".to_string());
        let rebuilder = Rebuilder::new(&tree, &ctx);
        assert_eq!(
            rebuilder.rebuild_expr(&Expression::column(col)).unwrap(),
            "tmp_7.c1"
        );
    }

    #[test]
    fn tree_renders_select_from_where() {
        let catalog = catalog();
        let session = session();
        let ctx = ResolveContext::new(&catalog, Arc::new(ConfigSnapshot::default()), &session);
        let mut tree = QueryTree::new();
        let id = tree.add_from(RelationNode::table("nation"));
        tree.projections.push(crate::query::Projection::new(
            Expression::column(ColumnRef::bound(id, None, "n_name")),
        ));
        tree.conditions.push(Expression::binary(
            BinaryOperator::GreaterThan,
            Expression::column(ColumnRef::bound(id, None, "n_nationkey")),
            Expression::constant("5"),
        ));

        Resolver::new(&mut tree, &ctx).resolve_tree().unwrap();
        let sql = Rebuilder::new(&tree, &ctx).rebuild_tree().unwrap();
        assert_eq!(
            sql,
            "SELECT nation.n_name FROM \"nation\" WHERE (nation.n_nationkey > 5)"
        );
    }

    #[test]
    fn shard_qualifier_prefixes_table_references() {
        let catalog = catalog();
        let session = session();
        let ctx = ResolveContext::new(&catalog, Arc::new(ConfigSnapshot::default()), &session)
            .with_shard_qualifier("shard_3");
        let mut tree = QueryTree::new();
        let id = tree.add_from(RelationNode::table("nation"));
        let sql = Rebuilder::new(&tree, &ctx).rebuild_relation(id).unwrap();
        assert_eq!(sql, "\"shard_3\".\"nation\"");
    }
}

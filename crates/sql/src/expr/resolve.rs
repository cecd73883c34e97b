//! Bottom-up type resolution
//!
//! `Resolver` walks expressions depth-first over the statement arena,
//! memoizing each node's descriptor. Subquery relations referenced before
//! their own turn are resolved on demand, so sibling completion is lazy.
//! Node lists are taken out of the arena while their expressions resolve;
//! on error the tree is abandoned wholesale by the statement layer, so
//! partially emptied lists are never observed.

use crate::config::ConfigSnapshot;
use crate::context::ResolveContext;
use crate::error::{Error, Result};
use crate::expr::{BinaryOperator, ColumnRef, ExprKind, Expression, FunctionCall};
use crate::functions;
use crate::functions::FunctionId;
use crate::query::{NodeId, QueryTree, RelationKind};
use crate::types::{TypeCode, TypeDescriptor};

/// Per-statement resolution driver.
pub struct Resolver<'a> {
    pub(crate) tree: &'a mut QueryTree,
    pub(crate) ctx: &'a ResolveContext<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a mut QueryTree, ctx: &'a ResolveContext<'a>) -> Self {
        Self { tree, ctx }
    }

    /// Resolve every node and the outer query's own lists.
    pub fn resolve_tree(&mut self) -> Result<()> {
        for i in 0..self.tree.nodes.len() {
            self.resolve_node(NodeId(i))?;
        }

        let mut projections = std::mem::take(&mut self.tree.projections);
        for p in &mut projections {
            self.resolve_expr(&mut p.expr)?;
        }
        self.tree.projections = projections;

        let mut conditions = std::mem::take(&mut self.tree.conditions);
        for c in &mut conditions {
            self.resolve_expr(c)?;
        }
        self.tree.conditions = conditions;

        let mut group_by = std::mem::take(&mut self.tree.group_by);
        for g in &mut group_by {
            self.resolve_expr(g)?;
        }
        self.tree.group_by = group_by;

        let mut order_by = std::mem::take(&mut self.tree.order_by);
        for o in &mut order_by {
            self.resolve_expr(&mut o.expr)?;
        }
        self.tree.order_by = order_by;
        Ok(())
    }

    /// Resolve one relation node's expression lists. Idempotent.
    pub fn resolve_node(&mut self, id: NodeId) -> Result<()> {
        if self.tree.nodes[id.0].resolved {
            return Ok(());
        }

        let mut projections = std::mem::take(&mut self.tree.nodes[id.0].projections);
        for p in &mut projections {
            self.resolve_expr(&mut p.expr)?;
        }
        self.tree.nodes[id.0].projections = projections;

        let mut conditions = std::mem::take(&mut self.tree.nodes[id.0].conditions);
        for c in &mut conditions {
            self.resolve_expr(c)?;
        }
        self.tree.nodes[id.0].conditions = conditions;

        let mut joins = std::mem::take(&mut self.tree.nodes[id.0].joins);
        for j in &mut joins {
            self.resolve_expr(j)?;
        }
        self.tree.nodes[id.0].joins = joins;

        self.tree.nodes[id.0].resolved = true;
        Ok(())
    }

    /// Resolve one expression, memoizing the result on the node. Parameters
    /// without a declared type resolve to NULL but are not memoized, so a
    /// later pass retries them once the type is known.
    pub fn resolve_expr(&mut self, expr: &mut Expression) -> Result<TypeDescriptor> {
        if let Some(ty) = &expr.ty {
            return Ok(ty.clone());
        }
        let ty = match &mut expr.kind {
            ExprKind::Constant(c) => {
                if c.null {
                    TypeDescriptor::new(TypeCode::Null)
                } else {
                    classify_literal(&c.text)
                }
            }
            ExprKind::Column(col) => self.resolve_column(col)?,
            ExprKind::Parameter(index) => {
                let declared = self
                    .ctx
                    .param_types
                    .get(*index)
                    .and_then(|t| t.as_ref().cloned());
                match declared {
                    Some(ty) => ty,
                    // Deferred: typed NULL, deliberately left uncached.
                    None => return Ok(TypeDescriptor::new(TypeCode::Null)),
                }
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand)?,
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                let lt = self.resolve_expr(left)?;
                let rt = self.resolve_expr(right)?;
                binary_result(op, &lt, &rt)?
            }
            ExprKind::Function(call) => self.resolve_function(call)?,
            ExprKind::Subquery(node) => {
                let node = *node;
                self.resolve_node(node)?;
                self.tree.nodes[node.0]
                    .projections
                    .first()
                    .and_then(|p| p.expr.ty.clone())
                    .ok_or_else(|| {
                        Error::Internal(format!("subquery {} has no projected output", node))
                    })?
            }
            ExprKind::Condition(inner) => {
                self.resolve_expr(inner)?;
                TypeDescriptor::new(TypeCode::Boolean)
            }
            ExprKind::Case { branches, default } => {
                let mut result_types = Vec::with_capacity(branches.len() + 1);
                for (when, then) in branches.iter_mut() {
                    self.resolve_expr(when)?;
                    result_types.push(self.resolve_expr(then)?);
                }
                if let Some(default) = default {
                    result_types.push(self.resolve_expr(default)?);
                }
                case_result(&result_types)?
            }
            ExprKind::List(items) => {
                // NULL elements agree with anything, wherever they sit.
                let mut first: Option<TypeDescriptor> = None;
                for item in items.iter_mut() {
                    let ty = self.resolve_expr(item)?;
                    if ty.is_null() {
                        continue;
                    }
                    match &first {
                        None => first = Some(ty),
                        Some(f) => {
                            if ty.code != f.code {
                                return Err(Error::mismatch(f.to_string(), ty));
                            }
                        }
                    }
                }
                first.unwrap_or_else(|| TypeDescriptor::new(TypeCode::Null))
            }
        };
        expr.ty = Some(ty.clone());
        Ok(ty)
    }

    fn resolve_column(&mut self, col: &mut ColumnRef) -> Result<TypeDescriptor> {
        let not_found = |col: &ColumnRef| {
            Error::ColumnNotFound(match &col.table {
                Some(table) => format!("{}.{}", table, col.name),
                None => col.name.clone(),
            })
        };

        let relation = match col.relation {
            Some(relation) => relation,
            None => return Err(not_found(col)),
        };

        if let Some(ordinal) = col.mapped {
            self.resolve_node(relation)?;
            return self.tree.nodes[relation.0]
                .projections
                .get(ordinal)
                .and_then(|p| p.expr.ty.clone())
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "column {} maps to missing projection {} of {}",
                        col.name, ordinal, relation
                    ))
                });
        }

        let kind = self.tree.nodes[relation.0].kind;
        match kind {
            RelationKind::Table => {
                let table = self.tree.nodes[relation.0]
                    .table
                    .clone()
                    .ok_or_else(|| Error::Internal(format!("{} has no table name", relation)))?;
                let meta = self
                    .ctx
                    .catalog
                    .column(&table, &col.name)
                    .ok_or_else(|| not_found(col))?;
                col.nullable = meta.nullable;
                Ok(meta.ty)
            }
            kind if kind.is_subquery() => {
                self.resolve_node(relation)?;
                let ordinal = self.tree.matching_projection(relation, col)?;
                col.mapped = Some(ordinal);
                self.tree.nodes[relation.0].projections[ordinal]
                    .expr
                    .ty
                    .clone()
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "projection {} of {} left unresolved",
                            ordinal, relation
                        ))
                    })
            }
            _ => Err(not_found(col)),
        }
    }

    fn resolve_function(&mut self, call: &mut FunctionCall) -> Result<TypeDescriptor> {
        // CAST bypasses the catalog: the result is the target descriptor.
        // The operand is still resolved so rendering can pick the
        // (source, target) cast template.
        if let Some(target) = call.cast_target.clone() {
            if let Some(operand) = call.args.first_mut() {
                self.resolve_expr(operand)?;
            }
            let mut ty = target;
            if matches!(ty.code, TypeCode::Char | TypeCode::VarChar) && ty.length == 0 {
                ty.length = 1024;
            }
            return Ok(ty);
        }

        let id = call.id;
        let name = call.name.clone();
        let distinct = call.distinct;
        let mut exprs = std::mem::take(&mut call.args);
        let outcome = {
            let mut args = Args {
                id,
                name: &name,
                distinct,
                exprs: &mut exprs,
                resolver: self,
            };
            functions::resolve_call(&mut args)
        };
        match outcome {
            Ok(resolution) => {
                for (i, replacement) in resolution.rewrites {
                    if i < exprs.len() {
                        exprs[i] = replacement;
                        self.resolve_expr(&mut exprs[i])?;
                    }
                }
                call.args = exprs;
                Ok(resolution.ty)
            }
            Err(e) => {
                call.args = exprs;
                Err(e)
            }
        }
    }
}

/// Literal classification for untyped constants: double-parseable text is
/// DOUBLE PRECISION, everything else character text at its own length.
fn classify_literal(text: &str) -> TypeDescriptor {
    if text.parse::<f64>().is_ok() {
        TypeDescriptor::new(TypeCode::Double)
    } else {
        TypeDescriptor::with_length(TypeCode::VarChar, text.len() as u32)
    }
}

/// Result type of a binary operator application. A NULL operand defers to
/// the other side.
fn binary_result(
    op: BinaryOperator,
    left: &TypeDescriptor,
    right: &TypeDescriptor,
) -> Result<TypeDescriptor> {
    use BinaryOperator::*;

    if op.is_comparison() || matches!(op, And | Or) {
        return Ok(TypeDescriptor::new(TypeCode::Boolean));
    }

    if left.is_null() {
        return Ok(right.clone());
    }
    if right.is_null() {
        return Ok(left.clone());
    }

    match op {
        Concat => {
            if left.is_character() && right.is_character() {
                let code = if left.code == TypeCode::Char && right.code == TypeCode::Char {
                    TypeCode::Char
                } else {
                    TypeCode::VarChar
                };
                Ok(TypeDescriptor::with_length(
                    code,
                    left.length + right.length,
                ))
            } else {
                Err(Error::mismatch(
                    "character operands for ||",
                    format!("{} and {}", left, right),
                ))
            }
        }
        Add | Subtract | Multiply | Divide | Modulo => {
            if left.is_numeric() && right.is_numeric() {
                return TypeDescriptor::merge_numeric(left, right);
            }
            date_arithmetic(op, left, right).ok_or_else(|| {
                Error::mismatch(
                    format!("operands for {}", op.symbol()),
                    format!("{} and {}", left, right),
                )
            })
        }
        _ => Err(Error::Internal(format!(
            "operator {} fell through classification",
            op.symbol()
        ))),
    }
}

/// The date/time arithmetic table. Day counts may be any numeric, since
/// literals classify as DOUBLE PRECISION. Anything not listed is a mismatch.
fn date_arithmetic(
    op: BinaryOperator,
    left: &TypeDescriptor,
    right: &TypeDescriptor,
) -> Option<TypeDescriptor> {
    use TypeCode::*;
    let ty = |code| Some(TypeDescriptor::new(code));
    match op {
        BinaryOperator::Add => match (left.code, right.code) {
            (Date, _) if right.is_numeric() => ty(Date),
            (_, Date) if left.is_numeric() => ty(Date),
            (Date | Time | TimeTz | Timestamp | TimestampTz, Interval) => ty(left.code),
            (Interval, Date | Time | TimeTz | Timestamp | TimestampTz) => ty(right.code),
            (Interval, Interval) => ty(Interval),
            _ => None,
        },
        BinaryOperator::Subtract => match (left.code, right.code) {
            (Date, Date) => ty(Int),
            (Date, _) if right.is_numeric() => ty(Date),
            (Time, Time) | (Timestamp, Timestamp) | (TimestampTz, TimestampTz) => ty(Interval),
            (Date | Time | TimeTz | Timestamp | TimestampTz, Interval) => ty(left.code),
            (Interval, Interval) => ty(Interval),
            _ => None,
        },
        _ => None,
    }
}

/// CASE result agreement: NULL branches are ignored; the remaining results
/// must all be numeric or all non-numeric. Numeric results merge to the
/// widest; non-numeric results take the first branch's descriptor.
fn case_result(results: &[TypeDescriptor]) -> Result<TypeDescriptor> {
    let mut first: Option<&TypeDescriptor> = None;
    for ty in results {
        if ty.is_null() {
            continue;
        }
        match first {
            None => first = Some(ty),
            Some(f) => {
                if f.is_numeric() != ty.is_numeric() {
                    return Err(Error::CaseTypeMismatch {
                        first: f.to_string(),
                        second: ty.to_string(),
                    });
                }
            }
        }
    }
    let first = match first {
        None => return Ok(TypeDescriptor::new(TypeCode::Null)),
        Some(first) => first,
    };
    if !first.is_numeric() {
        return Ok(first.clone());
    }
    let mut merged = first.clone();
    for ty in results {
        if ty.is_null() {
            continue;
        }
        merged = TypeDescriptor::merge_numeric(&merged, ty)?;
    }
    Ok(merged)
}

/// Argument view handed to function type rules. Rules resolve parameters
/// lazily through this; a parameter a rule never touches is never resolved,
/// which NULLIF and DECODE depend on.
pub struct Args<'a, 'r> {
    pub(crate) id: Option<FunctionId>,
    pub(crate) name: &'a str,
    #[allow(dead_code)]
    pub(crate) distinct: bool,
    pub(crate) exprs: &'a mut Vec<Expression>,
    pub(crate) resolver: &'a mut Resolver<'r>,
}

impl<'a, 'r> Args<'a, 'r> {
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn config(&self) -> &ConfigSnapshot {
        &self.resolver.ctx.config
    }

    pub fn expr(&self, index: usize) -> &Expression {
        &self.exprs[index]
    }

    /// Resolve parameter `index` and return its descriptor.
    pub fn ty(&mut self, index: usize) -> Result<TypeDescriptor> {
        self.resolver.resolve_expr(&mut self.exprs[index])
    }

    pub fn illegal(&self, reason: impl Into<String>) -> Error {
        Error::illegal(self.name, reason)
    }

    pub fn require_arity(&self, min: usize, max: Option<usize>) -> Result<()> {
        let n = self.len();
        if n < min || max.map(|m| n > m).unwrap_or(false) {
            let expected = match max {
                Some(m) if m == min => format!("{}", min),
                Some(m) => format!("{} to {}", min, m),
                None => format!("at least {}", min),
            };
            return Err(self.illegal(format!("expected {} parameters, got {}", expected, n)));
        }
        Ok(())
    }

    /// Resolve parameter `index` and require it numeric. NULL passes.
    pub fn require_numeric(&mut self, index: usize) -> Result<TypeDescriptor> {
        let ty = self.ty(index)?;
        if ty.is_numeric() || ty.is_null() {
            Ok(ty)
        } else {
            Err(Error::mismatch("a numeric type", ty))
        }
    }

    pub fn require_character(&mut self, index: usize) -> Result<TypeDescriptor> {
        let ty = self.ty(index)?;
        if ty.is_character() || ty.is_null() {
            Ok(ty)
        } else {
            Err(Error::mismatch("a character type", ty))
        }
    }

    pub fn require_date_time(&mut self, index: usize) -> Result<TypeDescriptor> {
        let ty = self.ty(index)?;
        if ty.is_date_time() || ty.is_null() {
            Ok(ty)
        } else {
            Err(Error::mismatch("a date/time type", ty))
        }
    }

    pub fn require_spatial(&mut self, index: usize) -> Result<TypeDescriptor> {
        let ty = self.ty(index)?;
        if ty.is_spatial() || ty.is_null() {
            Ok(ty)
        } else {
            Err(Error::mismatch("a spatial type", ty))
        }
    }

    /// The literal text of parameter `index`, when it is a plain constant.
    pub fn literal_text(&self, index: usize) -> Option<&str> {
        match &self.exprs[index].kind {
            ExprKind::Constant(c) if !c.null => Some(&c.text),
            _ => None,
        }
    }

    /// The literal value of parameter `index` as an unsigned count.
    pub fn literal_u32(&self, index: usize) -> Option<u32> {
        self.literal_text(index).and_then(|t| t.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::context::SessionValues;
    use crate::query::RelationNode;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn fixture() -> (MemoryCatalog, SessionValues) {
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
                ("n_comment", TypeDescriptor::with_length(TypeCode::VarChar, 152), true),
            ],
        );
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        (catalog, SessionValues::at(now, "tester", "tpch", "1.0"))
    }

    fn resolve_one(expr: &mut Expression) -> Result<TypeDescriptor> {
        let (catalog, session) = fixture();
        let ctx = ResolveContext::new(&catalog, Arc::new(ConfigSnapshot::default()), &session);
        let mut tree = QueryTree::new();
        tree.add_from(RelationNode::table("nation"));
        Resolver::new(&mut tree, &ctx).resolve_expr(expr)
    }

    #[test]
    fn literal_classification() {
        assert_eq!(classify_literal("42").code, TypeCode::Double);
        assert_eq!(classify_literal("-7").code, TypeCode::Double);
        assert_eq!(classify_literal("1.5").code, TypeCode::Double);
        let text = classify_literal("hello");
        assert_eq!(text.code, TypeCode::VarChar);
        assert_eq!(text.length, 5);
    }

    #[test]
    fn column_resolves_through_catalog() {
        let mut expr = Expression::column(ColumnRef::bound(NodeId(0), None, "n_name"));
        let ty = resolve_one(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::Char);
        assert_eq!(ty.length, 25);

        let mut missing = Expression::column(ColumnRef::bound(NodeId(0), None, "n_oops"));
        assert!(matches!(
            resolve_one(&mut missing),
            Err(Error::ColumnNotFound(_))
        ));
    }

    #[test]
    fn binary_numeric_merges_and_date_table_applies() {
        let mut sum = Expression::binary(
            BinaryOperator::Add,
            Expression::constant("1"),
            Expression::constant("2.5"),
        );
        assert_eq!(resolve_one(&mut sum).unwrap().code, TypeCode::Double);

        let date = TypeDescriptor::new(TypeCode::Date);
        let mut shifted = Expression::binary(
            BinaryOperator::Add,
            Expression::typed_constant("'2024-01-01'", date.clone()),
            Expression::constant("7"),
        );
        assert_eq!(resolve_one(&mut shifted).unwrap().code, TypeCode::Date);

        let mut diff = Expression::binary(
            BinaryOperator::Subtract,
            Expression::typed_constant("'2024-02-01'", date.clone()),
            Expression::typed_constant("'2024-01-01'", date),
        );
        assert_eq!(resolve_one(&mut diff).unwrap().code, TypeCode::Int);
    }

    #[test]
    fn comparisons_are_boolean_regardless_of_operands() {
        let mut cmp = Expression::binary(
            BinaryOperator::LessThan,
            Expression::constant("1"),
            Expression::constant("hello"),
        );
        assert_eq!(resolve_one(&mut cmp).unwrap().code, TypeCode::Boolean);
    }

    #[test]
    fn case_ignores_null_branches_and_merges_numerics() {
        let mut case = Expression::case(
            vec![
                (Expression::constant("1"), Expression::null()),
                (Expression::constant("2"), Expression::constant("10")),
                (Expression::constant("3"), Expression::constant("1.5")),
            ],
            None,
        );
        assert_eq!(resolve_one(&mut case).unwrap().code, TypeCode::Double);
    }

    #[test]
    fn case_numeric_and_character_mismatch_names_both() {
        let mut case = Expression::case(
            vec![
                (Expression::constant("1"), Expression::constant("10")),
                (Expression::constant("2"), Expression::constant("oops")),
            ],
            None,
        );
        match resolve_one(&mut case) {
            Err(Error::CaseTypeMismatch { first, second }) => {
                assert_eq!(first, "DOUBLE PRECISION");
                assert_eq!(second, "VARCHAR(4)");
            }
            other => panic!("expected CaseTypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn list_null_elements_agree_wherever_they_sit() {
        let mut leading = Expression::list(vec![Expression::null(), Expression::constant("1")]);
        assert_eq!(resolve_one(&mut leading).unwrap().code, TypeCode::Double);

        let mut trailing = Expression::list(vec![Expression::constant("1"), Expression::null()]);
        assert_eq!(resolve_one(&mut trailing).unwrap().code, TypeCode::Double);
    }

    #[test]
    fn deferred_parameter_resolves_null_without_memoizing() {
        let mut expr = Expression::parameter(0);
        let ty = resolve_one(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::Null);
        assert!(expr.resolved_type().is_none());

        // Once a declared type exists the same node resolves to it.
        let (catalog, session) = fixture();
        let ctx = ResolveContext::new(&catalog, Arc::new(ConfigSnapshot::default()), &session)
            .with_param_types(vec![Some(TypeDescriptor::new(TypeCode::BigInt))]);
        let mut tree = QueryTree::new();
        let ty = Resolver::new(&mut tree, &ctx).resolve_expr(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::BigInt);
        assert!(expr.resolved_type().is_some());
    }

    #[test]
    fn subquery_takes_first_projection_type() {
        let (catalog, session) = fixture();
        let ctx = ResolveContext::new(&catalog, Arc::new(ConfigSnapshot::default()), &session);
        let mut tree = QueryTree::new();
        let nation = tree.add_from(RelationNode::table("nation"));
        let mut sub = RelationNode::subquery(RelationKind::SubqueryScalar);
        sub.projections.push(crate::query::Projection::new(
            Expression::column(ColumnRef::bound(nation, None, "n_nationkey")),
        ));
        let sub = tree.add_node(sub);

        let mut expr = Expression::subquery(sub);
        let ty = Resolver::new(&mut tree, &ctx).resolve_expr(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::Int);
    }

    #[test]
    fn concat_operator_sums_lengths() {
        let mut expr = Expression::binary(
            BinaryOperator::Concat,
            Expression::column(ColumnRef::bound(NodeId(0), None, "n_name")),
            Expression::constant("!"),
        );
        let ty = resolve_one(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::VarChar);
        assert_eq!(ty.length, 26);
    }
}

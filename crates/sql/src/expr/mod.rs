//! SQL expression trees
//!
//! A tagged-union node owning its children. Each node caches its resolved
//! type; the cache is valid only until a child mutates, and re-resolution
//! after structural edits is the caller's responsibility. Back-references
//! into relation projections are arena indices, never owning pointers.

pub mod rebuild;
pub mod resolve;

use crate::functions::FunctionId;
use crate::query::NodeId;
use crate::types::TypeDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
    Identity,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "NOT ",
            UnaryOperator::Negate => "-",
            UnaryOperator::Identity => "+",
        }
    }
}

/// Binary operators with their SQL symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Like,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Concat => "||",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Like => "LIKE",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
                | BinaryOperator::Like
        )
    }
}

/// A column reference, bound to its owning relation once resolution has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Owning relation in the statement arena, or None while unbound.
    pub relation: Option<NodeId>,
    /// Qualifier as written in the source text.
    pub table: Option<String>,
    pub name: String,
    /// Column alias from the projection this reference was registered under.
    pub alias: Option<String>,
    /// Alias assigned when the owning relation was materialized.
    pub temp_alias: Option<String>,
    /// Projection ordinal in the owning relation for mapped expressions.
    pub mapped: Option<usize>,
    pub nullable: bool,
}

impl ColumnRef {
    pub fn new(table: Option<&str>, name: &str) -> Self {
        Self {
            relation: None,
            table: table.map(str::to_string),
            name: name.to_string(),
            alias: None,
            temp_alias: None,
            mapped: None,
            nullable: true,
        }
    }

    pub fn bound(relation: NodeId, table: Option<&str>, name: &str) -> Self {
        Self {
            relation: Some(relation),
            ..Self::new(table, name)
        }
    }
}

/// A literal constant carrying its source text. `null` marks the NULL
/// literal, whose text is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub text: String,
    pub null: bool,
}

/// A function invocation. CAST is modeled as a call with a `cast_target`
/// descriptor; the catalog is bypassed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: Option<FunctionId>,
    pub name: String,
    pub args: Vec<Expression>,
    pub distinct: bool,
    pub cast_target: Option<TypeDescriptor>,
}

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Column(ColumnRef),
    Constant(Constant),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Function(FunctionCall),
    /// Reference to a subquery relation node in the statement arena.
    Subquery(NodeId),
    /// Boolean predicate wrapper.
    Condition(Box<Expression>),
    Case {
        branches: Vec<(Expression, Expression)>,
        default: Option<Box<Expression>>,
    },
    /// Ordered literal sequence, e.g. the right side of IN.
    List(Vec<Expression>),
    /// Prepared-statement placeholder, 0-indexed.
    Parameter(usize),
}

/// An expression node with its memoized result type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExprKind,
    pub(crate) ty: Option<TypeDescriptor>,
}

impl Expression {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, ty: None }
    }

    pub fn column(col: ColumnRef) -> Self {
        Self::new(ExprKind::Column(col))
    }

    pub fn constant(text: impl Into<String>) -> Self {
        Self::new(ExprKind::Constant(Constant {
            text: text.into(),
            null: false,
        }))
    }

    /// A constant whose type is already known, e.g. a date literal the
    /// grammar recognized.
    pub fn typed_constant(text: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            kind: ExprKind::Constant(Constant {
                text: text.into(),
                null: false,
            }),
            ty: Some(ty),
        }
    }

    pub fn null() -> Self {
        Self::new(ExprKind::Constant(Constant {
            text: String::new(),
            null: true,
        }))
    }

    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Self::new(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn function(name: &str, args: Vec<Expression>) -> Self {
        Self::new(ExprKind::Function(FunctionCall {
            id: FunctionId::from_name(name),
            name: name.to_string(),
            args,
            distinct: false,
            cast_target: None,
        }))
    }

    pub fn function_distinct(name: &str, args: Vec<Expression>) -> Self {
        let mut expr = Self::function(name, args);
        if let ExprKind::Function(call) = &mut expr.kind {
            call.distinct = true;
        }
        expr
    }

    pub fn cast(operand: Expression, target: TypeDescriptor) -> Self {
        Self::new(ExprKind::Function(FunctionCall {
            id: Some(FunctionId::Cast),
            name: "CAST".to_string(),
            args: vec![operand],
            distinct: false,
            cast_target: Some(target),
        }))
    }

    pub fn subquery(node: NodeId) -> Self {
        Self::new(ExprKind::Subquery(node))
    }

    pub fn condition(inner: Expression) -> Self {
        Self::new(ExprKind::Condition(Box::new(inner)))
    }

    pub fn case(branches: Vec<(Expression, Expression)>, default: Option<Expression>) -> Self {
        Self::new(ExprKind::Case {
            branches,
            default: default.map(Box::new),
        })
    }

    pub fn list(items: Vec<Expression>) -> Self {
        Self::new(ExprKind::List(items))
    }

    pub fn parameter(index: usize) -> Self {
        Self::new(ExprKind::Parameter(index))
    }

    /// The memoized result type, if this node has been resolved.
    pub fn resolved_type(&self) -> Option<&TypeDescriptor> {
        self.ty.as_ref()
    }

    /// Drop cached types below this node. Callers must do this after
    /// structural edits before resolving again.
    pub fn invalidate(&mut self) {
        self.ty = None;
        match &mut self.kind {
            ExprKind::Unary { operand, .. } => operand.invalidate(),
            ExprKind::Binary { left, right, .. } => {
                left.invalidate();
                right.invalidate();
            }
            ExprKind::Function(call) => {
                for arg in &mut call.args {
                    arg.invalidate();
                }
            }
            ExprKind::Condition(inner) => inner.invalidate(),
            ExprKind::Case { branches, default } => {
                for (when, then) in branches {
                    when.invalidate();
                    then.invalidate();
                }
                if let Some(default) = default {
                    default.invalidate();
                }
            }
            ExprKind::List(items) => {
                for item in items {
                    item.invalidate();
                }
            }
            _ => {}
        }
    }

    /// Direct expression children. Subquery nodes have none; their contents
    /// live in the statement arena.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            ExprKind::Unary { operand, .. } => vec![operand],
            ExprKind::Binary { left, right, .. } => vec![left, right],
            ExprKind::Function(call) => call.args.iter().collect(),
            ExprKind::Condition(inner) => vec![inner],
            ExprKind::Case { branches, default } => {
                let mut out: Vec<&Expression> = Vec::new();
                for (when, then) in branches {
                    out.push(when);
                    out.push(then);
                }
                if let Some(default) = default {
                    out.push(default);
                }
                out
            }
            ExprKind::List(items) => items.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// True when this node itself is an aggregate call.
    pub fn is_aggregate(&self) -> bool {
        match &self.kind {
            ExprKind::Function(call) => call.id.map(|id| id.is_aggregate()).unwrap_or(false),
            _ => false,
        }
    }

    /// True when any node in this subtree is an aggregate call.
    pub fn contains_aggregates(&self) -> bool {
        self.is_aggregate() || self.children().iter().any(|c| c.contains_aggregates())
    }

    /// True when the subtree references no columns, parameters or
    /// subqueries, so its value is fixed per statement.
    pub fn is_constant_expr(&self) -> bool {
        match &self.kind {
            ExprKind::Column(_) | ExprKind::Parameter(_) | ExprKind::Subquery(_) => false,
            _ => self.children().iter().all(|c| c.is_constant_expr()),
        }
    }

    /// True when the subtree references the named column.
    pub fn contains_column(&self, name: &str) -> bool {
        match &self.kind {
            ExprKind::Column(col) => col.name == name,
            _ => self.children().iter().any(|c| c.contains_column(name)),
        }
    }

    pub fn has_subquery(&self) -> bool {
        match &self.kind {
            ExprKind::Subquery(_) => true,
            _ => self.children().iter().any(|c| c.has_subquery()),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Column(col) => match &col.table {
                Some(table) => write!(f, "{}.{}", table, col.name),
                None => write!(f, "{}", col.name),
            },
            ExprKind::Constant(c) => {
                if c.null {
                    write!(f, "NULL")
                } else {
                    write!(f, "{}", c.text)
                }
            }
            ExprKind::Unary { op, operand } => write!(f, "({}{})", op.symbol(), operand),
            ExprKind::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            ExprKind::Function(call) => {
                write!(f, "{}(", call.name)?;
                if call.distinct {
                    write!(f, "DISTINCT ")?;
                }
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            ExprKind::Subquery(node) => write!(f, "(subquery #{})", node.0),
            ExprKind::Condition(inner) => write!(f, "{}", inner),
            ExprKind::Case { branches, default } => {
                write!(f, "CASE")?;
                for (when, then) in branches {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(default) = default {
                    write!(f, " ELSE {}", default)?;
                }
                write!(f, " END")
            }
            ExprKind::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            ExprKind::Parameter(index) => write!(f, "?{}", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_predicates() {
        let sum = Expression::function("SUM", vec![Expression::column(ColumnRef::new(None, "x"))]);
        assert!(sum.is_aggregate());
        assert!(sum.contains_aggregates());
        assert!(!sum.is_constant_expr());
        assert!(sum.contains_column("x"));
        assert!(!sum.contains_column("y"));

        let add = Expression::binary(
            BinaryOperator::Add,
            Expression::constant("1"),
            Expression::constant("2"),
        );
        assert!(!add.is_aggregate());
        assert!(add.is_constant_expr());

        let nested = Expression::binary(BinaryOperator::Add, add, sum);
        assert!(!nested.is_aggregate());
        assert!(nested.contains_aggregates());
        assert!(!nested.is_constant_expr());
    }

    #[test]
    fn display_renders_operator_nesting() {
        let expr = Expression::binary(
            BinaryOperator::Multiply,
            Expression::column(ColumnRef::new(Some("t"), "a")),
            Expression::constant("2"),
        );
        assert_eq!(expr.to_string(), "(t.a * 2)");
    }
}

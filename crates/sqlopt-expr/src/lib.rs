//! Bound expression node set consumed by the predicate normalizer and the
//! planner.
//!
//! The binder produces a tree of these nodes after name and type
//! resolution: every column reference carries its resolved
//! `(table_id, column_id)` and data type. The set is closed so that the
//! normalizer can match it exhaustively; node kinds the normalizer never
//! rewrites (method calls, subqueries, CASE, ...) arrive as [`Expr::Other`].
//!
//! Trees are exclusively owned: every child is a `Box<Expr>` and rewrites
//! consume a subtree and hand back a new one. A column reference that has to
//! appear twice (e.g. both sides of an expanded BETWEEN) is cloned.

mod display;
pub mod compat;
pub mod eval;
pub mod predicate;

pub use compat::{bind_comparison, DefaultTypeCompatibility, TypeCompatibility};
pub use eval::{eval, Row};
pub use predicate::{Predicate, PredicateFlags};

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlopt_types::{ColumnId, SqlValue, TableId, TableSet, TypeDescriptor};

// ---------------------------------------------------------------------------
// Comparison operators
// ---------------------------------------------------------------------------

/// Binary relational operators.
///
/// Closed set: negation and operand-swap behavior live in the table below
/// rather than in per-operator node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    /// The operator computing the logical negation: `NOT (a op b)` is
    /// `a op.negate() b`, also under three-valued logic.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Ge => Self::Lt,
            Self::Gt => Self::Le,
            Self::Le => Self::Gt,
        }
    }

    /// The operator to use when the operands are swapped: `a op b` is
    /// `b op.flip() a`.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Lt => Self::Gt,
            Self::Gt => Self::Lt,
            Self::Le => Self::Ge,
            Self::Ge => Self::Le,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    #[must_use]
    pub const fn is_equality(self) -> bool {
        matches!(self, Self::Eq)
    }

    /// Whether an ordering of `left` relative to `right` satisfies the
    /// operator.
    #[must_use]
    pub const fn matches(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => matches!(ord, Ordering::Equal),
            Self::Ne => !matches!(ord, Ordering::Equal),
            Self::Lt => matches!(ord, Ordering::Less),
            Self::Le => !matches!(ord, Ordering::Greater),
            Self::Gt => matches!(ord, Ordering::Greater),
            Self::Ge => !matches!(ord, Ordering::Less),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Leaf payloads
// ---------------------------------------------------------------------------

/// A resolved column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table_id: TableId,
    pub column_id: ColumnId,
    /// Name for display only; identity is `(table_id, column_id)`.
    pub name: String,
    pub data_type: TypeDescriptor,
}

impl ColumnRef {
    #[must_use]
    pub fn new(
        table_id: TableId,
        column_id: ColumnId,
        name: impl Into<String>,
        data_type: TypeDescriptor,
    ) -> Self {
        Self {
            table_id,
            column_id,
            name: name.into(),
            data_type,
        }
    }

    /// Whether both references resolve to the same column.
    #[must_use]
    pub fn same_column(&self, other: &Self) -> bool {
        self.table_id == other.table_id && self.column_id == other.column_id
    }

    #[must_use]
    pub const fn key(&self) -> (TableId, ColumnId) {
        (self.table_id, self.column_id)
    }
}

/// Flags carried by a comparison node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonFlags {
    /// Synthesized by the optimizer; skips the comparability check.
    pub for_query_rewrite: bool,
    /// Half of an expanded BETWEEN; estimate the pair as one range test.
    pub between_selectivity: bool,
}

/// A node kind the normalizer treats as an opaque leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueExpr {
    /// Rendering used in plans and diagnostics.
    pub description: String,
    pub data_type: TypeDescriptor,
    /// Tables referenced anywhere beneath this node.
    pub referenced_tables: TableSet,
    /// Set by canonicalization when the node sits in the top-level AND
    /// chain; subquery flattening only considers such nodes.
    pub under_top_and: bool,
}

impl OpaqueExpr {
    #[must_use]
    pub fn new(description: impl Into<String>, data_type: TypeDescriptor) -> Self {
        Self {
            description: description.into(),
            data_type,
            referenced_tables: TableSet::new(),
            under_top_and: false,
        }
    }

    #[must_use]
    pub fn referencing(mut self, tables: &[TableId]) -> Self {
        for t in tables {
            self.referenced_tables.insert(*t);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Expr
// ---------------------------------------------------------------------------

/// A bound expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `left AND right`.
    And {
        left: Box<Self>,
        right: Box<Self>,
        nullable: bool,
    },
    /// `left OR right`.
    Or {
        left: Box<Self>,
        right: Box<Self>,
        nullable: bool,
    },
    /// `NOT operand`, as bound. NOT elimination removes it above logical
    /// operators and comparisons; it survives above other node kinds.
    Not(Box<Self>),
    /// `left op right`.
    Comparison {
        op: ComparisonOp,
        left: Box<Self>,
        right: Box<Self>,
        flags: ComparisonFlags,
    },
    /// `target BETWEEN low AND high`.
    Between {
        target: Box<Self>,
        low: Box<Self>,
        high: Box<Self>,
    },
    /// `target IN (values...)`.
    InList {
        target: Box<Self>,
        values: Vec<Self>,
        nullable: bool,
    },
    /// `operand IS [NOT] NULL`.
    IsNull { operand: Box<Self>, negated: bool },
    /// A resolved column.
    ColumnRef(ColumnRef),
    /// A constant.
    Constant(SqlValue),
    /// Anything the normalizer does not transform.
    Other(OpaqueExpr),
}

impl Expr {
    // --- node construction ---

    /// `left AND right`; nullable iff either operand is.
    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        let nullable = left.is_nullable() || right.is_nullable();
        Self::And {
            left: Box::new(left),
            right: Box::new(right),
            nullable,
        }
    }

    /// `left OR right`; nullable iff either operand is.
    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        let nullable = left.is_nullable() || right.is_nullable();
        Self::Or {
            left: Box::new(left),
            right: Box::new(right),
            nullable,
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Self) -> Self {
        Self::Not(Box::new(operand))
    }

    #[must_use]
    pub fn comparison(op: ComparisonOp, left: Self, right: Self) -> Self {
        Self::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
            flags: ComparisonFlags::default(),
        }
    }

    #[must_use]
    pub fn between(target: Self, low: Self, high: Self) -> Self {
        Self::Between {
            target: Box::new(target),
            low: Box::new(low),
            high: Box::new(high),
        }
    }

    /// `target IN (values...)`; nullable iff any operand is.
    #[must_use]
    pub fn in_list(target: Self, values: Vec<Self>) -> Self {
        let nullable = target.is_nullable() || values.iter().any(Self::is_nullable);
        Self::InList {
            target: Box::new(target),
            values,
            nullable,
        }
    }

    #[must_use]
    pub fn is_null(operand: Self, negated: bool) -> Self {
        Self::IsNull {
            operand: Box::new(operand),
            negated,
        }
    }

    #[must_use]
    pub fn column(
        table_id: TableId,
        column_id: ColumnId,
        name: impl Into<String>,
        data_type: TypeDescriptor,
    ) -> Self {
        Self::ColumnRef(ColumnRef::new(table_id, column_id, name, data_type))
    }

    #[must_use]
    pub fn constant(value: impl Into<SqlValue>) -> Self {
        Self::Constant(value.into())
    }

    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Constant(SqlValue::Boolean(value))
    }

    /// Move the node out, leaving a NULL constant in its place.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::Constant(SqlValue::Null))
    }

    // --- queries ---

    /// The bound result type of this node.
    #[must_use]
    pub fn data_type(&self) -> TypeDescriptor {
        match self {
            Self::And { nullable, .. }
            | Self::Or { nullable, .. }
            | Self::InList { nullable, .. } => TypeDescriptor::boolean(*nullable),
            Self::Not(operand) => TypeDescriptor::boolean(operand.is_nullable()),
            Self::Comparison { left, right, .. } => {
                TypeDescriptor::boolean(left.is_nullable() || right.is_nullable())
            }
            Self::Between { target, low, high } => TypeDescriptor::boolean(
                target.is_nullable() || low.is_nullable() || high.is_nullable(),
            ),
            Self::IsNull { .. } => TypeDescriptor::boolean(false),
            Self::ColumnRef(col) => col.data_type,
            Self::Constant(value) => value.type_descriptor(),
            Self::Other(opaque) => opaque.data_type,
        }
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.data_type().nullable
    }

    #[must_use]
    pub const fn is_boolean_true(&self) -> bool {
        matches!(self, Self::Constant(SqlValue::Boolean(true)))
    }

    #[must_use]
    pub const fn is_boolean_false(&self) -> bool {
        matches!(self, Self::Constant(SqlValue::Boolean(false)))
    }

    #[must_use]
    pub const fn is_and(&self) -> bool {
        matches!(self, Self::And { .. })
    }

    #[must_use]
    pub const fn is_or(&self) -> bool {
        matches!(self, Self::Or { .. })
    }

    #[must_use]
    pub const fn as_column_ref(&self) -> Option<&ColumnRef> {
        match self {
            Self::ColumnRef(col) => Some(col),
            _ => None,
        }
    }

    /// Height of the tree (a leaf has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1_usize)];
        while let Some((node, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(node.children().map(|child| (child, level + 1)));
        }
        deepest
    }

    /// Immediate children, left to right.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Self> + '_> {
        match self {
            Self::And { left, right, .. }
            | Self::Or { left, right, .. }
            | Self::Comparison { left, right, .. } => {
                Box::new([left.as_ref(), right.as_ref()].into_iter())
            }
            Self::Not(operand) | Self::IsNull { operand, .. } => {
                Box::new(std::iter::once(operand.as_ref()))
            }
            Self::Between { target, low, high } => {
                Box::new([target.as_ref(), low.as_ref(), high.as_ref()].into_iter())
            }
            Self::InList { target, values, .. } => {
                Box::new(std::iter::once(target.as_ref()).chain(values.iter()))
            }
            Self::ColumnRef(_) | Self::Constant(_) | Self::Other(_) => {
                Box::new(std::iter::empty())
            }
        }
    }

    /// Add every table referenced beneath this node to `out`.
    pub fn collect_referenced_tables(&self, out: &mut TableSet) {
        match self {
            Self::ColumnRef(col) => {
                out.insert(col.table_id);
            }
            Self::Other(opaque) => out.union_with(&opaque.referenced_tables),
            _ => {
                for child in self.children() {
                    child.collect_referenced_tables(out);
                }
            }
        }
    }

    /// Tables referenced beneath this node.
    #[must_use]
    pub fn referenced_tables(&self) -> TableSet {
        let mut out = TableSet::new();
        self.collect_referenced_tables(&mut out);
        out
    }

    /// Whether the node is a constant (no column references, no opaque
    /// nodes).
    #[must_use]
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Constant(_) => true,
            Self::ColumnRef(_) | Self::Other(_) => false,
            _ => self.children().all(Self::is_constant),
        }
    }

    /// Walk the top-level right-linked AND chain, yielding each conjunct.
    /// TRUE conjuncts (the terminator included) are skipped.
    pub fn conjuncts(&self) -> impl Iterator<Item = &Self> + '_ {
        let mut cursor = Some(self);
        std::iter::from_fn(move || loop {
            let node = match cursor? {
                Self::And { left, right, .. } => {
                    cursor = Some(right.as_ref());
                    left.as_ref()
                }
                last => {
                    cursor = None;
                    last
                }
            };
            if !node.is_boolean_true() {
                return Some(node);
            }
        })
    }
}

//! A single conjunct of a canonical WHERE clause, with the bookkeeping the
//! planner needs for pushdown and cardinality estimation.

use serde::{Deserialize, Serialize};
use sqlopt_types::{TableId, TableSet};

use crate::{ColumnRef, ComparisonOp, Expr};

/// Per-predicate flags consumed by cardinality estimation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredicateFlags {
    /// The predicate was synthesized by the optimizer.
    pub for_query_rewrite: bool,
    /// Half of an expanded BETWEEN: estimate the pair as one range test.
    pub use_between_selectivity: bool,
    /// `column IN (constants...)` that can drive a multi-probe index scan.
    pub is_in_list_probe: bool,
}

/// One top-level conjunct.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub expr: Expr,
    /// Tables referenced by `expr`.
    pub referenced_tables: TableSet,
    pub flags: PredicateFlags,
}

impl Predicate {
    /// Wrap `expr`, computing its referenced tables and flags.
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        let referenced_tables = expr.referenced_tables();
        let flags = match &expr {
            Expr::Comparison { flags, .. } => PredicateFlags {
                for_query_rewrite: flags.for_query_rewrite,
                use_between_selectivity: flags.between_selectivity,
                is_in_list_probe: false,
            },
            Expr::InList { target, values, .. } => PredicateFlags {
                is_in_list_probe: matches!(target.as_ref(), Expr::ColumnRef(_))
                    && values.len() > 1
                    && values.iter().all(|v| matches!(v, Expr::Constant(_))),
                ..PredicateFlags::default()
            },
            _ => PredicateFlags::default(),
        };
        Self {
            expr,
            referenced_tables,
            flags,
        }
    }

    /// Whether every table the predicate references is in `tables`.
    #[must_use]
    pub fn references_only(&self, tables: &TableSet) -> bool {
        self.referenced_tables.is_subset_of(tables)
    }

    #[must_use]
    pub fn references(&self, table: TableId) -> bool {
        self.referenced_tables.contains(table)
    }

    /// For `a.x = b.y` with the columns in different tables, the two column
    /// references in source order.
    #[must_use]
    pub fn equijoin_columns(&self) -> Option<(&ColumnRef, &ColumnRef)> {
        match &self.expr {
            Expr::Comparison {
                op: ComparisonOp::Eq,
                left,
                right,
                ..
            } => match (left.as_ref(), right.as_ref()) {
                (Expr::ColumnRef(l), Expr::ColumnRef(r)) if l.table_id != r.table_id => {
                    Some((l, r))
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether this is an equijoin between `inner` and some other table.
    #[must_use]
    pub fn is_equijoin_on(&self, inner: TableId) -> bool {
        self.equijoin_columns()
            .is_some_and(|(l, r)| l.table_id == inner || r.table_id == inner)
    }
}

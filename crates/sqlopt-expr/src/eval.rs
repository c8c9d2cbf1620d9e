//! Three-valued evaluation of bound expressions over a single row.
//!
//! Used to check that rewrites preserve meaning: a rewritten predicate must
//! produce the same TRUE / FALSE / UNKNOWN result as its input for every
//! row.

use std::collections::HashMap;

use sqlopt_error::{CompileError, Result};
use sqlopt_types::{ColumnId, SqlValue, TableId};

use crate::Expr;

/// Column values for one (joined) row, keyed by resolved column identity.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: HashMap<(TableId, ColumnId), SqlValue>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, table: TableId, column: ColumnId, value: impl Into<SqlValue>) -> Self {
        self.set(table, column, value);
        self
    }

    pub fn set(&mut self, table: TableId, column: ColumnId, value: impl Into<SqlValue>) {
        self.values.insert((table, column), value.into());
    }

    #[must_use]
    pub fn get(&self, table: TableId, column: ColumnId) -> Option<&SqlValue> {
        self.values.get(&(table, column))
    }
}

fn truth_of(value: &SqlValue) -> Result<Option<bool>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Boolean(b) => Ok(Some(*b)),
        other => Err(CompileError::TypeMismatch {
            expected: "BOOLEAN".to_owned(),
            actual: other.type_descriptor().type_id.sql_type_name().to_owned(),
        }),
    }
}

fn and3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// Evaluate `expr` against `row`.
///
/// Predicates yield `Boolean` or `Null` (UNKNOWN).
///
/// # Errors
///
/// Fails when a referenced column has no value in `row`, when a logical
/// operand is not boolean-valued, or on an [`Expr::Other`] node.
pub fn eval(expr: &Expr, row: &Row) -> Result<SqlValue> {
    let value = match expr {
        Expr::And { left, right, .. } => {
            let l = truth_of(&eval(left, row)?)?;
            let r = truth_of(&eval(right, row)?)?;
            SqlValue::from_truth(and3(l, r))
        }
        Expr::Or { left, right, .. } => {
            let l = truth_of(&eval(left, row)?)?;
            let r = truth_of(&eval(right, row)?)?;
            SqlValue::from_truth(or3(l, r))
        }
        Expr::Not(operand) => {
            let t = truth_of(&eval(operand, row)?)?;
            SqlValue::from_truth(t.map(|b| !b))
        }
        Expr::Comparison { op, left, right, .. } => {
            let l = eval(left, row)?;
            let r = eval(right, row)?;
            SqlValue::from_truth(l.sql_cmp(&r).map(|ord| op.matches(ord)))
        }
        Expr::Between { target, low, high } => {
            let t = eval(target, row)?;
            let lo = eval(low, row)?;
            let hi = eval(high, row)?;
            let ge = t.sql_cmp(&lo).map(|o| o.is_ge());
            let le = t.sql_cmp(&hi).map(|o| o.is_le());
            SqlValue::from_truth(and3(ge, le))
        }
        Expr::InList { target, values, .. } => {
            let t = eval(target, row)?;
            let mut result = Some(false);
            for v in values {
                let v = eval(v, row)?;
                result = or3(result, t.sql_cmp(&v).map(|o| o.is_eq()));
                if result == Some(true) {
                    break;
                }
            }
            SqlValue::from_truth(result)
        }
        Expr::IsNull { operand, negated } => {
            let v = eval(operand, row)?;
            SqlValue::Boolean(v.is_null() != *negated)
        }
        Expr::ColumnRef(col) => row
            .get(col.table_id, col.column_id)
            .cloned()
            .ok_or(CompileError::UnboundColumn {
                table: col.table_id.get(),
                column: col.column_id.get(),
            })?,
        Expr::Constant(v) => v.clone(),
        Expr::Other(opaque) => {
            return Err(CompileError::NotEvaluable(opaque.description.clone()));
        }
    };
    Ok(value)
}

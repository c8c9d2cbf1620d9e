//! Type/operator compatibility and comparison binding.

use sqlopt_error::{CompileError, Result};
use sqlopt_types::{TypeDescriptor, TypeFamily};

use crate::{ComparisonFlags, ComparisonOp, Expr};

/// Answers "can these two types be compared by this operator" for the
/// binder and the normalizer.
pub trait TypeCompatibility {
    /// Whether values of `left` and `right` can be compared with `op`.
    fn comparable(&self, left: TypeDescriptor, right: TypeDescriptor, op: ComparisonOp) -> bool;

    /// The operator computing the negation of `op`.
    fn negate(&self, op: ComparisonOp) -> ComparisonOp {
        op.negate()
    }
}

/// Family-based comparability.
///
/// Numeric types compare with each other, character types with each other
/// and with datetime types (string literals coerce to dates). Booleans compare
/// only with booleans. Binary types are not comparable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeCompatibility;

impl TypeCompatibility for DefaultTypeCompatibility {
    fn comparable(&self, left: TypeDescriptor, right: TypeDescriptor, _op: ComparisonOp) -> bool {
        use TypeFamily::{Binary, Character, Datetime};
        match (left.type_id.family(), right.type_id.family()) {
            (Binary, _) | (_, Binary) => false,
            (Character, Datetime) | (Datetime, Character) => true,
            (a, b) => a == b,
        }
    }
}

/// Bind `left op right` into a comparison node.
///
/// A NULL literal on either side is comparable with anything. With
/// `for_query_rewrite` set the check is skipped: the comparison was
/// synthesized by the optimizer from operands that were already bound.
///
/// # Errors
///
/// Returns [`CompileError::TypeIncomparable`] when the operand types cannot
/// be compared by `op`.
pub fn bind_comparison(
    op: ComparisonOp,
    left: Expr,
    right: Expr,
    compat: &dyn TypeCompatibility,
    for_query_rewrite: bool,
) -> Result<Expr> {
    let is_null_literal = |e: &Expr| matches!(e, Expr::Constant(v) if v.is_null());
    if for_query_rewrite {
        tracing::debug!(
            target: "sqlopt.expr",
            op = op.symbol(),
            "skipping comparability check for rewrite comparison"
        );
    } else if !is_null_literal(&left) && !is_null_literal(&right) {
        let (lt, rt) = (left.data_type(), right.data_type());
        if !compat.comparable(lt, rt, op) {
            return Err(CompileError::incomparable(
                lt.type_id.sql_type_name(),
                rt.type_id.sql_type_name(),
                op.symbol(),
            ));
        }
    }
    Ok(Expr::Comparison {
        op,
        left: Box::new(left),
        right: Box::new(right),
        flags: ComparisonFlags {
            for_query_rewrite,
            between_selectivity: false,
        },
    })
}

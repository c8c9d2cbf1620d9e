//! WHERE-clause normalization.
//!
//! Turns a bound boolean expression into the canonical form the planner
//! consumes:
//!
//! 1. NOT elimination ([`eliminate_nots`]),
//! 2. a top-level AND chain ([`put_ands_on_top`]),
//! 3. canonical AND/OR shape ([`to_canonical_form`]),
//! 4. BETWEEN expansion and OR→IN conversion ([`preprocess`]),
//! 5. optional verification ([`verify_canonical_form`]).
//!
//! [`normalize_where`] runs the whole pipeline; [`extract_predicates`] then
//! splits the result into per-conjunct [`Predicate`](sqlopt_expr::Predicate)s.

pub mod between;
pub mod canonical;
pub mod config;
pub mod not_elim;
pub mod or_to_in;
pub mod predicates;
pub mod preprocess;

pub use between::{expand_between, negated_between};
pub use canonical::{put_ands_on_top, to_canonical_form, verify_canonical_form, verify_top_level};
pub use config::NormalizeConfig;
pub use not_elim::{eliminate_nots, negated_in_list_expansion, verify_eliminate_nots};
pub use or_to_in::or_chain_to_in_list;
pub use predicates::extract_predicates;
pub use preprocess::preprocess;

use sqlopt_error::{CompileError, Result};
use sqlopt_expr::{ComparisonOp, Expr, TypeCompatibility};

/// Normalize a bound WHERE clause.
///
/// # Errors
///
/// - [`CompileError::TypeMismatch`] if `expr` is not boolean-valued.
/// - [`CompileError::ExpressionTooDeep`] if the tree exceeds
///   `cfg.max_expression_depth`, before or after NOT elimination.
/// - [`CompileError::TypeIncomparable`] if a comparison, BETWEEN or IN list
///   compares operands `compat` rejects (rewrite comparisons excepted).
/// - [`CompileError::TooManyInListValues`] for an oversized IN list.
/// - [`CompileError::InvariantViolation`] if verification is enabled and
///   fails.
pub fn normalize_where(
    expr: Expr,
    cfg: &NormalizeConfig,
    compat: &dyn TypeCompatibility,
) -> Result<Expr> {
    let depth = expr.depth();
    let span = tracing::debug_span!(target: "sqlopt.normalize", "normalize_where", depth);
    let _g = span.enter();

    if depth > cfg.max_expression_depth {
        return Err(CompileError::ExpressionTooDeep {
            max: cfg.max_expression_depth,
        });
    }
    let data_type = expr.data_type();
    if !data_type.is_boolean() {
        return Err(CompileError::TypeMismatch {
            expected: "BOOLEAN".to_owned(),
            actual: data_type.type_id.sql_type_name().to_owned(),
        });
    }
    check_comparable(&expr, compat)?;

    // A negated IN list grows into one AND link per value.
    let expansion = negated_in_list_expansion(&expr, false);
    if expansion > cfg.max_expression_depth {
        tracing::warn!(
            target: "sqlopt.normalize",
            expansion,
            max = cfg.max_expression_depth,
            "negated IN list too long to expand"
        );
        return Err(CompileError::ExpressionTooDeep {
            max: cfg.max_expression_depth,
        });
    }
    let expr = eliminate_nots(expr, false);
    if expr.depth() > cfg.max_expression_depth {
        return Err(CompileError::ExpressionTooDeep {
            max: cfg.max_expression_depth,
        });
    }
    let expr = put_ands_on_top(expr);
    let expr = to_canonical_form(expr, true);
    let expr = preprocess(expr, cfg, true)?;

    if cfg.verify_canonical_form {
        verify_eliminate_nots(&expr)?;
        verify_top_level(&expr)?;
    }
    tracing::debug!(
        target: "sqlopt.normalize",
        conjuncts = expr.conjuncts().count(),
        "normalized WHERE clause"
    );
    Ok(expr)
}

/// Reject comparisons between operand types `compat` cannot compare.
fn check_comparable(expr: &Expr, compat: &dyn TypeCompatibility) -> Result<()> {
    let check = |left: &Expr, right: &Expr, op: ComparisonOp| -> Result<()> {
        let null_literal = |e: &Expr| matches!(e, Expr::Constant(v) if v.is_null());
        if null_literal(left) || null_literal(right) {
            return Ok(());
        }
        let (lt, rt) = (left.data_type(), right.data_type());
        if compat.comparable(lt, rt, op) {
            Ok(())
        } else {
            Err(CompileError::incomparable(
                lt.type_id.sql_type_name(),
                rt.type_id.sql_type_name(),
                op.symbol(),
            ))
        }
    };
    match expr {
        Expr::Comparison {
            op,
            left,
            right,
            flags,
        } if !flags.for_query_rewrite => check(left, right, *op)?,
        Expr::Between { target, low, high } => {
            check(target, low, ComparisonOp::Ge)?;
            check(target, high, ComparisonOp::Le)?;
        }
        Expr::InList { target, values, .. } => {
            for v in values {
                check(target, v, ComparisonOp::Eq)?;
            }
        }
        _ => {}
    }
    for child in expr.children() {
        check_comparable(child, compat)?;
    }
    Ok(())
}

//! BETWEEN decomposition.
//!
//! Each half of an expanded BETWEEN becomes an independent scan qualifier,
//! so the target is cloned rather than shared between the two comparisons.
//! Both halves carry the between-selectivity flag so that cardinality
//! estimation treats the pair as a single range test.

use sqlopt_expr::{ComparisonFlags, ComparisonOp, Expr};

const BETWEEN_FLAGS: ComparisonFlags = ComparisonFlags {
    for_query_rewrite: false,
    between_selectivity: true,
};

fn half(op: ComparisonOp, target: Expr, bound: Expr) -> Expr {
    Expr::Comparison {
        op,
        left: Box::new(target),
        right: Box::new(bound),
        flags: BETWEEN_FLAGS,
    }
}

/// `t BETWEEN lo AND hi` as `t >= lo AND t <= hi AND TRUE`, already in
/// canonical AND-chain shape.
#[must_use]
pub fn expand_between(target: Expr, low: Expr, high: Expr) -> Expr {
    let ge = half(ComparisonOp::Ge, target.clone(), low);
    let le = half(ComparisonOp::Le, target, high);
    tracing::debug!(target: "sqlopt.normalize", lower = %ge, upper = %le, "expanded BETWEEN");
    Expr::and(ge, Expr::and(le, Expr::boolean(true)))
}

/// `NOT (t BETWEEN lo AND hi)` as `t < lo OR t > hi`.
#[must_use]
pub fn negated_between(target: Expr, low: Expr, high: Expr) -> Expr {
    let lt = half(ComparisonOp::Lt, target.clone(), low);
    let gt = half(ComparisonOp::Gt, target, high);
    Expr::or(lt, gt)
}

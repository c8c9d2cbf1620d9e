//! Splitting a canonical WHERE clause into planner predicates.

use sqlopt_expr::{Expr, Predicate};

/// Break the top-level AND chain of a canonical tree into [`Predicate`]s,
/// one per conjunct, in source order. TRUE conjuncts are dropped.
#[must_use]
pub fn extract_predicates(canonical: Expr) -> Vec<Predicate> {
    let mut out = Vec::new();
    let mut cursor = canonical;
    loop {
        match cursor {
            Expr::And { left, right, .. } => {
                if !left.is_boolean_true() {
                    out.push(Predicate::new(*left));
                }
                cursor = *right;
            }
            last => {
                if !last.is_boolean_true() {
                    out.push(Predicate::new(last));
                }
                break;
            }
        }
    }
    tracing::debug!(
        target: "sqlopt.normalize",
        predicates = out.len(),
        probes = out.iter().filter(|p| p.flags.is_in_list_probe).count(),
        "extracted predicates"
    );
    out
}

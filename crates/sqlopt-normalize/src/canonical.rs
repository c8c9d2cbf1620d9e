//! Canonical AND/OR form.
//!
//! A canonical tree has:
//! - a top level that is a right-linked chain of AND nodes ending in TRUE,
//! - no AND whose left child is an AND,
//! - OR chains that are right-linked, end in FALSE and never have an OR as
//!   a left child.
//!
//! Nodes other than AND and OR are leaves here; nothing beneath them is
//! rewritten. Right spines are walked with loops, so chain length is not
//! bounded by the stack.

use sqlopt_error::{CompileError, Result};
use sqlopt_expr::Expr;

/// Make sure the top level of `expr` is an AND chain ending in TRUE.
///
/// An AND has its right spine extended; anything else becomes
/// `expr AND TRUE`.
#[must_use]
pub fn put_ands_on_top(expr: Expr) -> Expr {
    let mut heads = Vec::new();
    let mut rest = expr;
    let tail = loop {
        match rest {
            Expr::And { left, right, .. } => {
                heads.push(*left);
                if right.is_boolean_true() {
                    break *right;
                }
                rest = *right;
            }
            other => {
                heads.push(other);
                break Expr::boolean(true);
            }
        }
    };
    Connective::And.rebuild(heads, tail)
}

/// Rewrite `expr` into canonical form.
///
/// `under_top_and` is true while walking the top-level AND chain; opaque
/// nodes reached that way are marked so that subquery flattening can find
/// them.
#[must_use]
pub fn to_canonical_form(expr: Expr, under_top_and: bool) -> Expr {
    match expr {
        Expr::And { left, right, .. } => {
            canonical_chain(Connective::And, *left, *right, under_top_and)
        }
        Expr::Or { left, right, .. } => canonical_chain(Connective::Or, *left, *right, false),
        Expr::Other(mut opaque) => {
            opaque.under_top_and = under_top_and;
            Expr::Other(opaque)
        }
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

impl Connective {
    /// Children of a node of this connective, or the node back.
    fn split(self, expr: Expr) -> std::result::Result<(Expr, Expr), Expr> {
        match (self, expr) {
            (Self::And, Expr::And { left, right, .. }) | (Self::Or, Expr::Or { left, right, .. }) => {
                Ok((*left, *right))
            }
            (_, other) => Err(other),
        }
    }

    fn is_link(self, expr: &Expr) -> bool {
        match self {
            Self::And => expr.is_and(),
            Self::Or => expr.is_or(),
        }
    }

    fn is_terminator(self, expr: &Expr) -> bool {
        match self {
            Self::And => expr.is_boolean_true(),
            Self::Or => expr.is_boolean_false(),
        }
    }

    /// TRUE ends an AND chain, FALSE an OR chain.
    fn terminator(self) -> Expr {
        Expr::boolean(self == Self::And)
    }

    fn join(self, left: Expr, right: Expr) -> Expr {
        match self {
            Self::And => Expr::and(left, right),
            Self::Or => Expr::or(left, right),
        }
    }

    /// Right-linked chain of `heads` ending in `tail`.
    fn rebuild(self, heads: Vec<Expr>, tail: Expr) -> Expr {
        heads
            .into_iter()
            .rev()
            .fold(tail, |acc, head| self.join(head, acc))
    }
}

/// Canonicalize the chain rooted at `left <connective> right`.
///
/// At each link the right child is terminated if it is neither a link nor
/// the terminator (for OR this also covers an AND on the right), and
/// left-nested links are rotated onto the right spine.
fn canonical_chain(
    connective: Connective,
    mut left: Expr,
    mut right: Expr,
    under_top_and: bool,
) -> Expr {
    let mut heads = Vec::new();
    let mut rotations = 0_usize;
    let tail = loop {
        if !connective.is_link(&right) && !connective.is_terminator(&right) {
            right = connective.join(right, connective.terminator());
        }
        loop {
            match connective.split(left) {
                Ok((inner_left, inner_right)) => {
                    right = connective.join(inner_right, right);
                    left = inner_left;
                    rotations += 1;
                }
                Err(leaf) => {
                    left = leaf;
                    break;
                }
            }
        }
        heads.push(to_canonical_form(left, under_top_and));
        match connective.split(right) {
            Ok((next_left, next_right)) => {
                left = next_left;
                right = next_right;
            }
            Err(terminator) => break terminator,
        }
    };
    if rotations > 0 {
        tracing::trace!(
            target: "sqlopt.normalize",
            ?connective,
            rotations,
            links = heads.len(),
            "rotated left-nested chain"
        );
    }
    connective.rebuild(heads, tail)
}

fn violation(detail: String) -> CompileError {
    tracing::error!(target: "sqlopt.normalize", %detail, "canonical form violated");
    CompileError::invariant(detail)
}

/// Check the canonical-form invariants for every AND and OR in `expr`.
///
/// # Errors
///
/// Returns [`CompileError::InvariantViolation`] describing the first
/// offending node.
pub fn verify_canonical_form(expr: &Expr) -> Result<()> {
    let mut pending = vec![expr];
    while let Some(node) = pending.pop() {
        match node {
            Expr::And { left, right, .. } => {
                if left.is_and() {
                    return Err(violation(format!("left child of AND is AND: {node}")));
                }
                if !right.is_and() && !right.is_boolean_true() {
                    return Err(violation(format!(
                        "AND chain does not end in TRUE: {node}"
                    )));
                }
                pending.push(right);
                pending.push(left);
            }
            Expr::Or { left, right, .. } => {
                if left.is_or() {
                    return Err(violation(format!("left child of OR is OR: {node}")));
                }
                if !right.is_or() && !right.is_boolean_false() {
                    return Err(violation(format!(
                        "OR chain does not end in FALSE: {node}"
                    )));
                }
                pending.push(right);
                pending.push(left);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Like [`verify_canonical_form`], and additionally require the top level
/// to be an AND chain.
///
/// # Errors
///
/// Returns [`CompileError::InvariantViolation`] on failure.
pub fn verify_top_level(expr: &Expr) -> Result<()> {
    if !expr.is_and() {
        return Err(violation(format!("top level is not an AND chain: {expr}")));
    }
    verify_canonical_form(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlopt_expr::{ComparisonOp, OpaqueExpr};
    use sqlopt_types::{ColumnId, TableId, TypeDescriptor, TypeId};

    fn p(c: u32) -> Expr {
        Expr::comparison(
            ComparisonOp::Eq,
            Expr::column(
                TableId::new(1),
                ColumnId::new(c),
                format!("c{c}"),
                TypeDescriptor::new(TypeId::Integer, false),
            ),
            Expr::constant(i64::from(c)),
        )
    }

    #[test]
    fn put_ands_on_top_wraps_leaf() {
        assert_eq!(put_ands_on_top(p(1)), Expr::and(p(1), Expr::boolean(true)));
    }

    #[test]
    fn put_ands_on_top_extends_spine() {
        let e = Expr::and(p(1), p(2));
        assert_eq!(
            put_ands_on_top(e),
            Expr::and(p(1), Expr::and(p(2), Expr::boolean(true)))
        );
        let done = Expr::and(p(1), Expr::boolean(true));
        assert_eq!(put_ands_on_top(done.clone()), done);
    }

    #[test]
    fn left_nested_and_is_rotated_in_order() {
        // ((p1 AND p2) AND p3) AND TRUE
        let e = Expr::and(
            Expr::and(Expr::and(p(1), p(2)), p(3)),
            Expr::boolean(true),
        );
        let out = to_canonical_form(e, true);
        verify_canonical_form(&out).unwrap();
        let order: Vec<&Expr> = out.conjuncts().collect();
        assert_eq!(order, vec![&p(1), &p(2), &p(3)]);
    }

    #[test]
    fn or_chain_gets_false_terminator() {
        let e = Expr::and(Expr::or(Expr::or(p(1), p(2)), p(3)), Expr::boolean(true));
        let out = to_canonical_form(e, true);
        verify_top_level(&out).unwrap();
        let expected_or = Expr::or(
            p(1),
            Expr::or(p(2), Expr::or(p(3), Expr::boolean(false))),
        );
        assert_eq!(out, Expr::and(expected_or, Expr::boolean(true)));
    }

    #[test]
    fn and_on_or_spine_is_wrapped() {
        let e = Expr::or(p(1), Expr::and(p(2), p(3)));
        let out = to_canonical_form(e, false);
        verify_canonical_form(&out).unwrap();
        let Expr::Or { right, .. } = &out else {
            panic!("expected OR, got {out}");
        };
        let Expr::Or { left: wrapped, right: terminator, .. } = right.as_ref() else {
            panic!("expected OR, got {right}");
        };
        assert!(wrapped.is_and());
        assert!(terminator.is_boolean_false());
    }

    #[test]
    fn opaque_nodes_learn_top_and_position() {
        let sub = Expr::Other(OpaqueExpr::new("EXISTS (...)", TypeDescriptor::boolean(false)));
        let top = to_canonical_form(put_ands_on_top(Expr::and(sub.clone(), p(1))), true);
        let first = top.conjuncts().next().unwrap();
        assert!(matches!(first, Expr::Other(o) if o.under_top_and));

        let under_or = to_canonical_form(Expr::or(sub, p(1)), true);
        let Expr::Or { left, .. } = &under_or else {
            panic!("expected OR");
        };
        assert!(matches!(left.as_ref(), Expr::Other(o) if !o.under_top_and));
    }

    #[test]
    fn verify_rejects_left_nested_and() {
        let bad = Expr::and(Expr::and(p(1), Expr::boolean(true)), Expr::boolean(true));
        assert!(verify_canonical_form(&bad).unwrap_err().is_internal());
        let unterminated = Expr::or(p(1), p(2));
        assert!(verify_canonical_form(&unterminated).is_err());
        assert!(verify_top_level(&p(1)).is_err());
    }

    #[test]
    fn nullability_is_rederived() {
        let nullable = Expr::comparison(
            ComparisonOp::Eq,
            Expr::column(
                TableId::new(1),
                ColumnId::new(9),
                "n",
                TypeDescriptor::new(TypeId::Integer, true),
            ),
            Expr::constant(1),
        );
        let out = to_canonical_form(Expr::and(p(1), nullable), true);
        assert!(out.is_nullable());
        let Expr::And { right, .. } = &out else {
            panic!("expected AND");
        };
        assert!(right.is_nullable());
    }

    #[test]
    fn long_chains_are_rebuilt_without_recursion() {
        // Left-deep: (((p0 AND p1) AND p2) ... AND pn)
        let mut left_deep = p(0);
        for c in 1..3000 {
            left_deep = Expr::and(left_deep, p(c % 7));
        }
        let out = to_canonical_form(put_ands_on_top(left_deep), true);
        verify_top_level(&out).unwrap();
        assert_eq!(out.conjuncts().count(), 3000);

        let mut right_deep = Expr::boolean(false);
        for c in 0..3000 {
            right_deep = Expr::or(p(c % 5), right_deep);
        }
        let out = to_canonical_form(right_deep, false);
        verify_canonical_form(&out).unwrap();
        assert_eq!(out.depth(), 3002);
    }
}

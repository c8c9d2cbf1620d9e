//! NOT elimination.
//!
//! Pushes negation down through AND/OR (De Morgan) until it reaches a
//! comparison, where it is absorbed by negating the operator. BETWEEN,
//! IN-lists, IS NULL and boolean constants absorb it too. Any other node
//! keeps an explicit [`Expr::Not`] above it.

use sqlopt_error::{CompileError, Result};
use sqlopt_expr::{ComparisonOp, Expr};
use sqlopt_types::SqlValue;

use crate::between::negated_between;

/// Remove NOT nodes from `expr`.
///
/// `under_not` says whether an odd number of NOTs sits above `expr`. With
/// `under_not == false` the tree is still walked so nested NOTs are found,
/// including NOTs inside the operands of comparisons, BETWEEN, IN lists and
/// IS NULL.
#[must_use]
pub fn eliminate_nots(expr: Expr, under_not: bool) -> Expr {
    match expr {
        Expr::And { left, right, .. } => {
            let l = eliminate_nots(*left, under_not);
            let r = eliminate_nots(*right, under_not);
            if under_not {
                Expr::or(l, r)
            } else {
                Expr::and(l, r)
            }
        }
        Expr::Or { left, right, .. } => {
            let l = eliminate_nots(*left, under_not);
            let r = eliminate_nots(*right, under_not);
            if under_not {
                Expr::and(l, r)
            } else {
                Expr::or(l, r)
            }
        }
        Expr::Not(operand) => eliminate_nots(*operand, !under_not),
        leaf => {
            let leaf = eliminate_in_operands(leaf);
            if under_not {
                negate(leaf)
            } else {
                leaf
            }
        }
    }
}

/// Operands are evaluated as values, so NOTs inside them are eliminated
/// with a fresh, un-negated context.
fn eliminate_in_operands(expr: Expr) -> Expr {
    let clean = |operand: Box<Expr>| Box::new(eliminate_nots(*operand, false));
    match expr {
        Expr::Comparison {
            op,
            left,
            right,
            flags,
        } => Expr::Comparison {
            op,
            left: clean(left),
            right: clean(right),
            flags,
        },
        Expr::Between { target, low, high } => Expr::Between {
            target: clean(target),
            low: clean(low),
            high: clean(high),
        },
        Expr::InList {
            target,
            values,
            nullable,
        } => Expr::InList {
            target: clean(target),
            values: values
                .into_iter()
                .map(|v| eliminate_nots(v, false))
                .collect(),
            nullable,
        },
        Expr::IsNull { operand, negated } => Expr::IsNull {
            operand: clean(operand),
            negated,
        },
        other => other,
    }
}

/// Absorb one NOT into a non-logical node.
fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Comparison {
            op,
            left,
            right,
            flags,
        } => Expr::Comparison {
            op: op.negate(),
            left,
            right,
            flags,
        },
        Expr::Between { target, low, high } => negated_between(*target, *low, *high),
        Expr::InList { target, values, .. } => negated_in_list(*target, values),
        Expr::IsNull { operand, negated } => Expr::IsNull {
            operand,
            negated: !negated,
        },
        Expr::Constant(SqlValue::Boolean(b)) => Expr::boolean(!b),
        Expr::Constant(SqlValue::Null) => Expr::Constant(SqlValue::Null),
        other => {
            tracing::trace!(
                target: "sqlopt.normalize",
                node = %other,
                "NOT kept above non-logical node"
            );
            Expr::not(other)
        }
    }
}

/// `NOT (t IN (v1, .., vn))` as `t <> v1 AND .. AND t <> vn`.
fn negated_in_list(target: Expr, values: Vec<Expr>) -> Expr {
    let mut conjuncts: Vec<Expr> = values
        .into_iter()
        .map(|v| Expr::comparison(ComparisonOp::Ne, target.clone(), v))
        .collect();
    let Some(mut acc) = conjuncts.pop() else {
        // NOT IN () holds for every row.
        return Expr::boolean(true);
    };
    while let Some(next) = conjuncts.pop() {
        acc = Expr::and(next, acc);
    }
    acc
}

/// Length of the longest AND chain [`eliminate_nots`] would build from a
/// negated IN list in `expr`.
#[must_use]
pub fn negated_in_list_expansion(expr: &Expr, under_not: bool) -> usize {
    let own = match expr {
        Expr::Not(operand) => return negated_in_list_expansion(operand, !under_not),
        Expr::And { .. } | Expr::Or { .. } => {
            return expr
                .children()
                .map(|child| negated_in_list_expansion(child, under_not))
                .max()
                .unwrap_or(0);
        }
        Expr::InList { values, .. } if under_not => values.len(),
        _ => 0,
    };
    expr.children()
        .map(|child| negated_in_list_expansion(child, false))
        .max()
        .unwrap_or(0)
        .max(own)
}

fn absorbs_not(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::And { .. }
            | Expr::Or { .. }
            | Expr::Not(_)
            | Expr::Comparison { .. }
            | Expr::Between { .. }
            | Expr::InList { .. }
            | Expr::IsNull { .. }
            | Expr::Constant(SqlValue::Boolean(_) | SqlValue::Null)
    )
}

/// Check that no NOT survives above a node that absorbs negation.
///
/// # Errors
///
/// Returns [`CompileError::InvariantViolation`] naming the offending node.
pub fn verify_eliminate_nots(expr: &Expr) -> Result<()> {
    let mut pending = vec![expr];
    while let Some(node) = pending.pop() {
        if let Expr::Not(operand) = node {
            if absorbs_not(operand) {
                tracing::error!(
                    target: "sqlopt.normalize",
                    node = %node,
                    "NOT survived elimination"
                );
                return Err(CompileError::invariant(format!(
                    "NOT left above {operand}"
                )));
            }
        }
        pending.extend(node.children());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlopt_expr::OpaqueExpr;
    use sqlopt_types::{ColumnId, TableId, TypeDescriptor, TypeId};

    fn col(c: u32) -> Expr {
        Expr::column(
            TableId::new(1),
            ColumnId::new(c),
            format!("c{c}"),
            TypeDescriptor::new(TypeId::Integer, true),
        )
    }

    fn cmp(op: ComparisonOp, c: u32, v: i64) -> Expr {
        Expr::comparison(op, col(c), Expr::constant(v))
    }

    #[test]
    fn de_morgan_over_and() {
        let e = Expr::not(Expr::and(cmp(ComparisonOp::Eq, 1, 1), cmp(ComparisonOp::Lt, 2, 5)));
        let out = eliminate_nots(e, false);
        assert_eq!(
            out,
            Expr::or(cmp(ComparisonOp::Ne, 1, 1), cmp(ComparisonOp::Ge, 2, 5))
        );
        verify_eliminate_nots(&out).unwrap();
    }

    #[test]
    fn double_not_cancels() {
        let e = Expr::not(Expr::not(cmp(ComparisonOp::Gt, 1, 3)));
        assert_eq!(eliminate_nots(e, false), cmp(ComparisonOp::Gt, 1, 3));
    }

    #[test]
    fn nested_not_without_outer_not_is_found() {
        let e = Expr::and(
            cmp(ComparisonOp::Eq, 1, 1),
            Expr::not(Expr::or(cmp(ComparisonOp::Le, 2, 2), cmp(ComparisonOp::Ne, 3, 3))),
        );
        let out = eliminate_nots(e, false);
        assert_eq!(
            out,
            Expr::and(
                cmp(ComparisonOp::Eq, 1, 1),
                Expr::and(cmp(ComparisonOp::Gt, 2, 2), cmp(ComparisonOp::Eq, 3, 3)),
            )
        );
    }

    #[test]
    fn not_between_becomes_or_with_flags() {
        let e = Expr::not(Expr::between(col(1), Expr::constant(1), Expr::constant(9)));
        let out = eliminate_nots(e, false);
        let Expr::Or { left, right, .. } = &out else {
            panic!("expected OR, got {out}");
        };
        for (side, op) in [(left, ComparisonOp::Lt), (right, ComparisonOp::Gt)] {
            match side.as_ref() {
                Expr::Comparison { op: got, flags, .. } => {
                    assert_eq!(*got, op);
                    assert!(flags.between_selectivity);
                }
                other => panic!("expected comparison, got {other}"),
            }
        }
    }

    #[test]
    fn not_in_list_becomes_and_of_not_equals() {
        let e = Expr::not(Expr::in_list(
            col(1),
            vec![Expr::constant(1), Expr::constant(2), Expr::constant(3)],
        ));
        let out = eliminate_nots(e, false);
        assert_eq!(
            out,
            Expr::and(
                cmp(ComparisonOp::Ne, 1, 1),
                Expr::and(cmp(ComparisonOp::Ne, 1, 2), cmp(ComparisonOp::Ne, 1, 3)),
            )
        );
    }

    #[test]
    fn is_null_and_constants_flip() {
        assert_eq!(
            eliminate_nots(Expr::not(Expr::is_null(col(1), false)), false),
            Expr::is_null(col(1), true)
        );
        assert_eq!(
            eliminate_nots(Expr::not(Expr::boolean(true)), false),
            Expr::boolean(false)
        );
        assert_eq!(
            eliminate_nots(Expr::not(Expr::Constant(SqlValue::Null)), false),
            Expr::Constant(SqlValue::Null)
        );
    }

    #[test]
    fn opaque_keeps_surviving_not() {
        let f = Expr::Other(OpaqueExpr::new("f(c1)", TypeDescriptor::boolean(true)));
        let out = eliminate_nots(Expr::not(f.clone()), false);
        assert_eq!(out, Expr::not(f));
        verify_eliminate_nots(&out).unwrap();
    }

    #[test]
    fn verify_rejects_not_over_comparison() {
        let bad = Expr::and(
            Expr::not(cmp(ComparisonOp::Eq, 1, 1)),
            Expr::boolean(true),
        );
        let err = verify_eliminate_nots(&bad).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn not_inside_comparison_operand_is_eliminated() {
        // (NOT c1 = 1) = TRUE
        let e = Expr::comparison(
            ComparisonOp::Eq,
            Expr::not(cmp(ComparisonOp::Eq, 1, 1)),
            Expr::boolean(true),
        );
        let out = eliminate_nots(e, false);
        assert_eq!(
            out,
            Expr::comparison(
                ComparisonOp::Eq,
                cmp(ComparisonOp::Ne, 1, 1),
                Expr::boolean(true)
            )
        );
        verify_eliminate_nots(&out).unwrap();

        // Negating the outer comparison leaves the operand's own rewrite alone.
        let e = Expr::not(Expr::comparison(
            ComparisonOp::Eq,
            Expr::not(cmp(ComparisonOp::Lt, 1, 4)),
            Expr::boolean(true),
        ));
        assert_eq!(
            eliminate_nots(e, false),
            Expr::comparison(
                ComparisonOp::Ne,
                cmp(ComparisonOp::Ge, 1, 4),
                Expr::boolean(true)
            )
        );
    }

    #[test]
    fn not_inside_is_null_operand_is_eliminated() {
        let e = Expr::is_null(Expr::not(cmp(ComparisonOp::Gt, 2, 0)), false);
        let out = eliminate_nots(e, false);
        assert_eq!(out, Expr::is_null(cmp(ComparisonOp::Le, 2, 0), false));
        verify_eliminate_nots(&out).unwrap();
    }

    #[test]
    fn negated_in_list_expansion_counts_only_negated_lists() {
        let list = |n: i64| Expr::in_list(col(1), (0..n).map(Expr::constant).collect());
        assert_eq!(negated_in_list_expansion(&list(7), false), 0);
        assert_eq!(negated_in_list_expansion(&Expr::not(list(7)), false), 7);
        assert_eq!(
            negated_in_list_expansion(&Expr::not(Expr::not(list(7))), false),
            0
        );
        let both = Expr::and(Expr::not(list(3)), Expr::not(Expr::or(list(2), list(9))));
        assert_eq!(negated_in_list_expansion(&both, false), 9);
    }
}

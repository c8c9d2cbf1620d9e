//! OR→IN conversion.
//!
//! `c = a OR c = b OR c = d` (any mix of `c = x` and `x = c`) over one
//! column becomes `c IN (a, b, d)`. Anything else is left alone; the
//! conversion is an optimization, not a requirement.

use sqlopt_expr::{ColumnRef, ComparisonOp, Expr};

/// Disjuncts of a right-linked OR chain, without the FALSE terminator.
fn disjuncts(chain: &Expr) -> Vec<&Expr> {
    let mut out = Vec::new();
    let mut cursor = chain;
    loop {
        match cursor {
            Expr::Or { left, right, .. } => {
                out.push(left.as_ref());
                cursor = right.as_ref();
            }
            last => {
                if !last.is_boolean_false() {
                    out.push(last);
                }
                return out;
            }
        }
    }
}

fn equality_sides(expr: &Expr) -> Option<(&Expr, &Expr)> {
    match expr {
        Expr::Comparison {
            op: ComparisonOp::Eq,
            left,
            right,
            ..
        } => Some((left.as_ref(), right.as_ref())),
        _ => None,
    }
}

fn has_column_side(disjunct: &Expr, target: &ColumnRef) -> bool {
    equality_sides(disjunct).is_some_and(|(l, r)| {
        [l, r]
            .into_iter()
            .any(|side| side.as_column_ref().is_some_and(|c| c.same_column(target)))
    })
}

/// The column every disjunct compares for equality, if there is one and the
/// chain has at least two disjuncts.
#[must_use]
pub fn common_equality_column(chain: &Expr) -> Option<ColumnRef> {
    let parts = disjuncts(chain);
    if parts.len() < 2 {
        return None;
    }
    let (first_left, first_right) = equality_sides(parts[0])?;
    [first_left, first_right]
        .into_iter()
        .filter_map(Expr::as_column_ref)
        .find(|candidate| parts.iter().all(|d| has_column_side(d, candidate)))
        .cloned()
}

/// Number of disjuncts in a right-linked OR chain.
#[must_use]
pub fn disjunct_count(chain: &Expr) -> usize {
    disjuncts(chain).len()
}

/// The side of `target = value` (or `value = target`) that is not `target`.
fn value_side(disjunct: Expr, target: &ColumnRef) -> Expr {
    match disjunct {
        Expr::Comparison { left, right, .. } => {
            if left.as_column_ref().is_some_and(|c| c.same_column(target)) {
                *right
            } else {
                *left
            }
        }
        other => other,
    }
}

/// Replace an OR chain of equalities on one column with an IN list.
///
/// Returns the chain unchanged when it does not have that shape. The IN list
/// keeps the chain's nullability.
#[must_use]
pub fn or_chain_to_in_list(chain: Expr) -> Expr {
    let Some(target) = common_equality_column(&chain) else {
        return chain;
    };
    let nullable = chain.is_nullable();
    let mut values = Vec::new();
    let mut cursor = chain;
    loop {
        match cursor {
            Expr::Or { left, right, .. } => {
                values.push(value_side(*left, &target));
                cursor = *right;
            }
            last => {
                if !last.is_boolean_false() {
                    values.push(value_side(last, &target));
                }
                break;
            }
        }
    }
    tracing::debug!(
        target: "sqlopt.normalize",
        column = %target,
        values = values.len(),
        "converted OR chain to IN list"
    );
    Expr::InList {
        target: Box::new(Expr::ColumnRef(target)),
        values,
        nullable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlopt_types::{ColumnId, TableId, TypeDescriptor, TypeId};

    fn c(table: u32, column: u32) -> Expr {
        Expr::column(
            TableId::new(table),
            ColumnId::new(column),
            format!("c{column}"),
            TypeDescriptor::new(TypeId::Integer, true),
        )
    }

    fn eq(l: Expr, r: Expr) -> Expr {
        Expr::comparison(ComparisonOp::Eq, l, r)
    }

    fn chain(parts: Vec<Expr>) -> Expr {
        parts
            .into_iter()
            .rev()
            .fold(Expr::boolean(false), |acc, d| Expr::or(d, acc))
    }

    #[test]
    fn converts_mixed_sides() {
        let e = chain(vec![
            eq(c(1, 1), Expr::constant(1)),
            eq(Expr::constant(2), c(1, 1)),
            eq(c(1, 1), c(2, 5)),
        ]);
        let nullable = e.is_nullable();
        let out = or_chain_to_in_list(e);
        assert_eq!(out.to_string(), "t1.c1 IN (1, 2, t2.c5)");
        assert_eq!(out.is_nullable(), nullable);
    }

    #[test]
    fn picks_the_shared_column_from_either_side() {
        // First disjunct has two columns; only the right one is shared.
        let e = chain(vec![
            eq(c(2, 5), c(1, 1)),
            eq(c(1, 1), Expr::constant(7)),
        ]);
        let out = or_chain_to_in_list(e);
        assert_eq!(out.to_string(), "t1.c1 IN (t2.c5, 7)");
    }

    #[test]
    fn different_columns_are_left_alone() {
        let e = chain(vec![
            eq(c(1, 1), Expr::constant(1)),
            eq(c(1, 2), Expr::constant(2)),
        ]);
        assert_eq!(or_chain_to_in_list(e.clone()), e);
    }

    #[test]
    fn non_equality_is_left_alone() {
        let e = chain(vec![
            eq(c(1, 1), Expr::constant(1)),
            Expr::comparison(ComparisonOp::Lt, c(1, 1), Expr::constant(0)),
        ]);
        assert_eq!(or_chain_to_in_list(e.clone()), e);
    }

    #[test]
    fn single_disjunct_is_not_converted() {
        let e = chain(vec![eq(c(1, 1), Expr::constant(1))]);
        assert!(common_equality_column(&e).is_none());
        assert_eq!(disjunct_count(&e), 1);
    }
}

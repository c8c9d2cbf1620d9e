//! SQL-like rendering of bound expressions for plans, logs and test output.
//!
//! The output is not meant to be re-parsed: column references print their
//! resolved table id and an opaque node prints its stored description.

#[allow(clippy::wildcard_imports)]
use crate::*;
use std::fmt;

fn comma_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn needs_quoting(name: &str) -> bool {
    let Some(first) = name.bytes().next() else {
        return true;
    };
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return true;
    }
    name.bytes()
        .any(|b| !(b.is_ascii_alphanumeric() || b == b'_'))
}

/// Parenthesize operands that are themselves logical or comparison nodes so
/// the rendering shows the tree shape.
fn write_paren_if_compound(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    if matches!(
        expr,
        Expr::And { .. }
            | Expr::Or { .. }
            | Expr::Comparison { .. }
            | Expr::Between { .. }
            | Expr::InList { .. }
    ) {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", self.table_id)?;
        if needs_quoting(&self.name) {
            write!(f, "\"{}\"", self.name.replace('"', "\"\""))
        } else {
            f.write_str(&self.name)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And { left, right, .. } => {
                write_paren_if_compound(f, left)?;
                f.write_str(" AND ")?;
                write_paren_if_compound(f, right)
            }
            Self::Or { left, right, .. } => {
                write_paren_if_compound(f, left)?;
                f.write_str(" OR ")?;
                write_paren_if_compound(f, right)
            }
            Self::Not(operand) => {
                f.write_str("NOT ")?;
                write_paren_if_compound(f, operand)
            }
            Self::Comparison {
                op, left, right, ..
            } => {
                write_paren_if_compound(f, left)?;
                write!(f, " {op} ")?;
                write_paren_if_compound(f, right)
            }
            Self::Between { target, low, high } => {
                write_paren_if_compound(f, target)?;
                f.write_str(" BETWEEN ")?;
                write_paren_if_compound(f, low)?;
                f.write_str(" AND ")?;
                write_paren_if_compound(f, high)
            }
            Self::InList { target, values, .. } => {
                write_paren_if_compound(f, target)?;
                f.write_str(" IN (")?;
                comma_list(f, values)?;
                f.write_str(")")
            }
            Self::IsNull { operand, negated } => {
                write_paren_if_compound(f, operand)?;
                if *negated {
                    f.write_str(" IS NOT NULL")
                } else {
                    f.write_str(" IS NULL")
                }
            }
            Self::ColumnRef(col) => write!(f, "{col}"),
            Self::Constant(value) => write!(f, "{value}"),
            Self::Other(opaque) => f.write_str(&opaque.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlopt_types::{ColumnId, SqlValue, TableId, TypeDescriptor, TypeId};

    fn col(name: &str) -> Expr {
        Expr::column(
            TableId::new(1),
            ColumnId::new(1),
            name,
            TypeDescriptor::new(TypeId::Integer, true),
        )
    }

    #[test]
    fn renders_canonical_chain() {
        let e = Expr::and(
            Expr::comparison(ComparisonOp::Ge, col("a"), Expr::constant(1)),
            Expr::and(
                Expr::comparison(ComparisonOp::Le, col("a"), Expr::constant(5)),
                Expr::boolean(true),
            ),
        );
        assert_eq!(e.to_string(), "(t1.a >= 1) AND ((t1.a <= 5) AND TRUE)");
    }

    #[test]
    fn renders_in_list_and_is_null() {
        let e = Expr::in_list(col("b"), vec![Expr::constant(1), Expr::constant("x")]);
        assert_eq!(e.to_string(), "t1.b IN (1, 'x')");
        assert_eq!(
            Expr::is_null(col("b"), true).to_string(),
            "t1.b IS NOT NULL"
        );
    }

    #[test]
    fn quotes_odd_column_names() {
        assert_eq!(col("my col").to_string(), "t1.\"my col\"");
        assert_eq!(
            Expr::not(Expr::Constant(SqlValue::Null)).to_string(),
            "NOT NULL"
        );
    }
}

//! Post-canonicalization rewrites: BETWEEN expansion, OR→IN conversion and
//! single-value IN lists.
//!
//! Runs over a canonical tree and keeps it canonical: when the left child of
//! an AND becomes an AND chain (an expanded BETWEEN), the chain is
//! canonicalized and spliced into the spine.

use sqlopt_error::{CompileError, Result};
use sqlopt_expr::{ComparisonOp, Expr};

use crate::between::expand_between;
use crate::canonical::to_canonical_form;
use crate::config::NormalizeConfig;
use crate::or_to_in::{disjunct_count, or_chain_to_in_list};

/// Apply the preprocessing rewrites to a canonical tree.
///
/// # Errors
///
/// Returns [`CompileError::TooManyInListValues`] for a bound IN list longer
/// than `cfg.max_in_list_values`.
pub fn preprocess(expr: Expr, cfg: &NormalizeConfig, under_top_and: bool) -> Result<Expr> {
    match expr {
        Expr::And { .. } => preprocess_conjuncts(expr, cfg, under_top_and),
        Expr::Or { .. } => preprocess_or_chain(expr, cfg),
        Expr::Between { target, low, high } if cfg.expand_between => {
            Ok(expand_between(*target, *low, *high))
        }
        Expr::InList { .. } => preprocess_in_list(expr, cfg),
        other => Ok(other),
    }
}

/// Split a right-linked chain into its left children and the final right
/// child.
fn spine(chain: Expr, is_link: fn(&Expr) -> bool) -> (Vec<Expr>, Expr) {
    let mut heads = Vec::new();
    let mut rest = chain;
    loop {
        if !is_link(&rest) {
            return (heads, rest);
        }
        match rest {
            Expr::And { left, right, .. } | Expr::Or { left, right, .. } => {
                heads.push(*left);
                rest = *right;
            }
            other => return (heads, other),
        }
    }
}

/// Preprocess each conjunct of an AND chain, rebuilding the chain from the
/// tail. A conjunct that became an AND chain is canonicalized and spliced
/// in; the already rebuilt tail is canonical and stays untouched.
fn preprocess_conjuncts(chain: Expr, cfg: &NormalizeConfig, under_top_and: bool) -> Result<Expr> {
    let (heads, tail) = spine(chain, Expr::is_and);
    let heads = heads
        .into_iter()
        .map(|head| preprocess(head, cfg, under_top_and))
        .collect::<Result<Vec<_>>>()?;
    let mut acc = preprocess(tail, cfg, under_top_and)?;
    for head in heads.into_iter().rev() {
        acc = if head.is_and() {
            append_conjuncts(to_canonical_form(head, under_top_and), acc)
        } else {
            Expr::and(head, acc)
        };
    }
    Ok(acc)
}

/// Replace the TRUE terminating `chain` with `tail`.
fn append_conjuncts(chain: Expr, tail: Expr) -> Expr {
    let (mut heads, last) = spine(chain, Expr::is_and);
    if !last.is_boolean_true() {
        heads.push(last);
    }
    heads
        .into_iter()
        .rev()
        .fold(tail, |acc, head| Expr::and(head, acc))
}

/// Head of an OR chain: try OR→IN once, otherwise preprocess each disjunct
/// and keep the spine.
fn preprocess_or_chain(chain: Expr, cfg: &NormalizeConfig) -> Result<Expr> {
    if cfg.convert_or_to_in && disjunct_count(&chain) <= cfg.max_in_list_values {
        let converted = or_chain_to_in_list(chain);
        if matches!(converted, Expr::InList { .. }) {
            return Ok(converted);
        }
        return preprocess_disjuncts(converted, cfg);
    }
    preprocess_disjuncts(chain, cfg)
}

fn preprocess_disjuncts(chain: Expr, cfg: &NormalizeConfig) -> Result<Expr> {
    let (heads, tail) = spine(chain, Expr::is_or);
    let heads = heads
        .into_iter()
        .map(|head| preprocess(head, cfg, false))
        .collect::<Result<Vec<_>>>()?;
    let tail = preprocess(tail, cfg, false)?;
    Ok(heads
        .into_iter()
        .rev()
        .fold(tail, |acc, head| Expr::or(head, acc)))
}

fn preprocess_in_list(expr: Expr, cfg: &NormalizeConfig) -> Result<Expr> {
    let Expr::InList {
        target,
        mut values,
        nullable,
    } = expr
    else {
        return Ok(expr);
    };
    if values.len() > cfg.max_in_list_values {
        return Err(CompileError::TooManyInListValues {
            count: values.len(),
            max: cfg.max_in_list_values,
        });
    }
    if values.len() == 1 {
        if let Some(only) = values.pop() {
            tracing::debug!(target: "sqlopt.normalize", "single-value IN list rewritten to =");
            return Ok(Expr::comparison(ComparisonOp::Eq, *target, only));
        }
    }
    Ok(Expr::InList {
        target,
        values,
        nullable,
    })
}

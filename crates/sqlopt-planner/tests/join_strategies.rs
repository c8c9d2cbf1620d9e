//! Join strategy feasibility, costing and predicate placement.

use proptest::prelude::*;
use sqlopt_expr::{ComparisonOp, Expr, Predicate};
use sqlopt_planner::{
    best_join_strategy, AccessPath, CostEstimate, InnerSource, JoinStrategy, JoinStrategyKind,
    NestedLoopJoinStrategy, PlannerConfig, SearchContext,
};
use sqlopt_types::{ColumnId, TableId, TableSet, TypeDescriptor, TypeId};

fn col(table: u32, column: u32) -> Expr {
    Expr::column(
        TableId::new(table),
        ColumnId::new(column),
        format!("c{column}"),
        TypeDescriptor::new(TypeId::Integer, true),
    )
}

fn equijoin(a: u32, b: u32) -> Predicate {
    Predicate::new(Expr::comparison(ComparisonOp::Eq, col(a, 1), col(b, 1)))
}

fn local(table: u32, value: i64) -> Predicate {
    Predicate::new(Expr::comparison(
        ComparisonOp::Le,
        col(table, 2),
        Expr::constant(value),
    ))
}

fn ctx(outer: &[u32]) -> SearchContext {
    let ids: Vec<TableId> = outer.iter().copied().map(TableId::new).collect();
    SearchContext::new(PlannerConfig::default(), TableSet::of(&ids))
}

fn outer_rows(rows: f64) -> CostEstimate {
    let mut est = CostEstimate::zero();
    est.set_estimated_row_count(rows);
    est
}

#[test]
fn test_nested_loop_feasibility() {
    let nl = NestedLoopJoinStrategy;
    let c = ctx(&[1]);
    let table = InnerSource::base_table(TableId::new(2), "t2");
    assert!(nl.feasible(&table, &[], &c));

    // Correlated but reopenable: rescanned per outer row.
    let reopen = InnerSource::virtual_source(TableId::new(2), "vt", true, true);
    assert!(nl.feasible(&reopen, &[], &c));

    // Uncorrelated single-shot source: materialized once.
    let once = InnerSource::virtual_source(TableId::new(2), "vt", false, false);
    assert!(nl.feasible(&once, &[], &c));

    let stuck = InnerSource::virtual_source(TableId::new(2), "vt", true, false);
    assert!(!nl.feasible(&stuck, &[], &c));
}

#[test]
fn test_nested_loop_cost_multiplies_by_outer_rows() {
    let inner = InnerSource::base_table(TableId::new(2), "t2");
    let path = AccessPath::full_scan(TableId::new(2), 10, 100.0);
    let mut out = path.cost;
    NestedLoopJoinStrategy
        .estimate_cost(&inner, &[], &path, &outer_rows(5.0), &ctx(&[1]), &mut out)
        .unwrap();
    assert_eq!(out, CostEstimate::new(50.0, 500.0, 100.0));
}

#[test]
fn test_nested_loop_cost_requires_estimates() {
    let inner = InnerSource::base_table(TableId::new(2), "t2");
    let path = AccessPath::full_scan(TableId::new(2), 10, 100.0);

    let mut out = path.cost;
    let err = NestedLoopJoinStrategy
        .estimate_cost(
            &inner,
            &[],
            &path,
            &CostEstimate::uninitialized(),
            &ctx(&[1]),
            &mut out,
        )
        .unwrap_err();
    assert!(err.is_internal());

    let mut unset = CostEstimate::uninitialized();
    assert!(NestedLoopJoinStrategy
        .estimate_cost(&inner, &[], &path, &outer_rows(1.0), &ctx(&[1]), &mut unset)
        .is_err());
}

#[test]
fn test_nested_loop_cost_saturates_to_infinity() {
    let inner = InnerSource::base_table(TableId::new(2), "t2");
    let path = AccessPath::full_scan(TableId::new(2), 10, 100.0);
    let mut out = path.cost;
    NestedLoopJoinStrategy
        .estimate_cost(&inner, &[], &path, &outer_rows(f64::MAX), &ctx(&[1]), &mut out)
        .unwrap();
    assert!(out.cost.is_infinite());
    assert!(out.row_count.is_infinite());
    assert!((out.single_scan_row_count - 100.0).abs() < f64::EPSILON);
}

#[test]
fn test_nested_loop_empty_inner_under_unbounded_outer() {
    let inner = InnerSource::base_table(TableId::new(2), "t2");
    let path = AccessPath::full_scan(TableId::new(2), 10, 0.0);
    let unbounded = CostEstimate::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let (kind, est) = best_join_strategy(&inner, &[local(2, 1)], &path, &unbounded, &ctx(&[1]))
        .unwrap()
        .unwrap();
    assert_eq!(kind, JoinStrategyKind::NestedLoop);
    assert!(est.cost.is_infinite());
    assert!(est.row_count.abs() < f64::EPSILON);
    est.validate().unwrap();
}

#[test]
fn test_nested_loop_puts_everything_in_base() {
    let inner = InnerSource::base_table(TableId::new(2), "t2");
    let mut base = Vec::new();
    let mut non_base = Vec::new();
    NestedLoopJoinStrategy
        .classify_predicates(
            vec![equijoin(1, 2), local(2, 3), local(1, 4)],
            &inner,
            &mut base,
            &mut non_base,
        )
        .unwrap();
    assert_eq!(base.len(), 3);
    assert!(non_base.is_empty());
}

#[test]
fn test_best_strategy_tie_goes_to_nested_loop() {
    let inner = InnerSource::base_table(TableId::new(2), "t2");
    let path = AccessPath::full_scan(TableId::new(2), 10, 100.0);
    let preds = vec![equijoin(1, 2)];
    let (kind, est) = best_join_strategy(&inner, &preds, &path, &outer_rows(1.0), &ctx(&[1]))
        .unwrap()
        .unwrap();
    assert_eq!(kind, JoinStrategyKind::NestedLoop);
    assert_eq!(est, path.cost);
}

#[test]
fn test_best_strategy_prefers_hash_for_many_outer_rows() {
    let inner = InnerSource::base_table(TableId::new(2), "t2");
    let path = AccessPath::full_scan(TableId::new(2), 10, 100.0);
    let preds = vec![equijoin(1, 2)];
    let (kind, _) = best_join_strategy(&inner, &preds, &path, &outer_rows(50.0), &ctx(&[1]))
        .unwrap()
        .unwrap();
    assert_eq!(kind, JoinStrategyKind::Hash);

    // Without an equijoin only nested loop is left.
    let (kind, est) =
        best_join_strategy(&inner, &[local(2, 1)], &path, &outer_rows(50.0), &ctx(&[1]))
            .unwrap()
            .unwrap();
    assert_eq!(kind, JoinStrategyKind::NestedLoop);
    assert!((est.cost - 500.0).abs() < 1e-9);
}

#[test]
fn test_best_strategy_none_when_nothing_feasible() {
    let stuck = InnerSource::virtual_source(TableId::new(2), "vt", true, false);
    let path = AccessPath::full_scan(TableId::new(2), 1, 1.0);
    let best =
        best_join_strategy(&stuck, &[equijoin(1, 2)], &path, &outer_rows(2.0), &ctx(&[1]))
            .unwrap();
    assert!(best.is_none());
}

fn cost_component() -> impl Strategy<Value = f64> {
    prop_oneof![4 => 0.0_f64..1e12, 1 => Just(f64::INFINITY)]
}

fn estimate() -> impl Strategy<Value = CostEstimate> {
    (cost_component(), cost_component(), cost_component())
        .prop_map(|(cost, rows, single)| CostEstimate::new(cost, rows, single))
}

proptest! {
    #[test]
    fn prop_compare_is_antisymmetric(a in estimate(), b in estimate()) {
        prop_assert_eq!(a.ordering(&b), b.ordering(&a).reverse());
        prop_assert_eq!(a.ordering(&a), std::cmp::Ordering::Equal);
    }

    #[test]
    fn prop_nested_loop_matches_multiply(
        pages in 1_u64..10_000,
        rows in 0.0_f64..1e6,
        outer in 0.0_f64..1e6,
    ) {
        let inner = InnerSource::base_table(TableId::new(2), "t2");
        let path = AccessPath::full_scan(TableId::new(2), pages, rows);
        let mut out = path.cost;
        NestedLoopJoinStrategy
            .estimate_cost(&inner, &[], &path, &outer_rows(outer), &ctx(&[1]), &mut out)
            .unwrap();
        prop_assert_eq!(out, path.cost.multiply(outer));
        prop_assert!(out.validate().is_ok());
    }

    #[test]
    fn prop_classification_keeps_every_predicate(
        tables in proptest::collection::vec(1_u32..4, 0..12),
        kind_idx in 0_usize..2,
    ) {
        let preds: Vec<Predicate> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| if i % 3 == 0 { equijoin(*t, 2) } else { local(*t, 0) })
            .collect();
        let total = preds.len();
        let inner = InnerSource::base_table(TableId::new(2), "t2");
        let strategy = JoinStrategyKind::ALL[kind_idx].strategy();
        let mut base = Vec::new();
        let mut non_base = Vec::new();
        strategy
            .classify_predicates(preds, &inner, &mut base, &mut non_base)
            .unwrap();
        prop_assert_eq!(base.len() + non_base.len(), total);
    }
}

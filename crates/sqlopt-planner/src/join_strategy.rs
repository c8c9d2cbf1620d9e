//! Join strategies: how an inner table is combined with the outer rows of
//! the current join prefix.
//!
//! Strategies are stateless unit structs. Everything a strategy needs for
//! one decision (the inner source, the predicates in play, the outer cost
//! and the search context) is passed in, so one `&'static` instance per
//! kind serves every compilation.

use std::fmt;

use sqlopt_error::{CompileError, Result};
use sqlopt_expr::Predicate;
use sqlopt_types::{TableId, TableSet};

use crate::access_path::{AccessPath, ScanOptions};
use crate::config::SearchContext;
use crate::cost::CostEstimate;

/// Bookkeeping bytes a hash table spends per entry on top of the row.
pub const HASH_ENTRY_OVERHEAD: f64 = 32.0;

/// The inner side of a candidate join step.
#[derive(Debug, Clone, PartialEq)]
pub struct InnerSource {
    pub table_id: TableId,
    pub name: String,
    /// The source can be read once into memory and replayed
    /// (its rows do not depend on the outer row).
    pub is_materializable: bool,
    /// The source can be opened again for every outer row.
    pub supports_multiple_instantiations: bool,
    /// Estimated bytes per row once materialized.
    pub per_row_usage: f64,
    /// Row capacity fixed by the user, overriding the memory-derived one.
    pub user_max_capacity: Option<u64>,
}

impl InnerSource {
    /// A stored base table: uncorrelated and re-openable.
    #[must_use]
    pub fn base_table(table_id: TableId, name: impl Into<String>) -> Self {
        Self {
            table_id,
            name: name.into(),
            is_materializable: true,
            supports_multiple_instantiations: true,
            per_row_usage: 0.0,
            user_max_capacity: None,
        }
    }

    /// A virtual (table-function) source. A `correlated` source takes
    /// parameters from the outer row and cannot be materialized.
    #[must_use]
    pub fn virtual_source(
        table_id: TableId,
        name: impl Into<String>,
        correlated: bool,
        reopenable: bool,
    ) -> Self {
        Self {
            table_id,
            name: name.into(),
            is_materializable: !correlated,
            supports_multiple_instantiations: reopenable,
            per_row_usage: 0.0,
            user_max_capacity: None,
        }
    }

    #[must_use]
    pub fn with_per_row_usage(mut self, bytes: f64) -> Self {
        self.per_row_usage = bytes;
        self
    }

    #[must_use]
    pub fn with_user_max_capacity(mut self, rows: u64) -> Self {
        self.user_max_capacity = Some(rows);
        self
    }
}

/// An algorithm family for joining the inner source to the outer prefix.
pub trait JoinStrategy: fmt::Debug + Send + Sync {
    /// Upper-case strategy name, as users spell it in optimizer overrides.
    fn name(&self) -> &'static str;

    /// Whether the strategy can legally join `inner` at this step.
    fn feasible(&self, inner: &InnerSource, predicates: &[Predicate], ctx: &SearchContext)
        -> bool;

    /// Apply the strategy's cost model to `out`, which arrives holding the
    /// cost of one scan of `inner` through `access_path`.
    ///
    /// # Errors
    ///
    /// [`CompileError::InvariantViolation`] if `out` or `outer_cost` was
    /// never estimated, or if the result is not a valid estimate.
    fn estimate_cost(
        &self,
        inner: &InnerSource,
        predicates: &[Predicate],
        access_path: &AccessPath,
        outer_cost: &CostEstimate,
        ctx: &SearchContext,
        out: &mut CostEstimate,
    ) -> Result<()>;

    /// Split `all` into predicates evaluated by the scan of `inner`
    /// (`base`) and the ones requalified afterwards (`non_base`).
    ///
    /// # Errors
    ///
    /// [`CompileError::InvariantViolation`] if `base` is not empty.
    fn classify_predicates(
        &self,
        all: Vec<Predicate>,
        inner: &InnerSource,
        base: &mut Vec<Predicate>,
        non_base: &mut Vec<Predicate>,
    ) -> Result<()>;

    /// Most rows the strategy will hold in memory for `inner`;
    /// `u64::MAX` when it builds no in-memory structure.
    fn max_capacity(&self, inner: &InnerSource, ctx: &SearchContext) -> u64;

    /// Runtime operator that scans the inner source.
    fn scan_entry_point_name(&self, options: ScanOptions) -> &'static str;

    /// Runtime operator for an inner join.
    fn join_entry_point_name(&self) -> &'static str;

    /// Runtime operator for a left outer join.
    fn half_outer_join_entry_point_name(&self) -> &'static str;

    /// Whether the inner rows are materialized before probing.
    fn does_materialization(&self) -> bool;
}

fn check_estimated(what: &str, estimate: &CostEstimate) -> Result<()> {
    if estimate.is_uninitialized() {
        return Err(CompileError::invariant(format!("{what} was never estimated")));
    }
    Ok(())
}

fn check_base_empty(base: &[Predicate]) -> Result<()> {
    if !base.is_empty() {
        return Err(CompileError::invariant(format!(
            "base predicate list must start empty, found {} predicates",
            base.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Nested loop
// ---------------------------------------------------------------------------

/// Rescan the inner source once per outer row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NestedLoopJoinStrategy;

impl JoinStrategy for NestedLoopJoinStrategy {
    fn name(&self) -> &'static str {
        "NESTEDLOOP"
    }

    fn feasible(
        &self,
        inner: &InnerSource,
        _predicates: &[Predicate],
        _ctx: &SearchContext,
    ) -> bool {
        // A correlated source that cannot be reopened cannot be rescanned.
        inner.is_materializable || inner.supports_multiple_instantiations
    }

    fn estimate_cost(
        &self,
        inner: &InnerSource,
        _predicates: &[Predicate],
        _access_path: &AccessPath,
        outer_cost: &CostEstimate,
        _ctx: &SearchContext,
        out: &mut CostEstimate,
    ) -> Result<()> {
        check_estimated("inner access cost", out)?;
        check_estimated("outer cost", outer_cost)?;
        *out = out.multiply(outer_cost.row_count);
        tracing::trace!(
            target: "sqlopt.planner",
            inner = %inner.name,
            outer_rows = outer_cost.row_count,
            estimate = %out,
            "nested loop cost"
        );
        out.validate()
    }

    fn classify_predicates(
        &self,
        all: Vec<Predicate>,
        _inner: &InnerSource,
        base: &mut Vec<Predicate>,
        _non_base: &mut Vec<Predicate>,
    ) -> Result<()> {
        check_base_empty(base)?;
        base.extend(all);
        Ok(())
    }

    fn max_capacity(&self, _inner: &InnerSource, _ctx: &SearchContext) -> u64 {
        u64::MAX
    }

    fn scan_entry_point_name(&self, options: ScanOptions) -> &'static str {
        if options.multi_probe {
            "getMultiProbeTableScanResultSet"
        } else if options.bulk_fetch {
            "getBulkTableScanResultSet"
        } else {
            "getTableScanResultSet"
        }
    }

    fn join_entry_point_name(&self) -> &'static str {
        "getNestedLoopJoinResultSet"
    }

    fn half_outer_join_entry_point_name(&self) -> &'static str {
        "getNestedLoopLeftOuterJoinResultSet"
    }

    fn does_materialization(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// Load the inner source into an in-memory hash table keyed on equijoin
/// columns, then probe it once per outer row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashJoinStrategy;

impl HashJoinStrategy {
    /// Whether some predicate equates a column of `inner` with a column of
    /// a table already in the outer prefix.
    fn has_outer_equijoin(inner: TableId, predicates: &[Predicate], outer: &TableSet) -> bool {
        predicates.iter().any(|p| {
            p.equijoin_columns().is_some_and(|(l, r)| {
                (l.table_id == inner && outer.contains(r.table_id))
                    || (r.table_id == inner && outer.contains(l.table_id))
            })
        })
    }
}

impl JoinStrategy for HashJoinStrategy {
    fn name(&self) -> &'static str {
        "HASH"
    }

    fn feasible(&self, inner: &InnerSource, predicates: &[Predicate], ctx: &SearchContext) -> bool {
        if !ctx.config.hash_join_enabled || !inner.is_materializable {
            return false;
        }
        let keyed = Self::has_outer_equijoin(inner.table_id, predicates, &ctx.outer_tables);
        if !keyed {
            tracing::trace!(
                target: "sqlopt.planner",
                inner = %inner.name,
                "hash join infeasible: no equijoin with outer tables"
            );
        }
        keyed
    }

    fn estimate_cost(
        &self,
        _inner: &InnerSource,
        _predicates: &[Predicate],
        _access_path: &AccessPath,
        outer_cost: &CostEstimate,
        _ctx: &SearchContext,
        out: &mut CostEstimate,
    ) -> Result<()> {
        // The inner is read once; the access cost already is the join cost.
        check_estimated("inner access cost", out)?;
        check_estimated("outer cost", outer_cost)?;
        out.validate()
    }

    fn classify_predicates(
        &self,
        all: Vec<Predicate>,
        inner: &InnerSource,
        base: &mut Vec<Predicate>,
        non_base: &mut Vec<Predicate>,
    ) -> Result<()> {
        check_base_empty(base)?;
        let inner_only = TableSet::of(&[inner.table_id]);
        for predicate in all {
            if predicate.references_only(&inner_only) {
                base.push(predicate);
            } else {
                non_base.push(predicate);
            }
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn max_capacity(&self, inner: &InnerSource, ctx: &SearchContext) -> u64 {
        if let Some(rows) = inner.user_max_capacity {
            return rows;
        }
        let max_memory = ctx.config.max_memory_per_table;
        let per_row = inner.per_row_usage.max(0.0) + HASH_ENTRY_OVERHEAD;
        (max_memory as f64 / per_row) as u64
    }

    fn scan_entry_point_name(&self, _options: ScanOptions) -> &'static str {
        "getHashScanResultSet"
    }

    fn join_entry_point_name(&self) -> &'static str {
        "getHashJoinResultSet"
    }

    fn half_outer_join_entry_point_name(&self) -> &'static str {
        "getHashLeftOuterJoinResultSet"
    }

    fn does_materialization(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

static NESTED_LOOP: NestedLoopJoinStrategy = NestedLoopJoinStrategy;
static HASH: HashJoinStrategy = HashJoinStrategy;

/// The join strategies known to the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinStrategyKind {
    NestedLoop,
    Hash,
}

impl JoinStrategyKind {
    /// Every strategy, in the order the optimizer tries them.
    pub const ALL: [Self; 2] = [Self::NestedLoop, Self::Hash];

    #[must_use]
    pub fn strategy(self) -> &'static dyn JoinStrategy {
        match self {
            Self::NestedLoop => &NESTED_LOOP,
            Self::Hash => &HASH,
        }
    }

    /// Look up a strategy by name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.strategy().name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for JoinStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strategy().name())
    }
}

/// The cheapest feasible strategy for joining `inner` at this step, with
/// its estimate. Ties go to the strategy listed first in
/// [`JoinStrategyKind::ALL`]. `None` if no strategy is feasible.
///
/// # Errors
///
/// Propagates cost estimation errors.
pub fn best_join_strategy(
    inner: &InnerSource,
    predicates: &[Predicate],
    access_path: &AccessPath,
    outer_cost: &CostEstimate,
    ctx: &SearchContext,
) -> Result<Option<(JoinStrategyKind, CostEstimate)>> {
    let span = tracing::debug_span!(
        target: "sqlopt.planner",
        "cost_estimate",
        inner = %inner.name,
        outer_tables = %ctx.outer_tables
    );
    let _guard = span.enter();

    let mut best: Option<(JoinStrategyKind, CostEstimate)> = None;
    for kind in JoinStrategyKind::ALL {
        let strategy = kind.strategy();
        if !strategy.feasible(inner, predicates, ctx) {
            continue;
        }
        let mut estimate = access_path.cost;
        strategy.estimate_cost(inner, predicates, access_path, outer_cost, ctx, &mut estimate)?;
        tracing::debug!(target: "sqlopt.planner", strategy = %kind, %estimate, "candidate");
        let better = best
            .as_ref()
            .map_or(true, |(_, current)| estimate.ordering(current).is_lt());
        if better {
            best = Some((kind, estimate));
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use sqlopt_expr::{ComparisonOp, Expr};
    use sqlopt_types::{ColumnId, TypeDescriptor, TypeId};

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

    fn local(table: u32) -> Predicate {
        Predicate::new(Expr::comparison(ComparisonOp::Gt, col(table, 2), Expr::constant(5)))
    }

    fn ctx_with_outer(tables: &[u32]) -> SearchContext {
        let ids: Vec<TableId> = tables.iter().copied().map(TableId::new).collect();
        SearchContext::new(PlannerConfig::default(), TableSet::of(&ids))
    }

    #[test]
    fn test_names_and_entry_points() {
        let nl = NestedLoopJoinStrategy;
        assert_eq!(nl.name(), "NESTEDLOOP");
        assert_eq!(nl.join_entry_point_name(), "getNestedLoopJoinResultSet");
        assert_eq!(
            nl.half_outer_join_entry_point_name(),
            "getNestedLoopLeftOuterJoinResultSet"
        );
        assert_eq!(
            nl.scan_entry_point_name(ScanOptions::default()),
            "getTableScanResultSet"
        );
        let bulk = ScanOptions {
            bulk_fetch: true,
            multi_probe: false,
        };
        assert_eq!(nl.scan_entry_point_name(bulk), "getBulkTableScanResultSet");
        let probe = ScanOptions {
            bulk_fetch: true,
            multi_probe: true,
        };
        assert_eq!(nl.scan_entry_point_name(probe), "getMultiProbeTableScanResultSet");
        assert!(!nl.does_materialization());

        let hash = HashJoinStrategy;
        assert_eq!(hash.name(), "HASH");
        assert_eq!(hash.scan_entry_point_name(probe), "getHashScanResultSet");
        assert_eq!(hash.join_entry_point_name(), "getHashJoinResultSet");
        assert!(hash.does_materialization());
    }

    #[test]
    fn test_registry_lookup() {
        assert_eq!(
            JoinStrategyKind::from_name("nestedloop"),
            Some(JoinStrategyKind::NestedLoop)
        );
        assert_eq!(JoinStrategyKind::from_name("Hash"), Some(JoinStrategyKind::Hash));
        assert_eq!(JoinStrategyKind::from_name("merge"), None);
        assert_eq!(JoinStrategyKind::Hash.to_string(), "HASH");
    }

    #[test]
    fn test_hash_feasibility_needs_outer_equijoin() {
        let inner = InnerSource::base_table(TableId::new(2), "t2");
        let hash = HashJoinStrategy;
        let preds = vec![equijoin(1, 2), local(2)];
        assert!(hash.feasible(&inner, &preds, &ctx_with_outer(&[1])));
        // The other side of the equijoin is not in the prefix yet.
        assert!(!hash.feasible(&inner, &preds, &ctx_with_outer(&[3])));
        assert!(!hash.feasible(&inner, &[local(2)], &ctx_with_outer(&[1])));

        let mut disabled = ctx_with_outer(&[1]);
        disabled.config.hash_join_enabled = false;
        assert!(!hash.feasible(&inner, &preds, &disabled));

        let correlated = InnerSource::virtual_source(TableId::new(2), "vt", true, true);
        assert!(!hash.feasible(&correlated, &preds, &ctx_with_outer(&[1])));
    }

    #[test]
    fn test_hash_max_capacity() {
        let ctx = ctx_with_outer(&[1]);
        let hash = HashJoinStrategy;
        let inner = InnerSource::base_table(TableId::new(2), "t2").with_per_row_usage(96.0);
        assert_eq!(hash.max_capacity(&inner, &ctx), 1024 * 1024 / 128);
        let pinned = inner.with_user_max_capacity(10);
        assert_eq!(hash.max_capacity(&pinned, &ctx), 10);
        assert_eq!(NestedLoopJoinStrategy.max_capacity(&pinned, &ctx), u64::MAX);

        // Entry overhead alone bounds the capacity.
        let bare = InnerSource::base_table(TableId::new(2), "t2").with_per_row_usage(-64.0);
        assert_eq!(hash.max_capacity(&bare, &ctx), 1024 * 1024 / 32);
    }

    #[test]
    fn test_hash_classify_splits_on_inner_only() {
        let inner = InnerSource::base_table(TableId::new(2), "t2");
        let mut base = Vec::new();
        let mut non_base = Vec::new();
        HashJoinStrategy
            .classify_predicates(
                vec![equijoin(1, 2), local(2), local(1)],
                &inner,
                &mut base,
                &mut non_base,
            )
            .unwrap();
        assert_eq!(base.len(), 1);
        assert!(base[0].references_only(&TableSet::of(&[TableId::new(2)])));
        assert_eq!(non_base.len(), 2);
    }

    #[test]
    fn test_classify_rejects_non_empty_base() {
        let inner = InnerSource::base_table(TableId::new(2), "t2");
        let mut base = vec![local(2)];
        let mut non_base = Vec::new();
        let err = NestedLoopJoinStrategy
            .classify_predicates(vec![local(2)], &inner, &mut base, &mut non_base)
            .unwrap_err();
        assert!(err.is_internal());
    }
}

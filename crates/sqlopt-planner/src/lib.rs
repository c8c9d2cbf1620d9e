//! Bookkeeping for join-order search.
//!
//! - [`CostEstimate`]: cost and cardinality arithmetic with an
//!   infinity-aware comparison.
//! - [`RowOrdering`]: which columns the current join prefix is known to be
//!   sorted on, with explicit save ([`RowOrdering::copy`]) and rollback
//!   ([`RowOrdering::remove`]) for the backtracking search.
//! - [`JoinStrategy`]: feasibility, cost and predicate placement for one
//!   join algorithm, with nested-loop and hash implementations.
//!
//! The search loop itself lives with the caller.

pub mod access_path;
pub mod config;
pub mod cost;
pub mod join_strategy;
pub mod ordering;

pub use access_path::{page_cost, AccessPath, AccessPathKind, ScanOptions};
pub use config::{PlannerConfig, SearchContext};
pub use cost::{CostEstimate, UNINITIALIZED};
pub use join_strategy::{
    best_join_strategy, HashJoinStrategy, InnerSource, JoinStrategy, JoinStrategyKind,
    NestedLoopJoinStrategy, HASH_ENTRY_OVERHEAD,
};
pub use ordering::{ColumnOrdering, RowOrdering, SortDirection, DEFAULT_MAX_ORDERING_COLUMNS};

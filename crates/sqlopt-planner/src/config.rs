//! Planner configuration.

use serde::{Deserialize, Serialize};
use sqlopt_types::TableSet;

use crate::ordering::{RowOrdering, DEFAULT_MAX_ORDERING_COLUMNS};

/// Knobs consulted by join strategies and the ordering tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Memory a hash join may spend on its in-memory table, in bytes.
    pub max_memory_per_table: u64,
    /// Cap on ordered columns tracked per join prefix.
    pub max_ordering_columns: usize,
    /// Whether hash joins are considered at all.
    pub hash_join_enabled: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_memory_per_table: 1024 * 1024,
            max_ordering_columns: DEFAULT_MAX_ORDERING_COLUMNS,
            hash_join_enabled: true,
        }
    }
}

impl PlannerConfig {
    /// An empty ordering tracker honoring `max_ordering_columns`.
    #[must_use]
    pub const fn row_ordering(&self) -> RowOrdering {
        RowOrdering::with_max_columns(self.max_ordering_columns)
    }
}

/// Per-step state the join-order search hands to join strategies.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    pub config: PlannerConfig,
    /// Tables already placed in the join prefix, outside the inner table.
    pub outer_tables: TableSet,
}

impl SearchContext {
    #[must_use]
    pub fn new(config: PlannerConfig, outer_tables: TableSet) -> Self {
        Self {
            config,
            outer_tables,
        }
    }
}

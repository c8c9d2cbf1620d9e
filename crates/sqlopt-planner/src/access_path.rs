//! Single-table access paths and their base cost.
//!
//! A join strategy starts from the cost of reading the inner table once
//! through its chosen access path and scales it by its own cost model.

use serde::{Deserialize, Serialize};
use sqlopt_types::TableId;

use crate::cost::CostEstimate;

/// How a table's rows are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccessPathKind {
    /// Sequential scan of all table pages.
    FullTableScan,
    /// Index range scan (`col > expr`, an expanded BETWEEN).
    IndexScanRange { selectivity: f64 },
    /// Index equality scan (`col = expr`).
    IndexScanEquality,
    /// Covering index scan (all needed columns are in the index).
    CoveringIndexScan { selectivity: f64 },
    /// One equality probe per value of an IN list.
    MultiProbeIndexScan { probe_count: usize },
}

/// Cost in page reads of reading a table once through `kind`.
///
/// - Full table scan: `table_pages`
/// - Range: `log2(index_pages) + selectivity * (index_pages + table_pages)`
/// - Equality: `log2(index_pages) + log2(table_pages)`
/// - Covering: `log2(index_pages) + selectivity * index_pages`
/// - Multi-probe: one equality lookup per probe
#[must_use]
pub fn page_cost(kind: &AccessPathKind, table_pages: u64, index_pages: u64) -> f64 {
    let tp = table_pages.max(1) as f64;
    let ip = index_pages.max(1) as f64;

    match kind {
        AccessPathKind::FullTableScan => tp,
        AccessPathKind::IndexScanRange { selectivity } => {
            ip.log2() + selectivity * ip + selectivity * tp
        }
        AccessPathKind::IndexScanEquality => ip.log2() + tp.log2(),
        AccessPathKind::CoveringIndexScan { selectivity } => ip.log2() + selectivity * ip,
        AccessPathKind::MultiProbeIndexScan { probe_count } => {
            (*probe_count).max(1) as f64 * (ip.log2() + tp.log2())
        }
    }
}

/// Runtime scan flavor, used to pick the scan entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScanOptions {
    /// Fetch rows from the store in batches.
    pub bulk_fetch: bool,
    /// Drive the scan with IN-list probes.
    pub multi_probe: bool,
}

/// The access path chosen for one table, with its single-scan cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPath {
    pub table_id: TableId,
    pub kind: AccessPathKind,
    /// Index used (None for a full table scan).
    pub index: Option<String>,
    pub bulk_fetch: bool,
    /// Cost of one scan through this path.
    pub cost: CostEstimate,
}

impl AccessPath {
    /// Build a path and estimate its cost from page counts and the expected
    /// number of rows returned by one scan.
    #[must_use]
    pub fn new(
        table_id: TableId,
        kind: AccessPathKind,
        index: Option<String>,
        table_pages: u64,
        index_pages: u64,
        rows: f64,
    ) -> Self {
        let mut cost = CostEstimate::zero();
        cost.cost = page_cost(&kind, table_pages, index_pages);
        cost.set_estimated_row_count(rows);
        Self {
            table_id,
            kind,
            index,
            bulk_fetch: false,
            cost,
        }
    }

    /// A full scan of `table_pages` pages yielding `rows` rows.
    #[must_use]
    pub fn full_scan(table_id: TableId, table_pages: u64, rows: f64) -> Self {
        Self::new(table_id, AccessPathKind::FullTableScan, None, table_pages, 0, rows)
    }

    #[must_use]
    pub fn with_bulk_fetch(mut self, bulk_fetch: bool) -> Self {
        self.bulk_fetch = bulk_fetch;
        self
    }

    #[must_use]
    pub const fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            bulk_fetch: self.bulk_fetch,
            multi_probe: matches!(self.kind, AccessPathKind::MultiProbeIndexScan { .. }),
        }
    }
}

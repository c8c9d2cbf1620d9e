//! Cost estimates for candidate plans.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlopt_error::{CompileError, Result};

/// Sentinel stored in every field of a never-estimated [`CostEstimate`].
pub const UNINITIALIZED: f64 = f64::MAX;

/// Estimated cost and cardinality of a (partial) plan.
///
/// `single_scan_row_count` is the row count of one scan of the inner table,
/// as opposed to `row_count`, which accumulates over the outer rows of a
/// join. Arithmetic leaves it alone; callers that need it after combining
/// estimates set it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub cost: f64,
    pub row_count: f64,
    pub single_scan_row_count: f64,
}

impl Default for CostEstimate {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl CostEstimate {
    #[must_use]
    pub const fn new(cost: f64, row_count: f64, single_scan_row_count: f64) -> Self {
        Self {
            cost,
            row_count,
            single_scan_row_count,
        }
    }

    /// An estimate that has not been computed yet.
    #[must_use]
    pub const fn uninitialized() -> Self {
        Self::new(UNINITIALIZED, UNINITIALIZED, UNINITIALIZED)
    }

    /// Zero cost, zero rows.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[allow(clippy::float_cmp)]
    #[must_use]
    pub fn is_uninitialized(&self) -> bool {
        self.cost == UNINITIALIZED
            && self.row_count == UNINITIALIZED
            && self.single_scan_row_count == UNINITIALIZED
    }

    pub fn set_cost(&mut self, cost: f64, row_count: f64, single_scan_row_count: f64) {
        self.cost = cost;
        self.row_count = row_count;
        self.single_scan_row_count = single_scan_row_count;
    }

    pub fn set_single_scan_row_count(&mut self, count: f64) {
        self.single_scan_row_count = count;
    }

    /// Record a concrete scan cardinality: one physical scan, so the total
    /// and single-scan row counts coincide.
    pub fn set_estimated_row_count(&mut self, count: f64) {
        self.row_count = count;
        self.single_scan_row_count = count;
    }

    /// `row_count` as a whole number of rows (rounded, saturating).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn estimated_row_count(&self) -> u64 {
        self.row_count.round() as u64
    }

    /// Signed comparison; only the sign is meaningful.
    ///
    /// Costs are compared first. Once both costs saturate to +∞ the row
    /// counts decide, then the single-scan row counts. Two estimates that
    /// are infinite everywhere compare equal.
    #[allow(clippy::float_cmp)]
    #[must_use]
    pub fn compare(&self, other: &Self) -> f64 {
        let both_inf = |a: f64, b: f64| a == f64::INFINITY && b == f64::INFINITY;
        if !both_inf(self.cost, other.cost) {
            self.cost - other.cost
        } else if !both_inf(self.row_count, other.row_count) {
            self.row_count - other.row_count
        } else if !both_inf(self.single_scan_row_count, other.single_scan_row_count) {
            self.single_scan_row_count - other.single_scan_row_count
        } else {
            0.0
        }
    }

    /// [`compare`](Self::compare) as an [`Ordering`]; NaN counts as equal.
    #[must_use]
    pub fn ordering(&self, other: &Self) -> Ordering {
        self.compare(other)
            .partial_cmp(&0.0)
            .unwrap_or(Ordering::Equal)
    }

    /// Pointwise sum of cost and row count.
    #[must_use]
    pub fn add(&self, addend: &Self) -> Self {
        Self::new(
            self.cost + addend.cost,
            self.row_count + addend.row_count,
            self.single_scan_row_count,
        )
    }

    /// Cost and row count scaled by `multiplicand`.
    ///
    /// Zero times infinity is zero: an empty inner repeated unboundedly
    /// still costs and yields nothing.
    #[must_use]
    pub fn multiply(&self, multiplicand: f64) -> Self {
        Self::new(
            scaled(self.cost, multiplicand),
            scaled(self.row_count, multiplicand),
            self.single_scan_row_count,
        )
    }

    /// Cost and row count divided by `divisor`.
    #[must_use]
    pub fn divide(&self, divisor: f64) -> Self {
        Self::new(
            self.cost / divisor,
            self.row_count / divisor,
            self.single_scan_row_count,
        )
    }

    /// Check that every field is non-negative (or the estimate is
    /// uninitialized).
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvariantViolation`] for a negative or NaN
    /// field.
    pub fn validate(&self) -> Result<()> {
        let bad = |v: f64| v.is_nan() || v < 0.0;
        if bad(self.cost) || bad(self.row_count) || bad(self.single_scan_row_count) {
            tracing::error!(target: "sqlopt.planner", estimate = %self, "invalid cost estimate");
            return Err(CompileError::invariant(format!(
                "invalid cost estimate: {self}"
            )));
        }
        Ok(())
    }
}

#[allow(clippy::float_cmp)]
fn scaled(value: f64, factor: f64) -> f64 {
    if value == 0.0 || factor == 0.0 {
        0.0
    } else {
        value * factor
    }
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_uninitialized() {
            return f.write_str("cost=? rows=? single_scan_rows=?");
        }
        write!(
            f,
            "cost={:.2} rows={:.0} single_scan_rows={:.0}",
            self.cost, self.row_count, self.single_scan_row_count
        )
    }
}

//! Normalizer configuration.

use serde::{Deserialize, Serialize};

/// Knobs for [`crate::normalize_where`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Run the canonical-form and NOT-elimination checks after rewriting.
    pub verify_canonical_form: bool,
    /// Replace `c = a OR c = b ...` chains with `c IN (a, b, ...)`.
    pub convert_or_to_in: bool,
    /// Expand `BETWEEN` into a pair of range comparisons. Applies to
    /// positive BETWEEN only: NOT elimination always splits a negated one
    /// into `t < low OR t > high`.
    pub expand_between: bool,
    /// Reject trees deeper than this.
    pub max_expression_depth: usize,
    /// Reject bound IN lists longer than this. OR chains that would exceed
    /// it are left as ORs.
    pub max_in_list_values: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            verify_canonical_form: cfg!(debug_assertions),
            convert_or_to_in: true,
            expand_between: true,
            max_expression_depth: 1000,
            max_in_list_values: usize::from(u16::MAX),
        }
    }
}

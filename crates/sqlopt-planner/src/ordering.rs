//! Row-ordering knowledge accumulated during join-order search.
//!
//! The search is a depth-first enumeration that mutates one shared
//! [`RowOrdering`] along the current join prefix. Before exploring a branch
//! the caller saves the tracker with [`RowOrdering::copy`]; on backtrack
//! it either restores the saved copy or calls [`RowOrdering::remove`] for
//! the table being popped.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlopt_error::{CompileError, Result};
use sqlopt_types::{ColumnId, TableId, TableSet};

/// Sort direction of an ordering group or of a query's requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
    /// Either direction will do (query side), or direction is irrelevant
    /// (always-ordered columns).
    DontCare,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::DontCare => "ANY",
        })
    }
}

/// Columns that share one sort position, all in one direction.
///
/// Several columns share a position when they are known equal, e.g. the
/// outer and inner columns of an equijoin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOrdering {
    direction: SortDirection,
    columns: Vec<(TableId, ColumnId)>,
}

impl ColumnOrdering {
    #[must_use]
    pub const fn new(direction: SortDirection) -> Self {
        Self {
            direction,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub const fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Whether the group satisfies a requirement for `(table, column)` in
    /// `direction`. `DontCare` matches either group direction.
    #[must_use]
    pub fn ordered(&self, direction: SortDirection, table: TableId, column: ColumnId) -> bool {
        if direction != SortDirection::DontCare && direction != self.direction {
            return false;
        }
        self.contains(table, column)
    }

    #[must_use]
    pub fn contains(&self, table: TableId, column: ColumnId) -> bool {
        self.columns.contains(&(table, column))
    }

    pub fn add_column(&mut self, table: TableId, column: ColumnId) {
        self.columns.push((table, column));
    }

    /// Drop every column of `table`.
    pub fn remove_columns(&mut self, table: TableId) {
        self.columns.retain(|(t, _)| *t != table);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn has_table(&self, table: TableId) -> bool {
        self.columns.iter().any(|(t, _)| *t == table)
    }

    /// Whether some column belongs to a table other than `table`.
    #[must_use]
    pub fn has_any_other_table(&self, table: TableId) -> bool {
        self.columns.iter().any(|(t, _)| *t != table)
    }

    pub fn columns(&self) -> impl Iterator<Item = (TableId, ColumnId)> + '_ {
        self.columns.iter().copied()
    }
}

impl fmt::Display for ColumnOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.direction)?;
        for (i, (t, c)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{t}.{c}")?;
        }
        f.write_str(")")
    }
}

/// Default cap on the number of ordered columns a tracker accepts.
pub const DEFAULT_MAX_ORDERING_COLUMNS: usize = 1012;

/// What is known about the order of rows produced by the current join
/// prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOrdering {
    ordering: Vec<ColumnOrdering>,
    columns_always_ordered: ColumnOrdering,
    always_ordered_tables: TableSet,
    unordered_tables: TableSet,
    max_columns: usize,
}

impl Default for RowOrdering {
    fn default() -> Self {
        Self::new()
    }
}

impl RowOrdering {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_columns(DEFAULT_MAX_ORDERING_COLUMNS)
    }

    /// A tracker that refuses to hold more than `max_columns` ordered
    /// columns.
    #[must_use]
    pub const fn with_max_columns(max_columns: usize) -> Self {
        Self {
            ordering: Vec::new(),
            columns_always_ordered: ColumnOrdering::new(SortDirection::DontCare),
            always_ordered_tables: TableSet::new(),
            unordered_tables: TableSet::new(),
            max_columns,
        }
    }

    fn ordered_column_count(&self) -> usize {
        self.ordering.iter().map(ColumnOrdering::len).sum()
    }

    // --- mutation ---

    /// Append `(table, column)` to the current sort position, opening the
    /// first position if there is none.
    ///
    /// Does nothing while any table of the prefix is unordered.
    ///
    /// # Errors
    ///
    /// - [`CompileError::InvariantViolation`] if `direction` differs from the
    ///   current position's direction.
    /// - [`CompileError::TooManyOrderingColumns`] past the column cap.
    pub fn add_ordered_column(
        &mut self,
        direction: SortDirection,
        table: TableId,
        column: ColumnId,
    ) -> Result<()> {
        if !self.unordered_tables.is_empty() {
            tracing::trace!(
                target: "sqlopt.planner",
                %table,
                %column,
                "ordered column ignored under unordered table"
            );
            return Ok(());
        }
        let count = self.ordered_column_count() + 1;
        if count > self.max_columns {
            return Err(CompileError::TooManyOrderingColumns {
                count,
                max: self.max_columns,
            });
        }
        if self.ordering.is_empty() {
            self.ordering.push(ColumnOrdering::new(direction));
        }
        let Some(current) = self.ordering.last_mut() else {
            return Err(CompileError::invariant("ordering has no current position"));
        };
        if current.direction() != direction {
            tracing::error!(
                target: "sqlopt.planner",
                expected = %current.direction(),
                got = %direction,
                "ordering direction mismatch"
            );
            return Err(CompileError::invariant(format!(
                "ordered column direction {direction} does not match position direction {}",
                current.direction()
            )));
        }
        current.add_column(table, column);
        Ok(())
    }

    /// Close the current sort position and open the next one.
    ///
    /// Does nothing while any table of the prefix is unordered.
    pub fn next_order_position(&mut self, direction: SortDirection) {
        if !self.unordered_tables.is_empty() {
            return;
        }
        self.ordering.push(ColumnOrdering::new(direction));
    }

    /// Record that `column` of `table` is ordered regardless of position
    /// (e.g. it is fixed to a constant by an equality predicate).
    pub fn column_always_ordered(&mut self, table: TableId, column: ColumnId) {
        self.columns_always_ordered.add_column(table, column);
    }

    /// Declare `table` trivially ordered (it yields at most one row).
    ///
    /// Refused when another table of the prefix is unordered or owns an
    /// always-ordered column. Also refused unless the ordering is empty or
    /// holds a single position that involves `table`: a later position
    /// would lose the positions ahead of it once the table is purged. On
    /// success the table's existing ordering entries are purged. Returns
    /// whether the table was marked.
    pub fn optimizable_always_ordered(&mut self, table: TableId) -> bool {
        if self.unordered_tables.iter().any(|t| t != table) {
            return false;
        }
        let positions_ok = match self.ordering.as_slice() {
            [] => true,
            [only] => only.has_table(table),
            _ => false,
        };
        if !positions_ok || self.columns_always_ordered.has_any_other_table(table) {
            return false;
        }
        self.remove(table);
        self.always_ordered_tables.insert(table);
        tracing::debug!(target: "sqlopt.planner", %table, "table always ordered");
        true
    }

    /// Mark `table` as producing rows in no useful order.
    pub fn add_unordered_optimizable(&mut self, table: TableId) {
        self.unordered_tables.insert(table);
    }

    /// Forget everything about `table`: its columns in every position
    /// (dropping positions that become empty), its always-ordered columns
    /// and its membership in both table sets.
    pub fn remove(&mut self, table: TableId) {
        for position in &mut self.ordering {
            position.remove_columns(table);
        }
        self.ordering.retain(|position| !position.is_empty());
        self.columns_always_ordered.remove_columns(table);
        self.unordered_tables.remove(table);
        self.always_ordered_tables.remove(table);
    }

    /// Overwrite `dest` with a deep copy of this tracker.
    pub fn copy(&self, dest: &mut Self) {
        dest.clone_from(self);
    }

    // --- queries ---

    /// Whether rows are ordered on `(table, column)` in `direction` at sort
    /// position `position`.
    #[must_use]
    pub fn ordered_on_column_at(
        &self,
        direction: SortDirection,
        position: usize,
        table: TableId,
        column: ColumnId,
    ) -> bool {
        if self.always_ordered(table) || self.is_column_always_ordered(table, column) {
            return true;
        }
        self.ordering
            .get(position)
            .is_some_and(|p| p.ordered(direction, table, column))
    }

    /// Whether rows are ordered on `(table, column)` in `direction` at any
    /// sort position.
    #[must_use]
    pub fn ordered_on_column(
        &self,
        direction: SortDirection,
        table: TableId,
        column: ColumnId,
    ) -> bool {
        if self.always_ordered(table) || self.is_column_always_ordered(table, column) {
            return true;
        }
        self.ordering
            .iter()
            .any(|p| p.ordered(direction, table, column))
    }

    #[must_use]
    pub fn is_column_always_ordered(&self, table: TableId, column: ColumnId) -> bool {
        self.columns_always_ordered.contains(table, column)
    }

    #[must_use]
    pub fn always_ordered(&self, table: TableId) -> bool {
        self.always_ordered_tables.contains(table)
    }

    #[must_use]
    pub fn is_unordered(&self, table: TableId) -> bool {
        self.unordered_tables.contains(table)
    }

    /// Number of sort positions currently open.
    #[must_use]
    pub fn ordered_position_count(&self) -> usize {
        self.ordering.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = &ColumnOrdering> + '_ {
        self.ordering.iter()
    }
}

impl fmt::Display for RowOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, position) in self.ordering.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{position}")?;
        }
        write!(
            f,
            "] always={} always_tables={} unordered={}",
            self.columns_always_ordered, self.always_ordered_tables, self.unordered_tables
        )
    }
}

//! Identifiers, values and type descriptors shared across the sqlopt crates.
//!
//! Everything in here is handed to the normalizer and planner by the binder:
//! resolved `(table, column)` identifiers, the bound data type of every
//! operand, and constant values.

pub mod value;

pub use value::SqlValue;

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Table / column identifiers
// ---------------------------------------------------------------------------

/// Identifier of a table (FROM-list entry) within one statement compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TableId(u32);

impl TableId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Identifier of a column within its table (1-based, as bound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ColumnId(u32);

impl ColumnId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TableSet: bitset of referenced tables
// ---------------------------------------------------------------------------

/// A growable bitset of [`TableId`]s.
///
/// Used for the referenced-table map of a predicate and for the table maps
/// of access paths. Equality compares membership, not backing storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSet {
    words: Vec<u64>,
}

impl TableSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Build a set from the given tables.
    #[must_use]
    pub fn of(tables: &[TableId]) -> Self {
        let mut set = Self::new();
        for t in tables {
            set.insert(*t);
        }
        set
    }

    fn locate(table: TableId) -> (usize, u64) {
        let bit = table.get() as usize;
        (bit / 64, 1_u64 << (bit % 64))
    }

    /// Add `table`; returns whether it was newly inserted.
    pub fn insert(&mut self, table: TableId) -> bool {
        let (word, mask) = Self::locate(table);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let fresh = self.words[word] & mask == 0;
        self.words[word] |= mask;
        fresh
    }

    /// Remove `table`; returns whether it was present.
    pub fn remove(&mut self, table: TableId) -> bool {
        let (word, mask) = Self::locate(table);
        match self.words.get_mut(word) {
            Some(w) if *w & mask != 0 => {
                *w &= !mask;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn contains(&self, table: TableId) -> bool {
        let (word, mask) = Self::locate(table);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Set union, in place.
    pub fn union_with(&mut self, other: &Self) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (dst, src) in self.words.iter_mut().zip(&other.words) {
            *dst |= *src;
        }
    }

    /// Whether every table in `self` is also in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.words.iter().enumerate().all(|(i, w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    /// Whether the two sets share at least one table.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(a, b)| a & b != 0)
    }

    /// Whether both sets hold exactly the same tables.
    #[must_use]
    pub fn same_tables(&self, other: &Self) -> bool {
        self.is_subset_of(other) && other.is_subset_of(self)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Tables in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = TableId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, w)| {
            (0..64_u32).filter_map(move |b| {
                if w & (1_u64 << b) == 0 {
                    None
                } else {
                    #[allow(clippy::cast_possible_truncation)]
                    let raw = i as u32 * 64 + b;
                    Some(TableId::new(raw))
                }
            })
        })
    }
}

impl PartialEq for TableSet {
    fn eq(&self, other: &Self) -> bool {
        self.same_tables(other)
    }
}

impl Eq for TableSet {}

impl fmt::Display for TableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, t) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{t}")?;
        }
        f.write_str("}")
    }
}

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Bound SQL type of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeId {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Char,
    Varchar,
    Date,
    Time,
    Timestamp,
    Blob,
}

/// Comparison family of a [`TypeId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Boolean,
    Numeric,
    Character,
    Datetime,
    Binary,
}

impl TypeId {
    /// The SQL spelling of the type.
    #[must_use]
    pub const fn sql_type_name(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Blob => "BLOB",
        }
    }

    #[must_use]
    pub const fn family(self) -> TypeFamily {
        match self {
            Self::Boolean => TypeFamily::Boolean,
            Self::SmallInt
            | Self::Integer
            | Self::BigInt
            | Self::Real
            | Self::Double
            | Self::Decimal => TypeFamily::Numeric,
            Self::Char | Self::Varchar => TypeFamily::Character,
            Self::Date | Self::Time | Self::Timestamp => TypeFamily::Datetime,
            Self::Blob => TypeFamily::Binary,
        }
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self.family(), TypeFamily::Numeric)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type_name())
    }
}

/// A bound type: the [`TypeId`] plus nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub type_id: TypeId,
    pub nullable: bool,
}

impl TypeDescriptor {
    #[must_use]
    pub const fn new(type_id: TypeId, nullable: bool) -> Self {
        Self { type_id, nullable }
    }

    /// The result type of a predicate.
    #[must_use]
    pub const fn boolean(nullable: bool) -> Self {
        Self::new(TypeId::Boolean, nullable)
    }

    #[must_use]
    pub const fn is_boolean(self) -> bool {
        matches!(self.type_id, TypeId::Boolean)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}", self.type_id)
        } else {
            write!(f, "{} NOT NULL", self.type_id)
        }
    }
}

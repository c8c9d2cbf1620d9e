use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{TypeDescriptor, TypeId};

/// A constant value carried by a bound expression tree.
///
/// `Null` is SQL NULL, which makes every comparison it takes part in
/// UNKNOWN. Boolean values double as the truth values of three-valued
/// predicate evaluation (`Null` standing in for UNKNOWN).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// TRUE or FALSE.
    Boolean(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit IEEE 754 floating-point number.
    Float(f64),
    /// A UTF-8 text string.
    Text(String),
}

impl SqlValue {
    /// The boolean-true constant.
    pub const TRUE: Self = Self::Boolean(true);
    /// The boolean-false constant.
    pub const FALSE: Self = Self::Boolean(false);

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_true(&self) -> bool {
        matches!(self, Self::Boolean(true))
    }

    #[must_use]
    pub const fn is_false(&self) -> bool {
        matches!(self, Self::Boolean(false))
    }

    /// Truth value of this value when used as a predicate result.
    /// `None` is UNKNOWN.
    #[must_use]
    pub const fn truth(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Build a predicate result from a truth value.
    #[must_use]
    pub const fn from_truth(truth: Option<bool>) -> Self {
        match truth {
            Some(b) => Self::Boolean(b),
            None => Self::Null,
        }
    }

    /// The bound type a literal of this value receives.
    #[must_use]
    pub const fn type_descriptor(&self) -> TypeDescriptor {
        match self {
            Self::Null => TypeDescriptor::new(TypeId::Integer, true),
            Self::Boolean(_) => TypeDescriptor::new(TypeId::Boolean, false),
            Self::Integer(_) => TypeDescriptor::new(TypeId::BigInt, false),
            Self::Float(_) => TypeDescriptor::new(TypeId::Double, false),
            Self::Text(_) => TypeDescriptor::new(TypeId::Varchar, false),
        }
    }

    /// Compare two values under SQL semantics.
    ///
    /// Returns `None` (UNKNOWN) if either side is NULL or the values belong
    /// to different comparison classes.
    #[must_use]
    pub fn sql_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        if self.sort_class() != other.sort_class() {
            return None;
        }
        self.partial_cmp(other)
    }

    const fn sort_class(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.partial_cmp(other), Some(Ordering::Equal))
    }
}

impl PartialOrd for SqlValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        // Sort order: NULL < boolean < numeric < text
        let class_a = self.sort_class();
        let class_b = other.sort_class();

        if class_a != class_b {
            return Some(class_a.cmp(&class_b));
        }

        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => Some(int_float_cmp(*a, *b)),
            (Self::Float(a), Self::Integer(b)) => Some(int_float_cmp(*b, *a).reverse()),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for SqlValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        if f.is_nan() {
            Self::Null
        } else {
            Self::Float(f)
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Compare an integer with a float without losing precision on large
/// magnitudes.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn int_float_cmp(i: i64, r: f64) -> Ordering {
    if r.is_nan() {
        return Ordering::Greater;
    }
    if r < -9_223_372_036_854_775_808.0 {
        return Ordering::Greater;
    }
    if r >= 9_223_372_036_854_775_808.0 {
        return Ordering::Less;
    }
    let y = r as i64;
    match i.cmp(&y) {
        Ordering::Equal => {
            let s = i as f64;
            s.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        unequal => unequal,
    }
}

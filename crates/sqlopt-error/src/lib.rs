use thiserror::Error;

/// Primary error type for predicate normalization and plan costing.
///
/// Structured variants for the failures a statement compilation can hit in
/// this layer. Type and limit errors abort compilation of the statement;
/// invariant violations signal a programming defect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    // === Type Errors ===
    /// Two operand types cannot be compared by the requested operator.
    #[error("comparisons between '{left}' and '{right}' are not supported for operator {op}")]
    TypeIncomparable {
        left: String,
        right: String,
        op: String,
    },

    /// An operand that must be boolean-valued is not.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    // === Limit Errors ===
    /// Expression tree too deep.
    #[error("expression tree too deep (max {max})")]
    ExpressionTooDeep { max: usize },

    /// Too many values in an IN list.
    #[error("too many values in IN list: {count} (max {max})")]
    TooManyInListValues { count: usize, max: usize },

    /// Too many ordering columns.
    #[error("too many ordering columns: {count} (max {max})")]
    TooManyOrderingColumns { count: usize, max: usize },

    // === Evaluation Errors ===
    /// A column referenced by an expression has no value in the supplied row.
    #[error("no value bound for column {table}.{column}")]
    UnboundColumn { table: u32, column: u32 },

    /// The expression contains a node kind that cannot be evaluated here.
    #[error("cannot evaluate expression: {0}")]
    NotEvaluable(String),

    // === Internal Errors ===
    /// Internal consistency failure (should never happen).
    #[error("invariant violation: {detail}")]
    InvariantViolation { detail: String },
}

/// Result/error codes reported to the statement compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Successful result.
    Ok = 0,
    /// Generic error.
    Error = 1,
    /// Internal logic error.
    Internal = 2,
    /// String, BLOB or structure exceeds a limit.
    TooBig = 18,
    /// Data type mismatch.
    Mismatch = 20,
    /// Library used incorrectly.
    Misuse = 21,
}

impl CompileError {
    /// Map this error to a result code.
    #[allow(clippy::match_same_arms)]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::TypeIncomparable { .. } | Self::TypeMismatch { .. } => ErrorCode::Mismatch,
            Self::ExpressionTooDeep { .. }
            | Self::TooManyInListValues { .. }
            | Self::TooManyOrderingColumns { .. } => ErrorCode::TooBig,
            Self::UnboundColumn { .. } | Self::NotEvaluable(_) => ErrorCode::Misuse,
            Self::InvariantViolation { .. } => ErrorCode::Internal,
        }
    }

    /// Whether this error signals a defect in the compiler rather than in
    /// the statement being compiled.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }

    /// Whether this is one of the structural limit errors.
    pub const fn is_limit(&self) -> bool {
        matches!(
            self,
            Self::ExpressionTooDeep { .. }
                | Self::TooManyInListValues { .. }
                | Self::TooManyOrderingColumns { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::TypeIncomparable { .. } => Some("Add an explicit CAST to a comparable type"),
            Self::ExpressionTooDeep { .. } => Some("Simplify the WHERE clause"),
            Self::TooManyInListValues { .. } => {
                Some("Split the IN list or use a join against a temporary table")
            }
            _ => None,
        }
    }

    /// Create a type-incomparable error.
    pub fn incomparable(
        left: impl Into<String>,
        right: impl Into<String>,
        op: impl Into<String>,
    ) -> Self {
        Self::TypeIncomparable {
            left: left.into(),
            right: right.into(),
            op: op.into(),
        }
    }

    /// Create an invariant-violation error.
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            detail: detail.into(),
        }
    }
}

/// Result type alias using `CompileError`.
pub type Result<T> = std::result::Result<T, CompileError>;

//! Error types shared by the shape value types and the geometry handle

use thiserror::Error;

use crate::scene::ElementKey;

/// Contract violations raised by shape and geometry operations.
///
/// Every operation that returns one of these leaves its receiver unmodified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Operation is not valid for the current shape kind or ownership
    #[error("{operation} is not valid for {found} geometry")]
    TypeMismatch {
        /// Operation that was attempted
        operation: &'static str,
        /// Kind (or ownership) that was found instead
        found: String,
    },

    /// Element, point or property index out of range
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of valid entries
        len: usize,
    },

    /// Unknown property name
    #[error("property not found: {0}")]
    PropertyNotFound(String),

    /// Property name already present
    #[error("duplicate property: {0}")]
    DuplicateProperty(String),

    /// Sizes or property sets do not agree
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected size or layout
        expected: String,
        /// Size or layout that was provided
        found: String,
    },

    /// Primitive parameters do not match its kind
    #[error("invalid primitive: {0}")]
    InvalidPrimitive(String),

    /// Collision margin must be finite and non-negative
    #[error("invalid collision margin: {0}")]
    InvalidMargin(f64),

    /// Registry could not resolve a reference key
    #[error("unresolved geometry reference {0}")]
    UnresolvedReference(ElementKey),
}

impl GeometryError {
    /// Shorthand for a [`GeometryError::DimensionMismatch`]
    pub(crate) fn dimension(expected: impl ToString, found: impl ToString) -> Self {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Shorthand for a [`GeometryError::IndexOutOfRange`]
    pub(crate) fn index(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}

/// Result alias for geometry operations
pub type Result<T> = std::result::Result<T, GeometryError>;

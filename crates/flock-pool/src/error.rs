//! Pool-specific error types.

use std::error::Error;
use std::fmt;

use flock_core::FieldKind;

/// Errors that can occur during pool operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// A growth or sizing request was malformed (e.g. an attempt to shrink).
    InvalidArgument {
        /// Human-readable description of the rejected request.
        reason: String,
    },
    /// Growth would exceed the configured maximum capacity.
    CapacityExceeded {
        /// Number of slots required.
        requested: usize,
        /// Configured upper bound on slots.
        max: usize,
    },
    /// A field with this label is already registered.
    DuplicateField {
        /// The conflicting label.
        label: String,
    },
    /// No field with this label is registered.
    UnknownField {
        /// The unrecognised label.
        label: String,
    },
    /// The field exists but has a different storage class.
    FieldKindMismatch {
        /// The field label.
        label: String,
        /// Kind requested by the caller.
        expected: FieldKind,
        /// Kind the field was registered with.
        found: FieldKind,
    },
    /// A field definition failed validation.
    InvalidField {
        /// Description of the validation failure.
        reason: String,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::CapacityExceeded { requested, max } => {
                write!(
                    f,
                    "pool capacity exceeded: requested {requested} slots, max {max}"
                )
            }
            Self::DuplicateField { label } => write!(f, "field '{label}' already registered"),
            Self::UnknownField { label } => write!(f, "unknown field '{label}'"),
            Self::FieldKindMismatch {
                label,
                expected,
                found,
            } => {
                write!(
                    f,
                    "field '{label}' is {found:?}, requested as {expected:?}"
                )
            }
            Self::InvalidField { reason } => write!(f, "invalid field: {reason}"),
        }
    }
}

impl Error for PoolError {}

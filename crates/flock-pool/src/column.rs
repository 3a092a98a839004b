//! Typed per-slot field storage.

use flock_core::{FieldKind, Real};

/// One owned array per registered field, indexed by slot.
///
/// Every column in a pool has the same length as the pool capacity.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldColumn {
    /// Real-valued column.
    Real(Vec<Real>),
    /// Integer-valued column.
    Int(Vec<i64>),
}

impl FieldColumn {
    /// Zero-initialised column of `len` slots.
    pub fn new(kind: FieldKind, len: usize) -> Self {
        match kind {
            FieldKind::Real => Self::Real(vec![0.0; len]),
            FieldKind::Int => Self::Int(vec![0; len]),
        }
    }

    /// Storage class of this column.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Real(_) => FieldKind::Real,
            Self::Int(_) => FieldKind::Int,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        match self {
            Self::Real(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    /// Whether the column has no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Real values, if this is a real column.
    pub fn as_real(&self) -> Option<&[Real]> {
        match self {
            Self::Real(v) => Some(v),
            Self::Int(_) => None,
        }
    }

    /// Integer values, if this is an integer column.
    pub fn as_int(&self) -> Option<&[i64]> {
        match self {
            Self::Int(v) => Some(v),
            Self::Real(_) => None,
        }
    }

    pub(crate) fn as_real_mut(&mut self) -> Option<&mut [Real]> {
        match self {
            Self::Real(v) => Some(v),
            Self::Int(_) => None,
        }
    }

    pub(crate) fn as_int_mut(&mut self) -> Option<&mut [i64]> {
        match self {
            Self::Int(v) => Some(v),
            Self::Real(_) => None,
        }
    }

    /// Grow to `len` slots, zero-filling the tail. Existing values keep their index.
    pub(crate) fn resize(&mut self, len: usize) {
        match self {
            Self::Real(v) => v.resize(len, 0.0),
            Self::Int(v) => v.resize(len, 0),
        }
    }

    /// Copy the value in slot `from` into slot `to`.
    pub(crate) fn copy_slot(&mut self, from: usize, to: usize) {
        match self {
            Self::Real(v) => v[to] = v[from],
            Self::Int(v) => v[to] = v[from],
        }
    }

    /// Zero the value in slot `n`.
    pub(crate) fn reset_slot(&mut self, n: usize) {
        match self {
            Self::Real(v) => v[n] = 0.0,
            Self::Int(v) => v[n] = 0,
        }
    }
}

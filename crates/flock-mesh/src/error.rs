//! Error types for block geometry and neighbor topology.

use std::fmt;

use flock_core::Real;

/// Errors arising from block geometry or neighbor-table construction.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// An active axis has `min >= max` or non-finite bounds.
    InvalidBounds {
        /// Axis index (0 = x, 1 = y, 2 = z).
        axis: usize,
        /// Lower bound.
        min: Real,
        /// Upper bound.
        max: Real,
    },
    /// Local block bounds extend past the global domain.
    OutsideDomain {
        /// Axis on which the block escapes the domain.
        axis: usize,
    },
    /// The refinement ratio must be at least 1.
    InvalidRefinementRatio {
        /// The rejected ratio.
        value: usize,
    },
    /// A neighbor entry is malformed for this dimensionality.
    InvalidNeighbor {
        /// Position of the neighbor in the block's neighbor list.
        index: usize,
        /// What went wrong.
        reason: String,
    },
    /// Two neighbors claim the same octant bucket.
    OverlappingNeighbors {
        /// Neighbor already occupying the bucket.
        first: usize,
        /// Neighbor that tried to claim it.
        second: usize,
        /// The contested `(i, j, k)` bucket.
        bucket: [usize; 3],
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBounds { axis, min, max } => {
                write!(f, "invalid bounds on axis {axis}: [{min}, {max}]")
            }
            Self::OutsideDomain { axis } => {
                write!(f, "block extends outside the global domain on axis {axis}")
            }
            Self::InvalidRefinementRatio { value } => {
                write!(f, "refinement ratio must be at least 1, got {value}")
            }
            Self::InvalidNeighbor { index, reason } => {
                write!(f, "invalid neighbor {index}: {reason}")
            }
            Self::OverlappingNeighbors {
                first,
                second,
                bucket,
            } => {
                write!(
                    f,
                    "neighbors {first} and {second} both claim bucket {bucket:?}"
                )
            }
        }
    }
}

impl std::error::Error for GeometryError {}

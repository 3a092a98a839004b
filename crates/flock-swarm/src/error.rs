//! Error types for swarms and device-context kernels.

use std::error::Error;
use std::fmt;

use flock_mesh::GeometryError;
use flock_pool::PoolError;

/// Errors raised by [`DeviceContext`](crate::DeviceContext) operations.
///
/// Every variant carries the offending slot so the caller can report
/// which particle failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// The slot index is beyond the pool capacity.
    SlotOutOfRange {
        /// Requested slot.
        slot: usize,
        /// Pool capacity at the time the context was built.
        capacity: usize,
    },
    /// A position fell outside the halo on an active axis.
    BucketOutOfRange {
        /// Slot whose position was resolved.
        slot: usize,
        /// Axis (0 = x, 1 = y, 2 = z) that overflowed.
        axis: usize,
        /// Computed bucket on that axis.
        bucket: i64,
    },
    /// The bucket is in range but no neighbor covers it.
    NoNeighbor {
        /// Slot whose position was resolved.
        slot: usize,
        /// `(i, j, k)` bucket with no owner.
        bucket: [usize; 3],
    },
}

impl ContextError {
    /// Slot the error refers to.
    pub fn slot(&self) -> usize {
        match self {
            Self::SlotOutOfRange { slot, .. }
            | Self::BucketOutOfRange { slot, .. }
            | Self::NoNeighbor { slot, .. } => *slot,
        }
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotOutOfRange { slot, capacity } => {
                write!(f, "slot {slot} out of range for pool of {capacity}")
            }
            Self::BucketOutOfRange { slot, axis, bucket } => {
                write!(
                    f,
                    "particle {slot} lies outside the halo: bucket {bucket} on axis {axis}"
                )
            }
            Self::NoNeighbor { slot, bucket } => {
                write!(f, "particle {slot} in bucket {bucket:?} has no neighbor block")
            }
        }
    }
}

impl Error for ContextError {}

/// Errors raised by [`Swarm`](crate::Swarm) operations.
#[derive(Clone, Debug, PartialEq)]
pub enum SwarmError {
    /// The mesh block this swarm lives on has been dropped.
    BlockExpired {
        /// Label of the swarm whose block is gone.
        swarm: String,
    },
    /// A device context was requested for a block other than the bound one.
    ForeignBlock {
        /// Label of the swarm.
        swarm: String,
    },
    /// Position fields cannot be removed from a swarm.
    ReservedField {
        /// The rejected label.
        label: String,
    },
    /// `SwarmConfig` failed validation.
    InvalidConfig {
        /// Description of the violated invariant.
        reason: String,
    },
    /// Underlying pool operation failed.
    Pool(PoolError),
    /// Block geometry was invalid.
    Geometry(GeometryError),
    /// Destination computation failed for a particle.
    Context(ContextError),
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockExpired { swarm } => {
                write!(f, "mesh block of swarm '{swarm}' no longer exists")
            }
            Self::ForeignBlock { swarm } => {
                write!(f, "swarm '{swarm}' is not bound to the given block")
            }
            Self::ReservedField { label } => {
                write!(f, "position field '{label}' cannot be removed")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid swarm config: {reason}"),
            Self::Pool(e) => write!(f, "pool: {e}"),
            Self::Geometry(e) => write!(f, "geometry: {e}"),
            Self::Context(e) => write!(f, "context: {e}"),
        }
    }
}

impl Error for SwarmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            Self::Geometry(e) => Some(e),
            Self::Context(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for SwarmError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

impl From<GeometryError> for SwarmError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

impl From<ContextError> for SwarmError {
    fn from(e: ContextError) -> Self {
        Self::Context(e)
    }
}

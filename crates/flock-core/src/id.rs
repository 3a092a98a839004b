//! Strongly-typed identifiers and per-slot destination codes.

use std::fmt;

/// Floating-point type used for particle positions and real-valued fields.
pub type Real = f64;

/// Index of a slot within a particle pool.
///
/// Slot indices are stable handles: they only change when the pool is
/// explicitly defragmented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub usize);

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for SlotIndex {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// Identifies a process (rank) participating in a distributed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(pub u32);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Globally unique identifier of a mesh block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Per-slot destination code.
///
/// Stored as a raw `i32` in the pool so parallel kernels can write it
/// through an atomic. Non-negative values index the owning block's
/// neighbor list.
pub struct NeighborIndex;

impl NeighborIndex {
    /// The particle stays on the current block.
    pub const THIS_BLOCK: i32 = -1;
    /// The particle's position could not be resolved to a neighbor.
    pub const INVALID: i32 = -2;

    /// Returns `true` if `code` addresses a neighbor block.
    pub fn is_neighbor(code: i32) -> bool {
        code >= 0
    }
}

/// Communication phase a migration round belongs to.
///
/// Messages are tagged with their phase so that rounds for different
/// phases never consume each other's particles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommPhase {
    /// Exchange performed once while the mesh is initialised.
    MeshInit,
    /// Regular exchange performed every step.
    All,
}

impl CommPhase {
    /// Number of distinct phases.
    pub const COUNT: usize = 2;

    /// Dense index of this phase, usable for per-phase tables.
    pub fn index(self) -> usize {
        match self {
            Self::MeshInit => 0,
            Self::All => 1,
        }
    }
}

impl fmt::Display for CommPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeshInit => write!(f, "mesh_init"),
            Self::All => write!(f, "all"),
        }
    }
}

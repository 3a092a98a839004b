//! Mesh-block geometry and neighbor topology for Flock swarms.
//!
//! A [`MeshBlock`] owns its [`BlockGeometry`] (local and global bounds,
//! periodicity, refinement ratio) and a prebuilt [`NeighborTable`] that
//! resolves a particle's octant bucket to the neighbor it should move to.
//!
//! # Octant buckets
//!
//! With refinement ratio `r`, each active axis is split into `r` interior
//! buckets plus one halo bucket on either side:
//!
//! ```text
//!   bucket:   0   |  1  ...  r  |  r+1
//!            halo |   interior  | halo
//! ```
//!
//! Interior buckets resolve to [`NeighborIndex::THIS_BLOCK`](flock_core::NeighborIndex::THIS_BLOCK),
//! halo buckets to the index of the neighbor covering them, or
//! [`NeighborIndex::INVALID`](flock_core::NeighborIndex::INVALID) at a
//! non-periodic domain edge.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod error;
pub mod geometry;
pub mod neighbor;

pub use block::MeshBlock;
pub use error::GeometryError;
pub use geometry::{bucket, BlockBounds, BlockGeometry, Dimensionality};
pub use neighbor::{BlockEndpoint, NeighborBlock, NeighborTable};

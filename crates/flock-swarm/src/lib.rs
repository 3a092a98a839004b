//! Swarms: labelled particle collections bound to mesh blocks.
//!
//! A [`Swarm`] owns a [`ParticlePool`](flock_pool::ParticlePool) with the
//! default `x`, `y`, `z` position fields and holds a weak reference to
//! the [`MeshBlock`](flock_mesh::MeshBlock) it lives on. Per-particle
//! kernels run against a [`DeviceContext`], a `Copy` view that can be
//! shared across threads and written slot by slot.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod error;
pub mod swarm;

pub use config::{InvalidDestination, SwarmConfig};
pub use context::DeviceContext;
pub use error::{ContextError, SwarmError};
pub use swarm::{DestinationCounts, Swarm, POSITION_FIELDS};

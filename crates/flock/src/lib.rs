//! Flock: particle swarms on block-structured meshes.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Flock sub-crates. For most users, adding `flock` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use flock::prelude::*;
//!
//! // One block covering a periodic unit line, its own neighbor on both sides.
//! let me = BlockEndpoint { rank: Rank(0), block: BlockId(0) };
//! let unit = BlockBounds::new([0.0; 3], [1.0, 0.0, 0.0]);
//! let geometry = BlockGeometry::new(Dimensionality::One, unit, unit)
//!     .unwrap()
//!     .with_periodic([true, false, false]);
//! let block = Arc::new(
//!     MeshBlock::new(
//!         me.block,
//!         me.rank,
//!         geometry,
//!         vec![NeighborBlock::new(me, [-1, 0, 0]), NeighborBlock::new(me, [1, 0, 0])],
//!     )
//!     .unwrap(),
//! );
//!
//! let mut swarm = Swarm::new("tracers", &block, SwarmConfig::default()).unwrap();
//! swarm.add_field(FieldDef::real("mass")).unwrap();
//! let slots = swarm.add_empty_particles(2).unwrap();
//! swarm.set_position(slots[0].0, [0.25, 0.0, 0.0]).unwrap();
//! swarm.set_position(slots[1].0, [1.2, 0.0, 0.0]).unwrap();
//!
//! let transport = ChannelFabric::connect(&[me]).unwrap().remove(0);
//! let mut migrator = Migrator::new(transport, MigrationConfig::default()).unwrap();
//! migrator.exchange(&mut swarm, CommPhase::All).unwrap();
//!
//! assert_eq!(swarm.num_active(), 2);
//! assert_eq!(migrator.num_particles_sent(), 1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `flock-core` | IDs, neighbor codes, field definitions |
//! | [`pool`] | `flock-pool` | Slot pool, field columns, defragmentation |
//! | [`mesh`] | `flock-mesh` | Block geometry, neighbor tables, bucketing |
//! | [`swarm`] | `flock-swarm` | Swarms and device contexts |
//! | [`migrate`] | `flock-migrate` | Wire codec, transports, migration rounds |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core identifiers and field descriptors (`flock-core`).
pub use flock_core as types;

/// Particle slot storage (`flock-pool`).
///
/// [`pool::ParticlePool`] is normally reached through a swarm.
pub use flock_pool as pool;

/// Mesh blocks and neighbor lookup (`flock-mesh`).
pub use flock_mesh as mesh;

/// Swarms and per-particle kernel contexts (`flock-swarm`).
pub use flock_swarm as swarm;

/// Particle migration between blocks (`flock-migrate`).
///
/// [`migrate::Migrator`] runs over any [`migrate::Transport`];
/// [`migrate::ChannelFabric`] provides an in-process one.
pub use flock_migrate as migrate;

/// Common imports for typical Flock usage.
///
/// ```rust
/// use flock::prelude::*;
/// ```
pub mod prelude {
    pub use flock_core::{
        BlockId, CommPhase, FieldDef, FieldKind, NeighborIndex, Rank, Real, SlotIndex,
    };

    pub use flock_pool::{ParticlePool, PoolConfig, PoolError};

    pub use flock_mesh::{
        BlockBounds, BlockEndpoint, BlockGeometry, Dimensionality, GeometryError, MeshBlock,
        NeighborBlock, NeighborTable,
    };

    pub use flock_swarm::{
        ContextError, DeviceContext, InvalidDestination, Swarm, SwarmConfig, SwarmError,
    };

    pub use flock_migrate::{
        ChannelFabric, MigrationConfig, MigrationError, MigrationState, Migrator, Transport,
    };
}

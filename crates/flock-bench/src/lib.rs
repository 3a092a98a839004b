//! Benchmark workloads for the Flock particle framework.
//!
//! Provides deterministic, seeded particle workloads:
//!
//! - [`scatter_positions`]: uniform positions inside a box via ChaCha8
//! - [`reference_block`]: one periodic unit block, its own neighbor on every side
//! - [`reference_swarm`]: a swarm of `n` particles spread over the block and its halo

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use flock_core::{BlockId, FieldDef, Rank, Real};
use flock_mesh::{
    BlockBounds, BlockEndpoint, BlockGeometry, Dimensionality, MeshBlock, NeighborBlock,
};
use flock_swarm::{Swarm, SwarmConfig};

/// `n` positions uniform in `bounds` on the active axes of `dim`.
///
/// Inactive coordinates are zero. Identical seeds give identical output.
pub fn scatter_positions(
    n: usize,
    bounds: &BlockBounds,
    dim: Dimensionality,
    seed: u64,
) -> Vec<[Real; 3]> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let mut pos = [0.0; 3];
            for (axis, p) in pos.iter_mut().enumerate().take(dim.ndim()) {
                *p = bounds.min[axis] + rng.random::<Real>() * bounds.width(axis);
            }
            pos
        })
        .collect()
}

/// A 3D block covering the periodic unit cube, listed as its own neighbor
/// in all 26 directions.
pub fn reference_block() -> Arc<MeshBlock> {
    let me = BlockEndpoint {
        rank: Rank(0),
        block: BlockId(0),
    };
    let unit_cube = BlockBounds::new([0.0; 3], [1.0; 3]);
    let geom = BlockGeometry::new(Dimensionality::Three, unit_cube, unit_cube)
        .expect("unit cube is a valid block")
        .with_periodic([true; 3]);
    let mut neighbors = Vec::with_capacity(26);
    for dz in -1i8..=1 {
        for dy in -1i8..=1 {
            for dx in -1i8..=1 {
                if (dx, dy, dz) != (0, 0, 0) {
                    neighbors.push(NeighborBlock::new(me, [dx, dy, dz]));
                }
            }
        }
    }
    Arc::new(MeshBlock::new(me.block, me.rank, geom, neighbors).expect("full shell is valid"))
}

/// A swarm of `n` particles on `block`, scattered over the block widened
/// by `halo` on every side, with an integer `id` field.
pub fn reference_swarm(block: &Arc<MeshBlock>, n: usize, halo: Real, seed: u64) -> Swarm {
    let local = block.geometry().local();
    let widened = BlockBounds::new(local.min.map(|v| v - halo), local.max.map(|v| v + halo));
    let positions = scatter_positions(n, &widened, block.geometry().dim(), seed);

    let mut swarm = Swarm::new("bench", block, SwarmConfig::default()).expect("default config");
    swarm.add_field(FieldDef::int("id")).expect("fresh field");
    let slots = swarm.add_empty_particles(n).expect("pool growth");
    for (k, (slot, pos)) in slots.iter().zip(positions).enumerate() {
        swarm.set_position(slot.0, pos).expect("slot in range");
        swarm.pool_mut().int_mut("id").expect("id field")[slot.0] = k as i64;
    }
    swarm
}

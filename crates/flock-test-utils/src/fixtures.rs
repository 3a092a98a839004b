//! Mesh and swarm fixtures.
//!
//! - [`block_line`]: `n` equal 1D blocks over `[0, 1)`, one per rank.
//! - [`block_grid`]: `nx × ny` equal 2D blocks over `[0, 1)²`, one per rank.
//! - [`populated_swarm`]: a swarm with particles at the given positions.

use std::sync::Arc;

use flock_core::{BlockId, FieldDef, Rank, Real};
use flock_mesh::{
    BlockBounds, BlockEndpoint, BlockGeometry, Dimensionality, MeshBlock, NeighborBlock,
};
use flock_swarm::{Swarm, SwarmConfig};

/// Integer field holding a particle's original index.
pub const ID_FIELD: &str = "id";

/// The unit cube `[0, 1]³`.
pub fn unit_domain() -> BlockBounds {
    BlockBounds::new([0.0; 3], [1.0; 3])
}

fn endpoint(id: usize) -> BlockEndpoint {
    BlockEndpoint {
        rank: Rank(id as u32),
        block: BlockId(id as u64),
    }
}

/// `n` blocks tiling `[0, 1)` along x. Block `i` lives on rank `i`.
///
/// With `periodic`, the first and last blocks neighbor each other;
/// otherwise the outer halos have no neighbor.
pub fn block_line(n: usize, periodic: bool) -> Vec<Arc<MeshBlock>> {
    block_grid(n, 1, [periodic, false])
        .into_iter()
        .map(|b| {
            let geom = BlockGeometry::new(
                Dimensionality::One,
                *b.geometry().local(),
                *b.geometry().global(),
            )
            .unwrap()
            .with_periodic([periodic, false, false]);
            let neighbors = b
                .neighbors()
                .iter()
                .filter(|nb| nb.offset[1] == 0)
                .copied()
                .collect();
            Arc::new(MeshBlock::new(b.id(), b.rank(), geom, neighbors).unwrap())
        })
        .collect()
}

/// `nx × ny` blocks tiling `[0, 1)²`. Block `j * nx + i` lives on the rank
/// with the same number.
///
/// Neighbors are listed in `(dy, dx)` row-major order, skipping offsets
/// that leave a non-periodic domain edge. A single block along a periodic
/// axis is its own neighbor on both sides.
pub fn block_grid(nx: usize, ny: usize, periodic: [bool; 2]) -> Vec<Arc<MeshBlock>> {
    let (w, h) = (1.0 / nx as Real, 1.0 / ny as Real);
    let mut blocks = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let local = BlockBounds::new(
                [i as Real * w, j as Real * h, 0.0],
                [(i + 1) as Real * w, (j + 1) as Real * h, 1.0],
            );
            let geom = BlockGeometry::new(Dimensionality::Two, local, unit_domain())
                .unwrap()
                .with_periodic([periodic[0], periodic[1], false]);

            let mut neighbors = Vec::new();
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if (dx, dy) == (0, 0) {
                        continue;
                    }
                    let (ni, nj) = (i as i64 + dx, j as i64 + dy);
                    let wrap = |v: i64, n: usize, periodic: bool| {
                        if (0..n as i64).contains(&v) {
                            Some(v as usize)
                        } else if periodic {
                            Some(v.rem_euclid(n as i64) as usize)
                        } else {
                            None
                        }
                    };
                    let (Some(ni), Some(nj)) =
                        (wrap(ni, nx, periodic[0]), wrap(nj, ny, periodic[1]))
                    else {
                        continue;
                    };
                    neighbors.push(NeighborBlock::new(
                        endpoint(nj * nx + ni),
                        [dx as i8, dy as i8, 0],
                    ));
                }
            }
            let id = j * nx + i;
            blocks.push(Arc::new(
                MeshBlock::new(BlockId(id as u64), Rank(id as u32), geom, neighbors).unwrap(),
            ));
        }
    }
    blocks
}

/// A swarm on `block` with one particle per position and an [`ID_FIELD`]
/// holding `first_id + index`.
pub fn populated_swarm(
    block: &Arc<MeshBlock>,
    positions: &[[Real; 3]],
    first_id: i64,
    config: SwarmConfig,
) -> Swarm {
    let mut swarm = Swarm::new("particles", block, config).unwrap();
    swarm.add_field(FieldDef::int(ID_FIELD)).unwrap();
    let slots = swarm.add_empty_particles(positions.len()).unwrap();
    for (k, (slot, &pos)) in slots.iter().zip(positions).enumerate() {
        swarm.set_position(slot.0, pos).unwrap();
        swarm.pool_mut().int_mut(ID_FIELD).unwrap()[slot.0] = first_id + k as i64;
    }
    swarm
}

/// `(id, position)` of every live particle, sorted by id.
pub fn particle_ids(swarm: &Swarm) -> Vec<(i64, [Real; 3])> {
    let ids = swarm.pool().int(ID_FIELD).unwrap();
    let mut out: Vec<_> = swarm
        .pool()
        .active_slots()
        .map(|slot| (ids[slot.0], swarm.position(slot.0).unwrap()))
        .collect();
    out.sort_by_key(|&(id, _)| id);
    out
}

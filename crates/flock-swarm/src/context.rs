//! Kernel-side view of a swarm.
//!
//! [`DeviceContext`] borrows the per-slot arrays of a pool together with
//! the geometry and neighbor table of its block. It is `Copy` and `Sync`:
//! one context may be handed to any number of threads, each of which
//! writes only the removal flags and destination codes of the slots it
//! owns.
//!
//! Growing the pool requires `&mut` access, so a context can never
//! outlive a reallocation. Build a fresh one after every growth.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use flock_core::{NeighborIndex, Real};
use flock_mesh::{bucket, BlockBounds, Dimensionality, MeshBlock, NeighborTable};
use flock_pool::ParticlePool;

use crate::error::ContextError;

/// Borrowed, thread-shareable accessors for per-particle kernels.
#[derive(Clone, Copy)]
pub struct DeviceContext<'a> {
    mask: &'a [bool],
    marked: &'a [AtomicBool],
    destination: &'a [AtomicI32],
    dim: Dimensionality,
    bounds: BlockBounds,
    cells: usize,
    table: &'a NeighborTable,
}

impl<'a> DeviceContext<'a> {
    /// Build a context over `pool` for particles living on `block`.
    pub fn new(pool: &'a ParticlePool, block: &'a MeshBlock) -> Self {
        let geometry = block.geometry();
        Self {
            mask: pool.mask(),
            marked: pool.marked_for_removal(),
            destination: pool.destinations(),
            dim: geometry.dim(),
            bounds: *geometry.local(),
            cells: geometry.refinement_ratio(),
            table: block.table(),
        }
    }

    /// Number of slots visible through this context.
    pub fn capacity(&self) -> usize {
        self.mask.len()
    }

    /// Whether slot `n` holds a live particle. Out-of-range slots are inactive.
    pub fn is_active(&self, n: usize) -> bool {
        self.mask.get(n).copied().unwrap_or(false)
    }

    /// Whether the last computed destination of slot `n` is this block.
    pub fn is_on_current_mesh_block(&self, n: usize) -> bool {
        self.destination(n) == NeighborIndex::THIS_BLOCK
    }

    /// Flag slot `n` for removal. Idempotent.
    pub fn mark_particle_for_removal(&self, n: usize) {
        if let Some(flag) = self.marked.get(n) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Whether slot `n` is flagged for removal.
    pub fn is_marked_for_removal(&self, n: usize) -> bool {
        self.marked
            .get(n)
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Raw destination code of slot `n`, or [`NeighborIndex::INVALID`] if out of range.
    pub fn destination(&self, n: usize) -> i32 {
        self.destination
            .get(n)
            .map_or(NeighborIndex::INVALID, |d| d.load(Ordering::Relaxed))
    }

    /// Overwrite the destination code of slot `n`.
    pub fn set_destination(&self, n: usize, value: i32) {
        if let Some(d) = self.destination.get(n) {
            d.store(value, Ordering::Relaxed);
        }
    }

    /// Resolve the position `(x, y, z)` of slot `n` to a destination code
    /// and store it in the slot.
    ///
    /// Returns [`NeighborIndex::THIS_BLOCK`] for positions inside the
    /// block and a neighbor index for positions in a covered halo bucket.
    /// Unresolvable positions store [`NeighborIndex::INVALID`] and return
    /// an error naming the slot. Coordinates on inactive axes are ignored.
    pub fn get_neighbor_block_index(
        &self,
        n: usize,
        x: Real,
        y: Real,
        z: Real,
    ) -> Result<i32, ContextError> {
        let Some(slot) = self.destination.get(n) else {
            return Err(ContextError::SlotOutOfRange {
                slot: n,
                capacity: self.destination.len(),
            });
        };
        match self.lookup(n, [x, y, z]) {
            Ok(code) => {
                slot.store(code, Ordering::Relaxed);
                Ok(code)
            }
            Err(e) => {
                slot.store(NeighborIndex::INVALID, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    fn lookup(&self, n: usize, pos: [Real; 3]) -> Result<i32, ContextError> {
        let mut ijk = [0usize; 3];
        for axis in 0..self.dim.ndim() {
            let b = bucket(
                pos[axis],
                self.bounds.min[axis],
                self.bounds.max[axis],
                self.cells,
            );
            ijk[axis] = usize::try_from(b)
                .ok()
                .filter(|&b| b <= self.cells + 1)
                .ok_or(ContextError::BucketOutOfRange {
                    slot: n,
                    axis,
                    bucket: b,
                })?;
        }
        match self.table.get(ijk[0], ijk[1], ijk[2]) {
            Some(code) if code != NeighborIndex::INVALID => Ok(code),
            _ => Err(ContextError::NoNeighbor {
                slot: n,
                bucket: ijk,
            }),
        }
    }
}

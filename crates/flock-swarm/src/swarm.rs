//! A labelled particle collection bound to one mesh block.

use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use flock_core::{FieldDef, NeighborIndex, Real, SlotIndex};
use flock_mesh::MeshBlock;
use flock_pool::ParticlePool;

use crate::config::{InvalidDestination, SwarmConfig};
use crate::context::DeviceContext;
use crate::error::{ContextError, SwarmError};

/// Labels of the position fields every swarm carries.
pub const POSITION_FIELDS: [&str; 3] = ["x", "y", "z"];

/// Outcome of [`Swarm::compute_destinations`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DestinationCounts {
    /// Particles that stay on this block.
    pub local: usize,
    /// Particles bound for a neighbor block.
    pub outgoing: usize,
    /// Particles marked for removal because no neighbor covers them.
    pub removed: usize,
}

/// Particles of one species living on one mesh block.
///
/// The swarm owns its [`ParticlePool`] and keeps a weak reference to the
/// block; the block is owned elsewhere (by the mesh). Every operation that
/// needs geometry fails with [`SwarmError::BlockExpired`] once the block
/// has been dropped.
pub struct Swarm {
    label: String,
    info: String,
    block: Weak<MeshBlock>,
    pool: ParticlePool,
    config: SwarmConfig,
}

impl Swarm {
    /// Create an empty swarm on `block` with the `x`, `y`, `z` position fields.
    pub fn new(
        label: impl Into<String>,
        block: &Arc<MeshBlock>,
        config: SwarmConfig,
    ) -> Result<Self, SwarmError> {
        config.validate()?;
        let mut pool = ParticlePool::new(config.pool.clone())?;
        for label in POSITION_FIELDS {
            pool.add_field(FieldDef::real(label))?;
        }
        Ok(Self {
            label: label.into(),
            info: String::new(),
            block: Arc::downgrade(block),
            pool,
            config,
        })
    }

    /// Swarm label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Free-form description.
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Replace the free-form description.
    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    /// Configuration this swarm was built with.
    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    // ── Block binding ───────────────────────────────────────────

    /// The block this swarm lives on.
    pub fn block(&self) -> Result<Arc<MeshBlock>, SwarmError> {
        self.block.upgrade().ok_or_else(|| SwarmError::BlockExpired {
            swarm: self.label.clone(),
        })
    }

    /// Rebind the swarm to another block.
    pub fn set_block(&mut self, block: &Arc<MeshBlock>) {
        self.block = Arc::downgrade(block);
    }

    /// Build a kernel context over this swarm for `block`.
    ///
    /// `block` must be the block this swarm is bound to, typically the
    /// value returned by [`block`](Self::block).
    pub fn device_context<'a>(
        &'a self,
        block: &'a Arc<MeshBlock>,
    ) -> Result<DeviceContext<'a>, SwarmError> {
        if !std::ptr::eq(Arc::as_ptr(block), self.block.as_ptr()) {
            return Err(SwarmError::ForeignBlock {
                swarm: self.label.clone(),
            });
        }
        Ok(DeviceContext::new(&self.pool, block))
    }

    /// Run `f` with a context over the bound block.
    pub fn with_device_context<R>(
        &self,
        f: impl FnOnce(DeviceContext<'_>) -> R,
    ) -> Result<R, SwarmError> {
        let block = self.block()?;
        Ok(f(DeviceContext::new(&self.pool, &block)))
    }

    // ── Pool passthroughs ───────────────────────────────────────

    /// Underlying particle pool.
    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// Mutable access to the underlying pool.
    pub fn pool_mut(&mut self) -> &mut ParticlePool {
        &mut self.pool
    }

    /// Register an additional per-particle field.
    pub fn add_field(&mut self, def: FieldDef) -> Result<(), SwarmError> {
        Ok(self.pool.add_field(def)?)
    }

    /// Remove a field. Position fields are rejected.
    pub fn remove_field(&mut self, label: &str) -> Result<(), SwarmError> {
        if POSITION_FIELDS.contains(&label) {
            return Err(SwarmError::ReservedField {
                label: label.to_string(),
            });
        }
        Ok(self.pool.remove_field(label)?)
    }

    /// Allocate `count` zero-initialised particles.
    pub fn add_empty_particles(&mut self, count: usize) -> Result<Vec<SlotIndex>, SwarmError> {
        Ok(self.pool.add_empty_particles(count)?)
    }

    /// Free every particle flagged for removal. Returns how many were freed.
    pub fn remove_marked_particles(&mut self) -> usize {
        self.pool.remove_marked_particles()
    }

    /// Compact live particles to the front of the pool.
    pub fn defrag(&mut self) -> Vec<(SlotIndex, SlotIndex)> {
        self.pool.defrag()
    }

    /// Compact only if packing efficiency has fallen below the configured threshold.
    ///
    /// Returns the moves performed, or `None` if the pool was left alone.
    pub fn defrag_if_fragmented(&mut self) -> Option<Vec<(SlotIndex, SlotIndex)>> {
        let efficiency = self.pool.packing_efficiency();
        if efficiency >= self.config.defrag_threshold {
            return None;
        }
        let moves = self.pool.defrag();
        debug!(
            swarm = %self.label,
            efficiency,
            moved = moves.len(),
            "defragmented swarm"
        );
        Some(moves)
    }

    /// Number of live particles.
    pub fn num_active(&self) -> usize {
        self.pool.num_active()
    }

    /// Position of slot `n`.
    pub fn position(&self, n: usize) -> Result<[Real; 3], SwarmError> {
        self.check_slot(n)?;
        let [x, y, z] = self.positions()?;
        Ok([x[n], y[n], z[n]])
    }

    /// Set the position of slot `n`.
    pub fn set_position(&mut self, n: usize, pos: [Real; 3]) -> Result<(), SwarmError> {
        self.check_slot(n)?;
        for (label, value) in POSITION_FIELDS.into_iter().zip(pos) {
            self.pool.real_mut(label)?[n] = value;
        }
        Ok(())
    }

    fn check_slot(&self, n: usize) -> Result<(), SwarmError> {
        let capacity = self.pool.nmax_pool();
        if n >= capacity {
            return Err(ContextError::SlotOutOfRange { slot: n, capacity }.into());
        }
        Ok(())
    }

    fn positions(&self) -> Result<[&[Real]; 3], SwarmError> {
        Ok([
            self.pool.real("x")?,
            self.pool.real("y")?,
            self.pool.real("z")?,
        ])
    }

    // ── Destinations ────────────────────────────────────────────

    /// Resolve the destination of every live particle from its position.
    ///
    /// Particles already flagged for removal are skipped. Unresolvable
    /// positions are handled according to
    /// [`SwarmConfig::invalid_destination`].
    pub fn compute_destinations(&self) -> Result<DestinationCounts, SwarmError> {
        let block = self.block()?;
        let ctx = self.device_context(&block)?;
        let [x, y, z] = self.positions()?;
        let mut counts = DestinationCounts::default();

        for SlotIndex(n) in self.pool.active_slots() {
            if ctx.is_marked_for_removal(n) {
                continue;
            }
            match ctx.get_neighbor_block_index(n, x[n], y[n], z[n]) {
                Ok(NeighborIndex::THIS_BLOCK) => counts.local += 1,
                Ok(_) => counts.outgoing += 1,
                Err(e) => match self.config.invalid_destination {
                    InvalidDestination::Fail => return Err(e.into()),
                    InvalidDestination::Remove => {
                        warn!(
                            swarm = %self.label,
                            block = %block.id(),
                            slot = n,
                            error = %e,
                            "removing particle with no destination"
                        );
                        ctx.mark_particle_for_removal(n);
                        counts.removed += 1;
                    }
                },
            }
        }
        Ok(counts)
    }

    /// Create an empty swarm with the same label, fields and config on `block`.
    pub fn allocate_copy(&self, block: &Arc<MeshBlock>) -> Result<Swarm, SwarmError> {
        let mut copy = Swarm::new(self.label.clone(), block, self.config.clone())?;
        copy.info = self.info.clone();
        for def in self.pool.field_defs() {
            if !copy.pool.has_field(&def.label) {
                copy.pool.add_field(def)?;
            }
        }
        Ok(copy)
    }
}

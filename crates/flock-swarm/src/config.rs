//! Swarm configuration.

use flock_pool::PoolConfig;

use crate::error::SwarmError;

/// What [`Swarm::compute_destinations`](crate::Swarm::compute_destinations)
/// does with a particle whose position resolves to no neighbor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvalidDestination {
    /// Abort with the offending slot.
    #[default]
    Fail,
    /// Mark the particle for removal and keep going.
    Remove,
}

/// Configuration for a [`Swarm`](crate::Swarm).
#[derive(Clone, Debug, PartialEq)]
pub struct SwarmConfig {
    /// Slot pool sizing.
    pub pool: PoolConfig,

    /// Packing efficiency below which
    /// [`defrag_if_fragmented`](crate::Swarm::defrag_if_fragmented) compacts.
    ///
    /// Default: 0.5. Must lie in `[0, 1]`; 0 disables automatic compaction.
    pub defrag_threshold: f64,

    /// Policy for unresolvable destinations. Default: [`InvalidDestination::Fail`].
    pub invalid_destination: InvalidDestination,
}

impl SwarmConfig {
    /// Default compaction threshold.
    pub const DEFAULT_DEFRAG_THRESHOLD: f64 = 0.5;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), SwarmError> {
        self.pool.validate()?;
        if !(0.0..=1.0).contains(&self.defrag_threshold) {
            return Err(SwarmError::InvalidConfig {
                reason: format!(
                    "defrag_threshold must be in [0, 1], got {}",
                    self.defrag_threshold
                ),
            });
        }
        Ok(())
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            defrag_threshold: Self::DEFAULT_DEFRAG_THRESHOLD,
            invalid_destination: InvalidDestination::default(),
        }
    }
}

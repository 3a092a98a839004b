//! Pool configuration parameters.

use crate::error::PoolError;

/// Configuration for a particle pool.
///
/// Controls the initial slot count and the hard ceiling on growth.
/// Validated at construction; all values are immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of slots allocated up front.
    ///
    /// Default: 3. May be zero, in which case the first allocation grows
    /// the pool to one slot and doubles from there.
    pub initial_capacity: usize,

    /// Upper bound on the number of slots the pool may grow to.
    ///
    /// Default: `u32::MAX`. Growth that would exceed this fails with
    /// [`PoolError::CapacityExceeded`].
    pub max_capacity: usize,
}

impl PoolConfig {
    /// Default number of slots allocated at construction.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 3;

    /// Default growth ceiling.
    pub const DEFAULT_MAX_CAPACITY: usize = u32::MAX as usize;

    /// Create a config with the given initial capacity and the default ceiling.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            max_capacity: Self::DEFAULT_MAX_CAPACITY,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_capacity == 0 {
            return Err(PoolError::InvalidArgument {
                reason: "max_capacity must be at least 1".into(),
            });
        }
        if self.initial_capacity > self.max_capacity {
            return Err(PoolError::InvalidArgument {
                reason: format!(
                    "initial_capacity {} exceeds max_capacity {}",
                    self.initial_capacity, self.max_capacity
                ),
            });
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_INITIAL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PoolConfig::default();
        assert_eq!(config.initial_capacity, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_initial_capacity_is_valid() {
        assert!(PoolConfig::with_capacity(0).validate().is_ok());
    }

    #[test]
    fn initial_above_max_rejected() {
        let config = PoolConfig {
            initial_capacity: 16,
            max_capacity: 8,
        };
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn zero_max_rejected() {
        let config = PoolConfig {
            initial_capacity: 0,
            max_capacity: 0,
        };
        assert!(config.validate().is_err());
    }
}

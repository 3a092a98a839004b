//! Migration configuration.

use crate::error::MigrationError;

/// Configuration for a [`Migrator`](crate::Migrator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Upper bound on poll rounds [`exchange`](crate::Migrator::exchange)
    /// runs before giving up. Default: 1024.
    ///
    /// Every participant sees the same global counts, so all of them stop
    /// at the same round.
    pub max_rounds: usize,
}

impl MigrationConfig {
    /// Default round limit.
    pub const DEFAULT_MAX_ROUNDS: usize = 1024;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.max_rounds == 0 {
            return Err(MigrationError::InvalidConfig {
                reason: "max_rounds must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            max_rounds: Self::DEFAULT_MAX_ROUNDS,
        }
    }
}

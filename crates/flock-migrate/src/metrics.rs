//! Cumulative counters for particle migration.
//!
//! [`MigrationMetrics`] is owned by a [`Migrator`](crate::Migrator) and
//! updated as rounds progress; callers read it for telemetry.

/// Counters accumulated over the lifetime of one migrator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationMetrics {
    /// Communication phases that reached global quiescence.
    pub phases_completed: u64,
    /// Calls to `poll`, across all phases.
    pub polls: u64,
    /// Particles encoded and handed to the transport.
    pub particles_sent: u64,
    /// Particles decoded from incoming messages.
    pub particles_received: u64,
    /// Received particles that were already bound for another block.
    pub particles_forwarded: u64,
    /// Particles dropped because no neighbor covered their position.
    pub particles_removed: u64,
    /// Messages handed to the transport.
    pub messages_sent: u64,
    /// Messages taken from the transport.
    pub messages_received: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = MigrationMetrics::default();
        assert_eq!(m.phases_completed, 0);
        assert_eq!(m.particles_sent, 0);
        assert_eq!(m.messages_received, 0);
    }
}

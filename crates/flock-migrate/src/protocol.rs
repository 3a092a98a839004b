//! The migration round state machine.
//!
//! A round moves particles whose destination code names a neighbor block
//! to that block, repeating until no particle is pending or in flight on
//! any participant:
//!
//! ```text
//!   Idle ──start──▶ Sending ──poll──▶ AwaitingQuiescence
//!                     ▲                      │
//!                     └──finish (not done)───┤
//!                                            └─finish (done)──▶ Complete
//! ```
//!
//! Termination uses two collective sums. `start_communication` counts the
//! participants. Each `finish_communication` sums
//! `pending + sent - received` over all participants: since nobody can
//! receive a particle that was not sent, the total is zero exactly when
//! nothing is pending locally and nothing is in flight anywhere.

use tracing::{debug, trace, warn};

use indexmap::IndexMap;

use flock_core::{CommPhase, NeighborIndex, Real, SlotIndex};
use flock_swarm::{InvalidDestination, Swarm, SwarmError};

use crate::codec::{self, RecordEncoder, RecordSchema};
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::metrics::MigrationMetrics;
use crate::transport::Transport;

/// Where a migrator is in its round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationState {
    /// No phase has been started.
    Idle,
    /// A phase is open and particles may be sent or received.
    Sending,
    /// The local pass is done; waiting on the global quiescence check.
    AwaitingQuiescence,
    /// The last phase reached global quiescence.
    Complete,
}

/// Drives particle migration for one participant over a [`Transport`].
pub struct Migrator<T> {
    transport: T,
    config: MigrationConfig,
    state: MigrationState,
    phase: Option<CommPhase>,
    participants: i64,
    sent: i64,
    received: i64,
    received_this_pass: usize,
    forwarded_this_pass: usize,
    local_completed: u64,
    metrics: MigrationMetrics,
    reals: Vec<Real>,
    ints: Vec<i64>,
}

impl<T: Transport> Migrator<T> {
    /// Create an idle migrator.
    pub fn new(transport: T, config: MigrationConfig) -> Result<Self, MigrationError> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            state: MigrationState::Idle,
            phase: None,
            participants: 0,
            sent: 0,
            received: 0,
            received_this_pass: 0,
            forwarded_this_pass: 0,
            local_completed: 0,
            metrics: MigrationMetrics::default(),
            reals: Vec::new(),
            ints: Vec::new(),
        })
    }

    /// Current state.
    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// The phase currently open, if any.
    pub fn open_phase(&self) -> Option<CommPhase> {
        match self.state {
            MigrationState::Sending | MigrationState::AwaitingQuiescence => self.phase,
            MigrationState::Idle | MigrationState::Complete => None,
        }
    }

    /// Participants counted by the last `start_communication`.
    pub fn participants(&self) -> i64 {
        self.participants
    }

    /// Number of polls since construction.
    pub fn local_completed(&self) -> u64 {
        self.local_completed
    }

    /// Particles sent during the open (or last) phase.
    pub fn num_particles_sent(&self) -> i64 {
        self.sent
    }

    /// Particles received during the open (or last) phase.
    pub fn num_particles_received(&self) -> i64 {
        self.received
    }

    /// Cumulative counters.
    pub fn metrics(&self) -> &MigrationMetrics {
        &self.metrics
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn check_open(&self, requested: CommPhase) -> Result<(), MigrationError> {
        match self.open_phase() {
            None => Err(MigrationError::PhaseNotOpen { phase: requested }),
            Some(open) if open != requested => Err(MigrationError::PhaseMismatch { open, requested }),
            Some(_) => Ok(()),
        }
    }

    // ── Round operations ────────────────────────────────────────

    /// Open `phase`. Collective: every participant must call it.
    pub fn start_communication(
        &mut self,
        swarm: &Swarm,
        phase: CommPhase,
    ) -> Result<(), MigrationError> {
        if let Some(open) = self.open_phase() {
            return Err(MigrationError::PhaseAlreadyOpen { open });
        }
        swarm.block()?;
        self.sent = 0;
        self.received = 0;
        self.received_this_pass = 0;
        self.forwarded_this_pass = 0;
        self.participants = self.transport.all_reduce_sum(1)?;
        self.phase = Some(phase);
        self.state = MigrationState::Sending;
        debug!(
            rank = %self.transport.rank(),
            swarm = swarm.label(),
            %phase,
            participants = self.participants,
            "migration phase started"
        );
        Ok(())
    }

    /// Ship every particle bound for a neighbor and free its slot.
    ///
    /// One message is sent per destination neighbor. A particle is marked
    /// for removal only once its message has been handed to the transport:
    /// after a failed send, unsent particles stay pending and the counters
    /// cover only what left. Returns the number of particles sent.
    pub fn send(&mut self, swarm: &mut Swarm, phase: CommPhase) -> Result<usize, MigrationError> {
        self.check_open(phase)?;
        let block = swarm.block()?;
        let schema = RecordSchema::of(swarm.pool())?;
        let mut batches: IndexMap<usize, (RecordEncoder, Vec<usize>)> = IndexMap::new();
        {
            let ctx = swarm.device_context(&block)?;
            let pool = swarm.pool();
            for SlotIndex(n) in pool.active_slots() {
                let code = ctx.destination(n);
                if !NeighborIndex::is_neighbor(code) || ctx.is_marked_for_removal(n) {
                    continue;
                }
                if block.neighbor(code).is_none() {
                    return Err(MigrationError::UnknownNeighbor { slot: n, code });
                }
                self.reals.clear();
                self.ints.clear();
                pool.read_slot(n, &mut self.reals, &mut self.ints);
                let (encoder, slots) = batches
                    .entry(code as usize)
                    .or_insert_with(|| (RecordEncoder::new(schema), Vec::new()));
                encoder.push(&self.reals, &self.ints)?;
                slots.push(n);
            }
        }

        let mut count = 0;
        let shipped = {
            let ctx = swarm.device_context(&block)?;
            let mut shipped = Ok(());
            for (index, (batch, slots)) in batches {
                let to = block.neighbors()[index].endpoint;
                if let Err(e) = self.transport.send(phase, to, batch.finish()) {
                    shipped = Err(e);
                    break;
                }
                for &n in &slots {
                    ctx.mark_particle_for_removal(n);
                }
                trace!(
                    from = %block.id(),
                    to = %to.block,
                    %phase,
                    records = slots.len(),
                    "sent particle message"
                );
                count += slots.len();
                self.metrics.messages_sent += 1;
            }
            shipped
        };
        swarm.remove_marked_particles();
        self.forwarded_this_pass = 0;
        self.sent += count as i64;
        self.metrics.particles_sent += count as u64;
        shipped?;
        Ok(count)
    }

    /// Drain every message addressed to the swarm's block for `phase`.
    ///
    /// Arrivals are written into fresh slots, folded back through periodic
    /// boundaries, and given a new destination so that particles that
    /// crossed more than one block are relayed on the next pass. Under
    /// [`InvalidDestination::Remove`], arrivals that fall outside every
    /// neighbor are freed before returning. Returns the number of particles
    /// received.
    pub fn receive(&mut self, swarm: &mut Swarm, phase: CommPhase) -> Result<usize, MigrationError> {
        self.check_open(phase)?;
        let block = swarm.block()?;
        let schema = RecordSchema::of(swarm.pool())?;
        let mut arrivals: Vec<SlotIndex> = Vec::new();

        while let Some(bytes) = self.transport.try_recv(phase, block.id())? {
            let batch = codec::decode(&bytes, schema)?;
            let slots = swarm.add_empty_particles(batch.len())?;
            for (i, &SlotIndex(n)) in slots.iter().enumerate() {
                let (reals, ints) = batch.record(i);
                swarm.pool_mut().write_slot(n, reals, ints)?;
                let mut pos = swarm.position(n)?;
                if block.geometry().wrap_periodic(&mut pos) {
                    swarm.set_position(n, pos)?;
                }
            }
            trace!(block = %block.id(), %phase, records = slots.len(), "received particle message");
            self.metrics.messages_received += 1;
            arrivals.extend(slots);
        }

        let (mut forwarded, mut removed) = (0, 0);
        {
            let ctx = swarm.device_context(&block)?;
            for &SlotIndex(n) in &arrivals {
                let [x, y, z] = swarm.position(n)?;
                match ctx.get_neighbor_block_index(n, x, y, z) {
                    Ok(code) if NeighborIndex::is_neighbor(code) => forwarded += 1,
                    Ok(_) => {}
                    Err(e) => match swarm.config().invalid_destination {
                        InvalidDestination::Fail => return Err(SwarmError::Context(e).into()),
                        InvalidDestination::Remove => {
                            warn!(
                                block = %block.id(),
                                slot = n,
                                error = %e,
                                "dropping arrival with no destination"
                            );
                            ctx.mark_particle_for_removal(n);
                            removed += 1;
                        }
                    },
                }
            }
        }

        if removed > 0 {
            swarm.remove_marked_particles();
        }

        let count = arrivals.len();
        self.received += count as i64;
        self.received_this_pass = count;
        self.forwarded_this_pass = forwarded;
        self.metrics.particles_received += count as u64;
        self.metrics.particles_forwarded += forwarded as u64;
        self.metrics.particles_removed += removed;
        Ok(count)
    }

    /// Close the local pass. Returns `true` if this participant is locally
    /// quiescent: nothing received and nothing left to forward.
    pub fn poll(&mut self, phase: CommPhase) -> Result<bool, MigrationError> {
        self.check_open(phase)?;
        self.local_completed += 1;
        self.metrics.polls += 1;
        self.state = MigrationState::AwaitingQuiescence;
        Ok(self.received_this_pass == 0 && self.forwarded_this_pass == 0)
    }

    /// Global quiescence check. Collective: every participant must call it.
    ///
    /// Returns `true` and moves to [`MigrationState::Complete`] once no
    /// particle is pending or in flight anywhere; otherwise the phase stays
    /// open for another pass.
    pub fn finish_communication(
        &mut self,
        swarm: &Swarm,
        phase: CommPhase,
    ) -> Result<bool, MigrationError> {
        self.check_open(phase)?;
        let block = swarm.block()?;
        let pending = {
            let ctx = swarm.device_context(&block)?;
            swarm
                .pool()
                .active_slots()
                .filter(|&SlotIndex(n)| {
                    NeighborIndex::is_neighbor(ctx.destination(n)) && !ctx.is_marked_for_removal(n)
                })
                .count()
        };
        let local = pending as i64 + self.sent - self.received;
        let global = self.transport.all_reduce_sum(local)?;
        self.received_this_pass = 0;

        if global == 0 {
            self.state = MigrationState::Complete;
            self.metrics.phases_completed += 1;
            debug!(
                rank = %self.transport.rank(),
                swarm = swarm.label(),
                %phase,
                sent = self.sent,
                received = self.received,
                "migration phase complete"
            );
            Ok(true)
        } else {
            self.state = MigrationState::Sending;
            trace!(%phase, local, global, "migration phase still busy");
            Ok(false)
        }
    }

    /// Run a full round: compute destinations, then start, and repeat
    /// send / receive / poll / finish until quiescent.
    ///
    /// Returns the number of passes taken. Collective.
    pub fn exchange(&mut self, swarm: &mut Swarm, phase: CommPhase) -> Result<usize, MigrationError> {
        swarm.compute_destinations()?;
        self.start_communication(swarm, phase)?;
        for pass in 1..=self.config.max_rounds {
            self.send(swarm, phase)?;
            self.receive(swarm, phase)?;
            self.poll(phase)?;
            if self.finish_communication(swarm, phase)? {
                return Ok(pass);
            }
        }
        self.state = MigrationState::Idle;
        Err(MigrationError::NotQuiescent {
            rounds: self.config.max_rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use flock_core::{BlockId, FieldDef, Rank};
    use flock_mesh::{
        BlockBounds, BlockEndpoint, BlockGeometry, Dimensionality, MeshBlock, NeighborBlock,
    };
    use flock_swarm::SwarmConfig;

    use crate::channel::{ChannelFabric, ChannelTransport};
    use crate::error::TransportError;

    /// A single block spanning a periodic unit domain, its own neighbor on both sides.
    fn periodic_world() -> (Arc<MeshBlock>, Migrator<ChannelTransport>) {
        let me = BlockEndpoint {
            rank: Rank(0),
            block: BlockId(0),
        };
        let geom = BlockGeometry::new(
            Dimensionality::One,
            BlockBounds::new([0.0; 3], [1.0, 0.0, 0.0]),
            BlockBounds::new([0.0; 3], [1.0, 0.0, 0.0]),
        )
        .unwrap()
        .with_periodic([true, false, false]);
        let block = MeshBlock::new(
            me.block,
            me.rank,
            geom,
            vec![
                NeighborBlock::new(me, [-1, 0, 0]),
                NeighborBlock::new(me, [1, 0, 0]),
            ],
        )
        .unwrap();
        let transport = ChannelFabric::connect(&[me]).unwrap().remove(0);
        let migrator = Migrator::new(transport, MigrationConfig::default()).unwrap();
        (Arc::new(block), migrator)
    }

    fn swarm_at(block: &Arc<MeshBlock>, xs: &[Real]) -> Swarm {
        let mut swarm = Swarm::new("p", block, SwarmConfig::default()).unwrap();
        swarm.add_field(FieldDef::int("id")).unwrap();
        let slots = swarm.add_empty_particles(xs.len()).unwrap();
        for (i, (slot, &x)) in slots.iter().zip(xs).enumerate() {
            swarm.set_position(slot.0, [x, 0.0, 0.0]).unwrap();
            swarm.pool_mut().int_mut("id").unwrap()[slot.0] = i as i64;
        }
        swarm
    }

    #[test]
    fn double_start_rejected() {
        let (block, mut m) = periodic_world();
        let swarm = swarm_at(&block, &[]);
        m.start_communication(&swarm, CommPhase::All).unwrap();
        assert_eq!(
            m.start_communication(&swarm, CommPhase::MeshInit),
            Err(MigrationError::PhaseAlreadyOpen {
                open: CommPhase::All
            })
        );
    }

    #[test]
    fn finish_without_start_rejected() {
        let (block, mut m) = periodic_world();
        let swarm = swarm_at(&block, &[]);
        assert_eq!(
            m.finish_communication(&swarm, CommPhase::All),
            Err(MigrationError::PhaseNotOpen {
                phase: CommPhase::All
            })
        );
        assert_eq!(m.state(), MigrationState::Idle);
    }

    #[test]
    fn mismatched_phase_rejected() {
        let (block, mut m) = periodic_world();
        let mut swarm = swarm_at(&block, &[]);
        m.start_communication(&swarm, CommPhase::MeshInit).unwrap();
        assert_eq!(
            m.send(&mut swarm, CommPhase::All),
            Err(MigrationError::PhaseMismatch {
                open: CommPhase::MeshInit,
                requested: CommPhase::All,
            })
        );
    }

    #[test]
    fn empty_round_completes_immediately() {
        let (block, mut m) = periodic_world();
        let mut swarm = swarm_at(&block, &[0.5]);
        assert_eq!(m.exchange(&mut swarm, CommPhase::All), Ok(1));
        assert_eq!(m.participants(), 1);
        assert_eq!(m.state(), MigrationState::Complete);
        assert_eq!(m.metrics().phases_completed, 1);
        assert_eq!(swarm.num_active(), 1);
    }

    #[test]
    fn periodic_wrap_round_trip() {
        let (block, mut m) = periodic_world();
        let mut swarm = swarm_at(&block, &[1.25, 0.5, -0.25]);
        let passes = m.exchange(&mut swarm, CommPhase::All).unwrap();
        assert_eq!(passes, 1);
        assert_eq!(m.num_particles_sent(), 2);
        assert_eq!(m.num_particles_received(), 2);
        assert_eq!(swarm.num_active(), 3);

        let ids = swarm.pool().int("id").unwrap();
        let mut found: Vec<(i64, Real)> = swarm
            .pool()
            .active_slots()
            .map(|SlotIndex(n)| (ids[n], swarm.position(n).unwrap()[0]))
            .collect();
        found.sort_by_key(|&(id, _)| id);
        assert_eq!(found[1], (1, 0.5));
        assert!((found[0].1 - 0.25).abs() < 1e-12);
        assert!((found[2].1 - 0.75).abs() < 1e-12);
        for SlotIndex(n) in swarm.pool().active_slots() {
            assert_eq!(swarm.pool().destination(n), NeighborIndex::THIS_BLOCK);
        }
    }

    #[test]
    fn phase_can_be_reopened_after_completion() {
        let (block, mut m) = periodic_world();
        let mut swarm = swarm_at(&block, &[1.1]);
        m.exchange(&mut swarm, CommPhase::All).unwrap();
        m.exchange(&mut swarm, CommPhase::MeshInit).unwrap();
        assert_eq!(m.metrics().phases_completed, 2);
        assert_eq!(m.metrics().polls, 2);
        assert_eq!(m.local_completed(), 2);
    }

    #[test]
    fn poll_reports_local_quiescence() {
        let (block, mut m) = periodic_world();
        let mut swarm = swarm_at(&block, &[1.1]);
        swarm.compute_destinations().unwrap();
        m.start_communication(&swarm, CommPhase::All).unwrap();
        assert_eq!(m.send(&mut swarm, CommPhase::All), Ok(1));
        assert_eq!(m.receive(&mut swarm, CommPhase::All), Ok(1));
        assert_eq!(m.poll(CommPhase::All), Ok(false));
        assert_eq!(m.state(), MigrationState::AwaitingQuiescence);
        assert_eq!(m.finish_communication(&swarm, CommPhase::All), Ok(true));
    }

    /// Channel transport that refuses every send after the first `budget`.
    struct FailingTransport {
        inner: ChannelTransport,
        budget: std::cell::Cell<usize>,
    }

    impl Transport for FailingTransport {
        fn rank(&self) -> Rank {
            self.inner.rank()
        }

        fn send(
            &self,
            phase: CommPhase,
            to: BlockEndpoint,
            payload: Vec<u8>,
        ) -> Result<(), TransportError> {
            match self.budget.get() {
                0 => Err(TransportError::Disconnected { block: to.block }),
                n => {
                    self.budget.set(n - 1);
                    self.inner.send(phase, to, payload)
                }
            }
        }

        fn try_recv(
            &self,
            phase: CommPhase,
            block: BlockId,
        ) -> Result<Option<Vec<u8>>, TransportError> {
            self.inner.try_recv(phase, block)
        }

        fn all_reduce_sum(&self, value: i64) -> Result<i64, TransportError> {
            self.inner.all_reduce_sum(value)
        }
    }

    #[test]
    fn failed_send_keeps_unshipped_particles() {
        let (block, _) = periodic_world();
        let inner = ChannelFabric::connect(&[block.endpoint()]).unwrap().remove(0);
        let transport = FailingTransport {
            inner,
            budget: std::cell::Cell::new(1),
        };
        let mut m = Migrator::new(transport, MigrationConfig::default()).unwrap();
        // One particle per side: two messages, the second refused.
        let mut swarm = swarm_at(&block, &[-0.25, 1.25, 0.5]);
        swarm.compute_destinations().unwrap();
        m.start_communication(&swarm, CommPhase::All).unwrap();

        assert!(matches!(
            m.send(&mut swarm, CommPhase::All),
            Err(MigrationError::Transport(TransportError::Disconnected { .. }))
        ));
        assert_eq!(m.num_particles_sent(), 1);
        assert_eq!(m.metrics().particles_sent, 1);
        assert_eq!(m.metrics().messages_sent, 1);
        assert_eq!(swarm.num_active(), 2);

        let ids = swarm.pool().int("id").unwrap();
        let mut left: Vec<(i64, i32)> = swarm
            .pool()
            .active_slots()
            .map(|SlotIndex(n)| (ids[n], swarm.pool().destination(n)))
            .collect();
        left.sort_unstable();
        assert_eq!(left, vec![(1, 1), (2, NeighborIndex::THIS_BLOCK)]);

        m.transport().budget.set(1);
        assert_eq!(m.send(&mut swarm, CommPhase::All), Ok(1));
        assert_eq!(m.num_particles_sent(), 2);
        assert_eq!(swarm.num_active(), 1);
    }

    #[test]
    fn expired_block_is_fatal() {
        let (block, mut m) = periodic_world();
        let swarm = swarm_at(&block, &[0.5]);
        drop(block);
        assert!(matches!(
            m.start_communication(&swarm, CommPhase::All),
            Err(MigrationError::Swarm(SwarmError::BlockExpired { .. }))
        ));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn periodic_exchange_conserves_particles(
                xs in prop::collection::vec(-0.5f64..1.5, 0..64),
            ) {
                let (block, mut m) = periodic_world();
                let mut swarm = swarm_at(&block, &xs);
                let leaving = xs.iter().filter(|&&x| !(0.0..1.0).contains(&x)).count();

                prop_assert_eq!(m.exchange(&mut swarm, CommPhase::All), Ok(1));
                prop_assert_eq!(m.num_particles_sent(), leaving as i64);
                prop_assert_eq!(swarm.num_active(), xs.len());

                let ids = swarm.pool().int("id").unwrap();
                let mut seen: Vec<i64> = swarm
                    .pool()
                    .active_slots()
                    .map(|SlotIndex(n)| ids[n])
                    .collect();
                seen.sort_unstable();
                prop_assert_eq!(seen, (0..xs.len() as i64).collect::<Vec<_>>());
                for SlotIndex(n) in swarm.pool().active_slots() {
                    let x = swarm.position(n).unwrap()[0];
                    prop_assert!((0.0..1.0).contains(&x), "slot {} at {}", n, x);
                }
            }
        }
    }
}

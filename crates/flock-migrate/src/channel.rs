//! In-process transport over crossbeam channels.
//!
//! [`ChannelFabric::connect`] builds one unbounded channel per
//! `(block, phase)` mailbox and hands back one [`ChannelTransport`] per
//! participant. Each participant is expected to run on its own thread;
//! the sum reduction blocks until every participant has contributed.

use std::cell::Cell;
use std::sync::{Arc, Barrier, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use indexmap::IndexMap;

use flock_core::{BlockId, CommPhase, Rank};
use flock_mesh::BlockEndpoint;

use crate::error::TransportError;
use crate::transport::Transport;

type Mailbox = (Sender<Vec<u8>>, Receiver<Vec<u8>>);

/// Collective sum over a fixed number of parties.
///
/// Alternates between two accumulators by round parity. The leader of
/// round `r` clears the accumulator of round `r + 1` between the two
/// barrier waits, before any party can start that round.
struct Reducer {
    sums: Mutex<[i64; 2]>,
    barrier: Barrier,
}

impl Reducer {
    fn new(parties: usize) -> Self {
        Self {
            sums: Mutex::new([0; 2]),
            barrier: Barrier::new(parties),
        }
    }

    fn reduce(&self, round: u64, value: i64) -> i64 {
        let slot = (round % 2) as usize;
        self.sums.lock().unwrap_or_else(PoisonError::into_inner)[slot] += value;
        let leader = self.barrier.wait().is_leader();
        let total = {
            let mut sums = self.sums.lock().unwrap_or_else(PoisonError::into_inner);
            if leader {
                sums[1 - slot] = 0;
            }
            sums[slot]
        };
        self.barrier.wait();
        total
    }
}

struct Shared {
    mailboxes: IndexMap<BlockId, [Mailbox; CommPhase::COUNT]>,
    reducer: Reducer,
}

/// Builder for a set of connected in-process transports.
pub struct ChannelFabric;

impl ChannelFabric {
    /// Create one transport per participant, each owning the mailbox of
    /// the block at the same position in `participants`.
    pub fn connect(participants: &[BlockEndpoint]) -> Result<Vec<ChannelTransport>, TransportError> {
        let mut mailboxes: IndexMap<BlockId, [Mailbox; CommPhase::COUNT]> =
            IndexMap::with_capacity(participants.len());
        for endpoint in participants {
            let boxes = std::array::from_fn(|_| crossbeam_channel::unbounded());
            if mailboxes.insert(endpoint.block, boxes).is_some() {
                return Err(TransportError::DuplicateBlock {
                    block: endpoint.block,
                });
            }
        }
        let shared = Arc::new(Shared {
            mailboxes,
            reducer: Reducer::new(participants.len().max(1)),
        });
        Ok(participants
            .iter()
            .map(|&endpoint| ChannelTransport {
                endpoint,
                shared: Arc::clone(&shared),
                round: Cell::new(0),
            })
            .collect())
    }
}

/// One participant's handle onto a [`ChannelFabric`].
pub struct ChannelTransport {
    endpoint: BlockEndpoint,
    shared: Arc<Shared>,
    round: Cell<u64>,
}

impl ChannelTransport {
    /// Block whose mailbox this participant owns.
    pub fn endpoint(&self) -> BlockEndpoint {
        self.endpoint
    }

    fn mailbox(&self, phase: CommPhase, block: BlockId) -> Result<&Mailbox, TransportError> {
        self.shared
            .mailboxes
            .get(&block)
            .map(|boxes| &boxes[phase.index()])
            .ok_or(TransportError::UnknownBlock { block })
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> Rank {
        self.endpoint.rank
    }

    fn send(
        &self,
        phase: CommPhase,
        to: BlockEndpoint,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        let (tx, _) = self.mailbox(phase, to.block)?;
        tx.send(payload)
            .map_err(|_| TransportError::Disconnected { block: to.block })
    }

    fn try_recv(
        &self,
        phase: CommPhase,
        block: BlockId,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        if block != self.endpoint.block {
            return Err(TransportError::NotOwner { block });
        }
        let (_, rx) = self.mailbox(phase, block)?;
        match rx.try_recv() {
            Ok(payload) => Ok(Some(payload)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected { block }),
        }
    }

    fn all_reduce_sum(&self, value: i64) -> Result<i64, TransportError> {
        let round = self.round.get();
        self.round.set(round + 1);
        Ok(self.shared.reducer.reduce(round, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(n: u64) -> Vec<BlockEndpoint> {
        (0..n)
            .map(|i| BlockEndpoint {
                rank: Rank(i as u32),
                block: BlockId(i),
            })
            .collect()
    }

    #[test]
    fn messages_are_separated_by_phase() {
        let mut transports = ChannelFabric::connect(&endpoints(2)).unwrap();
        let b = transports.pop().unwrap();
        let a = transports.pop().unwrap();

        a.send(CommPhase::All, b.endpoint(), vec![1, 2]).unwrap();
        assert_eq!(b.try_recv(CommPhase::MeshInit, BlockId(1)).unwrap(), None);
        assert_eq!(
            b.try_recv(CommPhase::All, BlockId(1)).unwrap(),
            Some(vec![1, 2])
        );
        assert_eq!(b.try_recv(CommPhase::All, BlockId(1)).unwrap(), None);
    }

    #[test]
    fn foreign_mailbox_rejected() {
        let transports = ChannelFabric::connect(&endpoints(2)).unwrap();
        assert_eq!(
            transports[0].try_recv(CommPhase::All, BlockId(1)),
            Err(TransportError::NotOwner { block: BlockId(1) })
        );
        let stranger = BlockEndpoint {
            rank: Rank(9),
            block: BlockId(9),
        };
        assert_eq!(
            transports[0].send(CommPhase::All, stranger, Vec::new()),
            Err(TransportError::UnknownBlock { block: BlockId(9) })
        );
    }

    #[test]
    fn duplicate_block_rejected() {
        let mut eps = endpoints(2);
        eps[1].block = BlockId(0);
        assert!(matches!(
            ChannelFabric::connect(&eps),
            Err(TransportError::DuplicateBlock { .. })
        ));
    }

    #[test]
    fn single_participant_reduces_to_itself() {
        let transports = ChannelFabric::connect(&endpoints(1)).unwrap();
        assert_eq!(transports[0].all_reduce_sum(5).unwrap(), 5);
        assert_eq!(transports[0].all_reduce_sum(-2).unwrap(), -2);
    }

    #[test]
    fn repeated_reductions_across_threads() {
        let transports = ChannelFabric::connect(&endpoints(4)).unwrap();
        let totals: Vec<Vec<i64>> = std::thread::scope(|s| {
            let handles: Vec<_> = transports
                .into_iter()
                .enumerate()
                .map(|(i, t)| {
                    s.spawn(move || {
                        (0..50)
                            .map(|round| t.all_reduce_sum(i as i64 + round).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for per_rank in &totals {
            for (round, &total) in per_rank.iter().enumerate() {
                assert_eq!(total, 6 + 4 * round as i64);
            }
        }
    }
}

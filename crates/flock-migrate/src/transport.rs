//! The message-passing seam between migrating swarms.

use flock_core::{BlockId, CommPhase, Rank};
use flock_mesh::BlockEndpoint;

use crate::error::TransportError;

/// Point-to-point messaging plus a global sum reduction.
///
/// One transport handle belongs to one participant. Messages are tagged
/// with their [`CommPhase`] and addressed to a block; delivery is assumed
/// reliable but unordered across senders. [`all_reduce_sum`] is
/// collective: every participant must call it the same number of times.
///
/// [`all_reduce_sum`]: Transport::all_reduce_sum
pub trait Transport {
    /// Rank of the calling participant.
    fn rank(&self) -> Rank;

    /// Queue `payload` for the block at `to`.
    fn send(
        &self,
        phase: CommPhase,
        to: BlockEndpoint,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// Take the next pending message for `block`, if any. Never blocks.
    fn try_recv(&self, phase: CommPhase, block: BlockId)
        -> Result<Option<Vec<u8>>, TransportError>;

    /// Sum `value` over all participants and return the total.
    fn all_reduce_sum(&self, value: i64) -> Result<i64, TransportError>;
}

//! Error types for particle migration.

use std::error::Error;
use std::fmt;

use flock_core::{BlockId, CommPhase};
use flock_swarm::SwarmError;

/// Failures reported by a [`Transport`](crate::Transport).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// No mailbox exists for the addressed block.
    UnknownBlock {
        /// The unknown block.
        block: BlockId,
    },
    /// The caller tried to read a mailbox it does not own.
    NotOwner {
        /// Block whose mailbox was requested.
        block: BlockId,
    },
    /// The peer side of a channel has gone away.
    Disconnected {
        /// Block whose mailbox was unreachable.
        block: BlockId,
    },
    /// Two participants registered the same block.
    DuplicateBlock {
        /// The block registered twice.
        block: BlockId,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownBlock { block } => write!(f, "no mailbox for block {block}"),
            Self::NotOwner { block } => {
                write!(f, "mailbox of block {block} belongs to another participant")
            }
            Self::Disconnected { block } => write!(f, "mailbox of block {block} disconnected"),
            Self::DuplicateBlock { block } => write!(f, "block {block} registered twice"),
        }
    }
}

impl Error for TransportError {}

/// Errors that can occur while migrating particles between blocks.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationError {
    /// `start_communication` was called while a phase is still open.
    PhaseAlreadyOpen {
        /// The phase currently open.
        open: CommPhase,
    },
    /// An operation needing an open phase was called while idle.
    PhaseNotOpen {
        /// The phase the caller asked for.
        phase: CommPhase,
    },
    /// The caller named a phase other than the open one.
    PhaseMismatch {
        /// The phase currently open.
        open: CommPhase,
        /// The phase the caller asked for.
        requested: CommPhase,
    },
    /// A particle's destination code does not name a neighbor of its block.
    UnknownNeighbor {
        /// Slot carrying the bad code.
        slot: usize,
        /// The destination code.
        code: i32,
    },
    /// The exchange did not reach quiescence within the configured rounds.
    NotQuiescent {
        /// Poll rounds executed.
        rounds: usize,
    },
    /// `MigrationConfig` failed validation.
    InvalidConfig {
        /// Description of the violated invariant.
        reason: String,
    },
    /// A particle message could not be encoded or decoded.
    Codec {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The transport failed.
    Transport(TransportError),
    /// A swarm operation failed.
    Swarm(SwarmError),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PhaseAlreadyOpen { open } => {
                write!(f, "communication phase '{open}' is already open")
            }
            Self::PhaseNotOpen { phase } => {
                write!(f, "communication phase '{phase}' was never started")
            }
            Self::PhaseMismatch { open, requested } => {
                write!(f, "phase '{requested}' requested while '{open}' is open")
            }
            Self::UnknownNeighbor { slot, code } => {
                write!(f, "particle {slot} has destination {code} with no neighbor")
            }
            Self::NotQuiescent { rounds } => {
                write!(f, "migration not quiescent after {rounds} rounds")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid migration config: {reason}"),
            Self::Codec { detail } => write!(f, "codec: {detail}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Swarm(e) => write!(f, "swarm: {e}"),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Swarm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for MigrationError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<SwarmError> for MigrationError {
    fn from(e: SwarmError) -> Self {
        Self::Swarm(e)
    }
}

impl From<flock_pool::PoolError> for MigrationError {
    fn from(e: flock_pool::PoolError) -> Self {
        Self::Swarm(SwarmError::Pool(e))
    }
}

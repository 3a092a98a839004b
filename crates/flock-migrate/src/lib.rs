//! Particle migration between mesh blocks.
//!
//! A [`Migrator`] moves every particle whose destination names a neighbor
//! block to that block over a [`Transport`], relaying particles that
//! crossed more than one block until the whole system is quiescent.
//!
//! # Layers
//!
//! - [`codec`]: little-endian record encoding in field registration order.
//! - [`Transport`]: point-to-point messages plus a collective sum.
//! - [`ChannelFabric`]: in-process transport, one participant per thread.
//! - [`Migrator`]: the start / send / receive / poll / finish state machine.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod transport;

pub use channel::{ChannelFabric, ChannelTransport};
pub use codec::{RecordBatch, RecordEncoder, RecordSchema};
pub use config::MigrationConfig;
pub use error::{MigrationError, TransportError};
pub use metrics::MigrationMetrics;
pub use protocol::{MigrationState, Migrator};
pub use transport::Transport;

//! Core types for the Flock particle framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the identifiers and field descriptors shared by the pool, mesh,
//! swarm, and migration crates.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod field;
pub mod id;

pub use field::{FieldDef, FieldKind};
pub use id::{BlockId, CommPhase, NeighborIndex, Rank, Real, SlotIndex};

//! Test fixtures for Flock development.
//!
//! Builds small meshes of blocks (a 1D line, a 2D grid) with consistent
//! neighbor lists, and swarms populated at given positions with an `id`
//! field that survives migration.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    block_grid, block_line, particle_ids, populated_swarm, unit_domain, ID_FIELD,
};

//! Particle slot pools for Flock swarms.
//!
//! Provides a sparse, growable slot arena with a free list, typed
//! per-slot field columns, and explicit compaction.
//!
//! # Architecture
//!
//! ```text
//! ParticlePool
//! ├── SlotMask (liveness bitmap + free-index stack)
//! ├── marked_for_removal: Vec<AtomicBool>
//! ├── destination: Vec<AtomicI32>
//! └── IndexMap<label, FieldColumn> (Real / Int, one entry per slot)
//! ```
//!
//! # Lifecycle
//!
//! - **Allocate:** [`ParticlePool::add_empty_particles`] reuses free slots,
//!   doubling capacity only when the free list runs dry.
//! - **Remove:** kernels flag slots; [`ParticlePool::remove_marked_particles`]
//!   returns them to the free list without moving memory.
//! - **Compact:** [`ParticlePool::defrag`] packs live particles into
//!   `[0, num_active)` when the caller decides fragmentation is costly.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod column;
pub mod config;
pub mod error;
pub mod pool;
pub mod slots;

pub use column::FieldColumn;
pub use config::PoolConfig;
pub use error::PoolError;
pub use pool::{ParticlePool, PoolStats};
pub use slots::SlotMask;

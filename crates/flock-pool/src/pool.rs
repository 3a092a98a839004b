//! The growable, defragmentable particle pool.
//!
//! [`ParticlePool`] owns every per-slot array of one swarm: the liveness
//! mask, the removal flags, the destination codes, and one typed column
//! per registered field. Slot indices are stable until [`defrag`] is
//! called explicitly; growth never moves a live particle.
//!
//! Removal flags and destination codes are stored as atomics so that a
//! shared borrow of the pool can be handed to many kernel threads at once,
//! each writing only its own slot.
//!
//! [`defrag`]: ParticlePool::defrag

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use indexmap::IndexMap;

use flock_core::{FieldDef, FieldKind, NeighborIndex, Real, SlotIndex};

use crate::column::FieldColumn;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::slots::SlotMask;

/// Point-in-time pool statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolStats {
    /// Current slot capacity.
    pub nmax_pool: usize,
    /// Number of live particles.
    pub num_active: usize,
    /// Highest slot occupied since the last defragmentation.
    pub max_active_index: Option<usize>,
    /// `num_active / (max_active_index + 1)`, or 1.0 for an empty span.
    pub packing_efficiency: f64,
    /// Slots available for reuse without growing.
    pub free_count: usize,
}

/// Sparse, growable slot arena for particles.
///
/// # Invariants
///
/// - `num_active <= max_active_index + 1 <= nmax_pool`
/// - every free-list index is inactive, every inactive index is free
/// - every column has exactly `nmax_pool` entries
pub struct ParticlePool {
    config: PoolConfig,
    slots: SlotMask,
    marked_for_removal: Vec<AtomicBool>,
    destination: Vec<AtomicI32>,
    columns: IndexMap<String, FieldColumn>,
    num_active: usize,
    /// `max_active_index + 1`; zero when nothing is occupied.
    span: usize,
}

impl ParticlePool {
    /// Create an empty pool with no registered fields.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let capacity = config.initial_capacity;
        Ok(Self {
            slots: SlotMask::new(capacity),
            marked_for_removal: (0..capacity).map(|_| AtomicBool::new(false)).collect(),
            destination: (0..capacity)
                .map(|_| AtomicI32::new(NeighborIndex::THIS_BLOCK))
                .collect(),
            columns: IndexMap::new(),
            num_active: 0,
            span: 0,
            config,
        })
    }

    // ── Statistics ──────────────────────────────────────────────

    /// Current slot capacity.
    pub fn nmax_pool(&self) -> usize {
        self.slots.capacity()
    }

    /// Number of live particles.
    pub fn num_active(&self) -> usize {
        self.num_active
    }

    /// Highest slot index occupied since the last defragmentation.
    ///
    /// An upper bound on live indices, not a tight count. `None` when no
    /// slot has been occupied.
    pub fn max_active_index(&self) -> Option<usize> {
        self.span.checked_sub(1)
    }

    /// Ratio of live particles to occupied span. 1.0 means fully packed.
    pub fn packing_efficiency(&self) -> f64 {
        if self.span == 0 {
            return 1.0;
        }
        self.num_active as f64 / self.span as f64
    }

    /// Number of slots available without growing.
    pub fn free_count(&self) -> usize {
        self.slots.free_count()
    }

    /// Free slot indices, in no particular order.
    pub fn free_indices(&self) -> &[usize] {
        self.slots.free_indices()
    }

    /// Snapshot of all statistics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            nmax_pool: self.nmax_pool(),
            num_active: self.num_active,
            max_active_index: self.max_active_index(),
            packing_efficiency: self.packing_efficiency(),
            free_count: self.free_count(),
        }
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    // ── Slot views ──────────────────────────────────────────────

    /// Whether slot `n` holds a live particle.
    pub fn is_active(&self, n: usize) -> bool {
        self.slots.is_active(n)
    }

    /// Liveness mask, one entry per slot.
    pub fn mask(&self) -> &[bool] {
        self.slots.as_slice()
    }

    /// Removal flags, one per slot.
    pub fn marked_for_removal(&self) -> &[AtomicBool] {
        &self.marked_for_removal
    }

    /// Destination codes, one per slot. See [`NeighborIndex`].
    pub fn destinations(&self) -> &[AtomicI32] {
        &self.destination
    }

    /// Destination code of slot `n`, or [`NeighborIndex::INVALID`] if out of range.
    pub fn destination(&self, n: usize) -> i32 {
        self.destination
            .get(n)
            .map(|d| d.load(Ordering::Relaxed))
            .unwrap_or(NeighborIndex::INVALID)
    }

    /// Flag slot `n` for removal on the next [`remove_marked_particles`](Self::remove_marked_particles).
    pub fn mark_for_removal(&self, n: usize) {
        if let Some(flag) = self.marked_for_removal.get(n) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Live slot indices within the occupied span, ascending.
    pub fn active_slots(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        (0..self.span)
            .filter(move |&n| self.slots.is_active(n))
            .map(SlotIndex)
    }

    // ── Growth ──────────────────────────────────────────────────

    /// Grow the pool to exactly `n` slots.
    ///
    /// All columns are reallocated; live particles keep their index and
    /// values. Equal capacity is a no-op. Shrinking is rejected.
    pub fn set_pool_max(&mut self, n: usize) -> Result<(), PoolError> {
        let current = self.nmax_pool();
        if n < current {
            return Err(PoolError::InvalidArgument {
                reason: format!("cannot shrink pool from {current} to {n} slots"),
            });
        }
        if n > self.config.max_capacity {
            return Err(PoolError::CapacityExceeded {
                requested: n,
                max: self.config.max_capacity,
            });
        }
        if n == current {
            return Ok(());
        }
        self.slots.grow(n);
        self.marked_for_removal
            .resize_with(n, || AtomicBool::new(false));
        self.destination
            .resize_with(n, || AtomicI32::new(NeighborIndex::THIS_BLOCK));
        for column in self.columns.values_mut() {
            column.resize(n);
        }
        Ok(())
    }

    /// Double the pool capacity (an empty pool grows to one slot).
    pub fn increase_pool_max(&mut self) -> Result<(), PoolError> {
        let next = self.doubled(self.nmax_pool())?;
        self.set_pool_max(next)
    }

    fn doubled(&self, n: usize) -> Result<usize, PoolError> {
        n.checked_mul(2)
            .map(|d| d.max(1))
            .ok_or(PoolError::CapacityExceeded {
                requested: usize::MAX,
                max: self.config.max_capacity,
            })
    }

    // ── Allocation ──────────────────────────────────────────────

    /// Activate `count` empty particles and return their slots.
    ///
    /// Free slots are reused first, in no guaranteed order. When the free
    /// list is exhausted the capacity doubles until everything fits (capped
    /// at the configured maximum). New particles have zeroed fields, are
    /// unmarked, and stay on the current block.
    pub fn add_empty_particles(&mut self, count: usize) -> Result<Vec<SlotIndex>, PoolError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let max = self.config.max_capacity;
        let required = self
            .num_active
            .checked_add(count)
            .ok_or(PoolError::CapacityExceeded {
                requested: usize::MAX,
                max,
            })?;
        if required > max {
            return Err(PoolError::CapacityExceeded {
                requested: required,
                max,
            });
        }
        if required > self.nmax_pool() {
            let mut target = self.nmax_pool().max(1);
            while target < required {
                target = self.doubled(target)?;
            }
            self.set_pool_max(target.min(max))?;
        }

        let indices = self.slots.acquire(count);
        for &n in &indices {
            *self.marked_for_removal[n].get_mut() = false;
            *self.destination[n].get_mut() = NeighborIndex::THIS_BLOCK;
            for column in self.columns.values_mut() {
                column.reset_slot(n);
            }
            self.span = self.span.max(n + 1);
        }
        self.num_active += indices.len();
        Ok(indices.into_iter().map(SlotIndex).collect())
    }

    /// Free every slot flagged for removal and return how many were freed.
    ///
    /// Does not move memory and does not shrink `max_active_index`.
    pub fn remove_marked_particles(&mut self) -> usize {
        let mut removed = 0;
        for n in 0..self.span {
            let flag = self.marked_for_removal[n].get_mut();
            if !*flag {
                continue;
            }
            *flag = false;
            if self.slots.is_active(n) {
                self.slots.release(n);
                *self.destination[n].get_mut() = NeighborIndex::THIS_BLOCK;
                removed += 1;
            }
        }
        self.num_active -= removed;
        removed
    }

    /// Compact live particles into `[0, num_active)`.
    ///
    /// Every live slot at or above `num_active` moves into a hole below it,
    /// carrying all of its columns, flags, and destination. Returns the
    /// `(from, to)` moves performed so callers holding slot indices can
    /// remap them. An already packed pool yields no moves.
    pub fn defrag(&mut self) -> Vec<(SlotIndex, SlotIndex)> {
        let live = self.num_active;
        if self.span == live {
            return Vec::new();
        }

        let holes = (0..live).filter(|&n| !self.slots.is_active(n));
        let movers: Vec<usize> = (live..self.span)
            .filter(|&n| self.slots.is_active(n))
            .collect();
        let moves: Vec<(usize, usize)> = movers.into_iter().zip(holes).collect();

        for &(from, to) in &moves {
            self.copy_slot(from, to);
        }
        for n in live..self.span {
            *self.marked_for_removal[n].get_mut() = false;
            *self.destination[n].get_mut() = NeighborIndex::THIS_BLOCK;
        }
        self.slots.compact(live);
        self.span = live;

        moves
            .into_iter()
            .map(|(from, to)| (SlotIndex(from), SlotIndex(to)))
            .collect()
    }

    fn copy_slot(&mut self, from: usize, to: usize) {
        for column in self.columns.values_mut() {
            column.copy_slot(from, to);
        }
        let marked = *self.marked_for_removal[from].get_mut();
        *self.marked_for_removal[to].get_mut() = marked;
        let dest = *self.destination[from].get_mut();
        *self.destination[to].get_mut() = dest;
    }

    // ── Field registry ──────────────────────────────────────────

    /// Register a new zero-filled column.
    pub fn add_field(&mut self, def: FieldDef) -> Result<(), PoolError> {
        def.validate()
            .map_err(|reason| PoolError::InvalidField { reason })?;
        if self.columns.contains_key(&def.label) {
            return Err(PoolError::DuplicateField { label: def.label });
        }
        let column = FieldColumn::new(def.kind, self.nmax_pool());
        self.columns.insert(def.label, column);
        Ok(())
    }

    /// Drop a column. Remaining columns keep their relative order.
    pub fn remove_field(&mut self, label: &str) -> Result<(), PoolError> {
        self.columns
            .shift_remove(label)
            .map(|_| ())
            .ok_or_else(|| PoolError::UnknownField {
                label: label.to_string(),
            })
    }

    /// Whether a column with this label exists.
    pub fn has_field(&self, label: &str) -> bool {
        self.columns.contains_key(label)
    }

    /// Registered fields in registration order.
    pub fn field_defs(&self) -> impl Iterator<Item = FieldDef> + '_ {
        self.columns.iter().map(|(label, column)| FieldDef {
            label: label.clone(),
            kind: column.kind(),
        })
    }

    /// Number of registered columns.
    pub fn particle_data_size(&self) -> usize {
        self.columns.len()
    }

    /// Number of registered columns of the given kind.
    pub fn field_count(&self, kind: FieldKind) -> usize {
        self.columns.values().filter(|c| c.kind() == kind).count()
    }

    /// All columns in registration order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &FieldColumn)> {
        self.columns.iter().map(|(label, column)| (label.as_str(), column))
    }

    /// Real values of a field, indexed by slot.
    pub fn real(&self, label: &str) -> Result<&[Real], PoolError> {
        let column = self.column(label)?;
        column
            .as_real()
            .ok_or_else(|| kind_mismatch(label, FieldKind::Real, column.kind()))
    }

    /// Mutable real values of a field, indexed by slot.
    pub fn real_mut(&mut self, label: &str) -> Result<&mut [Real], PoolError> {
        let column = self.column_mut(label)?;
        let found = column.kind();
        column
            .as_real_mut()
            .ok_or_else(|| kind_mismatch(label, FieldKind::Real, found))
    }

    /// Integer values of a field, indexed by slot.
    pub fn int(&self, label: &str) -> Result<&[i64], PoolError> {
        let column = self.column(label)?;
        column
            .as_int()
            .ok_or_else(|| kind_mismatch(label, FieldKind::Int, column.kind()))
    }

    /// Mutable integer values of a field, indexed by slot.
    pub fn int_mut(&mut self, label: &str) -> Result<&mut [i64], PoolError> {
        let column = self.column_mut(label)?;
        let found = column.kind();
        column
            .as_int_mut()
            .ok_or_else(|| kind_mismatch(label, FieldKind::Int, found))
    }

    /// Read every field of slot `n` in registration order.
    ///
    /// Real columns append to `reals`, integer columns to `ints`.
    pub fn read_slot(&self, n: usize, reals: &mut Vec<Real>, ints: &mut Vec<i64>) {
        for column in self.columns.values() {
            match column {
                FieldColumn::Real(v) => reals.push(v[n]),
                FieldColumn::Int(v) => ints.push(v[n]),
            }
        }
    }

    /// Overwrite every field of slot `n` from registration-ordered values.
    ///
    /// Returns `InvalidArgument` if the value counts do not match the
    /// registered columns; the slot is left untouched in that case.
    pub fn write_slot(&mut self, n: usize, reals: &[Real], ints: &[i64]) -> Result<(), PoolError> {
        let expected_reals = self.field_count(FieldKind::Real);
        let expected_ints = self.field_count(FieldKind::Int);
        if reals.len() != expected_reals || ints.len() != expected_ints {
            return Err(PoolError::InvalidArgument {
                reason: format!(
                    "slot record has {} real / {} int values, pool has {expected_reals} / {expected_ints} fields",
                    reals.len(),
                    ints.len()
                ),
            });
        }
        let (mut r, mut i) = (reals.iter(), ints.iter());
        for column in self.columns.values_mut() {
            match column {
                FieldColumn::Real(v) => {
                    if let Some(&value) = r.next() {
                        v[n] = value;
                    }
                }
                FieldColumn::Int(v) => {
                    if let Some(&value) = i.next() {
                        v[n] = value;
                    }
                }
            }
        }
        Ok(())
    }

    fn column(&self, label: &str) -> Result<&FieldColumn, PoolError> {
        self.columns.get(label).ok_or_else(|| PoolError::UnknownField {
            label: label.to_string(),
        })
    }

    fn column_mut(&mut self, label: &str) -> Result<&mut FieldColumn, PoolError> {
        self.columns
            .get_mut(label)
            .ok_or_else(|| PoolError::UnknownField {
                label: label.to_string(),
            })
    }
}

fn kind_mismatch(label: &str, expected: FieldKind, found: FieldKind) -> PoolError {
    PoolError::FieldKindMismatch {
        label: label.to_string(),
        expected,
        found,
    }
}

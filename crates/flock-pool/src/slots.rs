//! Slot liveness mask and free list.
//!
//! [`SlotMask`] is the leaf of the pool: one `bool` per slot plus the set
//! of slots that are currently free. Every inactive slot below the
//! capacity is on the free list, so `free_count() == capacity() - live`.

/// Liveness bitmap and free-index stack for a fixed-capacity slot array.
///
/// The free list is a stack. Freshly grown slots are placed at the bottom
/// so that previously freed slots are always reused first.
#[derive(Clone, Debug)]
pub struct SlotMask {
    active: Vec<bool>,
    free_list: Vec<usize>,
}

impl SlotMask {
    /// Create a mask with `capacity` inactive slots, all free.
    pub fn new(capacity: usize) -> Self {
        Self {
            active: vec![false; capacity],
            // Reversed so the lowest index is popped first.
            free_list: (0..capacity).rev().collect(),
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.active.len()
    }

    /// Whether slot `n` holds a live particle. Out-of-range slots are inactive.
    pub fn is_active(&self, n: usize) -> bool {
        self.active.get(n).copied().unwrap_or(false)
    }

    /// The raw mask, one entry per slot.
    pub fn as_slice(&self) -> &[bool] {
        &self.active
    }

    /// Number of slots available for reuse.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Currently free slot indices, in no particular order.
    pub fn free_indices(&self) -> &[usize] {
        &self.free_list
    }

    /// Activate up to `count` free slots and return their indices.
    ///
    /// Returns fewer than `count` indices only if the free list runs dry;
    /// callers are expected to grow first.
    pub fn acquire(&mut self, count: usize) -> Vec<usize> {
        let at = self.free_list.len().saturating_sub(count);
        let mut taken = self.free_list.split_off(at);
        taken.reverse();
        for &n in &taken {
            self.active[n] = true;
        }
        taken
    }

    /// Deactivate slot `n` and return it to the free list.
    ///
    /// Releasing an inactive slot is a no-op, so the free list never
    /// holds duplicates.
    pub fn release(&mut self, n: usize) {
        if self.is_active(n) {
            self.active[n] = false;
            self.free_list.push(n);
        }
    }

    /// Extend the mask to `new_capacity` slots. Shrinking is ignored.
    pub fn grow(&mut self, new_capacity: usize) {
        let old = self.capacity();
        if new_capacity <= old {
            return;
        }
        self.active.resize(new_capacity, false);
        self.free_list.splice(0..0, (old..new_capacity).rev());
    }

    /// Reset to the packed layout: `[0, live)` active, everything else free.
    pub fn compact(&mut self, live: usize) {
        let capacity = self.capacity();
        let live = live.min(capacity);
        for (n, slot) in self.active.iter_mut().enumerate() {
            *slot = n < live;
        }
        self.free_list.clear();
        self.free_list.extend((live..capacity).rev());
    }
}

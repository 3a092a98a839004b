//! Neighbor descriptors and the octant lookup table.
//!
//! A block split into `r` interior buckets per axis (the refinement
//! ratio) plus a one-bucket halo on each side has `(r + 2)^ndim` octant
//! regions. [`NeighborTable`] maps each region to the index of the
//! neighbor that owns it, [`NeighborIndex::THIS_BLOCK`] for the interior,
//! or [`NeighborIndex::INVALID`] where no neighbor exists (a non-periodic
//! domain edge).

use smallvec::{smallvec, SmallVec};

use flock_core::{BlockId, NeighborIndex, Rank};

use crate::error::GeometryError;
use crate::geometry::Dimensionality;

/// Transport address of a block: the owning rank plus the block's id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockEndpoint {
    /// Rank that owns the block.
    pub rank: Rank,
    /// Global block identifier.
    pub block: BlockId,
}

/// One entry in a block's neighbor list.
///
/// `offset` selects the region relative to the current block (`-1`, `0`,
/// `+1` per axis). For a finer neighbor that covers only part of a shared
/// face or edge, `part[axis] = Some(p)` narrows an offset-0 axis to the
/// single interior bucket `1 + p`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NeighborBlock {
    /// Where to send particles bound for this neighbor.
    pub endpoint: BlockEndpoint,
    /// Region offset per axis.
    pub offset: [i8; 3],
    /// Sub-bucket along offset-0 axes for finer neighbors.
    pub part: [Option<u8>; 3],
}

impl NeighborBlock {
    /// A same-level or coarser neighbor covering the whole region at `offset`.
    pub fn new(endpoint: BlockEndpoint, offset: [i8; 3]) -> Self {
        Self {
            endpoint,
            offset,
            part: [None; 3],
        }
    }

    /// Restrict an offset-0 axis to one interior bucket (finer neighbor).
    pub fn with_part(mut self, axis: usize, part: u8) -> Self {
        self.part[axis] = Some(part);
        self
    }
}

/// Dense `(k, j, i)` lookup table from octant bucket to neighbor index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborTable {
    dim: Dimensionality,
    extent: usize,
    entries: Vec<i32>,
}

impl NeighborTable {
    /// Build the table for a block with `cells` interior buckets per axis.
    ///
    /// Neighbor `n` of `neighbors` is recorded as index `n`. Inactive axes
    /// only use bucket 0 and require a zero offset.
    pub fn build(
        dim: Dimensionality,
        cells: usize,
        neighbors: &[NeighborBlock],
    ) -> Result<Self, GeometryError> {
        if cells == 0 {
            return Err(GeometryError::InvalidRefinementRatio { value: cells });
        }
        let extent = cells + 2;
        let mut table = Self {
            dim,
            extent,
            entries: vec![NeighborIndex::INVALID; extent * extent * extent],
        };

        let interior: [SmallVec<[usize; 4]>; 3] = std::array::from_fn(|axis| {
            if dim.is_active(axis) {
                (1..=cells).collect()
            } else {
                smallvec![0]
            }
        });
        for &k in &interior[2] {
            for &j in &interior[1] {
                for &i in &interior[0] {
                    let at = table.offset_of(i, j, k);
                    table.entries[at] = NeighborIndex::THIS_BLOCK;
                }
            }
        }

        for (index, neighbor) in neighbors.iter().enumerate() {
            let code = i32::try_from(index).map_err(|_| GeometryError::InvalidNeighbor {
                index,
                reason: "neighbor index does not fit in i32".into(),
            })?;
            let ranges = table.covered_buckets(index, neighbor)?;
            for &k in &ranges[2] {
                for &j in &ranges[1] {
                    for &i in &ranges[0] {
                        let at = table.offset_of(i, j, k);
                        let existing = table.entries[at];
                        if existing != NeighborIndex::INVALID {
                            return Err(GeometryError::OverlappingNeighbors {
                                first: existing.max(0) as usize,
                                second: index,
                                bucket: [i, j, k],
                            });
                        }
                        table.entries[at] = code;
                    }
                }
            }
        }
        Ok(table)
    }

    fn covered_buckets(
        &self,
        index: usize,
        neighbor: &NeighborBlock,
    ) -> Result<[SmallVec<[usize; 4]>; 3], GeometryError> {
        let cells = self.extent - 2;
        let invalid = |reason: String| GeometryError::InvalidNeighbor { index, reason };
        if neighbor.offset == [0, 0, 0] {
            return Err(invalid("offset (0, 0, 0) is the block itself".into()));
        }
        let mut ranges: [SmallVec<[usize; 4]>; 3] = Default::default();
        for axis in 0..3 {
            let offset = neighbor.offset[axis];
            let part = neighbor.part[axis];
            if !self.dim.is_active(axis) {
                if offset != 0 || part.is_some() {
                    return Err(invalid(format!("axis {axis} is inactive")));
                }
                ranges[axis] = smallvec![0];
                continue;
            }
            ranges[axis] = match (offset, part) {
                (-1, None) => smallvec![0],
                (1, None) => smallvec![cells + 1],
                (0, None) => (1..=cells).collect(),
                (0, Some(p)) if (p as usize) < cells => smallvec![1 + p as usize],
                (0, Some(p)) => {
                    return Err(invalid(format!(
                        "part {p} on axis {axis} exceeds {cells} buckets"
                    )))
                }
                (_, Some(_)) => {
                    return Err(invalid(format!(
                        "part on axis {axis} requires a zero offset"
                    )))
                }
                (o, None) => return Err(invalid(format!("offset {o} on axis {axis}"))),
            };
        }
        Ok(ranges)
    }

    fn offset_of(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.extent + j) * self.extent + i
    }

    /// Buckets per axis (`refinement ratio + 2`).
    pub fn extent(&self) -> usize {
        self.extent
    }

    /// Dimensionality the table was built for.
    pub fn dim(&self) -> Dimensionality {
        self.dim
    }

    /// Entry at `(i, j, k)`, or `None` if any bucket is outside the table.
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<i32> {
        if i >= self.extent || j >= self.extent || k >= self.extent {
            return None;
        }
        Some(self.entries[self.offset_of(i, j, k)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(n: u64) -> BlockEndpoint {
        BlockEndpoint {
            rank: Rank(0),
            block: BlockId(n),
        }
    }

    #[test]
    fn one_d_edges_map_to_neighbors() {
        let neighbors = [
            NeighborBlock::new(endpoint(1), [-1, 0, 0]),
            NeighborBlock::new(endpoint(2), [1, 0, 0]),
        ];
        let table = NeighborTable::build(Dimensionality::One, 2, &neighbors).unwrap();
        assert_eq!(table.extent(), 4);
        assert_eq!(table.get(0, 0, 0), Some(0));
        assert_eq!(table.get(1, 0, 0), Some(NeighborIndex::THIS_BLOCK));
        assert_eq!(table.get(2, 0, 0), Some(NeighborIndex::THIS_BLOCK));
        assert_eq!(table.get(3, 0, 0), Some(1));
        assert_eq!(table.get(1, 1, 0), Some(NeighborIndex::INVALID));
        assert_eq!(table.get(4, 0, 0), None);
    }

    #[test]
    fn missing_neighbor_is_invalid() {
        let neighbors = [NeighborBlock::new(endpoint(1), [1, 0, 0])];
        let table = NeighborTable::build(Dimensionality::One, 2, &neighbors).unwrap();
        assert_eq!(table.get(0, 0, 0), Some(NeighborIndex::INVALID));
    }

    #[test]
    fn two_d_face_and_corner() {
        let neighbors = [
            NeighborBlock::new(endpoint(1), [1, 0, 0]),
            NeighborBlock::new(endpoint(2), [1, 1, 0]),
        ];
        let table = NeighborTable::build(Dimensionality::Two, 2, &neighbors).unwrap();
        assert_eq!(table.get(3, 1, 0), Some(0));
        assert_eq!(table.get(3, 2, 0), Some(0));
        assert_eq!(table.get(3, 3, 0), Some(1));
        assert_eq!(table.get(2, 2, 0), Some(NeighborIndex::THIS_BLOCK));
        assert_eq!(table.get(0, 0, 0), Some(NeighborIndex::INVALID));
    }

    #[test]
    fn finer_neighbors_split_a_face() {
        let neighbors = [
            NeighborBlock::new(endpoint(1), [0, 1, 0]).with_part(0, 0),
            NeighborBlock::new(endpoint(2), [0, 1, 0]).with_part(0, 1),
        ];
        let table = NeighborTable::build(Dimensionality::Two, 2, &neighbors).unwrap();
        assert_eq!(table.get(1, 3, 0), Some(0));
        assert_eq!(table.get(2, 3, 0), Some(1));
    }

    #[test]
    fn three_d_full_shell_has_no_gaps() {
        let mut neighbors = Vec::new();
        for oz in -1i8..=1 {
            for oy in -1i8..=1 {
                for ox in -1i8..=1 {
                    if (ox, oy, oz) != (0, 0, 0) {
                        neighbors.push(NeighborBlock::new(
                            endpoint(neighbors.len() as u64),
                            [ox, oy, oz],
                        ));
                    }
                }
            }
        }
        let table = NeighborTable::build(Dimensionality::Three, 2, &neighbors).unwrap();
        for k in 0..4 {
            for j in 0..4 {
                for i in 0..4 {
                    assert_ne!(table.get(i, j, k), Some(NeighborIndex::INVALID));
                }
            }
        }
    }

    #[test]
    fn overlap_rejected() {
        let neighbors = [
            NeighborBlock::new(endpoint(1), [1, 0, 0]),
            NeighborBlock::new(endpoint(2), [1, 0, 0]),
        ];
        let err = NeighborTable::build(Dimensionality::One, 2, &neighbors).unwrap_err();
        assert_eq!(
            err,
            GeometryError::OverlappingNeighbors {
                first: 0,
                second: 1,
                bucket: [3, 0, 0],
            }
        );
    }

    #[test]
    fn offset_on_inactive_axis_rejected() {
        let neighbors = [NeighborBlock::new(endpoint(1), [0, 1, 0])];
        assert!(matches!(
            NeighborTable::build(Dimensionality::One, 2, &neighbors),
            Err(GeometryError::InvalidNeighbor { index: 0, .. })
        ));
    }

    #[test]
    fn self_offset_rejected() {
        let neighbors = [NeighborBlock::new(endpoint(1), [0, 0, 0])];
        assert!(NeighborTable::build(Dimensionality::Three, 2, &neighbors).is_err());
    }

    #[test]
    fn part_out_of_range_rejected() {
        let neighbors = [NeighborBlock::new(endpoint(1), [1, 0, 0]).with_part(1, 2)];
        assert!(NeighborTable::build(Dimensionality::Two, 2, &neighbors).is_err());
    }

    #[test]
    fn higher_refinement_ratio_widens_table() {
        let neighbors = [NeighborBlock::new(endpoint(1), [1, 0, 0])];
        let table = NeighborTable::build(Dimensionality::One, 4, &neighbors).unwrap();
        assert_eq!(table.extent(), 6);
        assert_eq!(table.get(4, 0, 0), Some(NeighborIndex::THIS_BLOCK));
        assert_eq!(table.get(5, 0, 0), Some(0));
    }
}

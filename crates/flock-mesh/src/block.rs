//! A single mesh block: identity, geometry, and its neighbor topology.

use flock_core::{BlockId, NeighborIndex, Rank};

use crate::error::GeometryError;
use crate::geometry::BlockGeometry;
use crate::neighbor::{BlockEndpoint, NeighborBlock, NeighborTable};

/// One block of the distributed mesh.
///
/// Blocks are shared through `Arc`; swarms keep only a `Weak` reference
/// back to the block they live on. The neighbor table is built once at
/// construction from the geometry's refinement ratio and never changes.
#[derive(Clone, Debug)]
pub struct MeshBlock {
    id: BlockId,
    rank: Rank,
    geometry: BlockGeometry,
    neighbors: Vec<NeighborBlock>,
    table: NeighborTable,
}

impl MeshBlock {
    /// Create a block and build its neighbor table.
    pub fn new(
        id: BlockId,
        rank: Rank,
        geometry: BlockGeometry,
        neighbors: Vec<NeighborBlock>,
    ) -> Result<Self, GeometryError> {
        let table = NeighborTable::build(geometry.dim(), geometry.refinement_ratio(), &neighbors)?;
        Ok(Self {
            id,
            rank,
            geometry,
            neighbors,
            table,
        })
    }

    /// Global block id.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Rank owning this block.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Transport address of this block.
    pub fn endpoint(&self) -> BlockEndpoint {
        BlockEndpoint {
            rank: self.rank,
            block: self.id,
        }
    }

    /// Geometry (bounds, periodicity, refinement ratio).
    pub fn geometry(&self) -> &BlockGeometry {
        &self.geometry
    }

    /// Neighbor list, in table-index order.
    pub fn neighbors(&self) -> &[NeighborBlock] {
        &self.neighbors
    }

    /// Octant lookup table.
    pub fn table(&self) -> &NeighborTable {
        &self.table
    }

    /// Neighbor addressed by a destination code, if `code` is a neighbor index.
    pub fn neighbor(&self, code: i32) -> Option<&NeighborBlock> {
        if !NeighborIndex::is_neighbor(code) {
            return None;
        }
        self.neighbors.get(code as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BlockBounds, Dimensionality};

    fn geometry() -> BlockGeometry {
        BlockGeometry::new(
            Dimensionality::One,
            BlockBounds::new([0.25, 0.0, 0.0], [0.75, 0.0, 0.0]),
            BlockBounds::new([0.0; 3], [1.0; 3]),
        )
        .unwrap()
    }

    fn neighbor(id: u64, dx: i8) -> NeighborBlock {
        NeighborBlock::new(
            BlockEndpoint {
                rank: Rank(1),
                block: BlockId(id),
            },
            [dx, 0, 0],
        )
    }

    #[test]
    fn block_builds_table_from_geometry() {
        let block = MeshBlock::new(
            BlockId(7),
            Rank(0),
            geometry(),
            vec![neighbor(6, -1), neighbor(8, 1)],
        )
        .unwrap();
        assert_eq!(block.table().extent(), 4);
        assert_eq!(block.endpoint().block, BlockId(7));
        assert_eq!(block.neighbor(1).map(|n| n.endpoint.block), Some(BlockId(8)));
        assert!(block.neighbor(NeighborIndex::THIS_BLOCK).is_none());
        assert!(block.neighbor(2).is_none());
    }

    #[test]
    fn table_tracks_refinement_ratio() {
        let geom = geometry().with_refinement_ratio(3).unwrap();
        let block = MeshBlock::new(BlockId(0), Rank(0), geom, vec![neighbor(1, 1)]).unwrap();
        assert_eq!(block.table().extent(), 5);
        assert_eq!(block.table().get(4, 0, 0), Some(0));
    }

    #[test]
    fn bad_neighbor_fails_construction() {
        let err = MeshBlock::new(BlockId(0), Rank(0), geometry(), vec![neighbor(1, 0)]);
        assert!(matches!(err, Err(GeometryError::InvalidNeighbor { .. })));
    }
}

//! Block bounding boxes, dimensionality, and the octant bucket formula.

use flock_core::Real;

use crate::error::GeometryError;

/// Number of spatial dimensions a mesh resolves.
///
/// Unused axes collapse: a 1D block ignores `y` and `z` entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimensionality {
    /// Only `x` is resolved.
    One,
    /// `x` and `y` are resolved.
    Two,
    /// All three axes are resolved.
    Three,
}

impl Dimensionality {
    /// Number of active axes.
    pub fn ndim(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Whether `axis` (0 = x, 1 = y, 2 = z) is resolved.
    pub fn is_active(self, axis: usize) -> bool {
        axis < self.ndim()
    }

    /// Build from an axis count in `1..=3`.
    pub fn from_ndim(ndim: usize) -> Option<Self> {
        match ndim {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => None,
        }
    }
}

/// Axis-aligned bounding box. Inactive axes are ignored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockBounds {
    /// Lower corner `(x, y, z)`.
    pub min: [Real; 3],
    /// Upper corner `(x, y, z)`.
    pub max: [Real; 3],
}

impl BlockBounds {
    /// Construct from corners.
    pub fn new(min: [Real; 3], max: [Real; 3]) -> Self {
        Self { min, max }
    }

    /// Extent along `axis`.
    pub fn width(&self, axis: usize) -> Real {
        self.max[axis] - self.min[axis]
    }

    /// Whether `p` lies in `[min, max)` along `axis`.
    pub fn contains_on(&self, axis: usize, p: Real) -> bool {
        p >= self.min[axis] && p < self.max[axis]
    }

    fn validate(&self, dim: Dimensionality) -> Result<(), GeometryError> {
        for axis in 0..dim.ndim() {
            let (min, max) = (self.min[axis], self.max[axis]);
            if !min.is_finite() || !max.is_finite() || min >= max {
                return Err(GeometryError::InvalidBounds { axis, min, max });
            }
        }
        Ok(())
    }
}

/// Geometry of one mesh block as seen by its particles.
///
/// Carries the block's own bounds, the global domain bounds, per-axis
/// periodicity, and the refinement ratio used to split the block into
/// octant buckets.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockGeometry {
    dim: Dimensionality,
    local: BlockBounds,
    global: BlockBounds,
    periodic: [bool; 3],
    refinement_ratio: usize,
}

impl BlockGeometry {
    /// Default refinement ratio between adjacent levels.
    pub const DEFAULT_REFINEMENT_RATIO: usize = 2;

    /// Create a geometry with the default refinement ratio and no periodic axes.
    ///
    /// Returns an error if any active axis is degenerate or the block is
    /// not contained in the global domain.
    pub fn new(
        dim: Dimensionality,
        local: BlockBounds,
        global: BlockBounds,
    ) -> Result<Self, GeometryError> {
        local.validate(dim)?;
        global.validate(dim)?;
        for axis in 0..dim.ndim() {
            if local.min[axis] < global.min[axis] || local.max[axis] > global.max[axis] {
                return Err(GeometryError::OutsideDomain { axis });
            }
        }
        Ok(Self {
            dim,
            local,
            global,
            periodic: [false; 3],
            refinement_ratio: Self::DEFAULT_REFINEMENT_RATIO,
        })
    }

    /// Mark axes as periodic. Flags on inactive axes are ignored.
    pub fn with_periodic(mut self, periodic: [bool; 3]) -> Self {
        for (axis, flag) in periodic.into_iter().enumerate() {
            self.periodic[axis] = flag && self.dim.is_active(axis);
        }
        self
    }

    /// Override the refinement ratio (number of interior buckets per axis).
    pub fn with_refinement_ratio(mut self, ratio: usize) -> Result<Self, GeometryError> {
        if ratio == 0 {
            return Err(GeometryError::InvalidRefinementRatio { value: ratio });
        }
        self.refinement_ratio = ratio;
        Ok(self)
    }

    /// Dimensionality.
    pub fn dim(&self) -> Dimensionality {
        self.dim
    }

    /// This block's bounds.
    pub fn local(&self) -> &BlockBounds {
        &self.local
    }

    /// The global domain bounds.
    pub fn global(&self) -> &BlockBounds {
        &self.global
    }

    /// Per-axis periodicity.
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Interior buckets per axis.
    pub fn refinement_ratio(&self) -> usize {
        self.refinement_ratio
    }

    /// Whether a position lies inside this block on every active axis.
    pub fn contains(&self, pos: [Real; 3]) -> bool {
        (0..self.dim.ndim()).all(|axis| self.local.contains_on(axis, pos[axis]))
    }

    /// Fold a position that left the domain through a periodic axis back inside.
    ///
    /// Returns `true` if any coordinate changed. Non-periodic axes are
    /// left untouched even when out of the domain.
    pub fn wrap_periodic(&self, pos: &mut [Real; 3]) -> bool {
        let mut changed = false;
        for axis in 0..self.dim.ndim() {
            if !self.periodic[axis] {
                continue;
            }
            let (lo, width) = (self.global.min[axis], self.global.width(axis));
            let p = pos[axis];
            if p < lo || p >= lo + width {
                let wrapped = lo + (p - lo).rem_euclid(width);
                // rem_euclid can round up to exactly `width` for tiny negatives.
                pos[axis] = if wrapped >= lo + width { lo } else { wrapped };
                changed = true;
            }
        }
        changed
    }
}

/// Octant bucket of coordinate `p` along one axis.
///
/// The block `[min, max)` is split into `cells` equal interior buckets
/// numbered `1..=cells`; one bucket-wide halo on each side gives bucket
/// `0` below and `cells + 1` above. Anything further out lands outside
/// `0..=cells + 1`. Non-finite input yields `-1`.
pub fn bucket(p: Real, min: Real, max: Real, cells: usize) -> i64 {
    let width = (max - min) / cells as Real;
    let q = ((p - min) / width).floor();
    if !q.is_finite() {
        return -1;
    }
    (q as i64).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> BlockBounds {
        BlockBounds::new([0.0; 3], [1.0; 3])
    }

    #[test]
    fn halo_buckets_on_unit_block() {
        assert_eq!(bucket(-0.3, 0.0, 1.0, 2), 0);
        assert_eq!(bucket(0.1, 0.0, 1.0, 2), 1);
        assert_eq!(bucket(0.6, 0.0, 1.0, 2), 2);
        assert_eq!(bucket(1.2, 0.0, 1.0, 2), 3);
        assert_eq!(bucket(1.6, 0.0, 1.0, 2), 4);
        assert_eq!(bucket(-0.6, 0.0, 1.0, 2), -1);
    }

    #[test]
    fn bucket_follows_refinement_ratio() {
        assert_eq!(bucket(0.9, 0.0, 1.0, 4), 4);
        assert_eq!(bucket(1.1, 0.0, 1.0, 4), 5);
    }

    #[test]
    fn nan_bucket_is_out_of_range() {
        assert_eq!(bucket(Real::NAN, 0.0, 1.0, 2), -1);
    }

    #[test]
    fn huge_coordinate_saturates() {
        assert_eq!(bucket(1e300, 0.0, 1.0, 2), i64::MAX);
        assert_eq!(bucket(-1e300, 0.0, 1.0, 2), i64::MIN + 1);
    }

    #[test]
    fn degenerate_axis_rejected() {
        let local = BlockBounds::new([0.0, 0.0, 0.0], [1.0, 0.0, 1.0]);
        let err = BlockGeometry::new(Dimensionality::Two, local, unit());
        assert!(matches!(err, Err(GeometryError::InvalidBounds { axis: 1, .. })));
    }

    #[test]
    fn degenerate_inactive_axis_ignored() {
        let local = BlockBounds::new([0.0, 0.0, 0.0], [0.5, 0.0, 0.0]);
        assert!(BlockGeometry::new(Dimensionality::One, local, unit()).is_ok());
    }

    #[test]
    fn block_outside_domain_rejected() {
        let local = BlockBounds::new([0.5; 3], [1.5; 3]);
        let err = BlockGeometry::new(Dimensionality::Three, local, unit());
        assert_eq!(err, Err(GeometryError::OutsideDomain { axis: 0 }));
    }

    #[test]
    fn zero_refinement_ratio_rejected() {
        let geom = BlockGeometry::new(Dimensionality::One, unit(), unit()).unwrap();
        assert!(geom.with_refinement_ratio(0).is_err());
    }

    #[test]
    fn wrap_periodic_folds_into_domain() {
        let geom = BlockGeometry::new(
            Dimensionality::Two,
            BlockBounds::new([0.0; 3], [0.5, 1.0, 1.0]),
            unit(),
        )
        .unwrap()
        .with_periodic([true, false, true]);
        assert_eq!(geom.periodic(), [true, false, false]);

        let mut pos = [1.25, 1.5, 7.0];
        assert!(geom.wrap_periodic(&mut pos));
        assert!((pos[0] - 0.25).abs() < 1e-12);
        assert_eq!(pos[1], 1.5);
        assert_eq!(pos[2], 7.0);

        let mut neg = [-0.25, 0.5, 0.0];
        assert!(geom.wrap_periodic(&mut neg));
        assert!((neg[0] - 0.75).abs() < 1e-12);

        let mut inside = [0.3, 0.3, 0.0];
        assert!(!geom.wrap_periodic(&mut inside));
    }

    #[test]
    fn contains_checks_active_axes_only() {
        let geom = BlockGeometry::new(
            Dimensionality::One,
            BlockBounds::new([0.0; 3], [0.5, 0.0, 0.0]),
            unit(),
        )
        .unwrap();
        assert!(geom.contains([0.25, 99.0, -4.0]));
        assert!(!geom.contains([0.75, 0.0, 0.0]));
    }
}

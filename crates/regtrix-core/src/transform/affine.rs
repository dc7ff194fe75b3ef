//! Affine transform between a source and a reference grid.
//!
//! The matrix is always held in world convention (source world millimetres to
//! reference world millimetres). Matrices supplied in FSL convention are
//! converted once at construction and the FSL form is not retained.

use crate::error::{Result, TransformError};
use crate::geometry::{self, Matrix4};
use crate::space::{Convention, ConventionInfo, VoxelGrid};

/// Single 4x4 affine, source to reference, world convention.
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    src2ref: Matrix4,
    source: Option<VoxelGrid>,
    reference: Option<VoxelGrid>,
    convention: ConventionInfo,
}

impl Affine {
    /// Create an affine transform.
    ///
    /// # Arguments
    /// * `matrix` - 4x4 source-to-reference matrix in `convention`
    /// * `source` - Optional source grid
    /// * `reference` - Optional reference grid
    /// * `convention` - Convention of `matrix`. When `None`, FSL is assumed if
    ///   both grids are given, world otherwise; the choice is recorded in
    ///   [`Affine::convention`].
    ///
    /// # Errors
    /// `InvalidBottomRow` for non-affine matrices, `MissingGrid` when FSL
    /// convention is requested without both grids.
    pub fn new(
        matrix: Matrix4,
        source: Option<VoxelGrid>,
        reference: Option<VoxelGrid>,
        convention: Option<Convention>,
    ) -> Result<Self> {
        geometry::validate_affine(&matrix)?;
        let info = ConventionInfo::resolve(convention, source.is_some() && reference.is_some());

        let src2ref = match info.convention {
            Convention::World => matrix,
            Convention::Fsl => {
                let (src, rf) = source.as_ref().zip(reference.as_ref()).ok_or_else(|| {
                    TransformError::missing_grid("FSL convention requires both source and reference grids")
                })?;
                rf.fsl2world() * matrix * src.world2fsl()
            }
        };

        Ok(Self {
            src2ref,
            source,
            reference,
            convention: info,
        })
    }

    /// World-convention affine without grid context.
    pub fn from_world(matrix: Matrix4) -> Result<Self> {
        Self::new(matrix, None, None, Some(Convention::World))
    }

    /// World-convention affine between optional grids.
    pub fn from_world_with_grids(
        matrix: Matrix4,
        source: Option<VoxelGrid>,
        reference: Option<VoxelGrid>,
    ) -> Result<Self> {
        Self::new(matrix, source, reference, Some(Convention::World))
    }

    /// The neutral transform.
    pub fn identity(source: Option<VoxelGrid>, reference: Option<VoxelGrid>) -> Self {
        Self {
            src2ref: Matrix4::identity(),
            source,
            reference,
            convention: ConventionInfo::world(),
        }
    }

    /// Source-to-reference matrix, world convention.
    pub fn matrix(&self) -> &Matrix4 {
        &self.src2ref
    }

    /// Reference-to-source matrix, world convention.
    pub fn ref2src(&self) -> Result<Matrix4> {
        geometry::invert(&self.src2ref, "affine transform")
    }

    /// Source grid, if known.
    pub fn source_grid(&self) -> Option<&VoxelGrid> {
        self.source.as_ref()
    }

    /// Reference grid, if known.
    pub fn reference_grid(&self) -> Option<&VoxelGrid> {
        self.reference.as_ref()
    }

    /// Convention the input matrix was interpreted in.
    pub fn convention(&self) -> ConventionInfo {
        self.convention
    }

    /// Express the matrix in FSL convention for the given grids.
    ///
    /// `ref.world2fsl @ src2ref @ src.fsl2world`
    pub fn to_legacy(&self, source: &VoxelGrid, reference: &VoxelGrid) -> Matrix4 {
        reference.world2fsl() * self.src2ref * source.fsl2world()
    }

    /// Reference-to-source transform with the grids swapped.
    pub fn inverse(&self) -> Result<Self> {
        Ok(Self {
            src2ref: self.ref2src()?,
            source: self.reference,
            reference: self.source,
            convention: ConventionInfo::world(),
        })
    }

    /// Move a grid through this transform without resampling its data.
    pub fn apply_to_grid(&self, grid: &VoxelGrid) -> Result<VoxelGrid> {
        grid.transform(&self.src2ref)
    }

    pub(crate) fn with_parts(
        src2ref: Matrix4,
        source: Option<VoxelGrid>,
        reference: Option<VoxelGrid>,
    ) -> Self {
        Self {
            src2ref,
            source,
            reference,
            convention: ConventionInfo::world(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Direction3, Point3, Vector3d};

    fn grid(shape: [usize; 3], origin: [f64; 3], spacing: f64) -> VoxelGrid {
        VoxelGrid::from_spacing(
            shape,
            Point3::new(origin[0], origin[1], origin[2]),
            Vector3d::new(spacing, spacing, spacing),
            Direction3::identity(),
        )
        .unwrap()
    }

    fn translation(x: f64, y: f64, z: f64) -> Matrix4 {
        Matrix4::new_translation(&Vector3d::new(x, y, z))
    }

    #[test]
    fn test_rejects_perspective_row() {
        let mut m = Matrix4::identity();
        m[(3, 2)] = 1.0;
        assert!(matches!(
            Affine::from_world(m).unwrap_err(),
            TransformError::InvalidBottomRow(_)
        ));
    }

    #[test]
    fn test_default_convention_without_grids_is_world() {
        let m = translation(1.0, 2.0, 3.0);
        let affine = Affine::new(m, None, None, None).unwrap();
        assert_eq!(affine.convention().convention, Convention::World);
        assert!(affine.convention().defaulted);
        assert_eq!(affine.matrix(), &m);
    }

    #[test]
    fn test_default_convention_with_grids_is_fsl() {
        let src = grid([10, 10, 10], [0.0, 0.0, 0.0], 2.0);
        let rf = grid([20, 20, 20], [5.0, 0.0, 0.0], 1.0);
        let affine = Affine::new(Matrix4::identity(), Some(src), Some(rf), None).unwrap();
        assert_eq!(affine.convention().convention, Convention::Fsl);
        assert!(affine.convention().defaulted);
    }

    #[test]
    fn test_fsl_requires_grids() {
        let err = Affine::new(Matrix4::identity(), None, None, Some(Convention::Fsl)).unwrap_err();
        assert!(matches!(err, TransformError::MissingGrid(_)));
    }

    #[test]
    fn test_fsl_roundtrip_through_legacy() {
        let src = grid([10, 12, 14], [-10.0, 4.0, 2.0], 2.0);
        let rf = grid([20, 20, 20], [5.0, 0.0, -3.0], 1.5);
        let fsl = translation(3.0, -1.0, 0.5);

        let affine = Affine::new(fsl, Some(src), Some(rf), Some(Convention::Fsl)).unwrap();
        let back = affine.to_legacy(&src, &rf);
        for r in 0..4 {
            for c in 0..4 {
                assert!((back[(r, c)] - fsl[(r, c)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_fsl_identity_between_same_grid_is_world_identity() {
        let g = grid([16, 16, 16], [-8.0, -8.0, -8.0], 1.0);
        let affine = Affine::new(Matrix4::identity(), Some(g), Some(g), Some(Convention::Fsl)).unwrap();
        for r in 0..4 {
            for c in 0..4 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((affine.matrix()[(r, c)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_inverse_swaps_grids() {
        let src = grid([10, 10, 10], [0.0, 0.0, 0.0], 1.0);
        let rf = grid([20, 20, 20], [0.0, 0.0, 0.0], 0.5);
        let affine = Affine::from_world_with_grids(translation(1.0, 0.0, 0.0), Some(src), Some(rf)).unwrap();
        let inv = affine.inverse().unwrap();
        assert_eq!(inv.source_grid(), Some(&rf));
        assert_eq!(inv.reference_grid(), Some(&src));
        assert_eq!(inv.matrix()[(0, 3)], -1.0);
    }

    #[test]
    fn test_inverse_of_singular_fails() {
        let mut m = Matrix4::identity();
        m[(1, 1)] = 0.0;
        let affine = Affine::from_world(m).unwrap();
        assert!(matches!(affine.inverse().unwrap_err(), TransformError::SingularMatrix(_)));
    }

    #[test]
    fn test_apply_to_grid() {
        let g = grid([4, 4, 4], [0.0, 0.0, 0.0], 1.0);
        let affine = Affine::from_world(translation(2.0, 0.0, 0.0)).unwrap();
        let moved = affine.apply_to_grid(&g).unwrap();
        assert_eq!(moved.origin(), Point3::new(2.0, 0.0, 0.0));
    }
}

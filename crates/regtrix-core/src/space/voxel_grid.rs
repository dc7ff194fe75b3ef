//! Voxel grid descriptor.
//!
//! A [`VoxelGrid`] is the geometry of a 3D image: its shape and the affine that
//! maps voxel indices to world coordinates. Two grids are equal when their
//! geometry is equal, regardless of where they were loaded from.

use nalgebra::Matrix3;

use crate::error::{Result, TransformError};
use crate::geometry::{self, Direction3, Matrix4, Point3, Vector3d};

/// Immutable geometry of a 3D voxel grid.
///
/// # Coordinate Systems
/// * **Voxel**: continuous indices `(i, j, k)` into the data array
/// * **World**: scanner millimetre coordinates, `world = vox2world @ voxel`
/// * **FSL**: voxel indices scaled by voxel size, with the first axis flipped
///   when the voxel-to-world matrix has a positive determinant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelGrid {
    shape: [usize; 3],
    vox2world: Matrix4,
    world2vox: Matrix4,
    fsl2world: Matrix4,
    world2fsl: Matrix4,
}

impl VoxelGrid {
    /// Create a grid from its shape and voxel-to-world matrix.
    ///
    /// # Errors
    /// Rejects zero extents, a non-affine bottom row and singular matrices.
    pub fn new(shape: [usize; 3], vox2world: Matrix4) -> Result<Self> {
        if shape.iter().any(|&n| n == 0) {
            return Err(TransformError::invalid_grid(format!(
                "shape must be positive along every axis, got {shape:?}"
            )));
        }
        geometry::validate_affine(&vox2world)?;
        let world2vox = geometry::invert(&vox2world, "voxel-to-world matrix")?;

        let vox2fsl = Self::vox2fsl(shape, &vox2world);
        let fsl2vox = geometry::invert(&vox2fsl, "voxel-to-FSL matrix")?;
        let fsl2world = vox2world * fsl2vox;
        let world2fsl = vox2fsl * world2vox;

        Ok(Self {
            shape,
            vox2world,
            world2vox,
            fsl2world,
            world2fsl,
        })
    }

    /// Create a grid from origin, spacing and direction cosines.
    ///
    /// `world = origin + direction * (index * spacing)`
    pub fn from_spacing(
        shape: [usize; 3],
        origin: Point3,
        spacing: Vector3d,
        direction: Direction3,
    ) -> Result<Self> {
        let linear = direction * Matrix3::from_diagonal(&spacing);
        let mut vox2world = Matrix4::identity();
        vox2world.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
        vox2world[(0, 3)] = origin.x;
        vox2world[(1, 3)] = origin.y;
        vox2world[(2, 3)] = origin.z;
        Self::new(shape, vox2world)
    }

    /// Grid with unit spacing, identity direction and origin at zero.
    pub fn unit(shape: [usize; 3]) -> Result<Self> {
        Self::new(shape, Matrix4::identity())
    }

    fn vox2fsl(shape: [usize; 3], vox2world: &Matrix4) -> Matrix4 {
        let linear = vox2world.fixed_view::<3, 3>(0, 0);
        let pixdim = Vector3d::new(
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        );
        let mut vox2fsl = Matrix4::new_nonuniform_scaling(&pixdim);

        // Radiological storage: FSL flips the first voxel axis.
        if linear.determinant() > 0.0 {
            let mut flip = Matrix4::identity();
            flip[(0, 0)] = -1.0;
            flip[(0, 3)] = (shape[0] - 1) as f64;
            vox2fsl *= flip;
        }
        vox2fsl
    }

    /// Grid shape `[nx, ny, nz]`.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Total number of voxels.
    pub fn voxel_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Voxel-to-world matrix.
    pub fn vox2world(&self) -> &Matrix4 {
        &self.vox2world
    }

    /// World-to-voxel matrix.
    pub fn world2vox(&self) -> &Matrix4 {
        &self.world2vox
    }

    /// FSL-to-world matrix.
    pub fn fsl2world(&self) -> &Matrix4 {
        &self.fsl2world
    }

    /// World-to-FSL matrix.
    pub fn world2fsl(&self) -> &Matrix4 {
        &self.world2fsl
    }

    /// Voxel size along each axis.
    pub fn spacing(&self) -> Vector3d {
        let linear = self.vox2world.fixed_view::<3, 3>(0, 0);
        Vector3d::new(
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        )
    }

    /// World coordinate of voxel `(0, 0, 0)`.
    pub fn origin(&self) -> Point3 {
        Point3::new(self.vox2world[(0, 3)], self.vox2world[(1, 3)], self.vox2world[(2, 3)])
    }

    /// Convert a continuous voxel index to a world point.
    pub fn index_to_world(&self, index: &Point3) -> Point3 {
        geometry::transform_point(&self.vox2world, index)
    }

    /// Convert a world point to a continuous voxel index.
    pub fn world_to_index(&self, point: &Point3) -> Point3 {
        geometry::transform_point(&self.world2vox, point)
    }

    /// Move the grid within world space without touching voxel data.
    ///
    /// The returned grid has `vox2world' = matrix @ vox2world`.
    pub fn transform(&self, matrix: &Matrix4) -> Result<Self> {
        Self::new(self.shape, matrix * self.vox2world)
    }
}

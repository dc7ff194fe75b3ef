//! Dense displacement field.
//!
//! The field is defined on its reference grid and stores, for every voxel, a
//! relative displacement in world millimetres. A reference-side world point
//! `z` maps to the source-side point `z + d(z)`.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{Result, TransformError};
use crate::geometry;
use crate::interpolation::{BoundaryMode, Interpolator, LinearInterpolator};
use crate::space::VoxelGrid;

/// Displacement field of shape `[nx, ny, nz, 3]`.
#[derive(Debug, Clone)]
pub struct DisplacementField<B: Backend> {
    displacement: Tensor<B, 4>,
    grid: VoxelGrid,
    source_grid: VoxelGrid,
}

impl<B: Backend> DisplacementField<B> {
    /// Create a displacement field.
    ///
    /// # Arguments
    /// * `displacement` - Tensor `[nx, ny, nz, 3]`, world millimetres
    /// * `grid` - Grid the field is sampled on (its reference side)
    /// * `source_grid` - Grid the displaced points land in
    ///
    /// # Errors
    /// `InvalidField` when the spatial shape differs from `grid` or the
    /// trailing axis is not 3.
    pub fn new(displacement: Tensor<B, 4>, grid: VoxelGrid, source_grid: VoxelGrid) -> Result<Self> {
        let [nx, ny, nz, nc] = displacement.dims();
        if nc != 3 {
            return Err(TransformError::invalid_field(format!(
                "displacement must have 3 components on the trailing axis, got {nc}"
            )));
        }
        if [nx, ny, nz] != grid.shape() {
            return Err(TransformError::invalid_field(format!(
                "displacement shape {:?} does not match field grid {:?}",
                [nx, ny, nz],
                grid.shape()
            )));
        }
        Ok(Self {
            displacement,
            grid,
            source_grid,
        })
    }

    /// A field with no displacement.
    pub fn zeros(grid: VoxelGrid, source_grid: VoxelGrid, device: &B::Device) -> Self {
        let [nx, ny, nz] = grid.shape();
        Self {
            displacement: Tensor::zeros([nx, ny, nz, 3], device),
            grid,
            source_grid,
        }
    }

    /// Raw displacement tensor.
    pub fn displacement(&self) -> &Tensor<B, 4> {
        &self.displacement
    }

    /// Grid the field is sampled on.
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Grid the displaced points land in.
    pub fn source_grid(&self) -> &VoxelGrid {
        &self.source_grid
    }

    /// Displacement at world points `[N, 3]`, linearly interpolated and
    /// clamped at the field edge.
    pub fn sample(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let [nx, ny, nz, _] = self.displacement.dims();
        let n = points.dims()[0];
        let indices = geometry::transform_points(points, self.grid.world2vox());
        let interpolator = LinearInterpolator::new().with_boundary(BoundaryMode::Nearest, 0.0);

        let components = (0..3)
            .map(|c| {
                let component = self.displacement.clone().narrow(3, c, 1).reshape([nx, ny, nz]);
                interpolator
                    .interpolate(&component, indices.clone())
                    .reshape([n, 1])
            })
            .collect::<Vec<_>>();
        Tensor::cat(components, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_rejects_bad_component_axis() {
        let device = Default::default();
        let grid = VoxelGrid::unit([4, 4, 4]).unwrap();
        let displacement = Tensor::<TestBackend, 4>::zeros([4, 4, 4, 2], &device);
        let err = DisplacementField::new(displacement, grid, grid).unwrap_err();
        assert!(matches!(err, TransformError::InvalidField(_)));
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let device = Default::default();
        let grid = VoxelGrid::unit([4, 4, 4]).unwrap();
        let displacement = Tensor::<TestBackend, 4>::zeros([4, 4, 5, 3], &device);
        assert!(DisplacementField::new(displacement, grid, grid).is_err());
    }

    #[test]
    fn test_sample_uniform_field() {
        let device = Default::default();
        let grid = VoxelGrid::unit([3, 3, 3]).unwrap();
        let values: Vec<f32> = (0..27).flat_map(|_| [1.0, -2.0, 0.5]).collect();
        let displacement = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(values, Shape::new([3, 3, 3, 3])),
            &device,
        );
        let field = DisplacementField::new(displacement, grid, grid).unwrap();

        // Points inside and well outside the field both see the same vector
        let points = Tensor::<TestBackend, 2>::from_floats([[1.2, 0.7, 1.9], [10.0, -4.0, 2.0]], &device);
        let sampled = field.sample(points).into_data();
        let slice = sampled.as_slice::<f32>().unwrap();
        for row in slice.chunks(3) {
            assert!((row[0] - 1.0).abs() < 1e-6);
            assert!((row[1] + 2.0).abs() < 1e-6);
            assert!((row[2] - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sample_interpolates_between_voxels() {
        let device = Default::default();
        let grid = VoxelGrid::unit([2, 1, 1]).unwrap();
        // x-displacement 0 at voxel 0, 4 at voxel 1
        let values = vec![0.0f32, 0.0, 0.0, 4.0, 0.0, 0.0];
        let displacement = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(values, Shape::new([2, 1, 1, 3])),
            &device,
        );
        let field = DisplacementField::new(displacement, grid, grid).unwrap();
        let points = Tensor::<TestBackend, 2>::from_floats([[0.25, 0.0, 0.0]], &device);
        let sampled = field.sample(points).into_data();
        assert!((sampled.as_slice::<f32>().unwrap()[0] - 1.0).abs() < 1e-6);
    }
}

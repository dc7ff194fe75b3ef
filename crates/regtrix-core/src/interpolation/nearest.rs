//! Nearest neighbor interpolation implementation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::options::BoundaryMode;
use super::trait_::{columns, outside_mask, Interpolator};

/// Nearest Neighbor Interpolator.
///
/// Performs nearest neighbor interpolation (rounds to nearest integer coordinate).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NearestNeighborInterpolator {
    boundary: BoundaryMode,
    fill_value: f32,
}

impl NearestNeighborInterpolator {
    /// Create a new nearest neighbor interpolator clamping at the edge.
    pub fn new() -> Self {
        Self {
            boundary: BoundaryMode::Nearest,
            fill_value: 0.0,
        }
    }

    /// Set the boundary treatment.
    pub fn with_boundary(mut self, boundary: BoundaryMode, fill_value: f32) -> Self {
        self.boundary = boundary;
        self.fill_value = fill_value;
        self
    }
}

impl Default for NearestNeighborInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims();

        let coords = columns(indices);
        let mask = match self.boundary {
            BoundaryMode::Constant => Some(outside_mask(&coords, [d0, d1, d2])),
            BoundaryMode::Nearest => None,
        };
        let [i, j, k] = coords;

        // Round to nearest integer and clamp
        let i = i.round().clamp(0.0, (d0 - 1) as f64).int();
        let j = j.round().clamp(0.0, (d1 - 1) as f64).int();
        let k = k.round().clamp(0.0, (d2 - 1) as f64).int();

        let idx = i * (d1 * d2) as i32 + j * d2 as i32 + k;
        let flat_data = data.clone().reshape([d0 * d1 * d2]);
        let values = flat_data.gather(0, idx);

        match mask {
            Some(mask) => values.mask_fill(mask, self.fill_value),
            None => values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_nearest_picks_closest_voxel() {
        let device = Default::default();
        let values: Vec<f32> = (0..27).map(|v| v as f32).collect();
        let data = Tensor::<TestBackend, 3>::from_data(TensorData::new(values, Shape::new([3, 3, 3])), &device);

        let indices = Tensor::<TestBackend, 2>::from_floats([[0.9, 1.2, 1.6], [2.4, 0.1, 0.0]], &device);
        let result = NearestNeighborInterpolator::new().interpolate(&data, indices).into_data();
        let slice = result.as_slice::<f32>().unwrap();

        // (1, 1, 2) -> 9 + 3 + 2
        assert_eq!(slice[0], 14.0);
        // (2, 0, 0) -> 18
        assert_eq!(slice[1], 18.0);
    }

    #[test]
    fn test_nearest_constant_boundary() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::ones([2, 2, 2], &device);
        let interpolator = NearestNeighborInterpolator::new().with_boundary(BoundaryMode::Constant, 0.0);

        let indices = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0, 0.0], [0.0, 3.0, 0.0]], &device);
        let result = interpolator.interpolate(&data, indices).into_data();
        let slice = result.as_slice::<f32>().unwrap();
        assert_eq!(slice[0], 1.0);
        assert_eq!(slice[1], 0.0);
    }
}

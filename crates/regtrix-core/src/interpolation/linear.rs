//! Linear interpolation implementation.
//!
//! This module provides trilinear interpolation over 3D volumes.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};

use super::options::BoundaryMode;
use super::trait_::{columns, outside_mask, Interpolator};

/// Linear Interpolator.
///
/// Performs trilinear interpolation. Neighbour indices are clamped to the
/// volume; with [`BoundaryMode::Constant`] samples outside the volume are
/// replaced by the fill value afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearInterpolator {
    boundary: BoundaryMode,
    fill_value: f32,
}

impl LinearInterpolator {
    /// Create a new linear interpolator clamping at the edge.
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

impl Default for LinearInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims();
        let batch_size = indices.dims()[0];
        let device = indices.device();

        // indices: [Batch, 3] -> (i, j, k), column d indexes axis d
        let coords = columns(indices);
        let mask = match self.boundary {
            BoundaryMode::Constant => Some(outside_mask(&coords, [d0, d1, d2])),
            BoundaryMode::Nearest => None,
        };
        let [i, j, k] = coords;

        // Clamp before flooring so edge samples interpolate within the volume
        let i = i.clamp(0.0, (d0 - 1) as f64);
        let j = j.clamp(0.0, (d1 - 1) as f64);
        let k = k.clamp(0.0, (d2 - 1) as f64);

        let i0 = i.clone().floor();
        let j0 = j.clone().floor();
        let k0 = k.clone().floor();

        let wi = i - i0.clone();
        let wj = j - j0.clone();
        let wk = k - k0.clone();

        let i1_i = (i0.clone() + 1.0).clamp(0.0, (d0 - 1) as f64).int();
        let j1_i = (j0.clone() + 1.0).clamp(0.0, (d1 - 1) as f64).int();
        let k1_i = (k0.clone() + 1.0).clamp(0.0, (d2 - 1) as f64).int();
        let i0_i = i0.int();
        let j0_i = j0.int();
        let k0_i = k0.int();

        // Strides for row-major [d0, d1, d2]
        let stride_i = (d1 * d2) as i32;
        let stride_j = d2 as i32;

        let flat_data = data.clone().reshape([d0 * d1 * d2]);

        let v000 = Self::gather(&flat_data, &i0_i, &j0_i, &k0_i, stride_i, stride_j);
        let v001 = Self::gather(&flat_data, &i0_i, &j0_i, &k1_i, stride_i, stride_j);
        let v010 = Self::gather(&flat_data, &i0_i, &j1_i, &k0_i, stride_i, stride_j);
        let v011 = Self::gather(&flat_data, &i0_i, &j1_i, &k1_i, stride_i, stride_j);
        let v100 = Self::gather(&flat_data, &i1_i, &j0_i, &k0_i, stride_i, stride_j);
        let v101 = Self::gather(&flat_data, &i1_i, &j0_i, &k1_i, stride_i, stride_j);
        let v110 = Self::gather(&flat_data, &i1_i, &j1_i, &k0_i, stride_i, stride_j);
        let v111 = Self::gather(&flat_data, &i1_i, &j1_i, &k1_i, stride_i, stride_j);

        let one = Tensor::<B, 1>::ones([batch_size], &device);
        let one_minus_wi = one.clone() - wi.clone();
        let one_minus_wj = one.clone() - wj.clone();
        let one_minus_wk = one - wk.clone();

        // Along k
        let c00 = v000 * one_minus_wk.clone() + v001 * wk.clone();
        let c01 = v010 * one_minus_wk.clone() + v011 * wk.clone();
        let c10 = v100 * one_minus_wk.clone() + v101 * wk.clone();
        let c11 = v110 * one_minus_wk + v111 * wk;

        // Along j
        let c0 = c00 * one_minus_wj.clone() + c01 * wj.clone();
        let c1 = c10 * one_minus_wj + c11 * wj;

        // Along i
        let values = c0 * one_minus_wi + c1 * wi;

        match mask {
            Some(mask) => values.mask_fill(mask, self.fill_value),
            None => values,
        }
    }
}

impl LinearInterpolator {
    #[inline]
    fn gather<B: Backend>(
        flat_data: &Tensor<B, 1>,
        ii: &Tensor<B, 1, Int>,
        ji: &Tensor<B, 1, Int>,
        ki: &Tensor<B, 1, Int>,
        stride_i: i32,
        stride_j: i32,
    ) -> Tensor<B, 1> {
        let idx = ii.clone() * stride_i + ji.clone() * stride_j + ki.clone();
        flat_data.clone().gather(0, idx)
    }
}

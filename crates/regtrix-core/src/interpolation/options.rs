//! Interpolation configuration.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::linear::LinearInterpolator;
use super::nearest::NearestNeighborInterpolator;
use super::trait_::Interpolator;

/// Interpolation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationOrder {
    /// Order 0.
    Nearest,
    /// Order 1, trilinear.
    #[default]
    Linear,
}

/// Treatment of samples that fall outside the source volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Outside samples take the fill value.
    #[default]
    Constant,
    /// Outside samples take the value of the nearest edge voxel.
    Nearest,
}

/// Pass-through interpolation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolationOptions {
    pub order: InterpolationOrder,
    pub boundary: BoundaryMode,
    pub fill_value: f32,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self {
            order: InterpolationOrder::Linear,
            boundary: BoundaryMode::Constant,
            fill_value: 0.0,
        }
    }
}

impl InterpolationOptions {
    pub fn nearest() -> Self {
        Self {
            order: InterpolationOrder::Nearest,
            ..Self::default()
        }
    }

    pub fn with_boundary(mut self, boundary: BoundaryMode, fill_value: f32) -> Self {
        self.boundary = boundary;
        self.fill_value = fill_value;
        self
    }

    /// Sample `data` at continuous voxel `indices` `[N, 3]` with the
    /// configured kernel and boundary.
    pub fn interpolate<B: Backend>(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        match self.order {
            InterpolationOrder::Linear => LinearInterpolator::new()
                .with_boundary(self.boundary, self.fill_value)
                .interpolate(data, indices),
            InterpolationOrder::Nearest => NearestNeighborInterpolator::new()
                .with_boundary(self.boundary, self.fill_value)
                .interpolate(data, indices),
        }
    }
}

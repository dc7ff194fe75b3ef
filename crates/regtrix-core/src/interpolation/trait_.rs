//! Interpolator trait for sampling values at continuous coordinates.
//!
//! This module defines the core Interpolator trait that all interpolation methods must implement.

use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Tensor};

/// Interpolator trait for sampling values at continuous coordinates.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from a volume at given continuous indices.
    ///
    /// # Arguments
    /// * `data` - Source volume `[n0, n1, n2]`
    /// * `indices` - Continuous voxel indices `[Batch, 3]`; column `d` indexes
    ///   data axis `d`
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}

/// Slack at the volume edge for floating-point rounding.
const EDGE_TOLERANCE: f64 = 1e-4;

/// Split `[Batch, 3]` indices into one `[Batch]` tensor per axis.
pub(crate) fn columns<B: Backend>(indices: Tensor<B, 2>) -> [Tensor<B, 1>; 3] {
    let n = indices.dims()[0];
    [
        indices.clone().narrow(1, 0, 1).reshape([n]),
        indices.clone().narrow(1, 1, 1).reshape([n]),
        indices.narrow(1, 2, 1).reshape([n]),
    ]
}

/// Mask of samples lying outside `[0, n - 1]` on any axis.
pub(crate) fn outside_mask<B: Backend>(coords: &[Tensor<B, 1>; 3], dims: [usize; 3]) -> Tensor<B, 1, Bool> {
    let n = coords[0].dims()[0];
    let device = coords[0].device();
    let mut inside = Tensor::<B, 1>::zeros([n], &device);
    for (c, &extent) in coords.iter().zip(dims.iter()) {
        let upper = (extent - 1) as f64 + EDGE_TOLERANCE;
        inside = inside
            + c.clone().greater_equal_elem(-EDGE_TOLERANCE).float()
            + c.clone().lower_equal_elem(upper).float();
    }
    inside.lower_elem(5.5)
}

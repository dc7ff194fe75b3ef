use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Generate the voxel indices of a 3D grid.
///
/// Returns a tensor of shape `[N, 3]` where N is the total number of voxels.
/// Row order matches the row-major flattening of a `[nx, ny, nz]` volume, so
/// values sampled at these indices reshape directly back to the grid shape.
///
/// # Arguments
/// * `shape` - The grid shape `[nx, ny, nz]`
/// * `device` - The device to create the tensor on
///
/// # Returns
/// Tensor of shape `[N, 3]` containing `(i, j, k)` indices
pub fn generate_index_grid<B>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2>
where
    B: Backend,
{
    let [nx, ny, nz] = shape;
    let total = nx * ny * nz;

    let mut grid = Vec::with_capacity(total * 3);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                grid.push(i as f32);
                grid.push(j as f32);
                grid.push(k as f32);
            }
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * 3])), device)
        .reshape([total, 3])
}

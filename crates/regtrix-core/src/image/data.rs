//! 3D/4D voxel data.
//!
//! Image data arrive either as a single volume `[nx, ny, nz]` or as a time
//! series `[nx, ny, nz, T]` with time on the trailing axis.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};

use crate::error::{Result, TransformError};

/// Voxel data of rank 3 or 4.
#[derive(Debug, Clone)]
pub enum ImageData<B: Backend> {
    /// Single volume `[nx, ny, nz]`.
    Volume(Tensor<B, 3>),
    /// Time series `[nx, ny, nz, T]`.
    Series(Tensor<B, 4>),
}

impl<B: Backend> ImageData<B> {
    /// Create image data from raw tensor data of any rank.
    ///
    /// # Errors
    /// `InvalidRank` unless the data is 3D or 4D.
    pub fn from_data(data: TensorData, device: &B::Device) -> Result<Self> {
        match data.shape.len() {
            3 => Ok(Self::Volume(Tensor::from_data(data, device))),
            4 => Ok(Self::Series(Tensor::from_data(data, device))),
            rank => Err(TransformError::InvalidRank(rank)),
        }
    }

    /// Rank of the data (3 or 4).
    pub fn rank(&self) -> usize {
        match self {
            Self::Volume(_) => 3,
            Self::Series(_) => 4,
        }
    }

    /// Whether the data carries a time axis.
    pub fn is_series(&self) -> bool {
        matches!(self, Self::Series(_))
    }

    /// Number of volumes (1 for 3D data).
    pub fn volume_count(&self) -> usize {
        match self {
            Self::Volume(_) => 1,
            Self::Series(t) => t.dims()[3],
        }
    }

    /// Spatial shape `[nx, ny, nz]`.
    pub fn spatial_shape(&self) -> [usize; 3] {
        match self {
            Self::Volume(t) => t.dims(),
            Self::Series(t) => {
                let [nx, ny, nz, _] = t.dims();
                [nx, ny, nz]
            }
        }
    }

    /// Device the data lives on.
    pub fn device(&self) -> B::Device {
        match self {
            Self::Volume(t) => t.device(),
            Self::Series(t) => t.device(),
        }
    }

    /// Split into a volume-indexed sequence, index `t` being volume `t`.
    pub fn volumes(&self) -> Vec<Tensor<B, 3>> {
        match self {
            Self::Volume(t) => vec![t.clone()],
            Self::Series(t) => {
                let [nx, ny, nz, nt] = t.dims();
                (0..nt)
                    .map(|i| t.clone().narrow(3, i, 1).reshape([nx, ny, nz]))
                    .collect()
            }
        }
    }

    /// Reassemble volumes in index order.
    ///
    /// A single volume becomes 3D data when `as_series` is false.
    pub fn from_volumes(mut volumes: Vec<Tensor<B, 3>>, as_series: bool) -> Result<Self> {
        if volumes.is_empty() {
            return Err(TransformError::empty_series("no volumes to assemble"));
        }
        if !as_series && volumes.len() == 1 {
            return Ok(Self::Volume(volumes.remove(0)));
        }
        Ok(Self::Series(Tensor::stack::<4>(volumes, 3)))
    }

    /// Minimum and maximum over all voxels of all volumes.
    pub fn value_range(&self) -> (f32, f32) {
        match self {
            Self::Volume(t) => (
                t.clone().min().into_scalar().elem::<f32>(),
                t.clone().max().into_scalar().elem::<f32>(),
            ),
            Self::Series(t) => (
                t.clone().min().into_scalar().elem::<f32>(),
                t.clone().max().into_scalar().elem::<f32>(),
            ),
        }
    }

    /// Clamp every value into `[min, max]`.
    pub fn clamp(self, min: f32, max: f32) -> Self {
        match self {
            Self::Volume(t) => Self::Volume(t.clamp(min, max)),
            Self::Series(t) => Self::Series(t.clamp(min, max)),
        }
    }

    /// Copy the voxel values out in row-major order.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        let data = match self {
            Self::Volume(t) => t.to_data(),
            Self::Series(t) => t.to_data(),
        };
        data.convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| TransformError::tensor(format!("{e:?}")))
    }
}

//! Resampling dispatch engine.
//!
//! Splits the input into volumes, resolves and interpolates each volume
//! against a shared [`ResolveCache`], and restacks the results in volume
//! order. With more than one worker the volumes run on a dedicated rayon
//! pool; both paths call the same per-volume routine.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rayon::prelude::*;

use crate::error::{Result, TransformError};
use crate::image::ImageData;
use crate::interpolation::InterpolationOptions;
use crate::space::VoxelGrid;
use crate::transform::Transform;

use super::config::ResampleConfig;
use super::resolve::ResolveCache;

/// Resample `data` from `source` into `reference` through `transform`.
///
/// # Arguments
/// * `data` - 3D volume or 4D series on `source`
/// * `transform` - Source-to-reference transform; a series must have one
///   entry per volume, a single transform is broadcast
/// * `source` - Grid of `data`
/// * `reference` - Output grid
/// * `config` - Worker count, interpolation and clipping
///
/// # Returns
/// Data on `reference` with the rank of the input.
///
/// # Errors
/// `InvalidConfiguration`, `VolumeCountMismatch`, `ShapeMismatch`, or any
/// resolution error. The cache is released before an error is returned.
pub fn apply<B: Backend>(
    data: &ImageData<B>,
    transform: &Transform<B>,
    source: &VoxelGrid,
    reference: &VoxelGrid,
    config: &ResampleConfig,
) -> Result<ImageData<B>> {
    config.validate()?;
    transform.check_volume_count(data.volume_count())?;

    let shape = data.spatial_shape();
    if shape != source.shape() {
        return Err(TransformError::ShapeMismatch {
            expected: source.shape().to_vec(),
            actual: shape.to_vec(),
        });
    }

    let (min, max) = data.value_range();
    let volumes = data.volumes();
    let device = data.device();

    tracing::info!(
        kind = %transform.kind(),
        volumes = volumes.len(),
        workers = config.workers,
        source = ?source.shape(),
        reference = ?reference.shape(),
        "resampling"
    );

    let pool = if config.workers > 1 && volumes.len() > 1 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .build()
                .map_err(|e| TransformError::invalid_configuration(format!("failed to build worker pool: {e}")))?,
        )
    } else {
        None
    };

    let cache = transform.prepare_cache(reference, &device);
    let job = VolumeJob {
        transform,
        cache: &cache,
        source,
        reference,
        interpolation: &config.interpolation,
    };

    let resampled = match &pool {
        Some(pool) => pool.install(|| {
            volumes
                .into_par_iter()
                .enumerate()
                .map(|(index, volume)| job.run(index, volume))
                .collect::<Result<Vec<_>>>()
        }),
        None => volumes
            .into_iter()
            .enumerate()
            .map(|(index, volume)| job.run(index, volume))
            .collect::<Result<Vec<_>>>(),
    };
    cache.reset();
    let resampled = resampled?;

    let output = ImageData::from_volumes(resampled, data.is_series())?;
    tracing::info!(shape = ?reference.shape(), "resampling finished");

    Ok(if config.clip_to_input_range {
        output.clamp(min, max)
    } else {
        output
    })
}

/// Read-only state shared by every volume of one batch.
struct VolumeJob<'a, B: Backend> {
    transform: &'a Transform<B>,
    cache: &'a ResolveCache<B>,
    source: &'a VoxelGrid,
    reference: &'a VoxelGrid,
    interpolation: &'a InterpolationOptions,
}

impl<B: Backend> VolumeJob<'_, B> {
    fn run(&self, index: usize, volume: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        tracing::debug!(volume = index, "resampling volume");
        let (coordinates, scale) = self.transform.resolve(self.cache, self.source, index)?;
        let values = self.interpolation.interpolate(&volume, coordinates);
        Ok(values.mul_scalar(scale).reshape(self.reference.shape()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Matrix4, Vector3d};
    use crate::transform::{Affine, AffineSeries};
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn ramp(shape: [usize; 3]) -> ImageData<TestBackend> {
        let device = Default::default();
        let n: usize = shape.iter().product();
        let values: Vec<f32> = (0..n).map(|v| v as f32).collect();
        ImageData::from_data(TensorData::new(values, Shape::new(shape)), &device).unwrap()
    }

    fn identity() -> Transform<TestBackend> {
        Affine::identity(None, None).into()
    }

    #[test]
    fn test_identity_keeps_3d_data() {
        let grid = VoxelGrid::unit([4, 5, 6]).unwrap();
        let data = ramp([4, 5, 6]);
        let out = apply(&data, &identity(), &grid, &grid, &ResampleConfig::default()).unwrap();
        assert_eq!(out.rank(), 3);
        assert_eq!(out.to_vec().unwrap(), data.to_vec().unwrap());
    }

    #[test]
    fn test_shape_mismatch() {
        let grid = VoxelGrid::unit([4, 4, 4]).unwrap();
        let err = apply(&ramp([4, 4, 5]), &identity(), &grid, &grid, &ResampleConfig::default()).unwrap_err();
        assert!(matches!(err, TransformError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_series_on_3d_data_rejected() {
        let grid = VoxelGrid::unit([2, 2, 2]).unwrap();
        let series: Transform<TestBackend> =
            AffineSeries::new(vec![Matrix4::identity(); 2], None, None, None).unwrap().into();
        let err = apply(&ramp([2, 2, 2]), &series, &grid, &grid, &ResampleConfig::default()).unwrap_err();
        assert!(matches!(err, TransformError::VolumeCountMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let grid = VoxelGrid::unit([2, 2, 2]).unwrap();
        let config = ResampleConfig::default().with_workers(0);
        assert!(apply(&ramp([2, 2, 2]), &identity(), &grid, &grid, &config).is_err());
    }

    #[test]
    fn test_output_takes_reference_shape() {
        let source = VoxelGrid::unit([4, 4, 4]).unwrap();
        let reference = VoxelGrid::unit([2, 3, 5]).unwrap();
        let out = apply(&ramp([4, 4, 4]), &identity(), &source, &reference, &ResampleConfig::default()).unwrap();
        assert_eq!(out.spatial_shape(), [2, 3, 5]);
    }

    #[test]
    fn test_fill_value_clipped_unless_disabled() {
        let grid = VoxelGrid::unit([3, 3, 3]).unwrap();
        let shift: Transform<TestBackend> = Affine::from_world(Matrix4::new_translation(&Vector3d::new(10.0, 0.0, 0.0)))
            .unwrap()
            .into();
        let interpolation = InterpolationOptions::default().with_boundary(crate::interpolation::BoundaryMode::Constant, -100.0);

        let config = ResampleConfig::default().with_interpolation(interpolation);
        let clipped = apply(&ramp([3, 3, 3]), &shift, &grid, &grid, &config).unwrap();
        assert!(clipped.to_vec().unwrap().iter().all(|&v| v == 0.0));

        let raw = apply(&ramp([3, 3, 3]), &shift, &grid, &grid, &config.without_clipping()).unwrap();
        assert!(raw.to_vec().unwrap().iter().all(|&v| v == -100.0));
    }
}

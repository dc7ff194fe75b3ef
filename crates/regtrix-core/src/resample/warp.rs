//! External non-linear resampling.
//!
//! Some pipelines resample non-linear transforms with an external tool
//! rather than the in-process engine. The tool is reached through
//! [`WarpResampler`], called once per volume with the conditioning matrices
//! expressed in the field's FSL convention.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{Result, TransformError};
use crate::geometry::Matrix4;
use crate::image::ImageData;
use crate::space::VoxelGrid;
use crate::transform::{DisplacementField, NonLinearTransform, Transform};

/// Everything an external tool needs to resample one volume.
#[derive(Debug)]
pub struct WarpRequest<'a, B: Backend> {
    /// Volume index within the batch.
    pub index: usize,
    /// Source volume data.
    pub volume: Tensor<B, 3>,
    pub source: &'a VoxelGrid,
    pub reference: &'a VoxelGrid,
    pub field: &'a DisplacementField<B>,
    /// Source to field-source, FSL convention.
    pub premat: Matrix4,
    /// Field-reference to reference, FSL convention.
    pub postmat: Matrix4,
}

/// A collaborator that resamples one volume through a displacement field.
pub trait WarpResampler<B: Backend> {
    type Error: Into<Box<dyn std::error::Error + Send + Sync>>;

    /// Resample `request.volume` onto `request.reference`.
    fn resample(&self, request: WarpRequest<'_, B>) -> std::result::Result<Tensor<B, 3>, Self::Error>;
}

/// Apply a non-linear transform through an external resampler.
///
/// Volumes are processed in order on the calling thread. Output values are
/// not clipped.
///
/// # Errors
/// `NotSupported` for affine transforms, `VolumeCountMismatch` and
/// `ShapeMismatch` as for [`apply`](super::apply), and `ExternalTool` naming
/// the failing volume.
pub fn apply_with_resampler<B, R>(
    data: &ImageData<B>,
    transform: &Transform<B>,
    source: &VoxelGrid,
    reference: &VoxelGrid,
    resampler: &R,
) -> Result<ImageData<B>>
where
    B: Backend,
    R: WarpResampler<B>,
{
    if !transform.kind().is_nonlinear() {
        return Err(TransformError::not_supported(format!(
            "external warp resampling applies non-linear transforms only, got {}",
            transform.kind()
        )));
    }
    transform.check_volume_count(data.volume_count())?;
    if data.spatial_shape() != source.shape() {
        return Err(TransformError::ShapeMismatch {
            expected: source.shape().to_vec(),
            actual: data.spatial_shape().to_vec(),
        });
    }

    let volumes = data.volumes();
    tracing::info!(
        kind = %transform.kind(),
        volumes = volumes.len(),
        "resampling through external tool"
    );

    let mut resampled = Vec::with_capacity(volumes.len());
    for (index, volume) in volumes.into_iter().enumerate() {
        let nlt = volume_transform(transform, index)?;
        let field = nlt.field();
        let request = WarpRequest {
            index,
            volume,
            source,
            reference,
            field,
            premat: nlt.premat().to_legacy(source, field.source_grid()),
            postmat: nlt.postmat().to_legacy(field.grid(), reference),
        };

        tracing::debug!(volume = index, "invoking external resampler");
        let output = resampler
            .resample(request)
            .map_err(|e| TransformError::external(index, transform.kind(), e))?;
        if output.dims() != reference.shape() {
            return Err(TransformError::ShapeMismatch {
                expected: reference.shape().to_vec(),
                actual: output.dims().to_vec(),
            });
        }
        resampled.push(output);
    }

    ImageData::from_volumes(resampled, data.is_series())
}

fn volume_transform<B: Backend>(transform: &Transform<B>, index: usize) -> Result<NonLinearTransform<B>> {
    match transform {
        Transform::NonLinear(nlt) => Ok(nlt.clone()),
        Transform::NonLinearSeries(series) => {
            series
                .volume(index)
                .ok_or(TransformError::VolumeCountMismatch {
                    expected: series.len(),
                    actual: index + 1,
                })
        }
        other => Err(TransformError::not_supported(format!(
            "no displacement field in {}",
            other.kind()
        ))),
    }
}

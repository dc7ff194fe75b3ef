//! Image-level entry points: read a source file, transform it, return data
//! on the output grid.

use anyhow::Result;
use burn::tensor::backend::Backend;
use regtrix_core::{apply, apply_with_resampler, Affine, ImageData, ResampleConfig, Transform, VoxelGrid, WarpResampler};
use std::path::Path;

use crate::nifti_io::read_image;

/// Resample the image at `source` onto `reference`.
///
/// Affine kinds run on the in-process engine with `config`; non-linear kinds
/// go through `resampler` one volume at a time.
///
/// # Returns
/// The resampled data and the reference grid it lies on.
pub fn apply_to_image<B, R, P>(
    source: P,
    transform: &Transform<B>,
    reference: &VoxelGrid,
    config: &ResampleConfig,
    resampler: &R,
    device: &B::Device,
) -> Result<(ImageData<B>, VoxelGrid)>
where
    B: Backend,
    R: WarpResampler<B>,
    P: AsRef<Path>,
{
    let source = source.as_ref();
    let (data, source_grid) = read_image::<B, _>(source, device)?;
    tracing::info!(path = %source.display(), kind = %transform.kind(), "applying transform to image");

    let resampled = if transform.kind().is_nonlinear() {
        apply_with_resampler(&data, transform, &source_grid, reference, resampler)?
    } else {
        apply(&data, transform, &source_grid, reference, config)?
    };
    Ok((resampled, *reference))
}

/// Move the image at `source` in world space without resampling.
///
/// # Returns
/// The unchanged voxel data and its grid with `vox2world` premultiplied by
/// the affine.
pub fn apply_to_grid<B, P>(source: P, affine: &Affine, device: &B::Device) -> Result<(ImageData<B>, VoxelGrid)>
where
    B: Backend,
    P: AsRef<Path>,
{
    let (data, grid) = read_image::<B, _>(source, device)?;
    let moved = affine.apply_to_grid(&grid)?;
    Ok((data, moved))
}

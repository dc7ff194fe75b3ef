//! Coordinate resolution.
//!
//! Resolution turns a transform into one continuous source voxel index per
//! reference voxel. Everything that does not depend on the volume index is
//! computed once into a [`ResolveCache`] and shared read-only between
//! workers.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{Result, TransformError};
use crate::geometry::{self, Matrix4};
use crate::space::{generate_index_grid, VoxelGrid};
use crate::transform::{Affine, NonLinearTransform, Transform};

/// Per-batch precomputed coordinates for one reference grid.
#[derive(Debug)]
pub struct ResolveCache<B: Backend> {
    reference: VoxelGrid,
    indices: Tensor<B, 2>,
    world: Option<Tensor<B, 2>>,
}

impl<B: Backend> ResolveCache<B> {
    /// Reference grid the cache was prepared for.
    pub fn reference(&self) -> &VoxelGrid {
        &self.reference
    }

    /// Reference voxel indices `[N, 3]`, last axis fastest.
    pub fn indices(&self) -> &Tensor<B, 2> {
        &self.indices
    }

    /// Reference voxel centres in world space, present for non-linear
    /// transforms only.
    pub fn world(&self) -> Option<&Tensor<B, 2>> {
        self.world.as_ref()
    }

    /// Discard the cache.
    pub fn reset(self) {
        drop(self);
    }
}

impl<B: Backend> Drop for ResolveCache<B> {
    fn drop(&mut self) {
        tracing::trace!(shape = ?self.reference.shape(), "resolve cache released");
    }
}

impl<B: Backend> Transform<B> {
    /// Precompute the volume-independent coordinates for `reference`.
    pub fn prepare_cache(&self, reference: &VoxelGrid, device: &B::Device) -> ResolveCache<B> {
        let indices = generate_index_grid::<B>(reference.shape(), device);
        let world = self
            .kind()
            .is_nonlinear()
            .then(|| geometry::transform_points(indices.clone(), reference.vox2world()));
        tracing::trace!(shape = ?reference.shape(), kind = %self.kind(), "resolve cache prepared");

        ResolveCache {
            reference: *reference,
            indices,
            world,
        }
    }

    /// Source voxel coordinates for every reference voxel of volume `index`.
    ///
    /// # Returns
    /// `(coordinates [N, 3], scale)`; `scale` is the intensity factor applied
    /// after interpolation and is 1.0 for every current transform.
    ///
    /// # Errors
    /// `VolumeCountMismatch` when `index` is past the end of a series longer
    /// than one; `SingularMatrix` for non-invertible matrices.
    pub fn resolve(
        &self,
        cache: &ResolveCache<B>,
        source: &VoxelGrid,
        index: usize,
    ) -> Result<(Tensor<B, 2>, f32)> {
        let coordinates = match self {
            Self::Affine(affine) => resolve_affine(affine, cache, source)?,
            Self::AffineSeries(series) => {
                let affine = series.get(index).ok_or(TransformError::VolumeCountMismatch {
                    expected: series.len(),
                    actual: index + 1,
                })?;
                resolve_affine(affine, cache, source)?
            }
            Self::NonLinear(nlt) => resolve_nonlinear(nlt, cache, source)?,
            Self::NonLinearSeries(series) => {
                let nlt = series.volume(index).ok_or(TransformError::VolumeCountMismatch {
                    expected: series.len(),
                    actual: index + 1,
                })?;
                resolve_nonlinear(&nlt, cache, source)?
            }
        };
        Ok((coordinates, 1.0))
    }
}

/// One-shot resolution without a caller-held cache.
pub fn resolve<B: Backend>(
    transform: &Transform<B>,
    source: &VoxelGrid,
    reference: &VoxelGrid,
    index: usize,
    device: &B::Device,
) -> Result<(Tensor<B, 2>, f32)> {
    let cache = transform.prepare_cache(reference, device);
    transform.resolve(&cache, source, index)
}

fn resolve_affine<B: Backend>(
    affine: &Affine,
    cache: &ResolveCache<B>,
    source: &VoxelGrid,
) -> Result<Tensor<B, 2>> {
    // Reference voxel -> reference world -> source world -> source voxel
    let ref2src = affine.ref2src()?;
    let vox2vox: Matrix4 = source.world2vox() * ref2src * cache.reference.vox2world();
    Ok(geometry::transform_points(cache.indices.clone(), &geometry::snap_to_integers(&vox2vox)))
}

fn resolve_nonlinear<B: Backend>(
    nlt: &NonLinearTransform<B>,
    cache: &ResolveCache<B>,
    source: &VoxelGrid,
) -> Result<Tensor<B, 2>> {
    let (pre_inv, post_inv) = nlt.inverse_conditioning()?;
    let world = match &cache.world {
        Some(world) => world.clone(),
        None => geometry::transform_points(cache.indices.clone(), cache.reference.vox2world()),
    };

    // Into the field's reference space, displace, then back to source voxels
    let field_points = geometry::transform_points(world, &post_inv);
    let displaced = field_points.clone() + nlt.field().sample(field_points);
    let to_source: Matrix4 = source.world2vox() * pre_inv;
    Ok(geometry::transform_points(displaced, &to_source))
}

//! Per-volume affine series.
//!
//! Element `i` of an [`AffineSeries`] applies to volume `i` of a 4D image.
//! All elements share the same source and reference grids.

use crate::error::{Result, TransformError};
use crate::geometry::Matrix4;
use crate::space::{Convention, VoxelGrid};

use super::affine::Affine;

/// Ordered, non-empty list of affines with shared grids.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineSeries {
    transforms: Vec<Affine>,
    source: Option<VoxelGrid>,
    reference: Option<VoxelGrid>,
}

impl AffineSeries {
    /// Build a series from raw matrices.
    ///
    /// When only a source grid is given the reference defaults to it, the
    /// usual situation for motion correction within one acquisition.
    ///
    /// # Errors
    /// `EmptySeries` for an empty list; any error from [`Affine::new`].
    pub fn new(
        matrices: Vec<Matrix4>,
        source: Option<VoxelGrid>,
        reference: Option<VoxelGrid>,
        convention: Option<Convention>,
    ) -> Result<Self> {
        if matrices.is_empty() {
            return Err(TransformError::empty_series("affine series needs at least one matrix"));
        }
        let reference = reference.or(source);

        let transforms = matrices
            .into_iter()
            .map(|m| Affine::new(m, source, reference, convention))
            .collect::<Result<Vec<_>>>()?;

        if let Some(first) = transforms.first() {
            if first.convention().defaulted {
                tracing::debug!(
                    convention = %first.convention().convention,
                    len = transforms.len(),
                    "affine series convention defaulted"
                );
            }
        }

        Ok(Self {
            transforms,
            source,
            reference,
        })
    }

    /// Build a series from existing affines.
    ///
    /// The grids of the first element are taken as the series grids.
    pub fn from_affines(transforms: Vec<Affine>) -> Result<Self> {
        let first = transforms
            .first()
            .ok_or_else(|| TransformError::empty_series("affine series needs at least one transform"))?;
        let source = first.source_grid().copied();
        let reference = first.reference_grid().copied();
        Ok(Self {
            transforms,
            source,
            reference,
        })
    }

    /// Repeat one affine `len` times.
    pub fn broadcast(affine: &Affine, len: usize) -> Result<Self> {
        Self::from_affines(vec![affine.clone(); len])
    }

    pub(crate) fn from_matrices_world(
        matrices: Vec<Matrix4>,
        source: Option<VoxelGrid>,
        reference: Option<VoxelGrid>,
    ) -> Result<Self> {
        if matrices.is_empty() {
            return Err(TransformError::empty_series("affine series needs at least one matrix"));
        }
        let transforms = matrices
            .into_iter()
            .map(|m| Affine::with_parts(m, source, reference))
            .collect();
        Ok(Self {
            transforms,
            source,
            reference,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// The elements in volume order.
    pub fn transforms(&self) -> &[Affine] {
        &self.transforms
    }

    /// World-convention matrices in volume order.
    pub fn matrices(&self) -> Vec<Matrix4> {
        self.transforms.iter().map(|a| *a.matrix()).collect()
    }

    /// Element `index`, or the only element for a length-1 series.
    pub fn get(&self, index: usize) -> Option<&Affine> {
        if self.transforms.len() == 1 {
            self.transforms.first()
        } else {
            self.transforms.get(index)
        }
    }

    /// Source grid, if known.
    pub fn source_grid(&self) -> Option<&VoxelGrid> {
        self.source.as_ref()
    }

    /// Reference grid, if known.
    pub fn reference_grid(&self) -> Option<&VoxelGrid> {
        self.reference.as_ref()
    }

    /// FSL-convention matrices for the given grids, in volume order.
    pub fn to_legacy(&self, source: &VoxelGrid, reference: &VoxelGrid) -> Vec<Matrix4> {
        self.transforms
            .iter()
            .map(|a| a.to_legacy(source, reference))
            .collect()
    }

    /// Element-wise inverse with the grids swapped.
    pub fn inverse(&self) -> Result<Self> {
        let transforms = self
            .transforms
            .iter()
            .map(Affine::inverse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            transforms,
            source: self.reference,
            reference: self.source,
        })
    }
}

//! Non-linear transforms: a displacement field wrapped in affine conditioning.
//!
//! Forward mapping, source world to reference world:
//! `x -> pre @ x -> field -> post @ .`
//! The field itself is shared between transforms through an [`Arc`] and never
//! copied by composition.

use std::sync::Arc;

use burn::tensor::backend::Backend;

use crate::error::{Result, TransformError};
use crate::geometry::{self, Matrix4};
use crate::space::VoxelGrid;

use super::affine::Affine;
use super::displacement_field::DisplacementField;

/// Displacement field with one pre- and one post-matrix.
#[derive(Debug, Clone)]
pub struct NonLinearTransform<B: Backend> {
    field: Arc<DisplacementField<B>>,
    source: VoxelGrid,
    reference: VoxelGrid,
    pre: Matrix4,
    post: Matrix4,
}

impl<B: Backend> NonLinearTransform<B> {
    /// Wrap a field with identity conditioning; grids come from the field.
    pub fn new(field: DisplacementField<B>) -> Self {
        Self::from_shared(Arc::new(field))
    }

    /// Wrap an already shared field.
    pub fn from_shared(field: Arc<DisplacementField<B>>) -> Self {
        let source = *field.source_grid();
        let reference = *field.grid();
        Self {
            field,
            source,
            reference,
            pre: Matrix4::identity(),
            post: Matrix4::identity(),
        }
    }

    pub(crate) fn from_parts(
        field: Arc<DisplacementField<B>>,
        source: VoxelGrid,
        reference: VoxelGrid,
        pre: Matrix4,
        post: Matrix4,
    ) -> Self {
        Self {
            field,
            source,
            reference,
            pre,
            post,
        }
    }

    /// Replace the pre-matrix. The source grid follows the affine's source
    /// when it has one.
    pub fn with_premat(mut self, premat: &Affine) -> Self {
        self.pre = *premat.matrix();
        if let Some(source) = premat.source_grid() {
            self.source = *source;
        }
        self
    }

    /// Replace the post-matrix. The reference grid follows the affine's
    /// reference when it has one.
    pub fn with_postmat(mut self, postmat: &Affine) -> Self {
        self.post = *postmat.matrix();
        if let Some(reference) = postmat.reference_grid() {
            self.reference = *reference;
        }
        self
    }

    /// Source world to field-source world.
    pub fn premat(&self) -> Affine {
        Affine::with_parts(self.pre, Some(self.source), Some(*self.field.source_grid()))
    }

    /// Field-reference world to reference world.
    pub fn postmat(&self) -> Affine {
        Affine::with_parts(self.post, Some(*self.field.grid()), Some(self.reference))
    }

    /// Raw pre-matrix, world convention.
    pub fn pre(&self) -> &Matrix4 {
        &self.pre
    }

    /// Raw post-matrix, world convention.
    pub fn post(&self) -> &Matrix4 {
        &self.post
    }

    /// The shared displacement field.
    pub fn field(&self) -> &Arc<DisplacementField<B>> {
        &self.field
    }

    pub fn source_grid(&self) -> &VoxelGrid {
        &self.source
    }

    pub fn reference_grid(&self) -> &VoxelGrid {
        &self.reference
    }

    /// Numeric inversion of a displacement field is not offered.
    pub fn inverse(&self) -> Result<Self> {
        Err(TransformError::not_supported(
            "inverting a non-linear transform requires numeric field inversion",
        ))
    }

    /// `(pre^-1, post^-1)` used when pulling reference points back.
    pub(crate) fn inverse_conditioning(&self) -> Result<(Matrix4, Matrix4)> {
        Ok((
            geometry::invert(&self.pre, "non-linear pre-matrix")?,
            geometry::invert(&self.post, "non-linear post-matrix")?,
        ))
    }
}

/// Shared displacement field with per-volume `(pre, post)` pairs.
#[derive(Debug, Clone)]
pub struct NonLinearSeries<B: Backend> {
    field: Arc<DisplacementField<B>>,
    source: VoxelGrid,
    reference: VoxelGrid,
    pairs: Vec<(Matrix4, Matrix4)>,
}

impl<B: Backend> NonLinearSeries<B> {
    /// Create a series around a shared field.
    ///
    /// # Errors
    /// `EmptySeries` when `pairs` is empty; `InvalidBottomRow` for any
    /// non-affine matrix.
    pub fn new(
        field: Arc<DisplacementField<B>>,
        source: VoxelGrid,
        reference: VoxelGrid,
        pairs: Vec<(Matrix4, Matrix4)>,
    ) -> Result<Self> {
        if pairs.is_empty() {
            return Err(TransformError::empty_series(
                "non-linear series needs at least one (pre, post) pair",
            ));
        }
        for (pre, post) in &pairs {
            geometry::validate_affine(pre)?;
            geometry::validate_affine(post)?;
        }
        Ok(Self {
            field,
            source,
            reference,
            pairs,
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Per-volume `(pre, post)` matrices, world convention.
    pub fn pairs(&self) -> &[(Matrix4, Matrix4)] {
        &self.pairs
    }

    pub fn field(&self) -> &Arc<DisplacementField<B>> {
        &self.field
    }

    pub fn source_grid(&self) -> &VoxelGrid {
        &self.source
    }

    pub fn reference_grid(&self) -> &VoxelGrid {
        &self.reference
    }

    /// The single-volume transform for `index`; a length-1 series serves
    /// every index.
    pub fn volume(&self, index: usize) -> Option<NonLinearTransform<B>> {
        let (pre, post) = if self.pairs.len() == 1 {
            self.pairs.first()?
        } else {
            self.pairs.get(index)?
        };
        Some(NonLinearTransform::from_parts(
            Arc::clone(&self.field),
            self.source,
            self.reference,
            *pre,
            *post,
        ))
    }

    pub fn inverse(&self) -> Result<Self> {
        Err(TransformError::not_supported(
            "inverting a non-linear series requires numeric field inversion",
        ))
    }
}

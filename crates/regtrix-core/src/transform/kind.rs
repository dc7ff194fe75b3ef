//! The transform tagged union.

use std::fmt;

use burn::tensor::backend::Backend;

use crate::error::{Result, TransformError};
use crate::geometry::Matrix4;
use crate::space::VoxelGrid;

use super::affine::Affine;
use super::nonlinear::{NonLinearSeries, NonLinearTransform};
use super::series::AffineSeries;

/// Transform variant, ordered by promotion rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransformKind {
    Affine,
    AffineSeries,
    NonLinear,
    NonLinearSeries,
}

impl TransformKind {
    /// Whether this kind carries a displacement field.
    pub fn is_nonlinear(self) -> bool {
        matches!(self, Self::NonLinear | Self::NonLinearSeries)
    }

    /// Whether this kind holds one entry per volume.
    pub fn is_series(self) -> bool {
        matches!(self, Self::AffineSeries | Self::NonLinearSeries)
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Affine => "Affine",
            Self::AffineSeries => "AffineSeries",
            Self::NonLinear => "NonLinearTransform",
            Self::NonLinearSeries => "NonLinearSeries",
        };
        f.write_str(name)
    }
}

/// Any transform mapping source world coordinates to reference world
/// coordinates.
#[derive(Debug, Clone)]
pub enum Transform<B: Backend> {
    Affine(Affine),
    AffineSeries(AffineSeries),
    NonLinear(NonLinearTransform<B>),
    NonLinearSeries(NonLinearSeries<B>),
}

impl<B: Backend> Transform<B> {
    pub fn kind(&self) -> TransformKind {
        match self {
            Self::Affine(_) => TransformKind::Affine,
            Self::AffineSeries(_) => TransformKind::AffineSeries,
            Self::NonLinear(_) => TransformKind::NonLinear,
            Self::NonLinearSeries(_) => TransformKind::NonLinearSeries,
        }
    }

    /// Number of volumes the transform carries entries for (1 for
    /// single transforms).
    pub fn len(&self) -> usize {
        match self {
            Self::Affine(_) | Self::NonLinear(_) => 1,
            Self::AffineSeries(s) => s.len(),
            Self::NonLinearSeries(s) => s.len(),
        }
    }

    /// Always false: series cannot be empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn source_grid(&self) -> Option<&VoxelGrid> {
        match self {
            Self::Affine(a) => a.source_grid(),
            Self::AffineSeries(s) => s.source_grid(),
            Self::NonLinear(n) => Some(n.source_grid()),
            Self::NonLinearSeries(s) => Some(s.source_grid()),
        }
    }

    pub fn reference_grid(&self) -> Option<&VoxelGrid> {
        match self {
            Self::Affine(a) => a.reference_grid(),
            Self::AffineSeries(s) => s.reference_grid(),
            Self::NonLinear(n) => Some(n.reference_grid()),
            Self::NonLinearSeries(s) => Some(s.reference_grid()),
        }
    }

    /// Inverse transform of the same kind.
    ///
    /// # Errors
    /// `SingularMatrix` for non-invertible affines, `NotSupported` for
    /// non-linear kinds.
    pub fn inverse(&self) -> Result<Self> {
        match self {
            Self::Affine(a) => a.inverse().map(Self::Affine),
            Self::AffineSeries(s) => s.inverse().map(Self::AffineSeries),
            Self::NonLinear(n) => n.inverse().map(Self::NonLinear),
            Self::NonLinearSeries(s) => s.inverse().map(Self::NonLinearSeries),
        }
    }

    pub fn as_affine(&self) -> Option<&Affine> {
        match self {
            Self::Affine(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_affine_series(&self) -> Option<&AffineSeries> {
        match self {
            Self::AffineSeries(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_nonlinear(&self) -> Option<&NonLinearTransform<B>> {
        match self {
            Self::NonLinear(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_nonlinear_series(&self) -> Option<&NonLinearSeries<B>> {
        match self {
            Self::NonLinearSeries(s) => Some(s),
            _ => None,
        }
    }

    /// Check that this transform can be applied to `volumes` volumes.
    ///
    /// Length-1 transforms broadcast; longer series must match exactly.
    pub fn check_volume_count(&self, volumes: usize) -> Result<()> {
        let len = self.len();
        if len > 1 && len != volumes {
            return Err(TransformError::VolumeCountMismatch {
                expected: len,
                actual: volumes,
            });
        }
        Ok(())
    }
}

/// Conversion into a [`Transform`]; a bare matrix becomes a world-convention
/// affine without grids.
pub trait IntoTransform<B: Backend> {
    fn into_transform(self) -> Result<Transform<B>>;
}

impl<B: Backend> IntoTransform<B> for Transform<B> {
    fn into_transform(self) -> Result<Transform<B>> {
        Ok(self)
    }
}

impl<B: Backend> IntoTransform<B> for &Transform<B> {
    fn into_transform(self) -> Result<Transform<B>> {
        Ok(self.clone())
    }
}

impl<B: Backend> IntoTransform<B> for Matrix4 {
    fn into_transform(self) -> Result<Transform<B>> {
        Affine::from_world(self).map(Transform::Affine)
    }
}

impl<B: Backend> IntoTransform<B> for Affine {
    fn into_transform(self) -> Result<Transform<B>> {
        Ok(Transform::Affine(self))
    }
}

impl<B: Backend> IntoTransform<B> for AffineSeries {
    fn into_transform(self) -> Result<Transform<B>> {
        Ok(Transform::AffineSeries(self))
    }
}

impl<B: Backend> IntoTransform<B> for NonLinearTransform<B> {
    fn into_transform(self) -> Result<Transform<B>> {
        Ok(Transform::NonLinear(self))
    }
}

impl<B: Backend> IntoTransform<B> for NonLinearSeries<B> {
    fn into_transform(self) -> Result<Transform<B>> {
        Ok(Transform::NonLinearSeries(self))
    }
}

impl<B: Backend> From<Affine> for Transform<B> {
    fn from(affine: Affine) -> Self {
        Self::Affine(affine)
    }
}

impl<B: Backend> From<AffineSeries> for Transform<B> {
    fn from(series: AffineSeries) -> Self {
        Self::AffineSeries(series)
    }
}

impl<B: Backend> From<NonLinearTransform<B>> for Transform<B> {
    fn from(nlt: NonLinearTransform<B>) -> Self {
        Self::NonLinear(nlt)
    }
}

impl<B: Backend> From<NonLinearSeries<B>> for Transform<B> {
    fn from(series: NonLinearSeries<B>) -> Self {
        Self::NonLinearSeries(series)
    }
}

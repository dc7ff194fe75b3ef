//! Transform types and composition.
//!
//! This module provides the four transform variants, their tagged union and
//! the composition algebra between them.

pub mod affine;
pub mod compose;
pub mod displacement_field;
pub mod kind;
pub mod nonlinear;
pub mod series;

pub use affine::Affine;
pub use compose::{chain, compose};
pub use displacement_field::DisplacementField;
pub use kind::{IntoTransform, Transform, TransformKind};
pub use nonlinear::{NonLinearSeries, NonLinearTransform};
pub use series::AffineSeries;

//! Interpolation types and operations.
//!
//! This module provides interpolation traits and implementations
//! for sampling values at continuous coordinates.

pub mod linear;
pub mod nearest;
pub mod options;
pub mod trait_;

pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
pub use options::{BoundaryMode, InterpolationOptions, InterpolationOrder};
pub use trait_::Interpolator;

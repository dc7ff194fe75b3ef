pub mod error;
pub mod geometry;
pub mod image;
pub mod interpolation;
pub mod resample;
pub mod space;
pub mod transform;

pub use error::{Result, TransformError};
pub use geometry::Matrix4;
pub use image::ImageData;
pub use interpolation::{BoundaryMode, InterpolationOptions, InterpolationOrder};
pub use resample::{apply, apply_with_resampler, resolve, ResampleConfig, ResolveCache, WarpRequest, WarpResampler};
pub use space::{Convention, ConventionInfo, VoxelGrid};
pub use transform::{
    chain, compose, Affine, AffineSeries, DisplacementField, IntoTransform, NonLinearSeries, NonLinearTransform,
    Transform, TransformKind,
};

//! Resampling of image data through transforms.
//!
//! This module provides coordinate resolution with its per-batch cache, the
//! concurrent dispatch engine and the seam for external warp tools.

pub mod config;
pub mod dispatch;
pub mod resolve;
pub mod warp;

pub use config::ResampleConfig;
pub use dispatch::apply;
pub use resolve::{resolve, ResolveCache};
pub use warp::{apply_with_resampler, WarpRequest, WarpResampler};

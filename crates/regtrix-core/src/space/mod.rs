//! Voxel grids and coordinate conventions.
//!
//! This module provides the grid descriptor every transform and resampling
//! operation is expressed against, together with the world/FSL convention
//! conversions derived from it.

pub mod convention;
pub mod grid;
pub mod voxel_grid;

pub use convention::{Convention, ConventionInfo};
pub use grid::generate_index_grid;
pub use voxel_grid::VoxelGrid;

//! Voxel data containers.
//!
//! This module provides the 3D/4D data type the dispatch engine splits into
//! volumes and reassembles.

pub mod data;

pub use data::ImageData;

//! Resampling configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};
use crate::interpolation::InterpolationOptions;

/// Configuration for [`apply`](super::apply).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Number of volumes resampled concurrently; 1 runs on the calling thread.
    pub workers: usize,
    /// Interpolation kernel and boundary treatment.
    pub interpolation: InterpolationOptions,
    /// Clip output values into the input value range.
    pub clip_to_input_range: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            interpolation: InterpolationOptions::default(),
            clip_to_input_range: true,
        }
    }
}

impl ResampleConfig {
    /// Create a new resample config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the interpolation options.
    pub fn with_interpolation(mut self, interpolation: InterpolationOptions) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Disable output clipping.
    pub fn without_clipping(mut self) -> Self {
        self.clip_to_input_range = false;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TransformError::invalid_configuration(
                "Worker count must be at least 1",
            ));
        }
        if !self.interpolation.fill_value.is_finite() {
            return Err(TransformError::invalid_configuration(format!(
                "Fill value must be finite, got {}",
                self.interpolation.fill_value
            )));
        }
        Ok(())
    }
}

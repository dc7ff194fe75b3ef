//! Error types for transform construction, composition and application.
//!
//! Every fallible operation in the crate returns [`TransformError`]. Errors are
//! surfaced synchronously to the caller and never retried internally.

use thiserror::Error;

use crate::transform::TransformKind;

/// Main error type for transform operations.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Matrix does not have the expected 4x4 shape.
    #[error("Invalid matrix: expected 4x4, got {rows}x{cols}")]
    InvalidMatrix { rows: usize, cols: usize },

    /// Matrix has a perspective component.
    #[error("Invalid affine: last row must be [0, 0, 0, 1], got {0:?}")]
    InvalidBottomRow([f64; 4]),

    /// Matrix cannot be inverted.
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// Series constructed from no entries.
    #[error("Empty series: {0}")]
    EmptySeries(String),

    /// Unknown convention tag.
    #[error("Unrecognised convention '{0}', expected 'world' or 'fsl'")]
    UnrecognisedConvention(String),

    /// Legacy convention requested without the grids it is defined against.
    #[error("Missing grid: {0}")]
    MissingGrid(String),

    /// Voxel grid descriptor is malformed.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// Displacement field is malformed.
    #[error("Invalid displacement field: {0}")]
    InvalidField(String),

    /// Series operands of different lengths.
    #[error("Length mismatch: cannot compose series of length {outer} with series of length {inner}")]
    LengthMismatch { outer: usize, inner: usize },

    /// Operand pairing without an algebraic composition, such as two
    /// displacement fields.
    #[error("Unsupported composition: {outer} after {inner}")]
    UnsupportedComposition {
        outer: TransformKind,
        inner: TransformKind,
    },

    /// Data rank other than 3 or 4.
    #[error("Invalid data rank {0}: only 3D and 4D data are supported")]
    InvalidRank(usize),

    /// Data volume count does not match the series length.
    #[error("Volume count mismatch: transform has {expected} volumes, data has {actual}")]
    VolumeCountMismatch { expected: usize, actual: usize },

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Tensor data could not be read back.
    #[error("Tensor error: {0}")]
    Tensor(String),

    /// Operation not available for this transform.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// External collaborator failure while processing one volume.
    #[error("External tool failed on volume {volume} of {kind}: {source}")]
    ExternalTool {
        volume: usize,
        kind: TransformKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

impl TransformError {
    /// Create a singular matrix error.
    pub fn singular(msg: impl Into<String>) -> Self {
        Self::SingularMatrix(msg.into())
    }

    /// Create an empty series error.
    pub fn empty_series(msg: impl Into<String>) -> Self {
        Self::EmptySeries(msg.into())
    }

    /// Create a missing grid error.
    pub fn missing_grid(msg: impl Into<String>) -> Self {
        Self::MissingGrid(msg.into())
    }

    /// Create an invalid grid error.
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::InvalidField(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a tensor error.
    pub fn tensor(msg: impl Into<String>) -> Self {
        Self::Tensor(msg.into())
    }

    /// Create a not-supported error.
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Wrap a collaborator failure with the volume and transform it occurred on.
    pub fn external(
        volume: usize,
        kind: TransformKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ExternalTool {
            volume,
            kind,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransformError::UnrecognisedConvention("scanner".to_string());
        assert_eq!(
            err.to_string(),
            "Unrecognised convention 'scanner', expected 'world' or 'fsl'"
        );
    }

    #[test]
    fn test_length_mismatch_display() {
        let err = TransformError::LengthMismatch { outer: 3, inner: 5 };
        let msg = err.to_string();
        assert!(msg.contains("length 3"));
        assert!(msg.contains("length 5"));
    }

    #[test]
    fn test_external_keeps_volume_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "applywarp missing");
        let err = TransformError::external(2, TransformKind::NonLinearSeries, io);
        assert!(matches!(
            err,
            TransformError::ExternalTool { volume: 2, kind: TransformKind::NonLinearSeries, .. }
        ));
        let msg = err.to_string();
        assert!(msg.contains("applywarp missing"));
        assert!(msg.contains("volume 2"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

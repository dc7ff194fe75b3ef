//! Coordinate conventions for transformation matrices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// Convention a transformation matrix is expressed in.
///
/// * `World` maps world (scanner, millimetre) coordinates of the source to
///   world coordinates of the reference. This is the internal representation.
/// * `Fsl` maps FSL scaled-voxel coordinates of the source to those of the
///   reference (FLIRT/MCFLIRT output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    World,
    Fsl,
}

impl Convention {
    /// Convention assumed when the caller does not specify one.
    ///
    /// Matrices supplied together with both grids are assumed to come from
    /// FSL tools; anything else is assumed to be in world convention.
    pub fn default_for(has_grids: bool) -> Self {
        if has_grids {
            Convention::Fsl
        } else {
            Convention::World
        }
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Convention::World => write!(f, "world"),
            Convention::Fsl => write!(f, "fsl"),
        }
    }
}

impl FromStr for Convention {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "world" => Ok(Convention::World),
            "fsl" => Ok(Convention::Fsl),
            _ => Err(TransformError::UnrecognisedConvention(s.to_string())),
        }
    }
}

/// The convention a transform's input matrix was read in, and whether it was
/// chosen by default rather than by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionInfo {
    pub convention: Convention,
    pub defaulted: bool,
}

impl ConventionInfo {
    /// Resolve an optional caller choice against the grids available.
    pub fn resolve(requested: Option<Convention>, has_grids: bool) -> Self {
        match requested {
            Some(convention) => Self {
                convention,
                defaulted: false,
            },
            None => {
                let convention = Convention::default_for(has_grids);
                tracing::debug!("No convention given, assuming {} convention", convention);
                Self {
                    convention,
                    defaulted: true,
                }
            }
        }
    }

    /// Explicit world convention, used for the results of composition.
    pub fn world() -> Self {
        Self {
            convention: Convention::World,
            defaulted: false,
        }
    }
}

//! Error types for raster reprojection.

use thiserror::Error;

use crate::extent::ExtentParseError;
use crate::projection::ProjectionParseError;

/// Result type alias using ReprojError.
pub type ReprojResult<T> = Result<T, ReprojError>;

/// Primary error type for reprojection operations.
#[derive(Debug, Error)]
pub enum ReprojError {
    // === Rendering Errors ===
    #[error("Failed to allocate {width}x{height} raster")]
    AllocationFailure { width: u32, height: u32 },

    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    // === Geometry Errors ===
    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    #[error("Unknown projection: {0}")]
    UnknownProjection(String),

    #[error("No transform from {from} to {to}")]
    NoTransform { from: String, to: String },

    // === Source Errors ===
    #[error("Failed to fetch source raster: {0}")]
    Fetch(String),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<ExtentParseError> for ReprojError {
    fn from(err: ExtentParseError) -> Self {
        ReprojError::InvalidExtent(err.to_string())
    }
}

impl From<ProjectionParseError> for ReprojError {
    fn from(err: ProjectionParseError) -> Self {
        ReprojError::UnknownProjection(err.to_string())
    }
}

impl From<std::io::Error> for ReprojError {
    fn from(err: std::io::Error) -> Self {
        ReprojError::Fetch(err.to_string())
    }
}

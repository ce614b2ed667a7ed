//! Error types for landslip

use thiserror::Error;

/// Main error type for landslip operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Moisture layer {layer} size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    LayerSizeMismatch {
        layer: usize,
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    #[error("Layer count mismatch: soil profile defines {expected} layers, got {actual} moisture rasters")]
    LayerCountMismatch { expected: usize, actual: usize },

    #[error("Soil profile is not strictly increasing at boundary {index}: {previous} -> {value}")]
    NonMonotonicProfile {
        index: usize,
        previous: f64,
        value: f64,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Singular {input} at cell ({row}, {col}): {value} ({reason})")]
    SingularCell {
        input: &'static str,
        row: usize,
        col: usize,
        value: f64,
        reason: &'static str,
    },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Rasters or layer stacks in a single call disagree in shape or count
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            Error::SizeMismatch { .. }
                | Error::LayerSizeMismatch { .. }
                | Error::LayerCountMismatch { .. }
        )
    }

    /// A value lies outside the domain of the physical model
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Error::NonMonotonicProfile { .. }
                | Error::InvalidParameter { .. }
                | Error::SingularCell { .. }
        )
    }
}

/// Result type alias for landslip operations
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the coriolis crate.
//!
//! This module defines a comprehensive error enum that covers all possible
//! error conditions in the crate. Every condition is fatal: the engine never
//! retries or recovers, and misuse of a contract surfaces immediately.

use thiserror::Error;

use crate::dtype::Dtype;

/// The main error type for coriolis operations.
#[derive(Error, Debug)]
pub enum CoriolisError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// Array shape errors
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Data not found errors
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// An adapter or kernel produced a different element type than declared
    #[error("Type mismatch: expected dtype {expected}, got {got}")]
    TypeMismatch { expected: Dtype, got: Dtype },

    /// Dimension-contract violations (naming, ordering, sizes)
    #[error("Dimension error: {message}")]
    Dimension { message: String },

    /// Chunking-contract violations
    #[error("Chunking error: {message}")]
    Chunking { message: String },

    /// A blockwise kernel returned the wrong output count, dtype or shape
    #[error("Output mismatch: {message}")]
    Output { message: String },

    /// Dtype coercion failures (item sizes not integer multiples)
    #[error("Dtype coercion error: {message}")]
    Coercion { message: String },

    /// Out-of-range integer indices in index-based adapters
    #[error("Index out of bounds: {message}")]
    IndexOutOfBounds { message: String },
}

/// Convenience type alias for Results with CoriolisError
pub type Result<T> = std::result::Result<T, CoriolisError>;

//! Centralized error handling for auto_qc
//!
//! Checks themselves never fail: they report problems through
//! [`CheckResult`](crate::check::CheckResult). The error type below covers
//! loading data, building fields and the helpers (averaging, summaries) that
//! can hit a genuinely degenerate input.

use std::fmt;

/// Main error type for auto_qc operations
#[derive(Debug)]
pub enum AutoQcError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Variable not found in a dataset
    VariableNotFound { var: String },

    /// Dimension not found in variable
    DimensionNotFound { var: String, dim: String },

    /// Dimension names, lengths or ranks that do not line up
    DimensionMismatch { message: String },

    /// A variable carries a dimension outside the configured x/y/z/time axes
    UnsupportedAxis { var: String, dim: String },

    /// Time coordinate could not be decoded
    InvalidTime { reason: String },

    /// No area or volume weights available for averaging
    MissingWeights { weights: String, var: String },

    /// Weights sum to zero over an averaging region
    ZeroTotalWeight { var: String },

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Generic error for everything else
    Generic(String),
}

impl fmt::Display for AutoQcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoQcError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            AutoQcError::IoError(e) => write!(f, "I/O error: {}", e),
            AutoQcError::ArrayError(e) => write!(f, "Array error: {}", e),
            AutoQcError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found in dataset", var)
            }
            AutoQcError::DimensionNotFound { var, dim } => {
                write!(f, "Dimension '{}' not found in variable '{}'", dim, var)
            }
            AutoQcError::DimensionMismatch { message } => {
                write!(f, "Dimension mismatch: {}", message)
            }
            AutoQcError::UnsupportedAxis { var, dim } => write!(
                f,
                "Variable '{}' has dimension '{}' which is not one of the configured axes",
                var, dim
            ),
            AutoQcError::InvalidTime { reason } => write!(f, "Invalid time axis: {}", reason),
            AutoQcError::MissingWeights { weights, var } => write!(
                f,
                "No '{}' weights available to average '{}'",
                weights, var
            ),
            AutoQcError::ZeroTotalWeight { var } => {
                write!(f, "Total weight is zero while averaging '{}'", var)
            }
            AutoQcError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            AutoQcError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AutoQcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AutoQcError::NetCDFError(e) => Some(e),
            AutoQcError::IoError(e) => Some(e),
            AutoQcError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for AutoQcError {
    fn from(error: netcdf::Error) -> Self {
        AutoQcError::NetCDFError(error)
    }
}

impl From<std::io::Error> for AutoQcError {
    fn from(error: std::io::Error) -> Self {
        AutoQcError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for AutoQcError {
    fn from(error: ndarray::ShapeError) -> Self {
        AutoQcError::ArrayError(error)
    }
}

impl From<String> for AutoQcError {
    fn from(error: String) -> Self {
        AutoQcError::Generic(error)
    }
}

impl From<&str> for AutoQcError {
    fn from(error: &str) -> Self {
        AutoQcError::Generic(error.to_string())
    }
}

/// Result type alias for auto_qc operations
pub type Result<T> = std::result::Result<T, AutoQcError>;

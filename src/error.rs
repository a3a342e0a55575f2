use thiserror::Error;

use crate::parameters::bounds::BoundsError;

/// Error types for the paramfit-rs library.
#[derive(Error, Debug)]
pub enum FitError {
    /// A parameter leaf is not a numeric scalar.
    #[error("Type mismatch at '{key}': expected a numeric scalar, found {found}")]
    TypeMismatch { key: String, found: String },

    /// A parameter name is not part of the model's assignable surface.
    #[error("Cannot set parameter '{name}': not an assignable field of the model")]
    UnknownParameter { name: String },

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// A key segment is empty or contains the path separator.
    #[error("Invalid parameter key: {0}")]
    InvalidKey(String),

    /// Two flat keys describe both a leaf and a group at the same path.
    #[error("Conflicting parameter keys at '{0}'")]
    KeyConflict(String),

    /// Error for boundary constraint violations.
    #[error("Bounds error: {0}")]
    Bounds(#[from] BoundsError),

    /// Error indicating a mismatch in vector dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error during function evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Backend options that cannot be run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Not implemented functionality.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Malformed reference dataset.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV parsing error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type alias for paramfit-rs operations.
pub type Result<T> = std::result::Result<T, FitError>;

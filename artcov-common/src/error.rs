//! Common error types for artcov

use thiserror::Error;

use crate::data::ValidationError;
use crate::grid::GridError;
use crate::model::ModelError;

/// Common result type for artcov operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the artcov crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Document is well-formed JSON but does not match the expected layout
    #[error("Format error: {0}")]
    Format(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Imported data violates a data invariant
    #[error("Invalid data: {0}")]
    Validation(#[from] ValidationError),

    /// Edit rejected by the computed model
    #[error("Edit rejected: {0}")]
    Model(#[from] ModelError),

    /// Edit addressed a cell that does not exist
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),
}

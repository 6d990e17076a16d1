//! Error types for the MIG module.

use thiserror::Error;

use gcpmod_core::{CoreError, ValidationErrors};

/// Result type alias for MIG operations.
pub type MigResult<T> = Result<T, MigError>;

/// Errors that can occur while validating or composing a group.
#[derive(Error, Debug)]
pub enum MigError {
    #[error("Group configuration invalid:\n{0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Core(#[from] CoreError),
}

//! Error types for the ILB module.

use thiserror::Error;

use gcpmod_core::{CoreError, ValidationErrors};

/// Result type alias for ILB operations.
pub type IlbResult<T> = Result<T, IlbError>;

/// Errors that can occur while validating or composing a balancer.
#[derive(Error, Debug)]
pub enum IlbError {
    #[error("Balancer configuration invalid:\n{0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Core(#[from] CoreError),
}

//! Error types for stack composition.

use thiserror::Error;

use gcpmod_core::{CoreError, ValidationErrors};
use gcpmod_ilb::IlbError;
use gcpmod_mig::MigError;

/// Result type alias for stack operations.
pub type StackResult<T> = Result<T, StackError>;

/// Errors that can occur while loading, validating or composing a stack.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Stack configuration invalid:\n{0}")]
    Invalid(#[from] ValidationErrors),

    #[error("Group composition failed: {0}")]
    Group(#[from] MigError),

    #[error("Balancer composition failed: {0}")]
    Balancer(#[from] IlbError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StackError {
    /// Validation errors carried by this error, if it is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            StackError::Invalid(errors)
            | StackError::Group(MigError::Invalid(errors))
            | StackError::Balancer(IlbError::Invalid(errors))
            | StackError::Core(CoreError::Invalid(errors)) => Some(errors),
            _ => None,
        }
    }
}

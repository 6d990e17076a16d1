//! Error types for the core module.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while composing or rendering resources.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration validation failed:\n{0}")]
    Invalid(ValidationErrors),

    #[error("Duplicate resource declaration: {0}")]
    DuplicateResource(String),

    #[error("Resource {from} depends on undeclared resource {to}")]
    UnknownDependency { from: String, to: String },

    #[error("Dependency cycle detected among: {0}")]
    DependencyCycle(String),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        CoreError::Invalid(errors)
    }
}

/// A single violated configuration rule.
///
/// Every variant carries the dotted path of the offending field
/// (for example `autoscaler.max_replicas` or `backends[1].balancing_mode`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("conflicting options {}: {reason}", .fields.join(", "))]
    ConflictingOptions { fields: Vec<String>, reason: String },

    #[error("invalid value {value:?} for {field}; allowed: {}", .allowed.join(", "))]
    InvalidEnumValue {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("{field} = {value} violates {constraint}")]
    RangeViolation {
        field: String,
        value: String,
        constraint: String,
    },

    #[error("{field} = {value:?} is not a valid {expected}")]
    InvalidFormat {
        field: String,
        value: String,
        expected: String,
    },
}

impl ValidationError {
    /// Primary field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::ConflictingOptions { fields, .. } => {
                fields.first().map(String::as_str).unwrap_or_default()
            }
            ValidationError::InvalidEnumValue { field, .. }
            | ValidationError::MissingRequiredField { field }
            | ValidationError::RangeViolation { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }

    /// Short category name, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::ConflictingOptions { .. } => "conflicting_options",
            ValidationError::InvalidEnumValue { .. } => "invalid_enum_value",
            ValidationError::MissingRequiredField { .. } => "missing_required_field",
            ValidationError::RangeViolation { .. } => "range_violation",
            ValidationError::InvalidFormat { .. } => "invalid_format",
        }
    }

    /// Re-root the field path(s) of this error under `prefix`.
    pub fn prefixed(self, prefix: &str) -> Self {
        if prefix.is_empty() {
            return self;
        }
        let join = |field: String| format!("{}.{}", prefix, field);
        match self {
            ValidationError::ConflictingOptions { fields, reason } => {
                ValidationError::ConflictingOptions {
                    fields: fields.into_iter().map(join).collect(),
                    reason,
                }
            }
            ValidationError::InvalidEnumValue {
                field,
                value,
                allowed,
            } => ValidationError::InvalidEnumValue {
                field: join(field),
                value,
                allowed,
            },
            ValidationError::MissingRequiredField { field } => {
                ValidationError::MissingRequiredField { field: join(field) }
            }
            ValidationError::RangeViolation {
                field,
                value,
                constraint,
            } => ValidationError::RangeViolation {
                field: join(field),
                value,
                constraint,
            },
            ValidationError::InvalidFormat {
                field,
                value,
                expected,
            } => ValidationError::InvalidFormat {
                field: join(field),
                value,
                expected,
            },
        }
    }
}

/// Every rule a configuration violated, in the order they were checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }

    /// Whether any error refers to `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|e| match e {
            ValidationError::ConflictingOptions { fields, .. } => fields.iter().any(|f| f == field),
            other => other.field() == field,
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

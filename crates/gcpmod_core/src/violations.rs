//! Rule collection for configuration validators.
//!
//! Validators never stop at the first problem: each rule records its
//! violation here and checking continues, so a caller sees every issue at
//! once. Warnings are kept alongside for conditions the provider tolerates.

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ValidationError, ValidationErrors};

/// A configuration that passed validation, plus any non-fatal notes.
#[derive(Debug, Clone)]
pub struct Validated<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Validated<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Validated<U> {
        Validated {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Closed set of string values accepted by a configuration field.
pub trait ConfigEnum: Sized + Copy + 'static {
    const VARIANTS: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(value: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.as_str() == value)
    }

    fn allowed() -> Vec<String> {
        Self::VARIANTS.iter().map(|v| v.as_str().to_string()).collect()
    }
}

/// Declare a [`ConfigEnum`] with its wire spelling per variant.
#[macro_export]
macro_rules! config_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::ConfigEnum for $name {
            const VARIANTS: &'static [Self] = &[$($name::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::ConfigEnum::as_str(self))
            }
        }
    };
}

/// Collector for validation errors and warnings.
#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<ValidationError>,
    warnings: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn merge(&mut self, other: Violations) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Fold a nested validation outcome into this collector under `prefix`.
    pub fn absorb<T>(
        &mut self,
        prefix: &str,
        outcome: Result<Validated<T>, ValidationErrors>,
    ) -> Option<T> {
        match outcome {
            Ok(validated) => {
                self.warnings.extend(
                    validated
                        .warnings
                        .into_iter()
                        .map(|w| prefix_warning(prefix, w)),
                );
                Some(validated.value)
            }
            Err(errors) => {
                self.errors
                    .extend(errors.into_iter().map(|e| e.prefixed(prefix)));
                None
            }
        }
    }

    /// Finish validation: the value if no rule was violated, every error otherwise.
    pub fn finish<T>(self, value: T) -> Result<Validated<T>, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(Validated {
                value,
                warnings: self.warnings,
            })
        } else {
            Err(ValidationErrors::new(self.errors))
        }
    }

    /// Give up on building a value; returns the errors collected so far.
    pub fn into_errors(self) -> ValidationErrors {
        ValidationErrors::new(self.errors)
    }

    /// Record a missing required field and pass the value through.
    pub fn require<'a, T: ?Sized>(&mut self, field: &str, value: Option<&'a T>) -> Option<&'a T> {
        if value.is_none() {
            self.push(ValidationError::MissingRequiredField {
                field: field.to_string(),
            });
        }
        value
    }

    /// Parse an enum field, recording the allowed set on failure.
    pub fn parse_enum<E: ConfigEnum>(&mut self, field: &str, value: &str) -> Option<E> {
        let parsed = E::parse(value);
        if parsed.is_none() {
            self.push(ValidationError::InvalidEnumValue {
                field: field.to_string(),
                value: value.to_string(),
                allowed: E::allowed(),
            });
        }
        parsed
    }

    /// Parse an optional enum field, falling back to `default` when absent.
    pub fn enum_or<E: ConfigEnum>(&mut self, field: &str, value: Option<&str>, default: E) -> Option<E> {
        match value {
            Some(v) => self.parse_enum(field, v),
            None => Some(default),
        }
    }

    /// Record a range violation unless `ok` holds.
    pub fn check_range(
        &mut self,
        field: &str,
        ok: bool,
        value: impl Display,
        constraint: impl Into<String>,
    ) -> bool {
        if !ok {
            self.push(ValidationError::RangeViolation {
                field: field.to_string(),
                value: value.to_string(),
                constraint: constraint.into(),
            });
        }
        ok
    }

    /// Integer field within `range`, or `default` when absent.
    pub fn int_in(
        &mut self,
        field: &str,
        value: Option<i64>,
        default: i64,
        range: RangeInclusive<i64>,
    ) -> Option<i64> {
        let value = value.unwrap_or(default);
        let constraint = if *range.end() == i64::MAX {
            format!("{} >= {}", field, range.start())
        } else {
            format!("{} <= {} <= {}", range.start(), field, range.end())
        };
        self.check_range(field, range.contains(&value), value, constraint)
            .then_some(value)
    }

    /// Like [`Violations::int_in`] for a field without a default.
    ///
    /// `Some(None)` means absent, `None` means a violation was recorded.
    pub fn optional_int_in(
        &mut self,
        field: &str,
        value: Option<i64>,
        range: RangeInclusive<i64>,
    ) -> Option<Option<i64>> {
        match value {
            Some(n) => self.int_in(field, Some(n), n, range).map(Some),
            None => Some(None),
        }
    }

    /// Check a GCP resource name.
    pub fn check_name(&mut self, field: &str, value: &str) -> bool {
        let ok = is_valid_name(value);
        if !ok {
            self.push(ValidationError::InvalidFormat {
                field: field.to_string(),
                value: value.to_string(),
                expected: "resource name (lowercase letters, digits and hyphens, 1-63 chars, starting with a letter)".to_string(),
            });
        }
        ok
    }

    /// Allow at most one of the named options to be present.
    pub fn at_most_one(&mut self, options: &[(&str, bool)], reason: &str) -> bool {
        let present: Vec<String> = options
            .iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name.to_string())
            .collect();
        if present.len() > 1 {
            self.push(ValidationError::ConflictingOptions {
                fields: present,
                reason: reason.to_string(),
            });
            return false;
        }
        true
    }
}

fn prefix_warning(prefix: &str, warning: String) -> String {
    if prefix.is_empty() {
        warning
    } else {
        format!("{}: {}", prefix, warning)
    }
}

fn name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z]([-a-z0-9]{0,61}[a-z0-9])?$").ok())
        .as_ref()
}

/// Whether `value` is a valid GCP resource name (RFC 1035 label).
pub fn is_valid_name(value: &str) -> bool {
    name_pattern().is_some_and(|re| re.is_match(value))
}

/// Dotted path for an element of a list field.
pub fn indexed(field: &str, index: usize) -> String {
    format!("{}[{}]", field, index)
}

use thiserror::Error;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Result type for estimator operations
pub type EstimatorResult<T> = Result<T, EstimatorError>;

/// Errors that stop an estimate before anything is computed.
///
/// Inconsistent-but-resolvable selections never end up here; they are
/// priced deterministically and reported as [`crate::Warning`]s instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    /// A caller-supplied configuration value is out of its domain
    #[error("Invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: String, reason: String },

    /// A pricing table supplied by the settings surface is malformed
    #[error("Invalid pricing table `{table}`: {reason}")]
    InvalidPricingTable { table: String, reason: String },

    /// Add-on selection references an id missing from the catalogue
    #[error("Unknown add-on: {0}")]
    UnknownAddOn(String),

    /// Service selection references an id missing from the rate card
    #[error("Unknown service: {0}")]
    UnknownService(String),

    /// Service has neither a regional nor a default rate
    #[error("No rate for service `{service}` in region `{region}`")]
    MissingServiceRate { service: String, region: String },
}

impl EstimatorError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn table(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPricingTable {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Field path of a configuration error, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidConfig { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Convert `validator` output, prefixing field paths with `scope`.
    pub(crate) fn from_validation(scope: &str, errors: &ValidationErrors) -> Self {
        match first_violation(errors, scope) {
            Some((field, reason)) => Self::InvalidConfig { field, reason },
            None => Self::invalid(scope, errors.to_string()),
        }
    }
}

/// Walk nested validation errors and return the first offending path.
///
/// Field names are visited in sorted order so the reported field is stable
/// across runs.
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(err) = errs.first() {
                    return Some((path, describe(err)));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{index}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }

    None
}

fn describe(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("failed `{}` check", err.code))
}

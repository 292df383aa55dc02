//! Domain errors

use std::fmt;

use thiserror::Error;

/// A single failed field constraint, carrying a localizable message key
/// such as `user.not_valid_email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub key: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.key)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Domain-level error types
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// Uniqueness violation, keyed like `user.duplicate_email`
    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, key)])
    }

    /// Message keys of all failed constraints, empty for non-validation errors.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Validation(errors) => errors.iter().map(|e| e.key.as_str()).collect(),
            Self::Conflict(key) => vec![key.as_str()],
            _ => Vec::new(),
        }
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for DomainError {
    fn from(e: bcrypt::BcryptError) -> Self {
        Self::Crypto(e.to_string())
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

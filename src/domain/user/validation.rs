//! Field-level validation of user records
//!
//! Constraints are declared with `validator` on [`User`]; this module holds
//! the shared patterns, the custom checks and the translation of
//! `validator` errors into message-keyed [`FieldError`]s.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use super::User;
use crate::domain::{DomainError, DomainResult, FieldError};

/// Accepted username charset
pub static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("username pattern is valid"));

pub const USERNAME_MIN_LEN: usize = 2;
pub const USERNAME_MAX_LEN: usize = 50;

/// Display names must contain something other than whitespace.
pub fn not_blank_trimmed(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("user.not_valid_display_name".into());
        return Err(err);
    }
    Ok(())
}

/// Whether `username` is an acceptable normalized username.
pub fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) && USERNAME_PATTERN.is_match(username)
}

/// Flatten `validator` output into field errors, ordered by field name.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let key = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                FieldError::new(field.to_string(), key)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.key.cmp(&b.key)));
    out.dedup();
    out
}

/// Check every declared constraint of `user`.
pub fn validate_user(user: &User) -> DomainResult<()> {
    user.validate()
        .map_err(|errors| DomainError::Validation(field_errors(&errors)))
}

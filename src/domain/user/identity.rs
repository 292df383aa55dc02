//! Compact session identity payload
//!
//! A user is cached in the session as the JSON triple
//! `[id, username, password_hash]`. Decoding accepts that exact shape and
//! nothing else; no other structure is ever reconstructed from a payload.

use serde_json::Value;
use thiserror::Error;

use super::validation::is_valid_username;
use super::{StoredUser, User, UserStatus};

#[derive(Debug, Error)]
pub enum IdentityPayloadError {
    #[error("identity payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("identity payload must be a 3-element array, got {0}")]
    Shape(String),

    #[error("identity payload field `{field}` is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("user has no id yet and cannot be cached in a session")]
    Unpersisted,
}

/// The minimal identity kept for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
}

impl SessionIdentity {
    pub fn encode(&self) -> String {
        Value::Array(vec![
            Value::from(self.id),
            Value::from(self.username.as_str()),
            Value::from(self.password_hash.as_str()),
        ])
        .to_string()
    }

    /// Parse a payload produced by [`SessionIdentity::encode`].
    ///
    /// The id must be a positive integer, the username must already be in
    /// normalized form and the hash must be non-empty.
    pub fn decode(payload: &str) -> Result<Self, IdentityPayloadError> {
        let value: Value = serde_json::from_str(payload)?;

        let items = match value {
            Value::Array(items) if items.len() == 3 => items,
            Value::Array(items) => {
                return Err(IdentityPayloadError::Shape(format!(
                    "{} elements",
                    items.len()
                )))
            }
            other => {
                return Err(IdentityPayloadError::Shape(json_kind(&other).to_string()))
            }
        };

        let id = items[0]
            .as_i64()
            .and_then(|id| i32::try_from(id).ok())
            .filter(|id| *id > 0)
            .ok_or(IdentityPayloadError::InvalidField {
                field: "id",
                reason: "expected a positive 32-bit integer",
            })?;

        let username = items[1]
            .as_str()
            .filter(|u| is_valid_username(u))
            .ok_or(IdentityPayloadError::InvalidField {
                field: "username",
                reason: "expected a normalized username",
            })?;

        let password_hash = items[2]
            .as_str()
            .filter(|h| !h.is_empty())
            .ok_or(IdentityPayloadError::InvalidField {
                field: "password",
                reason: "expected a non-empty string",
            })?;

        Ok(Self {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl User {
    pub fn session_identity(&self) -> Result<SessionIdentity, IdentityPayloadError> {
        let id = self.id().ok_or(IdentityPayloadError::Unpersisted)?;
        Ok(SessionIdentity {
            id,
            username: self.username().to_string(),
            password_hash: self.password().to_string(),
        })
    }

    /// Encode `[id, username, password_hash]` for session caching.
    pub fn serialize_identity(&self) -> Result<String, IdentityPayloadError> {
        Ok(self.session_identity()?.encode())
    }

    /// Rebuild the partial user held in a session payload.
    ///
    /// Only id, username and password hash are populated; everything else
    /// carries its default until the record is reloaded from storage.
    pub fn from_identity_payload(payload: &str) -> Result<Self, IdentityPayloadError> {
        let identity = SessionIdentity::decode(payload)?;
        Ok(User::from(StoredUser {
            id: identity.id,
            display_name: String::new(),
            username: identity.username,
            email: String::new(),
            password: identity.password_hash,
            roles: Vec::new(),
            last_seen_at: None,
            last_ip: None,
            locale: None,
            backend_theme: None,
            status: UserStatus::default(),
        }))
    }
}

//! User identity record

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::auth_token::UserAuthToken;
use super::validation::{not_blank_trimmed, USERNAME_PATTERN};
use crate::domain::{DomainError, DomainResult};
use crate::shared::{find_scalar, find_scalar_in_str, slugify_username};

/// Role every account holds when none is stored.
pub const DEFAULT_ROLE: &str = "ROLE_USER";

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Enabled,
    Disabled,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            "pending" => Ok(Self::Pending),
            _ => Err(DomainError::validation("status", "user.not_valid_status")),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column values of a user as read back from storage.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub id: i32,
    pub display_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub roles: Vec<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_ip: Option<String>,
    pub locale: Option<String>,
    pub backend_theme: Option<String>,
    pub status: UserStatus,
}

/// An application account.
///
/// `password` always holds a hash. The cleartext `plain_password` only
/// lives between a credential change and [`User::erase_credentials`] and
/// is never persisted.
#[derive(Clone, Validate)]
pub struct User {
    id: Option<i32>,

    #[validate(
        custom(function = "not_blank_trimmed"),
        length(min = 2, max = 50, message = "user.not_valid_display_name")
    )]
    display_name: String,

    #[validate(
        length(min = 2, max = 50, message = "user.not_valid_username"),
        regex(path = *USERNAME_PATTERN, message = "user.username_invalid_characters")
    )]
    username: String,

    #[validate(email(message = "user.not_valid_email"))]
    email: String,

    password: String,

    #[validate(length(min = 6, message = "user.not_valid_password"))]
    plain_password: Option<String>,

    roles: Vec<String>,
    last_seen_at: Option<DateTime<Utc>>,
    last_ip: Option<String>,
    locale: Option<String>,
    backend_theme: Option<String>,
    status: UserStatus,
    auth_token: Option<UserAuthToken>,
}

impl User {
    /// A new, unsaved account. `username` is normalized into a slug.
    pub fn new(
        display_name: impl Into<String>,
        username: &str,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            display_name: display_name.into(),
            username: slugify_username(username),
            email: email.into(),
            password: String::new(),
            plain_password: None,
            roles: Vec::new(),
            last_seen_at: None,
            last_ip: None,
            locale: None,
            backend_theme: None,
            status: UserStatus::default(),
            auth_token: None,
        }
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    /// Record the storage-assigned id. Once set, an id never changes.
    pub fn assign_id(&mut self, id: i32) -> DomainResult<()> {
        match self.id {
            Some(current) if current != id => {
                Err(DomainError::validation("id", "user.id_immutable"))
            }
            _ => {
                self.id = Some(id);
                if let Some(token) = self.auth_token.as_mut() {
                    token.set_user_id(Some(id));
                }
                Ok(())
            }
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Store the slug of `raw` (lowercase, `_`-separated).
    pub fn set_username(&mut self, raw: &str) {
        self.username = slugify_username(raw);
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    /// Hashed credential
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, password_hash: impl Into<String>) {
        self.password = password_hash.into();
    }

    pub fn plain_password(&self) -> Option<&str> {
        self.plain_password.as_deref()
    }

    pub fn set_plain_password(&mut self, plain_password: impl Into<String>) {
        self.plain_password = Some(plain_password.into());
    }

    /// Drop the cleartext password. The hash is left untouched.
    pub fn erase_credentials(&mut self) {
        self.plain_password = None;
    }

    /// Granted roles, deduplicated in first-seen order.
    ///
    /// Falls back to [`DEFAULT_ROLE`] when nothing is stored. The fallback
    /// is computed on every read and never written back.
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = Vec::with_capacity(self.roles.len().max(1));
        for role in &self.roles {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }
        if roles.is_empty() {
            roles.push(DEFAULT_ROLE.to_string());
        }
        roles
    }

    /// Roles exactly as stored
    pub fn stored_roles(&self) -> &[String] {
        &self.roles
    }

    pub fn set_roles<I, S>(&mut self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r == role)
    }

    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen_at
    }

    pub fn set_last_seen_at(&mut self, at: DateTime<Utc>) {
        self.last_seen_at = Some(at);
    }

    pub fn last_ip(&self) -> Option<&str> {
        self.last_ip.as_deref()
    }

    pub fn set_last_ip(&mut self, ip: Option<String>) {
        self.last_ip = ip;
    }

    /// Session touch: remember when and from where the account was last seen.
    pub fn touch(&mut self, ip: Option<String>, now: DateTime<Utc>) {
        self.last_seen_at = Some(now);
        self.last_ip = ip;
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Store a flat locale. JSON-encoded structures are reduced to their
    /// first scalar, or to nothing when they hold none.
    pub fn set_locale(&mut self, raw: Option<&str>) {
        self.locale = raw.and_then(find_scalar_in_str);
    }

    /// Like [`User::set_locale`], for an already decoded value.
    pub fn set_locale_value(&mut self, raw: &Value) {
        self.locale = find_scalar(raw);
    }

    pub fn backend_theme(&self) -> Option<&str> {
        self.backend_theme.as_deref()
    }

    pub fn set_backend_theme(&mut self, theme: Option<String>) {
        self.backend_theme = theme;
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn set_status(&mut self, status: UserStatus) {
        self.status = status;
    }

    pub fn is_enabled(&self) -> bool {
        self.status == UserStatus::Enabled
    }

    pub fn auth_token(&self) -> Option<&UserAuthToken> {
        self.auth_token.as_ref()
    }

    pub(crate) fn auth_token_mut(&mut self) -> Option<&mut UserAuthToken> {
        self.auth_token.as_mut()
    }

    /// Replace the owned auth token, keeping both sides of the link in step.
    ///
    /// The new token's back-reference is pointed at this record. The token
    /// that was attached before, if any, is handed back detached: its
    /// back-reference is cleared when it still pointed here.
    pub fn set_auth_token(&mut self, token: Option<UserAuthToken>) -> Option<UserAuthToken> {
        let mut previous = self.auth_token.take();
        if let Some(old) = previous.as_mut() {
            if old.user_id() == self.id {
                old.set_user_id(None);
            }
        }

        self.auth_token = token.map(|mut token| {
            token.set_user_id(self.id);
            token
        });

        previous
    }
}

impl From<StoredUser> for User {
    fn from(stored: StoredUser) -> Self {
        Self {
            id: Some(stored.id),
            display_name: stored.display_name,
            username: stored.username,
            email: stored.email,
            password: stored.password,
            plain_password: None,
            roles: stored.roles,
            last_seen_at: stored.last_seen_at,
            last_ip: stored.last_ip,
            locale: stored.locale,
            backend_theme: stored.backend_theme,
            status: stored.status,
            auth_token: None,
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("status", &self.status)
            .field("locale", &self.locale)
            .field("last_seen_at", &self.last_seen_at)
            .field("auth_token", &self.auth_token)
            .finish_non_exhaustive()
    }
}

// ── Tests ──────────────────────────────────────────────────────

//! Authentication token owned by a user

use chrono::{DateTime, Utc};

/// A persisted "remember me" credential, linked one-to-one to a user.
///
/// `user_id` is the back-reference to the owning record. It is only
/// changed through [`super::User::set_auth_token`], which keeps both
/// sides of the link in agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAuthToken {
    id: Option<i32>,
    user_id: Option<i32>,
    useragent: String,
    validity: DateTime<Utc>,
}

impl UserAuthToken {
    /// A detached token, not yet attached to any user.
    pub fn new(useragent: impl Into<String>, validity: DateTime<Utc>) -> Self {
        Self {
            id: None,
            user_id: None,
            useragent: useragent.into(),
            validity,
        }
    }

    /// Rebuild a token from stored values.
    pub fn restore(
        id: i32,
        user_id: Option<i32>,
        useragent: impl Into<String>,
        validity: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            user_id,
            useragent: useragent.into(),
            validity,
        }
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    /// Id of the owning user, if linked
    pub fn user_id(&self) -> Option<i32> {
        self.user_id
    }

    pub fn useragent(&self) -> &str {
        &self.useragent
    }

    pub fn validity(&self) -> DateTime<Utc> {
        self.validity
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.validity
    }

    pub(super) fn set_user_id(&mut self, user_id: Option<i32>) {
        self.user_id = user_id;
    }

    pub(crate) fn assign_id(&mut self, id: i32) {
        self.id = Some(id);
    }
}

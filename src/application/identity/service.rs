//! User management service
//!
//! Registration, credential changes, authentication checks, session
//! touches and profile updates. Every workflow that accepts a cleartext
//! password erases it from the record before returning, whatever the outcome.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::application::events::{
    Event, SharedEventBus, UserCreatedEvent, UserDeletedEvent, UserUpdatedEvent,
};
use crate::domain::{
    validate_user, CreateUserDto, DomainError, DomainResult, GetUserDto, UpdateUserDto, User,
    UserAuthToken, UserRepositoryInterface,
};
use crate::infrastructure::crypto::password::{hash_password, verify_password};
use crate::shared::{slugify_username, PaginatedResult};

/// Check `password` against the stored hash. The cleartext is erased
/// before returning, whatever the result.
fn verify_credentials(user: &mut User, password: &str) -> bool {
    user.set_plain_password(password);
    let verified = user
        .plain_password()
        .map(|plain| verify_password(plain, user.password()).unwrap_or(false))
        .unwrap_or(false);
    user.erase_credentials();
    verified
}

/// Orchestrates the user-management use-cases.
pub struct UserService<R: UserRepositoryInterface> {
    repo: Arc<R>,
    events: SharedEventBus,
    bcrypt_cost: u32,
}

impl<R: UserRepositoryInterface> UserService<R> {
    pub fn new(repo: Arc<R>, events: SharedEventBus, bcrypt_cost: u32) -> Self {
        Self {
            repo,
            events,
            bcrypt_cost,
        }
    }

    /// Hash the pending cleartext password into `password`, then erase it.
    fn process_credentials(&self, user: &mut User) -> DomainResult<()> {
        let hashed = user
            .plain_password()
            .map(|plain| hash_password(plain, self.bcrypt_cost));
        user.erase_credentials();

        if let Some(hashed) = hashed {
            user.set_password(hashed?);
        }
        Ok(())
    }

    fn publish_updated(&self, user: &User) {
        if let Some(user_id) = user.id() {
            self.events.publish(Event::UserUpdated(UserUpdatedEvent {
                user_id,
                username: user.username().to_string(),
                timestamp: Utc::now(),
            }));
        }
    }

    async fn load(&self, id: i32) -> DomainResult<User> {
        self.repo
            .get_user_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a new account. The username is normalized into a slug.
    pub async fn register(&self, dto: CreateUserDto) -> DomainResult<User> {
        let mut user = User::new(dto.display_name, &dto.username, dto.email);
        user.set_plain_password(dto.plain_password);
        user.set_roles(dto.roles);
        user.set_locale(dto.locale.as_deref());

        if let Err(e) = validate_user(&user) {
            user.erase_credentials();
            return Err(e);
        }
        self.process_credentials(&mut user)?;

        // Unique indexes stay authoritative under races.
        if self.repo.get_user_by_username(user.username()).await?.is_some() {
            return Err(DomainError::Conflict("user.duplicate_username".into()));
        }
        if self.repo.get_user_by_email(user.email()).await?.is_some() {
            return Err(DomainError::Conflict("user.duplicate_email".into()));
        }

        let user = self.repo.create_user(user).await?;

        if let Some(user_id) = user.id() {
            info!(user_id, username = %user.username(), "New user registered");
            self.events.publish(Event::UserCreated(UserCreatedEvent {
                user_id,
                username: user.username().to_string(),
                timestamp: Utc::now(),
            }));
        }
        Ok(user)
    }

    // ── Credentials ─────────────────────────────────────────────

    /// Set a new password for `user_id`.
    pub async fn change_password(&self, user_id: i32, new_password: &str) -> DomainResult<User> {
        let mut user = self.load(user_id).await?;
        user.set_plain_password(new_password);

        if let Err(e) = validate_user(&user) {
            user.erase_credentials();
            return Err(e);
        }
        self.process_credentials(&mut user)?;

        let user = self.repo.update_user(user).await?;
        info!(user_id, "Password changed");
        self.publish_updated(&user);
        Ok(user)
    }

    /// Check `password` for the account known by `login` (username or email).
    ///
    /// The username is matched after the same normalization as registration.
    /// Disabled and pending accounts are refused. The cleartext password is
    /// erased from the record on every path.
    pub async fn authenticate(&self, login: &str, password: &str) -> DomainResult<User> {
        let user = match self.repo.get_user_by_username(&slugify_username(login)).await? {
            Some(user) => Some(user),
            None => self.repo.get_user_by_email(login).await?,
        };

        let Some(mut user) = user else {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        if !verify_credentials(&mut user, password) {
            warn!(username = %user.username(), "Failed authentication attempt");
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }
        if !user.is_enabled() {
            return Err(DomainError::Unauthorized(format!(
                "Account is {}",
                user.status()
            )));
        }

        Ok(user)
    }

    /// Attach a fresh "remember me" token valid for `ttl`, replacing any
    /// previous one.
    pub async fn issue_auth_token(
        &self,
        user_id: i32,
        useragent: &str,
        ttl: Duration,
    ) -> DomainResult<User> {
        let mut user = self.load(user_id).await?;
        user.set_auth_token(Some(UserAuthToken::new(useragent, Utc::now() + ttl)));
        self.repo.update_user(user).await
    }

    /// Drop the user's auth token, if any.
    pub async fn revoke_auth_token(&self, user_id: i32) -> DomainResult<User> {
        let mut user = self.load(user_id).await?;
        user.set_auth_token(None);
        self.repo.update_user(user).await
    }

    /// Session touch: remember when and from where the user was last seen.
    pub async fn touch(&self, user_id: i32, ip: Option<&str>, at: DateTime<Utc>) -> DomainResult<()> {
        self.repo.touch_user(user_id, ip, at).await
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        self.repo.list_users(dto).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        self.repo.get_user_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        self.repo.get_user_by_username(username).await
    }

    // ── Commands (mutations) ────────────────────────────────────

    /// Apply profile changes and persist them after validation.
    pub async fn update_profile(&self, id: i32, dto: UpdateUserDto) -> DomainResult<User> {
        let mut user = self.load(id).await?;

        if let Some(display_name) = dto.display_name {
            user.set_display_name(display_name);
        }
        if let Some(email) = dto.email {
            user.set_email(email);
        }
        if let Some(roles) = dto.roles {
            user.set_roles(roles);
        }
        if let Some(locale) = dto.locale {
            user.set_locale(Some(&locale));
        }
        if let Some(theme) = dto.backend_theme {
            user.set_backend_theme(Some(theme));
        }
        if let Some(status) = dto.status {
            user.set_status(status);
        }

        validate_user(&user)?;
        let user = self.repo.update_user(user).await?;
        self.publish_updated(&user);
        Ok(user)
    }

    /// Delete an account together with its auth token.
    pub async fn delete_user(&self, id: i32) -> DomainResult<()> {
        self.repo.delete_user(id).await?;
        info!(user_id = id, "User deleted");
        self.events.publish(Event::UserDeleted(UserDeletedEvent {
            user_id: id,
            timestamp: Utc::now(),
        }));
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

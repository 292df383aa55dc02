use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{GetUserDto, User};
use crate::domain::DomainResult;
use crate::shared::PaginatedResult;

/// Persistence of user records and their owned auth token.
///
/// Implementations enforce unique usernames and emails, reporting
/// violations as `DomainError::Conflict("user.duplicate_username")` or
/// `DomainError::Conflict("user.duplicate_email")`, and delete the owned
/// token together with its user.
#[async_trait]
pub trait UserRepositoryInterface: Send + Sync {
    /// Insert a new user, returning it with its id (and its token's id) assigned.
    async fn create_user(&self, user: User) -> DomainResult<User>;

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>>;
    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn get_user_by_id(&self, id: i32) -> DomainResult<Option<User>>;

    /// Write back every persisted field and sync the auth token row.
    async fn update_user(&self, user: User) -> DomainResult<User>;
    async fn touch_user(&self, id: i32, ip: Option<&str>, at: DateTime<Utc>) -> DomainResult<()>;
    async fn delete_user(&self, id: i32) -> DomainResult<()>;
}

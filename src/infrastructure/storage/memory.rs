//! In-memory user repository

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::{
    DomainError, DomainResult, GetUserDto, User, UserRepositoryInterface,
};
use crate::shared::{pagination_offset, validate_pagination, PaginatedResult};

/// In-memory storage for development and testing
///
/// Enforces the same unique username/email rules as the database schema.
pub struct InMemoryUserRepository {
    users: DashMap<i32, User>,
    user_counter: AtomicI32,
    token_counter: AtomicI32,
    // Serializes writes so uniqueness checks and inserts cannot interleave.
    write_lock: Mutex<()>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            user_counter: AtomicI32::new(1),
            token_counter: AtomicI32::new(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn check_unique(&self, user: &User) -> DomainResult<()> {
        for entry in self.users.iter() {
            let other = entry.value();
            if other.id() == user.id() {
                continue;
            }
            if other.email() == user.email() {
                return Err(DomainError::Conflict("user.duplicate_email".into()));
            }
            if other.username() == user.username() {
                return Err(DomainError::Conflict("user.duplicate_username".into()));
            }
        }
        Ok(())
    }

    fn assign_token_id(&self, user: &mut User) {
        if let Some(token) = user.auth_token_mut() {
            if token.id().is_none() {
                token.assign_id(self.token_counter.fetch_add(1, Ordering::SeqCst));
            }
        }
    }

    fn find_by(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.users
            .iter()
            .find(|entry| pred(entry.value()))
            .map(|entry| entry.value().clone())
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepositoryInterface for InMemoryUserRepository {
    async fn create_user(&self, user: User) -> DomainResult<User> {
        let _guard = self.write_lock.lock().await;

        let mut user = user;
        if user.id().is_some() {
            return Err(DomainError::Conflict("user.already_persisted".into()));
        }
        self.check_unique(&user)?;

        let id = self.user_counter.fetch_add(1, Ordering::SeqCst);
        user.assign_id(id)?;
        self.assign_token_id(&mut user);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let (page, page_size) = validate_pagination(dto.page, dto.page_size);

        let mut items: Vec<User> = self
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|u| {
                dto.search.as_deref().map_or(true, |s| {
                    u.username().contains(s) || u.email().contains(s) || u.display_name().contains(s)
                })
            })
            .filter(|u| dto.status.map_or(true, |status| u.status() == status))
            .collect();

        match dto.sort_by.as_deref() {
            Some("username") => items.sort_by(|a, b| a.username().cmp(b.username())),
            Some("email") => items.sort_by(|a, b| a.email().cmp(b.email())),
            Some("display_name") => items.sort_by(|a, b| a.display_name().cmp(b.display_name())),
            Some("last_seen_at") => items.sort_by(|a, b| b.last_seen_at().cmp(&a.last_seen_at())),
            _ => items.sort_by_key(|u| u.id()),
        }

        let total = items.len() as u64;
        let offset = usize::try_from(pagination_offset(page, page_size)).unwrap_or(usize::MAX);
        let items = items.into_iter().skip(offset).take(page_size as usize).collect();

        Ok(PaginatedResult::new(items, total, page, page_size))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self.find_by(|u| u.username() == username))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self.find_by(|u| u.email() == email))
    }

    async fn get_user_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn update_user(&self, user: User) -> DomainResult<User> {
        let _guard = self.write_lock.lock().await;

        let mut user = user;
        let id = match user.id() {
            Some(id) if self.users.contains_key(&id) => id,
            other => {
                return Err(DomainError::NotFound {
                    entity: "User",
                    field: "id",
                    value: other.map_or_else(|| "unsaved".to_string(), |id| id.to_string()),
                })
            }
        };
        self.check_unique(&user)?;
        self.assign_token_id(&mut user);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn touch_user(&self, id: i32, ip: Option<&str>, at: DateTime<Utc>) -> DomainResult<()> {
        let mut user = self.users.get_mut(&id).ok_or(DomainError::NotFound {
            entity: "User",
            field: "id",
            value: id.to_string(),
        })?;
        user.touch(ip.map(str::to_string), at);
        Ok(())
    }

    async fn delete_user(&self, id: i32) -> DomainResult<()> {
        let _guard = self.write_lock.lock().await;

        self.users
            .remove(&id)
            .map(|_| ())
            .ok_or(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
    TransactionTrait,
    ActiveValue::{NotSet, Set},
};
use tracing::debug;

use crate::domain::{
    DomainError, DomainResult, GetUserDto, StoredUser, User, UserAuthToken,
    UserRepositoryInterface, UserStatus,
};
use crate::infrastructure::database::entities::{user, user_auth_token};
use crate::shared::{pagination_offset, validate_pagination, PaginatedResult};

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get database connection reference
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_status_to_domain(status: user::UserStatus) -> UserStatus {
    match status {
        user::UserStatus::Enabled => UserStatus::Enabled,
        user::UserStatus::Disabled => UserStatus::Disabled,
        user::UserStatus::Pending => UserStatus::Pending,
    }
}

fn domain_status_to_entity(status: UserStatus) -> user::UserStatus {
    match status {
        UserStatus::Enabled => user::UserStatus::Enabled,
        UserStatus::Disabled => user::UserStatus::Disabled,
        UserStatus::Pending => user::UserStatus::Pending,
    }
}

fn token_model_to_domain(model: user_auth_token::Model) -> UserAuthToken {
    UserAuthToken::restore(model.id, Some(model.user_id), model.useragent, model.validity)
}

fn user_model_to_domain(
    model: user::Model,
    token: Option<user_auth_token::Model>,
) -> DomainResult<User> {
    let roles: Vec<String> = serde_json::from_str(&model.roles).map_err(|e| {
        DomainError::Storage(format!("Corrupt roles for user {}: {}", model.id, e))
    })?;

    let mut user = User::from(StoredUser {
        id: model.id,
        display_name: model.display_name,
        username: model.username,
        email: model.email,
        password: model.password,
        roles,
        last_seen_at: model.last_seen_at,
        last_ip: model.last_ip,
        locale: model.locale,
        backend_theme: model.backend_theme,
        status: entity_status_to_domain(model.status),
    });
    user.set_auth_token(token.map(token_model_to_domain));
    Ok(user)
}

/// Only stored roles are written; the default-role fallback never is.
fn user_to_active_model(user: &User) -> DomainResult<user::ActiveModel> {
    let roles = serde_json::to_string(user.stored_roles())
        .map_err(|e| DomainError::Storage(format!("Failed to encode roles: {}", e)))?;

    Ok(user::ActiveModel {
        id: match user.id() {
            Some(id) => Set(id),
            None => NotSet,
        },
        display_name: Set(user.display_name().to_string()),
        username: Set(user.username().to_string()),
        email: Set(user.email().to_string()),
        password: Set(user.password().to_string()),
        roles: Set(roles),
        last_seen_at: Set(user.last_seen_at()),
        last_ip: Set(user.last_ip().map(str::to_string)),
        locale: Set(user.locale().map(str::to_string)),
        backend_theme: Set(user.backend_theme().map(str::to_string)),
        status: Set(domain_status_to_entity(user.status())),
    })
}

fn not_found(id: i32) -> DomainError {
    DomainError::NotFound {
        entity: "User",
        field: "id",
        value: id.to_string(),
    }
}

/// Translate unique-constraint violations into keyed conflicts.
fn map_write_err(e: DbErr) -> DomainError {
    let message = match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => message,
        _ => {
            let text = e.to_string();
            if !(text.contains("UNIQUE") || text.contains("duplicate")) {
                return e.into();
            }
            text
        }
    };

    if message.contains("email") {
        DomainError::Conflict("user.duplicate_email".to_string())
    } else if message.contains("username") {
        DomainError::Conflict("user.duplicate_username".to_string())
    } else {
        DomainError::Storage(message)
    }
}

/// Bring the `user_auth_tokens` row in line with the token the user owns.
async fn sync_auth_token<C: ConnectionTrait>(conn: &C, user: &mut User) -> DomainResult<()> {
    let Some(user_id) = user.id() else {
        return Ok(());
    };

    let Some(token) = user.auth_token_mut() else {
        user_auth_token::Entity::delete_many()
            .filter(user_auth_token::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;
        return Ok(());
    };

    // One token per user: drop any row that is not the one being kept.
    let mut stale = user_auth_token::Entity::delete_many()
        .filter(user_auth_token::Column::UserId.eq(user_id));
    if let Some(token_id) = token.id() {
        stale = stale.filter(user_auth_token::Column::Id.ne(token_id));
    }
    stale.exec(conn).await?;

    let active = user_auth_token::ActiveModel {
        id: match token.id() {
            Some(id) => Set(id),
            None => NotSet,
        },
        user_id: Set(user_id),
        useragent: Set(token.useragent().to_string()),
        validity: Set(token.validity()),
    };

    match token.id() {
        Some(_) => {
            active.update(conn).await?;
        }
        None => {
            let model = active.insert(conn).await?;
            token.assign_id(model.id);
        }
    }

    Ok(())
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepositoryInterface for SeaOrmUserRepository {
    async fn create_user(&self, user: User) -> DomainResult<User> {
        let mut active = user_to_active_model(&user)?;
        active.id = NotSet;

        let txn = self.db.begin().await?;
        let model = active.insert(&txn).await.map_err(map_write_err)?;

        let mut user = user;
        user.assign_id(model.id)?;
        sync_auth_token(&txn, &mut user).await?;
        txn.commit().await?;

        debug!(user_id = model.id, username = %user.username(), "User inserted");
        Ok(user)
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let (page, page_size) = validate_pagination(dto.page, dto.page_size);

        let mut query = user::Entity::find();

        // Apply search filter (username, email or display name)
        if let Some(ref search) = dto.search {
            query = query.filter(
                Condition::any()
                    .add(user::Column::Username.contains(search))
                    .add(user::Column::Email.contains(search))
                    .add(user::Column::DisplayName.contains(search)),
            );
        }

        if let Some(status) = dto.status {
            query = query.filter(user::Column::Status.eq(domain_status_to_entity(status)));
        }

        query = match dto.sort_by.as_deref() {
            Some("username") => query.order_by_asc(user::Column::Username),
            Some("email") => query.order_by_asc(user::Column::Email),
            Some("display_name") => query.order_by_asc(user::Column::DisplayName),
            Some("last_seen_at") => query.order_by_desc(user::Column::LastSeenAt),
            _ => query.order_by_asc(user::Column::Id),
        };

        let total = query.clone().count(&self.db).await?;

        let offset = pagination_offset(page, page_size);
        let rows = query
            .find_also_related(user_auth_token::Entity)
            .offset(offset)
            .limit(u64::from(page_size))
            .all(&self.db)
            .await?;

        let items = rows
            .into_iter()
            .map(|(model, token)| user_model_to_domain(model, token))
            .collect::<DomainResult<Vec<User>>>()?;

        Ok(PaginatedResult::new(items, total, page, page_size))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .find_also_related(user_auth_token::Entity)
            .one(&self.db)
            .await?
            .map(|(model, token)| user_model_to_domain(model, token))
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .find_also_related(user_auth_token::Entity)
            .one(&self.db)
            .await?
            .map(|(model, token)| user_model_to_domain(model, token))
            .transpose()
    }

    async fn get_user_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        user::Entity::find_by_id(id)
            .find_also_related(user_auth_token::Entity)
            .one(&self.db)
            .await?
            .map(|(model, token)| user_model_to_domain(model, token))
            .transpose()
    }

    async fn update_user(&self, user: User) -> DomainResult<User> {
        let id = user.id().ok_or_else(|| DomainError::NotFound {
            entity: "User",
            field: "id",
            value: "unsaved".to_string(),
        })?;
        let active = user_to_active_model(&user)?;

        let txn = self.db.begin().await?;
        match active.update(&txn).await {
            Ok(_) => {}
            Err(DbErr::RecordNotUpdated) => return Err(not_found(id)),
            Err(e) => return Err(map_write_err(e)),
        }

        let mut user = user;
        sync_auth_token(&txn, &mut user).await?;
        txn.commit().await?;

        Ok(user)
    }

    async fn touch_user(&self, id: i32, ip: Option<&str>, at: DateTime<Utc>) -> DomainResult<()> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| not_found(id))?;

        let mut active: user::ActiveModel = existing.into();
        active.last_seen_at = Set(Some(at));
        active.last_ip = Set(ip.map(str::to_string));
        active.update(&self.db).await?;

        Ok(())
    }

    async fn delete_user(&self, id: i32) -> DomainResult<()> {
        let txn = self.db.begin().await?;

        let existing = user::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| not_found(id))?;

        user_auth_token::Entity::delete_many()
            .filter(user_auth_token::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        existing.delete(&txn).await?;

        txn.commit().await?;
        debug!(user_id = id, "User deleted");
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::migrator::{Migrator, MigratorTrait};
    use crate::infrastructure::database::{init_database, DatabaseConfig};
    use chrono::TimeZone;

    async fn repo() -> SeaOrmUserRepository {
        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmUserRepository::new(db)
    }

    fn user(name: &str) -> User {
        let mut user = User::new(name, name, format!("{}@example.com", name.to_lowercase()));
        user.set_password("$2b$04$hash");
        user
    }

    fn validity() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
    }

    async fn token_rows(repo: &SeaOrmUserRepository) -> u64 {
        user_auth_token::Entity::find()
            .count(repo.connection())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_assigns_id_and_round_trips() {
        let repo = repo().await;
        let mut new_user = user("Alice");
        new_user.set_roles(["ROLE_EDITOR", "ROLE_EDITOR"]);
        new_user.set_locale(Some("nl"));
        new_user.set_status(UserStatus::Pending);

        let created = repo.create_user(new_user).await.unwrap();
        let id = created.id().expect("id assigned");

        let loaded = repo.get_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded.username(), "alice");
        assert_eq!(loaded.email(), "alice@example.com");
        assert_eq!(loaded.password(), "$2b$04$hash");
        assert_eq!(loaded.stored_roles(), ["ROLE_EDITOR", "ROLE_EDITOR"]);
        assert_eq!(loaded.roles(), vec!["ROLE_EDITOR"]);
        assert_eq!(loaded.locale(), Some("nl"));
        assert_eq!(loaded.status(), UserStatus::Pending);
        assert_eq!(loaded.plain_password(), None);
    }

    #[tokio::test]
    async fn default_role_is_never_stored() {
        let repo = repo().await;
        let created = repo.create_user(user("Bob")).await.unwrap();

        let row = user::Entity::find_by_id(created.id().unwrap())
            .one(repo.connection())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.roles, "[]");

        let loaded = repo.get_user_by_username("bob").await.unwrap().unwrap();
        assert_eq!(loaded.roles(), vec![crate::domain::DEFAULT_ROLE]);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_keyed_conflict() {
        let repo = repo().await;
        repo.create_user(user("Alice")).await.unwrap();

        let mut clash = user("Alicia");
        clash.set_email("alice@example.com");
        let err = repo.create_user(clash).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ref key) if key == "user.duplicate_email"));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_keyed_conflict() {
        let repo = repo().await;
        repo.create_user(user("Alice")).await.unwrap();

        let mut clash = user("Other");
        clash.set_username("ALICE");
        let err = repo.create_user(clash).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ref key) if key == "user.duplicate_username"));
    }

    #[tokio::test]
    async fn auth_token_is_persisted_with_back_reference() {
        let repo = repo().await;
        let mut new_user = user("Alice");
        new_user.set_auth_token(Some(UserAuthToken::new("Firefox", validity())));

        let created = repo.create_user(new_user).await.unwrap();
        let id = created.id().unwrap();
        assert!(created.auth_token().and_then(|t| t.id()).is_some());
        assert_eq!(created.auth_token().and_then(|t| t.user_id()), Some(id));

        let loaded = repo.get_user_by_id(id).await.unwrap().unwrap();
        let token = loaded.auth_token().expect("token loaded");
        assert_eq!(token.user_id(), Some(id));
        assert_eq!(token.useragent(), "Firefox");
        assert_eq!(token.validity(), validity());
    }

    #[tokio::test]
    async fn replacing_and_clearing_token_updates_rows() {
        let repo = repo().await;
        let mut new_user = user("Alice");
        new_user.set_auth_token(Some(UserAuthToken::new("Firefox", validity())));
        let mut created = repo.create_user(new_user).await.unwrap();

        created.set_auth_token(Some(UserAuthToken::new("curl", validity())));
        let mut updated = repo.update_user(created).await.unwrap();
        assert_eq!(token_rows(&repo).await, 1);

        let id = updated.id().unwrap();
        let loaded = repo.get_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded.auth_token().map(|t| t.useragent()), Some("curl"));

        updated.set_auth_token(None);
        repo.update_user(updated).await.unwrap();
        assert_eq!(token_rows(&repo).await, 0);
    }

    #[tokio::test]
    async fn delete_cascades_to_auth_token() {
        let repo = repo().await;
        let mut new_user = user("Alice");
        new_user.set_auth_token(Some(UserAuthToken::new("Firefox", validity())));
        let created = repo.create_user(new_user).await.unwrap();
        let id = created.id().unwrap();
        assert_eq!(token_rows(&repo).await, 1);

        repo.delete_user(id).await.unwrap();
        assert!(repo.get_user_by_id(id).await.unwrap().is_none());
        assert_eq!(token_rows(&repo).await, 0);

        assert!(matches!(
            repo.delete_user(id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn touch_records_last_seen() {
        let repo = repo().await;
        let id = repo.create_user(user("Alice")).await.unwrap().id().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        repo.touch_user(id, Some("10.0.0.1"), at).await.unwrap();

        let loaded = repo.get_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded.last_seen_at(), Some(at));
        assert_eq!(loaded.last_ip(), Some("10.0.0.1"));

        assert!(matches!(
            repo.touch_user(id + 100, None, at).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let repo = repo().await;
        let created = repo.create_user(user("Alice")).await.unwrap();
        repo.delete_user(created.id().unwrap()).await.unwrap();

        assert!(matches!(
            repo.update_user(created).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update_user(user("Ghost")).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_users_searches_and_paginates() {
        let repo = repo().await;
        for name in ["Alice", "Albert", "Bob"] {
            repo.create_user(user(name)).await.unwrap();
        }

        let all = repo.list_users(GetUserDto::default()).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items.len(), 3);

        let found = repo
            .list_users(GetUserDto {
                search: Some("al".into()),
                sort_by: Some("username".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 2);
        let names: Vec<&str> = found.items.iter().map(|u| u.username()).collect();
        assert_eq!(names, vec!["albert", "alice"]);

        let second_page = repo
            .list_users(GetUserDto {
                page: Some(2),
                page_size: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second_page.items.len(), 1);
        assert_eq!(second_page.total_pages, 2);
    }

    #[tokio::test]
    async fn huge_page_is_empty() {
        let repo = repo().await;
        repo.create_user(user("Alice")).await.unwrap();

        let page = repo
            .list_users(GetUserDto {
                page: Some(u32::MAX),
                page_size: Some(100),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn unrecognised_unique_violation_is_a_storage_error() {
        let err = map_write_err(DbErr::Custom(
            "UNIQUE constraint failed: user_auth_tokens.user_id".into(),
        ));
        assert!(matches!(err, DomainError::Storage(_)));
        assert!(err.keys().is_empty());

        let err = map_write_err(DbErr::Custom(
            "UNIQUE constraint failed: users.email".into(),
        ));
        assert_eq!(err.keys(), vec!["user.duplicate_email"]);

        let err = map_write_err(DbErr::Custom("disk I/O error".into()));
        assert!(matches!(err, DomainError::Storage(_)));
    }
}

//! User entity for database

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Account status column
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
pub enum UserStatus {
    #[sea_orm(string_value = "enabled")]
    Enabled,
    #[sea_orm(string_value = "disabled")]
    Disabled,
    #[sea_orm(string_value = "pending")]
    Pending,
}

/// User model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub display_name: String,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    #[sea_orm(column_type = "Text")]
    pub roles: String, // JSON array of role tokens
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_ip: Option<String>,
    pub locale: Option<String>,
    pub backend_theme: Option<String>,
    pub status: UserStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::user_auth_token::Entity")]
    UserAuthToken,
}

impl Related<super::user_auth_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserAuthToken.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Create user_auth_tokens table migration

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserAuthTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserAuthTokens::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserAuthTokens::UserId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(UserAuthTokens::Useragent).string().not_null())
                    .col(
                        ColumnDef::new(UserAuthTokens::Validity)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_auth_tokens_user_id")
                            .from(UserAuthTokens::Table, UserAuthTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserAuthTokens::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum UserAuthTokens {
    Table,
    Id,
    UserId,
    Useragent,
    Validity,
}

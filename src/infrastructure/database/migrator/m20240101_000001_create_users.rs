//! Create users table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(191)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(191)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string_len(191).not_null())
                    .col(ColumnDef::new(Users::Roles).text().not_null().default("[]"))
                    .col(ColumnDef::new(Users::LastSeenAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Users::LastIp).string_len(100).null())
                    .col(ColumnDef::new(Users::Locale).string_len(191).null())
                    .col(ColumnDef::new(Users::BackendTheme).string_len(191).null())
                    .col(
                        ColumnDef::new(Users::Status)
                            .string_len(30)
                            .not_null()
                            .default("enabled"),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    DisplayName,
    Username,
    Email,
    Password,
    Roles,
    LastSeenAt,
    LastIp,
    Locale,
    BackendTheme,
    Status,
}

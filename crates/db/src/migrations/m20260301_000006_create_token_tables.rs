//! Create refresh session and token blacklist tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RefreshSession::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RefreshSession::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RefreshSession::UserId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(RefreshSession::TokenHash)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(RefreshSession::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RefreshSession::RevokedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(RefreshSession::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_refresh_session_user")
                            .from(RefreshSession::Table, RefreshSession::UserId)
                            .to(User::Table, User::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_refresh_session_user_id")
                    .table(RefreshSession::Table)
                    .col(RefreshSession::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TokenBlacklist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TokenBlacklist::Jti)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TokenBlacklist::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TokenBlacklist::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for opportunistic pruning
        manager
            .create_index(
                Index::create()
                    .name("idx_token_blacklist_expires_at")
                    .table(TokenBlacklist::Table)
                    .col(TokenBlacklist::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TokenBlacklist::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RefreshSession::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RefreshSession {
    Table,
    Id,
    UserId,
    TokenHash,
    ExpiresAt,
    RevokedAt,
    CreatedAt,
}

#[derive(Iden)]
enum TokenBlacklist {
    Table,
    Jti,
    ExpiresAt,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Uuid,
}

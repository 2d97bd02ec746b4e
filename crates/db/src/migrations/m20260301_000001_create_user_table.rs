//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Uuid).string_len(64).not_null().primary_key())
                    .col(ColumnDef::new(User::Email).string_len(256))
                    .col(ColumnDef::new(User::Name).string_len(256).not_null())
                    .col(ColumnDef::new(User::Picture).string_len(1024))
                    .col(ColumnDef::new(User::Nickname).string_len(64))
                    .col(ColumnDef::new(User::Department).string_len(128))
                    .col(ColumnDef::new(User::StudentId).string_len(32))
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: student_id (prefix-constraint checks read the voter row,
        // but profile lookups filter on it)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_student_id")
                    .table(User::Table)
                    .col(User::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Uuid,
    Email,
    Name,
    Picture,
    Nickname,
    Department,
    StudentId,
    CreatedAt,
    UpdatedAt,
}

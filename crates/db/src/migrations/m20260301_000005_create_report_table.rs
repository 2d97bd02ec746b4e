//! Create report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Report::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Report::ReporterId).string_len(64).not_null())
                    .col(ColumnDef::new(Report::TargetKind).string_len(32).not_null())
                    .col(ColumnDef::new(Report::TargetId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Report::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_reporter")
                            .from(Report::Table, Report::ReporterId)
                            .to(User::Table, User::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one report per (reporter, target kind, target)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_reporter_target")
                    .table(Report::Table)
                    .col(Report::ReporterId)
                    .col(Report::TargetKind)
                    .col(Report::TargetId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index for threshold counting
        manager
            .create_index(
                Index::create()
                    .name("idx_report_target")
                    .table(Report::Table)
                    .col(Report::TargetKind)
                    .col(Report::TargetId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    ReporterId,
    TargetKind,
    TargetId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Uuid,
}

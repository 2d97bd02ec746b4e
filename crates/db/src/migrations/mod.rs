//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20260301_000001_create_user_table;
mod m20260301_000002_create_survey_tables;
mod m20260301_000003_create_response_tables;
mod m20260301_000004_create_comment_table;
mod m20260301_000005_create_report_table;
mod m20260301_000006_create_token_tables;
mod m20260301_000007_create_notification_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_user_table::Migration),
            Box::new(m20260301_000002_create_survey_tables::Migration),
            Box::new(m20260301_000003_create_response_tables::Migration),
            Box::new(m20260301_000004_create_comment_table::Migration),
            Box::new(m20260301_000005_create_report_table::Migration),
            Box::new(m20260301_000006_create_token_tables::Migration),
            Box::new(m20260301_000007_create_notification_table::Migration),
        ]
    }
}

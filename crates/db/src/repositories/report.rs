//! Report repository.

use std::sync::Arc;

use crate::entities::{Report, report};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};
use unipoll_common::{AppError, AppResult};

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check whether this reporter already reported this target.
    pub async fn exists(
        &self,
        reporter_id: &str,
        target_kind: report::ReportTargetKind,
        target_id: &str,
    ) -> AppResult<bool> {
        let count = Report::find()
            .filter(report::Column::ReporterId.eq(reporter_id))
            .filter(report::Column::TargetKind.eq(target_kind))
            .filter(report::Column::TargetId.eq(target_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Create a new report.
    pub async fn create(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all reports against a target.
    pub async fn count_for_target(
        &self,
        target_kind: report::ReportTargetKind,
        target_id: &str,
    ) -> AppResult<u64> {
        Report::find()
            .filter(report::Column::TargetKind.eq(target_kind))
            .filter(report::Column::TargetId.eq(target_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

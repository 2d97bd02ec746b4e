//! Report service: crowd-sourced moderation.
//!
//! Every report is counted synchronously; when a target accumulates
//! enough distinct reporters it is hidden and its owner notified. The
//! hide fires exactly once, on the report that crosses the threshold.

use chrono::Utc;
use sea_orm::Set;
use unipoll_common::{AppError, AppResult, IdGenerator};
use unipoll_db::{
    entities::{
        notification::{self, NotificationKind},
        report::{self, ReportTargetKind},
    },
    repositories::{CommentRepository, NotificationRepository, ReportRepository, SurveyRepository},
};

/// Reports from this many distinct users hide the target.
const REPORT_THRESHOLD: u64 = 5;

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    survey_repo: SurveyRepository,
    comment_repo: CommentRepository,
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(
        report_repo: ReportRepository,
        survey_repo: SurveyRepository,
        comment_repo: CommentRepository,
        notification_repo: NotificationRepository,
    ) -> Self {
        Self {
            report_repo,
            survey_repo,
            comment_repo,
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a report against a survey or comment.
    pub async fn create_report(
        &self,
        reporter_id: &str,
        target_kind: ReportTargetKind,
        target_id: &str,
    ) -> AppResult<()> {
        self.ensure_target_exists(target_kind, target_id).await?;

        if self
            .report_repo
            .exists(reporter_id, target_kind, target_id)
            .await?
        {
            return Err(AppError::Conflict(
                "You have already reported this item".to_string(),
            ));
        }

        let now = Utc::now().fixed_offset();
        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(reporter_id.to_string()),
            target_kind: Set(target_kind),
            target_id: Set(target_id.to_string()),
            created_at: Set(now),
        };
        self.report_repo.create(model).await?;

        let count = self
            .report_repo
            .count_for_target(target_kind, target_id)
            .await?;
        // Equality, not >=: later reports against an already-hidden
        // target must not re-trigger the hide or its notification.
        if count == REPORT_THRESHOLD {
            self.hide_target(target_kind, target_id).await?;
        }

        Ok(())
    }

    async fn ensure_target_exists(
        &self,
        target_kind: ReportTargetKind,
        target_id: &str,
    ) -> AppResult<()> {
        let found = match target_kind {
            ReportTargetKind::Survey => {
                self.survey_repo.find_by_id(target_id).await?.is_some()
            }
            ReportTargetKind::Comment => {
                self.comment_repo.find_by_id(target_id).await?.is_some()
            }
        };
        if found {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "Report target not found: {target_id}"
            )))
        }
    }

    async fn hide_target(
        &self,
        target_kind: ReportTargetKind,
        target_id: &str,
    ) -> AppResult<()> {
        let (owner_id, content) = match target_kind {
            ReportTargetKind::Survey => {
                let survey = self.survey_repo.find_by_id(target_id).await?.ok_or_else(|| {
                    AppError::NotFound(format!("Survey not found: {target_id}"))
                })?;
                if survey.is_hidden {
                    return Ok(());
                }
                let survey = self.survey_repo.set_hidden(target_id).await?;
                tracing::info!(survey_id = %target_id, "Survey hidden by report threshold");
                (
                    survey.author_id,
                    format!(
                        "내 설문 \"{}\"이 신고 누적으로 숨김 처리되었습니다.",
                        survey.title
                    ),
                )
            }
            ReportTargetKind::Comment => {
                let comment = self.comment_repo.get_by_id(target_id).await?;
                if comment.is_hidden {
                    return Ok(());
                }
                let comment = self.comment_repo.set_hidden(target_id).await?;
                tracing::info!(comment_id = %target_id, "Comment hidden by report threshold");
                (
                    comment.author_id,
                    "내 댓글이 신고 누적으로 숨김 처리되었습니다.".to_string(),
                )
            }
        };

        let note = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(owner_id),
            kind: Set(NotificationKind::ReportHidden),
            content: Set(content),
            is_read: Set(false),
            created_at: Set(Utc::now().fixed_offset()),
        };
        self.notification_repo.create(note).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use unipoll_db::entities::survey;

    fn service_over(db: DatabaseConnection) -> ReportService {
        let db = Arc::new(db);
        ReportService::new(
            ReportRepository::new(Arc::clone(&db)),
            SurveyRepository::new(Arc::clone(&db)),
            CommentRepository::new(Arc::clone(&db)),
            NotificationRepository::new(db),
        )
    }

    fn survey_row(hidden: bool) -> survey::Model {
        let now = Utc::now();
        survey::Model {
            id: "s1".to_string(),
            title: "점심 메뉴 선호도".to_string(),
            description: String::new(),
            is_anonymous: false,
            deadline: (now + chrono::Duration::days(7)).into(),
            estimated_time: 20,
            author_id: "uuid-author".to_string(),
            is_hidden: hidden,
            created_at: now.into(),
            updated_at: None,
        }
    }

    fn report_row() -> report::Model {
        report::Model {
            id: "r1".to_string(),
            reporter_id: "uuid-9".to_string(),
            target_kind: ReportTargetKind::Survey,
            target_id: "s1".to_string(),
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn notification_row() -> notification::Model {
        notification::Model {
            id: "n1".to_string(),
            user_id: "uuid-author".to_string(),
            kind: NotificationKind::ReportHidden,
            content: String::new(),
            is_read: false,
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    #[tokio::test]
    async fn test_fifth_report_hides_target_and_notifies_owner() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![survey_row(false)]])
            .append_query_results([vec![count_row(0)]])
            .append_query_results([vec![report_row()]])
            .append_query_results([vec![count_row(5)]])
            .append_query_results([
                vec![survey_row(false)],
                vec![survey_row(false)],
                vec![survey_row(true)],
            ])
            .append_query_results([vec![notification_row()]])
            .into_connection();
        let service = service_over(db);

        service
            .create_report("uuid-9", ReportTargetKind::Survey, "s1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sixth_report_leaves_hidden_target_alone() {
        // No rows are staged past the recount: a second hide attempt
        // would hit the store and fail the call.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![survey_row(true)]])
            .append_query_results([vec![count_row(0)]])
            .append_query_results([vec![report_row()]])
            .append_query_results([vec![count_row(6)]])
            .into_connection();
        let service = service_over(db);

        service
            .create_report("uuid-10", ReportTargetKind::Survey, "s1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_threshold_on_already_hidden_target_does_not_renotify() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![survey_row(true)]])
            .append_query_results([vec![count_row(0)]])
            .append_query_results([vec![report_row()]])
            .append_query_results([vec![count_row(5)]])
            .append_query_results([vec![survey_row(true)]])
            .into_connection();
        let service = service_over(db);

        service
            .create_report("uuid-9", ReportTargetKind::Survey, "s1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_report_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![survey_row(false)]])
            .append_query_results([vec![count_row(1)]])
            .into_connection();
        let service = service_over(db);

        assert!(matches!(
            service
                .create_report("uuid-9", ReportTargetKind::Survey, "s1")
                .await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_report_against_missing_target_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<survey::Model>::new()])
            .into_connection();
        let service = service_over(db);

        assert!(matches!(
            service
                .create_report("uuid-9", ReportTargetKind::Survey, "missing")
                .await,
            Err(AppError::NotFound(_))
        ));
    }
}

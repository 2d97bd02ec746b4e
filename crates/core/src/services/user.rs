//! User service: profile and "my page" listings.

use chrono::{DateTime, FixedOffset};
use unipoll_common::{AppError, AppResult};
use unipoll_db::{
    entities::{notification, user},
    repositories::{
        CommentRepository, NotificationRepository, ResponseRepository, SurveyRepository,
        UserRepository,
    },
};

const NICKNAME_MAX: usize = 30;
const DEPARTMENT_MAX: usize = 50;

/// Input for updating the editable profile fields.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub nickname: Option<String>,
    pub department: Option<String>,
}

/// A survey the user authored, with its response count.
#[derive(Debug, Clone)]
pub struct MySurveySummary {
    pub id: String,
    pub title: String,
    pub deadline: DateTime<FixedOffset>,
    pub is_hidden: bool,
    pub created_at: DateTime<FixedOffset>,
    pub response_count: u64,
}

/// A survey the user responded to.
#[derive(Debug, Clone)]
pub struct MyResponseSummary {
    pub survey_id: String,
    pub survey_title: String,
    pub deadline: DateTime<FixedOffset>,
    pub responded_at: DateTime<FixedOffset>,
}

/// A comment the user wrote, with the survey it belongs to.
#[derive(Debug, Clone)]
pub struct MyCommentSummary {
    pub id: String,
    pub survey_id: String,
    pub survey_title: String,
    pub content: String,
    pub is_hidden: bool,
    pub created_at: DateTime<FixedOffset>,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    survey_repo: SurveyRepository,
    response_repo: ResponseRepository,
    comment_repo: CommentRepository,
    notification_repo: NotificationRepository,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        survey_repo: SurveyRepository,
        response_repo: ResponseRepository,
        comment_repo: CommentRepository,
        notification_repo: NotificationRepository,
    ) -> Self {
        Self {
            user_repo,
            survey_repo,
            response_repo,
            comment_repo,
            notification_repo,
        }
    }

    /// Get the caller's own profile.
    pub async fn me(&self, uuid: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_uuid(uuid).await
    }

    /// Update nickname and/or department.
    pub async fn update_profile(
        &self,
        uuid: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        let nickname = input
            .nickname
            .map(|n| validate_field(&n, "Nickname", NICKNAME_MAX))
            .transpose()?;
        let department = input
            .department
            .map(|d| validate_field(&d, "Department", DEPARTMENT_MAX))
            .transpose()?;

        if nickname.is_none() && department.is_none() {
            return Err(AppError::BadRequest("Nothing to update".to_string()));
        }

        self.user_repo.update_profile(uuid, nickname, department).await
    }

    /// List surveys the user authored, newest first, with response counts.
    pub async fn my_surveys(&self, uuid: &str) -> AppResult<Vec<MySurveySummary>> {
        let surveys = self.survey_repo.find_by_author(uuid).await?;
        let ids: Vec<String> = surveys.iter().map(|s| s.id.clone()).collect();
        let counts = self.response_repo.count_by_surveys(&ids).await?;

        Ok(surveys
            .into_iter()
            .map(|s| MySurveySummary {
                response_count: counts.get(&s.id).copied().unwrap_or(0),
                id: s.id,
                title: s.title,
                deadline: s.deadline,
                is_hidden: s.is_hidden,
                created_at: s.created_at,
            })
            .collect())
    }

    /// List surveys the user voted on, newest first.
    pub async fn my_responses(&self, uuid: &str) -> AppResult<Vec<MyResponseSummary>> {
        let responses = self.response_repo.find_by_user(uuid).await?;
        let survey_ids: Vec<String> = responses.iter().map(|r| r.survey_id.clone()).collect();
        let surveys = self.survey_repo.find_by_ids(&survey_ids).await?;
        let by_id: std::collections::HashMap<String, _> =
            surveys.into_iter().map(|s| (s.id.clone(), s)).collect();

        Ok(responses
            .into_iter()
            .filter_map(|r| {
                by_id.get(&r.survey_id).map(|s| MyResponseSummary {
                    survey_id: r.survey_id,
                    survey_title: s.title.clone(),
                    deadline: s.deadline,
                    responded_at: r.created_at,
                })
            })
            .collect())
    }

    /// List the user's comments, newest first.
    pub async fn my_comments(&self, uuid: &str) -> AppResult<Vec<MyCommentSummary>> {
        let comments = self.comment_repo.find_by_author(uuid).await?;
        let survey_ids: Vec<String> = comments.iter().map(|c| c.survey_id.clone()).collect();
        let surveys = self.survey_repo.find_by_ids(&survey_ids).await?;
        let titles: std::collections::HashMap<String, String> =
            surveys.into_iter().map(|s| (s.id, s.title)).collect();

        Ok(comments
            .into_iter()
            .filter_map(|c| {
                titles.get(&c.survey_id).cloned().map(|survey_title| MyCommentSummary {
                    id: c.id,
                    survey_id: c.survey_id,
                    survey_title,
                    content: c.content,
                    is_hidden: c.is_hidden,
                    created_at: c.created_at,
                })
            })
            .collect())
    }

    /// List the user's notifications, newest first.
    pub async fn my_notifications(&self, uuid: &str) -> AppResult<Vec<notification::Model>> {
        self.notification_repo.find_by_user(uuid).await
    }
}

fn validate_field(value: &str, label: &str, max: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{label} cannot be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{label} is too long (max {max} chars)"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_field_trims() {
        assert_eq!(validate_field("  alice  ", "Nickname", 30).unwrap(), "alice");
    }

    #[test]
    fn test_validate_field_rejects_empty() {
        assert!(validate_field("   ", "Nickname", 30).is_err());
    }

    #[test]
    fn test_validate_field_rejects_too_long() {
        let long = "a".repeat(31);
        assert!(validate_field(&long, "Nickname", 30).is_err());
        let ok = "a".repeat(30);
        assert!(validate_field(&ok, "Nickname", 30).is_ok());
    }

    #[test]
    fn test_validate_field_counts_chars_not_bytes() {
        // Hangul nicknames are multi-byte; the limit is on characters.
        let hangul = "가".repeat(30);
        assert!(validate_field(&hangul, "Nickname", 30).is_ok());
    }
}

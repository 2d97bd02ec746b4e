//! Comment service.

use chrono::Utc;
use sea_orm::Set;
use std::collections::HashMap;
use unipoll_common::{AppError, AppResult, IdGenerator};
use unipoll_db::{
    entities::{
        comment,
        notification::{self, NotificationKind},
    },
    repositories::{CommentRepository, NotificationRepository, SurveyRepository, UserRepository},
};

const CONTENT_MAX: usize = 500;

/// A comment joined with its author's public identity.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: comment::Model,
    pub author_nickname: Option<String>,
    pub author_uuid: String,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    survey_repo: SurveyRepository,
    user_repo: UserRepository,
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        survey_repo: SurveyRepository,
        user_repo: UserRepository,
        notification_repo: NotificationRepository,
    ) -> Self {
        Self {
            comment_repo,
            survey_repo,
            user_repo,
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post a comment on a survey and notify its author.
    pub async fn create(
        &self,
        survey_id: &str,
        author_id: &str,
        content: &str,
    ) -> AppResult<comment::Model> {
        let survey = self.survey_repo.get_visible(survey_id).await?;
        let content = validate_content(content)?;

        let now = Utc::now().fixed_offset();
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            survey_id: Set(survey_id.to_string()),
            author_id: Set(author_id.to_string()),
            content: Set(content),
            is_hidden: Set(false),
            created_at: Set(now),
            updated_at: Set(None),
        };
        let created = self.comment_repo.create(model).await?;

        // Self-comments generate no notification.
        if survey.author_id != author_id {
            let note = notification::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(survey.author_id),
                kind: Set(NotificationKind::NewComment),
                content: Set(format!(
                    "내 설문 \"{}\"에 새 댓글이 달렸습니다.",
                    survey.title
                )),
                is_read: Set(false),
                created_at: Set(now),
            };
            self.notification_repo.create(note).await?;
        }

        Ok(created)
    }

    /// List a survey's visible comments with author identities.
    pub async fn list(&self, survey_id: &str) -> AppResult<Vec<CommentView>> {
        self.survey_repo.get_visible(survey_id).await?;
        let comments = self.comment_repo.find_visible_by_survey(survey_id).await?;

        let author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        let authors = self.user_repo.find_by_uuids(&author_ids).await?;
        let nicknames: HashMap<String, Option<String>> = authors
            .into_iter()
            .map(|u| (u.uuid, u.nickname))
            .collect();

        Ok(comments
            .into_iter()
            .map(|c| CommentView {
                author_nickname: nicknames.get(&c.author_id).cloned().unwrap_or_default(),
                author_uuid: c.author_id.clone(),
                comment: c,
            })
            .collect())
    }

    /// Edit a comment. Authors only.
    pub async fn update(
        &self,
        comment_id: &str,
        user_id: &str,
        content: &str,
    ) -> AppResult<comment::Model> {
        let comment = self.owned_comment(comment_id, user_id).await?;
        let content = validate_content(content)?;

        let mut active: comment::ActiveModel = comment.into();
        active.content = Set(content);
        active.updated_at = Set(Some(Utc::now().fixed_offset()));
        self.comment_repo.update(active).await
    }

    /// Delete a comment. Authors only.
    pub async fn delete(&self, comment_id: &str, user_id: &str) -> AppResult<()> {
        self.owned_comment(comment_id, user_id).await?;
        self.comment_repo.delete(comment_id).await
    }

    async fn owned_comment(&self, comment_id: &str, user_id: &str) -> AppResult<comment::Model> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;
        if comment.author_id != user_id {
            return Err(AppError::Forbidden(
                "Only the author can modify a comment".to_string(),
            ));
        }
        Ok(comment)
    }
}

fn validate_content(content: &str) -> AppResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Comment content cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > CONTENT_MAX {
        return Err(AppError::BadRequest(format!(
            "Comment is too long (max {CONTENT_MAX} chars)"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_trimmed() {
        assert_eq!(validate_content("  hi  ").unwrap(), "hi");
    }

    #[test]
    fn test_content_rejects_empty_and_too_long() {
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"a".repeat(501)).is_err());
        assert!(validate_content(&"a".repeat(500)).is_ok());
    }
}

//! Response and answer repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Answer, Response, answer, response};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use sea_orm::TransactionTrait;
use unipoll_common::{AppError, AppResult};

/// A validated answer row awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswerRow {
    pub question_id: String,
    pub option_id: Option<String>,
    pub text: Option<String>,
}

/// A subjective answer joined with its responder.
#[derive(Debug, Clone)]
pub struct SubjectiveAnswerRow {
    pub answer: answer::Model,
    pub responder_id: String,
}

/// Response repository for database operations.
#[derive(Clone)]
pub struct ResponseRepository {
    db: Arc<DatabaseConnection>,
}

impl ResponseRepository {
    /// Create a new response repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the caller's response for a survey.
    pub async fn find_by_survey_and_user(
        &self,
        survey_id: &str,
        user_id: &str,
    ) -> AppResult<Option<response::Model>> {
        Response::find()
            .filter(response::Column::SurveyId.eq(survey_id))
            .filter(response::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether the user already voted on a survey.
    pub async fn has_voted(&self, survey_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self
            .find_by_survey_and_user(survey_id, user_id)
            .await?
            .is_some())
    }

    /// Replace the user's ballot for a survey in one transaction.
    ///
    /// Deletes the prior response and its answers if present, inserts a
    /// fresh response and one answer row per entry. Resubmission fully
    /// overwrites; it never merges.
    pub async fn replace(
        &self,
        response_model: response::ActiveModel,
        survey_id: &str,
        user_id: &str,
        rows: Vec<NewAnswerRow>,
        id_gen: &unipoll_common::IdGenerator,
    ) -> AppResult<response::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let existing = Response::find()
            .filter(response::Column::SurveyId.eq(survey_id))
            .filter(response::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(existing) = existing {
            Answer::delete_many()
                .filter(answer::Column::ResponseId.eq(existing.id.clone()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Response::delete_by_id(existing.id)
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        let created = response_model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let answers: Vec<answer::ActiveModel> = rows
            .into_iter()
            .map(|row| answer::ActiveModel {
                id: Set(id_gen.generate()),
                response_id: Set(created.id.clone()),
                question_id: Set(row.question_id),
                option_id: Set(row.option_id),
                text: Set(row.text),
            })
            .collect();
        if !answers.is_empty() {
            Answer::insert_many(answers)
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(created)
    }

    /// Count responses for one survey.
    pub async fn count_by_survey(&self, survey_id: &str) -> AppResult<u64> {
        Response::find()
            .filter(response::Column::SurveyId.eq(survey_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count responses for a set of surveys in one pass.
    pub async fn count_by_surveys(&self, survey_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if survey_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = Response::find()
            .filter(response::Column::SurveyId.is_in(survey_ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for row in rows {
            *counts.entry(row.survey_id).or_default() += 1;
        }
        Ok(counts)
    }

    /// List the user's responses, newest first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<response::Model>> {
        Response::find()
            .filter(response::Column::UserId.eq(user_id))
            .order_by_desc(response::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tally selected options across a set of choice questions.
    pub async fn option_tallies(
        &self,
        question_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        if question_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = Answer::find()
            .filter(answer::Column::QuestionId.is_in(question_ids.iter().cloned()))
            .filter(answer::Column::OptionId.is_not_null())
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut tallies: HashMap<String, u64> = HashMap::new();
        for row in rows {
            if let Some(option_id) = row.option_id {
                *tallies.entry(option_id).or_default() += 1;
            }
        }
        Ok(tallies)
    }

    /// Fetch one page of subjective answers for a question with their
    /// responder ids, plus the total count.
    pub async fn subjective_page(
        &self,
        question_id: &str,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<SubjectiveAnswerRow>, u64)> {
        let paginator = Answer::find()
            .filter(answer::Column::QuestionId.eq(question_id))
            .filter(answer::Column::Text.is_not_null())
            .order_by_asc(answer::Column::Id)
            .paginate(self.db.as_ref(), limit);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let answers = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Responder identity lives on the response row; fetch explicitly.
        let response_ids: Vec<String> = answers.iter().map(|a| a.response_id.clone()).collect();
        let responses = if response_ids.is_empty() {
            vec![]
        } else {
            Response::find()
                .filter(response::Column::Id.is_in(response_ids))
                .all(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
        };
        let responders: HashMap<String, String> = responses
            .into_iter()
            .map(|r| (r.id, r.user_id))
            .collect();

        let rows = answers
            .into_iter()
            .filter_map(|answer| {
                responders
                    .get(&answer.response_id)
                    .cloned()
                    .map(|responder_id| SubjectiveAnswerRow {
                        answer,
                        responder_id,
                    })
            })
            .collect();
        Ok((rows, total))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use unipoll_common::IdGenerator;

    fn response_row(id: &str) -> response::Model {
        response::Model {
            id: id.to_string(),
            survey_id: "s1".to_string(),
            user_id: "uuid-1".to_string(),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn new_response(id: &str) -> response::ActiveModel {
        response::ActiveModel {
            id: Set(id.to_string()),
            survey_id: Set("s1".to_string()),
            user_id: Set("uuid-1".to_string()),
            created_at: Set(chrono::Utc::now().into()),
        }
    }

    fn answer_rows() -> Vec<NewAnswerRow> {
        vec![NewAnswerRow {
            question_id: "q1".to_string(),
            option_id: Some("o1".to_string()),
            text: None,
        }]
    }

    #[tokio::test]
    async fn test_replace_discards_prior_ballot() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![response_row("old")]])
            .append_query_results([vec![response_row("new")]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1, // prior answers deleted
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1, // prior response deleted
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1, // new answers inserted
                },
            ])
            .into_connection();
        let repo = ResponseRepository::new(Arc::new(db));

        let created = repo
            .replace(new_response("new"), "s1", "uuid-1", answer_rows(), &IdGenerator::new())
            .await
            .unwrap();
        assert_eq!(created.id, "new");
    }

    #[tokio::test]
    async fn test_replace_with_no_prior_ballot_only_inserts() {
        // Only the answer insert has an exec result staged: a delete
        // would drain the buffer and fail the call.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<response::Model>::new()])
            .append_query_results([vec![response_row("new")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1, // new answers inserted
            }])
            .into_connection();
        let repo = ResponseRepository::new(Arc::new(db));

        let created = repo
            .replace(new_response("new"), "s1", "uuid-1", answer_rows(), &IdGenerator::new())
            .await
            .unwrap();
        assert_eq!(created.id, "new");
    }
}

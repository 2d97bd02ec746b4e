//! Survey repository.

use std::sync::Arc;

use crate::entities::{
    Question, QuestionOption, Survey, TargetConstraint, question, question_option, survey,
    target_constraint,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use unipoll_common::{AppError, AppResult};

/// Active models for a survey's owned rows, inserted alongside it.
pub struct SurveyChildren {
    pub questions: Vec<question::ActiveModel>,
    pub options: Vec<question_option::ActiveModel>,
    pub constraints: Vec<target_constraint::ActiveModel>,
}

/// Survey repository for database operations.
#[derive(Clone)]
pub struct SurveyRepository {
    db: Arc<DatabaseConnection>,
}

impl SurveyRepository {
    /// Create a new survey repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a survey by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<survey::Model>> {
        Survey::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a survey that is visible to callers. Hidden surveys are
    /// indistinguishable from missing ones.
    pub async fn get_visible(&self, id: &str) -> AppResult<survey::Model> {
        match self.find_by_id(id).await? {
            Some(survey) if !survey.is_hidden => Ok(survey),
            _ => Err(AppError::NotFound(format!("Survey not found: {id}"))),
        }
    }

    /// Insert a survey with its questions, options and constraints in
    /// one transaction.
    pub async fn create(
        &self,
        model: survey::ActiveModel,
        children: SurveyChildren,
    ) -> AppResult<survey::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let survey = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::insert_children(&txn, children).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(survey)
    }

    /// Update a survey and replace its question set and constraints in
    /// one transaction. Old questions cascade-delete their options.
    pub async fn update_with_children(
        &self,
        model: survey::ActiveModel,
        children: SurveyChildren,
    ) -> AppResult<survey::Model> {
        let survey_id = match &model.id {
            sea_orm::ActiveValue::Set(id) | sea_orm::ActiveValue::Unchanged(id) => id.clone(),
            sea_orm::ActiveValue::NotSet => {
                return Err(AppError::Internal("survey id not set on update".to_string()));
            }
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let survey = model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Question::delete_many()
            .filter(question::Column::SurveyId.eq(survey_id.clone()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        TargetConstraint::delete_many()
            .filter(target_constraint::Column::SurveyId.eq(survey_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::insert_children(&txn, children).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(survey)
    }

    async fn insert_children(
        txn: &sea_orm::DatabaseTransaction,
        children: SurveyChildren,
    ) -> AppResult<()> {
        if !children.questions.is_empty() {
            Question::insert_many(children.questions)
                .exec(txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        if !children.options.is_empty() {
            QuestionOption::insert_many(children.options)
                .exec(txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        if !children.constraints.is_empty() {
            TargetConstraint::insert_many(children.constraints)
                .exec(txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// List non-hidden surveys whose deadline falls inside the window.
    pub async fn find_open(
        &self,
        now: chrono::DateTime<chrono::FixedOffset>,
        deadline_before: Option<chrono::DateTime<chrono::FixedOffset>>,
    ) -> AppResult<Vec<survey::Model>> {
        let mut query = Survey::find()
            .filter(survey::Column::IsHidden.eq(false))
            .filter(survey::Column::Deadline.gt(now));
        if let Some(upper) = deadline_before {
            query = query.filter(survey::Column::Deadline.lte(upper));
        }
        query
            .order_by_desc(survey::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch surveys by id, hidden ones included.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<survey::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        Survey::find()
            .filter(survey::Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List surveys authored by a user, newest first.
    pub async fn find_by_author(&self, author_id: &str) -> AppResult<Vec<survey::Model>> {
        Survey::find()
            .filter(survey::Column::AuthorId.eq(author_id))
            .order_by_desc(survey::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch a survey's questions in creation order.
    pub async fn questions_for(&self, survey_id: &str) -> AppResult<Vec<question::Model>> {
        Question::find()
            .filter(question::Column::SurveyId.eq(survey_id))
            .order_by_asc(question::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch all options for a set of questions.
    pub async fn options_for_questions(
        &self,
        question_ids: &[String],
    ) -> AppResult<Vec<question_option::Model>> {
        if question_ids.is_empty() {
            return Ok(vec![]);
        }
        QuestionOption::find()
            .filter(question_option::Column::QuestionId.is_in(question_ids.iter().cloned()))
            .order_by_asc(question_option::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch a survey's target constraints.
    pub async fn constraints_for(
        &self,
        survey_id: &str,
    ) -> AppResult<Vec<target_constraint::Model>> {
        TargetConstraint::find()
            .filter(target_constraint::Column::SurveyId.eq(survey_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a survey.
    pub async fn update(&self, model: survey::ActiveModel) -> AppResult<survey::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a survey hidden, returning the updated row.
    pub async fn set_hidden(&self, id: &str) -> AppResult<survey::Model> {
        let survey = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Survey not found: {id}")))?;
        let mut active: survey::ActiveModel = survey.into();
        active.is_hidden = Set(true);
        self.update(active).await
    }

    /// Delete a survey. Owned rows cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Survey::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use unipoll_common::{AppError, AppResult};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by IdP uuid.
    pub async fn find_by_uuid(&self, uuid: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(uuid)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by IdP uuid, returning error if not found.
    pub async fn get_by_uuid(&self, uuid: &str) -> AppResult<user::Model> {
        self.find_by_uuid(uuid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {uuid}")))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an existing user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch user summaries for a set of uuids.
    pub async fn find_by_uuids(&self, uuids: &[String]) -> AppResult<Vec<user::Model>> {
        if uuids.is_empty() {
            return Ok(vec![]);
        }
        User::find()
            .filter(user::Column::Uuid.is_in(uuids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update the editable profile fields.
    pub async fn update_profile(
        &self,
        uuid: &str,
        nickname: Option<String>,
        department: Option<String>,
    ) -> AppResult<user::Model> {
        let user = self.get_by_uuid(uuid).await?;
        let mut active: user::ActiveModel = user.into();
        if let Some(nickname) = nickname {
            active.nickname = Set(Some(nickname));
        }
        if let Some(department) = department {
            active.department = Set(Some(department));
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

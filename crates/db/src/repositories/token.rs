//! Token repository: refresh sessions and the access-token blacklist.

use std::sync::Arc;

use crate::entities::{RefreshSession, TokenBlacklist, refresh_session, token_blacklist};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use unipoll_common::{AppError, AppResult};

/// Token repository for database operations.
#[derive(Clone)]
pub struct TokenRepository {
    db: Arc<DatabaseConnection>,
}

impl TokenRepository {
    /// Create a new token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a refresh session.
    pub async fn create_session(
        &self,
        model: refresh_session::ActiveModel,
    ) -> AppResult<refresh_session::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the subject's live session for a token hash: not revoked,
    /// not expired.
    pub async fn find_active_session(
        &self,
        user_id: &str,
        token_hash: &str,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<Option<refresh_session::Model>> {
        RefreshSession::find()
            .filter(refresh_session::Column::UserId.eq(user_id))
            .filter(refresh_session::Column::TokenHash.eq(token_hash))
            .filter(refresh_session::Column::RevokedAt.is_null())
            .filter(refresh_session::Column::ExpiresAt.gt(now))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Consume a session and persist its replacement in one transaction.
    ///
    /// Rotation-on-use: the old session is revoked in the same unit that
    /// records the new one, so a crash leaves no half-rotated state.
    pub async fn rotate_session(
        &self,
        old_session_id: &str,
        replacement: refresh_session::ActiveModel,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<refresh_session::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let old = RefreshSession::find_by_id(old_session_id)
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or(AppError::Unauthorized)?;
        let mut old: refresh_session::ActiveModel = old.into();
        old.revoked_at = Set(Some(now));
        old.update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = replacement
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(created)
    }

    /// Revoke every live session of the subject matching the hash.
    pub async fn revoke_matching_sessions(
        &self,
        user_id: &str,
        token_hash: &str,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<u64> {
        let result = RefreshSession::update_many()
            .col_expr(
                refresh_session::Column::RevokedAt,
                sea_orm::sea_query::Expr::value(Some(now)),
            )
            .filter(refresh_session::Column::UserId.eq(user_id))
            .filter(refresh_session::Column::TokenHash.eq(token_hash))
            .filter(refresh_session::Column::RevokedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Insert or refresh a blacklist entry for a revoked access token.
    pub async fn upsert_blacklist(
        &self,
        jti: &str,
        expires_at: chrono::DateTime<chrono::FixedOffset>,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<()> {
        let existing = TokenBlacklist::find_by_id(jti)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match existing {
            Some(entry) => {
                let mut active: token_blacklist::ActiveModel = entry.into();
                active.expires_at = Set(expires_at);
                active
                    .update(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            None => {
                let model = token_blacklist::ActiveModel {
                    jti: Set(jti.to_string()),
                    expires_at: Set(expires_at),
                    created_at: Set(now),
                };
                model
                    .insert(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Check whether a jti is blacklisted and the entry still valid.
    pub async fn is_blacklisted(
        &self,
        jti: &str,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<bool> {
        let entry = TokenBlacklist::find_by_id(jti)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(entry.is_some_and(|e| e.expires_at > now))
    }

    /// Drop blacklist rows whose tokens have expired anyway.
    pub async fn prune_expired_blacklist(
        &self,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<u64> {
        let result = TokenBlacklist::delete_many()
            .filter(token_blacklist::Column::ExpiresAt.lte(now))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

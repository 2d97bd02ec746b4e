//! Request extractors.
//!
//! The auth middleware resolves the bearer token and stashes the user
//! model in request extensions; these extractors pull it back out.

use axum::{extract::FromRequestParts, http::request::Parts};
use unipoll_common::AppError;
use unipoll_db::entities::user;

/// Extracts the authenticated user, rejecting the request when the
/// middleware resolved none.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

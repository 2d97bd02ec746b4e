//! API endpoints.

mod auth;
mod comments;
mod reports;
mod surveys;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest(
            "/surveys",
            surveys::router().merge(comments::survey_router()),
        )
        .nest("/comments", comments::router())
        .nest("/reports", reports::router())
        .nest("/users", users::router())
}

//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use unipoll_core::{AuthService, CommentService, ReportService, SurveyService, UserService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub survey_service: SurveyService,
    pub comment_service: CommentService,
    pub report_service: ReportService,
}

/// Authentication middleware.
///
/// Validates the bearer token if present and inserts the resolved user
/// into request extensions. Endpoints that require authentication
/// reject via the `AuthUser` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.auth_service.authenticate(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}

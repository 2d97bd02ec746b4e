//! API integration tests.
//!
//! These tests verify routing, authentication gating and request
//! validation without a real database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use std::sync::Arc;
use tower::ServiceExt;
use unipoll_api::{middleware::AppState, router as api_router};
use unipoll_common::config::{AuthConfig, IdpConfig};
use unipoll_core::{
    AuthService, CommentService, IdpClient, ReportService, SurveyService, TokenService,
    UserService,
};
use unipoll_db::repositories::{
    CommentRepository, NotificationRepository, ReportRepository, ResponseRepository,
    SurveyRepository, TokenRepository, UserRepository,
};

/// Create a mock database connection.
fn create_mock_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection()
}

/// Create test app state with mock database.
fn create_test_state() -> AppState {
    let db = Arc::new(create_mock_db());

    let user_repo = UserRepository::new(Arc::clone(&db));
    let survey_repo = SurveyRepository::new(Arc::clone(&db));
    let response_repo = ResponseRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let token_repo = TokenRepository::new(Arc::clone(&db));

    let auth_config = AuthConfig {
        jwt_secret: "test-secret".to_string(),
        access_ttl_secs: 300,
        refresh_ttl_secs: 86_400,
    };
    let idp_config = IdpConfig {
        base_url: "https://idp.example.edu".to_string(),
    };

    let token_service = TokenService::new(token_repo, auth_config);
    let auth_service = AuthService::new(
        IdpClient::new(&idp_config),
        user_repo.clone(),
        token_service,
    );
    let user_service = UserService::new(
        user_repo.clone(),
        survey_repo.clone(),
        response_repo.clone(),
        comment_repo.clone(),
        notification_repo.clone(),
    );
    let survey_service = SurveyService::new(
        survey_repo.clone(),
        response_repo.clone(),
        user_repo.clone(),
    );
    let comment_service = CommentService::new(
        comment_repo.clone(),
        survey_repo.clone(),
        user_repo,
        notification_repo.clone(),
    );
    let report_service =
        ReportService::new(report_repo, survey_repo, comment_repo, notification_repo);

    AppState {
        auth_service,
        user_service,
        survey_service,
        comment_service,
        report_service,
    }
}

/// Create the test router.
fn create_test_router() -> Router {
    let state = create_test_state();
    api_router().with_state(state)
}

#[tokio::test]
async fn test_surveys_require_auth() {
    let app = create_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/surveys")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_me_requires_auth() {
    let app = create_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vote_requires_auth() {
    let app = create_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/surveys/some-id/vote")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"answers":[]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_report_requires_auth() {
    let app = create_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/reports")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"targetType":"SURVEY","targetId":"some-id"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_forged_token_rejected() {
    let app = create_test_router();

    // Signature verification fails before any database access.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/refresh")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"refreshToken":"not-a-real-token"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_invalid_json_returns_error() {
    let app = create_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/login")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from("invalid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

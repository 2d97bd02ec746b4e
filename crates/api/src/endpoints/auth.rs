//! Authentication endpoints.

use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use serde::{Deserialize, Serialize};
use unipoll_common::{AppError, AppResult};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Login request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub idp_token: String,
}

/// Login response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub is_new_user: bool,
}

/// Exchange an IdP token for a local session.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let result = state.auth_service.login(&req.idp_token).await?;

    Ok(ApiResponse::ok(LoginResponse {
        access_token: result.access_token,
        refresh_token: result.refresh_token,
        is_new_user: result.is_new_user,
    }))
}

/// Refresh request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Rotate a refresh token into a new pair.
async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<ApiResponse<RefreshResponse>> {
    let pair = state.auth_service.refresh(&req.refresh_token).await?;

    Ok(ApiResponse::ok(RefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Logout request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Logout response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub ok: bool,
}

/// End the current session.
async fn logout(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LogoutRequest>,
) -> AppResult<ApiResponse<LogoutResponse>> {
    // The raw access token is needed again for its jti.
    let access_token = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    state
        .auth_service
        .logout(access_token, &req.refresh_token)
        .await?;

    Ok(ApiResponse::ok(LogoutResponse { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

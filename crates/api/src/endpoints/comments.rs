//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use unipoll_common::AppResult;
use unipoll_core::CommentView;
use unipoll_db::entities::comment;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create/update comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub content: String,
}

/// A comment as returned to clients.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub survey_id: String,
    pub content: String,
    pub author_uuid: String,
    pub author_nickname: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl CommentResponse {
    fn from_model(comment: comment::Model, author_nickname: Option<String>) -> Self {
        Self {
            id: comment.id,
            survey_id: comment.survey_id,
            content: comment.content,
            author_uuid: comment.author_id,
            author_nickname,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        Self::from_model(view.comment, view.author_nickname)
    }
}

/// List a survey's visible comments.
async fn list_comments(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(survey_id): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state.comment_service.list(&survey_id).await?;
    Ok(ApiResponse::ok(
        comments.into_iter().map(Into::into).collect(),
    ))
}

/// Post a comment on a survey.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(survey_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let created = state
        .comment_service
        .create(&survey_id, &user.uuid, &req.content)
        .await?;
    Ok(ApiResponse::ok(CommentResponse::from_model(
        created,
        user.nickname,
    )))
}

/// Edit a comment.
async fn update_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let updated = state
        .comment_service
        .update(&id, &user.uuid, &req.content)
        .await?;
    Ok(ApiResponse::ok(CommentResponse::from_model(
        updated,
        user.nickname,
    )))
}

/// Delete a comment.
async fn delete_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.comment_service.delete(&id, &user.uuid).await?;
    Ok(crate::response::ok())
}

/// Routes nested under `/surveys/{id}/comments`.
pub fn survey_router() -> Router<AppState> {
    Router::new().route("/{id}/comments", get(list_comments).post(create_comment))
}

/// Routes for operating on a comment directly.
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", patch(update_comment).delete(delete_comment))
}

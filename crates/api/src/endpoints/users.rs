//! User endpoints ("my page").

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use unipoll_common::AppResult;
use unipoll_core::UpdateProfileInput;
use unipoll_db::entities::{notification::NotificationKind, user};
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// The caller's own profile.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub uuid: String,
    pub email: Option<String>,
    pub name: String,
    pub picture: Option<String>,
    pub nickname: Option<String>,
    pub department: Option<String>,
    pub student_id: Option<String>,
}

impl From<user::Model> for ProfileResponse {
    fn from(user: user::Model) -> Self {
        Self {
            uuid: user.uuid,
            email: user.email,
            name: user.name,
            picture: user.picture,
            nickname: user.nickname,
            department: user.department,
            student_id: user.student_id,
        }
    }
}

/// Get the caller's profile.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let user = state.user_service.me(&user.uuid).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Profile update request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 30))]
    pub nickname: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub department: Option<String>,
}

/// Update nickname and/or department.
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    req.validate()?;

    let updated = state
        .user_service
        .update_profile(
            &user.uuid,
            UpdateProfileInput {
                nickname: req.nickname,
                department: req.department,
            },
        )
        .await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// A survey authored by the caller.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MySurveyResponse {
    pub id: String,
    pub title: String,
    pub deadline: DateTime<FixedOffset>,
    pub is_hidden: bool,
    pub created_at: DateTime<FixedOffset>,
    pub response_count: u64,
}

/// List the caller's surveys.
async fn my_surveys(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<MySurveyResponse>>> {
    let surveys = state.user_service.my_surveys(&user.uuid).await?;
    Ok(ApiResponse::ok(
        surveys
            .into_iter()
            .map(|s| MySurveyResponse {
                id: s.id,
                title: s.title,
                deadline: s.deadline,
                is_hidden: s.is_hidden,
                created_at: s.created_at,
                response_count: s.response_count,
            })
            .collect(),
    ))
}

/// A survey the caller voted on.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyResponseResponse {
    pub survey_id: String,
    pub survey_title: String,
    pub deadline: DateTime<FixedOffset>,
    pub responded_at: DateTime<FixedOffset>,
}

/// List surveys the caller voted on.
async fn my_responses(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<MyResponseResponse>>> {
    let responses = state.user_service.my_responses(&user.uuid).await?;
    Ok(ApiResponse::ok(
        responses
            .into_iter()
            .map(|r| MyResponseResponse {
                survey_id: r.survey_id,
                survey_title: r.survey_title,
                deadline: r.deadline,
                responded_at: r.responded_at,
            })
            .collect(),
    ))
}

/// A comment the caller wrote.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyCommentResponse {
    pub id: String,
    pub survey_id: String,
    pub survey_title: String,
    pub content: String,
    pub is_hidden: bool,
    pub created_at: DateTime<FixedOffset>,
}

/// List the caller's comments.
async fn my_comments(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<MyCommentResponse>>> {
    let comments = state.user_service.my_comments(&user.uuid).await?;
    Ok(ApiResponse::ok(
        comments
            .into_iter()
            .map(|c| MyCommentResponse {
                id: c.id,
                survey_id: c.survey_id,
                survey_title: c.survey_title,
                content: c.content,
                is_hidden: c.is_hidden,
                created_at: c.created_at,
            })
            .collect(),
    ))
}

/// A notification addressed to the caller.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<FixedOffset>,
}

/// List the caller's notifications.
async fn my_notifications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<NotificationResponse>>> {
    let notifications = state.user_service.my_notifications(&user.uuid).await?;
    Ok(ApiResponse::ok(
        notifications
            .into_iter()
            .map(|n| NotificationResponse {
                id: n.id,
                kind: n.kind,
                content: n.content,
                is_read: n.is_read,
                created_at: n.created_at,
            })
            .collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).patch(update_me))
        .route("/me/surveys", get(my_surveys))
        .route("/me/responses", get(my_responses))
        .route("/me/comments", get(my_comments))
        .route("/me/notifications", get(my_notifications))
}

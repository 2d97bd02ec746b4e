//! Report endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use unipoll_common::AppResult;
use unipoll_db::entities::report::ReportTargetKind;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Report request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub target_type: ReportTargetKind,
    pub target_id: String,
}

/// Report response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportResponse {
    pub ok: bool,
}

/// File a report against a survey or comment.
async fn create_report(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateReportRequest>,
) -> AppResult<ApiResponse<CreateReportResponse>> {
    state
        .report_service
        .create_report(&user.uuid, req.target_type, &req.target_id)
        .await?;
    Ok(ApiResponse::ok(CreateReportResponse { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_report))
}

//! Survey endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use unipoll_common::AppResult;
use unipoll_core::{
    CreateConstraintInput, CreateOptionInput, CreateQuestionInput, CreateSurveyInput,
    SurveyDetail, SurveyResults, SurveyTab, VoteAnswerInput,
};
use unipoll_db::entities::{question::QuestionKind, target_constraint::TargetKind};
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Option payload of a create/update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRequest {
    pub content: String,
    pub image_url: Option<String>,
}

/// Question payload of a create/update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub content: String,
    #[serde(default)]
    pub options: Vec<OptionRequest>,
}

/// Target constraint payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintRequest {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub value: Option<String>,
}

/// Create/update survey request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurveyRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub is_anonymous: bool,

    pub deadline: DateTime<FixedOffset>,

    pub estimated_time: Option<i32>,

    pub questions: Vec<QuestionRequest>,

    #[serde(default)]
    pub target_constraints: Vec<ConstraintRequest>,
}

impl From<CreateSurveyRequest> for CreateSurveyInput {
    fn from(req: CreateSurveyRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            is_anonymous: req.is_anonymous,
            deadline: req.deadline,
            estimated_time: req.estimated_time,
            questions: req
                .questions
                .into_iter()
                .map(|q| CreateQuestionInput {
                    kind: q.kind,
                    content: q.content,
                    options: q
                        .options
                        .into_iter()
                        .map(|o| CreateOptionInput {
                            content: o.content,
                            image_url: o.image_url,
                        })
                        .collect(),
                })
                .collect(),
            constraints: req
                .target_constraints
                .into_iter()
                .map(|c| CreateConstraintInput {
                    kind: c.kind,
                    value: c.value,
                })
                .collect(),
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub tab: SurveyTab,
}

/// One row of the survey listing.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySummaryResponse {
    pub id: String,
    pub title: String,
    pub deadline: DateTime<FixedOffset>,
    pub estimated_time: i32,
    pub is_anonymous: bool,
    pub response_count: u64,
}

/// Survey author identity.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorResponse {
    pub uuid: String,
    pub nickname: Option<String>,
    pub department: Option<String>,
}

/// One option of a question.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResponse {
    pub id: String,
    pub content: String,
    pub image_url: Option<String>,
    pub position: i32,
}

/// One question with its options.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub content: String,
    pub position: i32,
    pub options: Vec<OptionResponse>,
}

/// One target constraint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintResponse {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub value: Option<String>,
}

/// Full survey view.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDetailResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub is_anonymous: bool,
    pub deadline: DateTime<FixedOffset>,
    pub estimated_time: i32,
    pub author: AuthorResponse,
    pub questions: Vec<QuestionResponse>,
    pub target_constraints: Vec<ConstraintResponse>,
    pub response_count: u64,
    pub has_voted: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl From<SurveyDetail> for SurveyDetailResponse {
    fn from(detail: SurveyDetail) -> Self {
        Self {
            id: detail.survey.id,
            title: detail.survey.title,
            description: detail.survey.description,
            is_anonymous: detail.survey.is_anonymous,
            deadline: detail.survey.deadline,
            estimated_time: detail.survey.estimated_time,
            author: AuthorResponse {
                uuid: detail.author_uuid,
                nickname: detail.author_nickname,
                department: detail.author_department,
            },
            questions: detail
                .questions
                .into_iter()
                .map(|q| QuestionResponse {
                    id: q.question.id,
                    kind: q.question.kind,
                    content: q.question.content,
                    position: q.question.position,
                    options: q
                        .options
                        .into_iter()
                        .map(|o| OptionResponse {
                            id: o.id,
                            content: o.content,
                            image_url: o.image_url,
                            position: o.position,
                        })
                        .collect(),
                })
                .collect(),
            target_constraints: detail
                .constraints
                .into_iter()
                .map(|c| ConstraintResponse {
                    kind: c.kind,
                    value: c.value,
                })
                .collect(),
            response_count: detail.response_count,
            has_voted: detail.has_voted,
            created_at: detail.survey.created_at,
        }
    }
}

/// List open surveys.
async fn list_surveys(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<SurveySummaryResponse>>> {
    let summaries = state.survey_service.list(query.tab).await?;

    Ok(ApiResponse::ok(
        summaries
            .into_iter()
            .map(|s| SurveySummaryResponse {
                id: s.id,
                title: s.title,
                deadline: s.deadline,
                estimated_time: s.estimated_time,
                is_anonymous: s.is_anonymous,
                response_count: s.response_count,
            })
            .collect(),
    ))
}

/// Create a survey.
async fn create_survey(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateSurveyRequest>,
) -> AppResult<ApiResponse<SurveyDetailResponse>> {
    req.validate()?;

    let detail = state.survey_service.create(&user.uuid, req.into()).await?;
    Ok(ApiResponse::ok(detail.into()))
}

/// Get one survey.
async fn get_survey(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<SurveyDetailResponse>> {
    let detail = state.survey_service.get(&id, Some(&user.uuid)).await?;
    Ok(ApiResponse::ok(detail.into()))
}

/// Replace a survey's content. Fails once responses exist.
async fn update_survey(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateSurveyRequest>,
) -> AppResult<ApiResponse<SurveyDetailResponse>> {
    req.validate()?;

    let detail = state
        .survey_service
        .update(&id, &user.uuid, req.into())
        .await?;
    Ok(ApiResponse::ok(detail.into()))
}

/// Delete a survey.
async fn delete_survey(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.survey_service.delete(&id, &user.uuid).await?;
    Ok(crate::response::ok())
}

/// Close a survey immediately.
async fn close_survey(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.survey_service.close(&id, &user.uuid).await?;
    Ok(crate::response::ok())
}

/// One answer of a ballot.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteAnswerRequest {
    pub question_id: String,
    #[serde(default)]
    pub option_ids: Vec<String>,
    pub text: Option<String>,
}

/// Vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub answers: Vec<VoteAnswerRequest>,
}

/// Vote response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub ok: bool,
}

/// Submit a ballot, replacing any previous one.
async fn submit_vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<VoteResponse>> {
    let answers = req
        .answers
        .into_iter()
        .map(|a| VoteAnswerInput {
            question_id: a.question_id,
            option_ids: a.option_ids,
            text: a.text,
        })
        .collect();

    state.survey_service.submit_vote(&id, &user, answers).await?;
    Ok(ApiResponse::ok(VoteResponse { ok: true }))
}

/// Results query parameters.
#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Tally for one option.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTallyResponse {
    pub id: String,
    pub content: String,
    pub count: u64,
}

/// A subjective answer, identity already masked for anonymous surveys.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectiveAnswerResponse {
    pub text: String,
    pub nickname: Option<String>,
    pub uuid: Option<String>,
}

/// One page of subjective answers.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectivePageResponse {
    pub answers: Vec<SubjectiveAnswerResponse>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

/// Results for one question.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResultsResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub content: String,
    pub options: Vec<OptionTallyResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjective_answers: Option<SubjectivePageResponse>,
}

/// Aggregated results.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResultsResponse {
    pub id: String,
    pub title: String,
    pub is_anonymous: bool,
    pub response_count: u64,
    pub questions: Vec<QuestionResultsResponse>,
}

impl From<SurveyResults> for SurveyResultsResponse {
    fn from(results: SurveyResults) -> Self {
        Self {
            id: results.survey.id,
            title: results.survey.title,
            is_anonymous: results.survey.is_anonymous,
            response_count: results.response_count,
            questions: results
                .questions
                .into_iter()
                .map(|q| QuestionResultsResponse {
                    id: q.question.id,
                    kind: q.question.kind,
                    content: q.question.content,
                    options: q
                        .option_tallies
                        .into_iter()
                        .map(|t| OptionTallyResponse {
                            id: t.option.id,
                            content: t.option.content,
                            count: t.count,
                        })
                        .collect(),
                    subjective_answers: q.subjective.map(|page| SubjectivePageResponse {
                        answers: page
                            .answers
                            .into_iter()
                            .map(|a| SubjectiveAnswerResponse {
                                text: a.text,
                                nickname: a.responder_nickname,
                                uuid: a.responder_uuid,
                            })
                            .collect(),
                        page: page.page,
                        limit: page.limit,
                        total: page.total,
                    }),
                })
                .collect(),
        }
    }
}

/// Aggregate results for voters.
async fn get_results(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ResultsQuery>,
) -> AppResult<ApiResponse<SurveyResultsResponse>> {
    let results = state
        .survey_service
        .get_results(&id, &user.uuid, query.page, query.limit)
        .await?;
    Ok(ApiResponse::ok(results.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_surveys).post(create_survey))
        .route(
            "/{id}",
            get(get_survey).patch(update_survey).delete(delete_survey),
        )
        .route("/{id}/close", post(close_survey))
        .route("/{id}/vote", post(submit_vote))
        .route("/{id}/results", get(get_results))
}

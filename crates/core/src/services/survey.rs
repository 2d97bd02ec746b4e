//! Survey service: creation, listing, voting and results.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::Set;
use unipoll_common::{AppError, AppResult, IdGenerator};
use unipoll_db::{
    entities::{
        question::{self, QuestionKind},
        question_option, response, survey,
        target_constraint::{self, TargetKind},
        user,
    },
    repositories::{
        NewAnswerRow, ResponseRepository, SurveyChildren, SurveyRepository, UserRepository,
    },
};

/// Seconds a single-choice question adds to the estimated completion time.
const ESTIMATED_TIME_SINGLE: i32 = 20;
const ESTIMATED_TIME_MULTIPLE: i32 = 25;
const ESTIMATED_TIME_SUBJECTIVE: i32 = 60;

/// Deadlines may be at most this far in the future.
const MAX_DEADLINE_DAYS: i64 = 14;

/// The "closing soon" tab covers deadlines inside this window.
const CLOSING_WINDOW_DAYS: i64 = 3;

const SUBJECTIVE_TEXT_MAX: usize = 1000;

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 200;

/// Placeholder shown in place of a responder on anonymous surveys.
const ANONYMOUS_NICKNAME: &str = "익명";

/// Input for one option of a choice question.
#[derive(Debug, Clone)]
pub struct CreateOptionInput {
    pub content: String,
    pub image_url: Option<String>,
}

/// Input for one question of a new survey.
#[derive(Debug, Clone)]
pub struct CreateQuestionInput {
    pub kind: QuestionKind,
    pub content: String,
    pub options: Vec<CreateOptionInput>,
}

/// Input for one target constraint.
#[derive(Debug, Clone)]
pub struct CreateConstraintInput {
    pub kind: TargetKind,
    pub value: Option<String>,
}

/// Input for creating or replacing a survey.
#[derive(Debug, Clone)]
pub struct CreateSurveyInput {
    pub title: String,
    pub description: String,
    pub is_anonymous: bool,
    pub deadline: DateTime<FixedOffset>,
    /// Completion time in seconds; derived from question kinds if absent.
    pub estimated_time: Option<i32>,
    pub questions: Vec<CreateQuestionInput>,
    pub constraints: Vec<CreateConstraintInput>,
}

/// Listing tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyTab {
    #[default]
    Ongoing,
    Closing,
    Popular,
}

/// One row of the survey listing.
#[derive(Debug, Clone)]
pub struct SurveySummary {
    pub id: String,
    pub title: String,
    pub deadline: DateTime<FixedOffset>,
    pub estimated_time: i32,
    pub is_anonymous: bool,
    pub response_count: u64,
}

/// A question together with its options.
#[derive(Debug, Clone)]
pub struct QuestionWithOptions {
    pub question: question::Model,
    pub options: Vec<question_option::Model>,
}

/// Full survey view.
#[derive(Debug, Clone)]
pub struct SurveyDetail {
    pub survey: survey::Model,
    pub author_uuid: String,
    pub author_nickname: Option<String>,
    pub author_department: Option<String>,
    pub questions: Vec<QuestionWithOptions>,
    pub constraints: Vec<target_constraint::Model>,
    pub response_count: u64,
    pub has_voted: bool,
}

/// One answer of a submitted ballot.
#[derive(Debug, Clone)]
pub struct VoteAnswerInput {
    pub question_id: String,
    pub option_ids: Vec<String>,
    pub text: Option<String>,
}

/// Tally for one option of a choice question.
#[derive(Debug, Clone)]
pub struct OptionTally {
    pub option: question_option::Model,
    pub count: u64,
}

/// A subjective answer as shown in results, identity already masked.
#[derive(Debug, Clone)]
pub struct SubjectiveAnswerView {
    pub text: String,
    pub responder_nickname: Option<String>,
    pub responder_uuid: Option<String>,
}

/// One page of subjective answers.
#[derive(Debug, Clone)]
pub struct SubjectivePage {
    pub answers: Vec<SubjectiveAnswerView>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

/// Results for one question.
#[derive(Debug, Clone)]
pub struct QuestionResults {
    pub question: question::Model,
    pub option_tallies: Vec<OptionTally>,
    pub subjective: Option<SubjectivePage>,
}

/// Aggregated survey results.
#[derive(Debug, Clone)]
pub struct SurveyResults {
    pub survey: survey::Model,
    pub response_count: u64,
    pub questions: Vec<QuestionResults>,
}

/// Survey service for business logic.
#[derive(Clone)]
pub struct SurveyService {
    survey_repo: SurveyRepository,
    response_repo: ResponseRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl SurveyService {
    /// Create a new survey service.
    #[must_use]
    pub const fn new(
        survey_repo: SurveyRepository,
        response_repo: ResponseRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            survey_repo,
            response_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a survey with its questions, options and constraints.
    pub async fn create(&self, author_id: &str, input: CreateSurveyInput) -> AppResult<SurveyDetail> {
        let now = Utc::now().fixed_offset();
        validate_survey_input(&input, now)?;

        let estimated_time = input
            .estimated_time
            .unwrap_or_else(|| derive_estimated_time(&input.questions));

        let survey_id = self.id_gen.generate();
        let model = survey::ActiveModel {
            id: Set(survey_id.clone()),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            is_anonymous: Set(input.is_anonymous),
            deadline: Set(input.deadline),
            estimated_time: Set(estimated_time),
            author_id: Set(author_id.to_string()),
            is_hidden: Set(false),
            created_at: Set(now),
            updated_at: Set(None),
        };
        let children = self.build_children(&survey_id, input.questions, input.constraints);

        let survey = self.survey_repo.create(model, children).await?;
        self.get(&survey.id, Some(author_id)).await
    }

    /// List open surveys for a tab.
    pub async fn list(&self, tab: SurveyTab) -> AppResult<Vec<SurveySummary>> {
        let now = Utc::now().fixed_offset();
        let deadline_before = match tab {
            SurveyTab::Closing => Some(now + Duration::days(CLOSING_WINDOW_DAYS)),
            SurveyTab::Ongoing | SurveyTab::Popular => None,
        };
        let surveys = self.survey_repo.find_open(now, deadline_before).await?;

        let ids: Vec<String> = surveys.iter().map(|s| s.id.clone()).collect();
        let counts = self.response_repo.count_by_surveys(&ids).await?;

        let mut summaries: Vec<SurveySummary> = surveys
            .into_iter()
            .map(|s| SurveySummary {
                response_count: counts.get(&s.id).copied().unwrap_or(0),
                id: s.id,
                title: s.title,
                deadline: s.deadline,
                estimated_time: s.estimated_time,
                is_anonymous: s.is_anonymous,
            })
            .collect();

        if tab == SurveyTab::Popular {
            summaries.sort_by(|a, b| b.response_count.cmp(&a.response_count));
        }
        Ok(summaries)
    }

    /// Get a survey with questions, options, constraints and author info.
    pub async fn get(&self, survey_id: &str, user_id: Option<&str>) -> AppResult<SurveyDetail> {
        let survey = self.survey_repo.get_visible(survey_id).await?;

        let questions = self.survey_repo.questions_for(survey_id).await?;
        let question_ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
        let options = self.survey_repo.options_for_questions(&question_ids).await?;
        let constraints = self.survey_repo.constraints_for(survey_id).await?;

        let mut options_by_question: HashMap<String, Vec<question_option::Model>> = HashMap::new();
        for option in options {
            options_by_question
                .entry(option.question_id.clone())
                .or_default()
                .push(option);
        }

        let author = self.user_repo.find_by_uuid(&survey.author_id).await?;
        let response_count = self.response_repo.count_by_survey(survey_id).await?;
        let has_voted = match user_id {
            Some(uid) => self.response_repo.has_voted(survey_id, uid).await?,
            None => false,
        };

        Ok(SurveyDetail {
            author_uuid: survey.author_id.clone(),
            author_nickname: author.as_ref().and_then(|a| a.nickname.clone()),
            author_department: author.as_ref().and_then(|a| a.department.clone()),
            questions: questions
                .into_iter()
                .map(|q| QuestionWithOptions {
                    options: options_by_question.remove(&q.id).unwrap_or_default(),
                    question: q,
                })
                .collect(),
            constraints,
            response_count,
            has_voted,
            survey,
        })
    }

    /// Replace a survey's content. Rejected once any response exists.
    pub async fn update(
        &self,
        survey_id: &str,
        author_id: &str,
        input: CreateSurveyInput,
    ) -> AppResult<SurveyDetail> {
        let survey = self.survey_repo.get_visible(survey_id).await?;
        if survey.author_id != author_id {
            return Err(AppError::Forbidden(
                "Only the author can edit a survey".to_string(),
            ));
        }
        if self.response_repo.count_by_survey(survey_id).await? > 0 {
            return Err(AppError::Conflict(
                "Survey already has responses and can no longer be edited".to_string(),
            ));
        }

        let now = Utc::now().fixed_offset();
        validate_survey_input(&input, now)?;

        let estimated_time = input
            .estimated_time
            .unwrap_or_else(|| derive_estimated_time(&input.questions));

        let mut active: survey::ActiveModel = survey.into();
        active.title = Set(input.title.trim().to_string());
        active.description = Set(input.description);
        active.is_anonymous = Set(input.is_anonymous);
        active.deadline = Set(input.deadline);
        active.estimated_time = Set(estimated_time);
        active.updated_at = Set(Some(now));

        let children = self.build_children(survey_id, input.questions, input.constraints);
        self.survey_repo.update_with_children(active, children).await?;
        self.get(survey_id, Some(author_id)).await
    }

    /// Close a survey immediately by moving its deadline to now.
    pub async fn close(&self, survey_id: &str, author_id: &str) -> AppResult<survey::Model> {
        let survey = self.owned_survey(survey_id, author_id).await?;
        let mut active: survey::ActiveModel = survey.into();
        let now = Utc::now().fixed_offset();
        active.deadline = Set(now);
        active.updated_at = Set(Some(now));
        self.survey_repo.update(active).await
    }

    /// Delete a survey. Responses, questions and comments cascade.
    pub async fn delete(&self, survey_id: &str, author_id: &str) -> AppResult<()> {
        self.owned_survey(survey_id, author_id).await?;
        self.survey_repo.delete(survey_id).await
    }

    /// Submit a ballot, replacing any previous one from the same voter.
    pub async fn submit_vote(
        &self,
        survey_id: &str,
        voter: &user::Model,
        answers: Vec<VoteAnswerInput>,
    ) -> AppResult<()> {
        let survey = self.survey_repo.get_visible(survey_id).await?;

        let now = Utc::now().fixed_offset();
        if now > survey.deadline {
            return Err(AppError::Forbidden("Survey is closed".to_string()));
        }

        let constraints = self.survey_repo.constraints_for(survey_id).await?;
        if !matches_constraints(&constraints, voter) {
            return Err(AppError::Forbidden(
                "You are not eligible to vote on this survey".to_string(),
            ));
        }

        let questions = self.survey_repo.questions_for(survey_id).await?;
        let question_ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
        let options = self.survey_repo.options_for_questions(&question_ids).await?;
        let rows = validate_answers(&questions, &options, &answers)?;

        let model = response::ActiveModel {
            id: Set(self.id_gen.generate()),
            survey_id: Set(survey_id.to_string()),
            user_id: Set(voter.uuid.clone()),
            created_at: Set(now),
        };
        self.response_repo
            .replace(model, survey_id, &voter.uuid, rows, &self.id_gen)
            .await?;
        Ok(())
    }

    /// Aggregate results for a survey the caller has voted on.
    pub async fn get_results(
        &self,
        survey_id: &str,
        user_id: &str,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> AppResult<SurveyResults> {
        if !self.response_repo.has_voted(survey_id, user_id).await? {
            return Err(AppError::Forbidden(
                "Participate in the survey before viewing results".to_string(),
            ));
        }
        let survey = self.survey_repo.get_visible(survey_id).await?;

        let page = clamp_page(page);
        let limit = clamp_limit(limit);

        let questions = self.survey_repo.questions_for(survey_id).await?;
        let choice_ids: Vec<String> = questions
            .iter()
            .filter(|q| q.kind != QuestionKind::Subjective)
            .map(|q| q.id.clone())
            .collect();
        let options = self.survey_repo.options_for_questions(&choice_ids).await?;
        let tallies = self.response_repo.option_tallies(&choice_ids).await?;

        let mut options_by_question: HashMap<String, Vec<question_option::Model>> = HashMap::new();
        for option in options {
            options_by_question
                .entry(option.question_id.clone())
                .or_default()
                .push(option);
        }

        let mut results = Vec::with_capacity(questions.len());
        for q in questions {
            if q.kind == QuestionKind::Subjective {
                let (rows, total) = self
                    .response_repo
                    .subjective_page(&q.id, page, limit)
                    .await?;
                let answers = self
                    .render_subjective(&survey, rows)
                    .await?;
                results.push(QuestionResults {
                    question: q,
                    option_tallies: vec![],
                    subjective: Some(SubjectivePage {
                        answers,
                        page,
                        limit,
                        total,
                    }),
                });
            } else {
                let option_tallies = options_by_question
                    .remove(&q.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|option| OptionTally {
                        count: tallies.get(&option.id).copied().unwrap_or(0),
                        option,
                    })
                    .collect();
                results.push(QuestionResults {
                    question: q,
                    option_tallies,
                    subjective: None,
                });
            }
        }

        let response_count = self.response_repo.count_by_survey(survey_id).await?;
        Ok(SurveyResults {
            survey,
            response_count,
            questions: results,
        })
    }

    async fn render_subjective(
        &self,
        survey: &survey::Model,
        rows: Vec<unipoll_db::repositories::SubjectiveAnswerRow>,
    ) -> AppResult<Vec<SubjectiveAnswerView>> {
        // Choice tallies carry no identity; masking only applies here.
        if survey.is_anonymous {
            return Ok(rows
                .into_iter()
                .filter_map(|row| row.answer.text)
                .map(|text| SubjectiveAnswerView {
                    text,
                    responder_nickname: Some(ANONYMOUS_NICKNAME.to_string()),
                    responder_uuid: None,
                })
                .collect());
        }

        let responder_ids: Vec<String> = rows.iter().map(|r| r.responder_id.clone()).collect();
        let users = self.user_repo.find_by_uuids(&responder_ids).await?;
        let nicknames: HashMap<String, Option<String>> = users
            .into_iter()
            .map(|u| (u.uuid, u.nickname))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.answer.text.map(|text| SubjectiveAnswerView {
                    text,
                    responder_nickname: nicknames
                        .get(&row.responder_id)
                        .cloned()
                        .unwrap_or_default(),
                    responder_uuid: Some(row.responder_id),
                })
            })
            .collect())
    }

    async fn owned_survey(&self, survey_id: &str, author_id: &str) -> AppResult<survey::Model> {
        let survey = self
            .survey_repo
            .find_by_id(survey_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Survey not found: {survey_id}")))?;
        if survey.author_id != author_id {
            return Err(AppError::Forbidden(
                "Only the author can manage a survey".to_string(),
            ));
        }
        Ok(survey)
    }

    fn build_children(
        &self,
        survey_id: &str,
        questions: Vec<CreateQuestionInput>,
        constraints: Vec<CreateConstraintInput>,
    ) -> SurveyChildren {
        let mut question_models = Vec::with_capacity(questions.len());
        let mut option_models = Vec::new();

        for (q_pos, q) in questions.into_iter().enumerate() {
            let question_id = self.id_gen.generate();
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            question_models.push(question::ActiveModel {
                id: Set(question_id.clone()),
                survey_id: Set(survey_id.to_string()),
                kind: Set(q.kind),
                content: Set(q.content),
                position: Set(q_pos as i32),
            });
            for (o_pos, o) in q.options.into_iter().enumerate() {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                option_models.push(question_option::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    question_id: Set(question_id.clone()),
                    content: Set(o.content),
                    image_url: Set(o.image_url),
                    position: Set(o_pos as i32),
                });
            }
        }

        let constraint_models = constraints
            .into_iter()
            .map(|c| target_constraint::ActiveModel {
                id: Set(self.id_gen.generate()),
                survey_id: Set(survey_id.to_string()),
                kind: Set(c.kind),
                value: Set(c.value),
            })
            .collect();

        SurveyChildren {
            questions: question_models,
            options: option_models,
            constraints: constraint_models,
        }
    }
}

/// Validate a create/update payload against the survey rules.
fn validate_survey_input(
    input: &CreateSurveyInput,
    now: DateTime<FixedOffset>,
) -> AppResult<()> {
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title cannot be empty".to_string()));
    }
    if input.deadline <= now {
        return Err(AppError::BadRequest(
            "Deadline must be in the future".to_string(),
        ));
    }
    if input.deadline > now + Duration::days(MAX_DEADLINE_DAYS) {
        return Err(AppError::BadRequest(format!(
            "Deadline must be within {MAX_DEADLINE_DAYS} days"
        )));
    }
    if input.questions.is_empty() {
        return Err(AppError::BadRequest(
            "Survey must have at least one question".to_string(),
        ));
    }
    for q in &input.questions {
        if q.content.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Question content cannot be empty".to_string(),
            ));
        }
        match q.kind {
            QuestionKind::Single | QuestionKind::Multiple => {
                if q.options.len() < 2 {
                    return Err(AppError::BadRequest(
                        "Choice questions need at least 2 options".to_string(),
                    ));
                }
                if q.options.iter().any(|o| o.content.trim().is_empty()) {
                    return Err(AppError::BadRequest(
                        "Option content cannot be empty".to_string(),
                    ));
                }
            }
            QuestionKind::Subjective => {
                if !q.options.is_empty() {
                    return Err(AppError::BadRequest(
                        "Subjective questions cannot have options".to_string(),
                    ));
                }
            }
        }
    }
    validate_constraints(&input.constraints)
}

fn validate_constraints(constraints: &[CreateConstraintInput]) -> AppResult<()> {
    let has_all = constraints.iter().any(|c| c.kind == TargetKind::All);
    if has_all && constraints.len() > 1 {
        return Err(AppError::BadRequest(
            "An 'all' constraint cannot be combined with others".to_string(),
        ));
    }
    for c in constraints {
        if c.kind != TargetKind::All
            && c.value.as_deref().is_none_or(|v| v.trim().is_empty())
        {
            return Err(AppError::BadRequest(
                "Target constraint requires a value".to_string(),
            ));
        }
    }
    Ok(())
}

/// Evaluate target constraints with OR semantics.
///
/// No constraints means no restriction; an `all` constraint admits
/// everyone regardless of what else is present.
fn matches_constraints(constraints: &[target_constraint::Model], voter: &user::Model) -> bool {
    if constraints.is_empty() {
        return true;
    }
    constraints.iter().any(|c| match c.kind {
        TargetKind::All => true,
        TargetKind::Department => {
            c.value.as_deref().is_some_and(|v| voter.department.as_deref() == Some(v))
        }
        TargetKind::StudentIdPrefix => c.value.as_deref().is_some_and(|prefix| {
            voter
                .student_id
                .as_deref()
                .is_some_and(|sid| sid.starts_with(prefix))
        }),
        TargetKind::Nickname => {
            c.value.as_deref().is_some_and(|v| voter.nickname.as_deref() == Some(v))
        }
        TargetKind::Uuid => c.value.as_deref() == Some(voter.uuid.as_str()),
    })
}

/// Validate a ballot against the survey's questions and expand it into
/// answer rows: one per selected option, or one holding trimmed text.
fn validate_answers(
    questions: &[question::Model],
    options: &[question_option::Model],
    answers: &[VoteAnswerInput],
) -> AppResult<Vec<NewAnswerRow>> {
    let by_id: HashMap<&str, &question::Model> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();
    let mut options_by_question: HashMap<&str, HashSet<&str>> = HashMap::new();
    for option in options {
        options_by_question
            .entry(option.question_id.as_str())
            .or_default()
            .insert(option.id.as_str());
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut rows = Vec::new();

    for answer in answers {
        let question = by_id.get(answer.question_id.as_str()).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown question: {}", answer.question_id))
        })?;
        if !seen.insert(question.id.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Duplicate answer for question: {}",
                question.id
            )));
        }

        let known_options = options_by_question
            .get(question.id.as_str())
            .cloned()
            .unwrap_or_default();
        for option_id in &answer.option_ids {
            if !known_options.contains(option_id.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "Unknown option: {option_id}"
                )));
            }
        }

        match question.kind {
            QuestionKind::Single => {
                if answer.option_ids.len() != 1 || answer.text.is_some() {
                    return Err(AppError::BadRequest(
                        "Single-choice answers need exactly one option and no text".to_string(),
                    ));
                }
                rows.push(NewAnswerRow {
                    question_id: question.id.clone(),
                    option_id: Some(answer.option_ids[0].clone()),
                    text: None,
                });
            }
            QuestionKind::Multiple => {
                if answer.option_ids.is_empty() || answer.text.is_some() {
                    return Err(AppError::BadRequest(
                        "Multiple-choice answers need at least one option and no text".to_string(),
                    ));
                }
                for option_id in &answer.option_ids {
                    rows.push(NewAnswerRow {
                        question_id: question.id.clone(),
                        option_id: Some(option_id.clone()),
                        text: None,
                    });
                }
            }
            QuestionKind::Subjective => {
                if !answer.option_ids.is_empty() {
                    return Err(AppError::BadRequest(
                        "Subjective answers cannot select options".to_string(),
                    ));
                }
                let text = answer
                    .text
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        AppError::BadRequest("Subjective answers require text".to_string())
                    })?;
                if text.chars().count() > SUBJECTIVE_TEXT_MAX {
                    return Err(AppError::BadRequest(format!(
                        "Answer text is too long (max {SUBJECTIVE_TEXT_MAX} chars)"
                    )));
                }
                rows.push(NewAnswerRow {
                    question_id: question.id.clone(),
                    option_id: None,
                    text: Some(text.to_string()),
                });
            }
        }
    }

    Ok(rows)
}

/// Sum of per-question completion estimates, in seconds.
fn derive_estimated_time(questions: &[CreateQuestionInput]) -> i32 {
    questions
        .iter()
        .map(|q| match q.kind {
            QuestionKind::Single => ESTIMATED_TIME_SINGLE,
            QuestionKind::Multiple => ESTIMATED_TIME_MULTIPLE,
            QuestionKind::Subjective => ESTIMATED_TIME_SUBJECTIVE,
        })
        .sum()
}

fn clamp_page(page: Option<u64>) -> u64 {
    page.unwrap_or(DEFAULT_PAGE).max(1)
}

fn clamp_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;
    use unipoll_db::{entities::answer, repositories::SubjectiveAnswerRow};

    fn service_over(db: DatabaseConnection) -> SurveyService {
        let db = Arc::new(db);
        SurveyService::new(
            SurveyRepository::new(Arc::clone(&db)),
            ResponseRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
        )
    }

    fn survey_model(is_anonymous: bool) -> survey::Model {
        let now = Utc::now();
        survey::Model {
            id: "s1".to_string(),
            title: "점심 메뉴 선호도".to_string(),
            description: String::new(),
            is_anonymous,
            deadline: (now + Duration::days(7)).into(),
            estimated_time: 20,
            author_id: "uuid-author".to_string(),
            is_hidden: false,
            created_at: now.into(),
            updated_at: None,
        }
    }

    fn subjective_row(text: &str, responder_id: &str) -> SubjectiveAnswerRow {
        SubjectiveAnswerRow {
            answer: answer::Model {
                id: "a1".to_string(),
                response_id: "resp1".to_string(),
                question_id: "q1".to_string(),
                option_id: None,
                text: Some(text.to_string()),
            },
            responder_id: responder_id.to_string(),
        }
    }

    fn voter() -> user::Model {
        user::Model {
            uuid: "uuid-1".to_string(),
            email: None,
            name: "Alice".to_string(),
            picture: None,
            nickname: Some("alice".to_string()),
            department: Some("EECS".to_string()),
            student_id: Some("20250001".to_string()),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn constraint(kind: TargetKind, value: Option<&str>) -> target_constraint::Model {
        target_constraint::Model {
            id: "c1".to_string(),
            survey_id: "s1".to_string(),
            kind,
            value: value.map(str::to_string),
        }
    }

    fn question(id: &str, kind: QuestionKind) -> question::Model {
        question::Model {
            id: id.to_string(),
            survey_id: "s1".to_string(),
            kind,
            content: "q".to_string(),
            position: 0,
        }
    }

    fn option(id: &str, question_id: &str) -> question_option::Model {
        question_option::Model {
            id: id.to_string(),
            question_id: question_id.to_string(),
            content: "o".to_string(),
            image_url: None,
            position: 0,
        }
    }

    #[test]
    fn test_no_constraints_allows_everyone() {
        assert!(matches_constraints(&[], &voter()));
    }

    #[test]
    fn test_all_constraint_short_circuits() {
        let constraints = vec![constraint(TargetKind::All, None)];
        assert!(matches_constraints(&constraints, &voter()));
    }

    #[test]
    fn test_department_constraint_exact_match() {
        let constraints = vec![constraint(TargetKind::Department, Some("EECS"))];
        assert!(matches_constraints(&constraints, &voter()));

        let constraints = vec![constraint(TargetKind::Department, Some("Physics"))];
        assert!(!matches_constraints(&constraints, &voter()));
    }

    #[test]
    fn test_student_id_prefix_match() {
        let constraints = vec![constraint(TargetKind::StudentIdPrefix, Some("2025"))];
        assert!(matches_constraints(&constraints, &voter()));

        let constraints = vec![constraint(TargetKind::StudentIdPrefix, Some("2024"))];
        assert!(!matches_constraints(&constraints, &voter()));
    }

    #[test]
    fn test_constraints_or_semantics() {
        let constraints = vec![
            constraint(TargetKind::Department, Some("Physics")),
            constraint(TargetKind::Uuid, Some("uuid-1")),
        ];
        assert!(matches_constraints(&constraints, &voter()));

        let constraints = vec![
            constraint(TargetKind::Department, Some("Physics")),
            constraint(TargetKind::Nickname, Some("bob")),
        ];
        assert!(!matches_constraints(&constraints, &voter()));
    }

    #[test]
    fn test_single_answer_expands_to_one_row() {
        let questions = vec![question("q1", QuestionKind::Single)];
        let options = vec![option("o1", "q1"), option("o2", "q1")];
        let answers = vec![VoteAnswerInput {
            question_id: "q1".to_string(),
            option_ids: vec!["o1".to_string()],
            text: None,
        }];
        let rows = validate_answers(&questions, &options, &answers).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].option_id.as_deref(), Some("o1"));
        assert!(rows[0].text.is_none());
    }

    #[test]
    fn test_single_rejects_two_options() {
        let questions = vec![question("q1", QuestionKind::Single)];
        let options = vec![option("o1", "q1"), option("o2", "q1")];
        let answers = vec![VoteAnswerInput {
            question_id: "q1".to_string(),
            option_ids: vec!["o1".to_string(), "o2".to_string()],
            text: None,
        }];
        assert!(validate_answers(&questions, &options, &answers).is_err());
    }

    #[test]
    fn test_multiple_fans_out_rows() {
        let questions = vec![question("q1", QuestionKind::Multiple)];
        let options = vec![option("o1", "q1"), option("o2", "q1"), option("o3", "q1")];
        let answers = vec![VoteAnswerInput {
            question_id: "q1".to_string(),
            option_ids: vec!["o1".to_string(), "o3".to_string()],
            text: None,
        }];
        let rows = validate_answers(&questions, &options, &answers).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_subjective_trims_text() {
        let questions = vec![question("q1", QuestionKind::Subjective)];
        let answers = vec![VoteAnswerInput {
            question_id: "q1".to_string(),
            option_ids: vec![],
            text: Some("  my answer  ".to_string()),
        }];
        let rows = validate_answers(&questions, &[], &answers).unwrap();
        assert_eq!(rows[0].text.as_deref(), Some("my answer"));
        assert!(rows[0].option_id.is_none());
    }

    #[test]
    fn test_subjective_rejects_blank_and_too_long() {
        let questions = vec![question("q1", QuestionKind::Subjective)];
        let answers = vec![VoteAnswerInput {
            question_id: "q1".to_string(),
            option_ids: vec![],
            text: Some("   ".to_string()),
        }];
        assert!(validate_answers(&questions, &[], &answers).is_err());

        let answers = vec![VoteAnswerInput {
            question_id: "q1".to_string(),
            option_ids: vec![],
            text: Some("a".repeat(1001)),
        }];
        assert!(validate_answers(&questions, &[], &answers).is_err());
    }

    #[test]
    fn test_duplicate_question_rejected() {
        let questions = vec![question("q1", QuestionKind::Subjective)];
        let answer = VoteAnswerInput {
            question_id: "q1".to_string(),
            option_ids: vec![],
            text: Some("x".to_string()),
        };
        let answers = vec![answer.clone(), answer];
        assert!(validate_answers(&questions, &[], &answers).is_err());
    }

    #[test]
    fn test_unknown_question_and_option_rejected() {
        let questions = vec![question("q1", QuestionKind::Single)];
        let options = vec![option("o1", "q1"), option("o2", "q1")];

        let answers = vec![VoteAnswerInput {
            question_id: "q9".to_string(),
            option_ids: vec!["o1".to_string()],
            text: None,
        }];
        assert!(validate_answers(&questions, &options, &answers).is_err());

        let answers = vec![VoteAnswerInput {
            question_id: "q1".to_string(),
            option_ids: vec!["o9".to_string()],
            text: None,
        }];
        assert!(validate_answers(&questions, &options, &answers).is_err());
    }

    #[test]
    fn test_estimated_time_derivation() {
        let questions = vec![
            CreateQuestionInput {
                kind: QuestionKind::Single,
                content: "q".to_string(),
                options: vec![],
            },
            CreateQuestionInput {
                kind: QuestionKind::Multiple,
                content: "q".to_string(),
                options: vec![],
            },
            CreateQuestionInput {
                kind: QuestionKind::Subjective,
                content: "q".to_string(),
                options: vec![],
            },
        ];
        assert_eq!(derive_estimated_time(&questions), 105);
        assert_eq!(derive_estimated_time(&questions[..1]), 20);
    }

    #[test]
    fn test_deadline_validation() {
        let now = Utc::now().fixed_offset();
        let base = CreateSurveyInput {
            title: "t".to_string(),
            description: String::new(),
            is_anonymous: false,
            deadline: now + Duration::days(20),
            estimated_time: None,
            questions: vec![CreateQuestionInput {
                kind: QuestionKind::Subjective,
                content: "q".to_string(),
                options: vec![],
            }],
            constraints: vec![],
        };
        assert!(validate_survey_input(&base, now).is_err());

        let ok = CreateSurveyInput {
            deadline: now + Duration::days(7),
            ..base.clone()
        };
        assert!(validate_survey_input(&ok, now).is_ok());

        let past = CreateSurveyInput {
            deadline: now - Duration::days(1),
            ..base
        };
        assert!(validate_survey_input(&past, now).is_err());
    }

    #[test]
    fn test_choice_question_needs_two_options() {
        let now = Utc::now().fixed_offset();
        let input = CreateSurveyInput {
            title: "t".to_string(),
            description: String::new(),
            is_anonymous: false,
            deadline: now + Duration::days(7),
            estimated_time: None,
            questions: vec![CreateQuestionInput {
                kind: QuestionKind::Single,
                content: "q".to_string(),
                options: vec![CreateOptionInput {
                    content: "only one".to_string(),
                    image_url: None,
                }],
            }],
            constraints: vec![],
        };
        assert!(validate_survey_input(&input, now).is_err());
    }

    #[test]
    fn test_all_constraint_exclusive() {
        let constraints = vec![
            CreateConstraintInput {
                kind: TargetKind::All,
                value: None,
            },
            CreateConstraintInput {
                kind: TargetKind::Department,
                value: Some("EECS".to_string()),
            },
        ];
        assert!(validate_constraints(&constraints).is_err());
        assert!(validate_constraints(&constraints[..1]).is_ok());
    }

    #[test]
    fn test_non_all_constraint_needs_value() {
        let constraints = vec![CreateConstraintInput {
            kind: TargetKind::Department,
            value: None,
        }];
        assert!(validate_constraints(&constraints).is_err());
    }

    #[test]
    fn test_pagination_clamping() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(7)), 7);
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), 200);
    }

    #[tokio::test]
    async fn test_anonymous_results_mask_responder_identity() {
        // No user rows are staged: the anonymous path must never look
        // the responder up.
        let service = service_over(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let answers = service
            .render_subjective(
                &survey_model(true),
                vec![subjective_row("학식이 최고", "uuid-9")],
            )
            .await
            .unwrap();

        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].text, "학식이 최고");
        assert_eq!(answers[0].responder_nickname.as_deref(), Some("익명"));
        assert!(answers[0].responder_uuid.is_none());
    }

    #[tokio::test]
    async fn test_named_results_carry_responder_identity() {
        let responder = user::Model {
            uuid: "uuid-9".to_string(),
            nickname: Some("nine".to_string()),
            ..voter()
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![responder]])
            .into_connection();
        let service = service_over(db);

        let answers = service
            .render_subjective(
                &survey_model(false),
                vec![subjective_row("학식이 최고", "uuid-9")],
            )
            .await
            .unwrap();

        assert_eq!(answers[0].responder_nickname.as_deref(), Some("nine"));
        assert_eq!(answers[0].responder_uuid.as_deref(), Some("uuid-9"));
    }
}

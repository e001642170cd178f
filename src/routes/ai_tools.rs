use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::ai_dto::{
        AnalyzeCvPayload, CvAnalysis, EmailDraft, GenerateEmailPayload, InterviewQuestionsPayload,
        JobDescription, JobDescriptionPayload, MatchJobsPayload,
    },
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/ai-tools/analyze-cv",
    request_body = AnalyzeCvPayload,
    responses(
        (status = 200, description = "Skills, education and experience pulled from the CV text", body = Json<CvAnalysis>),
        (status = 422, description = "Empty CV text")
    )
)]
#[axum::debug_handler]
pub async fn analyze_cv(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeCvPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    Ok(Json(state.ai_service.analyze_cv(&payload.cv_text).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/ai-tools/match-jobs",
    request_body = MatchJobsPayload,
    responses(
        (status = 200, description = "Open jobs scoring at least 30, best first")
    )
)]
#[axum::debug_handler]
pub async fn match_jobs(
    State(state): State<AppState>,
    Json(payload): Json<MatchJobsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let matches = state
        .ai_service
        .match_jobs(&payload.skills, payload.limit)
        .await?;
    Ok(Json(matches))
}

#[utoipa::path(
    post,
    path = "/api/v1/ai-tools/generate-email",
    request_body = GenerateEmailPayload,
    responses(
        (status = 200, description = "Rendered subject and body", body = Json<EmailDraft>),
        (status = 404, description = "Unknown template")
    )
)]
#[axum::debug_handler]
pub async fn generate_email(
    State(state): State<AppState>,
    Json(payload): Json<GenerateEmailPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let draft = state
        .ai_service
        .generate_email(&payload.template_id, &payload.context)
        .await?;
    Ok(Json(draft))
}

#[axum::debug_handler]
pub async fn email_templates(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "templates": state.ai_service.email_templates() }))
}

#[axum::debug_handler]
pub async fn interview_questions(
    State(state): State<AppState>,
    Json(payload): Json<InterviewQuestionsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let questions = state.ai_service.interview_questions(&payload).await?;
    Ok(Json(json!({ "questions": questions })))
}

#[utoipa::path(
    post,
    path = "/api/v1/ai-tools/generate-job-description",
    request_body = JobDescriptionPayload,
    responses(
        (status = 200, description = "Structured description with the full text", body = Json<JobDescription>)
    )
)]
#[axum::debug_handler]
pub async fn job_description(
    State(state): State<AppState>,
    Json(payload): Json<JobDescriptionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    Ok(Json(state.ai_service.job_description(&payload).await?))
}

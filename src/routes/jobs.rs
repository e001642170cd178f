use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{
        CloseJobPayload, CreateJobPayload, JobDetails, JobListQuery, JobSkillsPayload, JobStats,
        SimilarQuery, UpdateJobPayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::job::{Job, JobStatus},
    AppState,
};

const DEFAULT_SIMILAR_LIMIT: i64 = 5;

#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    params(
        ("q" = Option<String>, Query, description = "Free text over title and description"),
        ("skills" = Option<String>, Query, description = "Comma separated skill names"),
        ("status" = Option<String>, Query, description = "Open (default), Closed or Filled"),
        ("contract_type" = Option<String>, Query, description = "Contract type"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("page_size" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Job page"),
        (status = 400, description = "Unknown or non-public status")
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let mut filter = query.filter()?;
    match filter.status {
        None => filter.status = Some(JobStatus::Open),
        Some(JobStatus::Draft | JobStatus::Cancelled) => {
            return Err(Error::BadRequest(
                "Draft and cancelled jobs are not listed publicly".to_string(),
            ))
        }
        Some(_) => {}
    }
    let page = state
        .job_service
        .search(&filter, query.page_request())
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job with company name and skills", body = Json<JobDetails>),
        (status = 404, description = "Job not found or not published")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.find(id).await?;
    if matches!(job.status, JobStatus::Draft | JobStatus::Cancelled) {
        return Err(Error::NotFound("Job not found".to_string()));
    }
    let details = state.job_service.view(id).await?;
    Ok(Json(details))
}

#[axum::debug_handler]
pub async fn similar_jobs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SimilarQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT).clamp(1, 20);
    let jobs = state.job_service.similar(id, limit).await?;
    Ok(Json(jobs))
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    request_body = CreateJobPayload,
    responses(
        (status = 201, description = "Job created as draft, or open when auto_publish is set", body = Json<JobDetails>),
        (status = 403, description = "Caller cannot post for this company"),
        (status = 422, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_service.create(&claims, payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    put,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    request_body = UpdateJobPayload,
    responses(
        (status = 200, description = "Job updated", body = Json<Job>),
        (status = 400, description = "Job is cancelled or filled"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_service.update(&claims, id, payload).await?;
    Ok(Json(job))
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/publish",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job is open", body = Json<Job>),
        (status = 400, description = "Only drafts can be published")
    )
)]
#[axum::debug_handler]
pub async fn publish_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.publish(&claims, id).await?;
    Ok(Json(job))
}

#[axum::debug_handler]
pub async fn close_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_service.close(&claims, id, payload.reason).await?;
    Ok(Json(job))
}

#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job cancelled", body = Json<Job>),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.delete(&claims, id).await?;
    Ok(Json(job))
}

#[axum::debug_handler]
pub async fn replace_job_skills(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobSkillsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let skills = state
        .job_service
        .replace_skills(&claims, id, payload.skills)
        .await?;
    Ok(Json(skills))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/stats",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Funnel counts and conversion rates", body = Json<JobStats>),
        (status = 403, description = "Caller cannot manage this job")
    )
)]
#[axum::debug_handler]
pub async fn job_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let stats = state.job_service.stats(&claims, id).await?;
    Ok(Json(stats))
}

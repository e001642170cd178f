use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::application_dto::{
        AddNotePayload, ApplicationDetails, ApplicationListQuery, ApplicationStats,
        AssignConsultantPayload, BulkStatusPayload, BulkStatusResponse, CreateApplicationPayload,
        DuplicateApplicationResponse, MakeOfferPayload, ScheduleInterviewPayload,
        StatusChangePayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::{application::Application, user::Role},
    services::application_store::NewApplication,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/applications",
    request_body = CreateApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = Json<Application>),
        (status = 400, description = "Job not open, or already applied (body carries the existing application)", body = Json<DuplicateApplicationResponse>),
        (status = 404, description = "Job or candidate profile not found")
    )
)]
#[axum::debug_handler]
pub async fn create_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<Response> {
    payload.validate()?;
    claims.require_any(&[Role::Candidate])?;
    let user_id = claims.user_id()?;
    let candidate_id = state.candidate_service.profile_id_for_user(user_id).await?;

    let draft = NewApplication {
        cover_letter: payload.cover_letter,
        cv_url: payload.cv_url,
        source: payload.source,
    };
    let submission = state
        .workflow
        .create(payload.job_id, candidate_id, draft, user_id)
        .await?;

    if submission.created {
        Ok((StatusCode::CREATED, Json(submission.application)).into_response())
    } else {
        let body = DuplicateApplicationResponse {
            detail: "You have already applied to this job".to_string(),
            application: submission.application,
        };
        Ok((StatusCode::BAD_REQUEST, Json(body)).into_response())
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/applications",
    params(
        ("q" = Option<String>, Query, description = "Candidate name, email or job title"),
        ("status" = Option<String>, Query, description = "Comma separated statuses"),
        ("job_id" = Option<Uuid>, Query, description = "Job"),
        ("company_id" = Option<Uuid>, Query, description = "Company"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("page_size" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Applications visible to the caller")
    )
)]
#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let page = state
        .application_service
        .search(&claims, query.filter()?, query.page_request())
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application with job, candidate and history", body = Json<ApplicationDetails>),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let details = state.application_service.details(&claims, id).await?;
    Ok(Json(details))
}

#[axum::debug_handler]
pub async fn application_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let history = state.application_service.history(&claims, id).await?;
    Ok(Json(history))
}

#[utoipa::path(
    put,
    path = "/api/v1/applications/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = StatusChangePayload,
    responses(
        (status = 200, description = "Status changed", body = Json<Application>),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "expected_version is stale")
    )
)]
#[axum::debug_handler]
pub async fn change_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChangePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.application_service.ensure_can_manage(&claims, id).await?;
    let application = state
        .workflow
        .change_status(id, payload, claims.user_id()?)
        .await?;
    Ok(Json(application))
}

#[utoipa::path(
    post,
    path = "/api/v1/applications/{id}/interview",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = ScheduleInterviewPayload,
    responses(
        (status = 200, description = "Interview scheduled", body = Json<Application>),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.application_service.ensure_can_manage(&claims, id).await?;
    let application = state
        .workflow
        .schedule_interview(id, payload, claims.user_id()?)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
    Ok(Json(application))
}

#[utoipa::path(
    post,
    path = "/api/v1/applications/{id}/offer",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = MakeOfferPayload,
    responses(
        (status = 200, description = "Offer recorded", body = Json<Application>),
        (status = 400, description = "Invalid offer or transition"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn make_offer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MakeOfferPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.application_service.ensure_can_manage(&claims, id).await?;
    let application = state
        .workflow
        .make_offer(id, payload, claims.user_id()?)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
    Ok(Json(application))
}

#[axum::debug_handler]
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let notes = state.application_service.notes(&claims, id).await?;
    Ok(Json(notes))
}

#[axum::debug_handler]
pub async fn add_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddNotePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let note = state
        .application_service
        .add_note(&claims, id, &payload.note_text)
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[axum::debug_handler]
pub async fn assign_consultant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignConsultantPayload>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .assign_consultant(id, payload.consultant_id)
        .await?;
    Ok(Json(application))
}

#[utoipa::path(
    post,
    path = "/api/v1/applications/bulk-status",
    request_body = BulkStatusPayload,
    responses(
        (status = 200, description = "Per-application outcome", body = Json<BulkStatusResponse>),
        (status = 403, description = "Staff only")
    )
)]
#[axum::debug_handler]
pub async fn bulk_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BulkStatusPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let outcome = state
        .workflow
        .bulk_change_status(payload, claims.user_id()?)
        .await;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/applications/stats",
    responses(
        (status = 200, description = "Counts over the applications visible to the caller", body = Json<ApplicationStats>)
    )
)]
#[axum::debug_handler]
pub async fn application_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.application_service.stats(&claims).await?))
}

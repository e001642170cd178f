use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        team_dto::{
            AssignCandidatePayload, ConsultantListQuery, CreateConsultantPayload,
            UpdateConsultantPayload,
        },
        MessageResponse,
    },
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn list_consultants(
    State(state): State<AppState>,
    Query(query): Query<ConsultantListQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.consultant_service.list(&query).await?))
}

#[axum::debug_handler]
pub async fn get_consultant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.consultant_service.get(id).await?))
}

#[axum::debug_handler]
pub async fn get_consultant_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.consultant_service.by_user(user_id).await?))
}

#[axum::debug_handler]
pub async fn create_consultant(
    State(state): State<AppState>,
    Json(payload): Json<CreateConsultantPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let profile = state.consultant_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[axum::debug_handler]
pub async fn update_consultant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateConsultantPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    Ok(Json(state.consultant_service.update(id, payload).await?))
}

#[axum::debug_handler]
pub async fn deactivate_consultant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.consultant_service.deactivate(id).await?))
}

#[axum::debug_handler]
pub async fn consultant_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.consultant_service.stats(id).await?))
}

#[axum::debug_handler]
pub async fn consultant_workload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.consultant_service.workload(id).await?))
}

#[axum::debug_handler]
pub async fn assign_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignCandidatePayload>,
) -> Result<impl IntoResponse> {
    state
        .consultant_service
        .assign_candidate(id, payload.candidate_id)
        .await?;
    Ok(Json(MessageResponse::ok("Candidate assigned")))
}

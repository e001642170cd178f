use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::skill_dto::{CreateSkillPayload, SkillListQuery, UpdateSkillPayload},
    error::Result,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/skills",
    params(
        ("q" = Option<String>, Query, description = "Name substring"),
        ("category" = Option<String>, Query, description = "Category"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("page_size" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Skill page")
    )
)]
#[axum::debug_handler]
pub async fn list_skills(
    State(state): State<AppState>,
    Query(query): Query<SkillListQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.skill_service.list(&query).await?))
}

#[axum::debug_handler]
pub async fn get_skill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.skill_service.get(id).await?))
}

#[axum::debug_handler]
pub async fn create_skill(
    State(state): State<AppState>,
    Json(payload): Json<CreateSkillPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let skill = state.skill_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(skill)))
}

#[axum::debug_handler]
pub async fn update_skill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSkillPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    Ok(Json(state.skill_service.update(id, payload).await?))
}

#[axum::debug_handler]
pub async fn delete_skill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.skill_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

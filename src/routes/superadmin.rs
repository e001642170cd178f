use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::admin_dto::{ChangeRolePayload, UserListQuery},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.admin_service.users(&query).await?))
}

#[axum::debug_handler]
pub async fn change_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRolePayload>,
) -> Result<impl IntoResponse> {
    let user = state
        .admin_service
        .change_role(claims.user_id()?, claims.role()?, id, payload.role)
        .await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state
        .admin_service
        .set_active(claims.user_id()?, id, false)
        .await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn reactivate_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state
        .admin_service
        .set_active(claims.user_id()?, id, true)
        .await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn platform_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.admin_service.stats().await?))
}

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::notification_dto::{MarkAllReadResponse, NotificationListQuery, UnreadCountResponse},
    error::Result,
    middleware::auth::Claims,
    models::notification::NotificationPreferences,
    AppState,
};

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse> {
    let page = state
        .notification_service
        .list(claims.user_id()?, query.unread_only, query.page_request())
        .await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let unread = state
        .notification_service
        .unread_count(claims.user_id()?)
        .await?;
    Ok(Json(UnreadCountResponse { unread }))
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let notification = state
        .notification_service
        .mark_read(claims.user_id()?, id)
        .await?;
    Ok(Json(notification))
}

#[axum::debug_handler]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let updated = state
        .notification_service
        .mark_all_read(claims.user_id()?)
        .await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

#[axum::debug_handler]
pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let prefs = state
        .notification_service
        .preferences(claims.user_id()?)
        .await?;
    Ok(Json(prefs))
}

#[axum::debug_handler]
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NotificationPreferences>,
) -> Result<impl IntoResponse> {
    let prefs = state
        .notification_service
        .update_preferences(claims.user_id()?, payload)
        .await?;
    Ok(Json(prefs))
}

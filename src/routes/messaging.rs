use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::messaging_dto::{
        BulkMessagePayload, ConversationListQuery, CreateConversationPayload, EditMessagePayload,
        SendMessagePayload,
    },
    error::Result,
    middleware::auth::Claims,
    utils::pagination::PageParams,
    AppState,
};

#[axum::debug_handler]
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateConversationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let conversation = state
        .messaging_service
        .create_conversation(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

#[axum::debug_handler]
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ConversationListQuery>,
) -> Result<impl IntoResponse> {
    let conversations = state
        .messaging_service
        .conversations(claims.user_id()?, query.include_archived, query.page_request())
        .await?;
    Ok(Json(conversations))
}

#[axum::debug_handler]
pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let conversation = state
        .messaging_service
        .conversation(claims.user_id()?, id)
        .await?;
    Ok(Json(conversation))
}

#[axum::debug_handler]
pub async fn archive_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let conversation = state
        .messaging_service
        .archive(claims.user_id()?, id)
        .await?;
    Ok(Json(conversation))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let message = state
        .messaging_service
        .send(claims.user_id()?, id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let messages = state
        .messaging_service
        .messages(claims.user_id()?, id, params.request())
        .await?;
    Ok(Json(messages))
}

#[axum::debug_handler]
pub async fn edit_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditMessagePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let message = state
        .messaging_service
        .edit(claims.user_id()?, id, &payload.content)
        .await?;
    Ok(Json(message))
}

#[axum::debug_handler]
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .messaging_service
        .delete(claims.user_id()?, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let marked = state
        .messaging_service
        .mark_read(claims.user_id()?, id)
        .await?;
    Ok(Json(json!({ "marked_read": marked })))
}

#[axum::debug_handler]
pub async fn unread_counts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let counts = state
        .messaging_service
        .unread_counts(claims.user_id()?)
        .await?;
    Ok(Json(counts))
}

/// Failures are reported per conversation; the request itself succeeds.
#[axum::debug_handler]
pub async fn bulk_send(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BulkMessagePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let outcome = state
        .messaging_service
        .bulk_send(claims.user_id()?, payload)
        .await;
    Ok(Json(outcome))
}

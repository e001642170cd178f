use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::{
        auth_dto::{AuthResponse, ChangePasswordPayload, LoginPayload, RefreshPayload, RegisterPayload},
        MessageResponse,
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "Account created", body = Json<AuthResponse>),
        (status = 400, description = "Email already registered"),
        (status = 422, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state.auth_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Token pair issued", body = Json<AuthResponse>),
        (status = 401, description = "Wrong credentials or inactive account")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state.auth_service.login(payload).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let tokens = state.auth_service.refresh(&payload.refresh_token).await?;
    Ok(Json(tokens))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.auth_service.get_user(claims.user_id()?).await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .auth_service
        .change_password(claims.user_id()?, payload)
        .await?;
    Ok(Json(MessageResponse::ok("Password updated")))
}

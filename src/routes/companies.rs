use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        company_dto::{
            AddMemberPayload, CompanyListQuery, ContactPayload, CreateCompanyPayload,
            HiringPreferencesPayload, PremiumPayload, UpdateCompanyPayload,
        },
        MessageResponse,
    },
    error::Result,
    middleware::auth::Claims,
    utils::pagination::PageParams,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/companies",
    params(
        ("q" = Option<String>, Query, description = "Name or description substring"),
        ("industry" = Option<String>, Query, description = "Industry"),
        ("has_open_positions" = Option<bool>, Query, description = "Only companies with open jobs"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("page_size" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Company page")
    )
)]
#[axum::debug_handler]
pub async fn list_companies(
    State(state): State<AppState>,
    Query(query): Query<CompanyListQuery>,
) -> Result<impl IntoResponse> {
    let page = state
        .company_service
        .search(&query.filter(), query.page_request())
        .await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.company_service.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/companies",
    request_body = CreateCompanyPayload,
    responses(
        (status = 201, description = "Company created; an employer caller becomes its primary contact"),
        (status = 403, description = "Candidates and consultants cannot create companies")
    )
)]
#[axum::debug_handler]
pub async fn create_company(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCompanyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let company = state.company_service.create(&claims, payload).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

#[axum::debug_handler]
pub async fn update_company(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let company = state.company_service.update(&claims, id, payload).await?;
    Ok(Json(company))
}

#[axum::debug_handler]
pub async fn delete_company(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.company_service.delete(claims.user_id()?, id).await?;
    Ok(Json(MessageResponse::ok("Company deleted")))
}

#[axum::debug_handler]
pub async fn verify_company(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let company = state.company_service.verify(claims.user_id()?, id).await?;
    Ok(Json(company))
}

#[axum::debug_handler]
pub async fn set_premium(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PremiumPayload>,
) -> Result<impl IntoResponse> {
    let company = state
        .company_service
        .set_premium(claims.user_id()?, id, payload.is_premium)
        .await?;
    Ok(Json(company))
}

#[axum::debug_handler]
pub async fn list_members(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.company_service.ensure_can_manage(&claims, id).await?;
    Ok(Json(state.company_service.members(id).await?))
}

#[axum::debug_handler]
pub async fn add_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let member = state.company_service.add_member(&claims, id, payload).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[axum::debug_handler]
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.company_service.ensure_can_manage(&claims, id).await?;
    Ok(Json(state.company_service.contacts(id).await?))
}

#[axum::debug_handler]
pub async fn add_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let contact = state
        .company_service
        .add_contact(&claims, id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

#[axum::debug_handler]
pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, contact_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state
        .company_service
        .delete_contact(&claims, id, contact_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn get_hiring_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.company_service.ensure_can_manage(&claims, id).await?;
    Ok(Json(state.company_service.hiring_preferences(id).await?))
}

#[axum::debug_handler]
pub async fn update_hiring_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HiringPreferencesPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let prefs = state
        .company_service
        .update_hiring_preferences(&claims, id, payload)
        .await?;
    Ok(Json(prefs))
}

#[axum::debug_handler]
pub async fn recruitment_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.company_service.ensure_can_manage(&claims, id).await?;
    Ok(Json(state.company_service.recruitment_history(id).await?))
}

/// Every job of the company, drafts included.
#[axum::debug_handler]
pub async fn company_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    state.company_service.ensure_can_manage(&claims, id).await?;
    let page = state.company_service.jobs(id, params.request()).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/dashboard",
    params(
        ("id" = Uuid, Path, description = "Company ID")
    ),
    responses(
        (status = 200, description = "Job and pipeline counts"),
        (status = 403, description = "Caller does not belong to the company")
    )
)]
#[axum::debug_handler]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.company_service.dashboard(&claims, id).await?))
}

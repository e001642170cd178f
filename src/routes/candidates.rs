use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::candidate_dto::{
        AddCvPayload, CandidateListQuery, CandidateProfilePayload, EducationPayload,
        ExperiencePayload, MatchingJobsQuery, NotificationSettingsPayload, PreferencesPayload,
        RemoveCvQuery, SkillsPayload,
    },
    error::Result,
    middleware::auth::Claims,
    models::user::Role,
    utils::pagination::PageParams,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/candidates/me",
    responses(
        (status = 200, description = "Own profile with every sub-section"),
        (status = 404, description = "No profile yet")
    )
)]
#[axum::debug_handler]
pub async fn get_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let candidate_id = state
        .candidate_service
        .profile_id_for_user(claims.user_id()?)
        .await?;
    let profile = state.candidate_service.full_profile(candidate_id).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/candidates/me",
    request_body = CandidateProfilePayload,
    responses(
        (status = 201, description = "Profile created"),
        (status = 400, description = "Profile already exists"),
        (status = 403, description = "Caller is not a candidate")
    )
)]
#[axum::debug_handler]
pub async fn create_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CandidateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    claims.require_any(&[Role::Candidate])?;
    let profile = state
        .candidate_service
        .create(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CandidateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let profile = state
        .candidate_service
        .update(claims.user_id()?, payload)
        .await?;
    Ok(Json(profile))
}

#[axum::debug_handler]
pub async fn list_my_education(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let candidate_id = state
        .candidate_service
        .profile_id_for_user(claims.user_id()?)
        .await?;
    Ok(Json(state.candidate_service.education(candidate_id).await?))
}

#[axum::debug_handler]
pub async fn add_education(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<EducationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let row = state
        .candidate_service
        .add_education(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[axum::debug_handler]
pub async fn update_education(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EducationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let row = state
        .candidate_service
        .update_education(claims.user_id()?, id, payload)
        .await?;
    Ok(Json(row))
}

#[axum::debug_handler]
pub async fn delete_education(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .candidate_service
        .delete_education(claims.user_id()?, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_my_experience(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let candidate_id = state
        .candidate_service
        .profile_id_for_user(claims.user_id()?)
        .await?;
    Ok(Json(state.candidate_service.experience(candidate_id).await?))
}

#[axum::debug_handler]
pub async fn add_experience(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ExperiencePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let row = state
        .candidate_service
        .add_experience(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[axum::debug_handler]
pub async fn update_experience(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExperiencePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let row = state
        .candidate_service
        .update_experience(claims.user_id()?, id, payload)
        .await?;
    Ok(Json(row))
}

#[axum::debug_handler]
pub async fn delete_experience(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .candidate_service
        .delete_experience(claims.user_id()?, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replaces the whole skill set.
#[axum::debug_handler]
pub async fn replace_skills(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SkillsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let skills = state
        .candidate_service
        .replace_skills(claims.user_id()?, payload.skills)
        .await?;
    Ok(Json(skills))
}

#[axum::debug_handler]
pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let candidate_id = state
        .candidate_service
        .profile_id_for_user(claims.user_id()?)
        .await?;
    Ok(Json(state.candidate_service.preferences(candidate_id).await?))
}

#[axum::debug_handler]
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PreferencesPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let prefs = state
        .candidate_service
        .update_preferences(claims.user_id()?, payload)
        .await?;
    Ok(Json(prefs))
}

#[axum::debug_handler]
pub async fn get_notification_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let candidate_id = state
        .candidate_service
        .profile_id_for_user(claims.user_id()?)
        .await?;
    let settings = state
        .candidate_service
        .notification_settings(candidate_id)
        .await?;
    Ok(Json(settings))
}

#[axum::debug_handler]
pub async fn update_notification_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NotificationSettingsPayload>,
) -> Result<impl IntoResponse> {
    let settings = state
        .candidate_service
        .update_notification_settings(claims.user_id()?, payload)
        .await?;
    Ok(Json(settings))
}

#[utoipa::path(
    post,
    path = "/api/v1/candidates/me/cvs",
    request_body = AddCvPayload,
    responses(
        (status = 201, description = "CV stored; only the newest five are kept"),
        (status = 404, description = "No profile yet")
    )
)]
#[axum::debug_handler]
pub async fn add_cv(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddCvPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let profile = state
        .candidate_service
        .add_cv(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[axum::debug_handler]
pub async fn remove_cv(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<RemoveCvQuery>,
) -> Result<impl IntoResponse> {
    let profile = state
        .candidate_service
        .remove_cv(claims.user_id()?, &query.url)
        .await?;
    Ok(Json(profile))
}

#[axum::debug_handler]
pub async fn completion_percentage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let completion = state.candidate_service.completion(claims.user_id()?).await?;
    Ok(Json(completion))
}

/// Ranks open jobs against the caller's own skills.
#[axum::debug_handler]
pub async fn matching_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MatchingJobsQuery>,
) -> Result<impl IntoResponse> {
    let candidate_id = state
        .candidate_service
        .profile_id_for_user(claims.user_id()?)
        .await?;
    let skills = state.candidate_service.skill_names(candidate_id).await?;
    let matches = state.ai_service.match_jobs(&skills, query.limit).await?;
    Ok(Json(matches))
}

#[axum::debug_handler]
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let page = state
        .application_service
        .for_candidate_user(claims.user_id()?, params.request())
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/candidates",
    params(
        ("q" = Option<String>, Query, description = "Free text over name, position and summary"),
        ("skills" = Option<String>, Query, description = "Comma separated skill names"),
        ("location" = Option<String>, Query, description = "Location substring"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("page_size" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Candidate page"),
        (status = 403, description = "Staff only")
    )
)]
#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidateListQuery>,
) -> Result<impl IntoResponse> {
    let page = state
        .candidate_service
        .search(&query.filter(), query.page_request())
        .await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let profile = state.candidate_service.full_profile(id).await?;
    Ok(Json(profile))
}

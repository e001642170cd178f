pub mod ai_tools;
pub mod applications;
pub mod auth;
pub mod candidates;
pub mod companies;
pub mod health;
pub mod jobs;
pub mod messaging;
pub mod notifications;
pub mod skills;
pub mod superadmin;
pub mod team;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};

use crate::error::Error;
use crate::middleware::auth::{
    require_admin, require_bearer_auth, require_staff, require_superadmin,
};
use crate::AppState;

/// Everything under `/api/v1`. Public routes carry no layer; the rest are grouped
/// by the weakest role that may call them.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let authenticated = || from_fn_with_state(state.tokens.clone(), require_bearer_auth);

    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/:id", get(jobs::get_job))
        .route("/jobs/:id/similar", get(jobs::similar_jobs))
        .route("/companies", get(companies::list_companies))
        .route("/companies/:id", get(companies::get_company))
        .route("/skills", get(skills::list_skills))
        .route("/skills/:id", get(skills::get_skill));

    let signed_in = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        .route(
            "/candidates/me",
            get(candidates::get_my_profile)
                .post(candidates::create_my_profile)
                .put(candidates::update_my_profile),
        )
        .route(
            "/candidates/me/education",
            get(candidates::list_my_education).post(candidates::add_education),
        )
        .route(
            "/candidates/me/education/:id",
            put(candidates::update_education).delete(candidates::delete_education),
        )
        .route(
            "/candidates/me/experience",
            get(candidates::list_my_experience).post(candidates::add_experience),
        )
        .route(
            "/candidates/me/experience/:id",
            put(candidates::update_experience).delete(candidates::delete_experience),
        )
        .route("/candidates/me/skills", put(candidates::replace_skills))
        .route(
            "/candidates/me/preferences",
            get(candidates::get_preferences).put(candidates::update_preferences),
        )
        .route(
            "/candidates/me/notification-settings",
            get(candidates::get_notification_settings)
                .put(candidates::update_notification_settings),
        )
        .route(
            "/candidates/me/cvs",
            post(candidates::add_cv).delete(candidates::remove_cv),
        )
        .route(
            "/candidates/me/completion-percentage",
            get(candidates::completion_percentage),
        )
        .route("/candidates/me/matching-jobs", get(candidates::matching_jobs))
        .route("/candidates/me/applications", get(candidates::my_applications))
        .route("/jobs", post(jobs::create_job))
        .route("/jobs/:id", put(jobs::update_job).delete(jobs::delete_job))
        .route("/jobs/:id/publish", post(jobs::publish_job))
        .route("/jobs/:id/close", post(jobs::close_job))
        .route("/jobs/:id/skills", put(jobs::replace_job_skills))
        .route("/jobs/:id/stats", get(jobs::job_stats))
        .route("/companies", post(companies::create_company))
        .route("/companies/:id", put(companies::update_company))
        .route(
            "/companies/:id/members",
            get(companies::list_members).post(companies::add_member),
        )
        .route(
            "/companies/:id/contacts",
            get(companies::list_contacts).post(companies::add_contact),
        )
        .route(
            "/companies/:id/contacts/:contact_id",
            delete(companies::delete_contact),
        )
        .route(
            "/companies/:id/hiring-preferences",
            get(companies::get_hiring_preferences).put(companies::update_hiring_preferences),
        )
        .route(
            "/companies/:id/recruitment-history",
            get(companies::recruitment_history),
        )
        .route("/companies/:id/jobs", get(companies::company_jobs))
        .route("/companies/:id/dashboard", get(companies::dashboard))
        .route(
            "/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route("/applications/stats", get(applications::application_stats))
        .route("/applications/:id", get(applications::get_application))
        .route(
            "/applications/:id/history",
            get(applications::application_history),
        )
        .route("/applications/:id/status", put(applications::change_status))
        .route(
            "/applications/:id/interview",
            post(applications::schedule_interview),
        )
        .route("/applications/:id/offer", post(applications::make_offer))
        .route(
            "/applications/:id/notes",
            get(applications::list_notes).post(applications::add_note),
        )
        .route(
            "/messaging/conversations",
            get(messaging::list_conversations).post(messaging::create_conversation),
        )
        .route(
            "/messaging/conversations/:id",
            get(messaging::get_conversation),
        )
        .route(
            "/messaging/conversations/:id/archive",
            post(messaging::archive_conversation),
        )
        .route(
            "/messaging/conversations/:id/messages",
            get(messaging::list_messages).post(messaging::send_message),
        )
        .route(
            "/messaging/conversations/:id/read",
            post(messaging::mark_conversation_read),
        )
        .route(
            "/messaging/messages/:id",
            put(messaging::edit_message).delete(messaging::delete_message),
        )
        .route("/messaging/unread", get(messaging::unread_counts))
        .route("/messaging/bulk", post(messaging::bulk_send))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route(
            "/notifications/preferences",
            get(notifications::get_preferences).put(notifications::update_preferences),
        )
        .route("/ai-tools/analyze-cv", post(ai_tools::analyze_cv))
        .route("/ai-tools/match-jobs", post(ai_tools::match_jobs))
        .route("/ai-tools/generate-email", post(ai_tools::generate_email))
        .route("/ai-tools/email-templates", get(ai_tools::email_templates))
        .route(
            "/ai-tools/generate-interview-questions",
            post(ai_tools::interview_questions),
        )
        .route(
            "/ai-tools/generate-job-description",
            post(ai_tools::job_description),
        )
        .route_layer(authenticated());

    let staff = Router::new()
        .route("/candidates", get(candidates::list_candidates))
        .route("/candidates/:id", get(candidates::get_candidate))
        .route("/skills", post(skills::create_skill))
        .route(
            "/skills/:id",
            put(skills::update_skill).delete(skills::delete_skill),
        )
        .route(
            "/applications/:id/assign-consultant",
            put(applications::assign_consultant),
        )
        .route("/applications/bulk-status", post(applications::bulk_status))
        .route(
            "/team/consultants",
            get(team::list_consultants).post(team::create_consultant),
        )
        .route(
            "/team/consultants/by-user/:user_id",
            get(team::get_consultant_by_user),
        )
        .route(
            "/team/consultants/:id",
            get(team::get_consultant).put(team::update_consultant),
        )
        .route(
            "/team/consultants/:id/deactivate",
            post(team::deactivate_consultant),
        )
        .route("/team/consultants/:id/stats", get(team::consultant_stats))
        .route(
            "/team/consultants/:id/workload",
            get(team::consultant_workload),
        )
        .route(
            "/team/consultants/:id/candidates",
            post(team::assign_candidate),
        )
        .route_layer(from_fn(require_staff))
        .route_layer(authenticated());

    let admin = Router::new()
        .route("/companies/:id", delete(companies::delete_company))
        .route("/companies/:id/verify", post(companies::verify_company))
        .route("/companies/:id/premium", put(companies::set_premium))
        .route_layer(from_fn(require_admin))
        .route_layer(authenticated());

    let superadmin = Router::new()
        .route("/superadmin/users", get(superadmin::list_users))
        .route("/superadmin/users/:id/role", put(superadmin::change_role))
        .route(
            "/superadmin/users/:id/deactivate",
            post(superadmin::deactivate_user),
        )
        .route(
            "/superadmin/users/:id/reactivate",
            post(superadmin::reactivate_user),
        )
        .route("/superadmin/stats", get(superadmin::platform_stats))
        .route_layer(from_fn(require_superadmin))
        .route_layer(authenticated());

    public
        .merge(signed_in)
        .merge(staff)
        .merge(admin)
        .merge(superadmin)
}

pub async fn not_found() -> Error {
    Error::NotFound("Route not found".to_string())
}

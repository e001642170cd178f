pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use reqwest::Client;
use sqlx::PgPool;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::config::Config;
use crate::error::Result;
use crate::middleware::{
    cors::cors_layer,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::services::{
    admin_service::AdminService, ai_service::AIService,
    application_service::ApplicationService, application_store::PgWorkflowStore,
    application_workflow::ApplicationWorkflow, auth_service::AuthService,
    candidate_service::CandidateService, company_service::CompanyService,
    consultant_service::ConsultantService, job_service::JobService,
    messaging_service::MessagingService, notification_dispatcher::NotificationDispatcher,
    notification_service::NotificationService, skill_service::SkillService,
};
use crate::utils::token::TokenIssuer;

const REQUEST_BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: TokenIssuer,
    pub auth_service: AuthService,
    pub candidate_service: CandidateService,
    pub company_service: CompanyService,
    pub job_service: JobService,
    pub application_service: ApplicationService,
    pub workflow: Arc<ApplicationWorkflow<PgWorkflowStore>>,
    pub notification_service: Arc<NotificationService>,
    pub messaging_service: MessagingService,
    pub skill_service: SkillService,
    pub consultant_service: ConsultantService,
    pub admin_service: AdminService,
    pub ai_service: AIService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        let tokens = TokenIssuer::new(
            config.secret_key.clone(),
            config.access_token_expire_minutes,
            config.refresh_token_expire_days,
        );
        let dispatcher = NotificationDispatcher::with_pool(pool.clone());
        let notification_service = Arc::new(NotificationService::new(pool.clone(), dispatcher.clone()));
        let workflow = Arc::new(ApplicationWorkflow::new(
            PgWorkflowStore::new(pool.clone()),
            notification_service.clone(),
        ));
        let ai_service = AIService::from_config(
            pool.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            http_client,
        );

        Ok(Self {
            auth_service: AuthService::new(pool.clone(), tokens.clone()),
            candidate_service: CandidateService::new(pool.clone()),
            company_service: CompanyService::new(pool.clone()),
            job_service: JobService::new(pool.clone()),
            application_service: ApplicationService::new(pool.clone()),
            messaging_service: MessagingService::new(pool.clone(), dispatcher),
            skill_service: SkillService::new(pool.clone()),
            consultant_service: ConsultantService::new(pool.clone()),
            admin_service: AdminService::new(pool.clone()),
            workflow,
            notification_service,
            ai_service,
            tokens,
            pool,
        })
    }
}

/// The full application: `/api/v1` behind the rate limiter, health probes, and
/// the shared HTTP layers.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let api = routes::api_routes(&state).layer(axum::middleware::from_fn_with_state(
        RateLimiter::new(config.api_rps),
        rps_middleware,
    ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/health/ready", get(routes::health::readiness))
        .nest("/api/v1", api)
        .fallback(routes::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

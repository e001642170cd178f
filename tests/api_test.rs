use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use uuid::Uuid;

use recruitment_platform::{
    build_router,
    config::Config,
    database::pool::create_lazy_pool,
    models::user::Role,
    utils::token::{TokenIssuer, TokenKind},
    AppState,
};

const SECRET: &str = "api-test-secret";

fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: "postgres://localhost/unused".into(),
        database_max_connections: 1,
        secret_key: SECRET.into(),
        access_token_expire_minutes: 30,
        refresh_token_expire_days: 7,
        openai_api_key: None,
        openai_model: "gpt-4o-mini".into(),
        cors_origins: vec!["http://localhost:3000".into()],
        api_rps: 1000,
        environment: "test".into(),
    }
}

/// Router over a pool that never connects; only routes that stop before the
/// database are exercised here.
fn app() -> Router {
    let config = test_config();
    let pool = create_lazy_pool(&config).expect("lazy pool");
    let state = AppState::new(pool, &config).expect("state");
    build_router(state, &config)
}

fn token(role: Role, kind: TokenKind) -> String {
    TokenIssuer::new(SECRET, 30, 7)
        .issue(Uuid::new_v4(), role, kind)
        .expect("token")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(app(), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let (status, body) = send(app(), get("/api/v1/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Not authenticated");
}

#[tokio::test]
async fn refresh_token_cannot_call_the_api() {
    let refresh = token(Role::Candidate, TokenKind::Refresh);
    let (status, _) = send(app(), get("/api/v1/notifications", Some(&refresh))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let forged = TokenIssuer::new("someone-else", 30, 7)
        .issue(Uuid::new_v4(), Role::Superadmin, TokenKind::Access)
        .expect("token");
    let (status, body) = send(app(), get("/api/v1/superadmin/stats", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Could not validate credentials");
}

#[tokio::test]
async fn candidate_is_kept_out_of_staff_routes() {
    let access = token(Role::Candidate, TokenKind::Access);
    for uri in ["/api/v1/team/consultants", "/api/v1/candidates"] {
        let (status, body) = send(app(), get(uri, Some(&access))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body["detail"], "Not enough permissions");
    }
}

#[tokio::test]
async fn admin_is_kept_out_of_superadmin_routes() {
    let access = token(Role::Admin, TokenKind::Access);
    let (status, _) = send(app(), get("/api/v1/superadmin/users", Some(&access))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_route_is_json_not_found() {
    let (status, body) = send(app(), get("/api/v1/nowhere", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Route not found");
}

#[tokio::test]
async fn public_job_listing_refuses_draft_filter() {
    let (status, body) = send(app(), get("/api/v1/jobs?status=Draft", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap_or_default().contains("not listed publicly"));
}

#[tokio::test]
async fn email_templates_are_served_without_the_database() {
    let access = token(Role::Consultant, TokenKind::Access);
    let (status, body) = send(app(), get("/api/v1/ai-tools/email-templates", Some(&access))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["templates"].as_array().map(|t| !t.is_empty()).unwrap_or(false));
}

#[tokio::test]
async fn invalid_payload_is_unprocessable() {
    let access = token(Role::Consultant, TokenKind::Access);
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/ai-tools/analyze-cv")
        .header(header::AUTHORIZATION, format!("Bearer {}", access))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"cv_text": ""}"#))
        .expect("request");
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

//! Runs against the database in `DATABASE_URL`; skipped when it is unset.

use std::env;

use sqlx::PgPool;
use uuid::Uuid;

use recruitment_platform::{
    config::Config,
    database::pool::{create_pool, run_migrations},
    dto::skill_dto::{CreateSkillPayload, SkillListQuery},
    error::Error,
    services::skill_service::SkillService,
};

async fn database() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").ok()?;
    let config = Config {
        server_address: "127.0.0.1:0".into(),
        database_url,
        database_max_connections: 2,
        secret_key: "search-test".into(),
        access_token_expire_minutes: 30,
        refresh_token_expire_days: 7,
        openai_api_key: None,
        openai_model: "gpt-4o-mini".into(),
        cors_origins: vec![],
        api_rps: 100,
        environment: "test".into(),
    };
    let pool = create_pool(&config).await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    Some(pool)
}

#[tokio::test]
async fn forty_five_rows_make_three_pages_of_twenty() {
    let Some(pool) = database().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let service = SkillService::new(pool);
    let category = format!("paging-{}", Uuid::new_v4());
    for i in 0..45 {
        service
            .create(CreateSkillPayload {
                name: format!("{}-skill-{:02}", category, i),
                category: Some(category.clone()),
                description: None,
            })
            .await
            .expect("seed skill");
    }

    let query = |page| SkillListQuery {
        category: Some(category.clone()),
        page: Some(page),
        page_size: Some(20),
        ..Default::default()
    };
    let first = service.list(&query(1)).await.expect("first page");
    let last = service.list(&query(3)).await.expect("last page");

    assert_eq!(first.total_count, 45);
    assert_eq!(first.page_count, 3);
    assert_eq!(first.items.len(), 20);
    assert_eq!(last.items.len(), 5);
    assert_eq!(last.page, 3);
}

#[tokio::test]
async fn skill_names_are_unique_ignoring_case() {
    let Some(pool) = database().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let service = SkillService::new(pool);
    let name = format!("Rust-{}", Uuid::new_v4());
    service
        .create(CreateSkillPayload {
            name: name.clone(),
            category: None,
            description: None,
        })
        .await
        .expect("first create");

    let err = service
        .create(CreateSkillPayload {
            name: name.to_uppercase(),
            category: None,
            description: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

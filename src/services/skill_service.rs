use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::skill_dto::{CreateSkillPayload, SkillListQuery, UpdateSkillPayload};
use crate::error::{Error, Result};
use crate::models::skill::Skill;
use crate::utils::like_pattern;
use crate::utils::pagination::Page;

#[derive(Clone)]
pub struct SkillService {
    pool: PgPool,
}

fn push_skill_filters(qb: &mut QueryBuilder<'static, Postgres>, query: &SkillListQuery) {
    qb.push(" WHERE TRUE");
    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(like_pattern(q));
    }
    if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        qb.push(" AND LOWER(category) = LOWER(")
            .push_bind(category.trim().to_string())
            .push(")");
    }
}

impl SkillService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &SkillListQuery) -> Result<Page<Skill>> {
        let page = query.page_request();

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM skills");
        push_skill_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut items = QueryBuilder::new("SELECT * FROM skills");
        push_skill_filters(&mut items, query);
        items
            .push(" ORDER BY name LIMIT ")
            .push_bind(page.page_size)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let skills = items.build_query_as::<Skill>().fetch_all(&self.pool).await?;

        Ok(Page::new(skills, total, page))
    }

    pub async fn get(&self, skill_id: Uuid) -> Result<Skill> {
        sqlx::query_as::<_, Skill>("SELECT * FROM skills WHERE id = $1")
            .bind(skill_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Skill not found".to_string()))
    }

    async fn name_taken(&self, name: &str, except: Option<Uuid>) -> Result<bool> {
        let taken = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM skills WHERE LOWER(name) = LOWER($1) AND id IS DISTINCT FROM $2)",
        )
        .bind(name)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    pub async fn create(&self, payload: CreateSkillPayload) -> Result<Skill> {
        let name = payload.name.trim();
        if self.name_taken(name, None).await? {
            return Err(Error::Conflict(format!("Skill '{}' already exists", name)));
        }
        let skill = sqlx::query_as::<_, Skill>(
            "INSERT INTO skills (name, category, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(&payload.category)
        .bind(&payload.description)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(skill_id = %skill.id, name = %skill.name, "skill created");
        Ok(skill)
    }

    pub async fn update(&self, skill_id: Uuid, payload: UpdateSkillPayload) -> Result<Skill> {
        let name = payload.name.as_deref().map(str::trim);
        if let Some(name) = name {
            if self.name_taken(name, Some(skill_id)).await? {
                return Err(Error::Conflict(format!("Skill '{}' already exists", name)));
            }
        }
        sqlx::query_as::<_, Skill>(
            r#"
            UPDATE skills
            SET name = COALESCE($2, name),
                category = COALESCE($3, category),
                description = COALESCE($4, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(skill_id)
        .bind(name)
        .bind(&payload.category)
        .bind(&payload.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Skill not found".to_string()))
    }

    pub async fn delete(&self, skill_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM skills WHERE id = $1")
            .bind(skill_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Skill not found".to_string()));
        }
        Ok(())
    }
}

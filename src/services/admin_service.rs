use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::admin_dto::{PlatformCounts, PlatformStats, RoleCount, UserListQuery};
use crate::error::{Error, Result};
use crate::models::user::{Role, User};
use crate::services::audit_service::{record, AuditEntry};
use crate::utils::like_pattern;
use crate::utils::pagination::Page;

#[derive(Clone)]
pub struct AdminService {
    pool: PgPool,
}

fn push_user_filters(
    qb: &mut QueryBuilder<'static, Postgres>,
    query: &UserListQuery,
    role: Option<Role>,
) {
    qb.push(" WHERE TRUE");
    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(q);
        qb.push(" AND (email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(active) = query.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
}

impl AdminService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn users(&self, query: &UserListQuery) -> Result<Page<User>> {
        let page = query.page_request();
        let role = query
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(|e| Error::BadRequest(e.to_string()))?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, query, role);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut items = QueryBuilder::new("SELECT * FROM users");
        push_user_filters(&mut items, query, role);
        items
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(page.page_size)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let users = items.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(Page::new(users, total, page))
    }

    /// Nobody changes their own role, and only a superadmin grants superadmin.
    pub async fn change_role(
        &self,
        actor_id: Uuid,
        actor_role: Role,
        user_id: Uuid,
        role: Role,
    ) -> Result<User> {
        if actor_id == user_id {
            return Err(Error::BadRequest("Cannot change your own role".to_string()));
        }
        if role == Role::Superadmin && actor_role != Role::Superadmin {
            return Err(Error::Forbidden(
                "Only a superadmin can grant superadmin".to_string(),
            ));
        }
        let mut tx = self.pool.begin().await?;
        let previous: String = sqlx::query_scalar("SELECT role FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .await?;
        record(
            &mut tx,
            AuditEntry {
                actor: Some(actor_id),
                action: "user_role_changed",
                entity_type: "user",
                entity_id: user_id,
                changes: Some(json!({ "from": previous, "to": role.as_str() })),
            },
        )
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    pub async fn set_active(&self, actor_id: Uuid, user_id: Uuid, active: bool) -> Result<User> {
        if actor_id == user_id && !active {
            return Err(Error::BadRequest(
                "Cannot deactivate your own account".to_string(),
            ));
        }
        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        record(
            &mut tx,
            AuditEntry {
                actor: Some(actor_id),
                action: if active { "user_reactivated" } else { "user_deactivated" },
                entity_type: "user",
                entity_id: user_id,
                changes: Some(json!({ "is_active": active })),
            },
        )
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    pub async fn stats(&self) -> Result<PlatformStats> {
        let counts = sqlx::query_as::<_, PlatformCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE is_active) AS active_users,
                (SELECT COUNT(*) FROM companies) AS total_companies,
                (SELECT COUNT(*) FROM companies WHERE is_verified) AS verified_companies,
                (SELECT COUNT(*) FROM jobs WHERE status = 'Open') AS open_jobs,
                (SELECT COUNT(*) FROM jobs) AS total_jobs,
                (SELECT COUNT(*) FROM applications) AS total_applications,
                (SELECT COUNT(*) FROM applications WHERE status = 'Hired') AS hires
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        let users_by_role = sqlx::query_as::<_, RoleCount>(
            "SELECT role, COUNT(*) AS count FROM users GROUP BY role ORDER BY role",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(PlatformStats {
            counts,
            users_by_role,
        })
    }
}

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::team_dto::{
    ConsultantListQuery, ConsultantStats, CreateConsultantPayload, UpdateConsultantPayload,
};
use crate::error::{Error, Result};
use crate::models::consultant::{
    creates_management_cycle, ConsultantProfile, ConsultantStatus, Workload,
};
use crate::utils::pagination::Page;

#[derive(sqlx::FromRow)]
struct LoadCounts {
    active_candidates: i64,
    active_clients: i64,
    active_applications: i64,
    assigned_jobs: i64,
}

#[derive(Clone)]
pub struct ConsultantService {
    pool: PgPool,
}

fn push_consultant_filters(
    qb: &mut QueryBuilder<'static, Postgres>,
    status: Option<ConsultantStatus>,
    department: Option<&str>,
) {
    qb.push(" WHERE TRUE");
    if let Some(status) = status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(department) = department {
        qb.push(" AND LOWER(department) = LOWER(")
            .push_bind(department.to_string())
            .push(")");
    }
}

impl ConsultantService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &ConsultantListQuery) -> Result<Page<ConsultantProfile>> {
        let page = query.page_request();
        let status = query
            .status
            .as_deref()
            .map(str::parse::<ConsultantStatus>)
            .transpose()
            .map_err(|e| Error::BadRequest(e.to_string()))?;
        let department = query.department.as_deref().filter(|d| !d.trim().is_empty());

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM consultant_profiles");
        push_consultant_filters(&mut count, status, department);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut items = QueryBuilder::new("SELECT * FROM consultant_profiles");
        push_consultant_filters(&mut items, status, department);
        items
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(page.page_size)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let rows = items
            .build_query_as::<ConsultantProfile>()
            .fetch_all(&self.pool)
            .await?;
        Ok(Page::new(rows, total, page))
    }

    pub async fn get(&self, consultant_id: Uuid) -> Result<ConsultantProfile> {
        sqlx::query_as::<_, ConsultantProfile>("SELECT * FROM consultant_profiles WHERE id = $1")
            .bind(consultant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Consultant not found".to_string()))
    }

    pub async fn by_user(&self, user_id: Uuid) -> Result<ConsultantProfile> {
        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Consultant profile not found".to_string()))
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<ConsultantProfile>> {
        let row = sqlx::query_as::<_, ConsultantProfile>(
            "SELECT * FROM consultant_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create(&self, payload: CreateConsultantPayload) -> Result<ConsultantProfile> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(payload.user_id)
            .fetch_optional(&self.pool)
            .await?;
        match role.as_deref() {
            None => return Err(Error::NotFound("User not found".to_string())),
            Some("consultant" | "admin" | "superadmin") => {}
            Some(_) => {
                return Err(Error::BadRequest(
                    "Consultant profiles are for staff accounts".to_string(),
                ))
            }
        }
        if self.find_by_user(payload.user_id).await?.is_some() {
            return Err(Error::Conflict(
                "Consultant profile already exists".to_string(),
            ));
        }
        if let Some(manager_id) = payload.manager_id {
            self.get(manager_id).await?;
        }

        let profile = sqlx::query_as::<_, ConsultantProfile>(
            r#"
            INSERT INTO consultant_profiles
                (user_id, employee_id, department, position, years_of_experience, specializations,
                 commission_rate, max_concurrent_assignments, manager_id)
            VALUES ($1, $2, $3, $4, COALESCE($5, 0), $6, COALESCE($7, 0.15), COALESCE($8, 10), $9)
            RETURNING *
            "#,
        )
        .bind(payload.user_id)
        .bind(&payload.employee_id)
        .bind(&payload.department)
        .bind(&payload.position)
        .bind(payload.years_of_experience)
        .bind(&payload.specializations)
        .bind(payload.commission_rate)
        .bind(payload.max_concurrent_assignments)
        .bind(payload.manager_id)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(consultant_id = %profile.id, user_id = %profile.user_id, "consultant profile created");
        Ok(profile)
    }

    pub async fn update(
        &self,
        consultant_id: Uuid,
        payload: UpdateConsultantPayload,
    ) -> Result<ConsultantProfile> {
        let mut tx = self.pool.begin().await?;
        if let Some(manager_id) = payload.manager_id {
            let chain = manager_chain(&mut tx, manager_id).await?;
            if chain.is_empty() {
                return Err(Error::NotFound("Manager not found".to_string()));
            }
            if creates_management_cycle(consultant_id, &chain) {
                return Err(Error::BadRequest(
                    "Manager assignment would create a reporting cycle".to_string(),
                ));
            }
        }

        let profile = sqlx::query_as::<_, ConsultantProfile>(
            r#"
            UPDATE consultant_profiles
            SET employee_id = COALESCE($2, employee_id),
                department = COALESCE($3, department),
                position = COALESCE($4, position),
                status = COALESCE($5, status),
                years_of_experience = COALESCE($6, years_of_experience),
                specializations = COALESCE($7, specializations),
                commission_rate = COALESCE($8, commission_rate),
                max_concurrent_assignments = COALESCE($9, max_concurrent_assignments),
                manager_id = COALESCE($10, manager_id),
                notes = COALESCE($11, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(consultant_id)
        .bind(&payload.employee_id)
        .bind(&payload.department)
        .bind(&payload.position)
        .bind(payload.status.map(|s| s.as_str()))
        .bind(payload.years_of_experience)
        .bind(&payload.specializations)
        .bind(payload.commission_rate)
        .bind(payload.max_concurrent_assignments)
        .bind(payload.manager_id)
        .bind(&payload.notes)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Consultant not found".to_string()))?;
        tx.commit().await?;
        Ok(profile)
    }

    pub async fn deactivate(&self, consultant_id: Uuid) -> Result<ConsultantProfile> {
        let profile = sqlx::query_as::<_, ConsultantProfile>(
            "UPDATE consultant_profiles SET status = 'inactive', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(consultant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Consultant not found".to_string()))?;
        tracing::info!(%consultant_id, "consultant deactivated");
        Ok(profile)
    }

    pub async fn workload(&self, consultant_id: Uuid) -> Result<Workload> {
        let profile = self.get(consultant_id).await?;
        let counts = self.load_counts(consultant_id).await?;
        Ok(Workload::compute(
            counts.active_candidates,
            counts.active_clients,
            profile.max_concurrent_assignments,
        ))
    }

    pub async fn stats(&self, consultant_id: Uuid) -> Result<ConsultantStats> {
        let consultant = self.get(consultant_id).await?;
        let counts = self.load_counts(consultant_id).await?;
        let workload = Workload::compute(
            counts.active_candidates,
            counts.active_clients,
            consultant.max_concurrent_assignments,
        );
        let success_rate = if consultant.total_placements > 0 {
            consultant.successful_placements as f64 / consultant.total_placements as f64 * 100.0
        } else {
            0.0
        };
        Ok(ConsultantStats {
            active_applications: counts.active_applications,
            assigned_candidates: counts.active_candidates,
            assigned_jobs: counts.assigned_jobs,
            success_rate,
            workload,
            consultant,
        })
    }

    async fn load_counts(&self, consultant_id: Uuid) -> Result<LoadCounts> {
        let counts = sqlx::query_as::<_, LoadCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM consultant_candidates WHERE consultant_id = $1) AS active_candidates,
                (SELECT COUNT(DISTINCT company_id) FROM jobs
                 WHERE assigned_consultant_id = $1 AND status = 'Open') AS active_clients,
                (SELECT COUNT(*) FROM applications
                 WHERE consultant_id = $1 AND status NOT IN ('Hired', 'Rejected')) AS active_applications,
                (SELECT COUNT(*) FROM jobs WHERE assigned_consultant_id = $1) AS assigned_jobs
            "#,
        )
        .bind(consultant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Refuses when the consultant is inactive or at capacity.
    pub async fn assign_candidate(&self, consultant_id: Uuid, candidate_id: Uuid) -> Result<()> {
        let consultant = self.get(consultant_id).await?;
        if consultant.status != ConsultantStatus::Active {
            return Err(Error::InvalidState(format!(
                "Consultant is {}",
                consultant.status
            )));
        }
        let workload = self.workload(consultant_id).await?;
        if !workload.can_accept_more {
            return Err(Error::InvalidState(
                "Consultant is at capacity".to_string(),
            ));
        }
        let candidate_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM candidate_profiles WHERE id = $1)")
                .bind(candidate_id)
                .fetch_one(&self.pool)
                .await?;
        if !candidate_exists {
            return Err(Error::NotFound("Candidate not found".to_string()));
        }
        sqlx::query(
            r#"
            INSERT INTO consultant_candidates (consultant_id, candidate_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(consultant_id)
        .bind(candidate_id)
        .execute(&self.pool)
        .await?;
        tracing::info!(%consultant_id, %candidate_id, "candidate assigned to consultant");
        Ok(())
    }
}

/// `manager_id` followed by each of its managers, nearest first. Empty if it does not exist.
async fn manager_chain(conn: &mut PgConnection, manager_id: Uuid) -> Result<Vec<Uuid>> {
    let chain = sqlx::query_scalar(
        r#"
        WITH RECURSIVE chain(id, manager_id, depth) AS (
            SELECT id, manager_id, 0 FROM consultant_profiles WHERE id = $1
            UNION ALL
            SELECT cp.id, cp.manager_id, chain.depth + 1
            FROM consultant_profiles cp
            JOIN chain ON cp.id = chain.manager_id
            WHERE chain.depth < 100
        )
        SELECT id FROM chain ORDER BY depth
        "#,
    )
    .bind(manager_id)
    .fetch_all(conn)
    .await?;
    Ok(chain)
}

use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::dto::job_dto::{
    CreateJobPayload, JobDetails, JobSkillPayload, JobStats, StatusCount, UpdateJobPayload,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::job::{Job, JobListing, JobSkill, JobStatus};
use crate::models::user::Role;
use crate::services::audit_service::{record, AuditEntry};
use crate::services::search::{job_search, JobFilter};
use crate::utils::pagination::{Page, PageRequest};
use crate::utils::time::{days_between, today};

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
}

impl JobService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn search(&self, filter: &JobFilter, page: PageRequest) -> Result<Page<JobListing>> {
        job_search(filter, page).fetch(&self.pool, page).await
    }

    pub async fn find(&self, job_id: Uuid) -> Result<Job> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))
    }

    /// Public read; counts as a view.
    pub async fn view(&self, job_id: Uuid) -> Result<JobDetails> {
        let job = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET view_count = view_count + 1 WHERE id = $1 RETURNING *",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;
        self.details(job).await
    }

    async fn details(&self, job: Job) -> Result<JobDetails> {
        let company_name: String = sqlx::query_scalar("SELECT name FROM companies WHERE id = $1")
            .bind(job.company_id)
            .fetch_one(&self.pool)
            .await?;
        let skills = self.skills(job.id).await?;
        Ok(JobDetails {
            job,
            company_name,
            skills,
        })
    }

    pub async fn skills(&self, job_id: Uuid) -> Result<Vec<JobSkill>> {
        let rows = sqlx::query_as::<_, JobSkill>(
            r#"
            SELECT js.skill_id, s.name, js.is_required, js.proficiency_level
            FROM job_skills js
            JOIN skills s ON s.id = js.skill_id
            WHERE js.job_id = $1
            ORDER BY js.is_required DESC, s.name
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Staff post anywhere; employers need `can_post_jobs` on the company.
    pub async fn ensure_can_post(&self, claims: &Claims, company_id: Uuid) -> Result<()> {
        let role = claims.role()?;
        if role.is_staff() {
            return Ok(());
        }
        if role == Role::Employer {
            let allowed: Option<bool> = sqlx::query_scalar(
                "SELECT can_post_jobs FROM employer_profiles WHERE user_id = $1 AND company_id = $2",
            )
            .bind(claims.user_id()?)
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;
            if allowed == Some(true) {
                return Ok(());
            }
        }
        Err(Error::Forbidden(
            "Not allowed to manage jobs for this company".to_string(),
        ))
    }

    pub async fn create(&self, claims: &Claims, payload: CreateJobPayload) -> Result<JobDetails> {
        self.ensure_can_post(claims, payload.company_id).await?;
        let user_id = claims.user_id()?;
        let (status, posting_date) = if payload.auto_publish {
            (JobStatus::Open, Some(today()))
        } else {
            (JobStatus::Draft, None)
        };

        let mut tx = self.pool.begin().await?;
        let company_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM companies WHERE id = $1)")
                .bind(payload.company_id)
                .fetch_one(&mut *tx)
                .await?;
        if !company_exists {
            return Err(Error::NotFound("Company not found".to_string()));
        }

        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
                (company_id, posted_by, assigned_consultant_id, title, description,
                 responsibilities, requirements, location, contract_type, salary_min, salary_max,
                 remote_option, status, positions_available, posting_date, deadline_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(payload.company_id)
        .bind(user_id)
        .bind(payload.assigned_consultant_id)
        .bind(payload.title.trim())
        .bind(&payload.description)
        .bind(json!(payload.responsibilities))
        .bind(json!(payload.requirements))
        .bind(&payload.location)
        .bind(payload.contract_type.as_str())
        .bind(payload.salary_min)
        .bind(payload.salary_max)
        .bind(payload.remote_option)
        .bind(status.as_str())
        .bind(payload.positions_available.unwrap_or(1))
        .bind(posting_date)
        .bind(payload.deadline_date)
        .fetch_one(&mut *tx)
        .await?;
        write_skills(&mut tx, job.id, &payload.skills).await?;
        tx.commit().await?;

        tracing::info!(job_id = %job.id, company_id = %job.company_id, status = %job.status, "job created");
        self.details(job).await
    }

    pub async fn update(
        &self,
        claims: &Claims,
        job_id: Uuid,
        payload: UpdateJobPayload,
    ) -> Result<Job> {
        let job = self.find(job_id).await?;
        self.ensure_can_post(claims, job.company_id).await?;
        if matches!(job.status, JobStatus::Cancelled | JobStatus::Filled) {
            return Err(Error::InvalidState(format!(
                "Cannot edit a job that is {}",
                job.status
            )));
        }
        let updated = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                responsibilities = COALESCE($4, responsibilities),
                requirements = COALESCE($5, requirements),
                location = COALESCE($6, location),
                contract_type = COALESCE($7, contract_type),
                salary_min = COALESCE($8, salary_min),
                salary_max = COALESCE($9, salary_max),
                remote_option = COALESCE($10, remote_option),
                positions_available = COALESCE($11, positions_available),
                deadline_date = COALESCE($12, deadline_date),
                assigned_consultant_id = COALESCE($13, assigned_consultant_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(payload.title.as_deref().map(str::trim))
        .bind(&payload.description)
        .bind(payload.responsibilities.as_ref().map(|r| json!(r)))
        .bind(payload.requirements.as_ref().map(|r| json!(r)))
        .bind(&payload.location)
        .bind(payload.contract_type.map(|c| c.as_str()))
        .bind(payload.salary_min)
        .bind(payload.salary_max)
        .bind(payload.remote_option)
        .bind(payload.positions_available)
        .bind(payload.deadline_date)
        .bind(payload.assigned_consultant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Draft to Open; stamps the posting date.
    pub async fn publish(&self, claims: &Claims, job_id: Uuid) -> Result<Job> {
        let job = self.find(job_id).await?;
        self.ensure_can_post(claims, job.company_id).await?;
        if job.status != JobStatus::Draft {
            return Err(Error::InvalidState(format!(
                "Only draft jobs can be published; job is {}",
                job.status
            )));
        }
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = 'Open', posting_date = COALESCE(posting_date, $2), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(today())
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(%job_id, "job published");
        Ok(job)
    }

    pub async fn close(&self, claims: &Claims, job_id: Uuid, reason: Option<String>) -> Result<Job> {
        let job = self.find(job_id).await?;
        self.ensure_can_post(claims, job.company_id).await?;
        if !matches!(job.status, JobStatus::Open | JobStatus::Draft) {
            return Err(Error::InvalidState(format!(
                "Cannot close a job that is {}",
                job.status
            )));
        }
        self.retire(claims, job, JobStatus::Closed, "job_closed", reason)
            .await
    }

    /// Jobs are never removed; deleting cancels.
    pub async fn delete(&self, claims: &Claims, job_id: Uuid) -> Result<Job> {
        let job = self.find(job_id).await?;
        self.ensure_can_post(claims, job.company_id).await?;
        if job.status == JobStatus::Cancelled {
            return Err(Error::InvalidState("Job is already cancelled".to_string()));
        }
        self.retire(claims, job, JobStatus::Cancelled, "job_cancelled", None)
            .await
    }

    async fn retire(
        &self,
        claims: &Claims,
        job: Job,
        status: JobStatus,
        action: &'static str,
        reason: Option<String>,
    ) -> Result<Job> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(job.id)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;
        record(
            &mut tx,
            AuditEntry {
                actor: Some(claims.user_id()?),
                action,
                entity_type: "job",
                entity_id: job.id,
                changes: Some(json!({
                    "from": job.status.as_str(),
                    "to": status.as_str(),
                    "reason": reason,
                })),
            },
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn replace_skills(
        &self,
        claims: &Claims,
        job_id: Uuid,
        skills: Vec<JobSkillPayload>,
    ) -> Result<Vec<JobSkill>> {
        let job = self.find(job_id).await?;
        self.ensure_can_post(claims, job.company_id).await?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM job_skills WHERE job_id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;
        write_skills(&mut tx, job_id, &skills).await?;
        tx.commit().await?;
        self.skills(job_id).await
    }

    pub async fn stats(&self, claims: &Claims, job_id: Uuid) -> Result<JobStats> {
        let job = self.find(job_id).await?;
        self.ensure_can_post(claims, job.company_id).await?;
        let by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM applications
            WHERE job_id = $1
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(job_stats(&job, by_status))
    }

    /// Open jobs sharing at least one skill, most overlap first.
    pub async fn similar(&self, job_id: Uuid, limit: i64) -> Result<Vec<JobListing>> {
        self.find(job_id).await?;
        let rows = sqlx::query_as::<_, JobListing>(
            r#"
            SELECT j.*, c.name AS company_name,
                   ARRAY(SELECT s.name FROM job_skills js2 JOIN skills s ON s.id = js2.skill_id
                         WHERE js2.job_id = j.id ORDER BY s.name) AS skills
            FROM jobs j
            JOIN companies c ON c.id = j.company_id
            JOIN (
                SELECT js.job_id, COUNT(*) AS shared
                FROM job_skills js
                WHERE js.skill_id IN (SELECT skill_id FROM job_skills WHERE job_id = $1)
                  AND js.job_id <> $1
                GROUP BY js.job_id
            ) overlap ON overlap.job_id = j.id
            WHERE j.status = 'Open'
            ORDER BY overlap.shared DESC, j.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(job_id)
        .bind(limit.clamp(1, 50))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn write_skills(
    conn: &mut PgConnection,
    job_id: Uuid,
    skills: &[JobSkillPayload],
) -> Result<()> {
    for skill in skills {
        let known: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM skills WHERE id = $1)")
            .bind(skill.skill_id)
            .fetch_one(&mut *conn)
            .await?;
        if !known {
            return Err(Error::BadRequest(format!("Unknown skill {}", skill.skill_id)));
        }
        sqlx::query(
            r#"
            INSERT INTO job_skills (job_id, skill_id, is_required, proficiency_level)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (job_id, skill_id) DO UPDATE
            SET is_required = EXCLUDED.is_required, proficiency_level = EXCLUDED.proficiency_level
            "#,
        )
        .bind(job_id)
        .bind(skill.skill_id)
        .bind(skill.is_required)
        .bind(skill.proficiency_level.map(|p| p.as_str()))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn percent(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10000.0).round() / 100.0
}

fn job_stats(job: &Job, by_status: Vec<StatusCount>) -> JobStats {
    let count_of = |status: &str| {
        by_status
            .iter()
            .find(|row| row.status == status)
            .map(|row| row.count)
            .unwrap_or(0)
    };
    let application_count: i64 = by_status.iter().map(|row| row.count).sum();
    let hired_count = count_of("Hired");
    JobStats {
        job_id: job.id,
        view_count: job.view_count,
        application_count,
        interview_count: count_of("InterviewScheduled"),
        offer_count: count_of("OfferMade"),
        hired_count,
        view_to_application_rate: percent(application_count, job.view_count as i64),
        application_to_hire_rate: percent(hired_count, application_count),
        days_active: job.posting_date.map(|posted| days_between(posted, today())),
        by_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::ContractType;
    use chrono::Utc;

    fn job(view_count: i32) -> Job {
        Job {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            posted_by: None,
            assigned_consultant_id: None,
            title: "Backend Engineer".into(),
            description: "Build services".into(),
            responsibilities: json!([]),
            requirements: json!([]),
            location: None,
            contract_type: ContractType::Permanent,
            salary_min: None,
            salary_max: None,
            remote_option: false,
            status: JobStatus::Open,
            positions_available: 1,
            application_count: 0,
            view_count,
            posting_date: None,
            deadline_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stats_compute_conversion_rates() {
        let rows = vec![
            StatusCount {
                status: "Submitted".into(),
                count: 6,
            },
            StatusCount {
                status: "Hired".into(),
                count: 2,
            },
        ];
        let stats = job_stats(&job(200), rows);
        assert_eq!(stats.application_count, 8);
        assert_eq!(stats.hired_count, 2);
        assert_eq!(stats.view_to_application_rate, 4.0);
        assert_eq!(stats.application_to_hire_rate, 25.0);
        assert_eq!(stats.days_active, None);
    }

    #[test]
    fn rates_are_zero_without_traffic() {
        let stats = job_stats(&job(0), Vec::new());
        assert_eq!(stats.view_to_application_rate, 0.0);
        assert_eq!(stats.application_to_hire_rate, 0.0);
    }
}

//! Transactional storage seam for the application workflow.
//!
//! The workflow only talks to a [`WorkflowTx`]; dropping a transaction without
//! calling `commit` discards every change made through it.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::{Application, ApplicationStatus, StatusHistoryEntry};
use crate::models::job::JobStatus;

/// The slice of a job the workflow reads and locks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub positions_available: i32,
    pub posting_date: Option<NaiveDate>,
    pub posted_by: Option<Uuid>,
    pub assigned_consultant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewApplication {
    pub cover_letter: Option<String>,
    pub cv_url: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub application_id: Uuid,
    pub status: ApplicationStatus,
    pub comment: Option<String>,
    pub changed_by: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledPosition {
    pub company_id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub date_filled: NaiveDate,
    pub time_to_fill: Option<i32>,
    pub consultant_id: Option<Uuid>,
}

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    type Tx: WorkflowTx;

    async fn begin(&self) -> Result<Self::Tx>;
}

#[async_trait]
pub trait WorkflowTx: Send {
    /// Reads the job and holds it until commit.
    async fn lock_job(&mut self, job_id: Uuid) -> Result<Option<JobSnapshot>>;

    async fn find_for_pair(&mut self, candidate_id: Uuid, job_id: Uuid)
        -> Result<Option<Application>>;

    async fn insert_application(
        &mut self,
        candidate_id: Uuid,
        job_id: Uuid,
        draft: &NewApplication,
    ) -> Result<Application>;

    async fn increment_application_count(&mut self, job_id: Uuid) -> Result<()>;

    /// Reads the application and holds it until commit.
    async fn lock_application(&mut self, id: Uuid) -> Result<Option<Application>>;

    /// Persists the mutable fields of `application` and bumps its version.
    async fn save_application(&mut self, application: &Application) -> Result<Application>;

    async fn append_history(&mut self, record: HistoryRecord) -> Result<StatusHistoryEntry>;

    async fn count_hired(&mut self, job_id: Uuid) -> Result<i64>;

    async fn set_job_status(&mut self, job_id: Uuid, status: JobStatus) -> Result<()>;

    /// Credits a placement, plus commission on `offer_salary`, to the consultant.
    async fn record_placement(
        &mut self,
        consultant_id: Uuid,
        offer_salary: Option<Decimal>,
    ) -> Result<()>;

    async fn record_filled_position(&mut self, position: FilledPosition) -> Result<()>;

    async fn candidate_user(&mut self, candidate_id: Uuid) -> Result<Option<Uuid>>;

    async fn commit(self) -> Result<()>;
}

#[derive(Clone)]
pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    type Tx = PgWorkflowTx;

    async fn begin(&self) -> Result<PgWorkflowTx> {
        let tx = self.pool.begin().await?;
        Ok(PgWorkflowTx { tx })
    }
}

pub struct PgWorkflowTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl WorkflowTx for PgWorkflowTx {
    async fn lock_job(&mut self, job_id: Uuid) -> Result<Option<JobSnapshot>> {
        let job = sqlx::query_as::<_, JobSnapshot>(
            r#"
            SELECT id, company_id, title, status, positions_available, posting_date,
                   posted_by, assigned_consultant_id
            FROM jobs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(job_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(job)
    }

    async fn find_for_pair(
        &mut self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<Application>> {
        let existing = sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE candidate_id = $1 AND job_id = $2",
        )
        .bind(candidate_id)
        .bind(job_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(existing)
    }

    async fn insert_application(
        &mut self,
        candidate_id: Uuid,
        job_id: Uuid,
        draft: &NewApplication,
    ) -> Result<Application> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (candidate_id, job_id, status, cover_letter, cv_url, source)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .bind(ApplicationStatus::Submitted.as_str())
        .bind(&draft.cover_letter)
        .bind(&draft.cv_url)
        .bind(&draft.source)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(application)
    }

    async fn increment_application_count(&mut self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET application_count = application_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_application(&mut self, id: Uuid) -> Result<Option<Application>> {
        let application =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(application)
    }

    async fn save_application(&mut self, application: &Application) -> Result<Application> {
        let saved = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET status = $2,
                consultant_id = $3,
                interview_date = $4,
                interview_type = $5,
                interview_location = $6,
                offer_salary = $7,
                offer_currency = $8,
                offer_date = $9,
                offer_expiry_date = $10,
                rejection_reason = $11,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(application.id)
        .bind(application.status.as_str())
        .bind(application.consultant_id)
        .bind(application.interview_date)
        .bind(&application.interview_type)
        .bind(&application.interview_location)
        .bind(application.offer_salary)
        .bind(&application.offer_currency)
        .bind(application.offer_date)
        .bind(application.offer_expiry_date)
        .bind(&application.rejection_reason)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(saved)
    }

    async fn append_history(&mut self, record: HistoryRecord) -> Result<StatusHistoryEntry> {
        let entry = sqlx::query_as::<_, StatusHistoryEntry>(
            r#"
            INSERT INTO application_status_history (application_id, status, comment, changed_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(record.application_id)
        .bind(record.status.as_str())
        .bind(record.comment)
        .bind(record.changed_by)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(entry)
    }

    async fn count_hired(&mut self, job_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM applications WHERE job_id = $1 AND status = $2",
        )
        .bind(job_id)
        .bind(ApplicationStatus::Hired.as_str())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn set_job_status(&mut self, job_id: Uuid, status: JobStatus) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(job_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn record_placement(
        &mut self,
        consultant_id: Uuid,
        offer_salary: Option<Decimal>,
    ) -> Result<()> {
        let salary = offer_salary.unwrap_or(Decimal::ZERO);
        sqlx::query(
            r#"
            UPDATE consultant_profiles
            SET total_placements = total_placements + 1,
                successful_placements = successful_placements + 1,
                this_month_placements = this_month_placements + 1,
                total_revenue_generated = total_revenue_generated + $2 * commission_rate,
                this_quarter_revenue = this_quarter_revenue + $2 * commission_rate,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(consultant_id)
        .bind(salary)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn record_filled_position(&mut self, position: FilledPosition) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recruitment_history
                (company_id, job_id, job_title, date_filled, time_to_fill, consultant_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(position.company_id)
        .bind(position.job_id)
        .bind(position.job_title)
        .bind(position.date_filled)
        .bind(position.time_to_fill)
        .bind(position.consultant_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn candidate_user(&mut self, candidate_id: Uuid) -> Result<Option<Uuid>> {
        let user_id: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM candidate_profiles WHERE id = $1")
                .bind(candidate_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(user_id)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

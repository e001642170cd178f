use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::company_dto::{
    AddMemberPayload, CompanyDashboard, ContactPayload, CreateCompanyPayload,
    HiringPreferencesPayload, UpdateCompanyPayload,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::company::{
    Company, CompanyContact, CompanyListing, EmployerProfile, HiringPreferences,
    RecruitmentHistory, TeamMember,
};
use crate::models::job::JobListing;
use crate::models::user::Role;
use crate::services::audit_service::{record, AuditEntry};
use crate::services::search::{company_search, job_search, CompanyFilter, JobFilter};
use crate::utils::pagination::{Page, PageRequest};

#[derive(sqlx::FromRow)]
struct DashboardCounts {
    active_jobs: i64,
    total_jobs: i64,
    active_applications: i64,
    scheduled_interviews: i64,
    pending_offers: i64,
    total_hires: i64,
}

#[derive(Clone)]
pub struct CompanyService {
    pool: PgPool,
}

impl CompanyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn search(
        &self,
        filter: &CompanyFilter,
        page: PageRequest,
    ) -> Result<Page<CompanyListing>> {
        company_search(filter, page).fetch(&self.pool, page).await
    }

    pub async fn get(&self, company_id: Uuid) -> Result<Company> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Company not found".to_string()))
    }

    pub async fn membership(&self, user_id: Uuid, company_id: Uuid) -> Result<Option<EmployerProfile>> {
        let row = sqlx::query_as::<_, EmployerProfile>(
            "SELECT * FROM employer_profiles WHERE user_id = $1 AND company_id = $2",
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Staff manage every company; employers only their own.
    pub async fn ensure_can_manage(&self, claims: &Claims, company_id: Uuid) -> Result<()> {
        let role = claims.role()?;
        if role.is_staff() {
            return Ok(());
        }
        if role == Role::Employer
            && self
                .membership(claims.user_id()?, company_id)
                .await?
                .is_some()
        {
            return Ok(());
        }
        Err(Error::Forbidden(
            "Not a member of this company".to_string(),
        ))
    }

    /// The creating employer becomes the primary contact.
    pub async fn create(&self, claims: &Claims, payload: CreateCompanyPayload) -> Result<Company> {
        let role = claims.require_any(&[Role::Employer, Role::Admin, Role::Superadmin])?;
        let user_id = claims.user_id()?;

        let mut tx = self.pool.begin().await?;
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, industry, size, location, description, website, logo_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(payload.name.trim())
        .bind(&payload.industry)
        .bind(payload.size.map(|s| s.as_str()))
        .bind(&payload.location)
        .bind(&payload.description)
        .bind(&payload.website)
        .bind(&payload.logo_url)
        .fetch_one(&mut *tx)
        .await?;

        if role == Role::Employer {
            sqlx::query(
                r#"
                INSERT INTO employer_profiles (user_id, company_id, is_primary_contact, can_post_jobs)
                VALUES ($1, $2, TRUE, TRUE)
                "#,
            )
            .bind(user_id)
            .bind(company.id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(company_id = %company.id, %user_id, "company created");
        Ok(company)
    }

    pub async fn update(
        &self,
        claims: &Claims,
        company_id: Uuid,
        payload: UpdateCompanyPayload,
    ) -> Result<Company> {
        self.ensure_can_manage(claims, company_id).await?;
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name),
                industry = COALESCE($3, industry),
                size = COALESCE($4, size),
                location = COALESCE($5, location),
                description = COALESCE($6, description),
                website = COALESCE($7, website),
                logo_url = COALESCE($8, logo_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(payload.name.as_deref().map(str::trim))
        .bind(&payload.industry)
        .bind(payload.size.map(|s| s.as_str()))
        .bind(&payload.location)
        .bind(&payload.description)
        .bind(&payload.website)
        .bind(&payload.logo_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Company not found".to_string()))
    }

    pub async fn delete(&self, actor: Uuid, company_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(company_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Company not found".to_string()));
        }
        record(
            &mut tx,
            AuditEntry {
                actor: Some(actor),
                action: "company_deleted",
                entity_type: "company",
                entity_id: company_id,
                changes: None,
            },
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn verify(&self, actor: Uuid, company_id: Uuid) -> Result<Company> {
        self.set_flag(actor, company_id, "is_verified", true, "company_verified")
            .await
    }

    pub async fn set_premium(&self, actor: Uuid, company_id: Uuid, premium: bool) -> Result<Company> {
        self.set_flag(actor, company_id, "is_premium", premium, "company_premium_changed")
            .await
    }

    async fn set_flag(
        &self,
        actor: Uuid,
        company_id: Uuid,
        column: &'static str,
        value: bool,
        action: &'static str,
    ) -> Result<Company> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "UPDATE companies SET {column} = $2, updated_at = NOW() WHERE id = $1 RETURNING *"
        );
        let company = sqlx::query_as::<_, Company>(&sql)
            .bind(company_id)
            .bind(value)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Company not found".to_string()))?;
        record(
            &mut tx,
            AuditEntry {
                actor: Some(actor),
                action,
                entity_type: "company",
                entity_id: company_id,
                changes: Some(json!({ column: value })),
            },
        )
        .await?;
        tx.commit().await?;
        Ok(company)
    }

    // Team members

    pub async fn members(&self, company_id: Uuid) -> Result<Vec<TeamMember>> {
        self.get(company_id).await?;
        let rows = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT ep.id, ep.user_id, u.first_name, u.last_name, u.email, ep.title,
                   ep.is_primary_contact, ep.can_post_jobs
            FROM employer_profiles ep
            JOIN users u ON u.id = ep.user_id
            WHERE ep.company_id = $1
            ORDER BY ep.is_primary_contact DESC, u.last_name
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn add_member(
        &self,
        claims: &Claims,
        company_id: Uuid,
        payload: AddMemberPayload,
    ) -> Result<EmployerProfile> {
        self.ensure_can_manage(claims, company_id).await?;
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(payload.user_id)
            .fetch_optional(&self.pool)
            .await?;
        match role.as_deref() {
            None => return Err(Error::NotFound("User not found".to_string())),
            Some("employer") => {}
            Some(_) => {
                return Err(Error::BadRequest(
                    "Only employer accounts can join a company".to_string(),
                ))
            }
        }
        if self.membership(payload.user_id, company_id).await?.is_some() {
            return Err(Error::Conflict("User is already a member".to_string()));
        }
        let member = sqlx::query_as::<_, EmployerProfile>(
            r#"
            INSERT INTO employer_profiles (user_id, company_id, title, is_primary_contact, can_post_jobs)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(payload.user_id)
        .bind(company_id)
        .bind(&payload.title)
        .bind(payload.is_primary_contact)
        .bind(payload.can_post_jobs)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }

    // Contacts

    pub async fn contacts(&self, company_id: Uuid) -> Result<Vec<CompanyContact>> {
        let rows = sqlx::query_as::<_, CompanyContact>(
            "SELECT * FROM company_contacts WHERE company_id = $1 ORDER BY is_primary DESC, name",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn add_contact(
        &self,
        claims: &Claims,
        company_id: Uuid,
        payload: ContactPayload,
    ) -> Result<CompanyContact> {
        self.ensure_can_manage(claims, company_id).await?;
        self.get(company_id).await?;
        let row = sqlx::query_as::<_, CompanyContact>(
            r#"
            INSERT INTO company_contacts (company_id, name, title, email, phone, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(&payload.name)
        .bind(&payload.title)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(payload.is_primary)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_contact(
        &self,
        claims: &Claims,
        company_id: Uuid,
        contact_id: Uuid,
    ) -> Result<()> {
        self.ensure_can_manage(claims, company_id).await?;
        let result = sqlx::query("DELETE FROM company_contacts WHERE id = $1 AND company_id = $2")
            .bind(contact_id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Contact not found".to_string()));
        }
        Ok(())
    }

    // Hiring preferences and history

    pub async fn hiring_preferences(&self, company_id: Uuid) -> Result<Option<HiringPreferences>> {
        let row = sqlx::query_as::<_, HiringPreferences>(
            "SELECT * FROM company_hiring_preferences WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_hiring_preferences(
        &self,
        claims: &Claims,
        company_id: Uuid,
        payload: HiringPreferencesPayload,
    ) -> Result<HiringPreferences> {
        self.ensure_can_manage(claims, company_id).await?;
        self.get(company_id).await?;
        let row = sqlx::query_as::<_, HiringPreferences>(
            r#"
            INSERT INTO company_hiring_preferences
                (company_id, preferred_experience_years, required_education, culture_values, interview_process)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (company_id) DO UPDATE
            SET preferred_experience_years = EXCLUDED.preferred_experience_years,
                required_education = EXCLUDED.required_education,
                culture_values = EXCLUDED.culture_values,
                interview_process = EXCLUDED.interview_process,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(payload.preferred_experience_years)
        .bind(&payload.required_education)
        .bind(&payload.culture_values)
        .bind(&payload.interview_process)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn recruitment_history(&self, company_id: Uuid) -> Result<Vec<RecruitmentHistory>> {
        let rows = sqlx::query_as::<_, RecruitmentHistory>(
            "SELECT * FROM recruitment_history WHERE company_id = $1 ORDER BY date_filled DESC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn jobs(&self, company_id: Uuid, page: PageRequest) -> Result<Page<JobListing>> {
        let filter = JobFilter {
            company_id: Some(company_id),
            ..Default::default()
        };
        job_search(&filter, page).fetch(&self.pool, page).await
    }

    pub async fn dashboard(&self, claims: &Claims, company_id: Uuid) -> Result<CompanyDashboard> {
        self.ensure_can_manage(claims, company_id).await?;
        let company = self.get(company_id).await?;
        let counts = sqlx::query_as::<_, DashboardCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM jobs WHERE company_id = $1 AND status = 'Open') AS active_jobs,
                (SELECT COUNT(*) FROM jobs WHERE company_id = $1) AS total_jobs,
                COUNT(*) FILTER (WHERE a.status NOT IN ('Hired', 'Rejected')) AS active_applications,
                COUNT(*) FILTER (WHERE a.status = 'InterviewScheduled') AS scheduled_interviews,
                COUNT(*) FILTER (WHERE a.status = 'OfferMade') AS pending_offers,
                COUNT(*) FILTER (WHERE a.status = 'Hired') AS total_hires
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE j.company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CompanyDashboard {
            company,
            active_jobs: counts.active_jobs,
            total_jobs: counts.total_jobs,
            active_applications: counts.active_applications,
            scheduled_interviews: counts.scheduled_interviews,
            pending_offers: counts.pending_offers,
            total_hires: counts.total_hires,
        })
    }
}

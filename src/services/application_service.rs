//! Read side of applications plus the mutations outside the status lifecycle.

use std::collections::BTreeMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::application_dto::{ApplicationDetails, ApplicationPage, ApplicationStats};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::application::{
    Application, ApplicationNote, ApplicationStatus, StatusHistoryEntry,
};
use crate::models::user::Role;
use crate::services::search::{application_search, ApplicationFilter};
use crate::utils::pagination::{Page, PageRequest};

#[derive(sqlx::FromRow)]
struct ApplicationContext {
    job_title: String,
    company_id: Uuid,
    company_name: String,
    candidate_name: String,
    candidate_email: String,
    candidate_user_id: Uuid,
}

#[derive(sqlx::FromRow)]
struct StatusRow {
    status: String,
    count: i64,
}

/// Which applications a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    All,
    Companies(Vec<Uuid>),
    Candidate(Uuid),
    Nothing,
}

impl Visibility {
    pub fn apply(&self, filter: &mut ApplicationFilter) {
        match self {
            Visibility::All => {}
            Visibility::Companies(ids) => filter.company_scope = Some(ids.clone()),
            Visibility::Candidate(id) => filter.candidate_id = Some(*id),
            Visibility::Nothing => filter.company_scope = Some(Vec::new()),
        }
    }
}

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
}

impl ApplicationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn visibility(&self, claims: &Claims) -> Result<Visibility> {
        let user_id = claims.user_id()?;
        match claims.role()? {
            role if role.is_staff() => Ok(Visibility::All),
            Role::Employer => {
                let ids: Vec<Uuid> =
                    sqlx::query_scalar("SELECT company_id FROM employer_profiles WHERE user_id = $1")
                        .bind(user_id)
                        .fetch_all(&self.pool)
                        .await?;
                Ok(Visibility::Companies(ids))
            }
            _ => {
                let profile: Option<Uuid> =
                    sqlx::query_scalar("SELECT id FROM candidate_profiles WHERE user_id = $1")
                        .bind(user_id)
                        .fetch_optional(&self.pool)
                        .await?;
                Ok(profile.map(Visibility::Candidate).unwrap_or(Visibility::Nothing))
            }
        }
    }

    pub async fn search(
        &self,
        claims: &Claims,
        mut filter: ApplicationFilter,
        page: PageRequest,
    ) -> Result<ApplicationPage> {
        self.visibility(claims).await?.apply(&mut filter);
        application_search(&filter, page).fetch(&self.pool, page).await
    }

    pub async fn get(&self, application_id: Uuid) -> Result<Application> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    async fn context(&self, application: &Application) -> Result<ApplicationContext> {
        let ctx = sqlx::query_as::<_, ApplicationContext>(
            r#"
            SELECT j.title AS job_title, j.company_id, c.name AS company_name,
                   (u.first_name || ' ' || u.last_name) AS candidate_name,
                   u.email AS candidate_email, u.id AS candidate_user_id
            FROM jobs j
            JOIN companies c ON c.id = j.company_id
            JOIN candidate_profiles cp ON cp.id = $2
            JOIN users u ON u.id = cp.user_id
            WHERE j.id = $1
            "#,
        )
        .bind(application.job_id)
        .bind(application.candidate_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ctx)
    }

    fn can_see(visibility: &Visibility, company_id: Uuid, candidate_id: Uuid) -> bool {
        match visibility {
            Visibility::All => true,
            Visibility::Companies(ids) => ids.contains(&company_id),
            Visibility::Candidate(id) => *id == candidate_id,
            Visibility::Nothing => false,
        }
    }

    /// Hides existence from callers who may not see the application.
    async fn visible(&self, claims: &Claims, application_id: Uuid) -> Result<(Application, ApplicationContext)> {
        let application = self.get(application_id).await?;
        let ctx = self.context(&application).await?;
        let visibility = self.visibility(claims).await?;
        if !Self::can_see(&visibility, ctx.company_id, application.candidate_id) {
            return Err(Error::NotFound("Application not found".to_string()));
        }
        Ok((application, ctx))
    }

    /// Staff, or an employer of the hiring company, may drive the workflow.
    pub async fn ensure_can_manage(&self, claims: &Claims, application_id: Uuid) -> Result<()> {
        let role = claims.role()?;
        if role.is_staff() {
            return Ok(());
        }
        if role != Role::Employer {
            return Err(Error::Forbidden(
                "Only staff or the hiring company can update applications".to_string(),
            ));
        }
        self.visible(claims, application_id).await.map(|_| ())
    }

    pub async fn details(&self, claims: &Claims, application_id: Uuid) -> Result<ApplicationDetails> {
        let (application, ctx) = self.visible(claims, application_id).await?;
        let history = self.load_history(application_id).await?;
        let notes = if claims.is_staff() {
            self.load_notes(application_id).await?
        } else {
            Vec::new()
        };
        tracing::debug!(%application_id, candidate_user_id = %ctx.candidate_user_id, "application details read");
        Ok(ApplicationDetails {
            application,
            job_title: ctx.job_title,
            company_id: ctx.company_id,
            company_name: ctx.company_name,
            candidate_name: ctx.candidate_name,
            candidate_email: ctx.candidate_email,
            history,
            notes,
        })
    }

    pub async fn history(&self, claims: &Claims, application_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        self.visible(claims, application_id).await?;
        self.load_history(application_id).await
    }

    async fn load_history(&self, application_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        let rows = sqlx::query_as::<_, StatusHistoryEntry>(
            "SELECT * FROM application_status_history WHERE application_id = $1 ORDER BY changed_at, id",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn notes(&self, claims: &Claims, application_id: Uuid) -> Result<Vec<ApplicationNote>> {
        claims.require_staff()?;
        self.get(application_id).await?;
        self.load_notes(application_id).await
    }

    async fn load_notes(&self, application_id: Uuid) -> Result<Vec<ApplicationNote>> {
        let rows = sqlx::query_as::<_, ApplicationNote>(
            "SELECT * FROM application_notes WHERE application_id = $1 ORDER BY created_at",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Notes are written by consultants only.
    pub async fn add_note(
        &self,
        claims: &Claims,
        application_id: Uuid,
        note_text: &str,
    ) -> Result<ApplicationNote> {
        if claims.role()? != Role::Consultant {
            return Err(Error::Forbidden(
                "Only consultants can add notes".to_string(),
            ));
        }
        let consultant_id: Uuid =
            sqlx::query_scalar("SELECT id FROM consultant_profiles WHERE user_id = $1")
                .bind(claims.user_id()?)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::Forbidden("No consultant profile".to_string()))?;
        self.get(application_id).await?;
        let note = sqlx::query_as::<_, ApplicationNote>(
            r#"
            INSERT INTO application_notes (application_id, consultant_id, note_text)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(application_id)
        .bind(consultant_id)
        .bind(note_text.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(note)
    }

    /// `None` unassigns. Bumps the version like any other mutation.
    pub async fn assign_consultant(
        &self,
        application_id: Uuid,
        consultant_id: Option<Uuid>,
    ) -> Result<Application> {
        if let Some(consultant_id) = consultant_id {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM consultant_profiles WHERE id = $1 AND status = 'active')",
            )
            .bind(consultant_id)
            .fetch_one(&self.pool)
            .await?;
            if !exists {
                return Err(Error::NotFound("Active consultant not found".to_string()));
            }
        }
        let application = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET consultant_id = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(application_id)
        .bind(consultant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        tracing::info!(%application_id, consultant_id = ?consultant_id, "application consultant assigned");
        Ok(application)
    }

    pub async fn for_candidate_user(&self, user_id: Uuid, page: PageRequest) -> Result<ApplicationPage> {
        let candidate_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM candidate_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(candidate_id) = candidate_id else {
            return Ok(Page::new(Vec::new(), 0, page));
        };
        let filter = ApplicationFilter {
            candidate_id: Some(candidate_id),
            ..Default::default()
        };
        application_search(&filter, page).fetch(&self.pool, page).await
    }

    pub async fn stats(&self, claims: &Claims) -> Result<ApplicationStats> {
        let (companies, candidate) = match self.visibility(claims).await? {
            Visibility::All => (None, None),
            Visibility::Companies(ids) => (Some(ids), None),
            Visibility::Candidate(id) => (None, Some(id)),
            Visibility::Nothing => return Ok(summarize(Vec::new(), 0)),
        };
        const SCOPE: &str = "FROM applications a JOIN jobs j ON j.id = a.job_id \
             WHERE ($1::uuid[] IS NULL OR j.company_id = ANY($1)) \
               AND ($2::uuid IS NULL OR a.candidate_id = $2)";

        let rows = sqlx::query_as::<_, StatusRow>(&format!(
            "SELECT a.status, COUNT(*) AS count {SCOPE} GROUP BY a.status"
        ))
        .bind(&companies)
        .bind(candidate)
        .fetch_all(&self.pool)
        .await?;
        let interviews_this_month: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) {SCOPE} AND a.interview_date >= date_trunc('month', NOW()) \
               AND a.interview_date < date_trunc('month', NOW()) + INTERVAL '1 month'"
        ))
        .bind(&companies)
        .bind(candidate)
        .fetch_one(&self.pool)
        .await?;

        Ok(summarize(
            rows.into_iter().map(|r| (r.status, r.count)).collect(),
            interviews_this_month,
        ))
    }
}

fn summarize(rows: Vec<(String, i64)>, interviews_this_month: i64) -> ApplicationStats {
    let mut by_status: BTreeMap<String, i64> = ApplicationStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for (status, count) in rows {
        *by_status.entry(status).or_default() += count;
    }
    let total: i64 = by_status.values().sum();
    let active: i64 = by_status
        .iter()
        .filter(|(status, _)| {
            status
                .parse::<ApplicationStatus>()
                .map(|s| s.is_active())
                .unwrap_or(false)
        })
        .map(|(_, count)| *count)
        .sum();
    let hired = by_status
        .get(ApplicationStatus::Hired.as_str())
        .copied()
        .unwrap_or(0);
    let hire_rate = if total > 0 {
        (hired as f64 / total as f64 * 10000.0).round() / 100.0
    } else {
        0.0
    };
    ApplicationStats {
        total,
        active,
        by_status,
        hire_rate,
        interviews_this_month,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_every_status() {
        let stats = summarize(
            vec![
                ("Submitted".into(), 3),
                ("InterviewScheduled".into(), 2),
                ("Hired".into(), 1),
                ("Rejected".into(), 4),
            ],
            2,
        );
        assert_eq!(stats.total, 10);
        assert_eq!(stats.active, 5);
        assert_eq!(stats.by_status.len(), ApplicationStatus::ALL.len());
        assert_eq!(stats.by_status["OfferMade"], 0);
        assert_eq!(stats.hire_rate, 10.0);
    }

    #[test]
    fn visibility_narrows_the_filter() {
        let company = Uuid::new_v4();
        let mut filter = ApplicationFilter::default();
        Visibility::Companies(vec![company]).apply(&mut filter);
        assert_eq!(filter.company_scope, Some(vec![company]));

        let mut filter = ApplicationFilter::default();
        Visibility::Nothing.apply(&mut filter);
        assert_eq!(filter.company_scope, Some(Vec::new()));

        let candidate = Uuid::new_v4();
        assert!(ApplicationService::can_see(
            &Visibility::Candidate(candidate),
            company,
            candidate
        ));
        assert!(!ApplicationService::can_see(
            &Visibility::Companies(vec![]),
            company,
            candidate
        ));
    }
}

//! Candidate profiles and their sub-sections.
//!
//! Every edit that can change a derived field (`profile_completed`,
//! `years_of_experience`) recomputes it in the same transaction.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::config::MAX_STORED_CVS;
use crate::dto::candidate_dto::{
    AddCvPayload, CandidateFullProfile, CandidateProfilePayload, CompletionResponse,
    EducationPayload, ExperiencePayload, NotificationSettingsPayload, PreferencesPayload,
    SkillAssignment,
};
use crate::error::{Error, Result};
use crate::models::candidate::{
    total_experience_years, CandidateListing, CandidateNotificationSettings, CandidatePreferences,
    CandidateProfile, CandidateSkill, CompletionFields, CvEntry, Education, Experience,
    ProfileSections,
};
use crate::services::search::{candidate_search, CandidateFilter};
use crate::utils::pagination::{Page, PageRequest};
use crate::utils::time::{now, today};

#[derive(sqlx::FromRow)]
struct Identity {
    first_name: String,
    last_name: String,
    email: String,
}

#[derive(Clone)]
pub struct CandidateService {
    pool: PgPool,
}

impl CandidateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn profile_for_user(&self, user_id: Uuid) -> Result<CandidateProfile> {
        sqlx::query_as::<_, CandidateProfile>("SELECT * FROM candidate_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate profile not found".to_string()))
    }

    pub async fn profile_id_for_user(&self, user_id: Uuid) -> Result<Uuid> {
        Ok(self.profile_for_user(user_id).await?.id)
    }

    pub async fn get(&self, candidate_id: Uuid) -> Result<CandidateProfile> {
        sqlx::query_as::<_, CandidateProfile>("SELECT * FROM candidate_profiles WHERE id = $1")
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        payload: CandidateProfilePayload,
    ) -> Result<CandidateProfile> {
        let mut tx = self.pool.begin().await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM candidate_profiles WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(Error::Conflict("Candidate profile already exists".to_string()));
        }

        let profile = sqlx::query_as::<_, CandidateProfile>(
            r#"
            INSERT INTO candidate_profiles
                (user_id, current_position, current_company, summary, location, city, country,
                 linkedin_url, willing_to_relocate, salary_expectation, is_open_to_opportunities)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, FALSE), $10, COALESCE($11, TRUE))
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&payload.current_position)
        .bind(&payload.current_company)
        .bind(&payload.summary)
        .bind(&payload.location)
        .bind(&payload.city)
        .bind(&payload.country)
        .bind(&payload.linkedin_url)
        .bind(payload.willing_to_relocate)
        .bind(payload.salary_expectation)
        .bind(payload.is_open_to_opportunities)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO candidate_notification_settings (candidate_id) VALUES ($1)")
            .bind(profile.id)
            .execute(&mut *tx)
            .await?;
        let profile = refresh_completion(&mut tx, profile.id).await?;
        tx.commit().await?;

        tracing::info!(candidate_id = %profile.id, %user_id, "candidate profile created");
        Ok(profile)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        payload: CandidateProfilePayload,
    ) -> Result<CandidateProfile> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, CandidateProfile>(
            r#"
            UPDATE candidate_profiles
            SET current_position = COALESCE($2, current_position),
                current_company = COALESCE($3, current_company),
                summary = COALESCE($4, summary),
                location = COALESCE($5, location),
                city = COALESCE($6, city),
                country = COALESCE($7, country),
                linkedin_url = COALESCE($8, linkedin_url),
                willing_to_relocate = COALESCE($9, willing_to_relocate),
                salary_expectation = COALESCE($10, salary_expectation),
                is_open_to_opportunities = COALESCE($11, is_open_to_opportunities),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&payload.current_position)
        .bind(&payload.current_company)
        .bind(&payload.summary)
        .bind(&payload.location)
        .bind(&payload.city)
        .bind(&payload.country)
        .bind(&payload.linkedin_url)
        .bind(payload.willing_to_relocate)
        .bind(payload.salary_expectation)
        .bind(payload.is_open_to_opportunities)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Candidate profile not found".to_string()))?;
        let profile = refresh_completion(&mut tx, updated.id).await?;
        tx.commit().await?;
        Ok(profile)
    }

    pub async fn full_profile(&self, candidate_id: Uuid) -> Result<CandidateFullProfile> {
        let profile = self.get(candidate_id).await?;
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT first_name, last_name, email FROM users WHERE id = $1",
        )
        .bind(profile.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CandidateFullProfile {
            education: self.education(candidate_id).await?,
            experience: self.experience(candidate_id).await?,
            skills: self.skills(candidate_id).await?,
            preferences: self.preferences(candidate_id).await?,
            notification_settings: self.notification_settings(candidate_id).await?,
            first_name: identity.first_name,
            last_name: identity.last_name,
            email: identity.email,
            profile,
        })
    }

    pub async fn search(
        &self,
        filter: &CandidateFilter,
        page: PageRequest,
    ) -> Result<Page<CandidateListing>> {
        candidate_search(filter, page).fetch(&self.pool, page).await
    }

    // Education

    pub async fn education(&self, candidate_id: Uuid) -> Result<Vec<Education>> {
        let rows = sqlx::query_as::<_, Education>(
            "SELECT * FROM candidate_education WHERE candidate_id = $1 ORDER BY start_date DESC NULLS LAST, created_at",
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn add_education(&self, user_id: Uuid, payload: EducationPayload) -> Result<Education> {
        let mut tx = self.pool.begin().await?;
        let candidate_id = candidate_id_for(&mut tx, user_id).await?;
        let row = sqlx::query_as::<_, Education>(
            r#"
            INSERT INTO candidate_education
                (candidate_id, institution, degree, field_of_study, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(&payload.institution)
        .bind(&payload.degree)
        .bind(&payload.field_of_study)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .fetch_one(&mut *tx)
        .await?;
        refresh_completion(&mut tx, candidate_id).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn update_education(
        &self,
        user_id: Uuid,
        education_id: Uuid,
        payload: EducationPayload,
    ) -> Result<Education> {
        let mut tx = self.pool.begin().await?;
        let candidate_id = candidate_id_for(&mut tx, user_id).await?;
        let row = sqlx::query_as::<_, Education>(
            r#"
            UPDATE candidate_education
            SET institution = $3, degree = $4, field_of_study = $5, start_date = $6, end_date = $7
            WHERE id = $1 AND candidate_id = $2
            RETURNING *
            "#,
        )
        .bind(education_id)
        .bind(candidate_id)
        .bind(&payload.institution)
        .bind(&payload.degree)
        .bind(&payload.field_of_study)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Education record not found".to_string()))?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn delete_education(&self, user_id: Uuid, education_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let candidate_id = candidate_id_for(&mut tx, user_id).await?;
        let result =
            sqlx::query("DELETE FROM candidate_education WHERE id = $1 AND candidate_id = $2")
                .bind(education_id)
                .bind(candidate_id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Education record not found".to_string()));
        }
        refresh_completion(&mut tx, candidate_id).await?;
        tx.commit().await?;
        Ok(())
    }

    // Experience

    pub async fn experience(&self, candidate_id: Uuid) -> Result<Vec<Experience>> {
        let rows = sqlx::query_as::<_, Experience>(
            "SELECT * FROM candidate_experience WHERE candidate_id = $1 ORDER BY current DESC, start_date DESC",
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn add_experience(
        &self,
        user_id: Uuid,
        payload: ExperiencePayload,
    ) -> Result<Experience> {
        let mut tx = self.pool.begin().await?;
        let candidate_id = candidate_id_for(&mut tx, user_id).await?;
        let row = sqlx::query_as::<_, Experience>(
            r#"
            INSERT INTO candidate_experience
                (candidate_id, company, title, description, start_date, end_date, current)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(&payload.company)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.start_date)
        .bind(payload.end_date.filter(|_| !payload.current))
        .bind(payload.current)
        .fetch_one(&mut *tx)
        .await?;
        refresh_experience_years(&mut tx, candidate_id).await?;
        refresh_completion(&mut tx, candidate_id).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn update_experience(
        &self,
        user_id: Uuid,
        experience_id: Uuid,
        payload: ExperiencePayload,
    ) -> Result<Experience> {
        let mut tx = self.pool.begin().await?;
        let candidate_id = candidate_id_for(&mut tx, user_id).await?;
        let row = sqlx::query_as::<_, Experience>(
            r#"
            UPDATE candidate_experience
            SET company = $3, title = $4, description = $5, start_date = $6, end_date = $7, current = $8
            WHERE id = $1 AND candidate_id = $2
            RETURNING *
            "#,
        )
        .bind(experience_id)
        .bind(candidate_id)
        .bind(&payload.company)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.start_date)
        .bind(payload.end_date.filter(|_| !payload.current))
        .bind(payload.current)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Experience record not found".to_string()))?;
        refresh_experience_years(&mut tx, candidate_id).await?;
        refresh_completion(&mut tx, candidate_id).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn delete_experience(&self, user_id: Uuid, experience_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let candidate_id = candidate_id_for(&mut tx, user_id).await?;
        let result =
            sqlx::query("DELETE FROM candidate_experience WHERE id = $1 AND candidate_id = $2")
                .bind(experience_id)
                .bind(candidate_id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Experience record not found".to_string()));
        }
        refresh_experience_years(&mut tx, candidate_id).await?;
        refresh_completion(&mut tx, candidate_id).await?;
        tx.commit().await?;
        Ok(())
    }

    // Skills

    pub async fn skills(&self, candidate_id: Uuid) -> Result<Vec<CandidateSkill>> {
        let rows = sqlx::query_as::<_, CandidateSkill>(
            r#"
            SELECT cs.skill_id, s.name, s.category, cs.proficiency_level, cs.years_experience
            FROM candidate_skills cs
            JOIN skills s ON s.id = cs.skill_id
            WHERE cs.candidate_id = $1
            ORDER BY s.name
            "#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn skill_names(&self, candidate_id: Uuid) -> Result<Vec<String>> {
        Ok(self
            .skills(candidate_id)
            .await?
            .into_iter()
            .map(|s| s.name)
            .collect())
    }

    /// Replaces the whole skill set.
    pub async fn replace_skills(
        &self,
        user_id: Uuid,
        skills: Vec<SkillAssignment>,
    ) -> Result<Vec<CandidateSkill>> {
        let mut tx = self.pool.begin().await?;
        let candidate_id = candidate_id_for(&mut tx, user_id).await?;
        sqlx::query("DELETE FROM candidate_skills WHERE candidate_id = $1")
            .bind(candidate_id)
            .execute(&mut *tx)
            .await?;
        for skill in &skills {
            let known: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM skills WHERE id = $1)")
                .bind(skill.skill_id)
                .fetch_one(&mut *tx)
                .await?;
            if !known {
                return Err(Error::BadRequest(format!("Unknown skill {}", skill.skill_id)));
            }
            sqlx::query(
                r#"
                INSERT INTO candidate_skills (candidate_id, skill_id, proficiency_level, years_experience)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (candidate_id, skill_id) DO UPDATE
                SET proficiency_level = EXCLUDED.proficiency_level,
                    years_experience = EXCLUDED.years_experience
                "#,
            )
            .bind(candidate_id)
            .bind(skill.skill_id)
            .bind(&skill.proficiency_level)
            .bind(skill.years_experience)
            .execute(&mut *tx)
            .await?;
        }
        refresh_completion(&mut tx, candidate_id).await?;
        tx.commit().await?;
        self.skills(candidate_id).await
    }

    // Preferences and notification settings

    pub async fn preferences(&self, candidate_id: Uuid) -> Result<Option<CandidatePreferences>> {
        let row = sqlx::query_as::<_, CandidatePreferences>(
            "SELECT * FROM candidate_preferences WHERE candidate_id = $1",
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        payload: PreferencesPayload,
    ) -> Result<CandidatePreferences> {
        let mut tx = self.pool.begin().await?;
        let candidate_id = candidate_id_for(&mut tx, user_id).await?;
        let contract_types: Vec<String> = payload
            .contract_types
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();
        let row = sqlx::query_as::<_, CandidatePreferences>(
            r#"
            INSERT INTO candidate_preferences (candidate_id, desired_sectors, desired_locations, contract_types)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (candidate_id) DO UPDATE
            SET desired_sectors = EXCLUDED.desired_sectors,
                desired_locations = EXCLUDED.desired_locations,
                contract_types = EXCLUDED.contract_types,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(&payload.desired_sectors)
        .bind(&payload.desired_locations)
        .bind(&contract_types)
        .fetch_one(&mut *tx)
        .await?;
        refresh_completion(&mut tx, candidate_id).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn notification_settings(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<CandidateNotificationSettings>> {
        let row = sqlx::query_as::<_, CandidateNotificationSettings>(
            "SELECT * FROM candidate_notification_settings WHERE candidate_id = $1",
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_notification_settings(
        &self,
        user_id: Uuid,
        payload: NotificationSettingsPayload,
    ) -> Result<CandidateNotificationSettings> {
        let candidate_id = self.profile_id_for_user(user_id).await?;
        let row = sqlx::query_as::<_, CandidateNotificationSettings>(
            r#"
            INSERT INTO candidate_notification_settings
                (candidate_id, email_alerts, job_matches, application_updates)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (candidate_id) DO UPDATE
            SET email_alerts = EXCLUDED.email_alerts,
                job_matches = EXCLUDED.job_matches,
                application_updates = EXCLUDED.application_updates,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(payload.email_alerts)
        .bind(payload.job_matches)
        .bind(payload.application_updates)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    // CVs

    /// Appends a CV, keeping only the most recent [`MAX_STORED_CVS`].
    pub async fn add_cv(&self, user_id: Uuid, payload: AddCvPayload) -> Result<CandidateProfile> {
        let mut tx = self.pool.begin().await?;
        let profile = lock_profile_for_user(&mut tx, user_id).await?;
        let mut cvs = profile.cv_urls.0;
        cvs.push(CvEntry {
            url: payload.url,
            name: payload.name.or_else(|| Some("CV".to_string())),
            uploaded_at: now(),
        });
        let keep_from = cvs.len().saturating_sub(MAX_STORED_CVS);
        let cvs: Vec<CvEntry> = cvs.split_off(keep_from);
        save_cvs(&mut tx, profile.id, cvs).await?;
        let profile = refresh_completion(&mut tx, profile.id).await?;
        tx.commit().await?;
        Ok(profile)
    }

    pub async fn remove_cv(&self, user_id: Uuid, url: &str) -> Result<CandidateProfile> {
        let mut tx = self.pool.begin().await?;
        let profile = lock_profile_for_user(&mut tx, user_id).await?;
        let before = profile.cv_urls.0.len();
        let cvs: Vec<CvEntry> = profile
            .cv_urls
            .0
            .into_iter()
            .filter(|cv| cv.url != url)
            .collect();
        if cvs.len() == before {
            return Err(Error::NotFound("CV not found".to_string()));
        }
        save_cvs(&mut tx, profile.id, cvs).await?;
        let profile = refresh_completion(&mut tx, profile.id).await?;
        tx.commit().await?;
        Ok(profile)
    }

    pub async fn completion(&self, user_id: Uuid) -> Result<CompletionResponse> {
        let profile = self.profile_for_user(user_id).await?;
        let fields = sqlx::query_as::<_, CompletionFields>(
            r#"
            SELECT COALESCE(cp.summary, '') <> '' AS summary,
                   jsonb_array_length(cp.cv_urls) > 0 AS cv,
                   COALESCE(cp.current_position, '') <> '' AS current_position,
                   cp.years_of_experience > 0 AS years_of_experience,
                   EXISTS(SELECT 1 FROM candidate_education e WHERE e.candidate_id = cp.id) AS education,
                   EXISTS(SELECT 1 FROM candidate_experience x WHERE x.candidate_id = cp.id) AS experience,
                   EXISTS(SELECT 1 FROM candidate_skills s WHERE s.candidate_id = cp.id) AS skills,
                   EXISTS(SELECT 1 FROM candidate_preferences p WHERE p.candidate_id = cp.id) AS preferences,
                   COALESCE(cp.linkedin_url, '') <> '' AS linkedin_url,
                   (COALESCE(cp.city, '') <> '' AND COALESCE(cp.country, '') <> '') AS city_and_country
            FROM candidate_profiles cp
            WHERE cp.id = $1
            "#,
        )
        .bind(profile.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(CompletionResponse {
            percentage: fields.percentage(),
            profile_completed: profile.profile_completed,
            missing: fields.missing().into_iter().map(str::to_string).collect(),
        })
    }
}

async fn candidate_id_for(conn: &mut PgConnection, user_id: Uuid) -> Result<Uuid> {
    sqlx::query_scalar("SELECT id FROM candidate_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| Error::NotFound("Candidate profile not found".to_string()))
}

async fn lock_profile_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<CandidateProfile> {
    sqlx::query_as::<_, CandidateProfile>(
        "SELECT * FROM candidate_profiles WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| Error::NotFound("Candidate profile not found".to_string()))
}

async fn save_cvs(conn: &mut PgConnection, candidate_id: Uuid, cvs: Vec<CvEntry>) -> Result<()> {
    sqlx::query("UPDATE candidate_profiles SET cv_urls = $2, updated_at = NOW() WHERE id = $1")
        .bind(candidate_id)
        .bind(Json(cvs))
        .execute(conn)
        .await?;
    Ok(())
}

async fn refresh_experience_years(conn: &mut PgConnection, candidate_id: Uuid) -> Result<()> {
    let entries = sqlx::query_as::<_, Experience>(
        "SELECT * FROM candidate_experience WHERE candidate_id = $1",
    )
    .bind(candidate_id)
    .fetch_all(&mut *conn)
    .await?;
    let years = total_experience_years(&entries, today());
    sqlx::query("UPDATE candidate_profiles SET years_of_experience = $2 WHERE id = $1")
        .bind(candidate_id)
        .bind(years)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Recomputes `profile_completed` from the current sub-sections.
async fn refresh_completion(conn: &mut PgConnection, candidate_id: Uuid) -> Result<CandidateProfile> {
    let sections = sqlx::query_as::<_, ProfileSections>(
        r#"
        SELECT EXISTS(SELECT 1 FROM candidate_education e WHERE e.candidate_id = cp.id) AS has_education,
               EXISTS(SELECT 1 FROM candidate_experience x WHERE x.candidate_id = cp.id) AS has_experience,
               EXISTS(SELECT 1 FROM candidate_skills s WHERE s.candidate_id = cp.id) AS has_skills,
               EXISTS(SELECT 1 FROM candidate_preferences p WHERE p.candidate_id = cp.id) AS has_preferences,
               COALESCE(cp.summary, '') <> '' AS has_summary,
               jsonb_array_length(cp.cv_urls) > 0 AS has_cv
        FROM candidate_profiles cp
        WHERE cp.id = $1
        "#,
    )
    .bind(candidate_id)
    .fetch_one(&mut *conn)
    .await?;

    let completed = sections.is_complete();
    let profile = sqlx::query_as::<_, CandidateProfile>(
        r#"
        UPDATE candidate_profiles
        SET profile_completed = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(candidate_id)
    .bind(completed)
    .fetch_one(&mut *conn)
    .await?;
    tracing::debug!(%candidate_id, completed, "profile completion refreshed");
    Ok(profile)
}

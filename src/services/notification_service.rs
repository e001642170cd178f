use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::ApplicationStatus;
use crate::models::notification::{Channel, Notification, NotificationKind, NotificationPreferences};
use crate::services::application_workflow::{WorkflowEvent, WorkflowNotifier};
use crate::services::notification_dispatcher::NotificationDispatcher;
use crate::utils::pagination::{Page, PageRequest};

/// Inbox and preference storage, plus the recipients of workflow events.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    dispatcher: NotificationDispatcher,
}

#[derive(sqlx::FromRow)]
struct CandidateSettings {
    email_alerts: bool,
    application_updates: bool,
}

impl NotificationService {
    pub fn new(pool: PgPool, dispatcher: NotificationDispatcher) -> Self {
        Self { pool, dispatcher }
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<Page<Notification>> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE recipient_id = $1 AND ($2 = FALSE OR read_at IS NULL)
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1 AND ($2 = FALSE OR read_at IS NULL)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(page.page_size)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> Result<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND recipient_id = $2
            RETURNING *
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Notification not found".to_string()))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = NOW() WHERE recipient_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn preferences(&self, user_id: Uuid) -> Result<NotificationPreferences> {
        let prefs = sqlx::query_as::<_, NotificationPreferences>(
            "SELECT email, sms, in_app, push FROM notification_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(prefs.unwrap_or_default())
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        prefs: NotificationPreferences,
    ) -> Result<NotificationPreferences> {
        let saved = sqlx::query_as::<_, NotificationPreferences>(
            r#"
            INSERT INTO notification_preferences (user_id, email, sms, in_app, push)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
            SET email = EXCLUDED.email,
                sms = EXCLUDED.sms,
                in_app = EXCLUDED.in_app,
                push = EXCLUDED.push,
                updated_at = NOW()
            RETURNING email, sms, in_app, push
            "#,
        )
        .bind(user_id)
        .bind(prefs.email)
        .bind(prefs.sms)
        .bind(prefs.in_app)
        .bind(prefs.push)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    /// Users who hear about a company's applications: its employers and the job poster.
    async fn employer_recipients(
        &self,
        company_id: Uuid,
        posted_by: Option<Uuid>,
    ) -> Result<Vec<Uuid>> {
        let mut users: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT ep.user_id
            FROM employer_profiles ep
            JOIN users u ON u.id = ep.user_id
            WHERE ep.company_id = $1 AND u.is_active = TRUE
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        if let Some(poster) = posted_by {
            if !users.contains(&poster) {
                users.push(poster);
            }
        }
        Ok(users)
    }

    /// `None` when the candidate opted out of application updates.
    async fn candidate_channels(&self, candidate_user_id: Uuid) -> Result<Option<Vec<Channel>>> {
        let settings = sqlx::query_as::<_, CandidateSettings>(
            r#"
            SELECT s.email_alerts, s.application_updates
            FROM candidate_notification_settings s
            JOIN candidate_profiles cp ON cp.id = s.candidate_id
            WHERE cp.user_id = $1
            "#,
        )
        .bind(candidate_user_id)
        .fetch_optional(&self.pool)
        .await?;

        let mut channels = self.preferences(candidate_user_id).await?.channels();
        match settings {
            Some(s) if !s.application_updates => Ok(None),
            Some(s) if !s.email_alerts => {
                channels.retain(|c| *c != Channel::Email);
                Ok(Some(channels))
            }
            _ => Ok(Some(channels)),
        }
    }

    async fn notify_candidate(
        &self,
        candidate_user_id: Option<Uuid>,
        kind: NotificationKind,
        data: serde_json::Value,
    ) {
        let Some(user_id) = candidate_user_id else {
            return;
        };
        match self.candidate_channels(user_id).await {
            Ok(Some(channels)) => {
                self.dispatcher
                    .send(user_id, kind, data, Some(&channels))
                    .await;
            }
            Ok(None) => {
                tracing::debug!(%user_id, %kind, "candidate opted out of application updates");
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "candidate settings lookup failed");
                self.dispatcher.send(user_id, kind, data, None).await;
            }
        }
    }

    async fn notify_employers(
        &self,
        company_id: Uuid,
        posted_by: Option<Uuid>,
        kind: NotificationKind,
        data: serde_json::Value,
    ) {
        match self.employer_recipients(company_id, posted_by).await {
            Ok(recipients) => {
                let summary = self
                    .dispatcher
                    .send_bulk(&recipients, kind, data, None)
                    .await;
                tracing::debug!(%company_id, total = summary.total, failed = summary.failed, "employers notified");
            }
            Err(e) => {
                tracing::error!(%company_id, error = %e, "could not resolve employer recipients");
            }
        }
    }
}

fn status_kind(status: ApplicationStatus) -> NotificationKind {
    match status {
        ApplicationStatus::InterviewScheduled => NotificationKind::ApplicationInterview,
        ApplicationStatus::OfferMade => NotificationKind::ApplicationOffer,
        _ => NotificationKind::ApplicationStatusChange,
    }
}

#[async_trait]
impl WorkflowNotifier for NotificationService {
    async fn notify(&self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::Submitted {
                application,
                job,
                candidate_user_id,
            } => {
                let data = json!({
                    "application_id": application.id,
                    "job_id": job.id,
                    "job_title": job.title,
                    "status": application.status,
                });
                self.notify_employers(
                    job.company_id,
                    job.posted_by,
                    NotificationKind::ApplicationNew,
                    data.clone(),
                )
                .await;
                self.notify_candidate(
                    candidate_user_id,
                    NotificationKind::ApplicationStatusChange,
                    data,
                )
                .await;
            }
            WorkflowEvent::StatusChanged {
                application,
                job,
                candidate_user_id,
                previous,
                notify_candidate,
                notify_employer,
            } => {
                let interview_date = application
                    .interview_date
                    .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string());
                let data = json!({
                    "application_id": application.id,
                    "job_id": job.id,
                    "job_title": job.title,
                    "status": application.status,
                    "previous_status": previous,
                    "interview_date": interview_date,
                    "offer_salary": application.offer_salary,
                    "offer_currency": application.offer_currency,
                });
                if notify_candidate {
                    self.notify_candidate(
                        candidate_user_id,
                        status_kind(application.status),
                        data.clone(),
                    )
                    .await;
                }
                if notify_employer {
                    self.notify_employers(
                        job.company_id,
                        job.posted_by,
                        NotificationKind::ApplicationStatusChange,
                        data,
                    )
                    .await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interview_and_offer_have_dedicated_kinds() {
        assert_eq!(
            status_kind(ApplicationStatus::InterviewScheduled),
            NotificationKind::ApplicationInterview
        );
        assert_eq!(
            status_kind(ApplicationStatus::OfferMade),
            NotificationKind::ApplicationOffer
        );
        assert_eq!(
            status_kind(ApplicationStatus::Rejected),
            NotificationKind::ApplicationStatusChange
        );
    }
}

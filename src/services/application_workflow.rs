//! Status lifecycle of job applications.
//!
//! Every operation runs inside one storage transaction; notifications go out
//! only after it commits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dto::application_dto::{
    BulkFailure, BulkStatusPayload, BulkStatusResponse, MakeOfferPayload,
    ScheduleInterviewPayload, StatusChangePayload,
};
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::models::job::JobStatus;
use crate::services::application_store::{
    FilledPosition, HistoryRecord, JobSnapshot, NewApplication, WorkflowStore, WorkflowTx,
};
use crate::utils::time::days_between;

pub const SUBMITTED_COMMENT: &str = "Application submitted";

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    Submitted {
        application: Application,
        job: JobSnapshot,
        candidate_user_id: Option<Uuid>,
    },
    StatusChanged {
        application: Application,
        job: JobSnapshot,
        candidate_user_id: Option<Uuid>,
        previous: ApplicationStatus,
        notify_candidate: bool,
        notify_employer: bool,
    },
}

/// Receives committed workflow events. Implementations swallow their own failures.
#[async_trait]
pub trait WorkflowNotifier: Send + Sync {
    async fn notify(&self, event: WorkflowEvent);
}

/// Result of a submission: either a fresh application or the one already on file.
#[derive(Debug, Clone)]
pub struct Submission {
    pub application: Application,
    pub created: bool,
}

struct Transition {
    application: Application,
    job: JobSnapshot,
    candidate_user_id: Option<Uuid>,
    previous: ApplicationStatus,
}

#[derive(Clone)]
pub struct ApplicationWorkflow<S> {
    store: S,
    notifier: Arc<dyn WorkflowNotifier>,
}

impl<S> ApplicationWorkflow<S>
where
    S: WorkflowStore,
{
    pub fn new(store: S, notifier: Arc<dyn WorkflowNotifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn create(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
        draft: NewApplication,
        actor: Uuid,
    ) -> Result<Submission> {
        let mut tx = self.store.begin().await?;

        let job = tx
            .lock_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;
        if let Some(existing) = tx.find_for_pair(candidate_id, job_id).await? {
            tracing::info!(application_id = %existing.id, %job_id, %candidate_id, "duplicate application");
            return Ok(Submission {
                application: existing,
                created: false,
            });
        }

        if job.status != JobStatus::Open {
            return Err(Error::InvalidState(format!(
                "Job is not open for applications (status: {})",
                job.status
            )));
        }

        let application = tx.insert_application(candidate_id, job_id, &draft).await?;
        tx.append_history(HistoryRecord {
            application_id: application.id,
            status: ApplicationStatus::Submitted,
            comment: Some(SUBMITTED_COMMENT.to_string()),
            changed_by: Some(actor),
        })
        .await?;
        tx.increment_application_count(job_id).await?;
        let candidate_user_id = tx.candidate_user(candidate_id).await?;
        tx.commit().await?;

        tracing::info!(application_id = %application.id, %job_id, %candidate_id, "application submitted");
        self.notifier
            .notify(WorkflowEvent::Submitted {
                application: application.clone(),
                job,
                candidate_user_id,
            })
            .await;

        Ok(Submission {
            application,
            created: true,
        })
    }

    pub async fn change_status(
        &self,
        application_id: Uuid,
        change: StatusChangePayload,
        actor: Uuid,
    ) -> Result<Application> {
        let mut tx = self.store.begin().await?;
        let application = tx
            .lock_application(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        let mut updated = application;
        if change.status == ApplicationStatus::Rejected {
            updated.rejection_reason = change
                .rejection_reason
                .clone()
                .or_else(|| change.comment.clone());
        }
        let transition = Self::transition(
            &mut tx,
            updated,
            change.status,
            change.comment.clone(),
            change.expected_version,
            actor,
        )
        .await?;
        tx.commit().await?;

        Ok(self
            .announce(transition, change.notify_candidate, change.notify_employer)
            .await)
    }

    /// Returns `None`, with nothing written, when the application does not exist.
    pub async fn schedule_interview(
        &self,
        application_id: Uuid,
        payload: ScheduleInterviewPayload,
        actor: Uuid,
    ) -> Result<Option<Application>> {
        let mut tx = self.store.begin().await?;
        let Some(mut application) = tx.lock_application(application_id).await? else {
            return Ok(None);
        };

        application.interview_date = Some(payload.interview_date);
        application.interview_type = Some(payload.interview_type.clone());
        application.interview_location = payload.interview_location.clone();
        let comment = format!(
            "Interview scheduled for {}",
            payload.interview_date.format("%Y-%m-%d %H:%M UTC")
        );
        let transition = Self::transition(
            &mut tx,
            application,
            ApplicationStatus::InterviewScheduled,
            Some(comment),
            payload.expected_version,
            actor,
        )
        .await?;
        tx.commit().await?;

        Ok(Some(
            self.announce(transition, payload.notify_candidate, true).await,
        ))
    }

    /// Returns `None`, with nothing written, when the application does not exist.
    pub async fn make_offer(
        &self,
        application_id: Uuid,
        payload: MakeOfferPayload,
        actor: Uuid,
    ) -> Result<Option<Application>> {
        if payload.offer_salary <= Decimal::ZERO {
            return Err(Error::BadRequest("Offer salary must be positive".to_string()));
        }
        let offer_date = payload.offer_date.unwrap_or_else(|| Utc::now().date_naive());
        if matches!(payload.offer_expiry_date, Some(expiry) if expiry < offer_date) {
            return Err(Error::BadRequest(
                "Offer expiry date precedes the offer date".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let Some(mut application) = tx.lock_application(application_id).await? else {
            return Ok(None);
        };

        let currency = payload.offer_currency.to_uppercase();
        application.offer_salary = Some(payload.offer_salary);
        application.offer_currency = Some(currency.clone());
        application.offer_date = Some(offer_date);
        application.offer_expiry_date = payload.offer_expiry_date;
        let comment = format!("Offer made: {} {}", payload.offer_salary, currency);
        let transition = Self::transition(
            &mut tx,
            application,
            ApplicationStatus::OfferMade,
            Some(comment),
            payload.expected_version,
            actor,
        )
        .await?;
        tx.commit().await?;

        Ok(Some(
            self.announce(transition, payload.notify_candidate, true).await,
        ))
    }

    /// Applies the same change to each application independently.
    pub async fn bulk_change_status(
        &self,
        payload: BulkStatusPayload,
        actor: Uuid,
    ) -> BulkStatusResponse {
        let mut outcome = BulkStatusResponse::default();
        for id in &payload.application_ids {
            match self.change_status(*id, payload.change(), actor).await {
                Ok(application) => outcome.updated.push(application.id),
                Err(e) => {
                    tracing::warn!(application_id = %id, error = %e, "bulk status change skipped");
                    outcome.failed.push(BulkFailure {
                        id: *id,
                        detail: e.to_string(),
                    });
                }
            }
        }
        outcome
    }

    async fn transition(
        tx: &mut S::Tx,
        mut application: Application,
        target: ApplicationStatus,
        comment: Option<String>,
        expected_version: Option<i32>,
        actor: Uuid,
    ) -> Result<Transition> {
        if let Some(expected) = expected_version {
            if expected != application.version {
                return Err(Error::StaleVersion {
                    expected,
                    actual: application.version,
                });
            }
        }
        let previous = application.status;
        if !previous.can_transition_to(target) {
            return Err(Error::InvalidState(format!(
                "Cannot move application from {} to {}",
                previous, target
            )));
        }

        let job = tx
            .lock_job(application.job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        application.status = target;
        let saved = tx.save_application(&application).await?;
        tx.append_history(HistoryRecord {
            application_id: saved.id,
            status: target,
            comment,
            changed_by: Some(actor),
        })
        .await?;

        let job = if target == ApplicationStatus::Hired {
            Self::record_hire(tx, &saved, job).await?
        } else {
            job
        };
        let candidate_user_id = tx.candidate_user(saved.candidate_id).await?;

        Ok(Transition {
            application: saved,
            job,
            candidate_user_id,
            previous,
        })
    }

    async fn record_hire(
        tx: &mut S::Tx,
        application: &Application,
        mut job: JobSnapshot,
    ) -> Result<JobSnapshot> {
        let hired = tx.count_hired(job.id).await?;
        let can_fill = !matches!(job.status, JobStatus::Filled | JobStatus::Cancelled);
        if can_fill && hired >= i64::from(job.positions_available) {
            tx.set_job_status(job.id, JobStatus::Filled).await?;
            job.status = JobStatus::Filled;
            tracing::info!(job_id = %job.id, hired, "job filled");
        }

        let consultant_id = application.consultant_id.or(job.assigned_consultant_id);
        if let Some(consultant_id) = consultant_id {
            tx.record_placement(consultant_id, application.offer_salary)
                .await?;
        }

        let today = Utc::now().date_naive();
        tx.record_filled_position(FilledPosition {
            company_id: job.company_id,
            job_id: job.id,
            job_title: job.title.clone(),
            date_filled: today,
            time_to_fill: job
                .posting_date
                .and_then(|posted| i32::try_from(days_between(posted, today)).ok()),
            consultant_id,
        })
        .await?;

        Ok(job)
    }

    async fn announce(
        &self,
        transition: Transition,
        notify_candidate: bool,
        notify_employer: bool,
    ) -> Application {
        tracing::info!(
            application_id = %transition.application.id,
            from = %transition.previous,
            to = %transition.application.status,
            version = transition.application.version,
            "application status changed"
        );
        let application = transition.application.clone();
        self.notifier
            .notify(WorkflowEvent::StatusChanged {
                application: transition.application,
                job: transition.job,
                candidate_user_id: transition.candidate_user_id,
                previous: transition.previous,
                notify_candidate,
                notify_employer,
            })
            .await;
        application
    }
}

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use recruitment_platform::error::Result;
use recruitment_platform::models::application::{
    Application, ApplicationStatus, StatusHistoryEntry,
};
use recruitment_platform::models::job::JobStatus;
use recruitment_platform::services::application_store::{
    FilledPosition, HistoryRecord, JobSnapshot, NewApplication, WorkflowStore, WorkflowTx,
};
use recruitment_platform::services::application_workflow::{WorkflowEvent, WorkflowNotifier};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub jobs: HashMap<Uuid, JobSnapshot>,
    pub application_counts: HashMap<Uuid, i64>,
    pub applications: HashMap<Uuid, Application>,
    pub history: Vec<StatusHistoryEntry>,
    pub placements: Vec<(Uuid, Option<Decimal>)>,
    pub filled: Vec<FilledPosition>,
    pub candidate_users: HashMap<Uuid, Uuid>,
}

/// Workflow storage kept in memory. A transaction works on a copy and
/// replaces the shared snapshot on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub state: Arc<Mutex<Snapshot>>,
}

impl MemoryStore {
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().unwrap().clone()
    }

    pub fn add_job(&self, status: JobStatus, positions_available: i32) -> JobSnapshot {
        let job = JobSnapshot {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            status,
            positions_available,
            posting_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            posted_by: Some(Uuid::new_v4()),
            assigned_consultant_id: None,
        };
        self.state.lock().unwrap().jobs.insert(job.id, job.clone());
        job
    }

    pub fn assign_consultant(&self, job_id: Uuid, consultant_id: Uuid) {
        if let Some(job) = self.state.lock().unwrap().jobs.get_mut(&job_id) {
            job.assigned_consultant_id = Some(consultant_id);
        }
    }

    pub fn add_candidate(&self) -> Uuid {
        let candidate_id = Uuid::new_v4();
        self.state
            .lock()
            .unwrap()
            .candidate_users
            .insert(candidate_id, Uuid::new_v4());
        candidate_id
    }

    pub fn history_for(&self, application_id: Uuid) -> Vec<ApplicationStatus> {
        self.snapshot()
            .history
            .iter()
            .filter(|h| h.application_id == application_id)
            .map(|h| h.status)
            .collect()
    }
}

pub struct MemoryTx {
    shared: Arc<Mutex<Snapshot>>,
    working: Snapshot,
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        Ok(MemoryTx {
            working: self.snapshot(),
            shared: self.state.clone(),
        })
    }
}

#[async_trait]
impl WorkflowTx for MemoryTx {
    async fn lock_job(&mut self, job_id: Uuid) -> Result<Option<JobSnapshot>> {
        Ok(self.working.jobs.get(&job_id).cloned())
    }

    async fn find_for_pair(
        &mut self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<Application>> {
        Ok(self
            .working
            .applications
            .values()
            .find(|a| a.candidate_id == candidate_id && a.job_id == job_id)
            .cloned())
    }

    async fn insert_application(
        &mut self,
        candidate_id: Uuid,
        job_id: Uuid,
        draft: &NewApplication,
    ) -> Result<Application> {
        let now = Utc::now();
        let application = Application {
            id: Uuid::new_v4(),
            candidate_id,
            job_id,
            consultant_id: None,
            status: ApplicationStatus::Submitted,
            cover_letter: draft.cover_letter.clone(),
            cv_url: draft.cv_url.clone(),
            source: draft.source.clone(),
            applied_at: now,
            interview_date: None,
            interview_type: None,
            interview_location: None,
            offer_salary: None,
            offer_currency: None,
            offer_date: None,
            offer_expiry_date: None,
            rejection_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.working
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn increment_application_count(&mut self, job_id: Uuid) -> Result<()> {
        *self.working.application_counts.entry(job_id).or_default() += 1;
        Ok(())
    }

    async fn lock_application(&mut self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.working.applications.get(&id).cloned())
    }

    async fn save_application(&mut self, application: &Application) -> Result<Application> {
        let mut saved = application.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();
        self.working.applications.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn append_history(&mut self, record: HistoryRecord) -> Result<StatusHistoryEntry> {
        let entry = StatusHistoryEntry {
            id: Uuid::new_v4(),
            application_id: record.application_id,
            status: record.status,
            comment: record.comment,
            changed_by: record.changed_by,
            changed_at: Utc::now(),
        };
        self.working.history.push(entry.clone());
        Ok(entry)
    }

    async fn count_hired(&mut self, job_id: Uuid) -> Result<i64> {
        Ok(self
            .working
            .applications
            .values()
            .filter(|a| a.job_id == job_id && a.status == ApplicationStatus::Hired)
            .count() as i64)
    }

    async fn set_job_status(&mut self, job_id: Uuid, status: JobStatus) -> Result<()> {
        if let Some(job) = self.working.jobs.get_mut(&job_id) {
            job.status = status;
        }
        Ok(())
    }

    async fn record_placement(
        &mut self,
        consultant_id: Uuid,
        offer_salary: Option<Decimal>,
    ) -> Result<()> {
        self.working.placements.push((consultant_id, offer_salary));
        Ok(())
    }

    async fn record_filled_position(&mut self, position: FilledPosition) -> Result<()> {
        self.working.filled.push(position);
        Ok(())
    }

    async fn candidate_user(&mut self, candidate_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self.working.candidate_users.get(&candidate_id).copied())
    }

    async fn commit(self) -> Result<()> {
        *self.shared.lock().unwrap() = self.working;
        Ok(())
    }
}

/// Remembers every event it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkflowNotifier for RecordingNotifier {
    async fn notify(&self, event: WorkflowEvent) {
        self.events.lock().unwrap().push(event);
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::application::{
    Application, ApplicationListing, ApplicationNote, ApplicationStatus, StatusHistoryEntry,
};
use crate::services::search::{split_list, ApplicationFilter};
use crate::utils::pagination::PageRequest;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateApplicationPayload {
    pub job_id: Uuid,
    #[validate(length(max = 10000))]
    pub cover_letter: Option<String>,
    #[validate(url)]
    pub cv_url: Option<String>,
    #[validate(length(max = 100))]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StatusChangePayload {
    pub status: ApplicationStatus,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    #[validate(length(max = 2000))]
    pub rejection_reason: Option<String>,
    #[serde(default = "default_true")]
    pub notify_candidate: bool,
    #[serde(default)]
    pub notify_employer: bool,
    /// Version the caller last read; a mismatch is refused.
    pub expected_version: Option<i32>,
}

impl StatusChangePayload {
    pub fn to(status: ApplicationStatus) -> Self {
        Self {
            status,
            comment: None,
            rejection_reason: None,
            notify_candidate: true,
            notify_employer: false,
            expected_version: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScheduleInterviewPayload {
    pub interview_date: DateTime<Utc>,
    #[validate(length(min = 1, max = 50))]
    pub interview_type: String,
    #[validate(length(max = 500))]
    pub interview_location: Option<String>,
    #[serde(default = "default_true")]
    pub notify_candidate: bool,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MakeOfferPayload {
    pub offer_salary: Decimal,
    #[validate(length(equal = 3))]
    pub offer_currency: String,
    pub offer_date: Option<NaiveDate>,
    pub offer_expiry_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub notify_candidate: bool,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkStatusPayload {
    #[validate(length(min = 1, max = 100))]
    pub application_ids: Vec<Uuid>,
    pub status: ApplicationStatus,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    #[serde(default = "default_true")]
    pub notify_candidate: bool,
    #[serde(default)]
    pub notify_employer: bool,
}

impl BulkStatusPayload {
    pub fn change(&self) -> StatusChangePayload {
        StatusChangePayload {
            status: self.status,
            comment: self.comment.clone(),
            rejection_reason: None,
            notify_candidate: self.notify_candidate,
            notify_employer: self.notify_employer,
            expected_version: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkStatusResponse {
    pub updated: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddNotePayload {
    #[validate(length(min = 1, max = 5000))]
    pub note_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignConsultantPayload {
    pub consultant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationListQuery {
    pub q: Option<String>,
    /// Comma separated statuses.
    pub status: Option<String>,
    pub job_id: Option<Uuid>,
    pub candidate_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub consultant_id: Option<Uuid>,
    pub applied_from: Option<DateTime<Utc>>,
    pub applied_to: Option<DateTime<Utc>>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ApplicationListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::resolve(self.page, self.page_size, self.skip, self.limit)
    }

    pub fn filter(&self) -> crate::error::Result<ApplicationFilter> {
        let statuses = split_list(self.status.as_deref())
            .iter()
            .map(|s| {
                s.parse::<ApplicationStatus>()
                    .map_err(|e| crate::error::Error::BadRequest(e.to_string()))
            })
            .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(ApplicationFilter {
            q: self.q.clone(),
            statuses,
            job_id: self.job_id,
            candidate_id: self.candidate_id,
            company_id: self.company_id,
            consultant_id: self.consultant_id,
            applied_from: self.applied_from,
            applied_to: self.applied_to,
            company_scope: None,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        })
    }
}

/// Body returned when a candidate applies twice to the same job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateApplicationResponse {
    pub detail: String,
    pub application: Application,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDetails {
    #[serde(flatten)]
    pub application: Application,
    pub job_title: String,
    pub company_id: Uuid,
    pub company_name: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub history: Vec<StatusHistoryEntry>,
    pub notes: Vec<ApplicationNote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationStats {
    pub total: i64,
    pub active: i64,
    pub by_status: BTreeMap<String, i64>,
    /// Hired as a percentage of all applications.
    pub hire_rate: f64,
    pub interviews_this_month: i64,
}

pub type ApplicationPage = crate::utils::pagination::Page<ApplicationListing>;

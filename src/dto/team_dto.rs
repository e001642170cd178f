use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::consultant::{ConsultantProfile, ConsultantStatus, Workload};
use crate::utils::pagination::PageRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateConsultantPayload {
    pub user_id: Uuid,
    #[validate(length(max = 50))]
    pub employee_id: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 100))]
    pub position: Option<String>,
    #[validate(range(min = 0, max = 70))]
    pub years_of_experience: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub specializations: Vec<String>,
    pub commission_rate: Option<Decimal>,
    #[validate(range(min = 1, max = 500))]
    pub max_concurrent_assignments: Option<i32>,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateConsultantPayload {
    #[validate(length(max = 50))]
    pub employee_id: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 100))]
    pub position: Option<String>,
    pub status: Option<ConsultantStatus>,
    #[validate(range(min = 0, max = 70))]
    pub years_of_experience: Option<i32>,
    #[validate(length(max = 50))]
    pub specializations: Option<Vec<String>>,
    pub commission_rate: Option<Decimal>,
    #[validate(range(min = 1, max = 500))]
    pub max_concurrent_assignments: Option<i32>,
    pub manager_id: Option<Uuid>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignCandidatePayload {
    pub candidate_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultantStats {
    pub consultant: ConsultantProfile,
    pub active_applications: i64,
    pub assigned_candidates: i64,
    pub assigned_jobs: i64,
    /// Successful placements over total placements, in percent.
    pub success_rate: f64,
    pub workload: Workload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsultantListQuery {
    pub status: Option<String>,
    pub department: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ConsultantListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::resolve(self.page, self.page_size, self.skip, self.limit)
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::models::job::{ContractType, Job, JobSkill, JobStatus, ProficiencyLevel};
use crate::services::search::{split_list, JobFilter};
use crate::utils::pagination::PageRequest;

fn validate_salary_range(min: Option<i32>, max: Option<i32>) -> std::result::Result<(), ValidationError> {
    match (min, max) {
        (Some(min), Some(max)) if max < min => Err(ValidationError::new("salary_max_below_min")),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobSkillPayload {
    pub skill_id: Uuid,
    #[serde(default = "default_required")]
    pub is_required: bool,
    pub proficiency_level: Option<ProficiencyLevel>,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_create_salary"))]
pub struct CreateJobPayload {
    pub company_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub requirements: Vec<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[serde(default = "default_contract")]
    pub contract_type: ContractType,
    #[validate(range(min = 0))]
    pub salary_min: Option<i32>,
    #[validate(range(min = 0))]
    pub salary_max: Option<i32>,
    #[serde(default)]
    pub remote_option: bool,
    #[validate(range(min = 1, max = 1000))]
    pub positions_available: Option<i32>,
    pub deadline_date: Option<NaiveDate>,
    pub assigned_consultant_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 50), nested)]
    pub skills: Vec<JobSkillPayload>,
    /// Publish straight away instead of saving as a draft.
    #[serde(default)]
    pub auto_publish: bool,
}

fn default_contract() -> ContractType {
    ContractType::Permanent
}

fn validate_create_salary(payload: &CreateJobPayload) -> std::result::Result<(), ValidationError> {
    validate_salary_range(payload.salary_min, payload.salary_max)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_update_salary"))]
pub struct UpdateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub responsibilities: Option<Vec<String>>,
    #[validate(length(max = 50))]
    pub requirements: Option<Vec<String>>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub contract_type: Option<ContractType>,
    #[validate(range(min = 0))]
    pub salary_min: Option<i32>,
    #[validate(range(min = 0))]
    pub salary_max: Option<i32>,
    pub remote_option: Option<bool>,
    #[validate(range(min = 1, max = 1000))]
    pub positions_available: Option<i32>,
    pub deadline_date: Option<NaiveDate>,
    pub assigned_consultant_id: Option<Uuid>,
}

fn validate_update_salary(payload: &UpdateJobPayload) -> std::result::Result<(), ValidationError> {
    validate_salary_range(payload.salary_min, payload.salary_max)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CloseJobPayload {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobSkillsPayload {
    #[validate(length(max = 50), nested)]
    pub skills: Vec<JobSkillPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetails {
    #[serde(flatten)]
    pub job: Job,
    pub company_name: String,
    pub skills: Vec<JobSkill>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStats {
    pub job_id: Uuid,
    pub view_count: i32,
    pub application_count: i64,
    pub by_status: Vec<StatusCount>,
    pub interview_count: i64,
    pub offer_count: i64,
    pub hired_count: i64,
    /// Applications per view, in percent.
    pub view_to_application_rate: f64,
    /// Hires per application, in percent.
    pub application_to_hire_rate: f64,
    pub days_active: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobListQuery {
    pub q: Option<String>,
    pub skills: Option<String>,
    pub location: Option<String>,
    pub company_id: Option<Uuid>,
    pub status: Option<String>,
    pub contract_type: Option<String>,
    pub remote_option: Option<bool>,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub consultant_id: Option<Uuid>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl JobListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::resolve(self.page, self.page_size, self.skip, self.limit)
    }

    pub fn filter(&self) -> Result<JobFilter> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<JobStatus>)
            .transpose()
            .map_err(|e| Error::BadRequest(e.to_string()))?;
        let contract_type = self
            .contract_type
            .as_deref()
            .map(str::parse::<ContractType>)
            .transpose()
            .map_err(|e| Error::BadRequest(e.to_string()))?;
        Ok(JobFilter {
            q: self.q.clone(),
            skills: split_list(self.skills.as_deref()),
            location: self.location.clone(),
            company_id: self.company_id,
            status,
            contract_type,
            remote_option: self.remote_option,
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            consultant_id: self.consultant_id,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarQuery {
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_parses_enums_case_insensitively() {
        let query = JobListQuery {
            status: Some("open".into()),
            contract_type: Some("Contract".into()),
            skills: Some("Rust, SQL".into()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(JobStatus::Open));
        assert_eq!(filter.contract_type, Some(ContractType::Contract));
        assert_eq!(filter.skills, vec!["Rust", "SQL"]);
    }

    #[test]
    fn unknown_status_is_a_bad_request() {
        let query = JobListQuery {
            status: Some("Archived".into()),
            ..Default::default()
        };
        assert!(matches!(query.filter(), Err(Error::BadRequest(_))));
    }

    #[test]
    fn inverted_salary_range_fails_validation() {
        let payload = UpdateJobPayload {
            salary_min: Some(5000),
            salary_max: Some(1000),
            ..Default::default()
        };
        assert!(payload.validate().is_err());
    }
}

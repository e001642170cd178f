use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::candidate::{
    CandidateNotificationSettings, CandidatePreferences, CandidateProfile, CandidateSkill,
    Education, Experience,
};
use crate::models::job::ContractType;
use crate::services::search::{split_list, CandidateFilter};
use crate::utils::pagination::PageRequest;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CandidateProfilePayload {
    #[validate(length(max = 200))]
    pub current_position: Option<String>,
    #[validate(length(max = 200))]
    pub current_company: Option<String>,
    #[validate(length(max = 5000))]
    pub summary: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(url)]
    pub linkedin_url: Option<String>,
    pub willing_to_relocate: Option<bool>,
    #[validate(range(min = 0))]
    pub salary_expectation: Option<i32>,
    pub is_open_to_opportunities: Option<bool>,
}

fn validate_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(ValidationError::new("end_date_before_start_date"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_education_dates"))]
pub struct EducationPayload {
    #[validate(length(min = 1, max = 200))]
    pub institution: String,
    #[validate(length(min = 1, max = 200))]
    pub degree: String,
    #[validate(length(max = 200))]
    pub field_of_study: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn validate_education_dates(payload: &EducationPayload) -> Result<(), ValidationError> {
    validate_date_range(payload.start_date, payload.end_date)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_experience_dates"))]
pub struct ExperiencePayload {
    #[validate(length(min = 1, max = 200))]
    pub company: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub current: bool,
}

fn validate_experience_dates(payload: &ExperiencePayload) -> Result<(), ValidationError> {
    validate_date_range(Some(payload.start_date), payload.end_date)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SkillAssignment {
    pub skill_id: Uuid,
    #[validate(length(max = 50))]
    pub proficiency_level: Option<String>,
    #[validate(range(min = 0, max = 70))]
    pub years_experience: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SkillsPayload {
    #[validate(length(max = 100), nested)]
    pub skills: Vec<SkillAssignment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PreferencesPayload {
    #[validate(length(max = 50))]
    pub desired_sectors: Vec<String>,
    #[validate(length(max = 50))]
    pub desired_locations: Vec<String>,
    pub contract_types: Vec<ContractType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettingsPayload {
    pub email_alerts: bool,
    pub job_matches: bool,
    pub application_updates: bool,
}

impl Default for NotificationSettingsPayload {
    fn default() -> Self {
        Self {
            email_alerts: true,
            job_matches: true,
            application_updates: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCvPayload {
    #[validate(url)]
    pub url: String,
    #[validate(length(max = 200))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveCvQuery {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub percentage: u32,
    pub profile_completed: bool,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFullProfile {
    #[serde(flatten)]
    pub profile: CandidateProfile,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub skills: Vec<CandidateSkill>,
    pub preferences: Option<CandidatePreferences>,
    pub notification_settings: Option<CandidateNotificationSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateListQuery {
    pub q: Option<String>,
    /// Comma separated skill names; any one matching is enough.
    pub skills: Option<String>,
    pub min_experience: Option<i32>,
    pub max_experience: Option<i32>,
    pub location: Option<String>,
    pub willing_to_relocate: Option<bool>,
    pub is_open_to_opportunities: Option<bool>,
    pub profile_completed: Option<bool>,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl CandidateListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::resolve(self.page, self.page_size, self.skip, self.limit)
    }

    pub fn filter(&self) -> CandidateFilter {
        CandidateFilter {
            q: self.q.clone(),
            skills: split_list(self.skills.as_deref()),
            min_experience: self.min_experience,
            max_experience: self.max_experience,
            location: self.location.clone(),
            willing_to_relocate: self.willing_to_relocate,
            is_open_to_opportunities: self.is_open_to_opportunities,
            profile_completed: self.profile_completed,
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingJobsQuery {
    pub limit: Option<usize>,
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::company::{Company, CompanySize};
use crate::services::search::CompanyFilter;
use crate::utils::pagination::PageRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCompanyPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 100))]
    pub industry: Option<String>,
    pub size: Option<CompanySize>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCompanyPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub industry: Option<String>,
    pub size: Option<CompanySize>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddMemberPayload {
    pub user_id: Uuid,
    #[validate(length(max = 100))]
    pub title: Option<String>,
    #[serde(default)]
    pub is_primary_contact: bool,
    #[serde(default = "default_true")]
    pub can_post_jobs: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContactPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 100))]
    pub title: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HiringPreferencesPayload {
    #[validate(range(min = 0, max = 50))]
    pub preferred_experience_years: Option<i32>,
    #[validate(length(max = 200))]
    pub required_education: Option<String>,
    #[validate(length(max = 50))]
    pub culture_values: Vec<String>,
    #[validate(length(max = 50))]
    pub interview_process: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumPayload {
    pub is_premium: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDashboard {
    pub company: Company,
    pub active_jobs: i64,
    pub total_jobs: i64,
    pub active_applications: i64,
    pub scheduled_interviews: i64,
    pub pending_offers: i64,
    pub total_hires: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyListQuery {
    pub q: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub size: Option<String>,
    pub is_verified: Option<bool>,
    pub is_premium: Option<bool>,
    pub has_open_positions: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl CompanyListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::resolve(self.page, self.page_size, self.skip, self.limit)
    }

    pub fn filter(&self) -> CompanyFilter {
        CompanyFilter {
            q: self.q.clone(),
            industry: self.industry.clone(),
            location: self.location.clone(),
            size: self.size.clone(),
            is_verified: self.is_verified,
            is_premium: self.is_premium,
            has_open_positions: self.has_open_positions,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }
}

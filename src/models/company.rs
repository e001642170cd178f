use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum! {
    pub enum CompanySize {
        Micro => "1-10",
        Small => "10-50",
        Medium => "50-200",
        Large => "200-1000",
        Enterprise => "1000+",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub is_verified: bool,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Company with its live job count, as returned by search.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyListing {
    pub id: Uuid,
    pub name: String,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub is_verified: bool,
    pub is_premium: bool,
    pub open_positions: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub title: Option<String>,
    pub is_primary_contact: bool,
    pub can_post_jobs: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub title: Option<String>,
    pub is_primary_contact: bool,
    pub can_post_jobs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyContact {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HiringPreferences {
    pub company_id: Uuid,
    pub preferred_experience_years: Option<i32>,
    pub required_education: Option<String>,
    pub culture_values: Vec<String>,
    pub interview_process: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecruitmentHistory {
    pub id: Uuid,
    pub company_id: Uuid,
    pub job_id: Option<Uuid>,
    pub job_title: String,
    pub date_filled: NaiveDate,
    pub time_to_fill: Option<i32>,
    pub consultant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum! {
    pub enum JobStatus {
        Draft => "Draft",
        Open => "Open",
        Closed => "Closed",
        Filled => "Filled",
        Cancelled => "Cancelled",
    }
}

text_enum! {
    pub enum ContractType {
        Permanent => "Permanent",
        Contract => "Contract",
        Freelance => "Freelance",
        Internship => "Internship",
    }
}

text_enum! {
    pub enum ProficiencyLevel {
        Beginner => "Beginner",
        Intermediate => "Intermediate",
        Advanced => "Advanced",
        Expert => "Expert",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub company_id: Uuid,
    pub posted_by: Option<Uuid>,
    pub assigned_consultant_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub responsibilities: JsonValue,
    pub requirements: JsonValue,
    pub location: Option<String>,
    #[sqlx(try_from = "String")]
    pub contract_type: ContractType,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub remote_option: bool,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub positions_available: i32,
    pub application_count: i32,
    pub view_count: i32,
    pub posting_date: Option<NaiveDate>,
    pub deadline_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Job with its company name and skill tags, as returned by search.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub job: Job,
    pub company_name: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobSkill {
    pub skill_id: Uuid,
    pub name: String,
    pub is_required: bool,
    pub proficiency_level: Option<String>,
}

/// Open job reduced to what skill matching needs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobMatchCandidate {
    pub id: Uuid,
    pub title: String,
    pub company_name: String,
    pub location: Option<String>,
    pub skills: Vec<String>,
}

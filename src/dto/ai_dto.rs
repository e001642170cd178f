use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnalyzeCvPayload {
    #[validate(length(min = 1, max = 100000))]
    pub cv_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub years: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvAnalysis {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub total_experience_years: i32,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchJobsPayload {
    #[validate(length(min = 1, max = 200))]
    pub skills: Vec<String>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatch {
    pub job_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub location: Option<String>,
    pub match_score: f64,
    pub matching_skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateEmailPayload {
    #[validate(length(min = 1, max = 100))]
    pub template_id: String,
    #[serde(default)]
    pub context: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplateInfo {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub description: String,
    pub placeholders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InterviewQuestionsPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub company_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Optional candidate background to tailor the questions.
    pub candidate: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub question: String,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_guidance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobDescriptionPayload {
    #[validate(length(min = 1, max = 200))]
    pub position: String,
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    pub industry: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDescription {
    pub title: String,
    pub company_overview: String,
    pub role_summary: String,
    pub key_responsibilities: Vec<String>,
    pub required_qualifications: Vec<String>,
    pub preferred_qualifications: Vec<String>,
    pub required_skills: Vec<String>,
    pub benefits: Vec<String>,
    pub application_process: String,
    pub full_text: String,
}

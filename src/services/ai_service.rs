use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value as JsonValue};
use sqlx::PgPool;

use crate::dto::ai_dto::{
    CvAnalysis, EmailDraft, EmailTemplateInfo, InterviewQuestion, InterviewQuestionsPayload,
    JobDescription, JobDescriptionPayload, JobMatch,
};
use crate::error::{Error, Result};
use crate::models::job::JobMatchCandidate;
use crate::services::cv_analyzer::{self, EmailTemplate, EMAIL_TEMPLATES};
use crate::utils::time::current_year;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Text generation backend. The service tries the language model first and
/// answers from the rule-based strategy when it fails.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssistStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze_cv(&self, cv_text: &str) -> Result<CvAnalysis>;

    async fn generate_email(
        &self,
        template: &'static EmailTemplate,
        context: &Map<String, JsonValue>,
    ) -> Result<EmailDraft>;

    async fn interview_questions(
        &self,
        request: &InterviewQuestionsPayload,
    ) -> Result<Vec<InterviewQuestion>>;

    async fn job_description(&self, request: &JobDescriptionPayload) -> Result<JobDescription>;
}

#[derive(Clone, Copy)]
pub struct RuleBasedAssistant {
    year: fn() -> i32,
}

impl RuleBasedAssistant {
    pub fn new() -> Self {
        Self { year: current_year }
    }

    pub fn with_year(year: fn() -> i32) -> Self {
        Self { year }
    }
}

impl Default for RuleBasedAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssistStrategy for RuleBasedAssistant {
    fn name(&self) -> &'static str {
        "rule_based"
    }

    async fn analyze_cv(&self, cv_text: &str) -> Result<CvAnalysis> {
        Ok(cv_analyzer::analyze_cv(cv_text, (self.year)()))
    }

    async fn generate_email(
        &self,
        template: &'static EmailTemplate,
        context: &Map<String, JsonValue>,
    ) -> Result<EmailDraft> {
        Ok(cv_analyzer::render_template(template, context))
    }

    async fn interview_questions(
        &self,
        request: &InterviewQuestionsPayload,
    ) -> Result<Vec<InterviewQuestion>> {
        Ok(cv_analyzer::basic_interview_questions(&request.title))
    }

    async fn job_description(&self, request: &JobDescriptionPayload) -> Result<JobDescription> {
        Ok(cv_analyzer::basic_job_description(
            &request.position,
            &request.company_name,
            request.industry.as_deref(),
            &request.required_skills,
        ))
    }
}

#[derive(Clone)]
pub struct OpenAiAssistant {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiAssistant {
    pub fn new(api_key: String, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    async fn chat_json(&self, system: &str, user: String, temperature: f32) -> Result<JsonValue> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "response_format": { "type": "json_object" },
            "temperature": temperature
        });

        let res = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(LLM_TIMEOUT)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("OpenAI API Error {}: {}", status, text).into());
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response format").into())
    }
}

#[async_trait]
impl AssistStrategy for OpenAiAssistant {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn analyze_cv(&self, cv_text: &str) -> Result<CvAnalysis> {
        let system = "You are an expert CV analyst. Extract structured data from the CV. \
            Return a JSON object with fields: skills (array of strings), education (array of \
            {degree, institution, years}), experience (array of {title, company, duration}), \
            total_experience_years (integer) and summary (2-3 sentences).";
        let raw = self.chat_json(system, cv_text.to_string(), 0.2).await?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn generate_email(
        &self,
        template: &'static EmailTemplate,
        context: &Map<String, JsonValue>,
    ) -> Result<EmailDraft> {
        let base = cv_analyzer::render_template(template, context);
        let system = "You are a professional recruitment consultant writing to candidates and \
            employers. Personalise the draft email using the context. Keep it concise and \
            professional. Return a JSON object with fields subject and body.";
        let user = json!({
            "purpose": template.purpose,
            "draft_subject": base.subject,
            "draft_body": base.body,
            "context": context,
        })
        .to_string();
        let raw = self.chat_json(system, user, 0.7).await?;
        Ok(EmailDraft {
            subject: raw
                .get("subject")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .unwrap_or(base.subject),
            body: raw
                .get("body")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .unwrap_or(base.body),
        })
    }

    async fn interview_questions(
        &self,
        request: &InterviewQuestionsPayload,
    ) -> Result<Vec<InterviewQuestion>> {
        let system = "You are an expert recruitment interview specialist. Generate 7-10 \
            job-specific interview questions mixing behavioral, situational, technical and \
            experience-based questions. Return a JSON object with a 'questions' array of \
            {question, purpose, evaluation_guidance}.";
        let raw = self.chat_json(system, serde_json::to_string(request)?, 0.5).await?;
        let questions = raw
            .get("questions")
            .cloned()
            .filter(JsonValue::is_array)
            .unwrap_or(raw);
        let questions: Vec<InterviewQuestion> = serde_json::from_value(questions)?;
        if questions.is_empty() {
            return Err(Error::Internal("Model returned no interview questions".to_string()));
        }
        Ok(questions)
    }

    async fn job_description(&self, request: &JobDescriptionPayload) -> Result<JobDescription> {
        let system = "You are an expert recruitment content writer. Write a compelling, \
            well-structured job description of 400-600 words without discriminatory language. \
            Return a JSON object with fields title, company_overview, role_summary, \
            key_responsibilities, required_qualifications, preferred_qualifications, \
            required_skills, benefits, application_process and full_text.";
        let raw = self.chat_json(system, serde_json::to_string(request)?, 0.6).await?;
        Ok(serde_json::from_value(raw)?)
    }
}

#[derive(Clone)]
pub struct AIService {
    pool: PgPool,
    llm: Option<Arc<dyn AssistStrategy>>,
    fallback: Arc<dyn AssistStrategy>,
}

impl AIService {
    pub fn new(
        pool: PgPool,
        llm: Option<Arc<dyn AssistStrategy>>,
        fallback: Arc<dyn AssistStrategy>,
    ) -> Self {
        Self {
            pool,
            llm,
            fallback,
        }
    }

    /// LLM-backed when an API key is configured, rule-based otherwise.
    pub fn from_config(pool: PgPool, api_key: Option<String>, model: String, client: Client) -> Self {
        let llm = api_key.map(|key| {
            Arc::new(OpenAiAssistant::new(key, model, client)) as Arc<dyn AssistStrategy>
        });
        if llm.is_none() {
            tracing::info!("OPENAI_API_KEY not set; AI tools use rule-based generation");
        }
        Self::new(pool, llm, Arc::new(RuleBasedAssistant::new()))
    }

    fn log_fallback(&self, operation: &str, error: &Error) {
        tracing::warn!(operation, error = %error, "language model call failed; using rule-based fallback");
    }

    pub async fn analyze_cv(&self, cv_text: &str) -> Result<CvAnalysis> {
        if let Some(llm) = &self.llm {
            match llm.analyze_cv(cv_text).await {
                Ok(analysis) => return Ok(analysis),
                Err(e) => self.log_fallback("analyze_cv", &e),
            }
        }
        self.fallback.analyze_cv(cv_text).await
    }

    pub async fn generate_email(
        &self,
        template_id: &str,
        context: &Map<String, JsonValue>,
    ) -> Result<EmailDraft> {
        let template = cv_analyzer::find_template(template_id)
            .ok_or_else(|| Error::NotFound(format!("Template with ID {} not found", template_id)))?;
        if let Some(llm) = &self.llm {
            match llm.generate_email(template, context).await {
                Ok(draft) => return Ok(draft),
                Err(e) => self.log_fallback("generate_email", &e),
            }
        }
        self.fallback.generate_email(template, context).await
    }

    pub async fn interview_questions(
        &self,
        request: &InterviewQuestionsPayload,
    ) -> Result<Vec<InterviewQuestion>> {
        if let Some(llm) = &self.llm {
            match llm.interview_questions(request).await {
                Ok(questions) => return Ok(questions),
                Err(e) => self.log_fallback("interview_questions", &e),
            }
        }
        self.fallback.interview_questions(request).await
    }

    pub async fn job_description(&self, request: &JobDescriptionPayload) -> Result<JobDescription> {
        if let Some(llm) = &self.llm {
            match llm.job_description(request).await {
                Ok(description) => return Ok(description),
                Err(e) => self.log_fallback("job_description", &e),
            }
        }
        self.fallback.job_description(request).await
    }

    pub fn email_templates(&self) -> Vec<EmailTemplateInfo> {
        EMAIL_TEMPLATES
            .iter()
            .map(|t| {
                let mut placeholders = cv_analyzer::placeholders(t.subject);
                for name in cv_analyzer::placeholders(t.body) {
                    if !placeholders.contains(&name) {
                        placeholders.push(name);
                    }
                }
                EmailTemplateInfo {
                    id: t.id.to_string(),
                    name: title_case(t.id),
                    subject: t.subject.to_string(),
                    description: t.purpose.to_string(),
                    placeholders,
                }
            })
            .collect()
    }

    /// Open jobs with their skill tags, in posting order.
    pub async fn open_jobs(&self) -> Result<Vec<JobMatchCandidate>> {
        let jobs = sqlx::query_as::<_, JobMatchCandidate>(
            r#"
            SELECT j.id, j.title, c.name AS company_name, j.location,
                   ARRAY(SELECT s.name FROM job_skills js JOIN skills s ON s.id = js.skill_id
                         WHERE js.job_id = j.id ORDER BY s.name) AS skills
            FROM jobs j
            JOIN companies c ON c.id = j.company_id
            WHERE j.status = 'Open'
            ORDER BY j.posting_date DESC NULLS LAST, j.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    pub async fn match_jobs(&self, skills: &[String], limit: Option<usize>) -> Result<Vec<JobMatch>> {
        let jobs = self.open_jobs().await?;
        let mut matches = cv_analyzer::rank_jobs(skills, &jobs);
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        tracing::debug!(jobs = jobs.len(), matches = matches.len(), "jobs matched");
        Ok(matches)
    }
}

fn title_case(id: &str) -> String {
    id.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::pool::create_lazy_pool;

    fn lazy_pool() -> PgPool {
        let config = Config {
            server_address: "127.0.0.1:0".into(),
            database_url: "postgres://localhost/unused".into(),
            database_max_connections: 1,
            secret_key: "test".into(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".into(),
            cors_origins: vec![],
            api_rps: 100,
            environment: "test".into(),
        };
        create_lazy_pool(&config).expect("lazy pool")
    }

    fn year_2024() -> i32 {
        2024
    }

    #[tokio::test]
    async fn failing_model_falls_back_to_rules() {
        let mut llm = MockAssistStrategy::new();
        llm.expect_analyze_cv()
            .returning(|_| Err(Error::Internal("timeout".into())));
        let service = AIService::new(
            lazy_pool(),
            Some(Arc::new(llm)),
            Arc::new(RuleBasedAssistant::with_year(year_2024)),
        );
        let analysis = service
            .analyze_cv("WORK EXPERIENCE\nEngineer | Acme | 2018 - Present\n")
            .await
            .expect("fallback answers");
        assert_eq!(analysis.total_experience_years, 6);
    }

    #[tokio::test]
    async fn model_answer_is_used_when_available() {
        let mut llm = MockAssistStrategy::new();
        llm.expect_interview_questions().returning(|_| {
            Ok(vec![InterviewQuestion {
                question: "Why Rust?".into(),
                purpose: "Motivation".into(),
                evaluation_guidance: None,
            }])
        });
        let service = AIService::new(
            lazy_pool(),
            Some(Arc::new(llm)),
            Arc::new(RuleBasedAssistant::new()),
        );
        let request = InterviewQuestionsPayload {
            title: "Engineer".into(),
            company_name: None,
            description: None,
            requirements: vec![],
            skills: vec![],
            candidate: None,
        };
        let questions = service.interview_questions(&request).await.expect("questions");
        assert_eq!(questions.len(), 1);
    }

    #[tokio::test]
    async fn unknown_template_is_not_found() {
        let service = AIService::new(lazy_pool(), None, Arc::new(RuleBasedAssistant::new()));
        let err = service
            .generate_email("no_such_template", &Map::new())
            .await
            .expect_err("unknown template");
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn templates_list_their_placeholders() {
        let service = AIService::new(lazy_pool(), None, Arc::new(RuleBasedAssistant::new()));
        let templates = service.email_templates();
        let offer = templates
            .iter()
            .find(|t| t.id == "offer_letter")
            .expect("offer template");
        assert_eq!(offer.name, "Offer Letter");
        assert!(offer.placeholders.contains(&"offer_salary".to_string()));
        assert_eq!(offer.placeholders[0], "job_title");
    }
}

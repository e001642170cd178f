//! Filter-and-paginate query builders for the searchable collections.
//!
//! Each builder produces two statements over the same predicate: the page of
//! rows and the total count before `LIMIT`/`OFFSET`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::ApplicationStatus;
use crate::models::job::{ContractType, JobStatus};
use crate::utils::like_pattern;
use crate::utils::pagination::{Page, PageRequest};

pub struct SearchQuery {
    pub items: QueryBuilder<'static, Postgres>,
    pub count: QueryBuilder<'static, Postgres>,
}

impl SearchQuery {
    /// Runs the count and the page; errors propagate rather than yielding an empty page.
    pub async fn fetch<T>(mut self, pool: &PgPool, page: PageRequest) -> Result<Page<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let total: i64 = self.count.build_query_scalar().fetch_one(pool).await?;
        let items = self.items.build_query_as::<T>().fetch_all(pool).await?;
        Ok(Page::new(items, total, page))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: &'static str,
    pub descending: bool,
}

/// Maps a requested sort key through `whitelist`; unknown keys fall back to
/// `default_column` descending.
pub fn resolve_sort(
    sort_by: Option<&str>,
    sort_order: Option<&str>,
    whitelist: &[(&str, &'static str)],
    default_column: &'static str,
) -> SortSpec {
    let found = sort_by.and_then(|key| {
        whitelist
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key.trim()))
            .map(|(_, column)| *column)
    });
    match found {
        Some(column) => SortSpec {
            column,
            descending: !matches!(sort_order.map(str::trim), Some(o) if o.eq_ignore_ascii_case("asc")),
        },
        None => SortSpec {
            column: default_column,
            descending: true,
        },
    }
}

/// Appends `WHERE`/`AND` as conditions accumulate.
struct Conditions<'a> {
    qb: &'a mut QueryBuilder<'static, Postgres>,
    started: bool,
}

impl<'a> Conditions<'a> {
    fn new(qb: &'a mut QueryBuilder<'static, Postgres>) -> Self {
        Self { qb, started: false }
    }

    fn and(&mut self) -> &mut QueryBuilder<'static, Postgres> {
        self.qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
        self.qb
    }

    /// `(col1 ILIKE p OR col2 ILIKE p ...)` with the escaped substring pattern.
    fn text_match(&mut self, columns: &[&str], term: &str, extra: Option<&str>) {
        let pattern = like_pattern(term);
        let qb = self.and();
        qb.push("(");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
        }
        if let Some(subquery) = extra {
            qb.push(" OR ").push(subquery).push_bind(pattern).push(")");
        }
        qb.push(")");
    }

    fn exact<T>(&mut self, column: &str, value: T)
    where
        T: 'static + Send + sqlx::Encode<'static, Postgres> + sqlx::Type<Postgres>,
    {
        self.and().push(column).push(" = ").push_bind(value);
    }

    fn at_least<T>(&mut self, column: &str, value: T)
    where
        T: 'static + Send + sqlx::Encode<'static, Postgres> + sqlx::Type<Postgres>,
    {
        self.and().push(column).push(" >= ").push_bind(value);
    }

    fn at_most<T>(&mut self, column: &str, value: T)
    where
        T: 'static + Send + sqlx::Encode<'static, Postgres> + sqlx::Type<Postgres>,
    {
        self.and().push(column).push(" <= ").push_bind(value);
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn finish(
    items: &mut QueryBuilder<'static, Postgres>,
    sort: SortSpec,
    tiebreak: &str,
    page: PageRequest,
) {
    items
        .push(" ORDER BY ")
        .push(sort.column)
        .push(if sort.descending { " DESC NULLS LAST" } else { " ASC NULLS LAST" })
        .push(", ")
        .push(tiebreak)
        .push(" LIMIT ")
        .push_bind(page.page_size)
        .push(" OFFSET ")
        .push_bind(page.offset);
}

// Candidates

pub const CANDIDATE_SORTS: &[(&str, &str)] = &[
    ("created_at", "cp.created_at"),
    ("updated_at", "cp.updated_at"),
    ("years_of_experience", "cp.years_of_experience"),
    ("last_name", "u.last_name"),
    ("salary_expectation", "cp.salary_expectation"),
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CandidateFilter {
    pub q: Option<String>,
    /// A candidate matches when any one of these skills is on their profile.
    pub skills: Vec<String>,
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
}

fn push_candidate_filters(qb: &mut QueryBuilder<'static, Postgres>, filter: &CandidateFilter) {
    let mut cond = Conditions::new(qb);
    cond.and().push("u.is_active = TRUE");
    if let Some(q) = non_blank(&filter.q) {
        cond.text_match(
            &[
                "u.first_name",
                "u.last_name",
                "u.email",
                "cp.current_position",
                "cp.current_company",
                "cp.summary",
                "cp.location",
            ],
            q,
            Some(
                "EXISTS (SELECT 1 FROM candidate_skills cs JOIN skills s ON s.id = cs.skill_id \
                 WHERE cs.candidate_id = cp.id AND s.name ILIKE ",
            ),
        );
    }
    let skills = lowercase_all(&filter.skills);
    if !skills.is_empty() {
        cond.and()
            .push(
                "EXISTS (SELECT 1 FROM candidate_skills cs JOIN skills s ON s.id = cs.skill_id \
                 WHERE cs.candidate_id = cp.id AND LOWER(s.name) = ANY(",
            )
            .push_bind(skills)
            .push("))");
    }
    if let Some(min) = filter.min_experience {
        cond.at_least("cp.years_of_experience", min);
    }
    if let Some(max) = filter.max_experience {
        cond.at_most("cp.years_of_experience", max);
    }
    if let Some(location) = non_blank(&filter.location) {
        cond.text_match(&["cp.location", "cp.city", "cp.country"], location, None);
    }
    if let Some(flag) = filter.willing_to_relocate {
        cond.exact("cp.willing_to_relocate", flag);
    }
    if let Some(flag) = filter.is_open_to_opportunities {
        cond.exact("cp.is_open_to_opportunities", flag);
    }
    if let Some(flag) = filter.profile_completed {
        cond.exact("cp.profile_completed", flag);
    }
    if let Some(min) = filter.min_salary {
        cond.at_least("cp.salary_expectation", min);
    }
    if let Some(max) = filter.max_salary {
        cond.at_most("cp.salary_expectation", max);
    }
}

pub fn candidate_search(filter: &CandidateFilter, page: PageRequest) -> SearchQuery {
    const FROM: &str = " FROM candidate_profiles cp JOIN users u ON u.id = cp.user_id";

    let mut items = QueryBuilder::new(
        "SELECT cp.id, cp.user_id, u.first_name, u.last_name, u.email, cp.current_position, \
         cp.current_company, cp.summary, cp.years_of_experience, cp.location, \
         cp.willing_to_relocate, cp.salary_expectation, cp.is_open_to_opportunities, \
         cp.profile_completed, \
         ARRAY(SELECT s.name FROM candidate_skills cs JOIN skills s ON s.id = cs.skill_id \
               WHERE cs.candidate_id = cp.id ORDER BY s.name) AS skills, \
         cp.created_at, cp.updated_at",
    );
    items.push(FROM);
    push_candidate_filters(&mut items, filter);
    let sort = resolve_sort(
        filter.sort_by.as_deref(),
        filter.sort_order.as_deref(),
        CANDIDATE_SORTS,
        "cp.created_at",
    );
    finish(&mut items, sort, "cp.id", page);

    let mut count = QueryBuilder::new("SELECT COUNT(*)");
    count.push(FROM);
    push_candidate_filters(&mut count, filter);

    SearchQuery { items, count }
}

// Jobs

pub const JOB_SORTS: &[(&str, &str)] = &[
    ("created_at", "j.created_at"),
    ("posting_date", "j.posting_date"),
    ("deadline_date", "j.deadline_date"),
    ("title", "j.title"),
    ("salary_min", "j.salary_min"),
    ("salary_max", "j.salary_max"),
    ("application_count", "j.application_count"),
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobFilter {
    pub q: Option<String>,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub company_id: Option<Uuid>,
    pub status: Option<JobStatus>,
    pub contract_type: Option<ContractType>,
    pub remote_option: Option<bool>,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub consultant_id: Option<Uuid>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

fn push_job_filters(qb: &mut QueryBuilder<'static, Postgres>, filter: &JobFilter) {
    let mut cond = Conditions::new(qb);
    if let Some(q) = non_blank(&filter.q) {
        cond.text_match(
            &[
                "j.title",
                "j.description",
                "j.location",
                "c.name",
                "j.requirements::text",
            ],
            q,
            Some(
                "EXISTS (SELECT 1 FROM job_skills js JOIN skills s ON s.id = js.skill_id \
                 WHERE js.job_id = j.id AND s.name ILIKE ",
            ),
        );
    }
    let skills = lowercase_all(&filter.skills);
    if !skills.is_empty() {
        cond.and()
            .push(
                "EXISTS (SELECT 1 FROM job_skills js JOIN skills s ON s.id = js.skill_id \
                 WHERE js.job_id = j.id AND LOWER(s.name) = ANY(",
            )
            .push_bind(skills)
            .push("))");
    }
    if let Some(location) = non_blank(&filter.location) {
        cond.text_match(&["j.location"], location, None);
    }
    if let Some(company_id) = filter.company_id {
        cond.exact("j.company_id", company_id);
    }
    if let Some(status) = filter.status {
        cond.exact("j.status", status.as_str());
    }
    if let Some(contract_type) = filter.contract_type {
        cond.exact("j.contract_type", contract_type.as_str());
    }
    if let Some(remote) = filter.remote_option {
        cond.exact("j.remote_option", remote);
    }
    if let Some(min) = filter.min_salary {
        cond.at_least("j.salary_min", min);
    }
    if let Some(max) = filter.max_salary {
        cond.at_most("j.salary_max", max);
    }
    if let Some(consultant_id) = filter.consultant_id {
        cond.exact("j.assigned_consultant_id", consultant_id);
    }
}

pub fn job_search(filter: &JobFilter, page: PageRequest) -> SearchQuery {
    const FROM: &str = " FROM jobs j JOIN companies c ON c.id = j.company_id";

    let mut items = QueryBuilder::new(
        "SELECT j.*, c.name AS company_name, \
         ARRAY(SELECT s.name FROM job_skills js JOIN skills s ON s.id = js.skill_id \
               WHERE js.job_id = j.id ORDER BY s.name) AS skills",
    );
    items.push(FROM);
    push_job_filters(&mut items, filter);
    let sort = resolve_sort(
        filter.sort_by.as_deref(),
        filter.sort_order.as_deref(),
        JOB_SORTS,
        "j.created_at",
    );
    finish(&mut items, sort, "j.id", page);

    let mut count = QueryBuilder::new("SELECT COUNT(*)");
    count.push(FROM);
    push_job_filters(&mut count, filter);

    SearchQuery { items, count }
}

// Companies

pub const COMPANY_SORTS: &[(&str, &str)] = &[
    ("created_at", "c.created_at"),
    ("name", "c.name"),
    ("industry", "c.industry"),
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompanyFilter {
    pub q: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub size: Option<String>,
    pub is_verified: Option<bool>,
    pub is_premium: Option<bool>,
    pub has_open_positions: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

const OPEN_JOB_EXISTS: &str =
    "EXISTS (SELECT 1 FROM jobs oj WHERE oj.company_id = c.id AND oj.status = 'Open')";

fn push_company_filters(qb: &mut QueryBuilder<'static, Postgres>, filter: &CompanyFilter) {
    let mut cond = Conditions::new(qb);
    if let Some(q) = non_blank(&filter.q) {
        cond.text_match(
            &["c.name", "c.industry", "c.description", "c.location"],
            q,
            Some(
                "EXISTS (SELECT 1 FROM company_contacts cc WHERE cc.company_id = c.id AND cc.name ILIKE ",
            ),
        );
    }
    if let Some(industry) = non_blank(&filter.industry) {
        cond.text_match(&["c.industry"], industry, None);
    }
    if let Some(location) = non_blank(&filter.location) {
        cond.text_match(&["c.location"], location, None);
    }
    if let Some(size) = non_blank(&filter.size) {
        cond.exact("c.size", size.to_string());
    }
    if let Some(flag) = filter.is_verified {
        cond.exact("c.is_verified", flag);
    }
    if let Some(flag) = filter.is_premium {
        cond.exact("c.is_premium", flag);
    }
    match filter.has_open_positions {
        Some(true) => {
            cond.and().push(OPEN_JOB_EXISTS);
        }
        Some(false) => {
            cond.and().push("NOT ").push(OPEN_JOB_EXISTS);
        }
        None => {}
    }
}

pub fn company_search(filter: &CompanyFilter, page: PageRequest) -> SearchQuery {
    const FROM: &str = " FROM companies c";

    let mut items = QueryBuilder::new(
        "SELECT c.*, (SELECT COUNT(*) FROM jobs oj WHERE oj.company_id = c.id AND oj.status = 'Open') \
         AS open_positions",
    );
    items.push(FROM);
    push_company_filters(&mut items, filter);
    let sort = resolve_sort(
        filter.sort_by.as_deref(),
        filter.sort_order.as_deref(),
        COMPANY_SORTS,
        "c.created_at",
    );
    finish(&mut items, sort, "c.id", page);

    let mut count = QueryBuilder::new("SELECT COUNT(*)");
    count.push(FROM);
    push_company_filters(&mut count, filter);

    SearchQuery { items, count }
}

// Applications

pub const APPLICATION_SORTS: &[(&str, &str)] = &[
    ("created_at", "a.created_at"),
    ("applied_at", "a.applied_at"),
    ("updated_at", "a.updated_at"),
    ("status", "a.status"),
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationFilter {
    pub q: Option<String>,
    /// Any of these statuses.
    pub statuses: Vec<ApplicationStatus>,
    pub job_id: Option<Uuid>,
    pub candidate_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub consultant_id: Option<Uuid>,
    pub applied_from: Option<DateTime<Utc>>,
    pub applied_to: Option<DateTime<Utc>>,
    /// Restricts results to these companies (employer visibility).
    #[serde(skip)]
    pub company_scope: Option<Vec<Uuid>>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

fn push_application_filters(qb: &mut QueryBuilder<'static, Postgres>, filter: &ApplicationFilter) {
    let mut cond = Conditions::new(qb);
    if let Some(q) = non_blank(&filter.q) {
        cond.text_match(
            &["j.title", "c.name", "u.first_name", "u.last_name", "u.email"],
            q,
            None,
        );
    }
    if !filter.statuses.is_empty() {
        let statuses: Vec<String> = filter
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        cond.and()
            .push("a.status = ANY(")
            .push_bind(statuses)
            .push(")");
    }
    if let Some(job_id) = filter.job_id {
        cond.exact("a.job_id", job_id);
    }
    if let Some(candidate_id) = filter.candidate_id {
        cond.exact("a.candidate_id", candidate_id);
    }
    if let Some(company_id) = filter.company_id {
        cond.exact("j.company_id", company_id);
    }
    if let Some(consultant_id) = filter.consultant_id {
        cond.exact("a.consultant_id", consultant_id);
    }
    if let Some(from) = filter.applied_from {
        cond.at_least("a.applied_at", from);
    }
    if let Some(to) = filter.applied_to {
        cond.at_most("a.applied_at", to);
    }
    if let Some(scope) = &filter.company_scope {
        cond.and()
            .push("j.company_id = ANY(")
            .push_bind(scope.clone())
            .push(")");
    }
}

pub fn application_search(filter: &ApplicationFilter, page: PageRequest) -> SearchQuery {
    const FROM: &str = " FROM applications a \
         JOIN jobs j ON j.id = a.job_id \
         JOIN companies c ON c.id = j.company_id \
         JOIN candidate_profiles cp ON cp.id = a.candidate_id \
         JOIN users u ON u.id = cp.user_id";

    let mut items = QueryBuilder::new(
        "SELECT a.id, a.candidate_id, a.job_id, a.consultant_id, a.status, a.applied_at, \
         a.interview_date, a.offer_salary, a.offer_currency, a.version, j.title AS job_title, \
         j.company_id, c.name AS company_name, (u.first_name || ' ' || u.last_name) AS candidate_name, \
         u.email AS candidate_email, a.created_at, a.updated_at",
    );
    items.push(FROM);
    push_application_filters(&mut items, filter);
    let sort = resolve_sort(
        filter.sort_by.as_deref(),
        filter.sort_order.as_deref(),
        APPLICATION_SORTS,
        "a.created_at",
    );
    finish(&mut items, sort, "a.id", page);

    let mut count = QueryBuilder::new("SELECT COUNT(*)");
    count.push(FROM);
    push_application_filters(&mut count, filter);

    SearchQuery { items, count }
}

/// Splits a comma separated query parameter into trimmed, non-empty parts.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_falls_back_to_created_at_desc() {
        let sort = resolve_sort(Some("password_hash"), Some("asc"), CANDIDATE_SORTS, "cp.created_at");
        assert_eq!(
            sort,
            SortSpec {
                column: "cp.created_at",
                descending: true
            }
        );
    }

    #[test]
    fn whitelisted_sort_honours_direction() {
        let sort = resolve_sort(Some("title"), Some("ASC"), JOB_SORTS, "j.created_at");
        assert_eq!(sort.column, "j.title");
        assert!(!sort.descending);
        let sort = resolve_sort(Some("title"), None, JOB_SORTS, "j.created_at");
        assert!(sort.descending);
    }

    #[test]
    fn empty_filter_has_no_predicates_and_count_matches() {
        let query = job_search(&JobFilter::default(), PageRequest::default());
        let items = query.items.sql();
        assert!(!items.contains("WHERE"));
        assert!(items.contains("ORDER BY j.created_at DESC"));
        assert!(items.contains("LIMIT $1 OFFSET $2"));
        assert_eq!(
            query.count.sql(),
            "SELECT COUNT(*) FROM jobs j JOIN companies c ON c.id = j.company_id"
        );
    }

    #[test]
    fn skill_filter_uses_any_semantics() {
        let filter = CandidateFilter {
            skills: vec!["Python".into(), " SQL ".into()],
            ..Default::default()
        };
        let query = candidate_search(&filter, PageRequest::default());
        let sql = query.count.sql();
        assert!(sql.contains("u.is_active = TRUE AND EXISTS"));
        assert!(sql.contains("LOWER(s.name) = ANY($1)"));
    }

    #[test]
    fn ranges_are_inclusive_and_share_the_predicate() {
        let filter = CandidateFilter {
            min_experience: Some(2),
            max_experience: Some(5),
            ..Default::default()
        };
        let query = candidate_search(&filter, PageRequest::default());
        let count = query.count.sql().to_string();
        assert!(count.contains("cp.years_of_experience >= $1"));
        assert!(count.contains("cp.years_of_experience <= $2"));
        let items = query.items.sql();
        assert!(items.contains("cp.years_of_experience >= $1 AND cp.years_of_experience <= $2"));
        assert!(items.ends_with("LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn text_query_covers_every_column() {
        let filter = CompanyFilter {
            q: Some("acme".into()),
            has_open_positions: Some(false),
            ..Default::default()
        };
        let query = company_search(&filter, PageRequest::default());
        let sql = query.count.sql();
        assert!(sql.contains("c.name ILIKE $1 OR c.industry ILIKE $2"));
        assert!(sql.contains("cc.name ILIKE $5)"));
        assert!(sql.contains("AND NOT EXISTS"));
    }

    #[test]
    fn application_scope_restricts_companies() {
        let filter = ApplicationFilter {
            statuses: vec![ApplicationStatus::Hired, ApplicationStatus::OfferMade],
            company_scope: Some(vec![Uuid::nil()]),
            ..Default::default()
        };
        let query = application_search(&filter, PageRequest::default());
        let sql = query.count.sql();
        assert!(sql.contains("a.status = ANY($1)"));
        assert!(sql.contains("j.company_id = ANY($2)"));
    }

    #[test]
    fn list_params_split_on_commas() {
        assert_eq!(split_list(Some("Python, SQL,,")), vec!["Python", "SQL"]);
        assert!(split_list(None).is_empty());
    }
}

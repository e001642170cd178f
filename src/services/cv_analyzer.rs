//! Deterministic text analysis used when no language model is available.
//!
//! CV sections are recognised by header lines (`SKILLS`, `EDUCATION`,
//! `WORK EXPERIENCE`), matched case-insensitively.

use serde_json::{Map, Value as JsonValue};

use crate::config::JOB_MATCH_THRESHOLD;
use crate::dto::ai_dto::{
    CvAnalysis, EducationEntry, EmailDraft, ExperienceEntry, InterviewQuestion, JobDescription,
    JobMatch,
};
use crate::models::job::JobMatchCandidate;

const KNOWN_SKILLS: &[&str] = &[
    "Python",
    "JavaScript",
    "Java",
    "C#",
    "React",
    "Angular",
    "Node.js",
    "SQL",
    "AWS",
    "Docker",
    "Kubernetes",
    "Digital Marketing",
    "SEO",
    "Content Strategy",
    "Social Media",
];

const SUMMARY_SKILL_COUNT: usize = 5;

pub fn analyze_cv(text: &str, current_year: i32) -> CvAnalysis {
    let skills = extract_skills(text);
    let education = extract_education(text);
    let (experience, total_experience_years) = extract_experience(text, current_year);
    let summary = summarize(&skills, &education, &experience, total_experience_years);
    CvAnalysis {
        skills,
        education,
        experience,
        total_experience_years,
        summary,
    }
}

fn is_header(line: &str, name: &str) -> bool {
    line.trim().eq_ignore_ascii_case(name)
}

/// Lines after the `name` header, up to the first blank line.
fn section<'a>(text: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let mut lines = text.lines();
    lines.by_ref().find(|line| is_header(line, name))?;
    Some(lines.take_while(|line| !line.trim().is_empty()).collect())
}

fn extract_skills(text: &str) -> Vec<String> {
    if let Some(lines) = section(text, "SKILLS") {
        return lines
            .iter()
            .flat_map(|line| line.split(','))
            .map(str::trim)
            .filter(|skill| !skill.is_empty())
            .map(str::to_string)
            .collect();
    }
    KNOWN_SKILLS
        .iter()
        .filter(|skill| contains_word(text, skill))
        .map(|skill| skill.to_string())
        .collect()
}

/// Case-insensitive match of `word` not embedded in a longer alphanumeric run.
fn contains_word(text: &str, word: &str) -> bool {
    let haystack = text.to_lowercase();
    let needle = word.to_lowercase();
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
        from = start + needle.len().max(1);
        while from < haystack.len() && !haystack.is_char_boundary(from) {
            from += 1;
        }
    }
    false
}

fn extract_education(text: &str) -> Vec<EducationEntry> {
    section(text, "EDUCATION")
        .unwrap_or_default()
        .into_iter()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            (parts.len() >= 2).then(|| EducationEntry {
                degree: parts[0].to_string(),
                institution: parts[1].to_string(),
                years: parts.get(2).map(|s| s.to_string()).unwrap_or_default(),
            })
        })
        .collect()
}

fn extract_experience(text: &str, current_year: i32) -> (Vec<ExperienceEntry>, i32) {
    let mut lines = text.lines();
    if lines
        .by_ref()
        .find(|line| is_header(line, "WORK EXPERIENCE"))
        .is_none()
    {
        return (Vec::new(), 0);
    }

    let mut entries = Vec::new();
    let mut total = 0;
    for line in lines.take_while(|line| !is_header(line, "EDUCATION")) {
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        if parts.len() < 3 {
            continue;
        }
        if let Some((start, end)) = year_span(parts[2], current_year) {
            total += (end - start).max(0);
        }
        entries.push(ExperienceEntry {
            title: parts[0].to_string(),
            company: parts[1].to_string(),
            duration: parts[2].to_string(),
        });
    }
    (entries, total)
}

/// Parses `YYYY - YYYY` or `YYYY - Present` anywhere in `duration`.
fn year_span(duration: &str, current_year: i32) -> Option<(i32, i32)> {
    let (start_str, rest) = duration.split_once('-')?;
    let start = last_year(start_str)?;
    let rest = rest.trim_start();
    if rest
        .get(..7)
        .is_some_and(|word| word.eq_ignore_ascii_case("present"))
    {
        return Some((start, current_year));
    }
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    (digits.len() == 4)
        .then(|| digits.parse().ok())
        .flatten()
        .map(|end| (start, end))
}

fn last_year(text: &str) -> Option<i32> {
    let trimmed = text.trim_end();
    let digits: String = trimmed
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

fn summarize(
    skills: &[String],
    education: &[EducationEntry],
    experience: &[ExperienceEntry],
    years: i32,
) -> String {
    let mut skill_text = skills
        .iter()
        .take(SUMMARY_SKILL_COUNT)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if skills.len() > SUMMARY_SKILL_COUNT {
        skill_text.push_str(&format!(", and {} more", skills.len() - SUMMARY_SKILL_COUNT));
    }
    let level = if education.iter().any(|e| e.degree.contains("Master")) {
        "Master's"
    } else {
        "Bachelor's"
    };

    let mut summary = format!(
        "Candidate with approximately {} years of experience, skilled in {}. Has a {} level education",
        years, skill_text, level
    );
    match experience.first() {
        Some(latest) => summary.push_str(&format!(
            " and most recently worked as a {} at {}.",
            latest.title, latest.company
        )),
        None => summary.push('.'),
    }
    summary
}

fn skills_overlap(a: &str, b: &str) -> bool {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    a.contains(&b) || b.contains(&a)
}

/// Scores each job by the share of its skills the candidate covers.
///
/// Jobs under [`JOB_MATCH_THRESHOLD`] are dropped; equal scores keep input order.
pub fn rank_jobs(cv_skills: &[String], jobs: &[JobMatchCandidate]) -> Vec<JobMatch> {
    let mut matches: Vec<JobMatch> = jobs
        .iter()
        .filter_map(|job| {
            let matching: Vec<String> = cv_skills
                .iter()
                .filter(|skill| job.skills.iter().any(|js| skills_overlap(skill, js)))
                .cloned()
                .collect();
            let score =
                (matching.len() as f64 / job.skills.len().max(1) as f64 * 100.0).min(100.0);
            (score >= JOB_MATCH_THRESHOLD).then(|| JobMatch {
                job_id: job.id,
                job_title: job.title.clone(),
                company_name: job.company_name.clone(),
                location: job.location.clone(),
                match_score: score,
                matching_skills: matching,
            })
        })
        .collect();
    matches.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    matches
}

pub struct EmailTemplate {
    pub id: &'static str,
    pub subject: &'static str,
    pub purpose: &'static str,
    pub body: &'static str,
}

pub const EMAIL_TEMPLATES: &[EmailTemplate] = &[
    EmailTemplate {
        id: "application_received",
        subject: "We received your application for {{job_title}}",
        purpose: "Confirm receipt of an application",
        body: "Dear {{candidate_name}},\n\nThank you for applying for the {{job_title}} position at {{company_name}}. \
               Our team is reviewing your application and will be in touch soon.\n\nBest regards,\n{{consultant_name}}",
    },
    EmailTemplate {
        id: "new_candidate_introduction",
        subject: "Introducing {{candidate_name}} for {{job_title}}",
        purpose: "Present a candidate to an employer",
        body: "Dear {{employer_name}},\n\nI would like to introduce {{candidate_name}} for the {{job_title}} role. \
               Their relevant skills include:\n{{matching_skills}}\n\nPlease let me know if you would like to arrange an interview.\n\n\
               Best regards,\n{{consultant_name}}",
    },
    EmailTemplate {
        id: "interview_invitation",
        subject: "Interview invitation: {{job_title}} at {{company_name}}",
        purpose: "Invite a candidate to an interview",
        body: "Dear {{candidate_name}},\n\nWe are pleased to invite you to an interview for the {{job_title}} position \
               at {{company_name}} on {{interview_date}}.\n\nPlease confirm your availability.\n\nBest regards,\n{{consultant_name}}",
    },
    EmailTemplate {
        id: "interview_feedback",
        subject: "Feedback on your interview for {{job_title}}",
        purpose: "Share interview feedback with an interviewed candidate",
        body: "Dear {{candidate_name}},\n\nThank you for interviewing for the {{job_title}} position. \
               {{feedback}}\n\nBest regards,\n{{consultant_name}}",
    },
    EmailTemplate {
        id: "offer_letter",
        subject: "Offer for {{job_title}} at {{company_name}}",
        purpose: "Extend a job offer",
        body: "Dear {{candidate_name}},\n\nWe are delighted to offer you the {{job_title}} position at {{company_name}} \
               with a salary of {{offer_salary}}.\n\nPlease reply by {{offer_expiry_date}}.\n\nBest regards,\n{{consultant_name}}",
    },
    EmailTemplate {
        id: "rejection_notice",
        subject: "Your application for {{job_title}}",
        purpose: "Inform a candidate the application will not proceed",
        body: "Dear {{candidate_name}},\n\nThank you for your interest in the {{job_title}} position at {{company_name}}. \
               After careful consideration we will not be moving forward with your application.\n\n\
               We wish you the best in your search.\n\nBest regards,\n{{consultant_name}}",
    },
];

pub fn find_template(id: &str) -> Option<&'static EmailTemplate> {
    EMAIL_TEMPLATES.iter().find(|t| t.id == id)
}

/// Names of the `{{placeholder}}` markers in `text`, in first-seen order.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let name = after[..end].trim().to_string();
        if !name.is_empty() && !found.contains(&name) {
            found.push(name);
        }
        rest = &after[end + 2..];
    }
    found
}

fn render_value(key: &str, value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            if key == "matching_skills" {
                parts
                    .iter()
                    .map(|p| format!("- {}", p))
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                parts.join(", ")
            }
        }
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn render_template(template: &EmailTemplate, context: &Map<String, JsonValue>) -> EmailDraft {
    let mut subject = template.subject.to_string();
    let mut body = template.body.to_string();
    for (key, value) in context {
        let marker = format!("{{{{{}}}}}", key);
        let text = render_value(key, value);
        subject = subject.replace(&marker, &text);
        body = body.replace(&marker, &text);
    }
    EmailDraft { subject, body }
}

pub fn basic_interview_questions(position: &str) -> Vec<InterviewQuestion> {
    let question = |q: String, purpose: &str| InterviewQuestion {
        question: q,
        purpose: purpose.to_string(),
        evaluation_guidance: None,
    };
    vec![
        question(
            format!("Can you tell me about your experience in {} roles?", position),
            "Assessing relevant experience",
        ),
        question(
            "Describe a challenging project you worked on and how you approached it.".to_string(),
            "Evaluating problem-solving skills",
        ),
        question(
            "How do you stay updated with the latest developments in your field?".to_string(),
            "Assessing continuous learning",
        ),
        question(
            "What are your strengths and weaknesses as they relate to this role?".to_string(),
            "Self-awareness and honesty",
        ),
        question(
            "Describe a situation where you had to work under pressure or tight deadlines."
                .to_string(),
            "Stress management and prioritization",
        ),
    ]
}

pub fn basic_job_description(
    position: &str,
    company_name: &str,
    industry: Option<&str>,
    required_skills: &[String],
) -> JobDescription {
    let industry_text = industry
        .filter(|i| !i.trim().is_empty())
        .map(|i| format!(" in the {} industry", i))
        .unwrap_or_default();
    let overview = format!(
        "{} is a leading company{} looking for talented professionals to join our team.",
        company_name, industry_text
    );
    let role_summary = format!("We are seeking a talented {} to join our growing team.", position);
    let key_responsibilities = vec![
        format!("Perform {} duties as assigned", position),
        "Collaborate with team members on projects".to_string(),
        "Report to management on progress and results".to_string(),
        "Maintain high standards of quality in all work".to_string(),
    ];
    let required_qualifications = vec![
        format!("Previous experience in {} role", position),
        "Relevant education or certification".to_string(),
        "Strong communication skills".to_string(),
        "Ability to work in a team environment".to_string(),
    ];
    let required_skills = if required_skills.is_empty() {
        ["Communication", "Teamwork", "Time management", "Problem-solving"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        required_skills.to_vec()
    };
    let benefits: Vec<String> = [
        "Competitive salary",
        "Professional development opportunities",
        "Health insurance",
        "Flexible working hours",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let application_process =
        "Please submit your resume and cover letter to apply for this position.".to_string();

    let bullets = |items: &[String]| {
        items
            .iter()
            .map(|i| format!("- {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let full_text = format!(
        "{}\n\nRole Summary:\n{}\n\nKey Responsibilities:\n{}\n\nRequired Qualifications:\n{}\n\n\
         Required Skills:\n{}\n\nBenefits:\n{}\n\n{}",
        overview,
        role_summary,
        bullets(&key_responsibilities),
        bullets(&required_qualifications),
        bullets(&required_skills),
        bullets(&benefits),
        application_process
    );

    JobDescription {
        title: position.to_string(),
        company_overview: overview,
        role_summary,
        key_responsibilities,
        required_qualifications,
        preferred_qualifications: vec![
            "Advanced degree in related field".to_string(),
            "Additional certifications".to_string(),
        ],
        required_skills,
        benefits,
        application_process,
        full_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn job(title: &str, skills: &[&str]) -> JobMatchCandidate {
        JobMatchCandidate {
            id: Uuid::new_v4(),
            title: title.to_string(),
            company_name: "Acme".to_string(),
            location: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn present_counts_up_to_current_year() {
        let cv = "Jane Doe\n\nWORK EXPERIENCE\nEngineer | Acme | 2018 - Present\nBuilt things\n\nEDUCATION\nBSc Computer Science | MIT | 2014 - 2018\n";
        let analysis = analyze_cv(cv, 2024);
        assert_eq!(analysis.total_experience_years, 6);
        assert_eq!(analysis.experience.len(), 1);
        assert_eq!(analysis.experience[0].company, "Acme");
        assert_eq!(
            analysis.education,
            vec![EducationEntry {
                degree: "BSc Computer Science".into(),
                institution: "MIT".into(),
                years: "2014 - 2018".into(),
            }]
        );
    }

    #[test]
    fn non_ascii_end_date_is_skipped_without_panicking() {
        let analysis = analyze_cv("WORK EXPERIENCE\nEngineer | Acme | 2018 - 現在まで\n", 2024);
        assert_eq!(analysis.experience.len(), 1);
        assert_eq!(analysis.total_experience_years, 0);
    }

    #[test]
    fn experience_years_are_summed() {
        let cv = "WORK EXPERIENCE\nLead | Beta | 2020 - 2023\nDeveloper | Gamma | 2015 - 2019\n";
        let analysis = analyze_cv(cv, 2024);
        assert_eq!(analysis.total_experience_years, 7);
        assert!(analysis
            .summary
            .ends_with("most recently worked as a Lead at Beta."));
    }

    #[test]
    fn skills_section_wins_over_keywords() {
        let cv = "SKILLS\nRust, Go\nPostgreSQL\n\nI also know Python.";
        assert_eq!(analyze_cv(cv, 2024).skills, strings(&["Rust", "Go", "PostgreSQL"]));
    }

    #[test]
    fn keyword_fallback_respects_word_boundaries() {
        let cv = "Worked with JavaScript, React and docker. Enjoys SQL tuning.";
        let skills = analyze_cv(cv, 2024).skills;
        assert_eq!(skills, strings(&["JavaScript", "React", "SQL", "Docker"]));
        assert!(!skills.contains(&"Java".to_string()));
    }

    #[test]
    fn summary_mentions_extra_skill_count_and_degree() {
        let cv = "SKILLS\nA, B, C, D, E, F, G\n\nEDUCATION\nMaster of Science | ETH | 2010\n";
        let summary = analyze_cv(cv, 2024).summary;
        assert_eq!(
            summary,
            "Candidate with approximately 0 years of experience, skilled in A, B, C, D, E, and 2 more. Has a Master's level education."
        );
    }

    #[test]
    fn half_the_job_skills_scores_fifty() {
        let jobs = vec![job("Backend", &["Python", "Java", "SQL", "AWS"])];
        let matches = rank_jobs(&strings(&["Python", "SQL"]), &jobs);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_score, 50.0);
        assert_eq!(matches[0].matching_skills, strings(&["Python", "SQL"]));
    }

    #[test]
    fn low_scores_dropped_and_ties_keep_order() {
        let jobs = vec![
            job("First", &["Python", "Go"]),
            job("Weak", &["Python", "A", "B", "C", "D"]),
            job("Second", &["python", "Rust"]),
            job("Best", &["Python"]),
        ];
        let ranked: Vec<String> = rank_jobs(&strings(&["Python"]), &jobs)
            .into_iter()
            .map(|m| m.job_title)
            .collect();
        assert_eq!(ranked, strings(&["Best", "First", "Second"]));
    }

    #[test]
    fn score_is_capped_at_one_hundred() {
        let jobs = vec![job("Web", &["JavaScript"])];
        let matches = rank_jobs(&strings(&["Java", "JavaScript", "Script"]), &jobs);
        assert_eq!(matches[0].match_score, 100.0);
    }

    #[test]
    fn matching_skills_render_as_bullets() {
        let template = find_template("new_candidate_introduction").expect("template exists");
        let context = json!({
            "candidate_name": "Sam",
            "job_title": "Analyst",
            "matching_skills": ["SQL", "Excel"],
        });
        let draft = render_template(template, context.as_object().expect("object"));
        assert_eq!(draft.subject, "Introducing Sam for Analyst");
        assert!(draft.body.contains("- SQL\n- Excel"));
        assert!(draft.body.contains("{{consultant_name}}"));
    }

    #[test]
    fn placeholders_are_listed_once() {
        assert_eq!(
            placeholders("{{a}} and {{ b }} then {{a}}"),
            strings(&["a", "b"])
        );
    }

    #[test]
    fn fallback_questions_name_the_position() {
        let questions = basic_interview_questions("Data Engineer");
        assert_eq!(questions.len(), 5);
        assert!(questions[0].question.contains("Data Engineer"));
    }
}

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::config::PROFILE_COMPLETION_FIELDS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvEntry {
    pub url: String,
    pub name: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub current_position: Option<String>,
    pub current_company: Option<String>,
    pub summary: Option<String>,
    pub years_of_experience: i32,
    pub location: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub cv_urls: Json<Vec<CvEntry>>,
    pub linkedin_url: Option<String>,
    pub willing_to_relocate: bool,
    pub salary_expectation: Option<i32>,
    pub is_open_to_opportunities: bool,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Candidate row joined with the owning user's name, as returned by search.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateListing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub current_position: Option<String>,
    pub current_company: Option<String>,
    pub summary: Option<String>,
    pub years_of_experience: i32,
    pub location: Option<String>,
    pub willing_to_relocate: bool,
    pub salary_expectation: Option<i32>,
    pub is_open_to_opportunities: bool,
    pub profile_completed: bool,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Education {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub institution: String,
    pub degree: String,
    pub field_of_study: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Experience {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub company: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub current: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateSkill {
    pub skill_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub proficiency_level: Option<String>,
    pub years_experience: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidatePreferences {
    pub candidate_id: Uuid,
    pub desired_sectors: Vec<String>,
    pub desired_locations: Vec<String>,
    pub contract_types: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateNotificationSettings {
    pub candidate_id: Uuid,
    pub email_alerts: bool,
    pub job_matches: bool,
    pub application_updates: bool,
    pub updated_at: DateTime<Utc>,
}

/// Presence of each sub-section that gates `profile_completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct ProfileSections {
    pub has_education: bool,
    pub has_experience: bool,
    pub has_skills: bool,
    pub has_preferences: bool,
    pub has_summary: bool,
    pub has_cv: bool,
}

impl ProfileSections {
    pub fn is_complete(&self) -> bool {
        self.has_education
            && self.has_experience
            && self.has_skills
            && self.has_preferences
            && self.has_summary
            && self.has_cv
    }
}

/// The ten profile fields behind the completion percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct CompletionFields {
    pub summary: bool,
    pub cv: bool,
    pub current_position: bool,
    pub years_of_experience: bool,
    pub education: bool,
    pub experience: bool,
    pub skills: bool,
    pub preferences: bool,
    pub linkedin_url: bool,
    pub city_and_country: bool,
}

impl CompletionFields {
    fn entries(&self) -> [(&'static str, bool); 10] {
        [
            ("summary", self.summary),
            ("cv", self.cv),
            ("current_position", self.current_position),
            ("years_of_experience", self.years_of_experience),
            ("education", self.education),
            ("experience", self.experience),
            ("skills", self.skills),
            ("preferences", self.preferences),
            ("linkedin_url", self.linkedin_url),
            ("city_and_country", self.city_and_country),
        ]
    }

    /// Whole percentage, rounded down.
    pub fn percentage(&self) -> u32 {
        let filled = self.entries().iter().filter(|(_, set)| *set).count() as u32;
        filled * 100 / PROFILE_COMPLETION_FIELDS
    }

    pub fn missing(&self) -> Vec<&'static str> {
        self.entries()
            .iter()
            .filter(|(_, set)| !set)
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Sums experience spans in whole years; open-ended entries run to `today`.
pub fn total_experience_years(experience: &[Experience], today: NaiveDate) -> i32 {
    let months: i32 = experience
        .iter()
        .map(|entry| {
            let end = entry.end_date.filter(|_| !entry.current).unwrap_or(today);
            let span = (end.year() - entry.start_date.year()) * 12 + end.month() as i32
                - entry.start_date.month() as i32;
            span.max(0)
        })
        .sum();
    months / 12
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experience(start: (i32, u32), end: Option<(i32, u32)>, current: bool) -> Experience {
        Experience {
            id: Uuid::new_v4(),
            candidate_id: Uuid::nil(),
            company: "Acme".into(),
            title: "Engineer".into(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, 1).unwrap(),
            end_date: end.map(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1).unwrap()),
            current,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn completion_requires_every_section() {
        let mut sections = ProfileSections {
            has_education: true,
            has_experience: true,
            has_skills: true,
            has_preferences: true,
            has_summary: true,
            has_cv: false,
        };
        assert!(!sections.is_complete());
        sections.has_cv = true;
        assert!(sections.is_complete());
        sections.has_skills = false;
        assert!(!sections.is_complete());
    }

    #[test]
    fn completion_percentage_counts_ten_fields() {
        let mut fields = CompletionFields {
            summary: true,
            cv: true,
            skills: true,
            ..Default::default()
        };
        assert_eq!(fields.percentage(), 30);
        assert_eq!(fields.missing().len(), 7);
        fields.linkedin_url = true;
        fields.city_and_country = true;
        assert_eq!(fields.percentage(), 50);
    }

    #[test]
    fn experience_years_sum_spans_and_clamp_open_entries() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let entries = vec![
            experience((2015, 6), Some((2018, 6)), false),
            experience((2020, 6), None, true),
        ];
        assert_eq!(total_experience_years(&entries, today), 7);
    }
}

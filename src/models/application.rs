use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum! {
    /// Lifecycle of an application. Declaration order is the forward order of
    /// the pipeline; `Rejected` sits outside it as a terminal branch.
    pub enum ApplicationStatus {
        Submitted => "Submitted",
        UnderReview => "UnderReview",
        PresentedToEmployer => "PresentedToEmployer",
        InterviewScheduled => "InterviewScheduled",
        OfferMade => "OfferMade",
        Hired => "Hired",
        Rejected => "Rejected",
    }
}

impl ApplicationStatus {
    /// Position along the forward pipeline, `None` for the rejection branch.
    pub fn rank(&self) -> Option<u8> {
        match self {
            ApplicationStatus::Submitted => Some(0),
            ApplicationStatus::UnderReview => Some(1),
            ApplicationStatus::PresentedToEmployer => Some(2),
            ApplicationStatus::InterviewScheduled => Some(3),
            ApplicationStatus::OfferMade => Some(4),
            ApplicationStatus::Hired => Some(5),
            ApplicationStatus::Rejected => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Hired | ApplicationStatus::Rejected)
    }

    /// Forward moves may skip stages; rejection is allowed from any open stage.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == ApplicationStatus::Rejected {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(current), Some(target)) => target > current,
            _ => false,
        }
    }

    /// Statuses that still count as an active pipeline entry.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub consultant_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub cv_url: Option<String>,
    pub source: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub interview_date: Option<DateTime<Utc>>,
    pub interview_type: Option<String>,
    pub interview_location: Option<String>,
    pub offer_salary: Option<Decimal>,
    pub offer_currency: Option<String>,
    pub offer_date: Option<NaiveDate>,
    pub offer_expiry_date: Option<NaiveDate>,
    pub rejection_reason: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub application_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub comment: Option<String>,
    pub changed_by: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationNote {
    pub id: Uuid,
    pub application_id: Uuid,
    pub consultant_id: Uuid,
    pub note_text: String,
    pub created_at: DateTime<Utc>,
}

/// Application joined with the names a reviewer needs to read it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationListing {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub consultant_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub interview_date: Option<DateTime<Utc>>,
    pub offer_salary: Option<Decimal>,
    pub offer_currency: Option<String>,
    pub version: i32,
    pub job_title: String,
    pub company_id: Uuid,
    pub company_name: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::ApplicationStatus::*;
    use super::*;

    #[test]
    fn forward_moves_are_allowed_including_skips() {
        assert!(Submitted.can_transition_to(UnderReview));
        assert!(Submitted.can_transition_to(InterviewScheduled));
        assert!(OfferMade.can_transition_to(Hired));
    }

    #[test]
    fn backward_and_same_status_moves_are_refused() {
        assert!(!UnderReview.can_transition_to(Submitted));
        assert!(!OfferMade.can_transition_to(InterviewScheduled));
        assert!(!UnderReview.can_transition_to(UnderReview));
    }

    #[test]
    fn rejection_reachable_from_every_open_status() {
        for status in ApplicationStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(Rejected), "{status} -> Rejected");
        }
    }

    #[test]
    fn terminal_statuses_go_nowhere() {
        for next in ApplicationStatus::ALL {
            assert!(!Hired.can_transition_to(*next));
            assert!(!Rejected.can_transition_to(*next));
        }
    }

    #[test]
    fn parses_stored_text_case_insensitively() {
        assert_eq!("offermade".parse::<ApplicationStatus>().unwrap(), OfferMade);
        assert!("Archived".parse::<ApplicationStatus>().is_err());
    }
}

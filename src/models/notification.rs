use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum! {
    pub enum NotificationKind {
        ApplicationNew => "application_new",
        ApplicationStatusChange => "application_status_change",
        ApplicationInterview => "application_interview",
        ApplicationOffer => "application_offer",
        JobNewMatch => "job_new_match",
        JobDeadlineReminder => "job_deadline_reminder",
        AccountVerification => "account_verification",
        PasswordReset => "password_reset",
        ProfileIncomplete => "profile_incomplete",
        NewMessage => "new_message",
        SystemAnnouncement => "system_announcement",
        SystemMaintenance => "system_maintenance",
    }
}

text_enum! {
    pub enum Channel {
        Email => "email",
        Sms => "sms",
        InApp => "in_app",
        Push => "push",
    }
}

text_enum! {
    pub enum Priority {
        Low => "low",
        Normal => "normal",
        High => "high",
    }
}

impl NotificationKind {
    pub fn title(&self) -> &'static str {
        match self {
            NotificationKind::ApplicationNew => "New Application Received",
            NotificationKind::ApplicationStatusChange => "Application Status Updated",
            NotificationKind::ApplicationInterview => "Interview Scheduled",
            NotificationKind::ApplicationOffer => "Job Offer Received",
            NotificationKind::JobNewMatch => "New Job Match",
            NotificationKind::JobDeadlineReminder => "Application Deadline Reminder",
            NotificationKind::AccountVerification => "Verify Your Account",
            NotificationKind::PasswordReset => "Password Reset Request",
            NotificationKind::ProfileIncomplete => "Complete Your Profile",
            NotificationKind::NewMessage => "New Message",
            NotificationKind::SystemAnnouncement => "System Announcement",
            NotificationKind::SystemMaintenance => "Scheduled Maintenance",
        }
    }

    /// Message template; `{key}` placeholders are filled from the event data.
    pub fn template(&self) -> &'static str {
        match self {
            NotificationKind::ApplicationNew => {
                "A new application has been submitted for {job_title}."
            }
            NotificationKind::ApplicationStatusChange => {
                "Your application for {job_title} is now {status}."
            }
            NotificationKind::ApplicationInterview => {
                "An interview for {job_title} has been scheduled for {interview_date}."
            }
            NotificationKind::ApplicationOffer => {
                "You have received an offer for {job_title}."
            }
            NotificationKind::JobNewMatch => "A new job matching your profile: {job_title}.",
            NotificationKind::JobDeadlineReminder => {
                "The application deadline for {job_title} is {deadline}."
            }
            NotificationKind::AccountVerification => {
                "Please verify your account to access all features."
            }
            NotificationKind::PasswordReset => "A password reset was requested for your account.",
            NotificationKind::ProfileIncomplete => {
                "Your profile is {completion}% complete. Finish it to improve your matches."
            }
            NotificationKind::NewMessage => "{sender_name} sent you a message.",
            NotificationKind::SystemAnnouncement => "{message}",
            NotificationKind::SystemMaintenance => "Maintenance is scheduled for {window}.",
        }
    }

    pub fn action_required(&self) -> bool {
        matches!(
            self,
            NotificationKind::ApplicationInterview
                | NotificationKind::ApplicationOffer
                | NotificationKind::AccountVerification
        )
    }

    pub fn priority(&self) -> Priority {
        match self {
            NotificationKind::ApplicationInterview
            | NotificationKind::ApplicationOffer
            | NotificationKind::PasswordReset => Priority::High,
            NotificationKind::JobNewMatch | NotificationKind::SystemAnnouncement => Priority::Low,
            _ => Priority::Normal,
        }
    }

    /// Renders the message template, leaving unknown placeholders untouched.
    pub fn render(&self, data: &JsonValue) -> String {
        let mut text = self.template().to_string();
        if let Some(fields) = data.as_object() {
            for (key, value) in fields {
                let replacement = match value {
                    JsonValue::String(s) => s.clone(),
                    JsonValue::Null => String::new(),
                    other => other.to_string(),
                };
                text = text.replace(&format!("{{{}}}", key), &replacement);
            }
        }
        text
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: JsonValue,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub action_required: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow)]
pub struct NotificationPreferences {
    pub email: bool,
    pub sms: bool,
    pub in_app: bool,
    pub push: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
            in_app: true,
            push: true,
        }
    }
}

impl NotificationPreferences {
    pub fn channels(&self) -> Vec<Channel> {
        [
            (self.email, Channel::Email),
            (self.sms, Channel::Sms),
            (self.in_app, Channel::InApp),
            (self.push, Channel::Push),
        ]
        .into_iter()
        .filter_map(|(enabled, channel)| enabled.then_some(channel))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_known_placeholders() {
        let text = NotificationKind::ApplicationStatusChange
            .render(&json!({"job_title": "Data Engineer", "status": "UnderReview"}));
        assert_eq!(text, "Your application for Data Engineer is now UnderReview.");
    }

    #[test]
    fn default_preferences_skip_sms() {
        assert_eq!(
            NotificationPreferences::default().channels(),
            vec![Channel::Email, Channel::InApp, Channel::Push]
        );
    }

    #[test]
    fn interviews_and_offers_need_action() {
        assert!(NotificationKind::ApplicationInterview.action_required());
        assert!(NotificationKind::ApplicationOffer.action_required());
        assert!(!NotificationKind::ApplicationStatusChange.action_required());
    }
}

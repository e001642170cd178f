use serde::{Deserialize, Serialize};

pub mod admin_dto;
pub mod ai_dto;
pub mod application_dto;
pub mod auth_dto;
pub mod candidate_dto;
pub mod company_dto;
pub mod job_dto;
pub mod messaging_dto;
pub mod notification_dto;
pub mod skill_dto;
pub mod team_dto;

/// `{success, message}` envelope for mutations without a resource to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

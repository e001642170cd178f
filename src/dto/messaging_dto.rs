use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::message::{
    Attachment, Conversation, EntityReference, EntityType, Message, Participant,
    UnreadByConversation,
};
use crate::utils::pagination::PageRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AttachmentPayload {
    #[validate(url)]
    pub file_url: String,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(max = 100))]
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityReferencePayload {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessagePayload {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    pub reply_to_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub attachments: Vec<AttachmentPayload>,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub references: Vec<EntityReferencePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateConversationPayload {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    /// Other participants; the creator is always added.
    #[validate(length(min = 1, max = 50))]
    pub participant_ids: Vec<Uuid>,
    #[validate(length(min = 1, max = 10000))]
    pub initial_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EditMessagePayload {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkMessagePayload {
    #[validate(length(min = 1, max = 100))]
    pub conversation_ids: Vec<Uuid>,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkMessageResponse {
    pub sent: Vec<Uuid>,
    pub failed: Vec<BulkMessageFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkMessageFailure {
    pub conversation_id: Uuid,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub attachments: Vec<Attachment>,
    pub references: Vec<EntityReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDetails {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub participants: Vec<Participant>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCounts {
    pub total: i64,
    pub conversations: Vec<UnreadByConversation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationListQuery {
    pub include_archived: bool,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ConversationListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::resolve(self.page, self.page_size, self.skip, self.limit)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum! {
    pub enum ConversationKind {
        Direct => "direct",
        Group => "group",
    }
}

text_enum! {
    /// Entity a message can point at.
    pub enum EntityType {
        Job => "job",
        Application => "application",
        Candidate => "candidate",
        Company => "company",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub title: Option<String>,
    #[sqlx(try_from = "String")]
    pub kind: ConversationKind,
    pub created_by: Uuid,
    pub is_archived: bool,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: Option<String>,
    #[sqlx(try_from = "String")]
    pub kind: ConversationKind,
    pub is_archived: bool,
    pub last_message_at: Option<DateTime<Utc>>,
    pub participant_count: i64,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Role of the user on the platform at the time they joined.
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub reply_to_id: Option<Uuid>,
    pub is_deleted: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub message_id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EntityReference {
    pub id: Uuid,
    pub message_id: Uuid,
    #[sqlx(try_from = "String")]
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UnreadByConversation {
    pub conversation_id: Uuid,
    pub unread: i64,
}

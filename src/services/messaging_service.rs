//! Conversations between platform users, with per-user read receipts.

use std::collections::HashMap;

use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::dto::messaging_dto::{
    BulkMessageFailure, BulkMessagePayload, BulkMessageResponse, ConversationDetails,
    CreateConversationPayload, MessageView, SendMessagePayload, UnreadCounts,
};
use crate::error::{Error, Result};
use crate::models::message::{
    Attachment, Conversation, ConversationKind, ConversationSummary, EntityReference, Message,
    Participant, UnreadByConversation,
};
use crate::models::notification::{Channel, NotificationKind};
use crate::services::notification_dispatcher::NotificationDispatcher;
use crate::utils::pagination::{Page, PageRequest};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, \
     CASE WHEN is_deleted THEN '' ELSE content END AS content, \
     message_type, reply_to_id, is_deleted, edited_at, created_at";

#[derive(Clone)]
pub struct MessagingService {
    pool: PgPool,
    dispatcher: NotificationDispatcher,
}

impl MessagingService {
    pub fn new(pool: PgPool, dispatcher: NotificationDispatcher) -> Self {
        Self { pool, dispatcher }
    }

    /// A single other participant makes a direct conversation, reused if one exists.
    pub async fn create_conversation(
        &self,
        user_id: Uuid,
        payload: CreateConversationPayload,
    ) -> Result<ConversationDetails> {
        let mut others: Vec<Uuid> = payload
            .participant_ids
            .iter()
            .copied()
            .filter(|id| *id != user_id)
            .collect();
        others.sort();
        others.dedup();
        if others.is_empty() {
            return Err(Error::BadRequest(
                "A conversation needs at least one other participant".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let mut members = others.clone();
        members.push(user_id);
        let known: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE id = ANY($1) AND is_active = TRUE",
        )
        .bind(&members)
        .fetch_one(&mut *tx)
        .await?;
        if known != members.len() as i64 {
            return Err(Error::BadRequest(
                "Unknown or inactive participant".to_string(),
            ));
        }

        let kind = if others.len() == 1 {
            ConversationKind::Direct
        } else {
            ConversationKind::Group
        };

        let existing: Option<Uuid> = if kind == ConversationKind::Direct {
            sqlx::query_scalar(
                r#"
                SELECT c.id FROM conversations c
                WHERE c.kind = 'direct'
                  AND EXISTS (SELECT 1 FROM conversation_participants p WHERE p.conversation_id = c.id AND p.user_id = $1)
                  AND EXISTS (SELECT 1 FROM conversation_participants p WHERE p.conversation_id = c.id AND p.user_id = $2)
                LIMIT 1
                "#,
            )
            .bind(user_id)
            .bind(others[0])
            .fetch_optional(&mut *tx)
            .await?
        } else {
            None
        };

        let conversation_id = match existing {
            Some(id) => id,
            None => {
                let conversation = sqlx::query_as::<_, Conversation>(
                    "INSERT INTO conversations (title, kind, created_by) VALUES ($1, $2, $3) RETURNING *",
                )
                .bind(&payload.title)
                .bind(kind.as_str())
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
                sqlx::query(
                    r#"
                    INSERT INTO conversation_participants (conversation_id, user_id, role)
                    SELECT $1, u.id, u.role FROM users u WHERE u.id = ANY($2)
                    "#,
                )
                .bind(conversation.id)
                .bind(&members)
                .execute(&mut *tx)
                .await?;
                tracing::info!(conversation_id = %conversation.id, kind = %kind, "conversation created");
                conversation.id
            }
        };

        let mut notify = Vec::new();
        if let Some(text) = payload.initial_message.as_deref() {
            insert_message(&mut tx, conversation_id, user_id, text, None).await?;
            notify = others;
        }
        tx.commit().await?;

        if !notify.is_empty() {
            self.announce(user_id, conversation_id, &notify).await;
        }
        self.conversation(user_id, conversation_id).await
    }

    pub async fn conversations(
        &self,
        user_id: Uuid,
        include_archived: bool,
        page: PageRequest,
    ) -> Result<Page<ConversationSummary>> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id AND p.user_id = $1
            WHERE ($2 OR c.is_archived = FALSE)
            "#,
        )
        .bind(user_id)
        .bind(include_archived)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT c.id, c.title, c.kind, c.is_archived, c.last_message_at, c.created_at,
                   (SELECT COUNT(*) FROM conversation_participants cp WHERE cp.conversation_id = c.id)
                       AS participant_count,
                   (SELECT COUNT(*) FROM messages m
                    WHERE m.conversation_id = c.id AND m.sender_id <> $1 AND m.is_deleted = FALSE
                      AND NOT EXISTS (SELECT 1 FROM message_reads r WHERE r.message_id = m.id AND r.user_id = $1))
                       AS unread_count
            FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id AND p.user_id = $1
            WHERE ($2 OR c.is_archived = FALSE)
            ORDER BY COALESCE(c.last_message_at, c.created_at) DESC, c.id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(include_archived)
        .bind(page.page_size)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn conversation(&self, user_id: Uuid, conversation_id: Uuid) -> Result<ConversationDetails> {
        let mut conn = self.pool.acquire().await?;
        let conversation = participant_conversation(&mut conn, conversation_id, user_id).await?;
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT p.user_id, u.first_name, u.last_name, p.role, p.joined_at
            FROM conversation_participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.conversation_id = $1
            ORDER BY p.joined_at, u.last_name
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&mut *conn)
        .await?;
        let unread_count = unread_in(&mut conn, conversation_id, user_id).await?;
        Ok(ConversationDetails {
            conversation,
            participants,
            unread_count,
        })
    }

    pub async fn archive(&self, user_id: Uuid, conversation_id: Uuid) -> Result<Conversation> {
        let mut conn = self.pool.acquire().await?;
        participant_conversation(&mut conn, conversation_id, user_id).await?;
        let conversation = sqlx::query_as::<_, Conversation>(
            "UPDATE conversations SET is_archived = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(conversation_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(conversation)
    }

    pub async fn send(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        payload: SendMessagePayload,
    ) -> Result<MessageView> {
        let mut tx = self.pool.begin().await?;
        participant_conversation(&mut tx, conversation_id, user_id).await?;

        if let Some(reply_to) = payload.reply_to_id {
            let same_thread: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE id = $1 AND conversation_id = $2)",
            )
            .bind(reply_to)
            .bind(conversation_id)
            .fetch_one(&mut *tx)
            .await?;
            if !same_thread {
                return Err(Error::BadRequest(
                    "Replied-to message is not in this conversation".to_string(),
                ));
            }
        }

        let message = insert_message(
            &mut tx,
            conversation_id,
            user_id,
            &payload.content,
            payload.reply_to_id,
        )
        .await?;

        let mut attachments = Vec::with_capacity(payload.attachments.len());
        for attachment in &payload.attachments {
            let row = sqlx::query_as::<_, Attachment>(
                r#"
                INSERT INTO message_attachments (message_id, file_url, file_name, file_type)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(message.id)
            .bind(&attachment.file_url)
            .bind(&attachment.file_name)
            .bind(&attachment.file_type)
            .fetch_one(&mut *tx)
            .await?;
            attachments.push(row);
        }

        let mut references = Vec::with_capacity(payload.references.len());
        for reference in &payload.references {
            let row = sqlx::query_as::<_, EntityReference>(
                r#"
                INSERT INTO message_entity_references (message_id, entity_type, entity_id)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
            .bind(message.id)
            .bind(reference.entity_type.as_str())
            .bind(reference.entity_id)
            .fetch_one(&mut *tx)
            .await?;
            references.push(row);
        }

        let recipients: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM conversation_participants WHERE conversation_id = $1 AND user_id <> $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        self.announce(user_id, conversation_id, &recipients).await;
        Ok(MessageView {
            message,
            attachments,
            references,
        })
    }

    pub async fn messages(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<MessageView>> {
        let mut conn = self.pool.acquire().await?;
        participant_conversation(&mut conn, conversation_id, user_id).await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_one(&mut *conn)
            .await?;
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        );
        let messages = sqlx::query_as::<_, Message>(&sql)
            .bind(conversation_id)
            .bind(page.page_size)
            .bind(page.offset)
            .fetch_all(&mut *conn)
            .await?;

        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        let mut attachments: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        for row in sqlx::query_as::<_, Attachment>(
            "SELECT * FROM message_attachments WHERE message_id = ANY($1) ORDER BY created_at",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?
        {
            attachments.entry(row.message_id).or_default().push(row);
        }
        let mut references: HashMap<Uuid, Vec<EntityReference>> = HashMap::new();
        for row in sqlx::query_as::<_, EntityReference>(
            "SELECT * FROM message_entity_references WHERE message_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?
        {
            references.entry(row.message_id).or_default().push(row);
        }

        let items = messages
            .into_iter()
            .map(|message| MessageView {
                attachments: attachments.remove(&message.id).unwrap_or_default(),
                references: references.remove(&message.id).unwrap_or_default(),
                message,
            })
            .collect();
        Ok(Page::new(items, total, page))
    }

    pub async fn edit(&self, user_id: Uuid, message_id: Uuid, content: &str) -> Result<Message> {
        let message = self.own_message(user_id, message_id).await?;
        if message.is_deleted {
            return Err(Error::InvalidState("Message was deleted".to_string()));
        }
        let sql = format!(
            "UPDATE messages SET content = $2, edited_at = NOW() WHERE id = $1 RETURNING {MESSAGE_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Message>(&sql)
            .bind(message_id)
            .bind(content)
            .fetch_one(&self.pool)
            .await?;
        Ok(updated)
    }

    /// Soft delete; the row stays so replies keep their anchor.
    pub async fn delete(&self, user_id: Uuid, message_id: Uuid) -> Result<()> {
        self.own_message(user_id, message_id).await?;
        sqlx::query("UPDATE messages SET is_deleted = TRUE WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn own_message(&self, user_id: Uuid, message_id: Uuid) -> Result<Message> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        let message = sqlx::query_as::<_, Message>(&sql)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Message not found".to_string()))?;
        if message.sender_id != user_id {
            return Err(Error::Forbidden(
                "Only the sender can change a message".to_string(),
            ));
        }
        Ok(message)
    }

    /// Marks every message in the conversation read; returns how many were new.
    pub async fn mark_read(&self, user_id: Uuid, conversation_id: Uuid) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        participant_conversation(&mut conn, conversation_id, user_id).await?;
        let result = sqlx::query(
            r#"
            INSERT INTO message_reads (message_id, user_id)
            SELECT m.id, $2 FROM messages m
            WHERE m.conversation_id = $1 AND m.sender_id <> $2
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_counts(&self, user_id: Uuid) -> Result<UnreadCounts> {
        let conversations = sqlx::query_as::<_, UnreadByConversation>(
            r#"
            SELECT m.conversation_id, COUNT(*) AS unread
            FROM messages m
            JOIN conversation_participants p ON p.conversation_id = m.conversation_id AND p.user_id = $1
            WHERE m.sender_id <> $1 AND m.is_deleted = FALSE
              AND NOT EXISTS (SELECT 1 FROM message_reads r WHERE r.message_id = m.id AND r.user_id = $1)
            GROUP BY m.conversation_id
            ORDER BY m.conversation_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(UnreadCounts {
            total: conversations.iter().map(|c| c.unread).sum(),
            conversations,
        })
    }

    /// Sends the same text to each conversation independently.
    pub async fn bulk_send(&self, user_id: Uuid, payload: BulkMessagePayload) -> BulkMessageResponse {
        let mut response = BulkMessageResponse {
            sent: Vec::new(),
            failed: Vec::new(),
        };
        for conversation_id in payload.conversation_ids {
            let message = SendMessagePayload {
                content: payload.content.clone(),
                reply_to_id: None,
                attachments: Vec::new(),
                references: Vec::new(),
            };
            match self.send(user_id, conversation_id, message).await {
                Ok(_) => response.sent.push(conversation_id),
                Err(e) => response.failed.push(BulkMessageFailure {
                    conversation_id,
                    detail: e.to_string(),
                }),
            }
        }
        response
    }

    async fn announce(&self, sender_id: Uuid, conversation_id: Uuid, recipients: &[Uuid]) {
        let sender_name: String = sqlx::query_scalar(
            "SELECT first_name || ' ' || last_name FROM users WHERE id = $1",
        )
        .bind(sender_id)
        .fetch_optional(&self.pool)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| "Someone".to_string());
        let data = json!({
            "conversation_id": conversation_id,
            "sender_id": sender_id,
            "sender_name": sender_name,
        });
        self.dispatcher
            .send_bulk(recipients, NotificationKind::NewMessage, data, Some(&[Channel::InApp][..]))
            .await;
    }
}

async fn participant_conversation(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<Conversation> {
    let conversation = sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
        .bind(conversation_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound("Conversation not found".to_string()))?;
    let member: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM conversation_participants WHERE conversation_id = $1 AND user_id = $2)",
    )
    .bind(conversation_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    if !member {
        return Err(Error::Forbidden(
            "Not a participant in this conversation".to_string(),
        ));
    }
    Ok(conversation)
}

async fn unread_in(conn: &mut PgConnection, conversation_id: Uuid, user_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM messages m
        WHERE m.conversation_id = $1 AND m.sender_id <> $2 AND m.is_deleted = FALSE
          AND NOT EXISTS (SELECT 1 FROM message_reads r WHERE r.message_id = m.id AND r.user_id = $2)
        "#,
    )
    .bind(conversation_id)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

async fn insert_message(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: &str,
    reply_to_id: Option<Uuid>,
) -> Result<Message> {
    let sql = format!(
        "INSERT INTO messages (conversation_id, sender_id, content, reply_to_id) \
         VALUES ($1, $2, $3, $4) RETURNING {MESSAGE_COLUMNS}"
    );
    let message = sqlx::query_as::<_, Message>(&sql)
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .bind(reply_to_id)
        .fetch_one(&mut *conn)
        .await?;
    sqlx::query(
        "UPDATE conversations SET last_message_at = $2, updated_at = NOW(), is_archived = FALSE WHERE id = $1",
    )
    .bind(conversation_id)
    .bind(message.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(message)
}

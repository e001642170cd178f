use crate::error::Result;
use crate::models::audit_log::AuditLog;
use serde_json::Value as JsonValue;
use sqlx::PgConnection;
use uuid::Uuid;

/// Administrative action recorded in `audit_logs`.
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub actor: Option<Uuid>,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Uuid,
    pub changes: Option<JsonValue>,
}

/// Writes an audit row on an existing connection so it commits with the action it records.
pub async fn record(conn: &mut PgConnection, entry: AuditEntry<'_>) -> Result<AuditLog> {
    let row = sqlx::query_as::<_, AuditLog>(
        r#"
        INSERT INTO audit_logs (user_id, action, entity_type, entity_id, changes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(entry.actor)
    .bind(entry.action)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(&entry.changes)
    .fetch_one(conn)
    .await?;
    tracing::info!(
        action = entry.action,
        entity_type = entry.entity_type,
        entity_id = %entry.entity_id,
        "audit entry recorded"
    );
    Ok(row)
}

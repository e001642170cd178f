//! Fans a notification out to delivery channels.
//!
//! Delivery never fails the caller: channel errors are logged and folded into
//! the boolean returned by [`NotificationDispatcher::send`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::notification::{Channel, NotificationKind, NotificationPreferences, Priority};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundNotification {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: JsonValue,
    pub priority: Priority,
    pub action_required: bool,
}

impl OutboundNotification {
    pub fn new(recipient_id: Uuid, kind: NotificationKind, data: JsonValue) -> Self {
        Self {
            recipient_id,
            kind,
            title: kind.title().to_string(),
            message: kind.render(&data),
            data,
            priority: kind.priority(),
            action_required: kind.action_required(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSendSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn deliver(&self, notification: &OutboundNotification) -> Result<()>;
}

/// Where default channels come from when the caller names none.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceSource: Send + Sync {
    async fn channels_for(&self, user_id: Uuid) -> Result<Vec<Channel>>;
}

/// Persists the notification for the recipient's inbox.
pub struct InAppSender {
    pool: PgPool,
}

impl InAppSender {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelSender for InAppSender {
    fn channel(&self) -> Channel {
        Channel::InApp
    }

    async fn deliver(&self, notification: &OutboundNotification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, kind, title, message, data, priority, action_required)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.recipient_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.data)
        .bind(notification.priority.as_str())
        .bind(notification.action_required)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Stand-in for an external provider (email, SMS, push): records the send in the log.
pub struct LoggingSender {
    channel: Channel,
}

impl LoggingSender {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelSender for LoggingSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn deliver(&self, notification: &OutboundNotification) -> Result<()> {
        tracing::info!(
            channel = %self.channel,
            recipient_id = %notification.recipient_id,
            kind = %notification.kind,
            title = %notification.title,
            "notification sent"
        );
        Ok(())
    }
}

pub struct PgPreferenceSource {
    pool: PgPool,
}

impl PgPreferenceSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceSource for PgPreferenceSource {
    async fn channels_for(&self, user_id: Uuid) -> Result<Vec<Channel>> {
        let prefs = sqlx::query_as::<_, NotificationPreferences>(
            "SELECT email, sms, in_app, push FROM notification_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(prefs.unwrap_or_default().channels())
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    senders: Arc<Vec<Arc<dyn ChannelSender>>>,
    preferences: Arc<dyn PreferenceSource>,
}

impl NotificationDispatcher {
    pub fn new(senders: Vec<Arc<dyn ChannelSender>>, preferences: Arc<dyn PreferenceSource>) -> Self {
        Self {
            senders: Arc::new(senders),
            preferences,
        }
    }

    /// In-app persistence plus logging stubs for the external channels.
    pub fn with_pool(pool: PgPool) -> Self {
        let senders: Vec<Arc<dyn ChannelSender>> = vec![
            Arc::new(InAppSender::new(pool.clone())),
            Arc::new(LoggingSender::new(Channel::Email)),
            Arc::new(LoggingSender::new(Channel::Sms)),
            Arc::new(LoggingSender::new(Channel::Push)),
        ];
        Self::new(senders, Arc::new(PgPreferenceSource::new(pool)))
    }

    /// Returns `true` only if every selected channel delivered.
    pub async fn send(
        &self,
        recipient_id: Uuid,
        kind: NotificationKind,
        data: JsonValue,
        channels: Option<&[Channel]>,
    ) -> bool {
        let channels = match channels {
            Some(channels) => channels.to_vec(),
            None => match self.preferences.channels_for(recipient_id).await {
                Ok(channels) => channels,
                Err(e) => {
                    tracing::warn!(%recipient_id, error = %e, "falling back to default channels");
                    NotificationPreferences::default().channels()
                }
            },
        };

        let notification = OutboundNotification::new(recipient_id, kind, data);
        let mut success = true;
        for channel in channels {
            let Some(sender) = self.senders.iter().find(|s| s.channel() == channel) else {
                tracing::warn!(%channel, "no sender configured for channel");
                success = false;
                continue;
            };
            if let Err(e) = sender.deliver(&notification).await {
                tracing::error!(
                    %channel,
                    recipient_id = %recipient_id,
                    kind = %kind,
                    error = %e,
                    "notification delivery failed"
                );
                success = false;
            }
        }
        success
    }

    pub async fn send_bulk(
        &self,
        recipients: &[Uuid],
        kind: NotificationKind,
        data: JsonValue,
        channels: Option<&[Channel]>,
    ) -> BulkSendSummary {
        let mut summary = BulkSendSummary {
            total: recipients.len(),
            ..Default::default()
        };
        for recipient in recipients {
            if self.send(*recipient, kind, data.clone(), channels).await {
                summary.success += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn sender(channel: Channel, fails: bool) -> Arc<dyn ChannelSender> {
        let mut mock = MockChannelSender::new();
        mock.expect_channel().return_const(channel);
        mock.expect_deliver().returning(move |_| {
            if fails {
                Err(Error::Internal("provider down".into()))
            } else {
                Ok(())
            }
        });
        Arc::new(mock)
    }

    fn no_preferences() -> Arc<dyn PreferenceSource> {
        let mut prefs = MockPreferenceSource::new();
        prefs.expect_channels_for().never();
        Arc::new(prefs)
    }

    #[tokio::test]
    async fn failing_channel_reports_false_without_raising() {
        let dispatcher = NotificationDispatcher::new(
            vec![sender(Channel::Email, true), sender(Channel::InApp, false)],
            no_preferences(),
        );
        let ok = dispatcher
            .send(
                Uuid::new_v4(),
                NotificationKind::ApplicationNew,
                json!({"job_title": "Analyst"}),
                Some(&[Channel::Email, Channel::InApp]),
            )
            .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn missing_sender_counts_as_failure() {
        let dispatcher =
            NotificationDispatcher::new(vec![sender(Channel::InApp, false)], no_preferences());
        assert!(
            dispatcher
                .send(
                    Uuid::new_v4(),
                    NotificationKind::SystemAnnouncement,
                    json!({"message": "hello"}),
                    Some(&[Channel::InApp]),
                )
                .await
        );
        assert!(
            !dispatcher
                .send(
                    Uuid::new_v4(),
                    NotificationKind::SystemAnnouncement,
                    json!({}),
                    Some(&[Channel::Sms]),
                )
                .await
        );
    }

    #[tokio::test]
    async fn preference_errors_fall_back_to_defaults() {
        let mut prefs = MockPreferenceSource::new();
        prefs
            .expect_channels_for()
            .returning(|_| Err(Error::Internal("db down".into())));
        let dispatcher = NotificationDispatcher::new(
            vec![
                sender(Channel::Email, false),
                sender(Channel::InApp, false),
                sender(Channel::Push, false),
            ],
            Arc::new(prefs),
        );
        assert!(
            dispatcher
                .send(Uuid::new_v4(), NotificationKind::JobNewMatch, json!({}), None)
                .await
        );
    }

    #[tokio::test]
    async fn bulk_send_counts_outcomes() {
        let mut flaky = MockChannelSender::new();
        flaky.expect_channel().return_const(Channel::InApp);
        let bad = Uuid::new_v4();
        flaky.expect_deliver().returning(move |n| {
            if n.recipient_id == bad {
                Err(Error::Internal("rejected".into()))
            } else {
                Ok(())
            }
        });
        let dispatcher = NotificationDispatcher::new(vec![Arc::new(flaky)], no_preferences());

        let recipients = vec![Uuid::new_v4(), bad, Uuid::new_v4()];
        let summary = dispatcher
            .send_bulk(
                &recipients,
                NotificationKind::SystemMaintenance,
                json!({"window": "Sunday 02:00"}),
                Some(&[Channel::InApp]),
            )
            .await;
        assert_eq!(
            summary,
            BulkSendSummary {
                total: 3,
                success: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn outbound_notification_renders_kind_template() {
        let n = OutboundNotification::new(
            Uuid::nil(),
            NotificationKind::ApplicationOffer,
            json!({"job_title": "Designer"}),
        );
        assert_eq!(n.title, "Job Offer Received");
        assert_eq!(n.message, "You have received an offer for Designer.");
        assert!(n.action_required);
        assert_eq!(n.priority, Priority::High);
    }
}

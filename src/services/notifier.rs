use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::{Collection, Database};
use tracing::{debug, info, warn};

use crate::{
    error::EngineError,
    models::{Alert, AlertEvent, NotificationRequest},
    services::user_store::UserStore,
};

/// Hands a notification to whatever actually delivers it (mailer, push).
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> Result<(), EngineError>;
}

/// Queues requests in `notification_outbox` for the mailer to pick up.
#[derive(Clone)]
pub struct OutboxSender {
    col: Collection<NotificationRequest>,
}

impl OutboxSender {
    pub fn new(db: &Database) -> Self {
        Self {
            col: db.collection::<NotificationRequest>("notification_outbox"),
        }
    }
}

#[async_trait]
impl NotificationSender for OutboxSender {
    async fn send(&self, request: &NotificationRequest) -> Result<(), EngineError> {
        self.col
            .insert_one(request, None)
            .await
            .map_err(|e| EngineError::Notification(e.to_string()))?;
        Ok(())
    }
}

/// Writes requests to the log only.
#[derive(Clone, Default)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, request: &NotificationRequest) -> Result<(), EngineError> {
        info!(
            to = %request.recipient_email,
            alert_id = %request.alert.id,
            symbol = %request.alert.stock_symbol,
            event = request.event.label(),
            "notification"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    /// User switched notifications off.
    Disabled,
    /// Sender failed or timed out; already logged.
    Failed,
}

#[derive(Clone)]
pub struct Notifier {
    users: Arc<dyn UserStore>,
    sender: Arc<dyn NotificationSender>,
    send_timeout: Duration,
}

impl Notifier {
    pub fn new(
        users: Arc<dyn UserStore>,
        sender: Arc<dyn NotificationSender>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            users,
            sender,
            send_timeout,
        }
    }

    /// Makes at most one delivery attempt. Only a missing or unreadable
    /// owner is an error; sender failures come back as
    /// [`NotifyOutcome::Failed`].
    pub async fn notify(
        &self,
        alert: &Alert,
        event: AlertEvent,
    ) -> Result<NotifyOutcome, EngineError> {
        let user = self.users.get_user(alert.user_id).await?;

        let prefs = match self.users.get_preferences(user.id).await {
            Ok(p) => p,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "failed to load preferences, assuming defaults");
                None
            }
        };

        // no preferences record means notifications are on
        let enabled = prefs.map(|p| p.email_notifications).unwrap_or(true);
        if !enabled {
            debug!(user_id = %user.id, alert_id = %alert.id, "notifications disabled by user");
            return Ok(NotifyOutcome::Disabled);
        }

        let request = NotificationRequest {
            recipient_user_id: user.id,
            recipient_email: user.email.clone(),
            recipient_name: user.display_name().to_string(),
            alert: alert.clone(),
            event,
            created_at: Utc::now().timestamp(),
        };

        match tokio::time::timeout(self.send_timeout, self.sender.send(&request)).await {
            Ok(Ok(())) => {
                info!(
                    alert_id = %alert.id,
                    user_id = %user.id,
                    event = request.event.label(),
                    "notification sent"
                );
                Ok(NotifyOutcome::Sent)
            }
            Ok(Err(e)) => {
                warn!(alert_id = %alert.id, error = %e, "failed to send notification");
                Ok(NotifyOutcome::Failed)
            }
            Err(_) => {
                warn!(alert_id = %alert.id, "notification send timed out");
                Ok(NotifyOutcome::Failed)
            }
        }
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Channel;
use crate::config::PushConfig;
use crate::error::NotificationError;
use crate::notifiable::Notifiable;
use crate::notification::Notification;
use crate::types::ChannelKind;

/// Priority value sent for urgent messages
pub const HIGH_PRIORITY: &str = "High";

/// Message posted to the SMS / push gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub sender_id: Option<String>,
    pub body: String,
    pub recipient: String,
    pub priority: Option<String>,
}

impl PushMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    pub fn sender_id(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    /// Mark the message as high priority.
    pub fn high_priority(mut self) -> Self {
        self.priority = Some(HIGH_PRIORITY.to_string());
        self
    }

    /// Messages without a recipient or body are dropped instead of sent.
    pub fn is_deliverable(&self) -> bool {
        !self.recipient.is_empty() && !self.body.is_empty()
    }
}

/// Posts form-encoded messages to an HTTP gateway (`{base_url}/rest/Messages/Send`).
pub struct PushChannel {
    http_client: Client,
    config: PushConfig,
}

impl PushChannel {
    pub fn new(config: PushConfig) -> Result<Self, NotificationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Use a preconfigured client (proxies, custom TLS roots)
    pub fn with_client(config: PushConfig, http_client: Client) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn form<'a>(&'a self, message: &'a PushMessage) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![
            ("AppSid", self.config.app_sid.as_str()),
            ("Body", message.body.as_str()),
            ("Recipient", message.recipient.as_str()),
        ];
        if let Some(priority) = &message.priority {
            form.push(("Priority", priority.as_str()));
        }
        if let Some(sender_id) = &message.sender_id {
            form.push(("SenderID", sender_id.as_str()));
        }
        form
    }
}

#[async_trait]
impl Channel for PushChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::PUSH
    }

    async fn send(
        &self,
        notifiable: &dyn Notifiable,
        notification: &dyn Notification,
    ) -> Result<(), NotificationError> {
        let render = notification.as_push().ok_or_else(|| {
            NotificationError::missing_render_method(
                ChannelKind::PUSH,
                notification.notification_type(),
            )
        })?;

        let message = render.to_push(notifiable);
        if !message.is_deliverable() {
            debug!(
                notifiable = %notifiable.notifiable_ref(),
                "Push message has no recipient or body, skipping"
            );
            return Ok(());
        }

        let response = self
            .http_client
            .post(self.config.endpoint())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&self.form(&message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error, "Push gateway rejected message");
            return Err(NotificationError::SendFailed(format!(
                "Push gateway returned {}: {}",
                status, error
            )));
        }

        info!(
            notifiable = %notifiable.notifiable_ref(),
            notification_type = notification.notification_type(),
            "Push notification sent"
        );
        Ok(())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::Channel;
use crate::error::NotificationError;
use crate::notifiable::Notifiable;
use crate::notification::Notification;
use crate::record::NewDeliveryRecord;
use crate::store::DeliveryStore;
use crate::types::ChannelKind;

/// Persists each notification as a [`DeliveryRecord`](crate::record::DeliveryRecord).
pub struct DatabaseChannel {
    store: Arc<dyn DeliveryStore>,
}

impl DatabaseChannel {
    pub fn new(store: Arc<dyn DeliveryStore>) -> Self {
        Self { store }
    }

    /// Payload from `to_database`, falling back to the generic `to_payload`.
    fn payload(
        notifiable: &dyn Notifiable,
        notification: &dyn Notification,
    ) -> Result<Value, NotificationError> {
        if let Some(render) = notification.as_database() {
            return Ok(render.to_database(notifiable));
        }
        if let Some(render) = notification.as_payload() {
            return Ok(render.to_payload(notifiable));
        }
        Err(NotificationError::missing_render_method(
            ChannelKind::DATABASE,
            notification.notification_type(),
        ))
    }
}

#[async_trait]
impl Channel for DatabaseChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::DATABASE
    }

    async fn send(
        &self,
        notifiable: &dyn Notifiable,
        notification: &dyn Notification,
    ) -> Result<(), NotificationError> {
        let data = Self::payload(notifiable, notification)?;

        let record = self
            .store
            .create(NewDeliveryRecord {
                notification_type: notification.notification_type().to_string(),
                notifiable: notifiable.notifiable_ref(),
                data,
            })
            .await?;

        debug!(
            record_id = %record.id,
            notifiable = %record.notifiable,
            backend = self.store.backend_name(),
            "Stored database notification"
        );
        Ok(())
    }
}

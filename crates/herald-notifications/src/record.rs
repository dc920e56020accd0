use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::NotificationError;
use crate::notifiable::{Notifiable, NotifiableResolver};
use crate::types::NotifiableRef;

/// A notification persisted by the database channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: Uuid,

    /// Type name of the originating notification
    #[serde(rename = "type")]
    pub notification_type: String,

    /// Recipient back-reference
    pub notifiable: NotifiableRef,

    /// Payload rendered by the notification
    pub data: serde_json::Value,

    /// None = unread
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,

    /// Timestamps
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl DeliveryRecord {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    /// Marks the record as read at `now`. Returns false if it was already read.
    pub fn mark_as_read(&mut self, now: OffsetDateTime) -> bool {
        if self.is_read() {
            return false;
        }
        self.read_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Clears `read_at`. Returns false if the record was already unread.
    pub fn mark_as_unread(&mut self, now: OffsetDateTime) -> bool {
        if self.is_unread() {
            return false;
        }
        self.read_at = None;
        self.updated_at = now;
        true
    }

    /// Look the recipient up through `resolver`.
    pub async fn resolve_notifiable(
        &self,
        resolver: &dyn NotifiableResolver,
    ) -> Result<Option<Arc<dyn Notifiable>>, NotificationError> {
        resolver.resolve(&self.notifiable).await
    }
}

/// Fields a caller supplies when creating a record; the store assigns the
/// id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeliveryRecord {
    pub notification_type: String,
    pub notifiable: NotifiableRef,
    pub data: serde_json::Value,
}

impl NewDeliveryRecord {
    pub fn into_record(self, id: Uuid, now: OffsetDateTime) -> DeliveryRecord {
        DeliveryRecord {
            id,
            notification_type: self.notification_type,
            notifiable: self.notifiable,
            data: self.data,
            read_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

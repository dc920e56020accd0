//! Recipient capabilities: identity, delivery veto, history queries and
//! notification routing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{NotificationError, StoreError};
use crate::notification::Notification;
use crate::record::DeliveryRecord;
use crate::sender::NotificationSender;
use crate::store::DeliveryStore;
use crate::types::{ChannelKind, DispatchReport, NotifiableRef, ReadFilter};

/// An entity that can receive notifications.
pub trait Notifiable: Send + Sync {
    /// Back-reference stored on delivery records.
    fn notifiable_ref(&self) -> NotifiableRef;

    /// Gate consulted for every (notification, channel) pair before sending.
    fn should_send_notification(
        &self,
        _notification: &dyn Notification,
        _channel: &ChannelKind,
    ) -> bool {
        true
    }

    /// Channel-specific address (email, phone number, ...) for render methods.
    fn route_notification_for(&self, _channel: &ChannelKind) -> Option<String> {
        None
    }
}

/// Looks a recipient up again from a stored back-reference.
#[async_trait]
pub trait NotifiableResolver: Send + Sync {
    async fn resolve(
        &self,
        notifiable: &NotifiableRef,
    ) -> Result<Option<Arc<dyn Notifiable>>, NotificationError>;
}

/// Query over one recipient's delivery records.
///
/// Building the query does not touch the store; every `fetch`/`count` call
/// runs it again, so a query can be reused after new deliveries.
#[derive(Clone)]
pub struct DeliveryQuery<'a> {
    store: &'a dyn DeliveryStore,
    notifiable: NotifiableRef,
    filter: ReadFilter,
}

impl<'a> DeliveryQuery<'a> {
    pub fn new(store: &'a dyn DeliveryStore, notifiable: NotifiableRef) -> Self {
        Self {
            store,
            notifiable,
            filter: ReadFilter::Any,
        }
    }

    /// Only records with `read_at` set.
    pub fn read(mut self) -> Self {
        self.filter = ReadFilter::Read;
        self
    }

    /// Only records with `read_at` unset.
    pub fn unread(mut self) -> Self {
        self.filter = ReadFilter::Unread;
        self
    }

    pub fn filter(&self) -> ReadFilter {
        self.filter
    }

    pub fn notifiable(&self) -> &NotifiableRef {
        &self.notifiable
    }

    pub async fn fetch(&self) -> Result<Vec<DeliveryRecord>, StoreError> {
        self.store
            .find_by_notifiable(&self.notifiable, self.filter)
            .await
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.store
            .count_by_notifiable(&self.notifiable, self.filter)
            .await
    }

    /// Marks every matching record as read, returning how many changed.
    pub async fn mark_as_read(&self) -> Result<usize, StoreError> {
        let mut changed = 0;
        for record in self.fetch().await?.into_iter().filter(DeliveryRecord::is_unread) {
            self.store.mark_as_read(record.id).await?;
            changed += 1;
        }
        Ok(changed)
    }

    /// Marks every matching record as unread, returning how many changed.
    pub async fn mark_as_unread(&self) -> Result<usize, StoreError> {
        let mut changed = 0;
        for record in self.fetch().await?.into_iter().filter(DeliveryRecord::is_read) {
            self.store.mark_as_unread(record.id).await?;
            changed += 1;
        }
        Ok(changed)
    }
}

/// Access to a recipient's stored notifications.
pub trait HasDatabaseNotifications: Notifiable {
    fn notifications<'a>(&self, store: &'a dyn DeliveryStore) -> DeliveryQuery<'a> {
        DeliveryQuery::new(store, self.notifiable_ref())
    }

    fn read_notifications<'a>(&self, store: &'a dyn DeliveryStore) -> DeliveryQuery<'a> {
        self.notifications(store).read()
    }

    fn unread_notifications<'a>(&self, store: &'a dyn DeliveryStore) -> DeliveryQuery<'a> {
        self.notifications(store).unread()
    }
}

impl<T: Notifiable + ?Sized> HasDatabaseNotifications for T {}

/// Sends notifications to `self`.
#[async_trait]
pub trait RoutesNotifications: Notifiable {
    async fn notify(
        &self,
        sender: &NotificationSender,
        notification: &dyn Notification,
    ) -> Result<DispatchReport, NotificationError>;

    async fn notify_now(
        &self,
        sender: &NotificationSender,
        notification: &dyn Notification,
        channels: Option<&[ChannelKind]>,
    ) -> Result<DispatchReport, NotificationError>;
}

#[async_trait]
impl<T: Notifiable> RoutesNotifications for T {
    async fn notify(
        &self,
        sender: &NotificationSender,
        notification: &dyn Notification,
    ) -> Result<DispatchReport, NotificationError> {
        let notifiable: &dyn Notifiable = self;
        sender.send(&[notifiable], notification, None).await
    }

    async fn notify_now(
        &self,
        sender: &NotificationSender,
        notification: &dyn Notification,
        channels: Option<&[ChannelKind]>,
    ) -> Result<DispatchReport, NotificationError> {
        let notifiable: &dyn Notifiable = self;
        sender.send_now(&[notifiable], notification, channels).await
    }
}

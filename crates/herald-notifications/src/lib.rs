//! Multi-channel notification dispatch.
//!
//! A [`Notification`] names the channels it wants per recipient and renders
//! itself for each; a [`NotificationSender`] routes every (recipient, channel)
//! pair through the recipient's veto gate into the registered [`Channel`].
//!
//! ```ignore
//! let store = Arc::new(InMemoryDeliveryStore::new());
//! let sender = NotificationSender::from_config(&loader::load_config(None)?, store.clone())?;
//!
//! user.notify(&sender, &InvoicePaid::new(42)).await?;
//! let unread = user.unread_notifications(store.as_ref()).fetch().await?;
//! ```

pub mod channels;
pub mod config;
pub mod error;
pub mod notifiable;
pub mod notification;
pub mod observability;
pub mod record;
pub mod sender;
pub mod store;
pub mod types;

pub use channels::{
    Channel, DatabaseChannel, MailChannel, MailMessage, MailTransport, MemoryMailTransport,
    PushChannel, PushMessage, SmtpMailTransport,
};
pub use crate::config::{HeraldConfig, LoggingConfig, MailConfig, PushConfig, SmtpTls, loader};
pub use error::{NotificationError, StoreError};
pub use notifiable::{
    DeliveryQuery, HasDatabaseNotifications, Notifiable, NotifiableResolver, RoutesNotifications,
};
pub use notification::{
    DatabaseNotification, MailNotification, Notification, PayloadNotification, PushNotification,
};
pub use record::{DeliveryRecord, NewDeliveryRecord};
pub use sender::{NotificationSender, RecipientOutcome};
pub use store::{DeliveryStore, InMemoryDeliveryStore};
pub use types::*;

//! Notification contract and per-channel render capabilities.
//!
//! A notification declares which channels it wants through [`Notification::via`]
//! and which render capabilities it has through the `as_*` accessors. A
//! channel asks for the capability it needs; when the accessor returns `None`
//! the channel fails with [`NotificationError::MissingRenderMethod`].
//!
//! ```ignore
//! struct InvoicePaid { amount: u64, locale: Option<String> }
//!
//! impl Notification for InvoicePaid {
//!     fn via(&self, _notifiable: &dyn Notifiable) -> Vec<ChannelKind> {
//!         vec![ChannelKind::DATABASE, ChannelKind::MAIL]
//!     }
//!     fn locale(&self) -> Option<&str> { self.locale.as_deref() }
//!     fn as_database(&self) -> Option<&dyn DatabaseNotification> { Some(self) }
//!     fn as_mail(&self) -> Option<&dyn MailNotification> { Some(self) }
//! }
//! ```
//!
//! [`NotificationError::MissingRenderMethod`]: crate::error::NotificationError::MissingRenderMethod

use serde_json::Value;

use crate::channels::mail::MailMessage;
use crate::channels::push::PushMessage;
use crate::notifiable::Notifiable;
use crate::types::ChannelKind;

/// A single logical event that can be delivered over one or more channels.
pub trait Notification: Send + Sync {
    /// Channels this notification should go out on for the given recipient.
    ///
    /// An empty list means the recipient is skipped.
    fn via(&self, notifiable: &dyn Notifiable) -> Vec<ChannelKind>;

    /// Fully qualified type name stored on delivery records.
    fn notification_type(&self) -> &str {
        std::any::type_name_of_val(self)
    }

    /// Locale to render this notification in.
    fn locale(&self) -> Option<&str> {
        None
    }

    fn as_database(&self) -> Option<&dyn DatabaseNotification> {
        None
    }

    /// Generic payload renderer, used by the database channel when
    /// `as_database` is not provided.
    fn as_payload(&self) -> Option<&dyn PayloadNotification> {
        None
    }

    fn as_mail(&self) -> Option<&dyn MailNotification> {
        None
    }

    fn as_push(&self) -> Option<&dyn PushNotification> {
        None
    }
}

/// Renders the payload persisted by the database channel.
pub trait DatabaseNotification: Send + Sync {
    fn to_database(&self, notifiable: &dyn Notifiable) -> Value;
}

/// Renders a channel-neutral payload.
pub trait PayloadNotification: Send + Sync {
    fn to_payload(&self, notifiable: &dyn Notifiable) -> Value;
}

/// Renders a mail message for the mail channel.
pub trait MailNotification: Send + Sync {
    fn to_mail(&self, notifiable: &dyn Notifiable) -> MailMessage;
}

/// Renders a gateway message for the push channel.
pub trait PushNotification: Send + Sync {
    fn to_push(&self, notifiable: &dyn Notifiable) -> PushMessage;
}

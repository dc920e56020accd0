pub mod database;
pub mod mail;
pub mod push;

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::notifiable::Notifiable;
use crate::notification::Notification;
use crate::types::ChannelKind;

/// A delivery backend
#[async_trait]
pub trait Channel: Send + Sync {
    /// Name notifications use to select this channel
    fn kind(&self) -> ChannelKind;

    /// Deliver `notification` to `notifiable`
    async fn send(
        &self,
        notifiable: &dyn Notifiable,
        notification: &dyn Notification,
    ) -> Result<(), NotificationError>;
}

impl std::fmt::Debug for dyn Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").field("kind", &self.kind()).finish()
    }
}

pub use database::DatabaseChannel;
pub use mail::{MailChannel, MailMessage, MailTransport, MemoryMailTransport, SmtpMailTransport};
pub use push::{PushChannel, PushMessage};

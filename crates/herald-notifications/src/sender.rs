use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::channels::{Channel, DatabaseChannel, MailChannel, PushChannel};
use crate::config::HeraldConfig;
use crate::error::NotificationError;
use crate::notifiable::Notifiable;
use crate::notification::Notification;
use crate::store::DeliveryStore;
use crate::types::{ChannelKind, DispatchReport, NotifiableRef};

/// Result of dispatching to one recipient in [`NotificationSender::send_isolated`]
#[derive(Debug)]
pub struct RecipientOutcome {
    pub notifiable: NotifiableRef,
    pub result: Result<DispatchReport, NotificationError>,
}

/// Routes notifications to recipients over registered channels.
///
/// Every (recipient, channel) pair is sent in order and awaited before the
/// next one starts. `send` and `send_now` stop at the first error.
#[derive(Default)]
pub struct NotificationSender {
    channels: HashMap<ChannelKind, Arc<dyn Channel>>,
}

impl NotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender with the database channel plus whichever of mail/push are configured.
    pub fn from_config(
        config: &HeraldConfig,
        store: Arc<dyn DeliveryStore>,
    ) -> Result<Self, NotificationError> {
        config.validate()?;

        let mut sender = Self::new().with_channel(DatabaseChannel::new(store));
        if let Some(mail) = &config.mail {
            sender = sender.with_channel(MailChannel::from_config(mail)?);
        }
        if let Some(push) = &config.push {
            sender = sender.with_channel(PushChannel::new(push.clone())?);
        }

        info!(
            channels = ?sender.channel_kinds(),
            config = ?config.masked(),
            "Notification sender configured"
        );
        Ok(sender)
    }

    pub fn with_channel(mut self, channel: impl Channel + 'static) -> Self {
        self.register(Arc::new(channel));
        self
    }

    /// Register a channel under its kind, replacing any previous one.
    pub fn register(&mut self, channel: Arc<dyn Channel>) -> Option<Arc<dyn Channel>> {
        self.channels.insert(channel.kind(), channel)
    }

    pub fn channel(&self, kind: &ChannelKind) -> Option<&Arc<dyn Channel>> {
        self.channels.get(kind)
    }

    /// Registered channel kinds, sorted by name
    pub fn channel_kinds(&self) -> Vec<ChannelKind> {
        let mut kinds: Vec<_> = self.channels.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Send `notification` to every notifiable.
    ///
    /// `channels` overrides `via()` for every recipient when non-empty.
    pub async fn send(
        &self,
        notifiables: &[&dyn Notifiable],
        notification: &dyn Notification,
        channels: Option<&[ChannelKind]>,
    ) -> Result<DispatchReport, NotificationError> {
        self.send_now(notifiables, notification, channels).await
    }

    /// Send `notification` immediately. Identical to [`send`](Self::send);
    /// there is no deferred path.
    pub async fn send_now(
        &self,
        notifiables: &[&dyn Notifiable],
        notification: &dyn Notification,
        channels: Option<&[ChannelKind]>,
    ) -> Result<DispatchReport, NotificationError> {
        let mut report = DispatchReport::default();
        for notifiable in notifiables {
            let sent = self
                .send_to_notifiable(*notifiable, notification, channels)
                .await?;
            report.merge(sent);
        }
        Ok(report)
    }

    /// Like [`send_now`](Self::send_now), but one recipient's failure does not
    /// stop delivery to the others.
    ///
    /// Within a recipient the channel list still stops at the first error.
    pub async fn send_isolated(
        &self,
        notifiables: &[&dyn Notifiable],
        notification: &dyn Notification,
        channels: Option<&[ChannelKind]>,
    ) -> Vec<RecipientOutcome> {
        let mut outcomes = Vec::with_capacity(notifiables.len());
        for notifiable in notifiables {
            let result = self
                .send_to_notifiable(*notifiable, notification, channels)
                .await;
            outcomes.push(RecipientOutcome {
                notifiable: notifiable.notifiable_ref(),
                result,
            });
        }
        outcomes
    }

    async fn send_to_notifiable(
        &self,
        notifiable: &dyn Notifiable,
        notification: &dyn Notification,
        channels: Option<&[ChannelKind]>,
    ) -> Result<DispatchReport, NotificationError> {
        let mut report = DispatchReport::default();

        let via = match channels {
            Some(channels) if !channels.is_empty() => channels.to_vec(),
            _ => notification.via(notifiable),
        };

        if via.is_empty() {
            debug!(
                notifiable = %notifiable.notifiable_ref(),
                notification_type = notification.notification_type(),
                "No channels selected, skipping recipient"
            );
            report.skipped_recipients += 1;
            return Ok(report);
        }

        for kind in &via {
            if !notifiable.should_send_notification(notification, kind) {
                debug!(
                    notifiable = %notifiable.notifiable_ref(),
                    channel = %kind,
                    "Recipient vetoed channel"
                );
                report.vetoed += 1;
                continue;
            }

            let channel = self
                .channels
                .get(kind)
                .ok_or_else(|| NotificationError::ChannelNotRegistered(kind.clone()))?;

            channel.send(notifiable, notification).await?;
            report.delivered += 1;
        }

        Ok(report)
    }
}

impl std::fmt::Debug for NotificationSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSender")
            .field("channels", &self.channel_kinds())
            .finish()
    }
}

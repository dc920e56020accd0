use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::Channel;
use crate::config::{MailConfig, SmtpTls};
use crate::error::NotificationError;
use crate::notifiable::Notifiable;
use crate::notification::Notification;
use crate::types::ChannelKind;

/// Mail content rendered by a notification.
///
/// A message with both a text and an HTML body is sent as
/// `multipart/alternative`; otherwise it is a single part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailMessage {
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
}

impl MailMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    pub fn cc(mut self, address: impl Into<String>) -> Self {
        self.cc.push(address.into());
        self
    }

    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.push(address.into());
        self
    }

    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text = Some(body.into());
        self
    }

    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html = Some(body.into());
        self
    }

    pub fn is_multipart(&self) -> bool {
        self.text.is_some() && self.html.is_some()
    }

    /// Build the transport message, using `default_from` when no sender was set.
    pub fn to_message(&self, default_from: Option<&Mailbox>) -> Result<Message, String> {
        if self.to.is_empty() {
            return Err("message has no recipients".into());
        }

        let from = match &self.from {
            Some(address) => parse_mailbox(address)?,
            None => default_from
                .cloned()
                .ok_or_else(|| "message has no sender".to_string())?,
        };

        let mut builder = Message::builder().from(from);
        for address in &self.to {
            builder = builder.to(parse_mailbox(address)?);
        }
        for address in &self.cc {
            builder = builder.cc(parse_mailbox(address)?);
        }
        for address in &self.bcc {
            builder = builder.bcc(parse_mailbox(address)?);
        }
        if let Some(address) = &self.reply_to {
            builder = builder.reply_to(parse_mailbox(address)?);
        }
        if let Some(subject) = &self.subject {
            builder = builder.subject(subject.clone());
        }

        let message = match (&self.text, &self.html) {
            (Some(text), Some(html)) => {
                builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
            }
            (Some(text), None) => builder.header(ContentType::TEXT_PLAIN).body(text.clone()),
            (None, Some(html)) => builder.header(ContentType::TEXT_HTML).body(html.clone()),
            (None, None) => return Err("message has no body".into()),
        };

        message.map_err(|e| e.to_string())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, String> {
    address
        .parse()
        .map_err(|e| format!("invalid address '{}': {}", address, e))
}

/// Hands built messages to a mail server
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), NotificationError>;
}

/// SMTP transport backed by lettre
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn from_config(config: &MailConfig) -> Result<Self, NotificationError> {
        let mut builder = match config.tls {
            SmtpTls::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .map_err(|e| NotificationError::InvalidConfig(e.to_string()))?
            }
            SmtpTls::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| NotificationError::InvalidConfig(e.to_string()))?,
            SmtpTls::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            }
        }
        .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Some(Duration::from_secs(secs)));
        }

        Ok(Self {
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: Message) -> Result<(), NotificationError> {
        let response = self
            .mailer
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        debug!(code = %response.code(), "SMTP server accepted message");
        Ok(())
    }
}

/// Keeps sent messages in memory instead of delivering them
#[derive(Debug, Default)]
pub struct MemoryMailTransport {
    messages: Mutex<Vec<Message>>,
}

impl MemoryMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for MemoryMailTransport {
    async fn send(&self, message: Message) -> Result<(), NotificationError> {
        self.messages.lock().await.push(message);
        Ok(())
    }
}

/// Sends notifications rendered with `to_mail` through a [`MailTransport`].
pub struct MailChannel {
    transport: Arc<dyn MailTransport>,
    default_from: Option<Mailbox>,
}

impl MailChannel {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            transport,
            default_from: None,
        }
    }

    /// Sender used for messages that do not set one.
    pub fn with_default_from(mut self, address: &str) -> Result<Self, NotificationError> {
        let mailbox = parse_mailbox(address).map_err(NotificationError::InvalidConfig)?;
        self.default_from = Some(mailbox);
        Ok(self)
    }

    pub fn from_config(config: &MailConfig) -> Result<Self, NotificationError> {
        let channel = Self::new(Arc::new(SmtpMailTransport::from_config(config)?));
        match &config.from {
            Some(from) => channel.with_default_from(from),
            None => Ok(channel),
        }
    }
}

#[async_trait]
impl Channel for MailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::MAIL
    }

    async fn send(
        &self,
        notifiable: &dyn Notifiable,
        notification: &dyn Notification,
    ) -> Result<(), NotificationError> {
        let render = notification.as_mail().ok_or_else(|| {
            NotificationError::missing_render_method(
                ChannelKind::MAIL,
                notification.notification_type(),
            )
        })?;

        let message = render
            .to_mail(notifiable)
            .to_message(self.default_from.as_ref())
            .map_err(|reason| NotificationError::invalid_message(ChannelKind::MAIL, reason))?;

        self.transport.send(message).await?;

        info!(
            notifiable = %notifiable.notifiable_ref(),
            notification_type = notification.notification_type(),
            "Mail notification sent"
        );
        Ok(())
    }
}

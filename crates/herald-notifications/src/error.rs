use thiserror::Error;
use uuid::Uuid;

use crate::types::ChannelKind;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification {notification_type} has no render method for channel '{channel}'")]
    MissingRenderMethod {
        channel: ChannelKind,
        notification_type: String,
    },

    #[error("Invalid message for channel '{channel}': {reason}")]
    InvalidMessageShape { channel: ChannelKind, reason: String },

    #[error("Channel not registered: {0}")]
    ChannelNotRegistered(ChannelKind),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    pub fn missing_render_method(channel: ChannelKind, notification_type: impl Into<String>) -> Self {
        Self::MissingRenderMethod {
            channel,
            notification_type: notification_type.into(),
        }
    }

    pub fn invalid_message(channel: ChannelKind, reason: impl Into<String>) -> Self {
        Self::InvalidMessageShape {
            channel,
            reason: reason.into(),
        }
    }
}

/// Errors reported by a [`DeliveryStore`](crate::store::DeliveryStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No delivery record exists with the given id.
    #[error("Delivery record not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: Uuid,
    },

    /// The backend failed for a reason of its own.
    #[error("Store error: {message}")]
    Internal {
        /// Description of the backend failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(id: Uuid) -> Self {
        Self::NotFound { id }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

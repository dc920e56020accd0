use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a delivery channel.
///
/// The built-in channels are available as constants; third-party channels
/// pick their own name with [`ChannelKind::custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelKind(Cow<'static, str>);

impl ChannelKind {
    /// Persists a delivery record.
    pub const DATABASE: ChannelKind = ChannelKind(Cow::Borrowed("database"));
    /// Sends through the configured mail transport.
    pub const MAIL: ChannelKind = ChannelKind(Cow::Borrowed("mail"));
    /// Posts to an HTTP push / SMS gateway.
    pub const PUSH: ChannelKind = ChannelKind(Cow::Borrowed("push"));

    pub fn custom(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ChannelKind {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

/// Back-reference to a recipient entity (e.g. `User/42`).
///
/// Records hold this pair, never the recipient itself; use a
/// [`NotifiableResolver`](crate::notifiable::NotifiableResolver) to look the
/// entity up again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotifiableRef {
    pub kind: String,
    pub id: String,
}

impl NotifiableRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for NotifiableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Read-state filter for delivery record queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFilter {
    #[default]
    Any,
    Read,
    Unread,
}

impl ReadFilter {
    pub fn matches(self, is_read: bool) -> bool {
        match self {
            ReadFilter::Any => true,
            ReadFilter::Read => is_read,
            ReadFilter::Unread => !is_read,
        }
    }
}

/// Outcome counters for a single dispatch call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// (recipient, channel) pairs handed to a channel backend.
    pub delivered: u32,
    /// Pairs the recipient vetoed through `should_send_notification`.
    pub vetoed: u32,
    /// Recipients for which no channel was selected at all.
    pub skipped_recipients: u32,
}

impl DispatchReport {
    pub fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.vetoed += other.vetoed;
        self.skipped_recipients += other.skipped_recipients;
    }

    /// True when nothing was handed to any channel.
    pub fn is_empty(&self) -> bool {
        self.delivered == 0
    }
}

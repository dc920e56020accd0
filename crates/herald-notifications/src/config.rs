use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::NotificationError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HeraldConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Mail channel; omitted = not registered
    #[serde(default)]
    pub mail: Option<MailConfig>,
    /// Push / SMS gateway channel; omitted = not registered
    #[serde(default)]
    pub push: Option<PushConfig>,
}

impl HeraldConfig {
    pub fn validate(&self) -> Result<(), NotificationError> {
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(NotificationError::InvalidConfig(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }

        if let Some(mail) = &self.mail {
            if mail.smtp_host.trim().is_empty() {
                return Err(NotificationError::InvalidConfig(
                    "mail.smtp_host must not be empty".into(),
                ));
            }
            if mail.smtp_port == 0 {
                return Err(NotificationError::InvalidConfig(
                    "mail.smtp_port must be > 0".into(),
                ));
            }
            if let Some(from) = &mail.from
                && from.parse::<lettre::message::Mailbox>().is_err()
            {
                return Err(NotificationError::InvalidConfig(format!(
                    "mail.from is not a valid address: {from}"
                )));
            }
        }

        if let Some(push) = &self.push {
            if push.app_sid.trim().is_empty() {
                return Err(NotificationError::InvalidConfig(
                    "push.app_sid must not be empty".into(),
                ));
            }
            let url = Url::parse(&push.base_url).map_err(|e| {
                NotificationError::InvalidConfig(format!("push.base_url is invalid: {e}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(NotificationError::InvalidConfig(
                    "push.base_url must use http or https".into(),
                ));
            }
            if push.timeout_secs == 0 {
                return Err(NotificationError::InvalidConfig(
                    "push.timeout_secs must be > 0".into(),
                ));
            }
        }

        Ok(())
    }

    /// Copy with credentials replaced, for logging
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        if let Some(mail) = config.mail.as_mut()
            && mail.smtp_password.is_some()
        {
            mail.smtp_password = Some("***".to_string());
        }
        if let Some(push) = config.push.as_mut() {
            push.app_sid = "***".to_string();
        }
        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SMTP connection security
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Upgrade a plain connection with STARTTLS
    #[default]
    Starttls,
    /// TLS from the first byte (SMTPS)
    Wrapper,
    /// Unencrypted; local relays and test servers only
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_password: Option<String>,

    /// Sender for messages that do not set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default)]
    pub tls: SmtpTls,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Application SID issued by the gateway
    pub app_sid: String,

    #[serde(default = "default_push_base_url")]
    pub base_url: String,

    #[serde(default = "default_push_timeout")]
    pub timeout_secs: u64,
}

impl PushConfig {
    pub fn new(app_sid: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            app_sid: app_sid.into(),
            base_url: base_url.into(),
            timeout_secs: default_push_timeout(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/rest/Messages/Send", self.base_url.trim_end_matches('/'))
    }
}

fn default_push_base_url() -> String {
    "http://api.unifonic.com".to_string()
}

fn default_push_timeout() -> u64 {
    30
}

pub mod loader {
    use super::HeraldConfig;
    use crate::error::NotificationError;
    use config::{Config, Environment, File, FileFormat};
    use std::path::PathBuf;

    /// Load from a TOML file (default `herald.toml`) with `HERALD__*` env overrides
    pub fn load_config(path: Option<&str>) -> Result<HeraldConfig, NotificationError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("herald.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // e.g. HERALD__PUSH__APP_SID=xyz
        builder = builder.add_source(
            Environment::with_prefix("HERALD")
                .prefix_separator("__")
                .separator("__"),
        );
        finish(builder)
    }

    /// Parse configuration embedded as TOML text
    pub fn from_toml_str(contents: &str) -> Result<HeraldConfig, NotificationError> {
        finish(Config::builder().add_source(File::from_str(contents, FileFormat::Toml)))
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<HeraldConfig, NotificationError> {
        let cfg = builder
            .build()
            .map_err(|e| NotificationError::InvalidConfig(format!("config build error: {e}")))?;
        let merged: HeraldConfig = cfg.try_deserialize().map_err(|e| {
            NotificationError::InvalidConfig(format!("config deserialize error: {e}"))
        })?;
        merged.validate()?;
        Ok(merged)
    }
}

//! Application settings and configuration types.
//!
//! Settings are read once at startup from the JSON file named on the command
//! line and stay immutable for the rest of the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Address, Sender};
use crate::services::{
    DigestSettings, ResolverConfig, DEFAULT_CONCURRENCY, DEFAULT_MAX_REDIRECTS, DEFAULT_SUBJECT,
    DEFAULT_TIMEOUT_SECS,
};

/// Scope granting read and send access to Gmail.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Gmail API access.
    pub gmail: GmailSettings,
    /// Which newsletters to scan and what to drop.
    pub newsletter: NewsletterSettings,
    /// Digest delivery address.
    pub email: EmailSettings,
    /// Redirect resolution.
    #[serde(default)]
    pub resolver: ResolverSettings,
    /// Whole-run limits.
    #[serde(default)]
    pub run: RunSettings,
}

/// Gmail credentials and token locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailSettings {
    /// OAuth client secret file downloaded from the Google Cloud console.
    pub credentials: PathBuf,
    /// File where access and refresh tokens are cached.
    pub token: PathBuf,
    /// OAuth scopes the stored grant must cover.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_scopes() -> Vec<String> {
    vec![DEFAULT_SCOPE.to_string()]
}

/// Newsletter selection and digest options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterSettings {
    /// Addresses whose messages are scanned.
    pub newsletter_senders: Vec<String>,
    /// Substrings that exclude a resolved URL.
    #[serde(default)]
    pub unwanted_urls: Vec<String>,
    /// Digest subject line.
    #[serde(default = "default_subject")]
    pub subject: String,
    /// How many days back the mailbox query reaches.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Whether a digest with no URLs is still sent.
    #[serde(default = "default_true")]
    pub send_empty_digest: bool,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_lookback_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

/// Digest delivery address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    /// Address the digest is sent from and to.
    pub email_address: String,
}

/// Redirect resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Per-URL timeout in seconds.
    pub timeout_secs: u64,
    /// Concurrent resolutions per message.
    pub concurrency: usize,
    /// Maximum redirects followed per URL.
    pub max_redirects: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ResolverSettings {
    /// HTTP resolver configuration.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_redirects: self.max_redirects,
        }
    }
}

/// Whole-run limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    /// Upper bound on the collection phase, in seconds.
    pub deadline_secs: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self { deadline_secs: 600 }
    }
}

impl RunSettings {
    /// The collection deadline.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Settings {
    /// Loads and validates settings from `path`.
    ///
    /// Relative credential and token paths are resolved against the config
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut settings = Self::from_json(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        if let Some(base) = path.parent() {
            settings.resolve_paths(base);
        }

        Ok(settings)
    }

    /// Parses and validates settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let newsletter = &self.newsletter;

        if newsletter.newsletter_senders.is_empty() {
            return Err(ConfigError::Invalid(
                "newsletter.newsletter_senders must list at least one sender".to_string(),
            ));
        }
        if let Some(blank) = newsletter
            .newsletter_senders
            .iter()
            .find(|s| s.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "newsletter.newsletter_senders contains a blank entry: {:?}",
                blank
            )));
        }
        if newsletter.unwanted_urls.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid(
                "newsletter.unwanted_urls contains an empty pattern, which would exclude every URL"
                    .to_string(),
            ));
        }
        if newsletter.lookback_days == 0 {
            return Err(ConfigError::Invalid(
                "newsletter.lookback_days must be at least 1".to_string(),
            ));
        }
        if !self.address().is_plausible() {
            return Err(ConfigError::Invalid(format!(
                "email.email_address is not an email address: {:?}",
                self.email.email_address
            )));
        }
        if self.resolver.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "resolver.concurrency must be at least 1".to_string(),
            ));
        }
        if self.resolver.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "resolver.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.run.deadline_secs == 0 {
            return Err(ConfigError::Invalid(
                "run.deadline_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.gmail.credentials, &mut self.gmail.token] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Configured senders, trimmed.
    pub fn senders(&self) -> Vec<Sender> {
        self.newsletter
            .newsletter_senders
            .iter()
            .map(|s| Sender::from(s.trim()))
            .collect()
    }

    /// The digest address.
    pub fn address(&self) -> Address {
        Address::new(self.email.email_address.trim())
    }

    /// Outbound digest settings.
    pub fn digest_settings(&self) -> DigestSettings {
        DigestSettings {
            address: self.address(),
            subject: self.newsletter.subject.clone(),
            send_empty: self.newsletter.send_empty_digest,
        }
    }
}

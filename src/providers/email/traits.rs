//! Mail provider trait definition.
//!
//! This module defines the [`MailProvider`] trait, the boundary between the
//! digest pipeline and the mail service. The pipeline only ever needs three
//! things from a mailbox: list a sender's recent messages, read a message's
//! text, and send one message.

use async_trait::async_trait;
use base64::prelude::*;

use crate::domain::{Address, DateRange, MessageId, Sender};

/// Result type alias for mail provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during mail provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit or sending quota exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Message body could not be decoded into text.
    #[error("decode error: {0}")]
    Decode(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Returns true if no further mailbox call can succeed in this run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Authentication(_))
    }
}

/// An email to be sent.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    /// Sender address.
    pub from: Address,
    /// Recipient addresses.
    pub to: Vec<Address>,
    /// Email subject.
    pub subject: String,
    /// Plain text body.
    pub body_text: String,
}

impl OutgoingEmail {
    /// Builds a single-part `text/plain` RFC 5322 message.
    pub fn to_rfc5322(&self) -> String {
        let mut message = String::new();

        message.push_str(&format!("From: {}\r\n", self.from.display()));

        let to_addrs: Vec<String> = self.to.iter().map(Address::display).collect();
        message.push_str(&format!("To: {}\r\n", to_addrs.join(", ")));

        message.push_str(&format!("Subject: {}\r\n", encode_header(&self.subject)));
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");
        message.push_str("\r\n");

        message.push_str(&self.body_text);

        message
    }

    /// The RFC 5322 message encoded for the Gmail `raw` send field.
    pub fn to_raw(&self) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(self.to_rfc5322().as_bytes())
    }
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?B?{}?=", BASE64_STANDARD.encode(value.as_bytes()))
    }
}

/// Trait for mailbox access.
///
/// Implementations handle authentication, querying, body decoding and
/// dispatch. All methods return [`Result`]; callers decide which errors are
/// recoverable via [`ProviderError::is_fatal`].
///
/// # Example
///
/// ```ignore
/// use newsletter_digest::domain::{DateRange, Sender};
/// use newsletter_digest::providers::email::MailProvider;
///
/// async fn dump(provider: &dyn MailProvider) -> anyhow::Result<()> {
///     let sender = Sender::from("news@example.com");
///     for id in provider.list_messages(&sender, &DateRange::ending_today(7)).await? {
///         println!("{}", provider.fetch_message_text(&id).await?);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Lists messages sent by `sender` within `range`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Authentication`] if credentials are invalid or
    /// expired and [`ProviderError::InvalidRequest`] for a malformed query.
    async fn list_messages(&self, sender: &Sender, range: &DateRange) -> Result<Vec<MessageId>>;

    /// Fetches a message and decodes its body to text.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] if the id is unknown and
    /// [`ProviderError::Decode`] if the body is not valid base64url UTF-8.
    async fn fetch_message_text(&self, id: &MessageId) -> Result<String>;

    /// Sends an email and returns the provider-assigned message id.
    async fn send_message(&self, email: &OutgoingEmail) -> Result<String>;
}

//! Digest assembly and dispatch.
//!
//! The [`DigestService`] turns a [`UrlCollection`] into the digest email and
//! hands it to the mail provider.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{Address, Digest, UrlCollection};
use crate::providers::email::{MailProvider, OutgoingEmail, ProviderError};

/// Subject used when none is configured.
pub const DEFAULT_SUBJECT: &str = "Weekly ML Newsletter";

/// Errors that can occur while dispatching the digest.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The provider refused or failed to send the digest.
    #[error("failed to send digest: {0}")]
    Send(#[from] ProviderError),
}

/// What happened to the assembled digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Sent; carries the provider-assigned message id.
    Sent(String),
    /// Empty and suppressed by configuration.
    SkippedEmpty,
}

/// Outcome of [`DigestService::deliver`].
#[derive(Debug, Clone)]
pub struct DigestReport {
    /// The assembled digest.
    pub digest: Digest,
    /// Whether it went out.
    pub delivery: Delivery,
}

/// Settings for the outbound digest message.
#[derive(Debug, Clone)]
pub struct DigestSettings {
    /// Address the digest is sent from and to.
    pub address: Address,
    /// Subject line.
    pub subject: String,
    /// Whether a digest with no URLs is still sent.
    pub send_empty: bool,
}

impl DigestSettings {
    /// Settings for `address` with the default subject, sending empty digests.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            subject: DEFAULT_SUBJECT.to_string(),
            send_empty: true,
        }
    }
}

/// Assembles and sends the digest email.
pub struct DigestService {
    provider: Arc<dyn MailProvider>,
    settings: DigestSettings,
}

impl DigestService {
    /// Creates a new digest service.
    pub fn new(provider: Arc<dyn MailProvider>, settings: DigestSettings) -> Self {
        Self { provider, settings }
    }

    /// Builds the outbound email for `digest`. Sender and recipient are the same address.
    pub fn compose(&self, digest: &Digest) -> OutgoingEmail {
        OutgoingEmail {
            from: self.settings.address.clone(),
            to: vec![self.settings.address.clone()],
            subject: self.settings.subject.clone(),
            body_text: digest.body(),
        }
    }

    /// Assembles the digest from `collection` and sends it.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Send`] if the provider fails to send.
    pub async fn deliver(&self, collection: &UrlCollection) -> Result<DigestReport, DigestError> {
        tracing::info!(
            groups = collection.group_count(),
            urls = collection.url_count(),
            "assembling digest"
        );
        let digest = Digest::from_collection(collection);

        if digest.is_empty() && !self.settings.send_empty {
            tracing::info!("digest is empty, not sending");
            return Ok(DigestReport {
                digest,
                delivery: Delivery::SkippedEmpty,
            });
        }

        let email = self.compose(&digest);
        let id = self.provider.send_message(&email).await?;
        tracing::info!(message_id = %id, entries = digest.len(), "digest sent");

        Ok(DigestReport {
            digest,
            delivery: Delivery::Sent(id),
        })
    }
}

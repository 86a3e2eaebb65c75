//! Collection pipeline.
//!
//! The [`CollectionService`] walks every configured sender's messages in the
//! date window and turns each message into a group of resolved, wanted URLs:
//!
//! ```text
//! sender -> message ids -> body text -> candidates -> resolved -> filtered
//! ```
//!
//! Per-item failures are absorbed and counted in the [`CollectionReport`]. Only
//! mailbox errors that make every later call pointless (authentication) abort
//! the run.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;

use super::resolver::{ResolveResult, UrlResolver};
use super::url_extractor::UrlExtractor;
use super::url_filter::UnwantedUrlFilter;
use crate::domain::{DateRange, MessageId, Sender, UrlCollection};
use crate::providers::email::{MailProvider, ProviderError};

/// Default number of concurrent redirect resolutions.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Errors that abort collection.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The mailbox rejected the run's credentials.
    #[error("mailbox access failed while processing {sender}: {source}")]
    Provider {
        sender: Sender,
        #[source]
        source: ProviderError,
    },
}

/// Counters describing one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    /// Senders queried.
    pub senders: usize,
    /// Messages whose text was scanned.
    pub messages_scanned: usize,
    /// Messages skipped because they could not be fetched or decoded.
    pub messages_skipped: usize,
    /// Candidate URLs extracted.
    pub candidates: usize,
    /// Candidates that resolved.
    pub resolved: usize,
    /// Candidates whose resolution failed.
    pub unresolved: usize,
    /// Resolved URLs dropped by the unwanted-URL filter.
    pub excluded: usize,
    /// Absorbed sender and message level errors.
    pub errors: Vec<String>,
}

/// Result of a successful collection pass.
#[derive(Debug, Clone, Default)]
pub struct CollectionOutcome {
    /// Resolved, wanted URLs grouped per message.
    pub collection: UrlCollection,
    /// What happened along the way.
    pub report: CollectionReport,
}

/// Gathers resolved newsletter URLs from the mailbox.
pub struct CollectionService {
    provider: Arc<dyn MailProvider>,
    resolver: Arc<dyn UrlResolver>,
    extractor: UrlExtractor,
    filter: UnwantedUrlFilter,
    concurrency: usize,
}

impl CollectionService {
    /// Creates a new collection service.
    pub fn new(
        provider: Arc<dyn MailProvider>,
        resolver: Arc<dyn UrlResolver>,
        filter: UnwantedUrlFilter,
    ) -> Self {
        Self {
            provider,
            resolver,
            extractor: UrlExtractor::new(),
            filter,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets how many candidates of one message are resolved at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Runs the pipeline over every sender.
    ///
    /// Produces one group per scanned message, plus one empty group for each
    /// sender that yielded no messages.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::Provider`] when the mailbox reports an
    /// authentication failure; every other failure is recorded in the report.
    pub async fn collect(
        &self,
        senders: &[Sender],
        range: &DateRange,
    ) -> Result<CollectionOutcome, CollectionError> {
        let mut outcome = CollectionOutcome::default();

        for sender in senders {
            outcome.report.senders += 1;

            let ids = match self.provider.list_messages(sender, range).await {
                Ok(ids) => ids,
                Err(e) if e.is_fatal() => {
                    return Err(CollectionError::Provider {
                        sender: sender.clone(),
                        source: e,
                    })
                }
                Err(e) => {
                    tracing::warn!(%sender, error = %e, "message query failed, treating sender as empty");
                    outcome.report.errors.push(format!("{}: {}", sender, e));
                    Vec::new()
                }
            };

            if ids.is_empty() {
                tracing::info!(%sender, %range, "no messages found");
                outcome.collection.push_group(Vec::new());
                continue;
            }

            tracing::info!(%sender, count = ids.len(), "scanning messages");

            for id in ids {
                let text = match self.provider.fetch_message_text(&id).await {
                    Ok(text) => text,
                    Err(e) if e.is_fatal() => {
                        return Err(CollectionError::Provider {
                            sender: sender.clone(),
                            source: e,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(%sender, message_id = %id, error = %e, "skipping message");
                        outcome.report.messages_skipped += 1;
                        outcome.report.errors.push(format!("{} ({}): {}", sender, id, e));
                        continue;
                    }
                };

                outcome.report.messages_scanned += 1;
                let urls = self.collect_message(&id, &text, &mut outcome.report).await;
                outcome.collection.push_group(urls);
            }
        }

        Ok(outcome)
    }

    /// Extracts, resolves and filters the URLs of one message.
    async fn collect_message(
        &self,
        id: &MessageId,
        text: &str,
        report: &mut CollectionReport,
    ) -> Vec<String> {
        let candidates = self.extractor.extract(text);
        report.candidates += candidates.len();
        tracing::debug!(message_id = %id, candidates = candidates.len(), "extracted candidates");

        let resolver = &self.resolver;
        let outcomes: Vec<(String, ResolveResult)> = stream::iter(candidates)
            .map(|candidate| async move {
                let outcome = resolver.resolve(&candidate).await;
                (candidate, outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut urls = Vec::with_capacity(outcomes.len());
        for (candidate, outcome) in outcomes {
            match outcome {
                Ok(resolved) => {
                    report.resolved += 1;
                    if self.filter.is_unwanted(&resolved) {
                        report.excluded += 1;
                        tracing::debug!(%candidate, %resolved, "excluded unwanted URL");
                    } else {
                        tracing::debug!(%candidate, %resolved, "resolved");
                        urls.push(resolved);
                    }
                }
                Err(e) => {
                    report.unresolved += 1;
                    tracing::debug!(%candidate, error = %e, "could not resolve, skipping");
                }
            }
        }

        urls
    }
}

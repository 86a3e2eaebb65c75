//! Run orchestration.
//!
//! One run authenticates against the mailbox, collects resolved URLs from the
//! configured senders within the lookback window, and sends the digest.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::domain::{DateRange, Digest};
use crate::providers::email::{ClientCredentials, GmailProvider, MailProvider};
use crate::services::{
    CollectionReport, CollectionService, Delivery, DigestService, HttpResolver, UnwantedUrlFilter,
    UrlResolver,
};
use crate::storage::FileTokenStore;

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Window the mailbox was searched in.
    pub range: DateRange,
    /// Collection counters.
    pub report: CollectionReport,
    /// The assembled digest.
    pub digest: Digest,
    /// `None` on a dry run.
    pub delivery: Option<Delivery>,
}

/// Application entry point.
pub struct App {
    settings: Settings,
}

impl App {
    /// Creates an application for the given settings.
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Runs against Gmail with an HTTP resolver, for the window ending today.
    ///
    /// With `dry_run` the digest is assembled but not sent.
    pub async fn run(&self, dry_run: bool) -> Result<RunSummary> {
        let gmail = &self.settings.gmail;

        let credentials = ClientCredentials::load(&gmail.credentials)
            .await
            .context("failed to load OAuth client credentials")?;
        let store = Arc::new(FileTokenStore::new(&gmail.token));
        let mut provider =
            GmailProvider::new(credentials, store).with_scopes(gmail.scopes.clone());
        provider
            .authenticate()
            .await
            .context("Gmail authentication failed")?;

        let resolver = HttpResolver::new(&self.settings.resolver.resolver_config())
            .context("failed to build HTTP client")?;

        let range = DateRange::ending_today(self.settings.newsletter.lookback_days);
        self.run_with(Arc::new(provider), Arc::new(resolver), range, dry_run)
            .await
    }

    /// Runs the pipeline with the given mailbox and resolver.
    pub async fn run_with(
        &self,
        provider: Arc<dyn MailProvider>,
        resolver: Arc<dyn UrlResolver>,
        range: DateRange,
        dry_run: bool,
    ) -> Result<RunSummary> {
        let newsletter = &self.settings.newsletter;
        let senders = self.settings.senders();
        tracing::info!(senders = senders.len(), %range, dry_run, "starting digest run");

        let collector = CollectionService::new(
            provider.clone(),
            resolver,
            UnwantedUrlFilter::new(&newsletter.unwanted_urls),
        )
        .with_concurrency(self.settings.resolver.concurrency);

        let deadline = self.settings.run.deadline();
        let outcome = tokio::time::timeout(deadline, collector.collect(&senders, &range))
            .await
            .map_err(|_| {
                anyhow::anyhow!("collection did not finish within {}s", deadline.as_secs())
            })??;

        let report = outcome.report;
        tracing::info!(
            senders = report.senders,
            messages = report.messages_scanned,
            skipped = report.messages_skipped,
            candidates = report.candidates,
            resolved = report.resolved,
            unresolved = report.unresolved,
            excluded = report.excluded,
            "collection finished"
        );
        for error in &report.errors {
            tracing::debug!(%error, "absorbed during collection");
        }

        if dry_run {
            let digest = Digest::from_collection(&outcome.collection);
            tracing::info!(entries = digest.len(), "dry run, digest not sent");
            return Ok(RunSummary {
                range,
                report,
                digest,
                delivery: None,
            });
        }

        let sender = DigestService::new(provider, self.settings.digest_settings());
        let delivered = sender.deliver(&outcome.collection).await?;

        Ok(RunSummary {
            range,
            report,
            digest: delivered.digest,
            delivery: Some(delivered.delivery),
        })
    }
}

//! Redirect resolution for candidate URLs.
//!
//! Newsletters wrap most links in shorteners or click trackers. The resolver
//! follows redirects and reports where a candidate finally lands. Every
//! candidate gets its own outcome: a failure is reported as
//! [`ResolveError`], never as some earlier candidate's URL.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default redirect hop limit.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Why a candidate could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The candidate is not a URL the HTTP client accepts.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No response within the configured timeout.
    #[error("timed out resolving {0}")]
    Timeout(String),

    /// Redirect chain exceeded the hop limit or looped.
    #[error("too many redirects resolving {0}")]
    TooManyRedirects(String),

    /// DNS, connection or TLS failure.
    #[error("network error resolving {url}: {reason}")]
    Network { url: String, reason: String },
}

/// Result type for resolution.
pub type ResolveResult = Result<String, ResolveError>;

/// Follows redirects from a candidate URL to its final destination.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Resolves a single candidate. One attempt, no retries.
    async fn resolve(&self, url: &str) -> ResolveResult;
}

/// Settings for [`HttpResolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Per-request timeout, covering the whole redirect chain.
    pub timeout: Duration,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// [`UrlResolver`] that issues a GET and reports the final response URL.
///
/// The final status code is not inspected: a link that ends on a 404 page
/// still resolved to that page.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    /// Builds a resolver with its own HTTP client.
    pub fn new(config: &ResolverConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client })
    }

    fn classify(url: &str, err: reqwest::Error) -> ResolveError {
        if err.is_timeout() {
            ResolveError::Timeout(url.to_string())
        } else if err.is_redirect() {
            ResolveError::TooManyRedirects(url.to_string())
        } else if err.is_builder() {
            ResolveError::InvalidUrl {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            ResolveError::Network {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl UrlResolver for HttpResolver {
    async fn resolve(&self, url: &str) -> ResolveResult {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        Ok(response.url().to_string())
    }
}

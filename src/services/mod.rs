//! Business services layer.
//!
//! This module contains the digest pipeline, coordinating between the mail
//! provider, the redirect resolver and the domain types.
//!
//! # Architecture
//!
//! Services sit between the run orchestration and the infrastructure layer:
//!
//! ```text
//! app::run (config, CLI, deadline)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (Mail provider, HTTP resolver, token store)
//! ```
//!
//! # Services Overview
//!
//! - [`UrlExtractor`]: finds candidate URLs in message text
//! - [`UrlResolver`]: follows redirects to a final URL
//! - [`UnwantedUrlFilter`]: drops URLs matching configured patterns
//! - [`CollectionService`]: runs extractor, resolver and filter over every sender's messages
//! - [`DigestService`]: assembles the digest and sends it

mod collection_service;
mod digest_service;
mod resolver;
mod url_extractor;
mod url_filter;

pub use collection_service::{
    CollectionError, CollectionOutcome, CollectionReport, CollectionService, DEFAULT_CONCURRENCY,
};
pub use digest_service::{
    Delivery, DigestError, DigestReport, DigestService, DigestSettings, DEFAULT_SUBJECT,
};
pub use resolver::{
    HttpResolver, ResolveError, ResolveResult, ResolverConfig, UrlResolver, DEFAULT_MAX_REDIRECTS,
    DEFAULT_TIMEOUT_SECS,
};
pub use url_extractor::UrlExtractor;
pub use url_filter::UnwantedUrlFilter;

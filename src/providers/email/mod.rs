//! Mail provider implementations.
//!
//! This module contains the [`MailProvider`] trait (the mail access port used
//! by the digest pipeline) and its Gmail implementation:
//!
//! - [`GmailProvider`] - Gmail REST API with OAuth 2.0
//!
//! # Architecture
//!
//! The pipeline only depends on the trait, so tests drive it with in-memory
//! mailboxes and the binary wires in Gmail. A provider handles:
//!
//! - Authentication (OAuth token refresh)
//! - Searching a sender's messages in a date window
//! - Decoding message bodies to text
//! - Sending the digest

mod gmail;
mod traits;

pub use gmail::{ClientCredentials, GmailProvider};
pub use traits::{MailProvider, OutgoingEmail, ProviderError, Result};

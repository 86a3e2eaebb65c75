//! Configuration and settings management.
//!
//! This module provides the run's settings types and loading. Settings are
//! stored as JSON and passed on the command line.

mod settings;

pub use settings::{
    ConfigError, EmailSettings, GmailSettings, NewsletterSettings, ResolverSettings, RunSettings,
    Settings, DEFAULT_SCOPE,
};

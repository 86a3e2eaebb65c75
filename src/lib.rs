//! newsletter-digest - Weekly link digest from Gmail newsletters
//!
//! This crate collects the links in recent newsletter emails, resolves their
//! redirects, drops unwanted ones and mails a deduplicated digest back to the
//! mailbox owner.

pub mod app;
pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;

pub use app::{App, RunSummary};

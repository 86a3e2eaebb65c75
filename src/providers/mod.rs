//! External service providers.
//!
//! - [`email`] - Mail access (Gmail API)

pub mod email;

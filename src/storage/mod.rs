//! Credential storage.
//!
//! OAuth tokens are the only state that survives between runs. They are kept
//! behind the [`TokenStore`] trait so the mail provider never touches the
//! filesystem directly.

mod token_store;

pub use token_store::{FileTokenStore, Result, StoredToken, TokenStore, TokenStoreError};

//! OAuth token persistence.
//!
//! Tokens are cached between runs so the mailbox can be accessed without a
//! fresh consent flow. [`FileTokenStore`] keeps them in a JSON file:
//!
//! ```json
//! {
//!   "access_token": "ya29...",
//!   "refresh_token": "1//0g...",
//!   "expires_at": "2024-05-15T10:00:00Z",
//!   "scopes": ["https://www.googleapis.com/auth/gmail.modify"]
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during token store operations.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed token file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no stored token at {0}")]
    NotFound(PathBuf),
}

/// Result type for token store operations.
pub type Result<T> = std::result::Result<T, TokenStoreError>;

/// Access and refresh tokens granted by the OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Short-lived bearer token, absent until first refresh.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Long-lived token used to mint new access tokens.
    pub refresh_token: String,
    /// When `access_token` stops being accepted.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes the grant covers.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    /// Margin before expiry at which a token is treated as stale.
    pub const EXPIRY_MARGIN_SECS: i64 = 60;

    /// Creates a token holding only a refresh token.
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: None,
            refresh_token: refresh_token.into(),
            expires_at: None,
            scopes: Vec::new(),
        }
    }

    /// Returns the access token if it is still usable at `now`.
    pub fn usable_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        let expires_at = self.expires_at?;
        if expires_at - Duration::seconds(Self::EXPIRY_MARGIN_SECS) > now {
            Some(token)
        } else {
            None
        }
    }

    /// Scopes from `required` that this grant does not cover.
    pub fn missing_scopes<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|s| !self.scopes.contains(s))
            .map(String::as_str)
            .collect()
    }
}

/// Persistence for OAuth tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Loads the stored token.
    ///
    /// Returns [`TokenStoreError::NotFound`] if nothing has been stored yet.
    async fn load(&self) -> Result<StoredToken>;

    /// Persists `token`, replacing any previous value.
    async fn save(&self, token: &StoredToken) -> Result<()>;
}

/// JSON file backed [`TokenStore`].
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<StoredToken> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TokenStoreError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&contents).map_err(|source| TokenStoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(token).map_err(|source| TokenStoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_error(e))?;
        }

        tracing::debug!(path = %self.path.display(), "OAuth token saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> StoredToken {
        StoredToken {
            access_token: Some("access-123".to_string()),
            refresh_token: "refresh-456".to_string(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
            scopes: vec!["https://www.googleapis.com/auth/gmail.modify".to_string()],
        }
    }

    #[test]
    fn fresh_token_is_usable() {
        let token = sample_token();
        assert_eq!(token.usable_access_token(Utc::now()), Some("access-123"));
    }

    #[test]
    fn token_inside_expiry_margin_is_stale() {
        let mut token = sample_token();
        token.expires_at = Some(Utc::now() + Duration::seconds(30));
        assert!(token.usable_access_token(Utc::now()).is_none());
    }

    #[test]
    fn token_without_expiry_is_stale() {
        let mut token = sample_token();
        token.expires_at = None;
        assert!(token.usable_access_token(Utc::now()).is_none());

        let bare = StoredToken::from_refresh_token("r");
        assert!(bare.usable_access_token(Utc::now()).is_none());
    }

    #[test]
    fn missing_scopes_are_reported() {
        let token = sample_token();
        let required = vec![
            "https://www.googleapis.com/auth/gmail.modify".to_string(),
            "https://www.googleapis.com/auth/gmail.send".to_string(),
        ];
        assert_eq!(
            token.missing_scopes(&required),
            vec!["https://www.googleapis.com/auth/gmail.send"]
        );
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token.json"));
        let token = sample_token();

        store.save(&token).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, token);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));
        store.save(&sample_token()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("absent.json"));
        assert!(matches!(
            store.load().await,
            Err(TokenStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn garbage_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileTokenStore::new(path);
        assert!(matches!(
            store.load().await,
            Err(TokenStoreError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn minimal_token_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, r#"{"refresh_token": "1//abc"}"#).unwrap();

        let token = FileTokenStore::new(path).load().await.unwrap();
        assert_eq!(token, StoredToken::from_refresh_token("1//abc"));
    }
}

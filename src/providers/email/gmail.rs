//! Gmail API provider implementation.
//!
//! This module provides a [`MailProvider`] implementation on top of the Gmail
//! REST API. It handles OAuth 2.0 token refresh, message search, body
//! decoding, and sending.
//!
//! # Authentication
//!
//! Client credentials come from the JSON file downloaded from the Google Cloud
//! console. Access and refresh tokens live in a [`TokenStore`]; an access token
//! is reused while it is valid and refreshed otherwise. The interactive consent
//! flow is not performed here: the store must already hold a refresh token.
//!
//! # API Usage
//!
//! This provider uses the Gmail API v1:
//! - `users.messages.list` for finding a sender's messages
//! - `users.messages.get` for fetching message bodies
//! - `users.messages.send` for sending the digest

use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use serde::{Deserialize, Serialize};

use super::{MailProvider, OutgoingEmail, ProviderError, Result};
use crate::domain::{DateRange, MessageId, Sender};
use crate::storage::{StoredToken, TokenStore, TokenStoreError};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Label the message search is restricted to.
const INBOX_LABEL: &str = "INBOX";

/// Upper bound on any single Gmail or token endpoint request.
const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// 403 reasons Gmail uses for throttling rather than missing permissions.
const RATE_LIMIT_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
    "quotaExceeded",
];

/// Gmail emits URL-safe base64 with or without padding.
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Gmail API message list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    messages: Option<Vec<MessageRef>>,
    next_page_token: Option<String>,
}

/// Message reference returned by `users.messages.list`.
#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// Gmail API message.
#[derive(Debug, Deserialize)]
struct GmailMessage {
    #[allow(dead_code)]
    id: String,
    payload: Option<GmailMessagePayload>,
}

/// Gmail message payload (top-level MIME part).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessagePayload {
    mime_type: Option<String>,
    parts: Option<Vec<GmailPart>>,
    body: Option<GmailBody>,
}

/// Gmail message part (for multipart messages).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    mime_type: Option<String>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPart>>,
}

/// Gmail message body.
#[derive(Debug, Deserialize)]
struct GmailBody {
    data: Option<String>,
}

/// Google API error envelope, `{"error": {"errors": [{"reason": ...}]}}`.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
    #[serde(default)]
    errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorReason {
    reason: Option<String>,
}

impl ApiErrorBody {
    /// Whether any listed reason is a quota or rate limit.
    fn is_rate_limited(body: &str) -> bool {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        parsed
            .errors
            .iter()
            .chain(parsed.error.iter().flat_map(|e| e.errors.iter()))
            .filter_map(|e| e.reason.as_deref())
            .any(|reason| RATE_LIMIT_REASONS.contains(&reason))
    }
}

/// OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

/// OAuth client credentials from the Google Cloud console download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Token endpoint, defaults to Google's.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

/// The console wraps the credentials in an `installed` or `web` object.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientCredentials>,
    web: Option<ClientCredentials>,
}

impl ClientCredentials {
    /// Parses a client secret file's contents.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| ProviderError::Authentication(format!("invalid client credentials: {}", e)))?;

        file.installed.or(file.web).ok_or_else(|| {
            ProviderError::Authentication(
                "client credentials contain neither an \"installed\" nor a \"web\" client"
                    .to_string(),
            )
        })
    }

    /// Reads and parses a client secret file.
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProviderError::Authentication(format!(
                "cannot read client credentials {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }
}

/// Gmail API provider.
///
/// Implements [`MailProvider`] using the Gmail REST API with OAuth 2.0
/// authentication.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use newsletter_digest::providers::email::{ClientCredentials, GmailProvider};
/// use newsletter_digest::storage::FileTokenStore;
///
/// let credentials = ClientCredentials::load("credentials.json".as_ref()).await?;
/// let store = Arc::new(FileTokenStore::new("token.json"));
/// let mut provider = GmailProvider::new(credentials, store);
/// provider.authenticate().await?;
/// ```
pub struct GmailProvider {
    /// HTTP client for API requests.
    client: reqwest::Client,
    /// Base URL of the Gmail users API for the authenticated user.
    api_base: String,
    /// OAuth client credentials.
    credentials: ClientCredentials,
    /// Where access and refresh tokens are persisted.
    token_store: Arc<dyn TokenStore>,
    /// Scopes the run expects the grant to cover.
    scopes: Vec<String>,
    /// Current OAuth access token.
    access_token: Option<String>,
    /// Per-request timeout.
    request_timeout: StdDuration,
}

impl GmailProvider {
    /// Creates a new Gmail provider.
    ///
    /// The provider is not authenticated until [`authenticate`](Self::authenticate) is called.
    pub fn new(credentials: ClientCredentials, token_store: Arc<dyn TokenStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: GMAIL_API_BASE.to_string(),
            credentials,
            token_store,
            scopes: Vec::new(),
            access_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the scopes the stored grant is expected to cover.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Points the provider at a different API base (used against mock servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[cfg(test)]
    fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Obtains a usable access token, refreshing and persisting it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Authentication`] if no token is stored or the
    /// refresh is rejected.
    pub async fn authenticate(&mut self) -> Result<()> {
        let mut token = self.token_store.load().await.map_err(|e| match e {
            TokenStoreError::NotFound(path) => ProviderError::Authentication(format!(
                "no stored OAuth token at {}; complete the consent flow and save the refresh token there",
                path.display()
            )),
            other => ProviderError::Authentication(other.to_string()),
        })?;

        if !token.scopes.is_empty() {
            let missing = token.missing_scopes(&self.scopes);
            if !missing.is_empty() {
                tracing::warn!(missing = ?missing, "stored OAuth grant does not cover all configured scopes");
            }
        }

        if let Some(access) = token.usable_access_token(Utc::now()) {
            self.access_token = Some(access.to_string());
            tracing::debug!("reusing cached access token");
        } else {
            self.refresh_access_token(&mut token).await?;
            if let Err(e) = self.token_store.save(&token).await {
                tracing::warn!(error = %e, "failed to persist refreshed OAuth token");
            }
        }

        tracing::info!("Gmail provider authenticated");
        Ok(())
    }

    /// Refreshes the OAuth access token using the refresh token.
    async fn refresh_access_token(&mut self, token: &mut StoredToken) -> Result<()> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .timeout(self.request_timeout)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse token response: {}", e)))?;

        token.access_token = Some(token_response.access_token.clone());
        token.expires_at = token_response
            .expires_in
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));
        if let Some(refresh) = token_response.refresh_token {
            token.refresh_token = refresh;
        }
        if let Some(scope) = token_response.scope {
            token.scopes = scope.split_whitespace().map(str::to_string).collect();
        }

        self.access_token = Some(token_response.access_token);
        Ok(())
    }

    /// Builds authorization headers for API requests.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| ProviderError::Authentication("not authenticated".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ProviderError::Internal(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Makes an authenticated GET request to the Gmail API.
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base, endpoint);
        let headers = self.auth_headers()?;

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .headers(headers)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Makes an authenticated POST request to the Gmail API.
    async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base, endpoint);
        let headers = self.auth_headers()?;

        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Handles API response, checking for errors.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }

    /// Handles API error responses.
    async fn handle_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            400 => ProviderError::InvalidRequest(body),
            403 if ApiErrorBody::is_rate_limited(&body) => {
                ProviderError::RateLimited { retry_after_secs }
            }
            401 | 403 => ProviderError::Authentication(format!("unauthorized: {}", body)),
            404 => ProviderError::NotFound(body),
            429 => ProviderError::RateLimited { retry_after_secs },
            _ => ProviderError::Internal(format!("API error ({}): {}", status, body)),
        }
    }

    /// Gmail search expression for one sender within a date window.
    fn search_query(sender: &Sender, range: &DateRange) -> String {
        format!("from:{} {}", sender, range.to_query())
    }

    /// Decodes one base64url body part into text.
    fn decode_data(data: &str) -> Result<String> {
        let bytes = GMAIL_BASE64
            .decode(data.trim())
            .map_err(|e| ProviderError::Decode(format!("invalid base64url body: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| ProviderError::Decode(format!("body is not UTF-8: {}", e)))
    }

    /// Extracts the readable text of a message.
    ///
    /// Prefers the first `text/plain` part, then the first `text/html` part,
    /// then the top-level body.
    fn extract_text(payload: &GmailMessagePayload) -> Result<String> {
        let mut text = None;
        let mut html = None;

        if let Some(parts) = &payload.parts {
            Self::find_text_parts(parts, &mut text, &mut html);
        }

        let top_level = payload.body.as_ref().and_then(|b| b.data.as_deref());
        let data = match payload.mime_type.as_deref() {
            Some("text/html") => text.or(top_level).or(html),
            _ => text.or(html).or(top_level),
        };

        match data {
            Some(data) => Self::decode_data(data),
            None => Err(ProviderError::Decode("message has no body data".to_string())),
        }
    }

    /// Recursively finds the first plain and HTML body parts.
    fn find_text_parts<'a>(
        parts: &'a [GmailPart],
        text: &mut Option<&'a str>,
        html: &mut Option<&'a str>,
    ) {
        for part in parts {
            let data = part.body.as_ref().and_then(|b| b.data.as_deref());

            match part.mime_type.as_deref() {
                Some("text/plain") if text.is_none() => *text = data,
                Some("text/html") if html.is_none() => *html = data,
                _ => {}
            }

            if let Some(nested) = &part.parts {
                Self::find_text_parts(nested, text, html);
            }
        }
    }
}

#[async_trait]
impl MailProvider for GmailProvider {
    async fn list_messages(&self, sender: &Sender, range: &DateRange) -> Result<Vec<MessageId>> {
        let query = Self::search_query(sender, range);
        tracing::info!(%sender, %query, "listing messages");

        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("q", query.as_str()), ("labelIds", INBOX_LABEL)];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response: MessageListResponse = self.get("/messages", &params).await?;

            ids.extend(
                response
                    .messages
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| MessageId::from(m.id)),
            );

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(ids)
    }

    async fn fetch_message_text(&self, id: &MessageId) -> Result<String> {
        tracing::debug!(message_id = %id, "fetching message");

        let endpoint = format!("/messages/{}", id);
        let message: GmailMessage = self.get(&endpoint, &[("format", "full")]).await?;

        let payload = message
            .payload
            .ok_or_else(|| ProviderError::Decode(format!("message {} has no payload", id)))?;

        Self::extract_text(&payload)
    }

    async fn send_message(&self, email: &OutgoingEmail) -> Result<String> {
        #[derive(Serialize)]
        struct SendRequest {
            raw: String,
        }

        #[derive(Deserialize)]
        struct SendResponse {
            id: String,
        }

        let response: SendResponse = self
            .post("/messages/send", &SendRequest { raw: email.to_raw() })
            .await?;

        tracing::info!(message_id = %response.id, "Email sent via Gmail API");
        Ok(response.id)
    }
}

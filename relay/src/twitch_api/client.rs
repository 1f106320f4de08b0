//! Authenticated access to the Twitch Helix API.

use crate::auth::{TimeBoundAccessToken, TokenManager};
use crate::twitch_api::{DataResponse, Stream, UpstreamError, User};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Client for the two read-only Helix endpoints the relay needs.
///
/// Cloning is cheap and every clone shares the same app access token. The token is treated as
/// a lease: it is re-acquired once it expires, and when Helix answers `401 Unauthorized`.
/// Both paths go through the token mutex, so concurrent requests that trip over a stale token
/// cause a single exchange with the token endpoint rather than one each.
#[derive(Debug, Clone)]
pub struct TwitchClient {
    token: Arc<Mutex<TimeBoundAccessToken>>,
    token_manager: Arc<TokenManager>,
    client: reqwest::Client,
    api_base: Arc<str>,
}

impl TwitchClient {
    /// Creates a client around an already acquired token.
    ///
    /// `api_base` is the Helix root, e.g. `https://api.twitch.tv/helix`.
    pub fn new(
        token: TimeBoundAccessToken,
        token_manager: Arc<TokenManager>,
        client: reqwest::Client,
        api_base: &str,
    ) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
            token_manager,
            client,
            api_base: Arc::from(api_base.trim_end_matches('/')),
        }
    }

    /// Resolves a login name to the user record.
    ///
    /// Returns `Ok(None)` if no user has that login.
    ///
    /// See: <https://dev.twitch.tv/docs/api/reference/#get-users>
    #[instrument(skip(self), level = tracing::Level::DEBUG)]
    pub async fn lookup_channel(&self, username: &str) -> Result<Option<User>, UpstreamError> {
        let users: DataResponse<User> = self.get("users", &[("login", username)]).await?;
        tracing::debug!(matches = users.data.len(), "fetched users");
        Ok(users.into_first())
    }

    /// Fetches the live stream of the given user.
    ///
    /// Returns `Ok(None)` if the user is offline.
    ///
    /// See: <https://dev.twitch.tv/docs/api/reference/#get-streams>
    #[instrument(skip(self), level = tracing::Level::DEBUG)]
    pub async fn lookup_stream(&self, user_id: &str) -> Result<Option<Stream>, UpstreamError> {
        let streams: DataResponse<Stream> = self.get("streams", &[("user_id", user_id)]).await?;
        tracing::debug!(live = !streams.data.is_empty(), "fetched stream status");
        Ok(streams.into_first())
    }

    /// Returns a usable access token, re-acquiring it first if it has expired.
    pub(crate) async fn fresh_access_token(&self) -> Result<String, UpstreamError> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            tracing::debug!("access token expired, acquiring a new one");
            *token = self.token_manager.acquire().await?;
        }
        Ok(token.secret().to_string())
    }

    /// Replaces the token after Helix rejected `rejected`.
    ///
    /// If another request already replaced it in the meantime, the current token is returned
    /// without contacting the token endpoint again.
    async fn replace_rejected_token(&self, rejected: &str) -> Result<String, UpstreamError> {
        let mut token = self.token.lock().await;
        if token.secret() == rejected {
            tracing::warn!("Twitch rejected the app access token, acquiring a new one");
            *token = self.token_manager.acquire().await?;
        } else {
            tracing::debug!("access token was already replaced by a concurrent request");
        }
        Ok(token.secret().to_string())
    }

    async fn send(
        &self,
        url: &str,
        query: &[(&str, &str)],
        access_token: &str,
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = self
            .client
            .get(url)
            .header("Client-Id", self.token_manager.client_id())
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;
        Ok(response)
    }

    /// Issues an authenticated GET against `{api_base}/{endpoint}` and decodes the JSON body.
    ///
    /// A `401` leads to one token replacement and one re-issue of the request; everything else
    /// is reported as-is.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn get<T>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_base, endpoint);

        let access_token = self.fresh_access_token().await?;
        let mut response = self.send(&url, query, &access_token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let access_token = self.replace_rejected_token(&access_token).await?;
            response = self.send(&url, query, &access_token).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(UpstreamError::Unauthorized);
            }
        }

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            tracing::debug!(%status, body = %error_text, "Twitch API request failed");
            return Err(UpstreamError::Status { status });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

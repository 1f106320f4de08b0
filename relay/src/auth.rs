//! App access tokens for the Twitch Helix API.
//!
//! The relay never acts on behalf of a user, so it authenticates with the OAuth 2.0
//! client-credentials grant: the client id and secret are exchanged for an app access token
//! without any browser involvement. Twitch does not hand out refresh tokens for this grant,
//! so "refreshing" simply means running the exchange again.

use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::{AuthType, ClientId, ClientSecret, HttpClientError, RequestTokenError, TokenUrl};
use oauth2::{TokenResponse, reqwest};
use std::time::{Duration, SystemTime};

/// Safety margin subtracted from a token's advertised lifetime.
const EXPIRY_BUFFER: Duration = Duration::from_secs(300);

/// Lifetime assumed when the token endpoint does not say (one hour minus the buffer).
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3300);

/// Failure to obtain an app access token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token endpoint URL")]
    InvalidTokenUrl(#[from] oauth2::url::ParseError),
    #[error("exchange client credentials for an app access token")]
    Exchange(
        #[from] RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>,
    ),
}

/// An access token together with the moment it should stop being used.
#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Wraps a freshly issued token, computing its expiry from `expires_in`.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    /// The bearer secret to put in the `Authorization` header.
    pub fn secret(&self) -> &str {
        self.token.access_token().secret()
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        match token.expires_in() {
            Some(expires_in) => now + expires_in.saturating_sub(EXPIRY_BUFFER),
            None => now + DEFAULT_LIFETIME,
        }
    }
}

/// Performs the client-credentials exchange against the Twitch token endpoint.
#[derive(Debug, Clone)]
pub struct TokenManager {
    client_id: String,
    client_secret: String,
    token_url: TokenUrl,
    http_client: reqwest::Client,
}

impl TokenManager {
    /// Creates a token manager for the given application credentials.
    ///
    /// `http_client` should not follow redirects; the token endpoint never needs them.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: &str,
        http_client: reqwest::Client,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: TokenUrl::new(token_url.to_string())?,
            http_client,
        })
    }

    /// The application's client id, which Helix also wants in a `Client-Id` header.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Exchanges the client credentials for a new app access token.
    ///
    /// The credentials travel in the form body (`client_id`, `client_secret`,
    /// `grant_type=client_credentials`), which is what Twitch expects.
    #[tracing::instrument(skip(self), fields(token_url = %self.token_url.url()), err)]
    pub async fn acquire(&self) -> Result<TimeBoundAccessToken, AuthError> {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(self.token_url.clone());

        let token = client
            .exchange_client_credentials()
            .request_async(&self.http_client)
            .await?;

        tracing::info!(
            expires_in = ?token.expires_in(),
            "Twitch app access token acquired"
        );
        Ok(TimeBoundAccessToken::new(token))
    }
}

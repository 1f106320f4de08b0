//! Errors surfaced by the Helix client.

use crate::auth::AuthError;
use reqwest::StatusCode;

/// Why a Helix lookup failed.
///
/// "Not found" is not an error: lookups return `Ok(None)` for it.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The request never got a response (connect failure, reset, timeout, ...).
    #[error("send request to the Twitch API")]
    Transport(#[from] reqwest::Error),
    /// Helix answered with a non-success status other than 401.
    #[error("Twitch API answered with status {status}")]
    Status { status: StatusCode },
    /// Helix rejected a freshly acquired token too.
    #[error("Twitch API rejected the app access token")]
    Unauthorized,
    /// The body did not have the expected shape.
    #[error("parse Twitch API response")]
    Decode(#[from] serde_json::Error),
    /// A new app access token could not be obtained.
    #[error("obtain a Twitch app access token")]
    Auth(#[from] AuthError),
}

impl UpstreamError {
    /// Whether repeating the same request later could plausibly succeed.
    ///
    /// Nothing in the relay retries; this only informs logging.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Auth(_) => true,
            Self::Status { status } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Unauthorized | Self::Decode(_) => false,
        }
    }
}

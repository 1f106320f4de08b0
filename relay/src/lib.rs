//! A tiny relay that gives Twitch channel links rich Discord embeds.
//!
//! `GET /<username>` looks the channel up on the Twitch Helix API. Discord's link-preview
//! crawler gets a fragment of Open Graph tags describing the channel (and its stream, if it
//! is live); everyone else is redirected to the channel on twitch.tv.

pub mod auth;
pub mod config;
pub mod embed;
pub mod handler;
pub mod server;
pub mod twitch_api;

pub use config::Config;
pub use handler::{Relay, Upstream};
pub use twitch_api::TwitchClient;

use eyre::Context;
use std::sync::Arc;

/// Acquires the app access token and builds the Helix client.
///
/// This is the only place the relay talks to Twitch before serving, and it must succeed:
/// without a token every lookup would fail.
pub async fn connect(config: &Config) -> eyre::Result<TwitchClient> {
    let http_client = reqwest::Client::builder()
        // SSRF no thank you.
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("build HTTP client")?;

    let token_manager = auth::TokenManager::new(
        config.client_id.clone(),
        config.client_secret.clone(),
        &config.token_url,
        http_client.clone(),
    )
    .context("configure Twitch token endpoint")?;
    let token = token_manager
        .acquire()
        .await
        .context("acquire Twitch app access token")?;

    Ok(TwitchClient::new(
        token,
        Arc::new(token_manager),
        http_client,
        &config.api_base,
    ))
}

//! Runtime configuration, read from the process environment.

use eyre::Context;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_API_BASE: &str = "https://api.twitch.tv/helix";
const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const DEFAULT_WEB_URL: &str = "https://twitch.tv";

/// Settings that shape the embed and the crawler/browser split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedConfig {
    /// Substring of the `User-Agent` header that marks Discord's link-preview crawler.
    pub crawler_marker: String,
    /// Value of the static `og:site_name` tag.
    pub site_name: String,
    /// Value of the static `theme-color` tag.
    pub theme_color: String,
    /// Base of canonical channel URLs, without a trailing slash.
    pub web_url: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            crawler_marker: "DiscordBot".to_string(),
            site_name: "Moons' TTV Embeds".to_string(),
            theme_color: "#6441a5".to_string(),
            web_url: DEFAULT_WEB_URL.to_string(),
        }
    }
}

/// Everything the relay needs to start.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub bind: SocketAddr,
    /// Base URL of the Helix API, e.g. `https://api.twitch.tv/helix`.
    pub api_base: String,
    pub token_url: String,
    pub embed: EmbedConfig,
}

// Hand-written so the client secret never ends up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("bind", &self.bind)
            .field("api_base", &self.api_base)
            .field("token_url", &self.token_url)
            .field("embed", &self.embed)
            .finish()
    }
}

impl Config {
    /// Loads `.env` (if there is one) and then reads the configuration from the environment.
    pub fn from_env() -> eyre::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("read .env file"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> eyre::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| eyre::eyre!("environment variable {key} must be set"))
        };

        let port = match get("PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("parse PORT value '{port}'"))?,
            None => DEFAULT_PORT,
        };
        let ip = match get("BIND_ADDR") {
            Some(addr) => addr
                .trim()
                .parse::<IpAddr>()
                .with_context(|| format!("parse BIND_ADDR value '{addr}'"))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let defaults = EmbedConfig::default();
        let embed = EmbedConfig {
            crawler_marker: get("CRAWLER_MARKER").unwrap_or(defaults.crawler_marker),
            site_name: get("EMBED_SITE_NAME").unwrap_or(defaults.site_name),
            theme_color: get("EMBED_THEME_COLOR").unwrap_or(defaults.theme_color),
            web_url: get("TWITCH_WEB_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.web_url),
        };

        Ok(Self {
            client_id: require("TWITCH_CLIENT_ID")?,
            client_secret: require("TWITCH_CLIENT_SECRET")?,
            bind: SocketAddr::new(ip, port),
            api_base: get("TWITCH_API_BASE")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            token_url: get("TWITCH_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            embed,
        })
    }
}

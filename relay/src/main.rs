use eyre::Context;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use twitch_embed_relay::{Config, Relay, connect, server};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let config = Config::from_env().context("load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    // No token, no service: fail startup rather than serve nothing but 500s.
    let twitch = match connect(&config).await {
        Ok(twitch) => twitch,
        Err(e) => {
            tracing::error!(error = ?e, "could not obtain a Twitch access token");
            return Err(e);
        }
    };

    let relay = Relay::new(twitch, config.embed.clone());
    server::run(config.bind, relay).await
}

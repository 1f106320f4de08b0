//! Turning a channel (and its stream, if live) into Open Graph tags.

use crate::config::EmbedConfig;
use crate::twitch_api::{Stream, User};
use maud::html;

/// Thumbnail size requested from Twitch for live embeds.
const THUMBNAIL_WIDTH: u32 = 1280;
const THUMBNAIL_HEIGHT: u32 = 720;

/// The four values a link preview is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedFields {
    pub title: String,
    pub description: String,
    pub image_url: String,
    /// Canonical channel URL on twitch.tv.
    pub url: String,
}

impl EmbedFields {
    /// Describes `user`'s channel, which is live iff `stream` is given.
    ///
    /// `url` is the canonical channel URL, see [`channel_url`].
    pub fn new(user: &User, stream: Option<&Stream>, url: String) -> Self {
        match stream {
            Some(stream) => Self {
                title: format!(
                    "{} is 🔴 LIVE playing {}",
                    user.display_name, stream.game_name
                ),
                description: format!("{}.", stream.title),
                image_url: stream.thumbnail(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT),
                url,
            },
            None => Self {
                title: format!("{} is offline", user.display_name),
                description: user.description.clone(),
                image_url: user.profile_image_url.clone(),
                url,
            },
        }
    }
}

/// The channel page for `username`, e.g. `https://twitch.tv/alice`.
pub fn channel_url(web_url: &str, username: &str) -> String {
    format!(
        "{}/{}",
        web_url.trim_end_matches('/'),
        urlencoding::encode(username)
    )
}

/// Renders the meta tags Discord reads for its embed.
///
/// The result is a bare fragment (no `<html>` or `<head>`), with every value escaped.
pub fn render(config: &EmbedConfig, fields: &EmbedFields) -> String {
    html! {
        meta name="og:site_name" content=(config.site_name);
        meta property="theme-color" content=(config.theme_color);
        meta property="og:title" content=(fields.title);
        meta property="og:description" content=(fields.description);
        meta property="og:image" content=(fields.image_url);
        meta property="og:url" content=(fields.url);
    }
    .into_string()
}

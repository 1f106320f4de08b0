//! Helix Streams API types.

use crate::twitch_api::types::null_as_empty;
use serde::Deserialize;

/// A live stream, as returned by `GET /helix/streams`.
///
/// Helix only returns a record while the broadcaster is live, so the mere presence of a
/// `Stream` means "live".
///
/// See: <https://dev.twitch.tv/docs/api/reference/#get-streams>
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Stream {
    /// The stream's title.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Name of the category or game being played. Empty if none is set.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub game_name: String,
    /// Thumbnail URL template with literal `{width}` and `{height}` placeholders.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thumbnail_url: String,
}

impl Stream {
    /// The thumbnail URL with the size placeholders filled in.
    pub fn thumbnail(&self, width: u32, height: u32) -> String {
        self.thumbnail_url
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string())
    }
}

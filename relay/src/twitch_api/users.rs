//! Helix Users API types.

use crate::twitch_api::types::null_as_empty;
use serde::Deserialize;

/// A Twitch user, as returned by `GET /helix/users`.
///
/// Only the fields the embed needs are kept.
///
/// See: <https://dev.twitch.tv/docs/api/reference/#get-users>
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// The ID that Twitch uses to identify the user, used for the stream lookup.
    pub id: String,
    /// The user's display name, which may differ from the login name in case or script.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub display_name: String,
    /// The user's channel description. Empty if the user never set one.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// URL of the user's profile image.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub profile_image_url: String,
}

//! Envelope and field helpers shared by the Helix endpoints.

use serde::{Deserialize, Deserializer};

/// The `{"data": [...]}` envelope every Helix list endpoint answers with.
///
/// Helix also sends a `pagination` cursor; the relay only ever looks at the first record,
/// so it is ignored.
#[derive(Debug, Deserialize)]
pub struct DataResponse<T> {
    pub data: Vec<T>,
}

impl<T> DataResponse<T> {
    /// Takes the first record, if any.
    pub fn into_first(self) -> Option<T> {
        self.data.into_iter().next()
    }
}

/// Deserializes a string that Twitch may send as `null`, mapping that to the empty string.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

//! Minimal client for the Twitch Helix API.
//!
//! The relay needs exactly two read-only calls: resolving a login name to a user
//! ([`TwitchClient::lookup_channel`]) and asking whether that user is live
//! ([`TwitchClient::lookup_stream`]). Both authenticate with an app access token from
//! [`crate::auth::TokenManager`] plus the application's `Client-Id`.

pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod mock;
pub mod streams;
pub mod types;
pub mod users;

pub use client::TwitchClient;
pub use error::UpstreamError;
pub use streams::Stream;
pub use types::DataResponse;
pub use users::User;

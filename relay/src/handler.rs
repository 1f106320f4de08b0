//! Per-request logic: look the channel up, then redirect browsers or render the embed.

use crate::config::EmbedConfig;
use crate::embed::{self, EmbedFields};
use crate::twitch_api::{Stream, TwitchClient, UpstreamError, User};
use bytes::Bytes;
use http::{HeaderValue, Method, Request, Response, StatusCode, header};
use http_body_util::Full;
use std::future::Future;

const NOT_FOUND_BODY: &str = "Channel not found";
const ERROR_BODY: &str = "An error occurred";

/// The two lookups the relay needs from Twitch.
///
/// [`TwitchClient`] is the real implementation; tests substitute their own.
pub trait Upstream: Send + Sync {
    /// Resolves a login name to a channel, `Ok(None)` if there is no such user.
    fn lookup_channel(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, UpstreamError>> + Send;

    /// Returns the channel's live stream, `Ok(None)` if it is offline.
    fn lookup_stream(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Stream>, UpstreamError>> + Send;
}

impl Upstream for TwitchClient {
    fn lookup_channel(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, UpstreamError>> + Send {
        TwitchClient::lookup_channel(self, username)
    }

    fn lookup_stream(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Stream>, UpstreamError>> + Send {
        TwitchClient::lookup_stream(self, user_id)
    }
}

/// Answers `GET /<username>` requests.
#[derive(Debug, Clone)]
pub struct Relay<U> {
    upstream: U,
    embed: EmbedConfig,
}

impl<U: Upstream> Relay<U> {
    pub fn new(upstream: U, embed: EmbedConfig) -> Self {
        Self { upstream, embed }
    }

    /// Routes an inbound request.
    ///
    /// Only `GET` and `HEAD` on a single, non-empty path segment reach [`Self::respond`];
    /// `HEAD` gets the same status and headers with the body dropped.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        let method = req.method().clone();
        if method != Method::GET && method != Method::HEAD {
            let mut response = plain_text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
            return response;
        }

        let path = req.uri().path();
        let segment = path.strip_prefix('/').unwrap_or(path);
        let segment = segment.strip_suffix('/').unwrap_or(segment);
        if segment.is_empty() || segment.contains('/') {
            return plain_text(StatusCode::NOT_FOUND, "Not found");
        }
        let username = match urlencoding::decode(segment) {
            Ok(username) => username.into_owned(),
            Err(e) => {
                tracing::debug!(path, error = %e, "username is not valid percent-encoded UTF-8");
                return plain_text(StatusCode::BAD_REQUEST, "Bad request");
            }
        };
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|ua| ua.to_str().ok())
            .unwrap_or("")
            .to_string();

        let response = self.respond(&username, &user_agent).await;
        if method == Method::HEAD {
            let (parts, _) = response.into_parts();
            return Response::from_parts(parts, Full::new(Bytes::new()));
        }
        response
    }

    /// Produces the response for `username` as seen by a client with the given user agent.
    #[tracing::instrument(skip(self, user_agent), fields(live))]
    pub async fn respond(&self, username: &str, user_agent: &str) -> Response<Full<Bytes>> {
        let user = match self.upstream.lookup_channel(username).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::info!("channel not found");
                return plain_text(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
            }
            Err(e) => return upstream_failure("look up channel", &e),
        };

        let stream = match self.upstream.lookup_stream(&user.id).await {
            Ok(stream) => stream,
            Err(e) => return upstream_failure("look up stream", &e),
        };
        tracing::Span::current().record("live", stream.is_some());

        let url = embed::channel_url(&self.embed.web_url, username);
        if !user_agent.contains(self.embed.crawler_marker.as_str()) {
            tracing::debug!(%url, "not a crawler, redirecting");
            return redirect(&url);
        }

        let fields = EmbedFields::new(&user, stream.as_ref(), url);
        let body = embed::render(&self.embed, &fields);
        tracing::info!("serving embed");

        let mut response = Response::new(Full::new(Bytes::from(body)));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        response
    }
}

fn plain_text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn upstream_failure(what: &str, error: &UpstreamError) -> Response<Full<Bytes>> {
    tracing::error!(
        error = error as &dyn std::error::Error,
        transient = error.is_transient(),
        "failed to {what}"
    );
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY)
}

fn redirect(url: &str) -> Response<Full<Bytes>> {
    match HeaderValue::from_str(url) {
        Ok(location) => {
            let mut response = plain_text(StatusCode::FOUND, "Found");
            response.headers_mut().insert(header::LOCATION, location);
            response
        }
        Err(e) => {
            tracing::error!(%url, error = %e, "channel URL is not a valid Location header");
            plain_text(StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY)
        }
    }
}

//! In-process stand-in for the Twitch token endpoint and the Helix API, for tests.
//!
//! It understands exactly the three requests the relay makes:
//! - `POST /oauth2/token` with a client-credentials form body
//! - `GET /helix/users?login=...`
//! - `GET /helix/streams?user_id=...`
//!
//! Helix requests must carry the test client id and a bearer token the mock issued and has
//! not revoked, otherwise they get a `401`.

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub(crate) const TEST_CLIENT_ID: &str = "test-client-id";
pub(crate) const TEST_CLIENT_SECRET: &str = "test-client-secret";

#[derive(Debug, Default)]
struct MockState {
    users: Mutex<HashMap<String, Value>>,
    streams: Mutex<HashMap<String, Value>>,
    users_body: Mutex<Option<String>>,
    forced_status: Mutex<Option<StatusCode>>,
    valid_tokens: Mutex<HashSet<String>>,
    reject_all_tokens: Mutex<bool>,
    token_requests: AtomicUsize,
    user_requests: AtomicUsize,
    stream_requests: AtomicUsize,
}

/// Handle to a running mock. The server lives until the test's runtime shuts down.
#[derive(Debug, Clone)]
pub(crate) struct MockHelix {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockHelix {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock Helix server");
        let addr = listener.local_addr().expect("mock Helix local address");
        let state = Arc::new(MockState::default());

        let server_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((conn, _)) = listener.accept().await else {
                    break;
                };
                let state = Arc::clone(&server_state);
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, Infallible>(route(&state, req).await) }
                    });
                    let conn = hyper_util::rt::TokioIo::new(conn);
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(conn, service)
                        .await;
                });
            }
        });

        Self { addr, state }
    }

    pub(crate) fn token_url(&self) -> String {
        format!("http://{}/oauth2/token", self.addr)
    }

    pub(crate) fn api_base(&self) -> String {
        format!("http://{}/helix", self.addr)
    }

    pub(crate) async fn add_user(
        &self,
        login: &str,
        id: &str,
        display_name: &str,
        description: &str,
    ) {
        let user = json!({
            "id": id,
            "login": login,
            "display_name": display_name,
            "type": "",
            "broadcaster_type": "",
            "description": description,
            "profile_image_url": format!("https://img/{login}.png"),
            "offline_image_url": "",
            "view_count": 0,
            "created_at": "2016-12-14T20:32:28Z"
        });
        self.state.users.lock().await.insert(login.to_string(), user);
    }

    pub(crate) async fn set_live(
        &self,
        user_id: &str,
        title: &str,
        game_name: &str,
        thumbnail_url: &str,
    ) {
        let stream = json!({
            "id": "40952121085",
            "user_id": user_id,
            "type": "live",
            "title": title,
            "game_id": "743",
            "game_name": game_name,
            "viewer_count": 78365,
            "started_at": "2021-03-10T15:04:21Z",
            "thumbnail_url": thumbnail_url,
            "tags": []
        });
        self.state
            .streams
            .lock()
            .await
            .insert(user_id.to_string(), stream);
    }

    /// Makes `GET /helix/users` answer with this raw body instead of real data.
    pub(crate) async fn set_users_body(&self, body: &str) {
        *self.state.users_body.lock().await = Some(body.to_string());
    }

    /// Makes every Helix request fail with the given status.
    pub(crate) async fn fail_with_status(&self, status: u16) {
        *self.state.forced_status.lock().await =
            Some(StatusCode::from_u16(status).expect("valid status code"));
    }

    /// Invalidates every token issued so far; new tokens are still accepted.
    pub(crate) async fn revoke_tokens(&self) {
        self.state.valid_tokens.lock().await.clear();
    }

    /// Makes Helix reject every token, including ones issued later.
    pub(crate) async fn reject_all_tokens(&self, reject: bool) {
        *self.state.reject_all_tokens.lock().await = reject;
    }

    pub(crate) fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn user_requests(&self) -> usize {
        self.state.user_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn stream_requests(&self) -> usize {
        self.state.stream_requests.load(Ordering::SeqCst)
    }
}

fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

fn unauthorized() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::UNAUTHORIZED,
        r#"{"error":"Unauthorized","status":401,"message":"Invalid OAuth token"}"#,
    )
}

fn query_param(uri: &http::Uri, name: &str) -> Option<String> {
    form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

async fn route(state: &MockState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    if req.method() == Method::POST && req.uri().path() == "/oauth2/token" {
        return issue_token(state, req).await;
    }

    let (parts, _body) = req.into_parts();
    if parts.method != Method::GET {
        return json_response(StatusCode::NOT_FOUND, r#"{"error":"Not Found"}"#);
    }
    match parts.uri.path() {
        "/helix/users" => {
            state.user_requests.fetch_add(1, Ordering::SeqCst);
            if let Some(response) = check_helix_request(state, &parts.headers).await {
                return response;
            }
            if let Some(body) = state.users_body.lock().await.clone() {
                return json_response(StatusCode::OK, body);
            }
            let login = query_param(&parts.uri, "login").unwrap_or_default();
            let users = state.users.lock().await;
            let data: Vec<&Value> = users.get(&login).into_iter().collect();
            json_response(StatusCode::OK, json!({ "data": data }).to_string())
        }
        "/helix/streams" => {
            state.stream_requests.fetch_add(1, Ordering::SeqCst);
            if let Some(response) = check_helix_request(state, &parts.headers).await {
                return response;
            }
            let user_id = query_param(&parts.uri, "user_id").unwrap_or_default();
            let streams = state.streams.lock().await;
            let data: Vec<&Value> = streams.get(&user_id).into_iter().collect();
            json_response(
                StatusCode::OK,
                json!({ "data": data, "pagination": {} }).to_string(),
            )
        }
        _ => json_response(StatusCode::NOT_FOUND, r#"{"error":"Not Found"}"#),
    }
}

/// Returns an error response if the request is not properly authenticated.
async fn check_helix_request(
    state: &MockState,
    headers: &http::HeaderMap,
) -> Option<Response<Full<Bytes>>> {
    if let Some(status) = *state.forced_status.lock().await {
        return Some(json_response(status, r#"{"error":"forced"}"#));
    }
    let client_id = headers.get("client-id").and_then(|v| v.to_str().ok());
    if client_id != Some(TEST_CLIENT_ID) {
        return Some(unauthorized());
    }
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(bearer) = bearer else {
        return Some(unauthorized());
    };
    if *state.reject_all_tokens.lock().await
        || !state.valid_tokens.lock().await.contains(bearer)
    {
        return Some(unauthorized());
    }
    None
}

async fn issue_token(state: &MockState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    let Ok(body) = req.into_body().collect().await else {
        return json_response(StatusCode::BAD_REQUEST, r#"{"error":"invalid_request"}"#);
    };
    let form: HashMap<String, String> = form_urlencoded::parse(&body.to_bytes())
        .into_owned()
        .collect();

    let field = |name: &str| form.get(name).map(String::as_str);
    if field("grant_type") != Some("client_credentials") {
        return json_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":"unsupported_grant_type"}"#,
        );
    }
    if field("client_id") != Some(TEST_CLIENT_ID)
        || field("client_secret") != Some(TEST_CLIENT_SECRET)
    {
        return json_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_client","error_description":"invalid client secret"}"#,
        );
    }

    let token = format!("token-{n}");
    state.valid_tokens.lock().await.insert(token.clone());
    json_response(
        StatusCode::OK,
        json!({
            "access_token": token,
            "expires_in": 5011271,
            "token_type": "bearer"
        })
        .to_string(),
    )
}

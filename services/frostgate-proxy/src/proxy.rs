//! Request-path proxy: forwards client traffic to the search engine and
//! intervenes exactly where the hibernation state diverges from what the
//! client expects.
//!
//! Writes against a draining collection are rejected with 409. A miss
//! against a cold collection either holds the request open while a
//! single-flight reload runs (blocking mode) or is rewritten into a 503
//! warming-up response while the reload proceeds out of band (async mode).
//! A 404 for a collection the state store has never seen is a genuine
//! absence and always passes through verbatim.

use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use frostgate_core::{metrics, CollectionState, CoreError, CoreResult, ReloadMode};
use tracing::{error, info, warn};

use crate::state::AppState;

const COLLECTIONS_PREFIX: &str = "/collections/";
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

const WARMING_BODY: &[u8] = br#"{"message":"collection warming up, retry shortly"}"#;
const DRAINING_BODY: &[u8] =
    br#"{"message":"collection is draining, writes are temporarily disabled"}"#;

/// A fully buffered upstream response.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut resp = Response::new(Body::from(self.body));
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers;
        resp
    }
}

/// Forwards requests verbatim to the engine base URL.
pub struct Upstream {
    http: reqwest::Client,
    base_url: String,
}

impl Upstream {
    pub fn new(base_url: &str, timeout: Duration) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::internal(format!("failed to build upstream client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn forward(
        &self,
        method: &Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: &Bytes,
    ) -> CoreResult<UpstreamResponse> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let mut request = self.http.request(method.clone(), url);
        for (name, value) in headers {
            if is_hop_by_hop(name) {
                continue;
            }
            request = request.header(name.clone(), value.clone());
        }
        let resp = request
            .body(body.clone())
            .send()
            .await
            .map_err(|e| CoreError::internal(format!("upstream request failed: {e}")))?;

        let status = resp.status();
        let mut out_headers = HeaderMap::new();
        for (name, value) in resp.headers() {
            if is_hop_by_hop(name) {
                continue;
            }
            out_headers.append(name.clone(), value.clone());
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| CoreError::internal(format!("failed to read upstream body: {e}")))?;

        Ok(UpstreamResponse {
            status,
            headers: out_headers,
            body,
        })
    }
}

// Length-like headers are dropped too: the buffered body is re-framed on the
// way out.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
            | "host"
            | "content-length"
    )
}

/// Collection name from `/collections/{name}/...`, if the path has one.
pub fn extract_collection(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(COLLECTIONS_PREFIX)?;
    let name = rest.split('/').next().unwrap_or(rest);
    (!name.is_empty()).then_some(name)
}

/// Create/update/delete semantics from the method.
pub fn is_write(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn json_response(status: StatusCode, body: &'static [u8], retry_after: Option<u64>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(secs) = retry_after {
        if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
            headers.insert(RETRY_AFTER, value);
        }
    }
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    *resp.headers_mut() = headers;
    resp
}

fn warming_response(retry_after_secs: u64) -> Response {
    json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        WARMING_BODY,
        Some(retry_after_secs),
    )
}

fn draining_response() -> Response {
    json_response(StatusCode::CONFLICT, DRAINING_BODY, None)
}

/// Router fallback: every request not claimed by an explicit route lands here.
pub async fn forward(State(state): State<AppState>, req: Request) -> Response {
    match handle(state, req).await {
        Ok(resp) => resp,
        Err(err) => {
            error!(error = %err, "proxy forwarding failed");
            (
                StatusCode::BAD_GATEWAY,
                axum::Json(serde_json::json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn handle(state: AppState, req: Request) -> CoreResult<Response> {
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| CoreError::internal(format!("failed to read request body: {e}")))?;
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let Some(collection) = extract_collection(parts.uri.path()).map(str::to_string) else {
        // No resolvable collection name: raw pass-through
        let resp = state
            .upstream
            .forward(&parts.method, &path_and_query, &parts.headers, &body)
            .await?;
        return Ok(resp.into_response());
    };

    if is_write(&parts.method) {
        handle_write(
            &state,
            &collection,
            &parts.method,
            &path_and_query,
            &parts.headers,
            &body,
        )
        .await
    } else {
        handle_read(
            &state,
            &collection,
            &parts.method,
            &path_and_query,
            &parts.headers,
            &body,
        )
        .await
    }
}

async fn handle_write(
    state: &AppState,
    collection: &str,
    method: &Method,
    path_and_query: &str,
    headers: &HeaderMap,
    body: &Bytes,
) -> CoreResult<Response> {
    let current = state.store.get(collection).await?;

    // Writes must never be accepted once offload has begun
    if current == Some(CollectionState::Draining) {
        metrics::WRITE_BLOCKED_TOTAL.inc();
        info!(collection = %collection, "write rejected: draining");
        return Ok(draining_response());
    }

    if state.settings.reload_mode != ReloadMode::Blocking {
        let resp = state
            .upstream
            .forward(method, path_and_query, headers, body)
            .await?;
        return inspect(state, collection, resp).await;
    }

    if current == Some(CollectionState::Cold) {
        info!(collection = %collection, "reload triggered by write");
        state.spawn_reload(collection);
    }

    let resp = state
        .upstream
        .forward(method, path_and_query, headers, body)
        .await?;

    // Hide the misleading 404 a cold write races into
    if current == Some(CollectionState::Cold) && resp.status == StatusCode::NOT_FOUND {
        return Ok(warming_response(state.settings.retry_after_secs));
    }

    inspect(state, collection, resp).await
}

async fn handle_read(
    state: &AppState,
    collection: &str,
    method: &Method,
    path_and_query: &str,
    headers: &HeaderMap,
    body: &Bytes,
) -> CoreResult<Response> {
    if state.settings.reload_mode != ReloadMode::Blocking {
        let resp = state
            .upstream
            .forward(method, path_and_query, headers, body)
            .await?;
        return inspect(state, collection, resp).await;
    }

    let current = state.store.get(collection).await?;
    if current != Some(CollectionState::Cold) {
        let resp = state
            .upstream
            .forward(method, path_and_query, headers, body)
            .await?;
        return inspect(state, collection, resp).await;
    }

    // Blocking revival: attempt once, then hold the request open while the
    // single-flight reload runs.
    let first = state
        .upstream
        .forward(method, path_and_query, headers, body)
        .await?;
    if first.status != StatusCode::NOT_FOUND || !state.store.exists(collection).await? {
        return inspect(state, collection, first).await;
    }

    info!(collection = %collection, "blocking reload triggered");
    let mut done = state.spawn_reload(collection);

    let started = Instant::now();
    // Drop the watch::Ref guard immediately: it is not Send and must not be
    // held across the retry await below.
    let waited = tokio::time::timeout(state.settings.blocking_wait, done.wait_for(|done| *done))
        .await
        .map(|inner| inner.map(|_| ()));
    metrics::BLOCKING_RELOAD_WAIT.observe(started.elapsed().as_secs_f64());

    match waited {
        Ok(_) => {
            info!(collection = %collection, "blocking reload completed, retrying request");
            let retried = state
                .upstream
                .forward(method, path_and_query, headers, body)
                .await?;
            inspect(state, collection, retried).await
        }
        Err(_) => {
            warn!(collection = %collection, "blocking reload wait timed out");
            Ok(warming_response(state.settings.retry_after_secs))
        }
    }
}

/// Response inspection shared by both modes.
///
/// Successful responses for known collections refresh the last-access
/// timestamp so idle detection stays accurate. A 404 for a known collection
/// is a hibernation signal, never surfaced to the client as-is while the
/// collection is cold (async mode) or already loading.
async fn inspect(
    state: &AppState,
    collection: &str,
    resp: UpstreamResponse,
) -> CoreResult<Response> {
    if resp.status.as_u16() < 400 {
        state.store.touch(collection).await?;
        return Ok(resp.into_response());
    }

    if resp.status != StatusCode::NOT_FOUND {
        return Ok(resp.into_response());
    }

    // Never observed by the system: a genuine absence
    if !state.store.exists(collection).await? {
        return Ok(resp.into_response());
    }

    match state.store.get(collection).await? {
        Some(CollectionState::Cold) if state.settings.reload_mode == ReloadMode::Async => {
            info!(collection = %collection, "async reload triggered");
            state.spawn_reload(collection);
            Ok(warming_response(state.settings.retry_after_secs))
        }
        Some(CollectionState::Loading) => Ok(warming_response(state.settings.retry_after_secs)),
        _ => Ok(resp.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_collection() {
        assert_eq!(
            extract_collection("/collections/movies/documents/search"),
            Some("movies")
        );
        assert_eq!(extract_collection("/collections/movies"), Some("movies"));
        assert_eq!(extract_collection("/collections/"), None);
        assert_eq!(extract_collection("/health"), None);
        assert_eq!(extract_collection("/"), None);
    }

    #[test]
    fn test_is_write() {
        assert!(is_write(&Method::POST));
        assert!(is_write(&Method::PUT));
        assert!(is_write(&Method::PATCH));
        assert!(is_write(&Method::DELETE));
        assert!(!is_write(&Method::GET));
        assert!(!is_write(&Method::HEAD));
    }

    #[test]
    fn test_hop_by_hop_filtering() {
        assert!(is_hop_by_hop(&HeaderName::from_static("connection")));
        assert!(is_hop_by_hop(&HeaderName::from_static("host")));
        assert!(is_hop_by_hop(&HeaderName::from_static("content-length")));
        assert!(!is_hop_by_hop(&HeaderName::from_static("x-api-key")));
        assert!(!is_hop_by_hop(&HeaderName::from_static("content-type")));
    }

    #[test]
    fn test_warming_response_shape() {
        let resp = warming_response(2);
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers().get(RETRY_AFTER).unwrap(), "2");
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_draining_response_shape() {
        let resp = draining_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}

//! Shared HTTP plumbing: one `reqwest::Client`, one base URL, one request shape.

use crate::error::{Result, UpstreamError};
use crate::safety::redact_url;
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderValue, RETRY_AFTER};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://services.leadconnectorhq.com";
pub const DEFAULT_API_VERSION: &str = "2021-07-28";

const VERSION_HEADER: &str = "Version";
const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Where the upstream lives and which API revision to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

/// Upstream CRM client. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct CrmClient {
    inner: Arc<CrmClientInner>,
}

struct CrmClientInner {
    base_url: Url,
    api_version: HeaderValue,
    http: reqwest::Client,
}

impl std::fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmClient")
            .field("base_url", &redact_url(&self.inner.base_url))
            .finish_non_exhaustive()
    }
}

impl CrmClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Config`] if the base URL is not an absolute `http(s)` URL, or if
    /// the API version is not a valid header value.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            UpstreamError::Config(format!("Invalid base URL '{}': {e}", config.base_url))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(UpstreamError::Config(format!(
                "Invalid base URL '{}': expected an absolute http(s) URL",
                config.base_url
            )));
        }
        let api_version = HeaderValue::from_str(&config.api_version).map_err(|e| {
            UpstreamError::Config(format!("Invalid API version '{}': {e}", config.api_version))
        })?;

        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(CrmClientInner {
                base_url,
                api_version,
                http,
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Send one request and return the parsed JSON reply.
    ///
    /// An empty 2xx body yields `Value::Null`.
    pub(crate) async fn execute(&self, endpoint: Endpoint, token: &str) -> Result<Value> {
        let url = self.url_for(&endpoint);
        debug!(method = %endpoint.method, url = %redact_url(&url), "upstream request");

        let mut request = self
            .inner
            .http
            .request(endpoint.method.clone(), url)
            .bearer_auth(token)
            .header(VERSION_HEADER, self.inner.api_version.clone())
            .header(ACCEPT, "application/json");
        if endpoint.method != Method::GET
            && let Some(body) = &endpoint.body
        {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let retry_after = if status.is_success() {
            None
        } else {
            retry_after_header(response.headers())
        };
        let text = response.text().await?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(e.to_string()));
        }

        debug!(status = status.as_u16(), "upstream returned error status");
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
            retry_after,
        })
    }

    fn url_for(&self, endpoint: &Endpoint) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(endpoint.segments.iter().map(String::as_str));
        }
        if !endpoint.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                endpoint
                    .query
                    .iter()
                    .map(|(k, v)| (*k, v.as_str())),
            );
        }
        url
    }
}

fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(RATE_LIMIT_RESET_HEADER)
        .or_else(|| headers.get(RETRY_AFTER))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// One upstream call: verb, path segments, query pairs and an optional JSON body.
///
/// Segments are percent-encoded individually, so identifiers can never alter the path shape.
/// A trailing empty segment renders as a trailing slash (`/contacts/`).
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    method: Method,
    segments: Vec<String>,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
}

impl Endpoint {
    fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| (*s).to_string()).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub(crate) fn get(segments: &[&str]) -> Self {
        Self::new(Method::GET, segments)
    }

    pub(crate) fn post(segments: &[&str], body: Value) -> Self {
        Self::new(Method::POST, segments).body(body)
    }

    pub(crate) fn put(segments: &[&str], body: Value) -> Self {
        Self::new(Method::PUT, segments).body(body)
    }

    pub(crate) fn delete(segments: &[&str]) -> Self {
        Self::new(Method::DELETE, segments)
    }

    pub(crate) fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Add a query pair unless the value is absent or empty.
    pub(crate) fn query_opt(self, key: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.query(key, v),
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::routing::any;
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn spawn(app: Router) -> (String, tokio::sync::oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });
        (format!("http://{addr}"), shutdown_tx)
    }

    fn client(base_url: &str) -> CrmClient {
        CrmClient::new(&ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        })
        .expect("client")
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = CrmClient::new(&ClientConfig {
            base_url: "mailto:someone@example.com".to_string(),
            ..ClientConfig::default()
        })
        .expect_err("must fail");
        assert!(matches!(err, UpstreamError::Config(_)));

        let err = CrmClient::new(&ClientConfig {
            base_url: "not a url".to_string(),
            ..ClientConfig::default()
        })
        .expect_err("must fail");
        assert!(matches!(err, UpstreamError::Config(_)));
    }

    #[test]
    fn url_encodes_segments_and_keeps_trailing_slash() {
        let c = client("http://127.0.0.1:1/");
        let url = c.url_for(&Endpoint::get(&["contacts", ""]).query("locationId", "loc 1"));
        assert_eq!(url.as_str(), "http://127.0.0.1:1/contacts/?locationId=loc+1");

        let url = c.url_for(&Endpoint::get(&["contacts", "a/b?c"]));
        assert_eq!(url.as_str(), "http://127.0.0.1:1/contacts/a%2Fb%3Fc");

        let url = c.url_for(
            &Endpoint::get(&["x"])
                .query_opt("skip", None)
                .query_opt("empty", Some(""))
                .query_opt("kept", Some("v")),
        );
        assert_eq!(url.query(), Some("kept=v"));
    }

    #[tokio::test]
    async fn sends_auth_version_and_accept_headers() {
        async fn echo(headers: HeaderMap, uri: Uri) -> axum::Json<serde_json::Value> {
            let h = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            axum::Json(json!({
                "authorization": h("authorization"),
                "version": h("version"),
                "accept": h("accept"),
                "contentType": h("content-type"),
                "path": uri.path(),
            }))
        }

        let (base, shutdown) = spawn(Router::new().route("/{*path}", any(echo))).await;
        let c = client(&base);

        let got = c
            .execute(Endpoint::get(&["contacts", "c1"]), "tok-1")
            .await
            .expect("execute");
        assert_eq!(got["authorization"], "Bearer tok-1");
        assert_eq!(got["version"], DEFAULT_API_VERSION);
        assert_eq!(got["accept"], "application/json");
        assert_eq!(got["contentType"], serde_json::Value::Null);
        assert_eq!(got["path"], "/contacts/c1");

        let got = c
            .execute(Endpoint::post(&["contacts", ""], json!({"a": 1})), "tok-1")
            .await
            .expect("execute");
        assert_eq!(got["contentType"], "application/json");

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn non_success_carries_status_body_and_retry_header() {
        let app = Router::new()
            .route(
                "/json",
                any(|| async {
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        [("X-RateLimit-Reset", "30")],
                        axum::Json(json!({"message": "slow down"})),
                    )
                }),
            )
            .route(
                "/text",
                any(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
            )
            .route(
                "/retry-after",
                any(|| async { (StatusCode::SERVICE_UNAVAILABLE, [("Retry-After", "12")], "") }),
            );
        let (base, shutdown) = spawn(app).await;
        let c = client(&base);

        match c.execute(Endpoint::get(&["json"]), "t").await {
            Err(UpstreamError::Status {
                status,
                body,
                retry_after,
            }) => {
                assert_eq!(status, 429);
                assert_eq!(body, json!({"message": "slow down"}));
                assert_eq!(retry_after.as_deref(), Some("30"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        match c.execute(Endpoint::get(&["text"]), "t").await {
            Err(UpstreamError::Status { status, body, .. }) => {
                assert_eq!(status, 502);
                assert_eq!(body, json!("upstream exploded"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        match c.execute(Endpoint::get(&["retry-after"]), "t").await {
            Err(UpstreamError::Status { retry_after, .. }) => {
                assert_eq!(retry_after.as_deref(), Some("12"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn empty_success_body_is_null() {
        let app = Router::new().route("/gone", any(|| async { StatusCode::NO_CONTENT }));
        let (base, shutdown) = spawn(app).await;

        let got = client(&base)
            .execute(Endpoint::delete(&["gone"]), "t")
            .await
            .expect("execute");
        assert_eq!(got, serde_json::Value::Null);

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error_without_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let err = client(&format!("http://{addr}"))
            .execute(Endpoint::get(&["contacts", ""]).query("locationId", "secret"), "t")
            .await
            .expect_err("no server");
        assert!(matches!(err, UpstreamError::Transport(_)));
        assert_eq!(err.status(), None);
        assert!(!err.to_string().contains("secret"));
    }
}

//! Minimal HTTP client for fetching markup with safe logging and retries.
//!
//! - Request options: headers, query params, timeout, retries
//! - Follows redirects and reports the final URL reached
//! - Retries 429/5xx and transport failures with exponential backoff and
//!   `Retry-After` support
//! - Optional *raw* request/response logging via `LANTERN_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```no_run
//! # async fn demo() -> Result<(), lantern_http::HttpError> {
//! let client = lantern_http::HttpClient::new("https://sg.search.yahoo.com/search")?;
//! let page = client
//!     .get_text("", lantern_http::RequestOpts::default().with_query("q", "weather"))
//!     .await?;
//! println!("{} bytes from {}", page.body.len(), page.final_url);
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), retries and final errors.
//! With `LANTERN_HTTP_RAW=1`, a curl reproduction line and the raw response
//! are logged under target `http.raw`.

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use std::borrow::Cow;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use uuid::Uuid;

const RAW_ENV: &str = "LANTERN_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;

/// Desktop browser identity; result pages differ for unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

const SECRET_PARAMS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
];

fn is_secret_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECRET_PARAMS.contains(&lower.as_str())
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), "-L".to_string(), format!("-X{}", method)];
    for (name, val) in headers.iter() {
        let mut v = val.to_str().unwrap_or("").to_string();
        if name.as_str().eq_ignore_ascii_case("authorization") || name.as_str() == "cookie" {
            v = "<redacted>".into();
        }
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    if !pairs.is_empty() {
        shown.query_pairs_mut().clear().extend_pairs(pairs);
    }
    parts.push(format!("'{}'", shown.as_str().replace('\'', r"'\''")));
    parts.join(" ")
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("set-cookie") || key.eq_ignore_ascii_case("authorization")
            {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned error {status} for {url}, request_id={request_id}")]
    Status {
        status: StatusCode,
        url: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for [`HttpError::Status`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use lantern_http::RequestOpts;
///
/// let opts = RequestOpts::default()
///     .with_query("q", "rust")
///     .with_query("nojs", "1");
///
/// assert_eq!(opts.query.as_ref().map(Vec::len), Some(2));
/// assert!(opts.timeout.is_none());
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

impl<'a> RequestOpts<'a> {
    pub fn with_query(mut self, name: &'a str, value: impl Into<Cow<'a, str>>) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((name, value.into()));
        self
    }

    pub fn absolute(mut self) -> Self {
        self.allow_absolute = true;
        self
    }
}

/// A fetched document and where it actually came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
    /// Final URL after redirects.
    pub final_url: String,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use lantern_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://sg.search.yahoo.com/search")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        Self::with_user_agent(base, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(base: &str, user_agent: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(user_agent)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET a document as text. Non-success statuses (after retries) are errors.
    pub async fn get_text(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<FetchedPage, HttpError> {
        let url = self.resolve(path, opts.allow_absolute)?;
        self.fetch_text(Method::GET, url, &opts).await
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        if path.is_empty() {
            return Ok(self.base.clone());
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    async fn fetch_text(
        &self,
        method: Method,
        url: Url,
        opts: &RequestOpts<'_>,
    ) -> Result<FetchedPage, HttpError> {
        let mut attempt = 0usize;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let req_id = Uuid::new_v4().simple().to_string();

        loop {
            let mut rb = self.inner.request(method.clone(), url.clone());

            let timeout = opts.timeout.unwrap_or(self.default_timeout);
            rb = rb.timeout(timeout);

            if let Some(q) = &opts.query {
                let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }
            if let Some(hdrs) = &opts.headers {
                rb = rb.headers(hdrs.clone());
            }

            let request = rb.build().map_err(|e| HttpError::Build(e.to_string()))?;
            let redacted_q: Vec<(String, String)> = request
                .url()
                .query_pairs()
                .map(|(k, v)| {
                    let v = if is_secret_param(&k) {
                        "<redacted>".to_string()
                    } else {
                        v.into_owned()
                    };
                    (k.into_owned(), v)
                })
                .collect();
            let attempt0 = attempt + 1;

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt0,
                max_retries,
                method=%method,
                host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                "http.request.start"
            );

            if raw_enabled() {
                let curl = make_curl(&method, request.url(), request.headers());
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            let t0 = std::time::Instant::now();
            let resp = match self.inner.execute(request).await {
                Ok(resp) => resp,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_send"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        message=%message,
                        "http.network_error.send"
                    );
                    return Err(HttpError::Network(message));
                }
            };
            let status = resp.status();
            let final_url = resp.url().to_string();
            let headers = resp.headers().clone();
            let bytes = match resp.bytes().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_body"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        message=%message,
                        "http.network_error.body"
                    );
                    return Err(HttpError::Network(message));
                }
            };
            let dur_ms = t0.elapsed().as_millis() as u64;

            let server_req_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-correlation-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=bytes.len(),
                redirected=%(final_url != url.as_str()),
                x_request_id=%server_req_id,
                "http.response.headers"
            );

            if raw_enabled() {
                let hdrs = redact_headers(&headers);
                let truncated = bytes.len() > RAW_MAX_BODY;
                let text = String::from_utf8_lossy(&bytes[..bytes.len().min(RAW_MAX_BODY)]);
                tracing::info!(
                    target:"http.raw",
                    %req_id,
                    status=%status,
                    duration_ms=dur_ms,
                    final_url=%final_url,
                    headers=?hdrs,
                    body=%text,
                    truncated
                );
            }

            let snippet = snip_body(&bytes);
            tracing::trace!(
                req_id=%req_id,
                body_snippet=%snippet,
                "http.response.body_snippet"
            );

            if status.is_success() {
                return Ok(FetchedPage {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                    final_url,
                });
            }

            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;
            let is_5xx = status.is_server_error();

            if (is_429 || is_5xx) && attempt < max_retries {
                attempt += 1;
                let delay = match retry_after_delay_secs(&headers) {
                    Some(secs) => Duration::from_secs(secs),
                    None if is_429 => backoff(attempt).max(Duration::from_millis(1100)),
                    None => backoff(attempt),
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    body_snippet=%snippet,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                final_url=%final_url,
                x_request_id=%server_req_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Status {
                status,
                url: final_url,
                request_id: req_id,
            });
        }
    }
}

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << (attempt.saturating_sub(1)).min(16)))
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v: &HeaderValue| v.to_str().ok())?
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(&body[..body.len().min(600)]).to_string();
    if body.len() > 500 && snip.len() > 500 {
        let mut cut = 500;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curl_line_redacts_secret_params() {
        let url = Url::parse("https://example.com/search?q=rust&api_key=hunter2").unwrap();
        let curl = make_curl(&Method::GET, &url, &HeaderMap::new());
        assert!(curl.contains("q=rust"));
        assert!(!curl.contains("hunter2"));
        assert!(curl.starts_with("curl -L -XGET"));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(400));
        assert_eq!(backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= 503);
    }

    #[test]
    fn empty_path_resolves_to_base() {
        let client = HttpClient::new("https://sg.search.yahoo.com/search").unwrap();
        let url = client.resolve("", false).unwrap();
        assert_eq!(url.as_str(), "https://sg.search.yahoo.com/search");
        let abs = client.resolve("https://example.com/a", true).unwrap();
        assert_eq!(abs.as_str(), "https://example.com/a");
    }
}

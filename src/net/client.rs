//! Credentialed HTTP client with anti-forgery token handling.
//!
//! DESIGN
//! ======
//! Every request shares one cookie jar, so the session cookie and the
//! anti-forgery cookie travel both ways without caller bookkeeping. Unsafe
//! methods need the anti-forgery header; when the cookie is missing the
//! client performs one bootstrap GET that makes the server set it.
//!
//! The bootstrap slot holds at most one in-flight attempt as a shared
//! future: concurrent unsafe requests all await that attempt and see the same
//! result, success or failure, so exactly one bootstrap request is sent per
//! attempt. A failed attempt empties the slot and the next unsafe request
//! starts a fresh one; a successful one is remembered.
//!
//! LIFECYCLE
//! =========
//! `ApiClient` is a cheap-clone handle. Build one per process and share it;
//! the bootstrap slot lives as long as the last clone.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;

use super::Backend;
use super::error::{ApiError, ErrorBody};
use crate::config::{CsrfSettings, PortalConfig};

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    csrf: CsrfSettings,
    csrf_header: HeaderName,
    bootstrap: Mutex<BootstrapSlot>,
}

type BootstrapAttempt = Shared<BoxFuture<'static, Result<(), ApiError>>>;

enum BootstrapSlot {
    Idle,
    Running(BootstrapAttempt),
    Done,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("csrf", &self.inner.csrf)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client for `config.base_url` with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or anti-forgery header name is
    /// invalid, or the HTTP client fails to build.
    pub fn new(config: &PortalConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        let csrf_header = HeaderName::from_bytes(config.csrf.header_name.as_bytes())
            .map_err(|e| ApiError::ClientBuild(format!("invalid header name '{}': {e}", config.csrf.header_name)))?;

        let jar = Arc::new(Jar::default());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                jar,
                base_url,
                csrf: config.csrf.clone(),
                csrf_header,
                bootstrap: Mutex::new(BootstrapSlot::Idle),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve `path` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL does not parse.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, ApiError> {
        join_endpoint(&self.inner.base_url, path)
    }

    /// Current value of the anti-forgery cookie, if the jar holds one.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        let header = self.cookie_header()?;
        read_cookie(&header, &self.inner.csrf.cookie_name)
    }

    /// All cookies the jar would send to the base URL, as a `Cookie` header.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        self.inner
            .jar
            .cookies(&self.inner.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
    }

    /// Seed the jar from a header previously returned by [`Self::cookie_header`].
    pub fn restore_cookies(&self, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|pair| pair.contains('=')) {
            self.inner
                .jar
                .add_cookie_str(&format!("{pair}; Path=/"), &self.inner.base_url);
        }
    }

    /// Send a request. Unsafe methods carry the anti-forgery header.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when no response arrives,
    /// [`ApiError::Status`] for non-success statuses with the server's body
    /// intact, [`ApiError::Decode`] for non-JSON success bodies, and
    /// [`ApiError::CsrfUnavailable`] when an unsafe request cannot obtain a token.
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let url = self.endpoint_url(path)?;
        let mut request = self.inner.http.request(method.clone(), url);
        if !is_safe_method(&method) {
            let token = self.ensure_csrf_token().await?;
            request = request.header(self.inner.csrf_header.clone(), token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "request did not reach server");
            ApiError::from(e)
        })?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(%method, path, status = status.as_u16(), "request failed");
            return Err(ApiError::Status { status: status.as_u16(), body: ErrorBody::parse(&text) });
        }
        tracing::debug!(%method, path, status = status.as_u16(), "request ok");
        decode_body(&text)
    }

    async fn ensure_csrf_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.csrf_token() {
            return Ok(token);
        }
        if let Some(attempt) = self.bootstrap_attempt() {
            let result = attempt.clone().await;
            self.settle_bootstrap(&attempt, result.is_ok());
            result?;
        }
        self.csrf_token()
            .ok_or_else(|| ApiError::CsrfUnavailable { cookie: self.inner.csrf.cookie_name.clone() })
    }

    /// Join the in-flight attempt, or start one. `None` once a bootstrap has
    /// already succeeded.
    fn bootstrap_attempt(&self) -> Option<BootstrapAttempt> {
        let mut slot = self.inner.bootstrap.lock().unwrap_or_else(PoisonError::into_inner);
        match &*slot {
            BootstrapSlot::Done => return None,
            BootstrapSlot::Running(attempt) => return Some(attempt.clone()),
            BootstrapSlot::Idle => {}
        }
        let path = self.inner.csrf.bootstrap_path.clone();
        let url = self.endpoint_url(&path);
        let attempt = bootstrap(self.inner.http.clone(), url, path).boxed().shared();
        *slot = BootstrapSlot::Running(attempt.clone());
        Some(attempt)
    }

    fn settle_bootstrap(&self, attempt: &BootstrapAttempt, succeeded: bool) {
        let mut slot = self.inner.bootstrap.lock().unwrap_or_else(PoisonError::into_inner);
        let current = matches!(&*slot, BootstrapSlot::Running(running) if running.ptr_eq(attempt));
        if current {
            *slot = if succeeded { BootstrapSlot::Done } else { BootstrapSlot::Idle };
        }
    }
}

async fn bootstrap(http: reqwest::Client, url: Result<Url, ApiError>, path: String) -> Result<(), ApiError> {
    tracing::info!(path = %path, "requesting anti-forgery cookie");
    let response = http.get(url?).send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        tracing::warn!(path = %path, status = status.as_u16(), "anti-forgery bootstrap failed");
        return Err(ApiError::Status { status: status.as_u16(), body: ErrorBody::parse(&text) });
    }
    Ok(())
}

#[async_trait::async_trait]
impl Backend for ApiClient {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        self.send(method, path, body).await
    }
}

fn is_safe_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS || *method == Method::TRACE
}

/// Join with exactly one `/`; a leading `/` on `path` stays under the base prefix.
fn join_endpoint(base: &Url, path: &str) -> Result<Url, ApiError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))
}

fn read_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn decode_body(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

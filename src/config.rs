//! Portal configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/";
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFToken";
pub const DEFAULT_BOOTSTRAP_PATH: &str = "ping";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATE_DIR: &str = ".registrar";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Names the anti-forgery cookie/header pair and the request that makes the
/// server issue the cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfSettings {
    pub cookie_name: String,
    pub header_name: String,
    pub bootstrap_path: String,
}

impl Default for CsrfSettings {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_CSRF_COOKIE.to_owned(),
            header_name: DEFAULT_CSRF_HEADER.to_owned(),
            bootstrap_path: DEFAULT_BOOTSTRAP_PATH.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    pub csrf: CsrfSettings,
    pub timeouts: Timeouts,
    pub state_dir: PathBuf,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            csrf: CsrfSettings::default(),
            timeouts: Timeouts::default(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
        }
    }
}

impl PortalConfig {
    /// Build typed portal config from environment variables.
    ///
    /// Optional:
    /// - `PORTAL_BASE_URL`: backend API root, default `http://127.0.0.1:8000/api/`
    /// - `PORTAL_CSRF_COOKIE`: anti-forgery cookie name, default `csrftoken`
    /// - `PORTAL_CSRF_HEADER`: anti-forgery header name, default `X-CSRFToken`
    /// - `PORTAL_BOOTSTRAP_PATH`: safe endpoint that sets the cookie, default `ping`
    /// - `PORTAL_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PORTAL_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PORTAL_STATE_DIR`: where identity and cookies persist, default `.registrar`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not absolute or a name is blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PortalConfig::from_env`] but reading through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not absolute or a name is blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("PORTAL_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        validate_base_url(&base_url)?;

        let csrf = CsrfSettings {
            cookie_name: non_empty(&lookup, "PORTAL_CSRF_COOKIE", DEFAULT_CSRF_COOKIE)?,
            header_name: non_empty(&lookup, "PORTAL_CSRF_HEADER", DEFAULT_CSRF_HEADER)?,
            bootstrap_path: non_empty(&lookup, "PORTAL_BOOTSTRAP_PATH", DEFAULT_BOOTSTRAP_PATH)?,
        };
        let timeouts = Timeouts {
            request_secs: parse_u64(&lookup, "PORTAL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(&lookup, "PORTAL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let state_dir = PathBuf::from(lookup("PORTAL_STATE_DIR").unwrap_or_else(|| DEFAULT_STATE_DIR.to_owned()));

        Ok(Self { base_url, csrf, timeouts, state_dir })
    }

    /// Replace the base URL, e.g. from a command-line flag.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        validate_base_url(base_url)?;
        base_url.clone_into(&mut self.base_url);
        Ok(self)
    }
}

fn validate_base_url(url: &str) -> Result<(), ConfigError> {
    reqwest::Url::parse(url)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidBaseUrl { url: url.to_owned(), reason: e.to_string() })
}

fn non_empty<F>(lookup: &F, var: &'static str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default.to_owned()),
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty { var }),
        Some(v) => Ok(v.trim().to_owned()),
    }
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

//! Networking: the credentialed API client and the endpoints it talks to.
//!
//! SYSTEM CONTEXT
//! ==============
//! `client` owns the cookie jar and the anti-forgery bootstrap, `endpoints`
//! names the backend paths, and `error` defines the failure taxonomy.
//! Consumers depend on the [`Backend`] trait rather than the concrete client
//! so resource state and role routing can run against a scripted backend.

pub mod client;
pub mod endpoints;
pub mod error;

#[cfg(test)]
pub(crate) mod mock;

use reqwest::Method;
use serde_json::Value;

pub use client::ApiClient;
pub use error::{ApiError, ErrorBody};

/// A JSON-over-HTTP backend reachable by relative path.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Send `method` to `path` with an optional JSON body and decode the
    /// JSON response. Empty success bodies decode to `Value::Null`.
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError>;

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, None).await
    }
}

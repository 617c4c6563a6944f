//! Typed API failures and server error payloads.
//!
//! DESIGN
//! ======
//! The backend answers failures with either `{ "detail": "..." }` or a map of
//! field name to message(s). Parsing that shape once into [`ErrorBody`] keeps
//! message classification in one place instead of probing JSON at each caller.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

/// Errors produced by [`super::client::ApiClient`] and any [`super::Backend`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request URL could not be built from the base URL and path.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    /// No response reached us (connect failure, timeout, reset).
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server responded with status {status}")]
    Status { status: u16, body: ErrorBody },

    /// A success response carried a body that is not JSON.
    #[error("response parse failed: {0}")]
    Decode(String),

    /// The anti-forgery cookie was still missing after the bootstrap request.
    #[error("anti-forgery cookie `{cookie}` unavailable")]
    CsrfUnavailable { cookie: String },
}

impl ApiError {
    /// HTTP status carried by this error, if the server responded at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured error body, if the server responded with one.
    #[must_use]
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Server error payload, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ErrorBody {
    /// `{ "detail": "..." }`
    Detail(String),
    /// Field name to messages, in the order the server sent them.
    FieldErrors(Vec<(String, Vec<String>)>),
    /// No body, a non-JSON body, or an object with nothing usable in it.
    #[default]
    Empty,
}

impl ErrorBody {
    /// Parse a raw response body.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Self::Empty,
        }
    }

    /// Classify an already-decoded JSON body.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::Empty;
        };
        if let Some(Value::String(detail)) = map.get("detail") {
            return Self::Detail(detail.clone());
        }
        let fields: Vec<(String, Vec<String>)> = map
            .iter()
            .map(|(name, messages)| (name.clone(), flatten_messages(messages)))
            .filter(|(_, messages)| !messages.is_empty())
            .collect();
        if fields.is_empty() { Self::Empty } else { Self::FieldErrors(fields) }
    }

    /// The `detail` message, if that is the shape of this body.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Detail(detail) => Some(detail),
            _ => None,
        }
    }

    /// All field messages flattened and joined with newlines.
    #[must_use]
    pub fn field_messages(&self) -> Option<String> {
        let Self::FieldErrors(fields) = self else {
            return None;
        };
        let joined = fields
            .iter()
            .flat_map(|(_, messages)| messages.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n");
        if joined.is_empty() { None } else { Some(joined) }
    }
}

// One level of flattening: a field maps to a message or a list of messages.
fn flatten_messages(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(message_text).collect(),
        other => message_text(other).into_iter().collect(),
    }
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

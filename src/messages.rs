//! User-facing messages for API failures.
//!
//! DESIGN
//! ======
//! Every network failure is reduced to a [`FailureKind`] once, then worded
//! per operation: listing a collection, creating a record, or signing in.
//! Callers display the string; nothing past this boundary sees an `ApiError`.

#[cfg(test)]
#[path = "messages_test.rs"]
mod messages_test;

use crate::net::endpoints::display_path;
use crate::net::{ApiError, ErrorBody};

pub const UNAUTHORIZED_ADMIN: &str = "Unauthorized: Please sign in as an admin";
pub const LOAD_FAILED: &str = "Failed to load data. Please try again later.";
pub const CSRF_INVALID: &str = "CSRF token missing or invalid. Please refresh and try again.";
pub const INVALID_DATA: &str = "Invalid data provided. Please check the form.";
pub const SERVER_ERROR: &str = "Server error: Please try again later";
pub const NETWORK_ERROR: &str = "Network error: Unable to connect";
pub const CREATED: &str = "Item created successfully!";

/// Failure taxonomy shared by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response reached us.
    Transport,
    /// 403, or an unsafe request that could not obtain an anti-forgery token.
    Unauthorized,
    /// 404, or a path that does not form a valid URL.
    NotFound,
    /// 400.
    Validation,
    /// 5xx, undecodable success bodies, and anything unclassified.
    Server,
}

impl FailureKind {
    #[must_use]
    pub fn of(err: &ApiError) -> Self {
        match err {
            ApiError::Transport(_) => Self::Transport,
            ApiError::CsrfUnavailable { .. } | ApiError::Status { status: 401 | 403, .. } => Self::Unauthorized,
            ApiError::InvalidUrl(_) | ApiError::Status { status: 404, .. } => Self::NotFound,
            ApiError::Status { status: 400, .. } => Self::Validation,
            ApiError::Status { .. } | ApiError::Decode(_) | ApiError::ClientBuild(_) => Self::Server,
        }
    }
}

#[must_use]
pub fn endpoint_not_found(path: &str) -> String {
    format!(
        "Endpoint {} not found. Please check the backend URL configuration.",
        display_path(path)
    )
}

/// Message for a failed collection fetch of `path`.
#[must_use]
pub fn list_error_message(path: &str, err: &ApiError) -> String {
    match FailureKind::of(err) {
        FailureKind::Transport => NETWORK_ERROR.to_owned(),
        FailureKind::Unauthorized => UNAUTHORIZED_ADMIN.to_owned(),
        FailureKind::NotFound => endpoint_not_found(path),
        FailureKind::Validation | FailureKind::Server => LOAD_FAILED.to_owned(),
    }
}

/// Message for a failed create against `path`: server field messages first,
/// then a status hint, then the generic server message.
#[must_use]
pub fn create_error_message(path: &str, err: &ApiError) -> String {
    if let Some(fields) = err.body().and_then(ErrorBody::field_messages) {
        return fields;
    }
    match FailureKind::of(err) {
        FailureKind::Transport => NETWORK_ERROR.to_owned(),
        FailureKind::Unauthorized => CSRF_INVALID.to_owned(),
        FailureKind::NotFound => endpoint_not_found(path),
        FailureKind::Validation => INVALID_DATA.to_owned(),
        FailureKind::Server => SERVER_ERROR.to_owned(),
    }
}

/// Message for a failed sign-in: the server's `detail` when it sent one,
/// otherwise the create classification.
#[must_use]
pub fn sign_in_error_message(path: &str, err: &ApiError) -> String {
    match err.body().and_then(ErrorBody::detail) {
        Some(detail) => detail.to_owned(),
        None => create_error_message(path, err),
    }
}

//! Sign-in, sign-up, sign-out, and the post-sign-in landing decision.
//!
//! ROLE ROUTING
//! ============
//! Admins land on `/admin` without further calls. Everyone else costs one
//! probe for the sections they teach: at least one section means instructor,
//! anything else (including a failed probe) means student. A probe failure is
//! never reported as a sign-in failure.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use reqwest::Method;
use serde_json::{Value, json};

use crate::messages;
use crate::net::endpoints::{MY_PRESENTED_COURSES, SIGN_IN, SIGN_OUT, SIGN_UP, profile_path};
use crate::net::{ApiError, Backend, ErrorBody};
use crate::state::identity::Identity;
use crate::state::resource::{Record, is_blank};
use crate::state::store::IdentityStore;

pub const SIGNED_UP: &str = "Success! Account created.";
pub const UPDATE_FAILED: &str = "Update failed";

/// Where a user lands after signing in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Landing {
    Admin,
    Instructor,
    Student,
}

impl Landing {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Instructor => "/professor",
            Self::Student => "/student",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Both fields must be non-blank.
    ///
    /// # Errors
    ///
    /// Returns one line per missing field.
    pub fn validate(&self) -> Result<(), String> {
        let mut problems = Vec::new();
        if self.username.trim().is_empty() {
            problems.push("Username required");
        }
        if self.password.is_empty() {
            problems.push("Password required");
        }
        if problems.is_empty() { Ok(()) } else { Err(problems.join("\n")) }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignedIn {
    pub identity: Identity,
    pub landing: Landing,
}

/// Decide the landing page for a freshly signed-in identity.
pub async fn resolve_landing(backend: &dyn Backend, identity: &Identity) -> Landing {
    if identity.is_admin {
        return Landing::Admin;
    }
    match backend.get(MY_PRESENTED_COURSES).await {
        Ok(Value::Array(sections)) if !sections.is_empty() => Landing::Instructor,
        Ok(_) => Landing::Student,
        Err(e) => {
            tracing::debug!(error = %e, "instructor probe failed; treating as student");
            Landing::Student
        }
    }
}

/// Sign in, persist the identity, and pick the landing page.
///
/// # Errors
///
/// Returns a display message for missing input, a rejected sign-in, or an
/// identity that cannot be saved.
pub async fn sign_in(
    backend: &dyn Backend,
    store: &IdentityStore,
    credentials: &Credentials,
) -> Result<SignedIn, String> {
    credentials.validate()?;

    let body = json!({ "username": credentials.username, "password": credentials.password });
    let response = backend.post(SIGN_IN, &body).await.map_err(|e| {
        tracing::warn!(username = %credentials.username, error = %e, "sign-in failed");
        messages::sign_in_error_message(SIGN_IN, &e)
    })?;

    let identity = Identity::from_sign_in(&response, &credentials.username)?;
    store
        .save(&identity)
        .map_err(|e| format!("Signed in, but the session could not be saved: {e}"))?;

    let landing = resolve_landing(backend, &identity).await;
    tracing::info!(username = %identity.username, landing = landing.path(), "signed in");
    Ok(SignedIn { identity, landing })
}

/// Sign out on the server and forget the local identity either way.
///
/// # Errors
///
/// Returns a display message if the server call or local cleanup failed;
/// the identity is cleared regardless.
pub async fn sign_out(backend: &dyn Backend, store: &IdentityStore) -> Result<(), String> {
    let server = backend.request(Method::POST, SIGN_OUT, None).await;
    let local = store.clear();
    if let Err(e) = server {
        tracing::warn!(error = %e, "sign-out request failed");
        return Err(messages::create_error_message(SIGN_OUT, &e));
    }
    local.map_err(|e| e.to_string())
}

/// Fields a registration must carry, with their messages.
const REGISTRATION_REQUIRED: [(&str, &str); 3] = [
    ("fname", "Name is required"),
    ("lname", "Last name is required"),
    ("national_id", "National # is required"),
];

/// Register a new member.
///
/// # Errors
///
/// Returns one line per missing required field, or the server's messages.
pub async fn sign_up(backend: &dyn Backend, registration: &Record) -> Result<Value, String> {
    let missing: Vec<&str> = REGISTRATION_REQUIRED
        .iter()
        .filter(|(field, _)| is_blank(registration.get(*field)))
        .map(|(_, message)| *message)
        .collect();
    if !missing.is_empty() {
        return Err(missing.join("\n"));
    }

    backend
        .post(SIGN_UP, &Value::Object(registration.clone()))
        .await
        .map_err(|e| messages::sign_in_error_message(SIGN_UP, &e))
}

/// Replace profile fields for the signed-in member, or for `member_mid`
/// when an admin edits someone else.
///
/// # Errors
///
/// Returns the server's `detail` or field messages, the network message,
/// or [`UPDATE_FAILED`].
pub async fn update_profile(
    backend: &dyn Backend,
    profile: &Record,
    member_mid: Option<&str>,
) -> Result<Value, String> {
    let path = profile_path(member_mid);
    backend.put(&path, &Value::Object(profile.clone())).await.map_err(|e| {
        tracing::warn!(path = %path, error = %e, "profile update failed");
        update_error_message(&e)
    })
}

fn update_error_message(err: &ApiError) -> String {
    if err.is_transport() {
        return messages::NETWORK_ERROR.to_owned();
    }
    let body = err.body();
    body.and_then(ErrorBody::detail)
        .map(str::to_owned)
        .or_else(|| body.and_then(ErrorBody::field_messages))
        .unwrap_or_else(|| UPDATE_FAILED.to_owned())
}

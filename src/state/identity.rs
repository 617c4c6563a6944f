//! Signed-in user identity and admin gating.
//!
//! SYSTEM CONTEXT
//! ==============
//! The identity is created from the sign-in response, persisted through
//! [`super::store::IdentityStore`], and read at start-up to decide whether
//! admin-only commands may run.

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Minimal client-side record of who is signed in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub username: String,
    #[serde(rename = "isAdmin", alias = "is_admin", default, deserialize_with = "truthy")]
    pub is_admin: bool,
    /// Everything else the server returned at sign-in, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identity {
    /// Build from a sign-in response body. The server's `is_admin` becomes
    /// `is_admin`; a missing username falls back to the one submitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a JSON object.
    pub fn from_sign_in(body: &Value, username: &str) -> Result<Self, String> {
        if !body.is_object() {
            return Err("sign-in response was not an object".to_owned());
        }
        let mut identity: Self = serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;
        if identity.username.trim().is_empty() {
            username.clone_into(&mut identity.username);
        }
        Ok(identity)
    }
}

// The server's flag may be null, 0/1, or a string; only truthy values grant admin.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(flag) => flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Outcome of checking an admin-only view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    Allowed,
    /// Nobody is signed in.
    SignIn,
    /// Signed in without the admin flag.
    Home,
}

impl Gate {
    /// Where to send the user instead, if anywhere.
    #[must_use]
    pub fn redirect(self) -> Option<&'static str> {
        match self {
            Self::Allowed => None,
            Self::SignIn => Some("/signin"),
            Self::Home => Some("/"),
        }
    }
}

#[must_use]
pub fn gate_admin(identity: Option<&Identity>) -> Gate {
    match identity {
        None => Gate::SignIn,
        Some(user) if !user.is_admin => Gate::Home,
        Some(_) => Gate::Allowed,
    }
}

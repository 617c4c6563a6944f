//! On-disk persistence for the signed-in identity and session cookies.
//!
//! DESIGN
//! ======
//! Both stores live under one state directory and play the role a browser's
//! local storage and cookie jar play for the web portal: the identity under
//! the fixed key `user`, the cookies as a single `Cookie` header line.
//! Each store is a small owned repository with `load`/`save`/`clear`.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::io;
use std::path::{Path, PathBuf};

use super::identity::Identity;

/// Storage key for the identity record.
pub const IDENTITY_KEY: &str = "user";
const COOKIES_FILE: &str = "cookies";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to encode identity: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Debug)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    #[must_use]
    pub fn new(state_dir: &Path) -> Self {
        Self { path: state_dir.join(format!("{IDENTITY_KEY}.json")) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored identity. A missing or unreadable record means
    /// nobody is signed in.
    #[must_use]
    pub fn load(&self) -> Option<Identity> {
        let raw = read_optional(&self.path)?;
        match serde_json::from_str(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt identity record");
                None
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    pub fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(identity)?;
        write_file(&self.path, &raw)
    }

    /// Remove the record entirely. Clearing an absent record succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), StoreError> {
        remove_file(&self.path)
    }
}

#[derive(Clone, Debug)]
pub struct CookieFile {
    path: PathBuf,
}

impl CookieFile {
    #[must_use]
    pub fn new(state_dir: &Path) -> Self {
        Self { path: state_dir.join(COOKIES_FILE) }
    }

    #[must_use]
    pub fn load(&self) -> Option<String> {
        read_optional(&self.path)
            .map(|raw| raw.trim().to_owned())
            .filter(|raw| !raw.is_empty())
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, header: &str) -> Result<(), StoreError> {
        write_file(&self.path, header)
    }

    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), StoreError> {
        remove_file(&self.path)
    }
}

fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "state file unreadable");
            None
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
    }
    std::fs::write(path, contents).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })
}

fn remove_file(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Io { path: path.to_path_buf(), source }),
    }
}

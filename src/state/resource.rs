//! List + create state for one named backend collection.
//!
//! DESIGN
//! ======
//! A `Resource` holds everything a create-and-list view needs: the fetched
//! records, loading/creating flags, one display message slot, and a draft
//! record seeded from a template. Any collection works the same way; only the
//! path and the template differ.
//!
//! Flags change under the state lock right before a request is issued and
//! right after it completes, so a snapshot never shows a half-applied update.
//! The lock is never held across an await.
//!
//! STALE RESPONSES
//! ===============
//! Each fetch captures a generation number. Starting another fetch, changing
//! the path, or tearing the resource down bumps the generation, and any
//! completion carrying an older number is dropped. A create captures the path
//! epoch instead: its record is appended unless the path changed meanwhile or
//! a fetch that finished first already listed a record with the same `id`.
//!
//! While a create is in flight the phase stays `Creating`; a fetch that
//! completes in the meantime updates the list and message but not the phase.

#[cfg(test)]
#[path = "resource_test.rs"]
mod resource_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use crate::messages::{self, CREATED, FailureKind};
use crate::net::{ApiError, Backend};

/// An opaque key/value record.
pub type Record = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Creating,
    Error,
}

/// Consistent copy of a resource's observable state.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceSnapshot {
    pub path: String,
    pub phase: Phase,
    pub items: Vec<Value>,
    pub loading: bool,
    pub creating: bool,
    pub error: Option<String>,
    /// Classification of the failure behind `error`, when it came from the backend.
    pub failure: Option<FailureKind>,
    pub notice: Option<String>,
    pub draft: Record,
}

struct ResourceState {
    path: String,
    phase: Phase,
    items: Vec<Value>,
    loading: bool,
    creating: bool,
    error: Option<String>,
    failure: Option<FailureKind>,
    notice: Option<String>,
    draft: Record,
    generation: u64,
    path_epoch: u64,
    torn_down: bool,
}

#[derive(Clone)]
pub struct Resource {
    backend: Arc<dyn Backend>,
    template: Record,
    required: Vec<String>,
    state: Arc<Mutex<ResourceState>>,
}

impl Resource {
    /// A resource for `path` in the `Idle` phase, draft set to `template`.
    pub fn new(backend: Arc<dyn Backend>, path: impl Into<String>, template: Record) -> Self {
        let state = ResourceState {
            path: path.into(),
            phase: Phase::Idle,
            items: Vec::new(),
            loading: false,
            creating: false,
            error: None,
            failure: None,
            notice: None,
            draft: template.clone(),
            generation: 0,
            path_epoch: 0,
            torn_down: false,
        };
        Self { backend, template, required: Vec::new(), state: Arc::new(Mutex::new(state)) }
    }

    /// Fields that must be present and non-blank before `create` submits.
    #[must_use]
    pub fn with_required(mut self, fields: &[&str]) -> Self {
        self.required = fields.iter().map(|f| (*f).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> ResourceSnapshot {
        let state = self.lock();
        ResourceSnapshot {
            path: state.path.clone(),
            phase: state.phase,
            items: state.items.clone(),
            loading: state.loading,
            creating: state.creating,
            error: state.error.clone(),
            failure: state.failure,
            notice: state.notice.clone(),
            draft: state.draft.clone(),
        }
    }

    #[must_use]
    pub fn items(&self) -> Vec<Value> {
        self.lock().items.clone()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    #[must_use]
    pub fn draft(&self) -> Record {
        self.lock().draft.clone()
    }

    pub fn set_draft(&self, draft: Record) {
        self.lock().draft = draft;
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.lock().draft.insert(name.to_owned(), value);
    }

    pub fn reset_draft(&self) {
        self.lock().draft = self.template.clone();
    }

    /// Replace or dismiss the displayed message.
    pub fn set_error(&self, error: Option<String>) {
        let mut state = self.lock();
        state.error = error;
        state.failure = None;
    }

    /// Fetch the whole collection and replace the held list.
    pub async fn fetch(&self) {
        let (generation, path) = {
            let mut state = self.lock();
            if state.torn_down {
                return;
            }
            state.generation += 1;
            state.loading = true;
            if !state.creating {
                state.phase = Phase::Loading;
            }
            (state.generation, state.path.clone())
        };

        let result = self.backend.get(&path).await.and_then(into_list);

        let mut state = self.lock();
        if state.torn_down || state.generation != generation {
            tracing::debug!(path = %path, generation, "discarding stale list response");
            return;
        }
        state.loading = false;
        match result {
            Ok(items) => {
                tracing::debug!(path = %path, count = items.len(), "collection loaded");
                state.items = items;
                state.error = None;
                state.failure = None;
                state.settle(Phase::Ready);
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "collection fetch failed");
                state.error = Some(messages::list_error_message(&path, &e));
                state.failure = Some(FailureKind::of(&e));
                state.settle(Phase::Error);
            }
        }
    }

    /// Reload the collection on demand.
    pub async fn refetch(&self) {
        self.fetch().await;
    }

    /// Point at another collection and load it. In-flight work for the old
    /// path is discarded when it completes.
    pub async fn set_path(&self, path: impl Into<String>) {
        {
            let mut state = self.lock();
            state.path = path.into();
            state.generation += 1;
            state.path_epoch += 1;
        }
        self.fetch().await;
    }

    /// Stop applying completions; later fetches and creates are ignored.
    pub fn teardown(&self) {
        let mut state = self.lock();
        state.torn_down = true;
        state.generation += 1;
    }

    /// Post the draft to the collection path.
    ///
    /// On success the server's record is appended, the draft resets to the
    /// template, and the created record is returned. On failure the message
    /// slot is set and `None` is returned. Never retries.
    pub async fn create(&self) -> Option<Value> {
        let (epoch, path, draft) = {
            let mut state = self.lock();
            if state.torn_down {
                return None;
            }
            let missing = missing_fields(&self.required, &state.draft);
            if !missing.is_empty() {
                state.error = Some(format!("Missing required field(s): {}", missing.join(", ")));
                state.failure = None;
                state.notice = None;
                return None;
            }
            state.phase = Phase::Creating;
            state.creating = true;
            state.notice = None;
            (state.path_epoch, state.path.clone(), state.draft.clone())
        };

        let result = self.backend.post(&path, &Value::Object(draft)).await;

        let mut state = self.lock();
        if state.torn_down {
            tracing::debug!(path = %path, "discarding create response after teardown");
            return None;
        }
        state.creating = false;
        match result {
            Ok(record) => {
                if state.path_epoch != epoch {
                    tracing::debug!(path = %path, "path changed; not appending created record");
                } else if contains_record(&state.items, &record) {
                    tracing::debug!(path = %path, "newer list already holds created record");
                } else {
                    state.items.push(record.clone());
                }
                state.draft = self.template.clone();
                state.error = None;
                state.failure = None;
                state.notice = Some(CREATED.to_owned());
                state.settle(Phase::Ready);
                Some(record)
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "create failed");
                state.error = Some(messages::create_error_message(&path, &e));
                state.failure = Some(FailureKind::of(&e));
                state.settle(Phase::Error);
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceState {
    // Work still in flight decides the phase before the finished one does.
    fn settle(&mut self, finished: Phase) {
        self.phase = if self.creating {
            Phase::Creating
        } else if self.loading {
            Phase::Loading
        } else {
            finished
        };
    }
}

fn into_list(value: Value) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(ApiError::Decode(format!("expected a JSON array, got {}", kind_of(&other)))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Same `id` when the record carries one, otherwise the same value.
fn contains_record(items: &[Value], record: &Value) -> bool {
    match record.get("id").filter(|id| !id.is_null()) {
        Some(id) => items.iter().any(|item| item.get("id") == Some(id)),
        None => items.contains(record),
    }
}

fn missing_fields<'a>(required: &'a [String], draft: &Record) -> Vec<&'a str> {
    required
        .iter()
        .filter(|field| is_blank(draft.get(field.as_str())))
        .map(String::as_str)
        .collect()
}

/// Absent, null, or a whitespace-only string.
pub(crate) fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

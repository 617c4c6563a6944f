//! Scripted [`Backend`] for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use reqwest::Method;
use serde_json::Value;
use tokio::sync::oneshot;

use super::{ApiError, Backend, ErrorBody};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

enum Scripted {
    Ready(Result<Value, ApiError>),
    Deferred(oneshot::Receiver<Result<Value, ApiError>>),
}

/// Answers requests from per-route queues and records every call.
/// Unscripted routes answer 404.
#[derive(Default)]
pub(crate) struct MockBackend {
    scripts: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, response: Result<Value, ApiError>) -> &Self {
        self.push(method, path, Scripted::Ready(response));
        self
    }

    /// Queue a response the test releases later through the returned sender.
    pub fn defer(&self, method: Method, path: &str) -> oneshot::Sender<Result<Value, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.push(method, path, Scripted::Deferred(rx));
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("mock mutex should lock").clone()
    }

    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == *method && call.path == path)
            .count()
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.scripts
            .lock()
            .expect("mock mutex should lock")
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(scripted);
    }
}

pub(crate) fn status(status: u16, body: ErrorBody) -> ApiError {
    ApiError::Status { status, body }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        self.calls.lock().expect("mock mutex should lock").push(Call {
            method: method.clone(),
            path: path.to_owned(),
            body: body.cloned(),
        });
        let next = self
            .scripts
            .lock()
            .expect("mock mutex should lock")
            .get_mut(&(method, path.to_owned()))
            .and_then(VecDeque::pop_front);
        match next {
            Some(Scripted::Ready(response)) => response,
            Some(Scripted::Deferred(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Transport("deferred response dropped".to_owned()))),
            None => Err(status(404, ErrorBody::Empty)),
        }
    }
}

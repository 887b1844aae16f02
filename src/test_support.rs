//! In-memory collaborators for tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use http::StatusCode;
use snafu::Snafu;
use url::Url;

use crate::{
    html::FormPayload,
    http::{HttpSession, PageSnapshot},
    observe::{FlowEvent, FlowObserver},
};

#[derive(Debug, Snafu)]
#[snafu(display("scripted session has no response left"))]
pub(crate) struct ScriptExhausted;

impl crate::Error for ScriptExhausted {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// A request received by [`ScriptedSession`], with secrets exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recorded {
    Get { url: Url, query: Vec<(String, String)> },
    Post { url: Url, body: String },
}

/// A session that answers requests with canned snapshots, in order.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSession {
    responses: Mutex<VecDeque<PageSnapshot>>,
    requests: Mutex<Vec<Recorded>>,
}

impl ScriptedSession {
    pub(crate) fn new(responses: impl IntoIterator<Item = PageSnapshot>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn posts(&self) -> Vec<(Url, String)> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Post { url, body } => Some((url, body)),
                Recorded::Get { .. } => None,
            })
            .collect()
    }

    fn next(&self, recorded: Recorded) -> Result<PageSnapshot, ScriptExhausted> {
        self.requests.lock().unwrap().push(recorded);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ScriptExhausted)
    }
}

impl HttpSession for ScriptedSession {
    type Error = ScriptExhausted;

    async fn get(&self, url: &Url, query: &[(&str, &str)]) -> Result<PageSnapshot, Self::Error> {
        self.next(Recorded::Get {
            url: url.clone(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        })
    }

    async fn post(&self, url: &Url, form: &FormPayload) -> Result<PageSnapshot, Self::Error> {
        self.next(Recorded::Post {
            url: url.clone(),
            body: form.to_urlencoded().unwrap(),
        })
    }
}

/// A 200 page served at `url`.
pub(crate) fn html_page(url: &str, body: &str) -> PageSnapshot {
    PageSnapshot::new(StatusCode::OK, Url::parse(url).unwrap(), body.to_owned())
}

/// An observer that keeps the `Debug` form of every event.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingObserver {
    pub(crate) events: Arc<Mutex<Vec<String>>>,
}

impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl FlowObserver for RecordingObserver {
    fn record(&self, event: &FlowEvent<'_>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

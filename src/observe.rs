//! Observability port for the login flow.
//!
//! The flow reports what it does through a [`FlowObserver`] handed to it at
//! construction. Events never contain unmasked secrets, and URLs in events
//! have their fragment removed. Observers cannot influence the outcome.

use http::StatusCode;
use url::Url;

use crate::login::{FlowState, Submission};

/// One step of the login flow worth recording.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum FlowEvent<'a> {
    /// A login attempt began.
    Started {
        /// The account login.
        login: &'a str,
        /// The application id.
        client_id: u64,
        /// The comma-joined scope, if any.
        scope: Option<&'a str>,
    },
    /// A page was received.
    PageLoaded {
        /// The state the page puts the flow in.
        state: FlowState,
        /// The response status.
        status: StatusCode,
        /// The final URL, without fragment.
        url: &'a Url,
    },
    /// A form is about to be submitted.
    FormSubmitting {
        /// The state of the page holding the form.
        state: FlowState,
        /// Which form is submitted.
        submission: Submission,
        /// Where the form is posted.
        action: &'a Url,
        /// The submitted fields, secrets masked.
        fields: &'a [(String, String)],
    },
    /// The provider refused the submitted credentials or code.
    Rejected {
        /// The state in which the refusal was seen.
        state: FlowState,
        /// The provider's message.
        message: &'a str,
    },
    /// An integer field of the landing fragment was present but unparsable.
    FieldDefaulted {
        /// The fragment key.
        field: &'a str,
        /// The raw value.
        value: &'a str,
    },
    /// A token was issued.
    Completed {
        /// The account id.
        user_id: u64,
        /// Token lifetime in seconds.
        expires_in: u64,
    },
}

/// Receives [`FlowEvent`]s.
pub trait FlowObserver: Send + Sync {
    /// Records one event.
    fn record(&self, event: &FlowEvent<'_>);
}

impl<T: FlowObserver + ?Sized> FlowObserver for &T {
    fn record(&self, event: &FlowEvent<'_>) {
        (**self).record(event);
    }
}

impl<T: FlowObserver + ?Sized> FlowObserver for std::sync::Arc<T> {
    fn record(&self, event: &FlowEvent<'_>) {
        (**self).record(event);
    }
}

/// An observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObserver;

impl FlowObserver for NoObserver {
    fn record(&self, _event: &FlowEvent<'_>) {}
}

/// An observer that emits every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FlowObserver for TracingObserver {
    fn record(&self, event: &FlowEvent<'_>) {
        match *event {
            FlowEvent::Started {
                login,
                client_id,
                scope,
            } => tracing::info!(login, client_id, scope, "Authenticating"),
            FlowEvent::PageLoaded { state, status, url } => {
                tracing::debug!(%state, %status, %url, "Page loaded");
            }
            FlowEvent::FormSubmitting {
                state,
                submission,
                action,
                fields,
            } => tracing::debug!(%state, ?submission, %action, ?fields, "Submitting form"),
            FlowEvent::Rejected { state, message } => {
                tracing::warn!(%state, warning = message, "Provider rejected submission");
            }
            FlowEvent::FieldDefaulted { field, value } => {
                tracing::warn!(field, value, "Fragment field is not an integer, using 0");
            }
            FlowEvent::Completed {
                user_id,
                expires_in,
            } => tracing::info!(user_id, expires_in, "Authenticated"),
        }
    }
}

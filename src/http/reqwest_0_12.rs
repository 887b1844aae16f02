use std::time::Duration;

use bon::bon;
use http::{HeaderValue, header::CONTENT_TYPE};
use snafu::{ResultExt as _, Snafu};
use url::Url;

use super::{HttpSession, PageSnapshot};
use crate::html::FormPayload;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_REDIRECTS: usize = 10;
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Linux; Android 10) AppleWebKit/537.36 (KHTML, like Gecko) Mobile Safari/537.36";

/// An [`HttpSession`] backed by a `reqwest::Client` with its own cookie jar.
///
/// Every instance owns a fresh cookie store, so one instance corresponds to
/// one login attempt. Cloning shares the cookie store.
#[derive(Debug, Clone)]
pub struct ReqwestSession {
    client: reqwest::Client,
}

#[bon]
impl ReqwestSession {
    /// Builds a new session.
    ///
    /// `timeout` applies to each exchange, redirects included; `max_redirects`
    /// bounds the redirects followed within one exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed (for
    /// example, when the TLS backend fails to initialise).
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_TIMEOUT)]
        timeout: Duration,
        #[builder(default = DEFAULT_MAX_REDIRECTS)]
        max_redirects: usize,
        #[builder(into, default = DEFAULT_USER_AGENT.to_owned())]
        user_agent: String,
    ) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context(BuildSnafu)?;

        Ok(Self { client })
    }

    async fn snapshot(
        response: Result<reqwest::Response, reqwest::Error>,
        url: &Url,
    ) -> Result<PageSnapshot, SessionError> {
        let response = response
            .map_err(reqwest::Error::without_url)
            .context(RequestSnafu {
                endpoint: redact(url),
            })?;
        let status = response.status();
        let final_url = response.url().clone();
        // Decodes using the declared charset, defaulting to UTF-8.
        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context(BodySnafu)?;

        Ok(PageSnapshot::new(status, final_url, body))
    }
}

impl HttpSession for ReqwestSession {
    type Error = SessionError;

    async fn get(&self, url: &Url, query: &[(&str, &str)]) -> Result<PageSnapshot, Self::Error> {
        let mut target = url.clone();
        if !query.is_empty() {
            target.query_pairs_mut().extend_pairs(query);
        }

        let response = self.client.get(target).send().await;
        Self::snapshot(response, url).await
    }

    async fn post(&self, url: &Url, form: &FormPayload) -> Result<PageSnapshot, Self::Error> {
        let body = form.to_urlencoded().context(EncodeFormSnafu)?;

        let response = self
            .client
            .post(url.clone())
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(body)
            .send()
            .await;
        Self::snapshot(response, url).await
    }
}

/// Strips the query and fragment, which may carry tokens.
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.into()
}

/// Errors produced by [`ReqwestSession`].
///
/// None of the variants carry URL query strings or fragments.
#[derive(Debug, Snafu)]
pub enum SessionError {
    /// The HTTP client could not be constructed.
    #[snafu(display("Failed to build HTTP client"))]
    Build {
        /// The underlying error.
        source: reqwest::Error,
    },
    /// The form payload could not be encoded.
    #[snafu(display("Failed to encode form body"))]
    EncodeForm {
        /// The underlying error.
        source: serde_html_form::ser::Error,
    },
    /// The request failed before a response was received.
    #[snafu(display("HTTP request to {endpoint} failed"))]
    Request {
        /// The requested endpoint, without query or fragment.
        endpoint: String,
        /// The underlying error.
        source: reqwest::Error,
    },
    /// The response body could not be read.
    #[snafu(display("Failed to read response body"))]
    Body {
        /// The underlying error.
        source: reqwest::Error,
    },
}

impl crate::Error for SessionError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Build { .. } | Self::EncodeForm { .. } => false,
            Self::Request { source, .. } | Self::Body { source } => {
                source.is_timeout() || source.is_connect()
            }
        }
    }
}

//! HTTP session and page snapshot abstractions.
//!
//! This module defines the [`HttpSession`] trait that decouples the login flow
//! and the API caller from any specific HTTP implementation. A session must
//! keep cookies between calls and follow redirects, reporting the final URL
//! (fragment included) it landed on.

#[cfg(feature = "session-reqwest-0_12")]
mod reqwest_0_12;

use bytes::Bytes;
use http::StatusCode;
use scraper::Html;
use snafu::ResultExt as _;
use url::Url;

use crate::html::{FormPayload, NotUtf8Snafu, PageError};

#[cfg(feature = "session-reqwest-0_12")]
pub use reqwest_0_12::{ReqwestSession, SessionError};

/// A cookie-preserving HTTP session.
pub trait HttpSession: Send + Sync {
    /// The error type returned by the session for a failed exchange.
    type Error: crate::Error;

    /// Issues a GET request with the given query parameters appended to `url`.
    ///
    /// Redirects are followed; the returned snapshot describes the final response.
    fn get(
        &self,
        url: &Url,
        query: &[(&str, &str)],
    ) -> impl Future<Output = Result<PageSnapshot, Self::Error>> + Send;

    /// Issues a form-encoded POST request.
    ///
    /// Redirects are followed; the returned snapshot describes the final response.
    fn post(
        &self,
        url: &Url,
        form: &FormPayload,
    ) -> impl Future<Output = Result<PageSnapshot, Self::Error>> + Send;
}

impl<T: HttpSession + ?Sized> HttpSession for &T {
    type Error = T::Error;

    fn get(
        &self,
        url: &Url,
        query: &[(&str, &str)],
    ) -> impl Future<Output = Result<PageSnapshot, Self::Error>> + Send {
        (**self).get(url, query)
    }

    fn post(
        &self,
        url: &Url,
        form: &FormPayload,
    ) -> impl Future<Output = Result<PageSnapshot, Self::Error>> + Send {
        (**self).post(url, form)
    }
}

/// A fully buffered HTTP response together with the URL it was served from.
///
/// The body is kept as [`Bytes`], so the page can be parsed as many times as
/// needed. Sessions are expected to store it as UTF-8, transcoding from the
/// charset the server declared.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    status: StatusCode,
    url: Url,
    body: Bytes,
}

impl PageSnapshot {
    /// Creates a snapshot from its parts.
    #[must_use]
    pub fn new(status: StatusCode, url: Url, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            url,
            body: body.into(),
        }
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns `true` for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The final resolved URL, including any fragment.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The path component of the final URL.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// The fragment of the final URL, if any.
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment()
    }

    /// The buffered body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<&str, PageError> {
        std::str::from_utf8(&self.body).context(NotUtf8Snafu)
    }

    /// Parses a fresh HTML document from the buffered body.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected, the way a
    /// browser renders a page with a wrong or missing charset.
    #[must_use]
    pub fn document(&self) -> Html {
        Html::parse_document(&String::from_utf8_lossy(&self.body))
    }

    /// The final URL with its fragment removed, safe to put in diagnostics.
    #[must_use]
    pub fn redacted_url(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }
}

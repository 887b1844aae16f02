//! Calls VK API methods over an [`HttpSession`].
//!
//! Every call is a GET to `<base>/<method>` with the caller's parameters, the
//! API version and, when set, the access token appended to the query string.

mod error;

use bon::Builder;
use secrecy::ExposeSecret as _;
use serde::de::DeserializeOwned;
use serde_json::Value;
use snafu::{ResultExt as _, ensure};

use crate::{
    EndpointUrl,
    http::{HttpSession, PageSnapshot},
    token::{AccessToken, TokenBundle},
};

pub use error::{ApiError, MethodError, RequestParam};
use error::{DecodeSnafu, InvalidMethodSnafu, MethodSnafu, RequestSnafu};

/// The API version sent when none is configured.
pub const DEFAULT_VERSION: &str = "5.131";

const VK_API_BASE: &str = "https://api.vk.com/method/";

const VERSION_PARAM: &str = "v";
const ACCESS_TOKEN_PARAM: &str = "access_token";

fn default_base_url() -> EndpointUrl {
    EndpointUrl::from_static(VK_API_BASE)
}

/// A VK API caller.
///
/// ```rust,ignore
/// let api = Api::builder()
///     .session(ReqwestSession::builder().build()?)
///     .access_token(token)
///     .build();
/// let users: serde_json::Value = api.call("users.get", &[("user_ids", "1")]).await?;
/// ```
#[derive(Debug, Clone, Builder)]
pub struct Api<S: HttpSession> {
    /// The session requests are sent through.
    session: S,
    /// The API version, sent as `v`.
    #[builder(into, default = String::from(DEFAULT_VERSION))]
    version: String,
    /// The token sent with every call; anonymous calls are made without one.
    #[builder(into)]
    access_token: Option<AccessToken>,
    /// The URL method names are appended to.
    #[builder(default = default_base_url())]
    base_url: EndpointUrl,
}

impl<S: HttpSession> Api<S> {
    /// An API caller using the token of a completed login.
    pub fn from_bundle(session: S, bundle: &TokenBundle) -> Self {
        Self::builder()
            .session(session)
            .access_token(bundle.access_token.clone())
            .build()
    }

    /// The API version sent with every call.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Calls `method` and returns the response as received.
    ///
    /// Parameters named `v` or `access_token` are replaced by the configured
    /// values.
    ///
    /// # Errors
    ///
    /// Returns an error if the method name is invalid or the exchange fails.
    pub async fn raw_request(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<PageSnapshot, ApiError<S::Error>> {
        ensure!(is_method_name(method), InvalidMethodSnafu { method });

        let mut url = self.base_url.as_url().clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(method);
        }

        let mut query = params
            .iter()
            .copied()
            .filter(|(key, _)| *key != VERSION_PARAM && *key != ACCESS_TOKEN_PARAM)
            .collect::<Vec<_>>();
        query.push((VERSION_PARAM, self.version.as_str()));
        if let Some(token) = &self.access_token {
            query.push((ACCESS_TOKEN_PARAM, token.expose_secret()));
        }

        let names = params.iter().map(|(key, _)| *key).collect::<Vec<_>>();
        tracing::debug!(method, version = %self.version, params = ?names, "Calling API method");

        let page = self
            .session
            .get(&url, &query)
            .await
            .context(RequestSnafu { method })?;

        tracing::debug!(method, status = %page.status(), "API method answered");
        Ok(page)
    }

    /// Calls `method` and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Method`] if the body carries an `error` object, and
    /// an error if the call fails or the body is not JSON.
    pub async fn value_request(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ApiError<S::Error>> {
        let page = self.raw_request(method, params).await?;
        decode_value(method, &page)
    }

    /// Calls `method` and decodes the whole body into `T`.
    ///
    /// # Errors
    ///
    /// See [`Api::value_request`]; additionally fails if the body does not
    /// match `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError<S::Error>> {
        let value = self.value_request(method, params).await?;
        serde_json::from_value(value).context(DecodeSnafu { method })
    }

    /// Calls `method` and decodes its `response` member into `T`.
    ///
    /// A body without a `response` member decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// See [`Api::request`].
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError<S::Error>> {
        let mut value = self.value_request(method, params).await?;
        let response = value
            .get_mut("response")
            .map(Value::take)
            .unwrap_or_default();
        serde_json::from_value(response).context(DecodeSnafu { method })
    }
}

fn is_method_name(method: &str) -> bool {
    !method.is_empty()
        && method
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

fn decode_value<E: crate::Error>(method: &str, page: &PageSnapshot) -> Result<Value, ApiError<E>> {
    let mut value = serde_json::from_slice::<Value>(page.body()).context(DecodeSnafu { method })?;

    if let Some(error) = value.get_mut("error").map(Value::take) {
        let error = serde_json::from_value::<MethodError>(error).context(DecodeSnafu { method })?;
        tracing::debug!(method, code = error.error_code, "API method returned an error");
        return MethodSnafu { method, error }.fail();
    }

    Ok(value)
}

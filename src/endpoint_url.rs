//! A validated endpoint URL.
//!
//! [`EndpointUrl`] is a newtype over [`Url`] that guarantees the URL is an
//! absolute `http` or `https` URL. It can be constructed from common string
//! and URL types via [`IntoEndpointUrl`].

use std::convert::Infallible;

use snafu::{ResultExt as _, Snafu, ensure};
use url::Url;

/// A validated `http`/`https` endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUrl(Url);

impl EndpointUrl {
    /// Returns the inner [`Url`].
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Consumes the [`EndpointUrl`] and returns the inner [`Url`].
    #[must_use]
    pub fn into_url(self) -> Url {
        self.0
    }

    /// Returns the path component of the URL.
    #[must_use]
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// Parses a URL known to be valid at compile time.
    ///
    /// Only used for the built-in provider constants.
    pub(crate) fn from_static(url: &'static str) -> Self {
        url.into_endpoint_url()
            .expect("built-in endpoint constants are valid http(s) URLs")
    }
}

impl std::fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<Url> for EndpointUrl {
    fn as_ref(&self) -> &Url {
        &self.0
    }
}

/// Errors produced when converting a value into an [`EndpointUrl`].
#[derive(Debug, Snafu)]
pub enum EndpointUrlError {
    /// The value is not a valid absolute URL.
    #[snafu(display("Invalid endpoint URL"))]
    Parse {
        /// The underlying parse error.
        source: url::ParseError,
    },
    /// The URL uses a scheme other than `http` or `https`.
    #[snafu(display("Unsupported endpoint URL scheme '{scheme}'"))]
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },
}

impl crate::Error for EndpointUrlError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Conversion trait for types that can be turned into an [`EndpointUrl`].
pub trait IntoEndpointUrl {
    /// The error type returned if the conversion fails.
    type Error;

    /// Attempts to convert this value into an [`EndpointUrl`].
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an absolute `http`/`https` URL.
    fn into_endpoint_url(self) -> Result<EndpointUrl, Self::Error>;
}

impl IntoEndpointUrl for EndpointUrl {
    type Error = Infallible;

    fn into_endpoint_url(self) -> Result<EndpointUrl, Self::Error> {
        Ok(self)
    }
}

impl IntoEndpointUrl for Url {
    type Error = EndpointUrlError;

    fn into_endpoint_url(self) -> Result<EndpointUrl, Self::Error> {
        ensure!(
            matches!(self.scheme(), "http" | "https"),
            UnsupportedSchemeSnafu {
                scheme: self.scheme()
            }
        );
        Ok(EndpointUrl(self))
    }
}

impl IntoEndpointUrl for &str {
    type Error = EndpointUrlError;

    fn into_endpoint_url(self) -> Result<EndpointUrl, Self::Error> {
        Url::parse(self).context(ParseSnafu)?.into_endpoint_url()
    }
}

impl IntoEndpointUrl for String {
    type Error = EndpointUrlError;

    fn into_endpoint_url(self) -> Result<EndpointUrl, Self::Error> {
        self.as_str().into_endpoint_url()
    }
}

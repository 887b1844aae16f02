use std::fmt;

use serde::Deserialize;
use snafu::Snafu;

// VK error codes for transient conditions.
const TOO_MANY_REQUESTS: i64 = 6;
const FLOOD_CONTROL: i64 = 9;
const INTERNAL_ERROR: i64 = 10;

/// Errors that can occur when calling an API method.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum ApiError<SessionErr: crate::Error + 'static> {
    /// The method name is empty or contains characters VK method names never use.
    #[snafu(display("Invalid API method name '{method}'"))]
    InvalidMethod {
        /// The rejected name.
        method: String,
    },
    /// The HTTP exchange failed.
    #[snafu(display("Failed to call API method {method}"))]
    Request {
        /// The method being called.
        method: String,
        /// The underlying session error.
        source: SessionErr,
    },
    /// The response body could not be decoded into the requested shape.
    #[snafu(display("Failed to decode response of API method {method}"))]
    Decode {
        /// The method being called.
        method: String,
        /// The underlying error.
        source: serde_json::Error,
    },
    /// The API answered with an `error` object.
    #[snafu(display("API method {method} failed: {error}"))]
    Method {
        /// The method being called.
        method: String,
        /// The error object returned by VK.
        error: MethodError,
    },
}

impl<SessionErr: crate::Error + 'static> ApiError<SessionErr> {
    /// The error object returned by VK, if the call reached the API.
    #[must_use]
    pub fn method_error(&self) -> Option<&MethodError> {
        match self {
            Self::Method { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl<SessionErr: crate::Error + 'static> crate::Error for ApiError<SessionErr> {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Request { source, .. } => source.is_retryable(),
            Self::Method { error, .. } => matches!(
                error.error_code,
                TOO_MANY_REQUESTS | FLOOD_CONTROL | INTERNAL_ERROR
            ),
            Self::InvalidMethod { .. } | Self::Decode { .. } => false,
        }
    }
}

/// The `error` object of a failed API call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodError {
    /// VK's numeric error code.
    pub error_code: i64,
    /// VK's description of the error.
    pub error_msg: String,
    /// The parameters VK received, as it echoes them back.
    #[serde(default)]
    pub request_params: Vec<RequestParam>,
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.error_msg, self.error_code)
    }
}

/// One request parameter echoed back in a [`MethodError`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestParam {
    /// The parameter name.
    pub key: String,
    /// The parameter value.
    pub value: String,
}

use http::StatusCode;
use snafu::Snafu;

use crate::{html::PageError, login::FlowState};

use super::fragment::FragmentError;

/// Errors that end a login flow.
///
/// No variant carries the password, the second-factor code, or the access
/// token.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum LoginError<SessionErr: crate::Error + 'static> {
    /// The application id is zero.
    #[snafu(display("Client id must be a positive integer"))]
    InvalidClientId,
    /// An HTTP exchange failed.
    #[snafu(display("HTTP exchange failed at {state}"))]
    Transport {
        /// The state whose exchange failed.
        state: FlowState,
        /// The underlying session error.
        source: SessionErr,
    },
    /// The initial authorize page did not return a success status.
    #[snafu(display("Initial login page response status is not OK: {status}"))]
    InitialPageStatus {
        /// The received status.
        status: StatusCode,
    },
    /// A page could not be interpreted.
    #[snafu(display("Failed to interpret page at {state}"))]
    PageParse {
        /// The state whose page failed to parse.
        state: FlowState,
        /// The underlying error.
        source: PageError,
    },
    /// The landing URL fragment could not be turned into a token.
    #[snafu(display("Failed to read token from landing URL {url}"))]
    Fragment {
        /// The landing URL without its fragment.
        url: String,
        /// The underlying error.
        source: FragmentError,
    },
    /// The provider displayed a warning after the login form was submitted.
    #[snafu(display("Authentication failure (probably invalid login or password): {message}"))]
    CredentialsRejected {
        /// The provider's warning text.
        message: String,
    },
    /// The account requires a second factor but no code was given.
    #[snafu(display("Two-factor auth is enabled on account {login} but no code was given"))]
    TwoFactorRequired {
        /// The account login.
        login: String,
    },
    /// The provider displayed a warning after the code was submitted.
    #[snafu(display("Two-factor authentication failure: {message}"))]
    TwoFactorRejected {
        /// The provider's warning text.
        message: String,
    },
    /// The provider redirected to the landing page with an error instead of a token.
    #[snafu(display("Provider denied access: {error}"))]
    ProviderDenied {
        /// The `error` value of the fragment.
        error: String,
        /// The `error_description` value of the fragment.
        description: Option<String>,
    },
    /// The flow reached a page it does not know how to handle.
    #[snafu(display("Unexpected page at {state}: {url}"))]
    UnexpectedPage {
        /// The state the page was reached in.
        state: FlowState,
        /// The page URL without its fragment.
        url: String,
    },
}

/// The class of a [`LoginError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginErrorKind {
    /// The request was rejected before any exchange.
    InvalidRequest,
    /// Network failure, timeout, or a failed initial page.
    Transport,
    /// A page or the landing fragment could not be parsed.
    PageParse,
    /// The login or password was rejected.
    CredentialsRejected,
    /// A second-factor code is needed.
    TwoFactorRequired,
    /// The second-factor code was rejected.
    TwoFactorRejected,
    /// The provider refused to issue a token.
    ProviderDenied,
    /// The ceremony took a shape the flow does not know.
    UnexpectedFlowState,
}

impl<SessionErr: crate::Error + 'static> LoginError<SessionErr> {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> LoginErrorKind {
        match self {
            Self::InvalidClientId => LoginErrorKind::InvalidRequest,
            Self::Transport { .. } | Self::InitialPageStatus { .. } => LoginErrorKind::Transport,
            Self::PageParse { .. } | Self::Fragment { .. } => LoginErrorKind::PageParse,
            Self::CredentialsRejected { .. } => LoginErrorKind::CredentialsRejected,
            Self::TwoFactorRequired { .. } => LoginErrorKind::TwoFactorRequired,
            Self::TwoFactorRejected { .. } => LoginErrorKind::TwoFactorRejected,
            Self::ProviderDenied { .. } => LoginErrorKind::ProviderDenied,
            Self::UnexpectedPage { .. } => LoginErrorKind::UnexpectedFlowState,
        }
    }
}

impl<SessionErr: crate::Error + 'static> crate::Error for LoginError<SessionErr> {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_retryable(),
            Self::InitialPageStatus { status } => status.is_server_error(),
            Self::InvalidClientId
            | Self::PageParse { .. }
            | Self::Fragment { .. }
            | Self::CredentialsRejected { .. }
            | Self::TwoFactorRequired { .. }
            | Self::TwoFactorRejected { .. }
            | Self::ProviderDenied { .. }
            | Self::UnexpectedPage { .. } => false,
        }
    }
}

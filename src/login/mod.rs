//! Implements the provider's browser-oriented implicit-grant login.
//!
//! VK offers no machine-to-machine token endpoint, so the flow behaves like a
//! browser: it loads the authorize page, fills in the login form, answers the
//! second-factor and consent pages when they appear, and reads the token from
//! the fragment of the final redirect.
//!
//! The position in the ceremony is an explicit [`FlowState`]; the next step is
//! decided from that state and the path of the page the provider served.

mod error;
mod flow;
mod fragment;
mod state;
mod types;

pub use error::{LoginError, LoginErrorKind};
pub use flow::LoginFlow;
pub use fragment::FragmentError;
pub use state::{FlowState, Submission};
pub use types::{Credentials, CredentialsEnvError, LoginRequest, Provider};

#[cfg(feature = "session-reqwest-0_12")]
use crate::{
    http::{ReqwestSession, SessionError},
    token::TokenBundle,
};

/// Logs into VK with a fresh [`ReqwestSession`] and default settings.
///
/// Pass an empty `auth_code` when the account has no second factor enrolled.
///
/// # Errors
///
/// See [`LoginFlow::authenticate`]. A failure to build the HTTP client is
/// reported as a transport error in the initial state.
#[cfg(feature = "session-reqwest-0_12")]
pub async fn authenticate(
    login: &str,
    password: &str,
    client_id: u64,
    scope: impl IntoIterator<Item = impl Into<String>>,
    auth_code: &str,
) -> Result<TokenBundle, LoginError<SessionError>> {
    use snafu::ResultExt as _;

    let session = ReqwestSession::builder()
        .build()
        .context(error::TransportSnafu {
            state: FlowState::InitialPage,
        })?;
    let credentials = Credentials::builder()
        .login(login)
        .password(password)
        .two_factor_code(auth_code)
        .build();

    LoginFlow::new(Provider::vk())
        .authenticate(session, &credentials, &LoginRequest::new(client_id, scope))
        .await
}

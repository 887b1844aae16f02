use std::{ffi::OsString, fmt};

use bon::Builder;
use secrecy::{ExposeSecret as _, SecretString};
use snafu::{ResultExt as _, Snafu};
use url::Url;

use crate::{EndpointUrl, html::mask_secret};

const VK_AUTHORIZE_ENDPOINT: &str = "https://oauth.vk.com/authorize";
const VK_REDIRECT_URI: &str = "https://oauth.vk.com/blank.html";

fn default_authorize_endpoint() -> EndpointUrl {
    EndpointUrl::from_static(VK_AUTHORIZE_ENDPOINT)
}

fn default_redirect_uri() -> EndpointUrl {
    EndpointUrl::from_static(VK_REDIRECT_URI)
}

/// Describes the shape of the provider's login pages.
///
/// The defaults match VK's mobile login pages; [`Provider::vk`] is the same
/// as `Provider::builder().build()`.
#[derive(Debug, Clone, Builder)]
pub struct Provider {
    /// The authorize endpoint the flow starts at.
    #[builder(default = default_authorize_endpoint())]
    pub(crate) authorize_endpoint: EndpointUrl,
    /// Path the provider redirects to when a second factor is required.
    #[builder(into, default = String::from("/login"))]
    pub(crate) two_factor_path: String,
    /// Path of the page asking the user to grant the requested permissions.
    #[builder(into, default = String::from("/authorize"))]
    pub(crate) consent_path: String,
    /// Name of the login form's identifier input.
    #[builder(into, default = String::from("email"))]
    pub(crate) login_field: String,
    /// Name of the login form's password input.
    #[builder(into, default = String::from("pass"))]
    pub(crate) password_field: String,
    /// Name of the second-factor form's code input.
    #[builder(into, default = String::from("code"))]
    pub(crate) code_field: String,
    /// CSS selector of the element marking a failed submission.
    #[builder(into, default = String::from(".service_msg_warning"))]
    pub(crate) warning_selector: String,
}

impl Provider {
    /// The VK provider.
    #[must_use]
    pub fn vk() -> Self {
        Self::builder().build()
    }

    /// The authorize endpoint.
    #[must_use]
    pub fn authorize_endpoint(&self) -> &EndpointUrl {
        &self.authorize_endpoint
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::vk()
    }
}

/// The application parameters of one login attempt.
#[derive(Debug, Clone, Builder)]
pub struct LoginRequest {
    /// The id of the calling application; must be positive.
    pub(crate) client_id: u64,
    /// Comma-joined permission names, in request order.
    #[builder(required, default, name = "scopes", with = |scopes: impl IntoIterator<Item = impl Into<String>>| join_scopes(scopes))]
    pub(crate) scope: Option<String>,
    /// Where the provider sends the browser once the token is issued.
    #[builder(default = default_redirect_uri())]
    pub(crate) redirect_uri: EndpointUrl,
    /// The provider's page layout.
    #[builder(into, default = String::from("mobile"))]
    pub(crate) display: String,
}

impl LoginRequest {
    /// A request for `client_id` with the given scopes and default settings.
    pub fn new(client_id: u64, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::builder().client_id(client_id).scopes(scopes).build()
    }

    /// The application id.
    #[must_use]
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// The comma-joined scope, if any scopes were requested.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// The redirect target.
    #[must_use]
    pub fn redirect_uri(&self) -> &EndpointUrl {
        &self.redirect_uri
    }

    /// Query parameters of the initial authorize request.
    #[must_use]
    pub fn authorize_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("display", self.display.clone()),
            ("redirect_uri", self.redirect_uri.to_string()),
            ("response_type", "token".to_owned()),
            ("client_id", self.client_id.to_string()),
            ("scope", self.scope.clone().unwrap_or_default()),
        ]
    }

    /// The full authorize URL, e.g. for opening in a real browser.
    #[must_use]
    pub fn authorize_url(&self, provider: &Provider) -> Url {
        let mut url = provider.authorize_endpoint.as_url().clone();
        url.query_pairs_mut().extend_pairs(self.authorize_params());
        url
    }
}

/// Joins scope names with `,`, dropping blanks and repeats.
fn join_scopes(scopes: impl IntoIterator<Item = impl Into<String>>) -> Option<String> {
    let mut joined: Vec<String> = Vec::new();
    for scope in scopes {
        let scope = scope.into().trim().to_owned();
        if !scope.is_empty() && !joined.contains(&scope) {
            joined.push(scope);
        }
    }

    (!joined.is_empty()).then(|| joined.join(","))
}

/// The account credentials used for one login attempt.
#[derive(Clone, Builder)]
pub struct Credentials {
    /// Phone number or e-mail.
    #[builder(into)]
    pub(crate) login: String,
    /// The account password.
    #[builder(into)]
    pub(crate) password: SecretString,
    /// The current one-time code, for accounts with a second factor.
    #[builder(into)]
    pub(crate) two_factor_code: Option<SecretString>,
}

impl Credentials {
    /// Credentials without a second-factor code.
    pub fn new(login: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self::builder().login(login).password(password).build()
    }

    /// Reads credentials from environment variables.
    ///
    /// `code_var` names an optional variable holding the second-factor code;
    /// an unset or empty variable means no code.
    ///
    /// # Errors
    ///
    /// Returns an error if the login or password variable is missing or not
    /// valid unicode.
    pub fn from_env(
        login_var: impl Into<OsString>,
        password_var: impl Into<OsString>,
        code_var: Option<impl Into<OsString>>,
    ) -> Result<Self, CredentialsEnvError> {
        let login = read_var(login_var.into())?;
        let password = read_var(password_var.into())?;
        let code = code_var.and_then(|var| std::env::var(var.into()).ok());

        Ok(Self::builder()
            .login(login)
            .password(password)
            .maybe_two_factor_code(code)
            .build())
    }

    /// The account login.
    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    /// The second-factor code, treating an empty code as absent.
    pub(crate) fn two_factor_code(&self) -> Option<&SecretString> {
        self.two_factor_code
            .as_ref()
            .filter(|code| !code.expose_secret().trim().is_empty())
    }
}

fn read_var(var_name: OsString) -> Result<String, CredentialsEnvError> {
    std::env::var(&var_name).context(EnvAccessSnafu { var_name })
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &mask_secret(self.password.expose_secret()))
            .field(
                "two_factor_code",
                &self
                    .two_factor_code
                    .as_ref()
                    .map(|code| mask_secret(code.expose_secret())),
            )
            .finish()
    }
}

/// Errors that can occur when reading [`Credentials`] from the environment.
#[derive(Debug, Snafu)]
pub enum CredentialsEnvError {
    /// The environment variable was not found or was not valid unicode.
    #[snafu(display("Failed to read env variable '{}'", var_name.to_string_lossy()))]
    EnvAccess {
        /// The name of the environment variable that could not be accessed.
        var_name: OsString,
        /// The underlying error from the environment variable lookup.
        source: std::env::VarError,
    },
}

impl crate::Error for CredentialsEnvError {
    fn is_retryable(&self) -> bool {
        false
    }
}

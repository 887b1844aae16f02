use snafu::{OptionExt as _, ResultExt as _, ensure};

use crate::{
    html::{self, FormPayload, HtmlForm},
    http::{HttpSession, PageSnapshot},
    login::{
        Credentials, LoginRequest, Provider,
        error::{
            CredentialsRejectedSnafu, FragmentSnafu, InitialPageStatusSnafu, InvalidClientIdSnafu,
            LoginError, PageParseSnafu, ProviderDeniedSnafu, TransportSnafu, TwoFactorRejectedSnafu,
            TwoFactorRequiredSnafu, UnexpectedPageSnafu,
        },
        fragment::{self, MissingFragmentSnafu},
        state::{FlowState, RouteFailure, RouteInput, RoutePaths, Submission, Transition, route},
    },
    observe::{FlowEvent, FlowObserver, NoObserver},
    token::TokenBundle,
};

/// Drives the provider's browser login ceremony to obtain a token.
///
/// The flow is stateless between calls; every call to
/// [`LoginFlow::authenticate`] uses the session it is given and nothing else.
#[derive(Debug, Clone, Default)]
pub struct LoginFlow<O: FlowObserver = NoObserver> {
    provider: Provider,
    observer: O,
}

impl LoginFlow {
    /// Creates a flow for `provider` that records nothing.
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            observer: NoObserver,
        }
    }
}

impl<O: FlowObserver> LoginFlow<O> {
    /// Replaces the observer.
    #[must_use]
    pub fn with_observer<O2: FlowObserver>(self, observer: O2) -> LoginFlow<O2> {
        LoginFlow {
            provider: self.provider,
            observer,
        }
    }

    /// The provider this flow targets.
    #[must_use]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Performs the login ceremony and returns the issued token.
    ///
    /// Starting from the authorize endpoint, the flow submits the login form,
    /// the second-factor form and the consent form as the provider asks for
    /// them, until it lands on the request's redirect target. The token is
    /// read from that URL's fragment.
    ///
    /// The session is consumed, so its cookies die with the call. Pass `&session`
    /// to keep it.
    ///
    /// # Errors
    ///
    /// Returns an error if an exchange fails, the provider rejects the
    /// credentials or code, a second factor is needed but no code was given,
    /// or the provider's pages do not follow the expected sequence.
    pub async fn authenticate<S: HttpSession>(
        &self,
        session: S,
        credentials: &Credentials,
        request: &LoginRequest,
    ) -> Result<TokenBundle, LoginError<S::Error>> {
        ensure!(request.client_id > 0, InvalidClientIdSnafu);

        self.observer.record(&FlowEvent::Started {
            login: credentials.login(),
            client_id: request.client_id,
            scope: request.scope(),
        });

        let params = request.authorize_params();
        let query = params
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .collect::<Vec<_>>();

        let mut state = FlowState::InitialPage;
        let mut page = session
            .get(self.provider.authorize_endpoint.as_url(), &query)
            .await
            .context(TransportSnafu { state })?;

        loop {
            self.observer.record(&FlowEvent::PageLoaded {
                state,
                status: page.status(),
                url: &page.redacted_url(),
            });

            match self.next_transition(state, &page, credentials, request)? {
                Transition::Submit(submission) => {
                    page = self
                        .submit(&session, state, submission, &page, credentials)
                        .await?;
                    state = submission.next_state();
                }
                Transition::Land => return self.land(&page),
            }
        }
    }

    fn next_transition<E: crate::Error>(
        &self,
        state: FlowState,
        page: &PageSnapshot,
        credentials: &Credentials,
        request: &LoginRequest,
    ) -> Result<Transition, LoginError<E>> {
        // A failed first response is a transport failure whatever its body holds.
        ensure!(
            state != FlowState::InitialPage || page.is_success(),
            InitialPageStatusSnafu {
                status: page.status()
            }
        );

        let view = html::inspect(
            page,
            &self.provider.password_field,
            &self.provider.warning_selector,
        )
        .context(PageParseSnafu { state })?;

        let input = RouteInput {
            status_ok: page.is_success(),
            path: page.path(),
            view: &view,
            has_code: credentials.two_factor_code().is_some(),
        };
        let paths = RoutePaths {
            two_factor: &self.provider.two_factor_path,
            consent: &self.provider.consent_path,
            landing: request.redirect_uri.path(),
        };

        route(state, &input, &paths).or_else(|failure| {
            if let RouteFailure::CredentialsRejected { message }
            | RouteFailure::TwoFactorRejected { message } = &failure
            {
                self.observer
                    .record(&FlowEvent::Rejected { state, message });
            }

            match failure {
                RouteFailure::InitialPageNotOk => InitialPageStatusSnafu {
                    status: page.status(),
                }
                .fail(),
                RouteFailure::CredentialsRejected { message } => {
                    CredentialsRejectedSnafu { message }.fail()
                }
                RouteFailure::TwoFactorRequired => TwoFactorRequiredSnafu {
                    login: credentials.login(),
                }
                .fail(),
                RouteFailure::TwoFactorRejected { message } => {
                    TwoFactorRejectedSnafu { message }.fail()
                }
                RouteFailure::UnexpectedPage => UnexpectedPageSnafu {
                    state,
                    url: page.redacted_url().as_str(),
                }
                .fail(),
            }
        })
    }

    async fn submit<S: HttpSession>(
        &self,
        session: &S,
        state: FlowState,
        submission: Submission,
        page: &PageSnapshot,
        credentials: &Credentials,
    ) -> Result<PageSnapshot, LoginError<S::Error>> {
        let form = HtmlForm::first_on(page).context(PageParseSnafu { state })?;
        let mut payload = FormPayload::from_form(&form);

        match submission {
            Submission::Login => {
                payload.set(&self.provider.login_field, credentials.login());
                payload.set_secret(&self.provider.password_field, credentials.password.clone());
            }
            Submission::TwoFactor => {
                if let Some(code) = credentials.two_factor_code() {
                    payload.set_secret(&self.provider.code_field, code.clone());
                }
            }
            Submission::Consent => {}
        }

        self.observer.record(&FlowEvent::FormSubmitting {
            state,
            submission,
            action: &form.action,
            fields: &payload.masked(),
        });

        session
            .post(&form.action, &payload)
            .await
            .context(TransportSnafu {
                state: submission.next_state(),
            })
    }

    fn land<E: crate::Error>(&self, page: &PageSnapshot) -> Result<TokenBundle, LoginError<E>> {
        let url = page.redacted_url();
        let raw = page
            .fragment()
            .filter(|raw| !raw.is_empty())
            .context(MissingFragmentSnafu)
            .context(FragmentSnafu { url: url.as_str() })?;

        let params = fragment::parse_landing(raw).context(FragmentSnafu { url: url.as_str() })?;

        if let Some(error) = params.error.as_deref() {
            return ProviderDeniedSnafu {
                error,
                description: params.error_description.clone(),
            }
            .fail();
        }

        let bundle = fragment::token_bundle(&params, &mut |field, value| {
            self.observer
                .record(&FlowEvent::FieldDefaulted { field, value });
        })
        .context(FragmentSnafu { url: url.as_str() })?;

        self.observer.record(&FlowEvent::Completed {
            user_id: bundle.user_id,
            expires_in: bundle.expires_in,
        });
        Ok(bundle)
    }
}

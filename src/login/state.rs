use std::fmt;

use crate::html::PageView;

/// Position in the login ceremony, named after the step that produced the
/// current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    /// The response to the initial authorize request.
    InitialPage,
    /// The response to the login form submission.
    PostLogin,
    /// The response to the second-factor form submission.
    PostTwoFactor,
    /// The response to the consent form submission.
    PostConsent,
    /// The redirect target was reached.
    Landed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InitialPage => "initial_page",
            Self::PostLogin => "post_login",
            Self::PostTwoFactor => "post_two_factor",
            Self::PostConsent => "post_consent",
            Self::Landed => "landed",
        })
    }
}

/// A form the flow submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Submission {
    /// The login form, with login and password.
    Login,
    /// The second-factor form, with the one-time code.
    TwoFactor,
    /// The consent form, with its hidden fields only.
    Consent,
}

impl Submission {
    /// The state entered once this form's response arrives.
    #[must_use]
    pub fn next_state(self) -> FlowState {
        match self {
            Self::Login => FlowState::PostLogin,
            Self::TwoFactor => FlowState::PostTwoFactor,
            Self::Consent => FlowState::PostConsent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    Submit(Submission),
    Land,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RouteFailure {
    InitialPageNotOk,
    CredentialsRejected { message: String },
    TwoFactorRequired,
    TwoFactorRejected { message: String },
    UnexpectedPage,
}

/// What the router knows about the current page.
#[derive(Debug)]
pub(crate) struct RouteInput<'a> {
    pub(crate) status_ok: bool,
    pub(crate) path: &'a str,
    pub(crate) view: &'a PageView,
    pub(crate) has_code: bool,
}

/// The paths that identify the provider's pages.
#[derive(Debug)]
pub(crate) struct RoutePaths<'a> {
    pub(crate) two_factor: &'a str,
    pub(crate) consent: &'a str,
    pub(crate) landing: &'a str,
}

/// Decides the next step from the current state and page.
pub(crate) fn route(
    state: FlowState,
    input: &RouteInput<'_>,
    paths: &RoutePaths<'_>,
) -> Result<Transition, RouteFailure> {
    match state {
        FlowState::InitialPage => {
            if !input.status_ok {
                return Err(RouteFailure::InitialPageNotOk);
            }
            if input.view.has_password_field {
                return Ok(Transition::Submit(Submission::Login));
            }
            // A remembered session may go straight to the code prompt.
            if input.path == paths.two_factor {
                return ask_for_code(input);
            }
            route_by_path(input.path, paths)
        }
        FlowState::PostLogin => {
            if let Some(message) = &input.view.warning {
                return Err(RouteFailure::CredentialsRejected {
                    message: message.clone(),
                });
            }
            if input.path == paths.two_factor {
                return ask_for_code(input);
            }
            route_by_path(input.path, paths)
        }
        FlowState::PostTwoFactor => {
            if let Some(message) = &input.view.warning {
                return Err(RouteFailure::TwoFactorRejected {
                    message: message.clone(),
                });
            }
            route_by_path(input.path, paths)
        }
        // Consent is granted at most once; anything but the landing page now
        // means the ceremony changed shape.
        FlowState::PostConsent | FlowState::Landed => {
            if input.path == paths.landing {
                Ok(Transition::Land)
            } else {
                Err(RouteFailure::UnexpectedPage)
            }
        }
    }
}

fn ask_for_code(input: &RouteInput<'_>) -> Result<Transition, RouteFailure> {
    if input.has_code {
        Ok(Transition::Submit(Submission::TwoFactor))
    } else {
        Err(RouteFailure::TwoFactorRequired)
    }
}

fn route_by_path(path: &str, paths: &RoutePaths<'_>) -> Result<Transition, RouteFailure> {
    if path == paths.consent {
        Ok(Transition::Submit(Submission::Consent))
    } else if path == paths.landing {
        Ok(Transition::Land)
    } else {
        Err(RouteFailure::UnexpectedPage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATHS: RoutePaths<'static> = RoutePaths {
        two_factor: "/login",
        consent: "/authorize",
        landing: "/blank.html",
    };

    fn input<'a>(path: &'a str, view: &'a PageView) -> RouteInput<'a> {
        RouteInput {
            status_ok: true,
            path,
            view,
            has_code: false,
        }
    }

    fn login_page() -> PageView {
        PageView {
            has_password_field: true,
            warning: None,
        }
    }

    fn warning(message: &str) -> PageView {
        PageView {
            has_password_field: true,
            warning: Some(message.to_owned()),
        }
    }

    #[test]
    fn test_initial_page_not_ok() {
        let view = login_page();
        let input = RouteInput {
            status_ok: false,
            ..input("/authorize", &view)
        };
        assert_eq!(
            route(FlowState::InitialPage, &input, &PATHS),
            Err(RouteFailure::InitialPageNotOk)
        );
    }

    #[test]
    fn test_initial_page_with_password_field_logs_in() {
        let view = login_page();
        assert_eq!(
            route(FlowState::InitialPage, &input("/authorize", &view), &PATHS),
            Ok(Transition::Submit(Submission::Login))
        );
    }

    #[test]
    fn test_initial_page_without_password_field_goes_to_consent() {
        let view = PageView::default();
        assert_eq!(
            route(FlowState::InitialPage, &input("/authorize", &view), &PATHS),
            Ok(Transition::Submit(Submission::Consent))
        );
    }

    #[test]
    fn test_pre_authenticated_session_lands_immediately() {
        let view = PageView::default();
        assert_eq!(
            route(FlowState::InitialPage, &input("/blank.html", &view), &PATHS),
            Ok(Transition::Land)
        );
    }

    #[test]
    fn test_initial_page_on_two_factor_path_asks_for_code() {
        let view = PageView::default();
        assert_eq!(
            route(FlowState::InitialPage, &input("/login", &view), &PATHS),
            Err(RouteFailure::TwoFactorRequired)
        );

        let input = RouteInput {
            has_code: true,
            ..input("/login", &view)
        };
        assert_eq!(
            route(FlowState::InitialPage, &input, &PATHS),
            Ok(Transition::Submit(Submission::TwoFactor))
        );
    }

    #[test]
    fn test_post_login_warning_rejects_credentials() {
        let view = warning("Invalid password");
        assert_eq!(
            route(FlowState::PostLogin, &input("/login", &view), &PATHS),
            Err(RouteFailure::CredentialsRejected {
                message: "Invalid password".to_owned()
            })
        );
    }

    #[test]
    fn test_two_factor_without_code() {
        let view = PageView::default();
        assert_eq!(
            route(FlowState::PostLogin, &input("/login", &view), &PATHS),
            Err(RouteFailure::TwoFactorRequired)
        );
    }

    #[test]
    fn test_two_factor_with_code() {
        let view = PageView::default();
        let input = RouteInput {
            has_code: true,
            ..input("/login", &view)
        };
        assert_eq!(
            route(FlowState::PostLogin, &input, &PATHS),
            Ok(Transition::Submit(Submission::TwoFactor))
        );
    }

    #[test]
    fn test_post_two_factor_warning_rejects_code() {
        let view = warning("Wrong code");
        assert_eq!(
            route(FlowState::PostTwoFactor, &input("/login", &view), &PATHS),
            Err(RouteFailure::TwoFactorRejected {
                message: "Wrong code".to_owned()
            })
        );
    }

    #[test]
    fn test_post_two_factor_still_on_login_is_unexpected() {
        let view = PageView::default();
        let input = RouteInput {
            has_code: true,
            ..input("/login", &view)
        };
        assert_eq!(
            route(FlowState::PostTwoFactor, &input, &PATHS),
            Err(RouteFailure::UnexpectedPage)
        );
    }

    #[test]
    fn test_consent_after_login_and_two_factor() {
        let view = PageView::default();
        for state in [FlowState::PostLogin, FlowState::PostTwoFactor] {
            assert_eq!(
                route(state, &input("/authorize", &view), &PATHS),
                Ok(Transition::Submit(Submission::Consent))
            );
        }
    }

    #[test]
    fn test_consent_is_not_repeated() {
        let view = PageView::default();
        assert_eq!(
            route(FlowState::PostConsent, &input("/authorize", &view), &PATHS),
            Err(RouteFailure::UnexpectedPage)
        );
        assert_eq!(
            route(FlowState::PostConsent, &input("/blank.html", &view), &PATHS),
            Ok(Transition::Land)
        );
    }

    #[test]
    fn test_unknown_path_is_unexpected() {
        let view = PageView::default();
        assert_eq!(
            route(FlowState::PostLogin, &input("/restore", &view), &PATHS),
            Err(RouteFailure::UnexpectedPage)
        );
    }

    #[test]
    fn test_submissions_move_forward() {
        assert_eq!(Submission::Login.next_state(), FlowState::PostLogin);
        assert_eq!(Submission::TwoFactor.next_state(), FlowState::PostTwoFactor);
        assert_eq!(Submission::Consent.next_state(), FlowState::PostConsent);
    }
}

//! Token extraction from the landing URL fragment.

use snafu::{Snafu, ensure};
use url::form_urlencoded;

use crate::token::TokenBundle;

/// Errors produced when the landing URL fragment cannot yield a token.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum FragmentError {
    /// The landing URL has no fragment.
    #[snafu(display("Landing URL has no fragment"))]
    MissingFragment,
    /// The fragment is not a well-formed query string.
    #[snafu(display("Fragment is not a valid query string: {reason}"))]
    Malformed {
        /// What is wrong with the fragment.
        reason: String,
    },
    /// The fragment parsed, but carries no access token.
    #[snafu(display("Fragment carries no access token"))]
    MissingAccessToken,
}

impl crate::Error for FragmentError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// The recognised keys of a landing fragment.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct LandingParams {
    pub(crate) access_token: Option<String>,
    pub(crate) user_id: Option<String>,
    pub(crate) expires_in: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) error_description: Option<String>,
}

/// Parses a fragment as a query string.
///
/// Unlike `application/x-www-form-urlencoded` decoding, which accepts
/// anything, this rejects broken percent escapes and `;` separators.
pub(crate) fn parse_landing(fragment: &str) -> Result<LandingParams, FragmentError> {
    validate_query(fragment)?;

    let mut params = LandingParams::default();
    for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
        let slot = match key.as_ref() {
            "access_token" => &mut params.access_token,
            "user_id" => &mut params.user_id,
            "expires_in" => &mut params.expires_in,
            "error" => &mut params.error,
            "error_description" => &mut params.error_description,
            _ => continue,
        };
        // First occurrence wins.
        slot.get_or_insert_with(|| value.into_owned());
    }
    Ok(params)
}

fn validate_query(query: &str) -> Result<(), FragmentError> {
    ensure!(
        !query.contains(';'),
        MalformedSnafu {
            reason: "contains ';'"
        }
    );

    let bytes = query.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            ensure!(
                escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)),
                MalformedSnafu {
                    reason: format!("invalid percent escape at byte {i}")
                }
            );
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Reads an integer field; absent or unparsable values become `0`.
///
/// `on_defaulted` is called for a present value that is not an integer.
pub(crate) fn integer_field(
    name: &str,
    value: Option<&str>,
    on_defaulted: &mut impl FnMut(&str, &str),
) -> u64 {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return 0;
    };
    value.parse().unwrap_or_else(|_| {
        on_defaulted(name, value);
        0
    })
}

/// Builds the token bundle from parsed landing parameters.
pub(crate) fn token_bundle(
    params: &LandingParams,
    on_defaulted: &mut impl FnMut(&str, &str),
) -> Result<TokenBundle, FragmentError> {
    let access_token = params
        .access_token
        .as_deref()
        .filter(|token| !token.is_empty());
    let Some(access_token) = access_token else {
        return MissingAccessTokenSnafu.fail();
    };

    Ok(TokenBundle::builder()
        .access_token(access_token)
        .user_id(integer_field(
            "user_id",
            params.user_id.as_deref(),
            on_defaulted,
        ))
        .expires_in(integer_field(
            "expires_in",
            params.expires_in.as_deref(),
            on_defaulted,
        ))
        .build())
}

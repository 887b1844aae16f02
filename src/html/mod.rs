//! HTML inspection of buffered pages.
//!
//! Everything here works on a [`PageSnapshot`] and parses its body into a
//! short-lived document, returning owned data. Documents are never kept
//! alive across an `.await`.

mod form;

use std::{str::Utf8Error, sync::LazyLock};

use scraper::{ElementRef, Html, Selector};
use snafu::Snafu;

use crate::http::PageSnapshot;

pub use form::{FormPayload, HtmlForm, mask_secret};

static INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input").expect("static selector is valid"));

/// Errors raised while interpreting a page as HTML.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PageError {
    /// The body is not valid UTF-8 text.
    #[snafu(display("Page body is not valid UTF-8"))]
    NotUtf8 {
        /// The underlying error.
        source: Utf8Error,
    },
    /// A configured CSS selector could not be parsed.
    #[snafu(display("Invalid CSS selector '{selector}': {message}"))]
    InvalidSelector {
        /// The selector text.
        selector: String,
        /// The parser's description of the problem.
        message: String,
    },
    /// The page has no `<form>` element to submit.
    #[snafu(display("No form found on page {url}"))]
    MissingForm {
        /// The page URL, without fragment.
        url: String,
    },
    /// The form's `action` attribute could not be resolved to a URL.
    #[snafu(display("Form action '{action}' cannot be resolved"))]
    InvalidAction {
        /// The raw `action` attribute.
        action: String,
        /// The underlying error.
        source: url::ParseError,
    },
}

impl crate::Error for PageError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// The facts about a page that drive routing decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageView {
    /// The page contains a password input.
    pub has_password_field: bool,
    /// The text shown by the provider's warning element, if one is present.
    pub warning: Option<String>,
}

/// Inspects a page for a password input and a warning element.
///
/// A password input is an `<input>` named `password_field` or of type
/// `password`.
///
/// # Errors
///
/// Returns an error if `warning_selector` is invalid.
pub fn inspect(
    snapshot: &PageSnapshot,
    password_field: &str,
    warning_selector: &str,
) -> Result<PageView, PageError> {
    let warning = parse_selector(warning_selector)?;
    let document = snapshot.document();

    Ok(PageView {
        has_password_field: has_password_field(&document, password_field),
        warning: find_warning(&document, &warning),
    })
}

fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|e| PageError::InvalidSelector {
        selector: selector.to_owned(),
        message: format!("{e:?}"),
    })
}

fn has_password_field(document: &Html, password_field: &str) -> bool {
    document.select(&INPUT).any(|input| {
        let element = input.value();
        element.attr("name") == Some(password_field)
            || element
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("password"))
    })
}

/// The message is carried by the element following the warning marker; the
/// marker's own text is used when it has no such sibling.
fn find_warning(document: &Html, selector: &Selector) -> Option<String> {
    let marker = document.select(selector).next()?;

    let sibling_text = marker
        .next_siblings()
        .find_map(ElementRef::wrap)
        .map(|sibling| collect_text(&sibling))
        .filter(|text| !text.is_empty());

    Some(sibling_text.unwrap_or_else(|| collect_text(&marker)))
}

fn collect_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

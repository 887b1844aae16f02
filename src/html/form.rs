use std::{fmt, sync::LazyLock};

use scraper::Selector;
use secrecy::{ExposeSecret as _, SecretString};
use snafu::{OptionExt as _, ResultExt as _};
use url::Url;

use super::{InvalidActionSnafu, MissingFormSnafu, PageError};
use crate::http::PageSnapshot;

static FORM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("static selector is valid"));
static HIDDEN_INPUT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[type="hidden"]"#).expect("static selector is valid")
});

/// Replaces every character of `secret` with `*`.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

/// The first form of a page, reduced to what is needed to resubmit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlForm {
    /// The absolute URL the form submits to.
    pub action: Url,
    /// Hidden inputs in document order.
    pub hidden_fields: Vec<(String, String)>,
}

impl HtmlForm {
    /// Finds the first `<form>` on the page.
    ///
    /// The `action` is resolved against the page URL; an empty or missing
    /// action submits back to the page itself. Hidden inputs without a name
    /// are skipped; empty values are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the page has no form or the action cannot be
    /// resolved.
    pub fn first_on(snapshot: &PageSnapshot) -> Result<Self, PageError> {
        let document = snapshot.document();
        let form = document.select(&FORM).next().context(MissingFormSnafu {
            url: snapshot.redacted_url().as_str(),
        })?;

        let raw_action = form.value().attr("action").unwrap_or_default().trim();
        let action = resolve_action(snapshot.url(), raw_action)?;

        let hidden_fields = form
            .select(&HIDDEN_INPUT)
            .filter_map(|input| {
                let input = input.value();
                let name = input.attr("name").filter(|name| !name.is_empty())?;
                Some((name.to_owned(), input.attr("value").unwrap_or_default().to_owned()))
            })
            .collect();

        Ok(Self {
            action,
            hidden_fields,
        })
    }
}

fn resolve_action(page: &Url, action: &str) -> Result<Url, PageError> {
    let mut resolved = if action.is_empty() {
        page.clone()
    } else {
        page.join(action).context(InvalidActionSnafu { action })?
    };
    resolved.set_fragment(None);
    Ok(resolved)
}

#[derive(Clone)]
enum FieldValue {
    Plain(String),
    Secret(SecretString),
}

/// An ordered set of form fields to submit.
///
/// Secret values are only exposed by [`FormPayload::to_urlencoded`]; every
/// other view, including `Debug`, masks them.
#[derive(Clone, Default)]
pub struct FormPayload {
    fields: Vec<(String, FieldValue)>,
}

impl FormPayload {
    /// Starts a payload from a form's hidden fields.
    #[must_use]
    pub fn from_form(form: &HtmlForm) -> Self {
        Self {
            fields: form
                .hidden_fields
                .iter()
                .map(|(name, value)| (name.clone(), FieldValue::Plain(value.clone())))
                .collect(),
        }
    }

    /// Sets a field, replacing an existing field with the same name in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.upsert(name.into(), FieldValue::Plain(value.into()));
    }

    /// Sets a secret field, replacing an existing field with the same name in place.
    pub fn set_secret(&mut self, name: impl Into<String>, value: SecretString) {
        self.upsert(name.into(), FieldValue::Secret(value));
    }

    fn upsert(&mut self, name: String, value: FieldValue) {
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// The number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the payload has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The field names and values with secrets masked.
    #[must_use]
    pub fn masked(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(name, value)| {
                let shown = match value {
                    FieldValue::Plain(v) => v.clone(),
                    FieldValue::Secret(s) => mask_secret(s.expose_secret()),
                };
                (name.clone(), shown)
            })
            .collect()
    }

    fn exposed(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    FieldValue::Plain(v) => v.as_str(),
                    FieldValue::Secret(s) => s.expose_secret(),
                };
                (name.as_str(), value)
            })
            .collect()
    }

    /// Encodes the payload as `application/x-www-form-urlencoded`, secrets included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_urlencoded(&self) -> Result<String, serde_html_form::ser::Error> {
        serde_html_form::to_string(self.exposed())
    }
}

impl fmt::Debug for FormPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.masked()).finish()
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    fn page(url: &str, body: &str) -> PageSnapshot {
        PageSnapshot::new(StatusCode::OK, Url::parse(url).unwrap(), body.to_owned())
    }

    #[test]
    fn test_path_only_action_uses_page_origin() {
        let form = HtmlForm::first_on(&page(
            "https://m.vk.com/login?act=x",
            r#"<form method="post" action="/login?act=login&soft=1"></form>"#,
        ))
        .unwrap();
        assert_eq!(form.action.as_str(), "https://m.vk.com/login?act=login&soft=1");
    }

    #[test]
    fn test_absolute_action_is_kept() {
        let form = HtmlForm::first_on(&page(
            "https://oauth.vk.com/authorize",
            r#"<form action="https://login.vk.com/?act=login&amp;soft=1"></form>"#,
        ))
        .unwrap();
        assert_eq!(form.action.as_str(), "https://login.vk.com/?act=login&soft=1");
    }

    #[test]
    fn test_empty_action_targets_page_without_fragment() {
        let form = HtmlForm::first_on(&page(
            "https://oauth.vk.com/authorize?client_id=1#top",
            r#"<form></form>"#,
        ))
        .unwrap();
        assert_eq!(form.action.as_str(), "https://oauth.vk.com/authorize?client_id=1");
    }

    #[test]
    fn test_only_first_form_is_used() {
        let form = HtmlForm::first_on(&page(
            "https://oauth.vk.com/authorize",
            r#"<form action="/first"><input type="hidden" name="a" value="1"></form>
               <form action="/second"><input type="hidden" name="b" value="2"></form>"#,
        ))
        .unwrap();
        assert_eq!(form.action.path(), "/first");
        assert_eq!(form.hidden_fields, vec![("a".to_owned(), "1".to_owned())]);
    }

    #[test]
    fn test_hidden_fields_skip_nameless_and_visible_inputs() {
        let form = HtmlForm::first_on(&page(
            "https://oauth.vk.com/authorize",
            r#"<form action="/go">
                 <input type="hidden" name="ip_h" value="abc">
                 <input type="hidden" value="orphan">
                 <input type="hidden" name="to" value="">
                 <input type="text" name="email" value="visible">
               </form>"#,
        ))
        .unwrap();
        assert_eq!(
            form.hidden_fields,
            vec![
                ("ip_h".to_owned(), "abc".to_owned()),
                ("to".to_owned(), String::new()),
            ]
        );
    }

    #[test]
    fn test_missing_form() {
        let err = HtmlForm::first_on(&page("https://oauth.vk.com/authorize#frag", "<p>hi</p>"))
            .unwrap_err();
        assert!(
            matches!(err, PageError::MissingForm { url } if url == "https://oauth.vk.com/authorize")
        );
    }

    #[test]
    fn test_explicit_fields_override_hidden_fields() {
        let form = HtmlForm {
            action: Url::parse("https://login.vk.com/").unwrap(),
            hidden_fields: vec![
                ("email".to_owned(), "hidden@example.com".to_owned()),
                ("ip_h".to_owned(), "abc".to_owned()),
            ],
        };
        let mut payload = FormPayload::from_form(&form);
        payload.set("email", "user@example.com");
        payload.set_secret("pass", SecretString::from("hunter2"));

        assert_eq!(payload.len(), 3);
        assert_eq!(
            payload.exposed(),
            vec![
                ("email", "user@example.com"),
                ("ip_h", "abc"),
                ("pass", "hunter2"),
            ]
        );
    }

    #[test]
    fn test_secret_fields_are_masked_in_diagnostics() {
        let mut payload = FormPayload::default();
        payload.set("email", "user@example.com");
        payload.set_secret("pass", SecretString::from("hunter2"));

        assert_eq!(
            payload.masked(),
            vec![
                ("email".to_owned(), "user@example.com".to_owned()),
                ("pass".to_owned(), "*******".to_owned()),
            ]
        );
        let debug = format!("{payload:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("*******"));
    }

    #[test]
    fn test_urlencoded_body_carries_secret() {
        let mut payload = FormPayload::default();
        payload.set("email", "a b");
        payload.set_secret("pass", SecretString::from("p&ss"));
        assert_eq!(payload.to_urlencoded().unwrap(), "email=a+b&pass=p%26ss");
    }

    #[test]
    fn test_mask_counts_characters() {
        assert_eq!(mask_secret("пароль"), "******");
        assert_eq!(mask_secret(""), "");
    }
}

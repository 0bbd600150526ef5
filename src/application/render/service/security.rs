//! Last check before HTML is trusted: anything that can still execute script
//! aborts the render. It runs on the sanitized output and on the tags the DOM
//! stage saw, so it also catches input rendered with sanitization switched off.
//!
//! Only parsed markup counts. Text and attribute values such as `alt` may say
//! anything; element names, attribute names and URL-bearing values are checked.

use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::application::render::types::{ParseState, RenderError};

use super::markup::decode_entities;

const URL_ATTRIBUTES: [&str; 6] = ["href", "src", "action", "formaction", "xlink:href", "data"];
const SCRIPT_SCHEMES: [&str; 2] = ["javascript:", "vbscript:"];

pub(crate) fn check(html: &str, state: &ParseState, allow_insecure: bool) -> Result<(), RenderError> {
    if allow_insecure {
        return Ok(());
    }
    if state.html_tags.contains("script") {
        return Err(RenderError::security("script element"));
    }

    let mut finding: Option<&'static str> = None;
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                if finding.is_none() {
                    finding = insecure_element(
                        &el.tag_name(),
                        el.attributes()
                            .iter()
                            .map(|attr| (attr.name(), attr.value())),
                    );
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::document(err.to_string()))?;

    match finding {
        Some(reason) => Err(RenderError::security(reason)),
        None => Ok(()),
    }
}

fn insecure_element(
    tag: &str,
    attributes: impl Iterator<Item = (String, String)>,
) -> Option<&'static str> {
    if tag.eq_ignore_ascii_case("script") {
        return Some("script element");
    }
    for (name, value) in attributes {
        if is_event_handler(&name) {
            return Some("inline event handler");
        }
        if URL_ATTRIBUTES.iter().any(|url| name.eq_ignore_ascii_case(url)) && is_script_url(&value) {
            return Some("script URL in attribute");
        }
    }
    None
}

fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.as_bytes()[..2].eq_ignore_ascii_case(b"on")
}

/// Browsers ignore embedded whitespace and control characters in a scheme.
fn is_script_url(value: &str) -> bool {
    let compact: String = decode_entities(value)
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace() && !ch.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_SCHEMES.iter().any(|scheme| compact.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(tag: &str) -> ParseState {
        let mut state = ParseState::default();
        state.html_tags.insert(tag.to_string());
        state
    }

    #[test]
    fn rejects_script_tags_in_output_or_input() {
        let clean = ParseState::default();
        assert!(check("<SCRIPT src=\"\"></SCRIPT>", &clean, false).is_err());
        assert!(check("<p>x</p>", &state_with("script"), false).is_err());
    }

    #[test]
    fn rejects_script_urls_and_event_handlers() {
        let clean = ParseState::default();
        assert!(check("<a href=\"javascript:alert(1)\">x</a>", &clean, false).is_err());
        assert!(check("<a href=\" Java\tScript:alert(1)\">x</a>", &clean, false).is_err());
        assert!(check("<img src=x onerror=alert(1)>", &clean, false).is_err());
        assert!(check("<div ONCLICK=\"x()\">x</div>", &clean, false).is_err());
    }

    #[test]
    fn escaped_text_is_not_markup() {
        let clean = ParseState::default();
        assert!(check("<p>&lt;script&gt; onload=1 javascript:x</p>", &clean, false).is_ok());
    }

    #[test]
    fn attribute_values_are_not_attributes() {
        let clean = ParseState::default();
        let html = "<p><img src=\"https://x.test/a.png\" alt=\"click onion=good javascript:x\" \
                    title=\"onload=1\"><a href=\"https://x.test/?q=javascript:\" id=\"online\">x</a></p>";
        assert!(check(html, &clean, false).is_ok());
    }

    #[test]
    fn allowance_disables_the_check() {
        assert!(check("<script></script>", &state_with("script"), true).is_ok());
    }

    #[test]
    fn errors_are_security_errors() {
        let err = check("<script></script>", &ParseState::default(), false).expect_err("script");
        assert!(err.is_security());
        assert!(err.to_string().contains("insecure content"));
        let err = check("<img src=x onerror=alert(1)>", &ParseState::default(), false)
            .expect_err("handler");
        assert!(err.to_string().contains("inline event handler"));
    }
}

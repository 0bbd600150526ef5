use once_cell::sync::Lazy;
use regex::Regex;

static HTML_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--([\s\S]+?)(-->|$)").expect("comment regex must compile"));

const ROOT_OPEN: &str = "<html>";
const ROOT_CLOSE: &str = "</html>";

/// Replace raw HTML comments (terminated or not) with a visible marker so nothing
/// can hide inside them once the text reaches the parser.
pub(crate) fn strip_comments(text: &str) -> String {
    HTML_COMMENT
        .replace_all(text, "(html comment removed: $1)")
        .into_owned()
}

/// Whether the body is already HTML and must skip the Markdown stage.
///
/// The body counts as HTML when it is bracketed by the root wrapper, or when it
/// starts with `<p>` and ends with `</p>`. Markdown that happens to begin with a
/// literal paragraph tag is therefore treated as HTML.
pub(crate) fn is_html(text: &str) -> bool {
    let trimmed = text.trim_end();
    (trimmed.starts_with(ROOT_OPEN) && trimmed.ends_with(ROOT_CLOSE))
        || (trimmed.starts_with("<p>") && trimmed.ends_with("</p>"))
}

/// Wrap the document in the single root element the DOM stage expects.
pub(crate) fn wrap_root(html: String) -> String {
    if html.starts_with(ROOT_OPEN) {
        html
    } else {
        format!("{ROOT_OPEN}{html}{ROOT_CLOSE}")
    }
}

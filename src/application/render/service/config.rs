use std::{borrow::Cow, collections::HashSet};

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;
use tracing::warn;

use super::iframes::canonical_src;

/// Classes a `div` may carry through the sanitizer.
pub(crate) const DIV_CLASSES: [&str; 8] = [
    "pull-right",
    "pull-left",
    "text-justify",
    "text-rtl",
    "text-center",
    "text-right",
    "videoWrapper",
    "phishy",
];

/// Link schemes that survive sanitization. `vessel` links open the signing app.
pub(crate) const LINK_SCHEMES: [&str; 4] = ["http", "https", "mailto", "vessel"];

pub(crate) fn markdown_options(breaks: bool) -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options.render.hardbreaks = breaks;
    options
}

/// Whitelist sanitizer for rendered bodies. `phishing_warning` is the only
/// `title` a `div` may keep, so warnings produced by the DOM stage survive while
/// user-supplied titles do not.
pub(crate) fn build_sanitizer(phishing_warning: &str) -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "b",
        "blockquote",
        "br",
        "center",
        "code",
        "del",
        "div",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "iframe",
        "img",
        "li",
        "ol",
        "p",
        "pre",
        "q",
        "strike",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);
    builder.generic_attributes(HashSet::new());

    builder.add_tag_attributes("a", &["href", "id"]);
    builder.add_tag_attributes("img", &["src", "alt"]);
    builder.add_tag_attributes(
        "iframe",
        &[
            "src",
            "width",
            "height",
            "frameborder",
            "allowfullscreen",
            "webkitallowfullscreen",
            "mozallowfullscreen",
        ],
    );
    builder.add_tag_attributes("div", &["title"]);
    builder.add_tag_attributes("th", &["colspan", "rowspan"]);
    builder.add_tag_attributes("td", &["colspan", "rowspan"]);
    builder.add_allowed_classes("div", &DIV_CLASSES);

    builder.link_rel(None);
    builder.url_schemes(HashSet::from(LINK_SCHEMES));

    let warning = phishing_warning.to_string();
    builder.attribute_filter(move |element, attribute, value| {
        match (element, attribute) {
            ("iframe", "src") => match canonical_src(value) {
                Some(src) => Some(Cow::Owned(src)),
                None => {
                    warn!(
                        target = "application::render::sanitize",
                        src = value,
                        "Blocked iframe source outside the whitelist"
                    );
                    None
                }
            },
            ("div", "title") => (value == warning).then_some(Cow::Borrowed(value)),
            _ => Some(Cow::Borrowed(value)),
        }
    });

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = false;

    // Quotes are curled by `quotes::curl_quotes`; dashes and ellipses stay.
    let parse = &mut options.parse;
    parse.smart = false;

    let render = &mut options.render;
    render.r#unsafe = true;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    const WARNING: &str = "beware";

    #[test]
    fn strips_unlisted_tags_and_keeps_text() {
        let html = build_sanitizer(WARNING)
            .clean("<section><span>kept</span><script>alert(1)</script></section>")
            .to_string();
        assert_eq!(html, "kept");
    }

    #[test]
    fn keeps_whitelisted_div_classes_only() {
        let html = build_sanitizer(WARNING)
            .clean("<div class=\"text-center evil\">x</div>")
            .to_string();
        assert_eq!(html, "<div class=\"text-center\">x</div>");
    }

    #[test]
    fn keeps_only_the_phishing_warning_title() {
        let sanitizer = build_sanitizer(WARNING);
        assert_eq!(
            sanitizer
                .clean("<div title=\"beware\" class=\"phishy\">x</div>")
                .to_string(),
            "<div title=\"beware\" class=\"phishy\">x</div>"
        );
        assert_eq!(
            sanitizer.clean("<div title=\"other\">x</div>").to_string(),
            "<div>x</div>"
        );
    }

    #[test]
    fn canonicalizes_or_drops_iframe_sources() {
        let sanitizer = build_sanitizer(WARNING);
        let kept = sanitizer
            .clean("<iframe src=\"https://www.youtube.com/embed/abc?autoplay=1\"></iframe>")
            .to_string();
        assert_eq!(
            kept,
            "<iframe src=\"https://www.youtube.com/embed/abc\"></iframe>"
        );

        let dropped = sanitizer
            .clean("<iframe src=\"https://evil.test/embed\"></iframe>")
            .to_string();
        assert_eq!(dropped, "<iframe></iframe>");
    }

    #[test]
    fn drops_disallowed_link_schemes_and_attributes() {
        let html = build_sanitizer(WARNING)
            .clean("<a href=\"javascript:alert(1)\" onclick=\"x\" id=\"top\">x</a>")
            .to_string();
        assert_eq!(html, "<a id=\"top\">x</a>");
    }

    #[test]
    fn keeps_app_scheme_links() {
        let html = build_sanitizer(WARNING)
            .clean("<a href=\"vessel://sign/tx\">sign</a><a href=\"ftp://x.test/\">f</a>")
            .to_string();
        assert_eq!(html, "<a href=\"vessel://sign/tx\">sign</a><a>f</a>");
    }

    #[test]
    fn markdown_options_follow_break_flag() {
        assert!(markdown_options(true).render.hardbreaks);
        assert!(!markdown_options(false).render.hardbreaks);
        assert!(markdown_options(true).render.r#unsafe);
    }
}

//! DOM traversal stage.
//!
//! The wrapped document is parsed leniently, every node is visited once in
//! document order, and the tree is rewritten in place: images are proxied or
//! hidden, iframes wrapped, suspicious anchors neutralized and text nodes
//! linkified. Nodes are collected before any mutation so replacements never
//! disturb the walk; nodes inserted during the walk are not visited.

use kuchikikiki::{ElementData, NodeRef, traits::*};
use tracing::warn;
use url::Url;

use crate::application::render::options::RenderConfig;
use crate::application::render::types::{ParseState, RenderError};
use crate::domain::account_name::AccountNameValidator;
use crate::domain::localization::LocalizationStrings;

use super::images::proxied_src;
use super::linkify::Linkifier;
use super::markup::escape_text;
use super::phishing::{PhishingDetector, warning_html};

const DOCUMENT_TAGS: [&str; 3] = ["html", "head", "body"];
/// Text below these elements is never linkified.
const OPAQUE_TAGS: [&str; 6] = ["a", "code", "pre", "iframe", "script", "style"];
const VIDEO_WRAPPER_CLASS: &str = "videoWrapper";

pub(crate) struct DomOutcome {
    pub(crate) html: String,
    pub(crate) state: ParseState,
}

pub(crate) struct DomPass<'a> {
    pub(crate) config: &'a RenderConfig,
    pub(crate) phishing: &'a PhishingDetector,
    pub(crate) accounts: &'a AccountNameValidator,
    pub(crate) strings: &'a LocalizationStrings,
}

impl DomPass<'_> {
    /// Walk `html`, filling a fresh [`ParseState`]. With `mutate` unset the tree
    /// is only inspected and the returned HTML is the parser's serialization.
    pub(crate) fn run(&self, html: &str, mutate: bool) -> Result<DomOutcome, RenderError> {
        let document = kuchikikiki::parse_html().one(html);
        let mut state = ParseState::default();
        let linkifier = Linkifier {
            config: self.config,
            phishing: self.phishing,
            accounts: self.accounts,
            strings: self.strings,
        };

        let nodes: Vec<NodeRef> = document.descendants().collect();
        for node in &nodes {
            if let Some(element) = node.as_element() {
                let name = element.name.local.to_string();
                match name.as_str() {
                    "img" => self.visit_image(node, element, &mut state, mutate),
                    "iframe" => self.visit_iframe(node, element, &mut state, mutate),
                    "a" => self.visit_anchor(node, element, &mut state, mutate),
                    _ => {}
                }
                if !DOCUMENT_TAGS.contains(&name.as_str()) {
                    state.html_tags.insert(name);
                }
            } else if let Some(text) = node.as_text() {
                if inside_opaque(node) {
                    continue;
                }
                let content = text.borrow().clone();
                if let Some(replacement) = linkifier.rewrite(&content, &mut state, mutate) {
                    replace_with_fragment(node, &replacement);
                }
            }
        }

        Ok(DomOutcome {
            html: serialize_content(&document)?,
            state,
        })
    }

    fn visit_image(&self, node: &NodeRef, element: &ElementData, state: &mut ParseState, mutate: bool) {
        let src = element
            .attributes
            .borrow()
            .get("src")
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(str::to_string);

        let Some(src) = src else {
            if mutate {
                warn!(
                    target = "application::render::dom",
                    "Dropping image without a source"
                );
                node.detach();
            }
            return;
        };

        state.images.insert(src.clone());
        if !mutate {
            return;
        }

        if self.config.do_not_show_images {
            replace_with_fragment(node, &format!("<pre>{}</pre>", escape_text(&src)));
        } else {
            let proxied = proxied_src(&src, self.config);
            element.attributes.borrow_mut().insert("src", proxied);
        }
    }

    fn visit_iframe(&self, node: &NodeRef, element: &ElementData, state: &mut ParseState, mutate: bool) {
        if let Some(src) = element.attributes.borrow().get("src") {
            state.links.insert(src.to_string());
        }
        if !mutate || parent_is_video_wrapper(node) {
            return;
        }

        let Some(wrapper) = parse_fragment(&format!(
            "<div class=\"{VIDEO_WRAPPER_CLASS}\"></div>"
        ))
        .into_iter()
        .next() else {
            return;
        };

        match enclosing_paragraph(node) {
            Some(paragraph) => lift_out_of_paragraph(node, &paragraph, &wrapper),
            None => node.insert_before(wrapper.clone()),
        }
        wrapper.append(node.clone());
    }

    fn visit_anchor(&self, node: &NodeRef, element: &ElementData, state: &mut ParseState, mutate: bool) {
        let Some(href) = element.attributes.borrow().get("href").map(str::to_string) else {
            return;
        };
        state.links.insert(href.clone());
        if !mutate {
            return;
        }

        let text = node.text_contents();
        if self.phishing.is_phishy(&text, &href) {
            replace_with_fragment(
                node,
                &warning_html(&text, &href, &self.strings.phishing_warning),
            );
            return;
        }

        if let Some(absolute) = absolutize(&self.config.base_url, &href) {
            element.attributes.borrow_mut().insert("href", absolute);
        }
    }
}

/// Absolute form of a relative link. Fragments and anything that already has a
/// scheme (including custom app schemes) are left as written.
fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    match Url::parse(href) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.join(href).ok().map(|url| url.to_string())
        }
        _ => None,
    }
}

fn inside_opaque(node: &NodeRef) -> bool {
    node.ancestors().any(|ancestor| {
        ancestor
            .as_element()
            .is_some_and(|element| OPAQUE_TAGS.contains(&&*element.name.local))
    })
}

fn parent_is_video_wrapper(node: &NodeRef) -> bool {
    node.parent().is_some_and(|parent| {
        parent.as_element().is_some_and(|element| {
            &*element.name.local == "div"
                && element
                    .attributes
                    .borrow()
                    .get("class")
                    .is_some_and(|class| class.split_whitespace().any(|c| c == VIDEO_WRAPPER_CLASS))
        })
    })
}

/// A block wrapper cannot sit inside `<p>`.
fn enclosing_paragraph(node: &NodeRef) -> Option<NodeRef> {
    node.parent()
        .filter(|parent| parent.as_element().is_some_and(|element| &*element.name.local == "p"))
}

/// Place `wrapper` right after `paragraph`, moving whatever follows `node`
/// into a new paragraph after it. Paragraphs left blank are dropped.
fn lift_out_of_paragraph(node: &NodeRef, paragraph: &NodeRef, wrapper: &NodeRef) {
    paragraph.insert_after(wrapper.clone());

    let mut trailing = Vec::new();
    let mut next = node.next_sibling();
    while let Some(sibling) = next {
        next = sibling.next_sibling();
        trailing.push(sibling);
    }
    if let Some(rest) = parse_fragment("<p></p>").into_iter().next() {
        for sibling in trailing {
            rest.append(sibling);
        }
        if !is_blank(&rest) {
            wrapper.insert_after(rest);
        }
    }

    node.detach();
    if is_blank(paragraph) {
        paragraph.detach();
    }
}

fn is_blank(node: &NodeRef) -> bool {
    node.children()
        .all(|child| child.as_text().is_some_and(|text| text.borrow().trim().is_empty()))
}

/// Parse an HTML snippet into detached top-level nodes.
fn parse_fragment(html: &str) -> Vec<NodeRef> {
    let document = kuchikikiki::parse_html().one(format!("<html><body>{html}</body></html>"));
    match document.select_first("body") {
        Ok(body) => body.as_node().children().collect(),
        Err(()) => Vec::new(),
    }
}

fn replace_with_fragment(node: &NodeRef, html: &str) {
    for replacement in parse_fragment(html) {
        node.insert_before(replacement);
    }
    node.detach();
}

fn serialize_content(document: &NodeRef) -> Result<String, RenderError> {
    let mut out = Vec::new();
    for section in ["head", "body"] {
        let Ok(container) = document.select_first(section) else {
            continue;
        };
        for child in container.as_node().children() {
            child
                .serialize(&mut out)
                .map_err(|err| RenderError::document(err.to_string()))?;
        }
    }
    String::from_utf8(out).map_err(|err| RenderError::document(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        config: RenderConfig,
        phishing: PhishingDetector,
        accounts: AccountNameValidator,
        strings: LocalizationStrings,
    }

    impl Fixture {
        fn new(hide_images: bool) -> Self {
            let config = RenderConfig::builder("https://example.com")
                .do_not_show_images(hide_images)
                .ipfs_prefix("https://gw/ipfs")
                .image_proxy_fn(|url| url.to_string())
                .hashtag_url_fn(|tag| format!("/trending/{tag}"))
                .usertag_url_fn(|name| format!("/@{name}"))
                .is_link_safe_fn(|_| true)
                .add_external_css_class_to_matching_links_fn(|_| false)
                .build()
                .expect("valid configuration");
            let phishing = PhishingDetector::new(&config).expect("detector");
            Self {
                config,
                phishing,
                accounts: AccountNameValidator::default(),
                strings: LocalizationStrings::default(),
            }
        }

        fn run(&self, html: &str, mutate: bool) -> DomOutcome {
            DomPass {
                config: &self.config,
                phishing: &self.phishing,
                accounts: &self.accounts,
                strings: &self.strings,
            }
            .run(html, mutate)
            .expect("dom pass")
        }
    }

    #[test]
    fn links_mentions_and_hashtags_in_text() {
        let outcome = Fixture::new(false).run("<html><p>Hi @noisy #Tag</p></html>", true);
        assert_eq!(
            outcome.html,
            "<p>Hi <a href=\"/@noisy\">@noisy</a> <a href=\"/trending/tag\">#Tag</a></p>"
        );
        assert!(outcome.state.usertags.contains("noisy"));
        assert!(outcome.state.hashtags.contains("tag"));
        assert!(outcome.state.html_tags.contains("p"));
        assert!(!outcome.state.html_tags.contains("body"));
    }

    #[test]
    fn leaves_text_inside_code_and_links_alone() {
        let html = "<html><p><code>@noisy</code> <a href=\"https://example.com/x\">@noisy</a></p></html>";
        let outcome = Fixture::new(false).run(html, true);
        assert!(outcome.state.usertags.is_empty());
        assert!(outcome.html.contains("<code>@noisy</code>"));
    }

    #[test]
    fn rewrites_ipfs_images() {
        let outcome = Fixture::new(false).run("<html><img src=\"ipfs://QmCid\"></html>", true);
        assert_eq!(outcome.html, "<img src=\"https://gw/ipfs/QmCid\">");
        assert!(outcome.state.images.contains("ipfs://QmCid"));
    }

    #[test]
    fn hides_images_as_preformatted_urls() {
        let outcome = Fixture::new(true).run("<html><p><img src=\"https://img.test/a.jpg\"></p></html>", true);
        assert!(outcome.html.contains("<pre>https://img.test/a.jpg</pre>"));
        assert!(!outcome.html.contains("<img"));
    }

    #[test]
    fn wraps_bare_iframes_once() {
        let fixture = Fixture::new(false);
        let outcome = fixture.run("<html><iframe src=\"https://player.vimeo.com/video/1\"></iframe></html>", true);
        assert_eq!(
            outcome.html,
            "<div class=\"videoWrapper\"><iframe src=\"https://player.vimeo.com/video/1\"></iframe></div>"
        );

        let again = fixture.run(&format!("<html>{}</html>", outcome.html), true);
        assert_eq!(again.html, outcome.html);
    }

    #[test]
    fn lifts_iframes_out_of_paragraphs() {
        let fixture = Fixture::new(false);
        let alone = fixture.run("<html><p> <iframe src=\"https://player.vimeo.com/video/1\"></iframe> </p></html>", true);
        assert_eq!(
            alone.html,
            "<div class=\"videoWrapper\"><iframe src=\"https://player.vimeo.com/video/1\"></iframe></div>"
        );

        let inline = fixture.run(
            "<html><p>before <iframe src=\"https://player.vimeo.com/video/1\"></iframe> after</p></html>",
            true,
        );
        assert_eq!(
            inline.html,
            "<p>before </p><div class=\"videoWrapper\"><iframe src=\"https://player.vimeo.com/video/1\"></iframe></div><p> after</p>"
        );
        assert!(!inline.html.contains("<p></p>"));
    }

    #[test]
    fn replaces_phishing_anchors() {
        let html = "<html><p><a href=\"https://evil.test/\">example.com/login</a></p></html>";
        let outcome = Fixture::new(false).run(html, true);
        assert!(outcome.html.contains("class=\"phishy\""));
        assert!(outcome.html.contains("example.com/login / https://evil.test/"));
        assert!(!outcome.html.contains("<a "));
    }

    #[test]
    fn absolutizes_relative_links_only() {
        let html = "<html><a href=\"/x\">a</a><a href=\"#top\">b</a><a href=\"vessel://op\">c</a></html>";
        let outcome = Fixture::new(false).run(html, true);
        assert!(outcome.html.contains("href=\"https://example.com/x\""));
        assert!(outcome.html.contains("href=\"#top\""));
        assert!(outcome.html.contains("href=\"vessel://op\""));
    }

    #[test]
    fn inspection_mode_collects_without_rewriting() {
        let html = "<html><p>@noisy <img src=\"/ipfs/QmCid\"></p></html>";
        let outcome = Fixture::new(false).run(html, false);
        assert_eq!(outcome.html, "<p>@noisy <img src=\"/ipfs/QmCid\"></p>");
        assert!(outcome.state.usertags.contains("noisy"));
        assert!(outcome.state.images.contains("/ipfs/QmCid"));
    }

    #[test]
    fn records_script_tags_placed_in_head() {
        let outcome = Fixture::new(false).run("<html><script src=\"\"></script></html>", true);
        assert!(outcome.state.html_tags.contains("script"));
    }
}

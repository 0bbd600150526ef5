//! Turns bare URLs, `#hashtags` and `@mentions` found in text nodes into links.
//!
//! Media URLs are swapped for embed markers before anything else is linked. The
//! remaining text is scanned once; URLs win over hashtags, hashtags win over
//! mentions, and nothing is linked inside a marker.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::application::render::options::RenderConfig;
use crate::application::render::types::ParseState;
use crate::domain::account_name::AccountNameValidator;
use crate::domain::localization::LocalizationStrings;

use super::embed;
use super::images::{looks_like_image, proxied_src};
use super::markup::{escape_attr, escape_text};
use super::phishing::{PhishingDetector, warning_html};

static BARE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bhttps?://[^\s<>"'`“”‘’]*[^\s<>"'`“”‘’.,;:!?)\]]"#).expect("url regex must compile")
});

static HASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|\s)(#[-a-z\d]+)").expect("hashtag regex must compile"));

static MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|[^a-z0-9_!#$%&*@＠/])[@＠]([a-z][-.a-z\d]+[a-z\d])")
        .expect("mention regex must compile")
});

const UNLINKED_EXTENSIONS: [&str; 2] = [".zip", ".exe"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'t> {
    Url(&'t str),
    /// Tag without the leading `#`.
    Hashtag(&'t str),
    /// Account name without the leading `@`.
    Mention(&'t str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Found<'t> {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) token: Token<'t>,
}

/// Every linkable token in `text`, ordered by position and never overlapping
/// each other or a `protected` span.
pub(crate) fn scan<'t>(
    text: &'t str,
    protected: &[(usize, usize)],
    accounts: &AccountNameValidator,
) -> Vec<Found<'t>> {
    let mut taken: Vec<(usize, usize)> = protected.to_vec();
    let mut found = Vec::new();

    let mut claim = |start: usize, end: usize, token: Token<'t>, found: &mut Vec<Found<'t>>| {
        if taken.iter().any(|&(s, e)| start < e && s < end) {
            return;
        }
        taken.push((start, end));
        found.push(Found { start, end, token });
    };

    for m in BARE_URL.find_iter(text) {
        claim(m.start(), m.end(), Token::Url(m.as_str()), &mut found);
    }

    for caps in HASHTAG.captures_iter(text) {
        let Some(tag) = caps.get(2) else { continue };
        let name = &tag.as_str()[1..];
        if name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        claim(tag.start(), tag.end(), Token::Hashtag(name), &mut found);
    }

    for caps in MENTION.captures_iter(text) {
        let (Some(lead), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if !accounts.is_valid(&name.as_str().to_lowercase()) {
            continue;
        }
        claim(lead.end(), name.end(), Token::Mention(name.as_str()), &mut found);
    }

    found.sort_by_key(|f| f.start);
    found
}

pub(crate) struct Linkifier<'a> {
    pub(crate) config: &'a RenderConfig,
    pub(crate) phishing: &'a PhishingDetector,
    pub(crate) accounts: &'a AccountNameValidator,
    pub(crate) strings: &'a LocalizationStrings,
}

impl Linkifier<'_> {
    /// Record everything linkable in `text` and, when `mutate` is set, return
    /// the HTML that should replace the text node. `None` means the node stays.
    pub(crate) fn rewrite(&self, text: &str, state: &mut ParseState, mutate: bool) -> Option<String> {
        let marked = mark_embeds(text, state);
        let protected: Vec<(usize, usize)> = embed::marker_spans(&marked).collect();
        let tokens = scan(&marked, &protected, self.accounts);

        if tokens.is_empty() && marked == text {
            return None;
        }

        let mut html = String::with_capacity(marked.len() + tokens.len() * 32);
        let mut cursor = 0;
        for found in &tokens {
            html.push_str(&escape_text(&marked[cursor..found.start]));
            let raw = &marked[found.start..found.end];
            html.push_str(&self.token_html(found.token, raw, state));
            cursor = found.end;
        }
        html.push_str(&escape_text(&marked[cursor..]));

        mutate.then_some(html)
    }

    fn token_html(&self, token: Token<'_>, raw: &str, state: &mut ParseState) -> String {
        match token {
            Token::Url(url) => self.url_html(url, state),
            Token::Hashtag(tag) => {
                let lower = tag.to_lowercase();
                let href = (self.config.hashtag_url_fn)(&lower);
                state.hashtags.insert(lower);
                format!("<a href=\"{}\">{}</a>", escape_attr(&href), escape_text(raw))
            }
            Token::Mention(name) => {
                let lower = name.to_lowercase();
                let href = (self.config.usertag_url_fn)(&lower);
                state.usertags.insert(lower);
                format!("<a href=\"{}\">{}</a>", escape_attr(&href), escape_text(raw))
            }
        }
    }

    fn url_html(&self, url: &str, state: &mut ParseState) -> String {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        if UNLINKED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return escape_text(url);
        }

        if looks_like_image(url) {
            state.images.insert(url.to_string());
            if !self.config.do_not_show_images {
                return format!(
                    "<img src=\"{}\" />",
                    escape_attr(&proxied_src(url, self.config))
                );
            }
        } else {
            state.links.insert(url.to_string());
        }

        if self.phishing.is_phishy(url, url) {
            return warning_html(url, url, &self.strings.phishing_warning);
        }

        format!(
            "<a href=\"{}\">{}</a>",
            escape_attr(url),
            escape_text(url)
        )
    }
}

/// Swap every recognized media URL for its embed marker, recording the media
/// link and thumbnail.
fn mark_embeds(text: &str, state: &mut ParseState) -> String {
    let mut marked = String::with_capacity(text.len());
    let mut cursor = 0;

    for m in BARE_URL.find_iter(text) {
        let Some((provider, meta)) = embed::detect(m.as_str()) else {
            continue;
        };
        marked.push_str(&text[cursor..m.start()]);
        marked.push_str(&embed::marker(provider, &meta.id));
        cursor = m.end();

        state.links.insert(meta.url);
        if let Some(image) = meta.image {
            state.images.insert(image);
        }
    }

    if cursor == 0 {
        return text.to_string();
    }
    marked.push_str(&text[cursor..]);
    marked
}

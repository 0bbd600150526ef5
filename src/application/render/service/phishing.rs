//! Link-safety heuristic applied to anchors and linkified URLs.
//!
//! A link is suspicious when the text a reader sees names a host this site
//! trusts while the target resolves somewhere else, or when the target is a host
//! already known to serve phishing pages.

use regex::Regex;
use url::Url;

use crate::application::render::options::RenderConfig;
use crate::domain::error::ValidationError;

use super::markup::{escape_attr, escape_text};

pub(crate) struct PhishingDetector {
    base_url: Url,
    trusted_hosts: Vec<String>,
    phishing_hosts: Vec<String>,
    mentions: Vec<Regex>,
}

impl PhishingDetector {
    pub(crate) fn new(config: &RenderConfig) -> Result<Self, ValidationError> {
        let mut trusted_hosts = Vec::with_capacity(config.trusted_hosts.len() + 1);
        if let Some(base) = config.base_host() {
            trusted_hosts.push(base.to_ascii_lowercase());
        }
        for host in &config.trusted_hosts {
            if !trusted_hosts.contains(host) {
                trusted_hosts.push(host.clone());
            }
        }

        let mentions = trusted_hosts
            .iter()
            .map(|host| {
                let pattern = format!(
                    r"(?i)(?:^|[^a-z0-9.\-])(?:www\.)?{}(?:$|[^a-z0-9\-])",
                    regex::escape(host)
                );
                Regex::new(&pattern).map_err(|err| {
                    ValidationError::new("trusted_hosts", format!("unusable host `{host}`: {err}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base_url: config.base_url.clone(),
            trusted_hosts,
            phishing_hosts: config.phishing_hosts.clone(),
            mentions,
        })
    }

    /// `text` is what the reader sees, `href` is where the link actually goes.
    pub(crate) fn is_phishy(&self, text: &str, href: &str) -> bool {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return false;
        }

        let Some(host) = self.resolve_host(href) else {
            return false;
        };

        if self
            .phishing_hosts
            .iter()
            .any(|known| host_matches(&host, known))
        {
            return true;
        }

        if self.trusted_hosts.iter().any(|trusted| host == *trusted) {
            return false;
        }

        self.mentions.iter().any(|pattern| pattern.is_match(text))
    }

    fn resolve_host(&self, href: &str) -> Option<String> {
        let url = match Url::parse(href) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base_url.join(href).ok()?,
            Err(_) => return None,
        };
        let host = url.host_str()?.to_ascii_lowercase();
        Some(match host.strip_prefix("www.") {
            Some(stripped) => stripped.to_string(),
            None => host,
        })
    }
}

/// Inert stand-in for a suspicious link: the reader sees both the text and the
/// real target, and nothing is clickable.
pub(crate) fn warning_html(text: &str, href: &str, warning: &str) -> String {
    format!(
        "<div title=\"{}\" class=\"phishy\">{} / {}</div>",
        escape_attr(warning),
        escape_text(text),
        escape_text(href)
    )
}

fn host_matches(host: &str, known: &str) -> bool {
    host == known
        || host
            .strip_suffix(known)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> PhishingDetector {
        let config = RenderConfig::builder("https://www.example.com")
            .trusted_hosts(["images.example.net"])
            .phishing_hosts(["steemit.co"])
            .image_proxy_fn(|url| url.to_string())
            .hashtag_url_fn(|tag| tag.to_string())
            .usertag_url_fn(|name| name.to_string())
            .is_link_safe_fn(|_| true)
            .add_external_css_class_to_matching_links_fn(|_| false)
            .build()
            .expect("valid configuration");
        PhishingDetector::new(&config).expect("detector")
    }

    #[test]
    fn flags_text_naming_base_host_with_foreign_target() {
        let detector = detector();
        assert!(detector.is_phishy("https://example.com/login", "https://evil.test/login"));
        assert!(detector.is_phishy("www.example.com", "https://evil.test"));
    }

    #[test]
    fn accepts_matching_hosts() {
        let detector = detector();
        assert!(!detector.is_phishy("example.com/page", "https://example.com/page"));
        assert!(!detector.is_phishy("example.com", "https://www.example.com/"));
        assert!(!detector.is_phishy("images.example.net", "https://images.example.net/a.png"));
        assert!(!detector.is_phishy("example.com", "/relative/path"));
    }

    #[test]
    fn ignores_fragments_and_unrelated_text() {
        let detector = detector();
        assert!(!detector.is_phishy("example.com", "#section"));
        assert!(!detector.is_phishy("click here", "https://other.test"));
        assert!(!detector.is_phishy("myexample.com", "https://other.test"));
    }

    #[test]
    fn warning_html_shows_text_and_target() {
        assert_eq!(
            warning_html("example.com", "https://evil.test/?a=1&b=2", "Careful"),
            "<div title=\"Careful\" class=\"phishy\">example.com / https://evil.test/?a=1&amp;b=2</div>"
        );
    }

    #[test]
    fn known_phishing_hosts_always_flagged() {
        let detector = detector();
        assert!(detector.is_phishy("free tokens", "https://steemit.co/claim"));
        assert!(detector.is_phishy("free tokens", "https://login.steemit.co/"));
        assert!(!detector.is_phishy("free tokens", "https://notsteemit.co/"));
    }
}

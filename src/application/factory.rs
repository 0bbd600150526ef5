//! Builds the long-lived renderer instances from resolved settings.
//!
//! Two renderers are kept for the lifetime of the process: the standard one and
//! one that replaces images with their URL. Both share the same injected
//! functions, derived here from the URL templates and host lists.

use std::sync::Arc;

use url::Url;

use crate::application::render::{RenderConfig, RenderPlugin, Renderer, SpoilerPlugin};
use crate::config::{HASHTAG_PLACEHOLDER, RendererSettings, USERTAG_PLACEHOLDER};
use crate::domain::error::ValidationError;

pub struct Renderers {
    pub standard: Renderer,
    pub images_hidden: Renderer,
}

impl Renderers {
    pub fn select(&self, images_hidden: bool) -> &Renderer {
        if images_hidden {
            &self.images_hidden
        } else {
            &self.standard
        }
    }
}

#[derive(Debug, Clone)]
pub struct RendererFactory {
    settings: RendererSettings,
}

impl RendererFactory {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn build(&self) -> Result<Renderers, ValidationError> {
        let config = self.render_config()?;
        let hidden = config.with_images_hidden(true);
        let strings = self.settings.localization.clone();
        let spoiler: Arc<dyn RenderPlugin> = Arc::new(SpoilerPlugin);

        Ok(Renderers {
            standard: Renderer::new(config, strings.clone())?.with_plugin(spoiler.clone()),
            images_hidden: Renderer::new(hidden, strings)?.with_plugin(spoiler),
        })
    }

    pub fn render_config(&self) -> Result<RenderConfig, ValidationError> {
        let settings = &self.settings;
        let proxy_prefix = settings.image_proxy_prefix.clone();
        let hashtag_template = settings.hashtag_url_template.clone();
        let usertag_template = settings.usertag_url_template.clone();
        let links = LinkPolicy::new(settings);
        let external = links.clone();

        RenderConfig::builder(settings.base_url.as_str())
            .breaks(settings.breaks)
            .skip_sanitization(settings.skip_sanitization)
            .allow_insecure_script_tags(settings.allow_insecure_script_tags)
            .add_nofollow_to_links(settings.add_nofollow_to_links)
            .add_target_blank_to_links(settings.add_target_blank_to_links)
            .css_class_for_internal_links(settings.internal_link_class.clone())
            .css_class_for_external_links(settings.external_link_class.clone())
            .ipfs_prefix(settings.ipfs_prefix.clone())
            .embed_size(settings.iframe_width.get(), settings.iframe_height.get())
            .trusted_hosts(settings.trusted_hosts.iter())
            .phishing_hosts(settings.phishing_hosts.iter())
            .bad_actors(settings.bad_actors.iter())
            .image_proxy_fn(move |url| proxy_image(&proxy_prefix, url))
            .hashtag_url_fn(move |tag| hashtag_template.replace(HASHTAG_PLACEHOLDER, tag))
            .usertag_url_fn(move |name| usertag_template.replace(USERTAG_PLACEHOLDER, name))
            .is_link_safe_fn(move |href| links.is_safe(href))
            .add_external_css_class_to_matching_links_fn(move |href| !external.is_internal(href))
            .build()
    }
}

fn proxy_image(prefix: &str, url: &str) -> String {
    if prefix.is_empty() || url.starts_with(prefix) {
        return url.to_string();
    }
    format!("{}/0x0/{url}", prefix.trim_end_matches('/'))
}

/// Host-based link classification shared by the safety and CSS predicates.
#[derive(Debug, Clone)]
struct LinkPolicy {
    base: Url,
    own_hosts: Arc<[String]>,
    phishing_hosts: Arc<[String]>,
}

impl LinkPolicy {
    fn new(settings: &RendererSettings) -> Self {
        let own_hosts = settings
            .base_url
            .host_str()
            .into_iter()
            .map(normalize_host)
            .chain(settings.trusted_hosts.iter().map(|host| normalize_host(host)))
            .collect();
        let phishing_hosts = settings
            .phishing_hosts
            .iter()
            .map(|host| normalize_host(host))
            .collect();

        Self {
            base: settings.base_url.clone(),
            own_hosts,
            phishing_hosts,
        }
    }

    fn host_of(&self, href: &str) -> Option<String> {
        self.base
            .join(href)
            .ok()
            .and_then(|url| url.host_str().map(normalize_host))
    }

    /// Relative links and links to the site or a trusted host.
    fn is_internal(&self, href: &str) -> bool {
        if href.starts_with('#') || (!href.contains("//") && !href.contains(':')) {
            return true;
        }
        self.host_of(href)
            .is_some_and(|host| self.own_hosts.iter().any(|own| *own == host))
    }

    fn is_safe(&self, href: &str) -> bool {
        match self.host_of(href) {
            Some(host) => !self.phishing_hosts.iter().any(|bad| {
                host == *bad || host.strip_suffix(bad.as_str()).is_some_and(|sub| sub.ends_with('.'))
            }),
            None => true,
        }
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

//! Renderer configuration.
//!
//! A [`RenderConfig`] is assembled once per renderer variant and then shared by
//! every render call. The five injected functions must be pure: they are called
//! concurrently from any thread that renders through the same instance.

use std::{fmt, sync::Arc};

use url::Url;

use crate::domain::error::ValidationError;

/// Rewrites an image URL, typically to route it through an image proxy.
pub type ImageProxyFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// Builds the link target for a lowercased hashtag.
pub type HashtagUrlFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// Builds the link target for a lowercased account name.
pub type UsertagUrlFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// Returns `true` for link targets that can be followed without a warning.
pub type LinkPredicateFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

pub const DEFAULT_IFRAME_WIDTH: u32 = 640;
pub const DEFAULT_IFRAME_HEIGHT: u32 = 480;
pub const DEFAULT_INTERNAL_LINK_CLASS: &str = "internal-link";
pub const DEFAULT_EXTERNAL_LINK_CLASS: &str = "external-link";

/// Width and height forced onto every embedded iframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone)]
pub struct RenderConfig {
    pub base_url: Url,
    pub breaks: bool,
    pub skip_sanitization: bool,
    pub allow_insecure_script_tags: bool,
    pub add_nofollow_to_links: bool,
    pub add_target_blank_to_links: bool,
    pub css_class_for_internal_links: String,
    pub css_class_for_external_links: String,
    pub do_not_show_images: bool,
    pub ipfs_prefix: String,
    pub embed_size: EmbedSize,
    /// Hosts whose links are never treated as phishing, besides the base host.
    pub trusted_hosts: Vec<String>,
    /// Hosts known to serve phishing pages; links to them are always neutralized.
    pub phishing_hosts: Vec<String>,
    /// Account names that are never linked as mentions.
    pub bad_actors: Vec<String>,
    pub image_proxy_fn: ImageProxyFn,
    pub hashtag_url_fn: HashtagUrlFn,
    pub usertag_url_fn: UsertagUrlFn,
    pub is_link_safe_fn: LinkPredicateFn,
    pub add_external_css_class_to_matching_links_fn: LinkPredicateFn,
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("base_url", &self.base_url.as_str())
            .field("breaks", &self.breaks)
            .field("skip_sanitization", &self.skip_sanitization)
            .field(
                "allow_insecure_script_tags",
                &self.allow_insecure_script_tags,
            )
            .field("add_nofollow_to_links", &self.add_nofollow_to_links)
            .field("add_target_blank_to_links", &self.add_target_blank_to_links)
            .field(
                "css_class_for_internal_links",
                &self.css_class_for_internal_links,
            )
            .field(
                "css_class_for_external_links",
                &self.css_class_for_external_links,
            )
            .field("do_not_show_images", &self.do_not_show_images)
            .field("ipfs_prefix", &self.ipfs_prefix)
            .field("embed_size", &self.embed_size)
            .field("trusted_hosts", &self.trusted_hosts)
            .field("phishing_hosts", &self.phishing_hosts)
            .field("bad_actors", &self.bad_actors.len())
            .finish_non_exhaustive()
    }
}

impl RenderConfig {
    pub fn builder(base_url: impl Into<String>) -> RenderConfigBuilder {
        RenderConfigBuilder::new(base_url)
    }

    /// Host of the base URL without a leading `www.`.
    pub fn base_host(&self) -> Option<&str> {
        self.base_url
            .host_str()
            .map(|host| host.strip_prefix("www.").unwrap_or(host))
    }

    /// Copy of this configuration with image hiding switched on or off.
    pub fn with_images_hidden(&self, hidden: bool) -> Self {
        Self {
            do_not_show_images: hidden,
            ..self.clone()
        }
    }
}

/// Collects configuration values; [`RenderConfigBuilder::build`] validates them.
pub struct RenderConfigBuilder {
    base_url: String,
    breaks: bool,
    skip_sanitization: bool,
    allow_insecure_script_tags: bool,
    add_nofollow_to_links: bool,
    add_target_blank_to_links: bool,
    css_class_for_internal_links: String,
    css_class_for_external_links: String,
    do_not_show_images: bool,
    ipfs_prefix: String,
    embed_size: EmbedSize,
    trusted_hosts: Vec<String>,
    phishing_hosts: Vec<String>,
    bad_actors: Vec<String>,
    image_proxy_fn: Option<ImageProxyFn>,
    hashtag_url_fn: Option<HashtagUrlFn>,
    usertag_url_fn: Option<UsertagUrlFn>,
    is_link_safe_fn: Option<LinkPredicateFn>,
    add_external_css_class_to_matching_links_fn: Option<LinkPredicateFn>,
}

impl RenderConfigBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            breaks: true,
            skip_sanitization: false,
            allow_insecure_script_tags: false,
            add_nofollow_to_links: true,
            add_target_blank_to_links: true,
            css_class_for_internal_links: DEFAULT_INTERNAL_LINK_CLASS.to_string(),
            css_class_for_external_links: DEFAULT_EXTERNAL_LINK_CLASS.to_string(),
            do_not_show_images: false,
            ipfs_prefix: String::new(),
            embed_size: EmbedSize {
                width: DEFAULT_IFRAME_WIDTH,
                height: DEFAULT_IFRAME_HEIGHT,
            },
            trusted_hosts: Vec::new(),
            phishing_hosts: Vec::new(),
            bad_actors: Vec::new(),
            image_proxy_fn: None,
            hashtag_url_fn: None,
            usertag_url_fn: None,
            is_link_safe_fn: None,
            add_external_css_class_to_matching_links_fn: None,
        }
    }

    pub fn breaks(mut self, breaks: bool) -> Self {
        self.breaks = breaks;
        self
    }

    pub fn skip_sanitization(mut self, skip: bool) -> Self {
        self.skip_sanitization = skip;
        self
    }

    pub fn allow_insecure_script_tags(mut self, allow: bool) -> Self {
        self.allow_insecure_script_tags = allow;
        self
    }

    pub fn add_nofollow_to_links(mut self, add: bool) -> Self {
        self.add_nofollow_to_links = add;
        self
    }

    pub fn add_target_blank_to_links(mut self, add: bool) -> Self {
        self.add_target_blank_to_links = add;
        self
    }

    pub fn css_class_for_internal_links(mut self, class: impl Into<String>) -> Self {
        self.css_class_for_internal_links = class.into();
        self
    }

    pub fn css_class_for_external_links(mut self, class: impl Into<String>) -> Self {
        self.css_class_for_external_links = class.into();
        self
    }

    pub fn do_not_show_images(mut self, hidden: bool) -> Self {
        self.do_not_show_images = hidden;
        self
    }

    pub fn ipfs_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ipfs_prefix = prefix.into();
        self
    }

    pub fn embed_size(mut self, width: u32, height: u32) -> Self {
        self.embed_size = EmbedSize { width, height };
        self
    }

    pub fn trusted_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn phishing_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phishing_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn bad_actors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bad_actors = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn image_proxy_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.image_proxy_fn = Some(Arc::new(f));
        self
    }

    pub fn hashtag_url_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.hashtag_url_fn = Some(Arc::new(f));
        self
    }

    pub fn usertag_url_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.usertag_url_fn = Some(Arc::new(f));
        self
    }

    pub fn is_link_safe_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.is_link_safe_fn = Some(Arc::new(f));
        self
    }

    pub fn add_external_css_class_to_matching_links_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.add_external_css_class_to_matching_links_fn = Some(Arc::new(f));
        self
    }

    /// Validate every field and produce the immutable configuration. The error
    /// names the first field that failed.
    pub fn build(self) -> Result<RenderConfig, ValidationError> {
        let base_url = parse_http_url("base_url", &self.base_url)?;

        validate_css_class(
            "css_class_for_internal_links",
            &self.css_class_for_internal_links,
        )?;
        validate_css_class(
            "css_class_for_external_links",
            &self.css_class_for_external_links,
        )?;

        let ipfs_prefix = self.ipfs_prefix.trim().trim_end_matches('/').to_string();
        if !ipfs_prefix.is_empty() {
            parse_http_url("ipfs_prefix", &ipfs_prefix)?;
        }

        if self.embed_size.width == 0 {
            return Err(ValidationError::new(
                "embed_size.width",
                "must be greater than zero",
            ));
        }
        if self.embed_size.height == 0 {
            return Err(ValidationError::new(
                "embed_size.height",
                "must be greater than zero",
            ));
        }

        let image_proxy_fn = self
            .image_proxy_fn
            .ok_or_else(|| ValidationError::missing("image_proxy_fn"))?;
        let hashtag_url_fn = self
            .hashtag_url_fn
            .ok_or_else(|| ValidationError::missing("hashtag_url_fn"))?;
        let usertag_url_fn = self
            .usertag_url_fn
            .ok_or_else(|| ValidationError::missing("usertag_url_fn"))?;
        let is_link_safe_fn = self
            .is_link_safe_fn
            .ok_or_else(|| ValidationError::missing("is_link_safe_fn"))?;
        let add_external_css_class_to_matching_links_fn = self
            .add_external_css_class_to_matching_links_fn
            .ok_or_else(|| {
                ValidationError::missing("add_external_css_class_to_matching_links_fn")
            })?;

        Ok(RenderConfig {
            base_url,
            breaks: self.breaks,
            skip_sanitization: self.skip_sanitization,
            allow_insecure_script_tags: self.allow_insecure_script_tags,
            add_nofollow_to_links: self.add_nofollow_to_links,
            add_target_blank_to_links: self.add_target_blank_to_links,
            css_class_for_internal_links: self.css_class_for_internal_links,
            css_class_for_external_links: self.css_class_for_external_links,
            do_not_show_images: self.do_not_show_images,
            ipfs_prefix,
            embed_size: self.embed_size,
            trusted_hosts: normalize_hosts(self.trusted_hosts),
            phishing_hosts: normalize_hosts(self.phishing_hosts),
            bad_actors: self.bad_actors,
            image_proxy_fn,
            hashtag_url_fn,
            usertag_url_fn,
            is_link_safe_fn,
            add_external_css_class_to_matching_links_fn,
        })
    }
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty(field));
    }

    let url = Url::parse(trimmed)
        .map_err(|err| ValidationError::new(field, format!("not an absolute URL: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::new(field, "scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(ValidationError::new(field, "URL must include a host"));
    }
    Ok(url)
}

fn validate_css_class(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::new(
            field,
            "must be a single class name without whitespace",
        ));
    }
    Ok(())
}

fn normalize_hosts(hosts: Vec<String>) -> Vec<String> {
    hosts
        .into_iter()
        .map(|host| {
            let lowered = host.trim().to_ascii_lowercase();
            lowered
                .strip_prefix("www.")
                .map(str::to_string)
                .unwrap_or(lowered)
        })
        .filter(|host| !host.is_empty())
        .collect()
}

mod config;
mod dom;
mod embed;
mod iframes;
mod images;
mod linkify;
mod markup;
mod phishing;
mod preliminary;
mod quotes;
mod sanitize;
mod security;

use std::sync::Arc;

use comrak::{Arena, format_html, parse_document};
use tracing::{debug, debug_span};

use crate::application::render::options::RenderConfig;
use crate::application::render::plugins::{RenderPlugin, run_post_process, run_pre_process};
use crate::application::render::types::{ParseState, RenderError, RenderService, RenderedDocument};
use crate::domain::account_name::AccountNameValidator;
use crate::domain::error::ValidationError;
use crate::domain::localization::LocalizationStrings;

pub use embed::{EmbedMetadata, EmbedProvider};

use dom::{DomOutcome, DomPass};
use embed::EmbedContext;
use phishing::PhishingDetector;

/// Markdown/HTML to safe HTML pipeline for untrusted post and comment bodies.
///
/// A renderer is built once per configuration and shared; every call works on
/// its own document and [`ParseState`], so concurrent calls never interact.
pub struct Renderer {
    config: RenderConfig,
    strings: LocalizationStrings,
    accounts: AccountNameValidator,
    phishing: PhishingDetector,
    markdown: comrak::Options<'static>,
    sanitizer: ammonia::Builder<'static>,
    plugins: Vec<Arc<dyn RenderPlugin>>,
}

impl Renderer {
    /// Validate the localization strings and assemble the pipeline. The
    /// configuration itself was validated when it was built.
    pub fn new(config: RenderConfig, strings: LocalizationStrings) -> Result<Self, ValidationError> {
        strings.validate()?;

        let phishing = PhishingDetector::new(&config)?;
        let accounts = AccountNameValidator::new(&config.bad_actors);
        let markdown = config::markdown_options(config.breaks);
        let sanitizer = config::build_sanitizer(&strings.phishing_warning);

        Ok(Self {
            config,
            strings,
            accounts,
            phishing,
            markdown,
            sanitizer,
            plugins: Vec::new(),
        })
    }

    /// Append a plugin; plugins run in the order they were added.
    pub fn with_plugin(mut self, plugin: Arc<dyn RenderPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn localization(&self) -> &LocalizationStrings {
        &self.strings
    }

    pub fn account_names(&self) -> &AccountNameValidator {
        &self.accounts
    }

    /// Render `body` into safe HTML.
    pub fn render(&self, body: &str) -> Result<String, RenderError> {
        self.render_document(body).map(|document| document.html)
    }

    /// Render `body` and return the tags, mentions, links and images found in it.
    pub fn render_document(&self, body: &str) -> Result<RenderedDocument, RenderError> {
        let span = debug_span!("render", bytes = body.len());
        let _entered = span.enter();

        let wrapped = self.prepare_stage(body)?;
        let DomOutcome { html, state } = self.dom_stage(&wrapped, true)?;
        let html = self.sanitize_stage(html)?;
        security::check(&html, &state, self.config.allow_insecure_script_tags)?;
        let html = self.embed_stage(&html);
        let html = run_post_process(&self.plugins, html);

        debug!(
            target = "application::render",
            hashtags = state.hashtags.len(),
            usertags = state.usertags.len(),
            links = state.links.len(),
            images = state.images.len(),
            "Rendered body"
        );

        Ok(RenderedDocument { html, state })
    }

    /// Collect what [`Renderer::render_document`] would report without
    /// rewriting, sanitizing or embedding anything.
    pub fn extract_metadata(&self, body: &str) -> Result<ParseState, RenderError> {
        let wrapped = self.prepare_stage(body)?;
        let DomOutcome { state, .. } = self.dom_stage(&wrapped, false)?;
        Ok(state)
    }

    fn prepare_stage(&self, body: &str) -> Result<String, RenderError> {
        if body.trim().is_empty() {
            return Err(ValidationError::empty("body").into());
        }

        let text = run_pre_process(&self.plugins, body.to_string());
        let text = preliminary::strip_comments(&text);
        let html = if preliminary::is_html(&text) {
            text
        } else {
            self.markdown_stage(&text)?
        };
        Ok(preliminary::wrap_root(html))
    }

    fn markdown_stage(&self, text: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, text, &self.markdown);
        quotes::curl_quotes(root);
        let mut html = String::new();
        format_html(root, &self.markdown, &mut html)
            .map_err(|err| RenderError::document(err.to_string()))?;
        Ok(html)
    }

    fn dom_stage(&self, html: &str, mutate: bool) -> Result<DomOutcome, RenderError> {
        DomPass {
            config: &self.config,
            phishing: &self.phishing,
            accounts: &self.accounts,
            strings: &self.strings,
        }
        .run(html, mutate)
    }

    fn sanitize_stage(&self, html: String) -> Result<String, RenderError> {
        if self.config.skip_sanitization {
            return Ok(html);
        }
        sanitize::sanitize(&html, &self.sanitizer, &self.config, &self.strings)
    }

    fn embed_stage(&self, html: &str) -> String {
        let ctx = EmbedContext {
            width: self.config.embed_size.width,
            height: self.config.embed_size.height,
            parent_domain: self.config.base_url.host_str(),
        };
        embed::expand_markers(html, &ctx)
    }
}

impl RenderService for Renderer {
    fn render(&self, body: &str) -> Result<String, RenderError> {
        Renderer::render(self, body)
    }
}

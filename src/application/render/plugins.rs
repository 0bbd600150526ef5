//! Whole-text transforms that run around the core pipeline.
//!
//! `pre_process` sees the raw body before any parsing, `post_process` sees the
//! final HTML after embeds are expanded. Plugins run in registration order and
//! a plugin that returns `None` leaves the text unchanged for that phase.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub trait RenderPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn pre_process(&self, _text: &str) -> Option<String> {
        None
    }

    fn post_process(&self, _html: &str) -> Option<String> {
        None
    }
}

pub(crate) fn run_pre_process(plugins: &[Arc<dyn RenderPlugin>], text: String) -> String {
    plugins
        .iter()
        .fold(text, |acc, plugin| plugin.pre_process(&acc).unwrap_or(acc))
}

pub(crate) fn run_post_process(plugins: &[Arc<dyn RenderPlugin>], html: String) -> String {
    plugins
        .iter()
        .fold(html, |acc, plugin| plugin.post_process(&acc).unwrap_or(acc))
}

static SPOILER_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<blockquote>\s*<p>\s*!\s*(?:\[([^\]<]*)\])?\s*(.*?)</p>\s*</blockquote>")
        .expect("spoiler regex must compile")
});

const DEFAULT_SPOILER_TITLE: &str = "Reveal spoiler";

/// Turns a quote whose text starts with `!` into a collapsed `<details>` block.
/// `> ! [Title] hidden text` uses `Title` as the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpoilerPlugin;

impl RenderPlugin for SpoilerPlugin {
    fn name(&self) -> &'static str {
        "spoiler"
    }

    fn post_process(&self, html: &str) -> Option<String> {
        if !SPOILER_BLOCK.is_match(html) {
            return None;
        }

        let rewritten = SPOILER_BLOCK.replace_all(html, |caps: &Captures<'_>| {
            let title = caps
                .get(1)
                .map(|m| m.as_str().trim())
                .filter(|title| !title.is_empty())
                .unwrap_or(DEFAULT_SPOILER_TITLE);
            let body = caps.get(2).map_or("", |m| m.as_str());
            format!(
                "<details class=\"spoiler\"><summary>{title}</summary><p>{body}</p></details>"
            )
        });
        Some(rewritten.into_owned())
    }
}

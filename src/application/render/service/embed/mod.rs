//! Rich media embeds.
//!
//! Embedding runs in two phases. While the DOM is walked, a recognized media URL
//! inside a text node is swapped for a plain-text marker
//! `~~~ embed:<id> <type> ~~~`. Markers are ordinary text, so they pass through
//! the tag sanitizer untouched; once the document is clean they are expanded into
//! sized iframes. The marker format is reserved: user text that already contains
//! it is expanded like a generated marker.

mod spotify;
mod threespeak;
mod twitch;
mod vimeo;
mod youtube;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::warn;

use super::markup::escape_attr;

pub(crate) use spotify::SPOTIFY_KINDS;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"~~~ embed:([A-Za-z0-9?=_\-/.]+) ([a-z]+) ~~~").expect("marker regex must compile")
});

/// What a provider extracted from a media URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedMetadata {
    /// Provider-specific identifier carried inside the marker.
    pub id: String,
    /// The URL as it appeared in the text.
    pub url: String,
    /// Thumbnail, when the provider publishes one.
    pub image: Option<String>,
    /// Canonical page for the media.
    pub link: Option<String>,
}

/// Rendering parameters shared by every embed in one document.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EmbedContext<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Host the page is served from; some players refuse to load without it.
    pub(crate) parent_domain: Option<&'a str>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum EmbedError {
    #[error("no embed provider is registered for type `{0}`")]
    UnknownType(String),
    #[error("{provider} cannot embed id `{id}`")]
    InvalidId { provider: &'static str, id: String },
    #[error("{provider} embeds require a parent domain")]
    MissingParent { provider: &'static str },
}

impl EmbedError {
    fn invalid_id(provider: EmbedProvider, id: &str) -> Self {
        Self::InvalidId {
            provider: provider.kind(),
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedProvider {
    YouTube,
    Vimeo,
    Twitch,
    Spotify,
    ThreeSpeak,
}

impl EmbedProvider {
    /// Providers in the order they are tried; the first match wins.
    pub const ALL: [EmbedProvider; 5] = [
        EmbedProvider::YouTube,
        EmbedProvider::Vimeo,
        EmbedProvider::Twitch,
        EmbedProvider::Spotify,
        EmbedProvider::ThreeSpeak,
    ];

    pub fn kind(self) -> &'static str {
        match self {
            EmbedProvider::YouTube => "youtube",
            EmbedProvider::Vimeo => "vimeo",
            EmbedProvider::Twitch => "twitch",
            EmbedProvider::Spotify => "spotify",
            EmbedProvider::ThreeSpeak => "threespeak",
        }
    }

    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|provider| provider.kind() == kind)
    }

    pub fn metadata(self, url: &str) -> Option<EmbedMetadata> {
        match self {
            EmbedProvider::YouTube => youtube::metadata(url),
            EmbedProvider::Vimeo => vimeo::metadata(url),
            EmbedProvider::Twitch => twitch::metadata(url),
            EmbedProvider::Spotify => spotify::metadata(url),
            EmbedProvider::ThreeSpeak => threespeak::metadata(url),
        }
    }

    fn player_src(self, id: &str, ctx: &EmbedContext<'_>) -> Result<String, EmbedError> {
        match self {
            EmbedProvider::YouTube => youtube::player_src(id),
            EmbedProvider::Vimeo => vimeo::player_src(id),
            EmbedProvider::Twitch => twitch::player_src(id, ctx.parent_domain),
            EmbedProvider::Spotify => spotify::player_src(id),
            EmbedProvider::ThreeSpeak => threespeak::player_src(id),
        }
    }

    pub(crate) fn build_embed(self, id: &str, ctx: &EmbedContext<'_>) -> Result<String, EmbedError> {
        let src = self.player_src(id, ctx)?;
        Ok(format!(
            "<div class=\"videoWrapper\"><iframe width=\"{width}\" height=\"{height}\" src=\"{src}\" \
             frameborder=\"0\" allowfullscreen=\"allowfullscreen\" \
             webkitallowfullscreen=\"webkitallowfullscreen\" \
             mozallowfullscreen=\"mozallowfullscreen\"></iframe></div>",
            width = ctx.width,
            height = ctx.height,
            src = escape_attr(&src),
        ))
    }
}

/// First provider that recognizes `url`.
pub(crate) fn detect(url: &str) -> Option<(EmbedProvider, EmbedMetadata)> {
    EmbedProvider::ALL
        .into_iter()
        .find_map(|provider| provider.metadata(url).map(|meta| (provider, meta)))
}

pub(crate) fn marker(provider: EmbedProvider, id: &str) -> String {
    format!("~~~ embed:{id} {} ~~~", provider.kind())
}

/// Locations of every marker in `text`, so other text passes can leave them alone.
pub(crate) fn marker_spans(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    MARKER.find_iter(text).map(|m| (m.start(), m.end()))
}

/// Replace every marker with its iframe. A marker that cannot be expanded
/// disappears from the output and is logged.
pub(crate) fn expand_markers(html: &str, ctx: &EmbedContext<'_>) -> String {
    if !html.contains("~~~ embed:") {
        return html.to_string();
    }

    MARKER
        .replace_all(html, |caps: &Captures<'_>| {
            let id = &caps[1];
            let kind = &caps[2];
            let built = EmbedProvider::from_kind(kind)
                .ok_or_else(|| EmbedError::UnknownType(kind.to_string()))
                .and_then(|provider| provider.build_embed(id, ctx));
            match built {
                Ok(html) => html,
                Err(err) => {
                    warn!(
                        target = "application::render::embed",
                        id,
                        kind,
                        error = %err,
                        "Dropping embed marker"
                    );
                    String::new()
                }
            }
        })
        .into_owned()
}

fn is_embed_id(id: &str, extra: &[char]) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || extra.contains(&ch))
}

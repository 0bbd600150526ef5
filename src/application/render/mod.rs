//! Rendering pipeline for untrusted post and comment bodies.
//!
//! The pipeline is pure: it accepts Markdown or HTML, produces deterministic
//! HTML, and reports what it found in a call-scoped [`ParseState`]. Nothing is
//! fetched and no renderer state changes while a body is rendered.

mod options;
mod plugins;
mod service;
mod types;

pub use options::{
    DEFAULT_EXTERNAL_LINK_CLASS, DEFAULT_IFRAME_HEIGHT, DEFAULT_IFRAME_WIDTH,
    DEFAULT_INTERNAL_LINK_CLASS, EmbedSize, HashtagUrlFn, ImageProxyFn, LinkPredicateFn,
    RenderConfig, RenderConfigBuilder, UsertagUrlFn,
};
pub use plugins::{RenderPlugin, SpoilerPlugin};
pub use service::{EmbedMetadata, EmbedProvider, Renderer};
pub use types::{ParseState, RenderError, RenderService, RenderedDocument};

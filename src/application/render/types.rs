use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::error::ValidationError;

/// Everything discovered while walking one document.
///
/// A fresh value is produced by every render or extraction call and handed back
/// to the caller; renderer instances never hold on to one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseState {
    /// Lowercased hashtags without the leading `#`. Purely numeric tags are excluded.
    pub hashtags: BTreeSet<String>,
    /// Lowercased account names of valid `@mentions`.
    pub usertags: BTreeSet<String>,
    /// Lowercased names of every element seen in the parsed document.
    pub html_tags: BTreeSet<String>,
    /// Image sources, as written in the input, plus embed thumbnails.
    pub images: BTreeSet<String>,
    /// Link targets, as written in the input, plus linkified URLs and embed URLs.
    pub links: BTreeSet<String>,
}

impl ParseState {
    pub fn is_empty(&self) -> bool {
        self.hashtags.is_empty()
            && self.usertags.is_empty()
            && self.html_tags.is_empty()
            && self.images.is_empty()
            && self.links.is_empty()
    }
}

/// Final HTML together with the summary collected while producing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub html: String,
    pub state: ParseState,
}

/// Fatal rendering failures. Parsing and embedding anomalies never surface
/// here; they degrade to omitting the questionable fragment.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("renderer rejected the input because of insecure content: {reason}")]
    Security { reason: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

impl RenderError {
    pub fn security(reason: impl Into<String>) -> Self {
        Self::Security {
            reason: reason.into(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    pub fn is_security(&self) -> bool {
        matches!(self, RenderError::Security { .. })
    }
}

/// Entry point consumed by the presentation layer. Implementations must be pure
/// and deterministic: the same body always yields the same output or error.
pub trait RenderService: Send + Sync {
    fn render(&self, body: &str) -> Result<String, RenderError>;
}

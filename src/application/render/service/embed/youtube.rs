use once_cell::sync::Lazy;
use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedProvider, is_embed_id};

static YOUTUBE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)https?://(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^\s#]*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_\-]+)",
    )
    .expect("youtube regex must compile")
});

pub(super) fn metadata(url: &str) -> Option<EmbedMetadata> {
    let caps = YOUTUBE_URL.captures(url)?;
    let id = caps.get(1)?.as_str();
    Some(EmbedMetadata {
        id: id.to_string(),
        url: caps.get(0)?.as_str().to_string(),
        image: Some(format!("https://img.youtube.com/vi/{id}/0.jpg")),
        link: Some(format!("https://www.youtube.com/watch?v={id}")),
    })
}

pub(super) fn player_src(id: &str) -> Result<String, EmbedError> {
    if !is_embed_id(id, &[]) {
        return Err(EmbedError::invalid_id(EmbedProvider::YouTube, id));
    }
    Ok(format!("https://www.youtube.com/embed/{id}"))
}

use once_cell::sync::Lazy;
use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedProvider};

static VIMEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?(?:player\.)?vimeo\.com/(?:video/)?(\d+)")
        .expect("vimeo regex must compile")
});

pub(super) fn metadata(url: &str) -> Option<EmbedMetadata> {
    let caps = VIMEO_URL.captures(url)?;
    let id = caps.get(1)?.as_str();
    Some(EmbedMetadata {
        id: id.to_string(),
        url: caps.get(0)?.as_str().to_string(),
        image: None,
        link: Some(format!("https://vimeo.com/{id}")),
    })
}

pub(super) fn player_src(id: &str) -> Result<String, EmbedError> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EmbedError::invalid_id(EmbedProvider::Vimeo, id));
    }
    Ok(format!("https://player.vimeo.com/video/{id}"))
}

use once_cell::sync::Lazy;
use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedProvider};

pub(crate) const SPOTIFY_KINDS: [&str; 6] =
    ["playlist", "show", "episode", "album", "track", "artist"];

static SPOTIFY_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)https?://open\.spotify\.com/(?:embed/|embed-podcast/)?(playlist|show|episode|album|track|artist)/([A-Za-z0-9]+)",
    )
    .expect("spotify regex must compile")
});

pub(super) fn metadata(url: &str) -> Option<EmbedMetadata> {
    let caps = SPOTIFY_URL.captures(url)?;
    let kind = caps.get(1)?.as_str().to_ascii_lowercase();
    let id = format!("{kind}/{}", caps.get(2)?.as_str());
    Some(EmbedMetadata {
        link: Some(format!("https://open.spotify.com/{id}")),
        id,
        url: caps.get(0)?.as_str().to_string(),
        image: None,
    })
}

pub(super) fn player_src(id: &str) -> Result<String, EmbedError> {
    let valid = id.split_once('/').is_some_and(|(kind, item)| {
        SPOTIFY_KINDS.contains(&kind)
            && !item.is_empty()
            && item.chars().all(|ch| ch.is_ascii_alphanumeric())
    });
    if !valid {
        return Err(EmbedError::invalid_id(EmbedProvider::Spotify, id));
    }
    Ok(format!("https://open.spotify.com/embed/{id}"))
}

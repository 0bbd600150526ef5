use once_cell::sync::Lazy;
use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedProvider};

static TWITCH_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?twitch\.tv/(?:videos/(\d+)|([A-Za-z0-9_]+))")
        .expect("twitch regex must compile")
});

pub(super) fn metadata(url: &str) -> Option<EmbedMetadata> {
    let caps = TWITCH_URL.captures(url)?;
    let id = match (caps.get(1), caps.get(2)) {
        (Some(video), _) => format!("?video=v{}", video.as_str()),
        (None, Some(channel)) => format!("?channel={}", channel.as_str()),
        (None, None) => return None,
    };
    let matched = caps.get(0)?.as_str();
    Some(EmbedMetadata {
        id,
        url: matched.to_string(),
        image: None,
        link: Some(matched.to_string()),
    })
}

pub(super) fn player_src(id: &str, parent_domain: Option<&str>) -> Result<String, EmbedError> {
    let valid = id
        .strip_prefix("?channel=")
        .or_else(|| id.strip_prefix("?video=v"))
        .is_some_and(|rest| {
            !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        });
    if !valid {
        return Err(EmbedError::invalid_id(EmbedProvider::Twitch, id));
    }
    let parent = parent_domain.ok_or(EmbedError::MissingParent {
        provider: EmbedProvider::Twitch.kind(),
    })?;
    Ok(format!("https://player.twitch.tv/{id}&parent={parent}"))
}

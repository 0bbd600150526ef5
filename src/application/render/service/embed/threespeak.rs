use once_cell::sync::Lazy;
use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedProvider};

static THREESPEAK_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)https?://(?:www\.)?3speak\.(?:tv|co|online)/(?:watch|embed)\?v=([a-z0-9\-.]+)/([a-z0-9\-]+)",
    )
    .expect("3speak regex must compile")
});

pub(super) fn metadata(url: &str) -> Option<EmbedMetadata> {
    let caps = THREESPEAK_URL.captures(url)?;
    let author = caps.get(1)?.as_str().to_ascii_lowercase();
    let permlink = caps.get(2)?.as_str().to_ascii_lowercase();
    Some(EmbedMetadata {
        id: format!("{author}/{permlink}"),
        url: caps.get(0)?.as_str().to_string(),
        image: Some(format!("https://img.3speak.tv/{permlink}/poster.png")),
        link: Some(format!("https://3speak.tv/watch?v={author}/{permlink}")),
    })
}

pub(super) fn player_src(id: &str) -> Result<String, EmbedError> {
    let valid = id.split_once('/').is_some_and(|(author, permlink)| {
        !author.is_empty()
            && !permlink.is_empty()
            && author
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '.')
            && permlink
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    });
    if !valid {
        return Err(EmbedError::invalid_id(EmbedProvider::ThreeSpeak, id));
    }
    Ok(format!("https://3speak.tv/embed?v={id}"))
}

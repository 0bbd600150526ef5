//! Whitelist of iframe players allowed through the sanitizer.
//!
//! Each player has its own canonical form; the sanitizer keeps an iframe only if
//! its `src` can be rebuilt into one of them. Query parameters a player does not
//! need are dropped on the way.

use url::{Url, form_urlencoded};

use super::embed::SPOTIFY_KINDS;

const SOUNDCLOUD_PLAYER_PARAMS: &str = "auto_play=false&hide_related=false&show_comments=true&show_user=true&show_reposts=false&visual=true";

/// Canonical player URL for `src`, or `None` when the player is not allowed.
pub(crate) fn canonical_src(src: &str) -> Option<String> {
    let src = src.trim();
    let absolute = match src.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => src.to_string(),
    };

    let url = Url::parse(&absolute).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();

    match host.as_str() {
        "www.youtube.com" | "youtube.com" | "www.youtube-nocookie.com" => youtube(&url),
        "player.vimeo.com" => vimeo(&url),
        "w.soundcloud.com" => soundcloud(&url),
        "player.twitch.tv" => twitch(&url),
        "open.spotify.com" => spotify(&url),
        "3speak.tv" | "www.3speak.tv" | "3speak.co" | "www.3speak.co" | "3speak.online"
        | "www.3speak.online" => threespeak(&url),
        _ => None,
    }
}

fn youtube(url: &Url) -> Option<String> {
    let id = url.path().strip_prefix("/embed/")?;
    is_token(id, &['-', '_']).then(|| format!("https://www.youtube.com/embed/{id}"))
}

fn vimeo(url: &Url) -> Option<String> {
    let id = url.path().strip_prefix("/video/")?;
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        .then(|| format!("https://player.vimeo.com/video/{id}"))
}

fn soundcloud(url: &Url) -> Option<String> {
    if !url.path().starts_with("/player") {
        return None;
    }
    let track = query_value(url, "url")?;
    let track_url = Url::parse(&track).ok()?;
    if !matches!(track_url.scheme(), "http" | "https") {
        return None;
    }
    let encoded: String = form_urlencoded::byte_serialize(track.as_bytes()).collect();
    Some(format!(
        "https://w.soundcloud.com/player/?url={encoded}&{SOUNDCLOUD_PLAYER_PARAMS}"
    ))
}

fn twitch(url: &Url) -> Option<String> {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| matches!(key.as_ref(), "channel" | "video" | "parent"))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if !kept.iter().any(|(key, _)| key == "channel" || key == "video") {
        return None;
    }

    let mut canonical = Url::parse("https://player.twitch.tv/").ok()?;
    canonical.query_pairs_mut().extend_pairs(kept);
    Some(canonical.to_string())
}

fn spotify(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    let prefix = segments.next()?;
    if prefix != "embed" && prefix != "embed-podcast" {
        return None;
    }
    let kind = segments.next()?;
    let id = segments.next()?;
    (SPOTIFY_KINDS.contains(&kind) && is_token(id, &[]))
        .then(|| format!("https://open.spotify.com/embed/{kind}/{id}"))
}

fn threespeak(url: &Url) -> Option<String> {
    if url.path() != "/embed" {
        return None;
    }
    let video = query_value(url, "v")?;
    let (author, permlink) = video.split_once('/')?;
    (is_token(author, &['-', '.']) && is_token(permlink, &['-']))
        .then(|| format!("https://3speak.tv/embed?v={author}/{permlink}"))
}

fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn is_token(value: &str, extra: &[char]) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || extra.contains(&ch))
}

#[cfg(test)]
mod tests {
    use super::canonical_src;

    #[test]
    fn youtube_drops_query_and_upgrades_scheme_relative() {
        assert_eq!(
            canonical_src("//www.youtube.com/embed/abc_123?autoplay=1#t=3").as_deref(),
            Some("https://www.youtube.com/embed/abc_123")
        );
    }

    #[test]
    fn vimeo_keeps_numeric_id_only() {
        assert_eq!(
            canonical_src("https://player.vimeo.com/video/1234?color=fff").as_deref(),
            Some("https://player.vimeo.com/video/1234")
        );
        assert_eq!(canonical_src("https://player.vimeo.com/video/abc"), None);
    }

    #[test]
    fn soundcloud_rebuilds_with_fixed_parameters() {
        let src = canonical_src(
            "https://w.soundcloud.com/player/?url=https%3A//api.soundcloud.com/tracks/1&color=ff0000",
        )
        .expect("soundcloud allowed");
        assert!(src.starts_with(
            "https://w.soundcloud.com/player/?url=https%3A%2F%2Fapi.soundcloud.com%2Ftracks%2F1&auto_play=false"
        ));
        assert!(!src.contains("color"));
    }

    #[test]
    fn twitch_keeps_only_known_parameters() {
        assert_eq!(
            canonical_src("https://player.twitch.tv/?channel=abc&autoplay=true&parent=example.com")
                .as_deref(),
            Some("https://player.twitch.tv/?channel=abc&parent=example.com")
        );
        assert_eq!(canonical_src("https://player.twitch.tv/?autoplay=true"), None);
    }

    #[test]
    fn spotify_accepts_podcast_embeds() {
        assert_eq!(
            canonical_src("https://open.spotify.com/embed-podcast/episode/xyz9?theme=0").as_deref(),
            Some("https://open.spotify.com/embed/episode/xyz9")
        );
        assert_eq!(canonical_src("https://open.spotify.com/track/xyz9"), None);
    }

    #[test]
    fn threespeak_rebuilds_from_video_parameter() {
        assert_eq!(
            canonical_src("https://3speak.co/embed?v=alice/abc123&autoplay=true").as_deref(),
            Some("https://3speak.tv/embed?v=alice/abc123")
        );
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(canonical_src("https://evil.test/embed/abc"), None);
        assert_eq!(canonical_src("javascript:alert(1)"), None);
        assert_eq!(canonical_src("not a url"), None);
    }
}

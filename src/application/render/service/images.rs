use crate::application::render::options::RenderConfig;

const IMAGE_EXTENSIONS: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Rewrite an image source into the URL the page should load: scheme-relative
/// sources become https, IPFS references go through the configured gateway,
/// and the result is passed to the image proxy.
pub(crate) fn proxied_src(src: &str, config: &RenderConfig) -> String {
    let src = src.trim();
    let absolute = match src.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => src.to_string(),
    };
    (config.image_proxy_fn)(&ipfs_gateway(&absolute, &config.ipfs_prefix))
}

fn ipfs_gateway(src: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return src.to_string();
    }
    let cid = src
        .strip_prefix("ipfs://")
        .or_else(|| src.strip_prefix("/ipfs/"));
    match cid {
        Some(cid) if !cid.is_empty() => format!("{prefix}/{cid}"),
        _ => src.to_string(),
    }
}

/// Bare URLs with an image extension (query string ignored) are shown inline.
pub(crate) fn looks_like_image(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

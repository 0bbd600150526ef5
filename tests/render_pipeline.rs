use std::sync::Arc;

use postrender::application::render::{
    RenderConfig, RenderConfigBuilder, RenderError, RenderService, Renderer, SpoilerPlugin,
};
use postrender::domain::localization::LocalizationStrings;

const YOUTUBE_ID: &str = "dQw4w9WgXcQ";

fn builder() -> RenderConfigBuilder {
    RenderConfig::builder("https://example.com")
        .image_proxy_fn(|url| url.to_string())
        .hashtag_url_fn(|tag| format!("/trending/{tag}"))
        .usertag_url_fn(|name| format!("/@{name}"))
        .is_link_safe_fn(|_| true)
        .add_external_css_class_to_matching_links_fn(|href| !href.starts_with('/'))
}

fn renderer_with(builder: RenderConfigBuilder) -> Renderer {
    let config = builder.build().expect("valid configuration");
    Renderer::new(config, LocalizationStrings::default()).expect("renderer")
}

fn renderer() -> Renderer {
    renderer_with(builder())
}

#[test]
fn headings_render_without_paragraphs() {
    let html = renderer()
        .render(include_str!("fixtures/headings.md"))
        .expect("render");

    for level in 1..=6 {
        assert!(html.contains(&format!("<h{level}>")), "missing h{level}: {html}");
    }
    assert!(!html.contains("<p>"), "{html}");
}

#[test]
fn mentions_respect_account_name_rules() {
    let document = renderer()
        .render_document(include_str!("fixtures/mixed_post.md"))
        .expect("render");

    assert!(document.html.contains("href=\"/@noisy\""), "{}", document.html);
    assert!(document.html.contains("@toolongusername1234"));
    assert!(!document.html.contains("/@toolongusername1234"));
    assert_eq!(
        document.state.usertags.iter().collect::<Vec<_>>(),
        vec!["noisy"]
    );
}

#[test]
fn numeric_hashtags_stay_plain() {
    let document = renderer()
        .render_document(include_str!("fixtures/mixed_post.md"))
        .expect("render");

    assert!(document.html.contains("href=\"/trending/abc123\""));
    assert!(document.html.contains("href=\"/trending/travel\""));
    assert!(!document.html.contains("/trending/123\""));
    assert!(!document.html.contains("/trending/code"));
    assert!(!document.state.hashtags.contains("123"));
}

#[test]
fn comments_are_shown_as_text() {
    let html = renderer()
        .render(include_str!("fixtures/mixed_post.md"))
        .expect("render");
    assert!(html.contains("(html comment removed:  draft notes )"), "{html}");
    assert!(!html.contains("<!--"));
}

#[test]
fn links_mimicking_the_site_are_neutralized() {
    let html = renderer()
        .render(include_str!("fixtures/phishing.md"))
        .expect("render");
    let warning = LocalizationStrings::default().phishing_warning;

    assert!(html.contains("class=\"phishy\""), "{html}");
    assert!(html.contains(&format!("title=\"{warning}\"")), "{html}");
    assert!(html.contains("https://example.com/login / https://evil.test/login"));
    assert!(!html.contains("href=\"https://evil.test/login\""));
    assert!(html.contains("href=\"https://example.com/wallet\""));
}

#[test]
fn every_youtube_url_form_becomes_the_same_player() {
    let renderer = renderer();
    for url in [
        format!("https://www.youtube.com/watch?v={YOUTUBE_ID}"),
        format!("https://youtu.be/{YOUTUBE_ID}"),
        format!("https://www.youtube.com/embed/{YOUTUBE_ID}"),
        format!("https://youtube.com/shorts/{YOUTUBE_ID}"),
    ] {
        let html = renderer.render(&url).expect("render");
        assert!(html.contains("<div class=\"videoWrapper\"><iframe"), "{url}: {html}");
        assert!(
            html.contains(&format!("src=\"https://www.youtube.com/embed/{YOUTUBE_ID}\"")),
            "{url}: {html}"
        );
        assert!(html.contains("width=\"640\" height=\"480\""), "{url}: {html}");
        assert!(!html.contains("~~~ embed:"), "{url}: {html}");
    }
}

#[test]
fn embed_size_follows_configuration() {
    let html = renderer_with(builder().embed_size(320, 180))
        .render("https://vimeo.com/123456")
        .expect("render");
    assert!(html.contains("width=\"320\" height=\"180\""), "{html}");
    assert!(html.contains("src=\"https://player.vimeo.com/video/123456\""));
}

#[test]
fn twitch_players_name_the_site_as_parent() {
    let html = renderer()
        .render("https://www.twitch.tv/somechannel")
        .expect("render");
    assert!(
        html.contains("https://player.twitch.tv/?channel=somechannel&amp;parent=example.com"),
        "{html}"
    );
}

#[test]
fn hidden_images_render_as_preformatted_urls() {
    let html = renderer_with(builder().do_not_show_images(true))
        .render("![Harbour](https://img.test/harbour.jpg)")
        .expect("render");
    assert!(html.contains("<pre>https://img.test/harbour.jpg</pre>"), "{html}");
    assert!(!html.contains("<img"));
}

#[test]
fn ipfs_images_use_the_gateway() {
    let html = renderer_with(builder().ipfs_prefix("https://ipfs.example/ipfs"))
        .render("![pin](ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG)")
        .expect("render");
    assert!(
        html.contains("src=\"https://ipfs.example/ipfs/QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG\""),
        "{html}"
    );
}

#[test]
fn images_go_through_the_proxy() {
    let html = renderer_with(
        builder().image_proxy_fn(|url| format!("https://proxy.test/0x0/{url}")),
    )
    .render("![a](https://img.test/a.png)")
    .expect("render");
    assert!(html.contains("src=\"https://proxy.test/0x0/https://img.test/a.png\""), "{html}");
}

#[test]
fn script_tags_are_a_security_error() {
    let body = "hello\n\n<script>alert(1)</script>\n";

    let err = renderer().render(body).expect_err("script rejected");
    assert!(err.is_security(), "{err}");

    let err = renderer_with(builder().skip_sanitization(true))
        .render(body)
        .expect_err("script rejected without sanitizer");
    assert!(matches!(err, RenderError::Security { .. }));
}

#[test]
fn script_tags_pass_when_explicitly_allowed() {
    let html = renderer_with(
        builder()
            .skip_sanitization(true)
            .allow_insecure_script_tags(true),
    )
    .render("<script>alert(1)</script>")
    .expect("render");
    assert!(html.contains("<script>"));
}

#[test]
fn unsafe_links_get_warning_attributes() {
    let html = renderer_with(builder().is_link_safe_fn(|href| !href.contains("shady")))
        .render("[deal](https://shady.test/offer)")
        .expect("render");
    assert!(html.contains("class=\"external-link phishy\""), "{html}");
    assert!(html.contains("target=\"_self\""));
}

#[test]
fn rendering_is_deterministic() {
    let renderer = renderer();
    let body = include_str!("fixtures/mixed_post.md");
    let first = renderer.render_document(body).expect("first");
    let second = renderer.render_document(body).expect("second");
    assert_eq!(first.html, second.html);
    assert_eq!(first.state, second.state);
}

#[test]
fn extract_metadata_matches_render_summary() {
    let renderer = renderer();
    let body = include_str!("fixtures/mixed_post.md");

    let state = renderer.extract_metadata(body).expect("extract");
    let document = renderer.render_document(body).expect("render");

    assert_eq!(state.hashtags, document.state.hashtags);
    assert_eq!(state.usertags, document.state.usertags);
    assert!(state.images.contains("https://img.test/harbour.jpg"));
    assert!(
        state
            .images
            .contains(&format!("https://img.youtube.com/vi/{YOUTUBE_ID}/0.jpg"))
    );
    assert!(state.links.contains("https://photos.test/album"));
}

#[test]
fn spoiler_plugin_collapses_marked_quotes() {
    let html = renderer()
        .with_plugin(Arc::new(SpoilerPlugin))
        .render(include_str!("fixtures/spoiler.md"))
        .expect("render");
    assert!(
        html.contains("<details class=\"spoiler\"><summary>Ending</summary><p>the butler did it</p></details>"),
        "{html}"
    );
    assert!(!html.contains("<blockquote>"));
}

#[test]
fn renderer_is_shared_across_threads() {
    let service: Arc<dyn RenderService> = Arc::new(renderer());
    let bodies = ["#alpha post", "@noisy hi", "plain text"];

    std::thread::scope(|scope| {
        let handles: Vec<_> = bodies
            .iter()
            .map(|body| {
                let service = service.clone();
                scope.spawn(move || service.render(body))
            })
            .collect();
        for handle in handles {
            let html = handle.join().expect("thread").expect("render");
            assert!(html.starts_with("<p>"), "{html}");
        }
    });
}

#[test]
fn empty_bodies_are_rejected() {
    let err = renderer().render("   ").expect_err("empty");
    assert!(matches!(err, RenderError::Validation(_)));
}

#[test]
fn captions_mentioning_handlers_or_script_urls_render() {
    let html = renderer()
        .render("![click onion=good, javascript: basics](https://x.test/a.png)")
        .expect("harmless caption");
    assert!(html.contains("alt=\"click onion=good, javascript: basics\""), "{html}");

    let err = renderer_with(builder().skip_sanitization(true))
        .render("<p><img src=\"https://x.test/a.png\" onerror=\"alert(1)\"></p>")
        .expect_err("handler survives without sanitizer");
    assert!(err.is_security(), "{err}");
}

#[test]
fn app_scheme_links_survive_sanitization() {
    let html = renderer()
        .render("<p><a href=\"vessel://op\">sign</a></p>")
        .expect("render");
    assert!(html.contains("href=\"vessel://op\""), "{html}");
}

#[test]
fn inline_iframes_leave_no_empty_paragraph() {
    let html = renderer()
        .render("x <iframe src=\"https://player.vimeo.com/video/1\"></iframe>")
        .expect("render");
    assert!(html.starts_with("<p>x </p><div class=\"videoWrapper\"><iframe"), "{html}");
    assert!(!html.contains("<p></p>"), "{html}");
}

#[test]
fn markdown_quotes_are_curled() {
    let html = renderer()
        .render("She said \"wait -- now...\"")
        .expect("render");
    assert!(html.contains("<p>She said \u{201c}wait -- now...\u{201d}</p>"), "{html}");
}

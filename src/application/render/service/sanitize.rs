use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str};

use crate::application::render::options::RenderConfig;
use crate::application::render::types::RenderError;
use crate::domain::localization::LocalizationStrings;

use super::markup::decode_entities;

const UNSUPPORTED_EMBED: &str = "<div>(Unsupported embed)</div>";
const PHISHY_CLASS: &str = "phishy";

/// Run the whitelist sanitizer, then apply the link and iframe policy to what
/// survived.
pub(crate) fn sanitize(
    html: &str,
    sanitizer: &ammonia::Builder<'static>,
    config: &RenderConfig,
    strings: &LocalizationStrings,
) -> Result<String, RenderError> {
    let cleaned = sanitizer.clean(html).to_string();
    apply_link_policy(&cleaned, config, strings)
}

fn apply_link_policy(
    html: &str,
    config: &RenderConfig,
    strings: &LocalizationStrings,
) -> Result<String, RenderError> {
    let width = config.embed_size.width.to_string();
    let height = config.embed_size.height.to_string();

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("a[href]", |el| {
                    let Some(raw) = el.get_attribute("href") else {
                        return Ok(());
                    };
                    let href = decode_entities(&raw);

                    let external = (config.add_external_css_class_to_matching_links_fn)(&href);
                    let mut classes = Vec::new();
                    let class = if external {
                        &config.css_class_for_external_links
                    } else {
                        &config.css_class_for_internal_links
                    };
                    if !class.is_empty() {
                        classes.push(class.as_str());
                    }

                    if (config.is_link_safe_fn)(&href) {
                        let mut rel = Vec::new();
                        if config.add_nofollow_to_links {
                            rel.push("nofollow");
                        }
                        if config.add_target_blank_to_links {
                            rel.push("noopener");
                            el.set_attribute("target", "_blank")?;
                        }
                        if !rel.is_empty() {
                            el.set_attribute("rel", &rel.join(" "))?;
                        }
                    } else {
                        classes.push(PHISHY_CLASS);
                        el.set_attribute("rel", "noopener")?;
                        el.set_attribute("target", "_self")?;
                        el.set_attribute("title", &strings.phishing_warning)?;
                    }

                    if !classes.is_empty() {
                        el.set_attribute("class", &classes.join(" "))?;
                    }
                    Ok(())
                }),
                element!("iframe", |el| {
                    if el.get_attribute("src").is_none() {
                        el.replace(UNSUPPORTED_EMBED, ContentType::Html);
                        return Ok(());
                    }
                    el.set_attribute("width", &width)?;
                    el.set_attribute("height", &height)?;
                    el.set_attribute("frameborder", "0")?;
                    el.set_attribute("allowfullscreen", "allowfullscreen")?;
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::document(err.to_string()))
}

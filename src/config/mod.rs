//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::render::{
    DEFAULT_EXTERNAL_LINK_CLASS, DEFAULT_IFRAME_HEIGHT, DEFAULT_IFRAME_WIDTH,
    DEFAULT_INTERNAL_LINK_CLASS,
};
use crate::domain::localization::LocalizationStrings;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "postrender";
const ENV_PREFIX: &str = "POSTRENDER";
const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_HASHTAG_URL_TEMPLATE: &str = "/trending/{tag}";
const DEFAULT_USERTAG_URL_TEMPLATE: &str = "/@{name}";
pub const HASHTAG_PLACEHOLDER: &str = "{tag}";
pub const USERTAG_PLACEHOLDER: &str = "{name}";

/// Command-line arguments for the postrender binary.
#[derive(Debug, Parser)]
#[command(
    name = "postrender",
    version,
    about = "Render untrusted Markdown or HTML posts into safe HTML"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "POSTRENDER_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a body and print the resulting HTML.
    Render(RenderArgs),
    /// Print the tags, mentions, links and images found in a body.
    Extract(ExtractArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    /// File holding the body; stdin when omitted.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Render with the renderer that replaces images by their URL.
    #[arg(long = "images-hidden", action = clap::ArgAction::SetTrue)]
    pub images_hidden: bool,

    /// Print a JSON object with the HTML and the parse summary.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ExtractArgs {
    /// File holding the body; stdin when omitted.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the site URL that relative links resolve against.
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Override whether single newlines become `<br>`.
    #[arg(
        long = "breaks",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub breaks: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub renderer: RendererSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub base_url: Url,
    pub breaks: bool,
    pub skip_sanitization: bool,
    pub allow_insecure_script_tags: bool,
    pub add_nofollow_to_links: bool,
    pub add_target_blank_to_links: bool,
    pub internal_link_class: String,
    pub external_link_class: String,
    pub ipfs_prefix: String,
    pub iframe_width: NonZeroU32,
    pub iframe_height: NonZeroU32,
    /// Prefix of the image proxy; images are served unproxied when empty.
    pub image_proxy_prefix: String,
    /// Contains `{tag}`.
    pub hashtag_url_template: String,
    /// Contains `{name}`.
    pub usertag_url_template: String,
    pub trusted_hosts: Vec<String>,
    pub phishing_hosts: Vec<String>,
    pub bad_actors: Vec<String>,
    pub localization: LocalizationStrings,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("renderer.trusted_hosts")
            .with_list_parse_key("renderer.phishing_hosts")
            .with_list_parse_key("renderer.bad_actors")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    renderer: RawRendererSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.base_url.as_ref() {
            self.renderer.base_url = Some(url.clone());
        }
        if let Some(breaks) = overrides.breaks {
            self.renderer.breaks = Some(breaks);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { logging, renderer } = raw;

        let logging = build_logging_settings(logging)?;
        let renderer = build_renderer_settings(renderer)?;

        Ok(Self { logging, renderer })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_renderer_settings(renderer: RawRendererSettings) -> Result<RendererSettings, LoadError> {
    let base_url = renderer
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_BASE_URL);
    let base_url = Url::parse(base_url)
        .map_err(|err| LoadError::invalid("renderer.base_url", format!("invalid URL: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
        return Err(LoadError::invalid(
            "renderer.base_url",
            "must be an absolute http(s) URL",
        ));
    }

    let hashtag_url_template = renderer
        .hashtag_url_template
        .unwrap_or_else(|| DEFAULT_HASHTAG_URL_TEMPLATE.to_string());
    if !hashtag_url_template.contains(HASHTAG_PLACEHOLDER) {
        return Err(LoadError::invalid(
            "renderer.hashtag_url_template",
            format!("must contain `{HASHTAG_PLACEHOLDER}`"),
        ));
    }

    let usertag_url_template = renderer
        .usertag_url_template
        .unwrap_or_else(|| DEFAULT_USERTAG_URL_TEMPLATE.to_string());
    if !usertag_url_template.contains(USERTAG_PLACEHOLDER) {
        return Err(LoadError::invalid(
            "renderer.usertag_url_template",
            format!("must contain `{USERTAG_PLACEHOLDER}`"),
        ));
    }

    let iframe_width = non_zero_u32(
        renderer.iframe_width.unwrap_or(DEFAULT_IFRAME_WIDTH.into()),
        "renderer.iframe_width",
    )?;
    let iframe_height = non_zero_u32(
        renderer.iframe_height.unwrap_or(DEFAULT_IFRAME_HEIGHT.into()),
        "renderer.iframe_height",
    )?;

    Ok(RendererSettings {
        base_url,
        breaks: renderer.breaks.unwrap_or(true),
        skip_sanitization: renderer.skip_sanitization.unwrap_or(false),
        allow_insecure_script_tags: renderer.allow_insecure_script_tags.unwrap_or(false),
        add_nofollow_to_links: renderer.add_nofollow_to_links.unwrap_or(true),
        add_target_blank_to_links: renderer.add_target_blank_to_links.unwrap_or(true),
        internal_link_class: renderer
            .internal_link_class
            .unwrap_or_else(|| DEFAULT_INTERNAL_LINK_CLASS.to_string()),
        external_link_class: renderer
            .external_link_class
            .unwrap_or_else(|| DEFAULT_EXTERNAL_LINK_CLASS.to_string()),
        ipfs_prefix: renderer.ipfs_prefix.unwrap_or_default(),
        iframe_width,
        iframe_height,
        image_proxy_prefix: renderer
            .image_proxy_prefix
            .map(|prefix| prefix.trim().to_string())
            .unwrap_or_default(),
        hashtag_url_template,
        usertag_url_template,
        trusted_hosts: renderer.trusted_hosts,
        phishing_hosts: renderer.phishing_hosts,
        bad_actors: renderer.bad_actors,
        localization: renderer.localization.resolve(),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRendererSettings {
    base_url: Option<String>,
    breaks: Option<bool>,
    skip_sanitization: Option<bool>,
    allow_insecure_script_tags: Option<bool>,
    add_nofollow_to_links: Option<bool>,
    add_target_blank_to_links: Option<bool>,
    internal_link_class: Option<String>,
    external_link_class: Option<String>,
    ipfs_prefix: Option<String>,
    iframe_width: Option<u64>,
    iframe_height: Option<u64>,
    image_proxy_prefix: Option<String>,
    hashtag_url_template: Option<String>,
    usertag_url_template: Option<String>,
    trusted_hosts: Vec<String>,
    phishing_hosts: Vec<String>,
    bad_actors: Vec<String>,
    localization: RawLocalizationSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLocalizationSettings {
    phishing_warning: Option<String>,
    external_link: Option<String>,
    no_image: Option<String>,
    account_name_wrong_length: Option<String>,
    account_name_bad_actor: Option<String>,
    account_name_wrong_segment: Option<String>,
}

impl RawLocalizationSettings {
    /// Overlay configured strings on the built-in English ones.
    fn resolve(self) -> LocalizationStrings {
        let defaults = LocalizationStrings::default();
        LocalizationStrings {
            phishing_warning: self.phishing_warning.unwrap_or(defaults.phishing_warning),
            external_link: self.external_link.unwrap_or(defaults.external_link),
            no_image: self.no_image.unwrap_or(defaults.no_image),
            account_name_wrong_length: self
                .account_name_wrong_length
                .unwrap_or(defaults.account_name_wrong_length),
            account_name_bad_actor: self
                .account_name_bad_actor
                .unwrap_or(defaults.account_name_bad_actor),
            account_name_wrong_segment: self
                .account_name_wrong_segment
                .unwrap_or(defaults.account_name_wrong_segment),
        }
    }
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

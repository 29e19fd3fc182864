//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Resolution is
//! layered:
//!
//! ```text
//! stock defaults  →  config.toml (sparse)  →  environment  →  validate()
//! ```
//!
//! The environment layer lets CI and hosting platforms inject credentials
//! without writing them to disk:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `SANITY_PROJECT_ID` | `cms.project_id` |
//! | `SANITY_DATASET` | `cms.dataset` |
//! | `SANITY_API_VERSION` | `cms.api_version` |
//! | `SANITY_API_TOKEN` | `cms.token` |
//! | `DEPLOY_HOOK_URL` | `deploy.hook_url` |
//! | `SITE_URL` | `site.base_url` |
//!
//! ## Configuration Options
//!
//! ```toml
//! [site]
//! title = "Instituto"
//! base_url = "https://www.example.edu"
//!
//! [cms]
//! project_id = "abc123"
//! dataset = "production"
//!
//! [homepage]
//! article_count = 6
//!
//! [carousel]
//! autoplay_delay_ms = 5000
//! ```
//!
//! Run `campus-press gen-config` for the full commented file. Unknown keys
//! are rejected to catch typos early.

use crate::image::{Format, Variant};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

static API_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?(1|\d{4}-\d{2}-\d{2})$").expect("valid regex"));
static PROJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("valid regex"));

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site identity and public URL.
    pub site: SiteInfo,
    /// Content API connection.
    pub cms: CmsConfig,
    /// CDN image variants per placement.
    pub images: ImagesConfig,
    /// Homepage banner carousel behavior.
    pub carousel: CarouselConfig,
    /// Homepage content.
    pub homepage: HomepageConfig,
    /// Rebuild webhook.
    pub deploy: DeployConfigSection,
    /// Layout settings.
    pub theme: ThemeConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.title.trim().is_empty() {
            return Err(ConfigError::Validation("site.title must not be empty".into()));
        }
        if let Some(url) = &self.site.base_url {
            if !is_http_url(url) {
                return Err(ConfigError::Validation(
                    "site.base_url must start with http:// or https://".into(),
                ));
            }
        }
        if !self.cms.project_id.is_empty() && !PROJECT_ID.is_match(&self.cms.project_id) {
            return Err(ConfigError::Validation(format!(
                "cms.project_id \"{}\" may only contain a-z, 0-9 and dashes",
                self.cms.project_id
            )));
        }
        if self.cms.dataset.trim().is_empty() {
            return Err(ConfigError::Validation("cms.dataset must not be empty".into()));
        }
        if !API_VERSION.is_match(&self.cms.api_version) {
            return Err(ConfigError::Validation(format!(
                "cms.api_version \"{}\" must be a date like 2024-01-01",
                self.cms.api_version
            )));
        }
        if self.cms.timeout_secs == 0 || self.deploy.timeout_secs == 0 {
            return Err(ConfigError::Validation("timeouts must be non-zero".into()));
        }
        for (name, variants) in [
            ("images.banner_variants", &self.images.banner_variants),
            ("images.cover_variants", &self.images.cover_variants),
            ("images.body_variants", &self.images.body_variants),
        ] {
            if variants.is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
            if variants.iter().any(|v| v.width == 0 || v.height == Some(0)) {
                return Err(ConfigError::Validation(format!(
                    "{name} widths and heights must be non-zero"
                )));
            }
        }
        if self.images.banner_width == 0 || self.images.banner_height == 0 {
            return Err(ConfigError::Validation(
                "images.banner_width and banner_height must be non-zero".into(),
            ));
        }
        if self.carousel.autoplay_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "carousel.autoplay_delay_ms must be non-zero".into(),
            ));
        }
        if !(1..=50).contains(&self.homepage.article_count) {
            return Err(ConfigError::Validation(
                "homepage.article_count must be 1-50".into(),
            ));
        }
        if let Some(url) = &self.deploy.hook_url {
            if !is_http_url(url) {
                return Err(ConfigError::Validation(
                    "deploy.hook_url must start with http:// or https://".into(),
                ));
            }
        }
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in the
    /// binary; tests pass a map. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("SANITY_PROJECT_ID") {
            self.cms.project_id = v;
        }
        if let Some(v) = get("SANITY_DATASET") {
            self.cms.dataset = v;
        }
        if let Some(v) = get("SANITY_API_VERSION") {
            self.cms.api_version = v;
        }
        if let Some(v) = get("SANITY_API_TOKEN") {
            self.cms.token = Some(v);
        }
        if let Some(v) = get("DEPLOY_HOOK_URL") {
            self.deploy.hook_url = Some(v);
        }
        if let Some(v) = get("SITE_URL") {
            self.site.base_url = Some(v);
        }
    }

    /// The project id, required by anything that talks to the CMS or its CDN.
    pub fn require_project_id(&self) -> Result<&str, ConfigError> {
        if self.cms.project_id.is_empty() {
            return Err(ConfigError::Validation(
                "cms.project_id is not set (config.toml or SANITY_PROJECT_ID)".into(),
            ));
        }
        Ok(&self.cms.project_id)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Site identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    /// Shown in the header and page titles.
    pub title: String,
    /// Meta description for the homepage.
    pub description: String,
    /// `lang` attribute of every page.
    pub language: String,
    /// Public origin, used for canonical links. Optional.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: "Noticias del Instituto".to_string(),
            description: "Noticias, cursos y novedades del instituto.".to_string(),
            language: "es".to_string(),
            base_url: None,
        }
    }
}

/// Content API connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmsConfig {
    pub project_id: String,
    pub dataset: String,
    /// Dated API version, e.g. `2024-01-01`.
    pub api_version: String,
    /// Query the cached edge API instead of the live one.
    pub use_cdn: bool,
    /// Read token for private datasets. Prefer `SANITY_API_TOKEN`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Replace the API host (mirrors, local testing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: "production".to_string(),
            api_version: "2024-01-01".to_string(),
            use_cdn: false,
            token: None,
            api_url: None,
            timeout_secs: 30,
        }
    }
}

/// CDN image variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Image CDN host.
    pub cdn_url: String,
    /// Fallback `src` size for carousel slides.
    pub banner_width: u32,
    pub banner_height: u32,
    /// Carousel srcset.
    pub banner_variants: Vec<Variant>,
    /// Article cover srcset (cards and detail header).
    pub cover_variants: Vec<Variant>,
    /// Images embedded in article bodies.
    pub body_variants: Vec<Variant>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        let webp = |width, height| Variant {
            width,
            height: Some(height),
            format: Some(Format::Webp),
        };
        let plain = |width| Variant {
            width,
            height: None,
            format: None,
        };
        Self {
            cdn_url: crate::image::DEFAULT_CDN_URL.to_string(),
            banner_width: 1920,
            banner_height: 600,
            banner_variants: vec![webp(640, 200), webp(1024, 320), webp(1920, 600)],
            cover_variants: vec![plain(400), plain(800), plain(1200)],
            body_variants: vec![plain(600), plain(1200)],
        }
    }
}

/// Carousel behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarouselConfig {
    /// Time each slide stays before advancing.
    pub autoplay_delay_ms: u64,
    /// When true, the first user interaction stops autoplay for good.
    pub stop_on_interaction: bool,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            autoplay_delay_ms: 5000,
            stop_on_interaction: false,
        }
    }
}

impl CarouselConfig {
    pub fn autoplay_delay(&self) -> Duration {
        Duration::from_millis(self.autoplay_delay_ms)
    }
}

/// Homepage content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HomepageConfig {
    /// Latest articles shown below the carousel.
    pub article_count: usize,
}

impl Default for HomepageConfig {
    fn default() -> Self {
        Self { article_count: 6 }
    }
}

/// Rebuild webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfigSection {
    /// Build hook URL of the hosting platform. Prefer `DEPLOY_HOOK_URL`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DeployConfigSection {
    fn default() -> Self {
        Self {
            hook_url: None,
            timeout_secs: 30,
        }
    }
}

/// Layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Maximum width of the main column (CSS value).
    pub content_width: String,
    /// Gap between article cards (CSS value).
    pub card_gap: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            content_width: "72rem".to_string(),
            card_gap: "1.5rem".to_string(),
        }
    }
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    /// Light mode color scheme.
    pub light: ColorScheme,
    /// Dark mode color scheme.
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    pub text: String,
    /// Dates, captions, secondary text.
    pub text_muted: String,
    pub border: String,
    pub link: String,
    pub link_hover: String,
    /// Header band and carousel controls.
    pub accent: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#1a1a1a".to_string(),
            text_muted: "#5f6368".to_string(),
            border: "#e0e0e0".to_string(),
            link: "#0b4f8a".to_string(),
            link_hover: "#083a66".to_string(),
            accent: "#0b4f8a".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#101418".to_string(),
            text: "#eeeeee".to_string(),
            text_muted: "#9aa0a6".to_string(),
            border: "#2e3338".to_string(),
            link: "#8ab4f8".to_string(),
            link_hover: "#aecbfa".to_string(),
            accent: "#1f6fb5".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge the overlay onto the stock defaults, apply environment overrides,
/// then validate.
pub fn resolve_config(
    overlay: Option<toml::Value>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let mut config: SiteConfig = merged.try_into()?;
    config.apply_env(env);
    config.validate()?;
    Ok(config)
}

/// Load config from `path` (missing file = stock defaults) with overrides
/// from the process environment.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    let config = resolve_config(overlay, |key| std::env::var(key).ok())?;
    tracing::debug!(
        path = %path.display(),
        project = %config.cms.project_id,
        dataset = %config.cms.dataset,
        "configuration loaded"
    );
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# campus-press configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Environment variables override the file:
#   SANITY_PROJECT_ID, SANITY_DATASET, SANITY_API_VERSION, SANITY_API_TOKEN,
#   DEPLOY_HOOK_URL, SITE_URL
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
title = "Noticias del Instituto"
description = "Noticias, cursos y novedades del instituto."
language = "es"
# Public origin, used for canonical links.
# base_url = "https://www.example.edu"

# ---------------------------------------------------------------------------
# Content API
# ---------------------------------------------------------------------------
[cms]
# Required for fetch and for image URLs (or set SANITY_PROJECT_ID).
project_id = ""
dataset = "production"
api_version = "2024-01-01"
# Query the cached edge API. Ignored when a token is set.
use_cdn = false
# Read token for private datasets. Prefer SANITY_API_TOKEN.
# token = ""
# Replace the API host, e.g. for a local mirror.
# api_url = "http://127.0.0.1:3333"
timeout_secs = 30

# ---------------------------------------------------------------------------
# Images (served by the image CDN, nothing is processed locally)
# ---------------------------------------------------------------------------
[images]
cdn_url = "https://cdn.sanity.io"
# Fallback src of carousel slides.
banner_width = 1920
banner_height = 600
banner_variants = [
    { width = 640, height = 200, format = "webp" },
    { width = 1024, height = 320, format = "webp" },
    { width = 1920, height = 600, format = "webp" },
]
cover_variants = [{ width = 400 }, { width = 800 }, { width = 1200 }]
body_variants = [{ width = 600 }, { width = 1200 }]

# ---------------------------------------------------------------------------
# Homepage carousel
# ---------------------------------------------------------------------------
[carousel]
autoplay_delay_ms = 5000
# true: the first click, swipe or focus stops autoplay for good.
# false: autoplay pauses during interaction and resumes afterwards.
stop_on_interaction = false

# ---------------------------------------------------------------------------
# Homepage
# ---------------------------------------------------------------------------
[homepage]
# Latest articles shown below the carousel.
article_count = 6

# ---------------------------------------------------------------------------
# Deploy
# ---------------------------------------------------------------------------
[deploy]
# Build hook of the hosting platform. Prefer DEPLOY_HOOK_URL.
# hook_url = "https://api.netlify.com/build_hooks/..."
timeout_secs = 30

# ---------------------------------------------------------------------------
# Layout
# ---------------------------------------------------------------------------
[theme]
content_width = "72rem"
card_gap = "1.5rem"

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#1a1a1a"
text_muted = "#5f6368"    # Dates, captions
border = "#e0e0e0"
link = "#0b4f8a"
link_hover = "#083a66"
accent = "#0b4f8a"        # Header band, carousel controls

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#101418"
text = "#eeeeee"
text_muted = "#9aa0a6"
border = "#2e3338"
link = "#8ab4f8"
link_hover = "#aecbfa"
accent = "#1f6fb5"
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
{light}
}}

@media (prefers-color-scheme: dark) {{
    :root {{
{dark}
    }}
}}"#,
        light = color_vars(&colors.light, "    "),
        dark = color_vars(&colors.dark, "        "),
    )
}

fn color_vars(scheme: &ColorScheme, indent: &str) -> String {
    [
        ("bg", &scheme.background),
        ("text", &scheme.text),
        ("text-muted", &scheme.text_muted),
        ("border", &scheme.border),
        ("link", &scheme.link),
        ("link-hover", &scheme.link_hover),
        ("accent", &scheme.accent),
    ]
    .iter()
    .map(|(name, value)| format!("{indent}--color-{name}: {value};"))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Generate CSS custom properties from theme and banner settings.
pub fn generate_theme_css(theme: &ThemeConfig, images: &ImagesConfig) -> String {
    format!(
        r#":root {{
    --content-width: {content_width};
    --card-gap: {card_gap};
    --banner-aspect: {banner_w} / {banner_h};
}}"#,
        content_width = theme.content_width,
        card_gap = theme.card_gap,
        banner_w = images.banner_width,
        banner_h = images.banner_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn overlay(toml_str: &str) -> Option<toml::Value> {
        Some(toml::from_str(toml_str).unwrap())
    }

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.cms.dataset, "production");
        assert_eq!(config.homepage.article_count, 6);
        assert_eq!(config.carousel.autoplay_delay(), Duration::from_secs(5));
        assert!(!config.carousel.stop_on_interaction);
        assert_eq!(config.images.banner_variants.len(), 3);
        assert_eq!(config.images.banner_variants[0].format, Some(Format::Webp));
        assert_eq!(config.colors.light.background, "#ffffff");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[colors.light]
background = "#fafafa"
"##;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.colors.light.background, "#fafafa");
        assert_eq!(config.colors.light.text, "#1a1a1a");
        assert_eq!(config.homepage.article_count, 6);
    }

    #[test]
    fn parse_variant_tables() {
        let toml = r#"
[images]
cover_variants = [{ width = 320, height = 180, format = "jpg" }]
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.images.cover_variants,
            vec![Variant {
                width: 320,
                height: Some(180),
                format: Some(Format::Jpg)
            }]
        );
        assert_eq!(config.images.body_variants.len(), 2);
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config.site.language, "es");
    }

    #[test]
    fn load_raw_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[homepage]\narticle_count = 3\n").unwrap();
        let value = load_raw_config(&path).unwrap().unwrap();
        assert_eq!(
            value.get("homepage").unwrap().get("article_count").unwrap().as_integer(),
            Some(3)
        );
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn resolve_config_merges_overlay() {
        let config = resolve_config(
            overlay("[cms]\nproject_id = \"abc123\"\n[carousel]\nautoplay_delay_ms = 8000\n"),
            no_env,
        )
        .unwrap();
        assert_eq!(config.cms.project_id, "abc123");
        assert_eq!(config.cms.dataset, "production");
        assert_eq!(config.carousel.autoplay_delay_ms, 8000);
    }

    // =========================================================================
    // Environment overrides
    // =========================================================================

    #[test]
    fn env_overrides_file() {
        let config = resolve_config(
            overlay("[cms]\nproject_id = \"fromfile\"\n"),
            env(&[
                ("SANITY_PROJECT_ID", "fromenv"),
                ("SANITY_API_TOKEN", "sk-secret"),
                ("DEPLOY_HOOK_URL", "https://hooks.example.com/build"),
                ("SITE_URL", "https://www.example.edu"),
            ]),
        )
        .unwrap();
        assert_eq!(config.cms.project_id, "fromenv");
        assert_eq!(config.cms.token.as_deref(), Some("sk-secret"));
        assert_eq!(config.deploy.hook_url.as_deref(), Some("https://hooks.example.com/build"));
        assert_eq!(config.site.base_url.as_deref(), Some("https://www.example.edu"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let config = resolve_config(
            overlay("[cms]\ndataset = \"staging\"\n"),
            env(&[("SANITY_DATASET", "  ")]),
        )
        .unwrap();
        assert_eq!(config.cms.dataset, "staging");
    }

    #[test]
    fn env_values_are_validated() {
        let result = resolve_config(None, env(&[("DEPLOY_HOOK_URL", "ftp://nope")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases: Vec<fn(&mut SiteConfig)> = vec![
            |c| c.homepage.article_count = 0,
            |c| c.carousel.autoplay_delay_ms = 0,
            |c| c.images.banner_variants.clear(),
            |c| c.images.body_variants[0].width = 0,
            |c| c.cms.api_version = "latest".into(),
            |c| c.cms.project_id = "Has Spaces".into(),
            |c| c.cms.dataset = String::new(),
            |c| c.site.base_url = Some("www.example.edu".into()),
            |c| c.deploy.timeout_secs = 0,
        ];
        for (i, mutate) in cases.into_iter().enumerate() {
            let mut config = SiteConfig::default();
            mutate(&mut config);
            assert!(config.validate().is_err(), "case {i} should fail");
        }
    }

    #[test]
    fn api_version_forms() {
        let mut config = SiteConfig::default();
        for version in ["2025-02-19", "v2025-02-19", "1"] {
            config.cms.api_version = version.to_string();
            assert!(config.validate().is_ok(), "{version}");
        }
    }

    #[test]
    fn project_id_is_required_on_use() {
        let mut config = SiteConfig::default();
        assert!(config.require_project_id().is_err());
        config.cms.project_id = "abc123".to_string();
        assert_eq!(config.require_project_id().unwrap(), "abc123");
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[cms]\nprojectId = \"x\"\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[carrousel]\nautoplay_delay_ms = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_variant_key_rejected() {
        let result: Result<SiteConfig, _> =
            toml::from_str("[images]\nbody_variants = [{ widht = 600 }]\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str("[colors.light]\nbackground = \"#fff\"\ntext = \"#000\"\n").unwrap();
        let overlay: toml::Value = toml::from_str("[colors.light]\nbackground = \"#fafafa\"\n").unwrap();
        let merged = merge_toml(base, overlay);
        let light = merged.get("colors").unwrap().get("light").unwrap();
        assert_eq!(light.get("background").unwrap().as_str(), Some("#fafafa"));
        assert_eq!(light.get("text").unwrap().as_str(), Some("#000"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("sizes = [1, 2, 3]").unwrap();
        let overlay: toml::Value = toml::from_str("sizes = [9]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("sizes").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // stock_config_toml
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.images.banner_variants, defaults.images.banner_variants);
        assert_eq!(config.images.cover_variants, defaults.images.cover_variants);
        assert_eq!(config.homepage.article_count, defaults.homepage.article_count);
        assert_eq!(config.colors.dark.accent, defaults.colors.dark.accent);
        assert_eq!(config.site.title, defaults.site.title);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        for section in ["site", "cms", "images", "carousel", "homepage", "deploy", "theme", "colors"] {
            assert!(val.get(section).is_some(), "{section}");
        }
        assert!(val.get("cms").unwrap().get("token").is_none());
    }

    // =========================================================================
    // CSS generation
    // =========================================================================

    #[test]
    fn generate_css_includes_all_variables() {
        let css = generate_color_css(&ColorConfig::default());
        for var in ["--color-bg:", "--color-text:", "--color-text-muted:", "--color-accent:"] {
            assert_eq!(css.matches(var).count(), 2, "{var}");
        }
        assert!(css.contains("@media (prefers-color-scheme: dark)"));
    }

    #[test]
    fn generate_theme_css_includes_banner_aspect() {
        let css = generate_theme_css(&ThemeConfig::default(), &ImagesConfig::default());
        assert!(css.contains("--banner-aspect: 1920 / 600;"));
        assert!(css.contains("--content-width: 72rem;"));
    }
}

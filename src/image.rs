//! CDN image URLs for CMS image assets.
//!
//! The CMS stores images once, at full resolution. Every size and format the
//! site shows is requested from the image CDN through query parameters, and
//! the CDN performs (and caches) the transform. Building a URL is therefore
//! pure string work: no network, no local cache.
//!
//! ## Asset ids
//!
//! Image assets are identified as `image-<hash>-<W>x<H>-<ext>`:
//!
//! ```text
//! image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg
//!   → https://cdn.sanity.io/images/<project>/<dataset>/Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000.jpg
//! ```
//!
//! The original dimensions embedded in the id are what crop rectangles and
//! focal points are computed against.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let builder = ImageUrlBuilder::new("kqzxfqcl", "production");
//! let url = builder.image(&banner.imagen).width(1920).height(600).url()?;
//! let srcset = builder.srcset(&banner.imagen, &config.images.banner_variants)?;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default image CDN host.
pub const DEFAULT_CDN_URL: &str = "https://cdn.sanity.io";

#[derive(Error, Debug, PartialEq)]
pub enum ImageUrlError {
    #[error("image has no asset")]
    MissingAsset,
    #[error("malformed image asset id: {0}")]
    MalformedAssetId(String),
}

/// An image field as stored on a document (`portada`, `imagen`, body images).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageField {
    #[serde(default)]
    pub asset: Option<Asset>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotspot: Option<Hotspot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,
}

impl ImageField {
    /// Alt text, falling back to `fallback` when the field is missing or blank.
    pub fn alt_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.alt.as_deref() {
            Some(alt) if !alt.trim().is_empty() => alt,
            _ => fallback,
        }
    }
}

/// Asset pointer: either a bare reference or the expanded asset document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "_ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Asset {
    /// The asset document id, whichever shape the asset arrived in.
    pub fn asset_id(&self) -> Option<&str> {
        self.reference.as_deref().or(self.id.as_deref())
    }
}

/// Focal point chosen by the editor, as fractions of the full image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub x: f64,
    pub y: f64,
    #[serde(default = "one")]
    pub width: f64,
    #[serde(default = "one")]
    pub height: f64,
}

fn one() -> f64 {
    1.0
}

/// Crop insets from each edge, as fractions of the full image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub right: f64,
}

/// Parsed `image-<hash>-<W>x<H>-<ext>` asset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetId {
    pub hash: String,
    pub width: u32,
    pub height: u32,
    pub extension: String,
}

impl FromStr for AssetId {
    type Err = ImageUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ImageUrlError::MalformedAssetId(s.to_string());
        let rest = s.strip_prefix("image-").ok_or_else(malformed)?;
        let mut parts = rest.rsplitn(3, '-');
        let extension = parts.next().filter(|e| !e.is_empty()).ok_or_else(malformed)?;
        let dimensions = parts.next().ok_or_else(malformed)?;
        let hash = parts.next().filter(|h| !h.is_empty()).ok_or_else(malformed)?;
        let (w, h) = dimensions.split_once('x').ok_or_else(malformed)?;
        let width: u32 = w.parse().map_err(|_| malformed())?;
        let height: u32 = h.parse().map_err(|_| malformed())?;
        if width == 0 || height == 0 {
            return Err(malformed());
        }
        Ok(AssetId {
            hash: hash.to_string(),
            width,
            height,
            extension: extension.to_string(),
        })
    }
}

/// Output format requested from the CDN (`fm=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Jpg,
    Pjpg,
    Png,
    Webp,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Format::Jpg => "jpg",
            Format::Pjpg => "pjpg",
            Format::Png => "png",
            Format::Webp => "webp",
        };
        f.write_str(s)
    }
}

/// How the CDN fits the image into the requested box (`fit=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Clip,
    Crop,
    Fill,
    FillMax,
    Max,
    Scale,
    Min,
}

impl fmt::Display for Fit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Fit::Clip => "clip",
            Fit::Crop => "crop",
            Fit::Fill => "fill",
            Fit::FillMax => "fillmax",
            Fit::Max => "max",
            Fit::Scale => "scale",
            Fit::Min => "min",
        };
        f.write_str(s)
    }
}

/// One entry of a responsive source set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variant {
    pub width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
}

/// Builds CDN URLs for one project and dataset.
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    base_url: String,
    project_id: String,
    dataset: String,
}

impl ImageUrlBuilder {
    pub fn new(project_id: &str, dataset: &str) -> Self {
        Self {
            base_url: DEFAULT_CDN_URL.to_string(),
            project_id: project_id.to_string(),
            dataset: dataset.to_string(),
        }
    }

    /// Use a different CDN host (mirrors, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Start a URL for `source`.
    pub fn image<'a>(&'a self, source: &'a ImageField) -> ImageUrl<'a> {
        ImageUrl {
            builder: self,
            source,
            width: None,
            height: None,
            format: None,
            quality: None,
            fit: None,
            auto_format: false,
        }
    }

    /// `srcset` attribute value with one candidate per variant.
    pub fn srcset(&self, source: &ImageField, variants: &[Variant]) -> Result<String, ImageUrlError> {
        let mut candidates = Vec::with_capacity(variants.len());
        for variant in variants {
            let mut url = self.image(source).width(variant.width);
            if let Some(height) = variant.height {
                url = url.height(height);
            }
            if let Some(format) = variant.format {
                url = url.format(format);
            }
            candidates.push(format!("{} {}w", url.url()?, variant.width));
        }
        Ok(candidates.join(", "))
    }
}

/// A URL under construction. Transforms are applied in [`ImageUrl::url`].
#[derive(Debug, Clone)]
pub struct ImageUrl<'a> {
    builder: &'a ImageUrlBuilder,
    source: &'a ImageField,
    width: Option<u32>,
    height: Option<u32>,
    format: Option<Format>,
    quality: Option<u8>,
    fit: Option<Fit>,
    auto_format: bool,
}

impl ImageUrl<'_> {
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Encoding quality, clamped to 0–100.
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality.min(100));
        self
    }

    pub fn fit(mut self, fit: Fit) -> Self {
        self.fit = Some(fit);
        self
    }

    /// Let the CDN pick the best format the browser accepts (`auto=format`).
    pub fn auto_format(mut self) -> Self {
        self.auto_format = true;
        self
    }

    pub fn url(&self) -> Result<String, ImageUrlError> {
        let asset = self.source.asset.as_ref().ok_or(ImageUrlError::MissingAsset)?;
        let id: AssetId = asset
            .asset_id()
            .ok_or(ImageUrlError::MissingAsset)?
            .parse()?;

        let mut url = format!(
            "{}/images/{}/{}/{}-{}x{}.{}",
            self.builder.base_url,
            self.builder.project_id,
            self.builder.dataset,
            id.hash,
            id.width,
            id.height,
            id.extension
        );

        let rect = self.source.crop.and_then(|crop| crop_rect(&id, &crop));
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(rect) = rect {
            params.push((
                "rect",
                format!("{},{},{},{}", rect.left, rect.top, rect.width, rect.height),
            ));
        }
        if let Some(w) = self.width {
            params.push(("w", w.to_string()));
        }
        if let Some(h) = self.height {
            params.push(("h", h.to_string()));
        }
        if let Some(q) = self.quality {
            params.push(("q", q.to_string()));
        }
        if let Some(fm) = self.format {
            params.push(("fm", fm.to_string()));
        }
        if self.auto_format {
            params.push(("auto", "format".to_string()));
        }

        let focal = match (self.source.hotspot, self.width, self.height) {
            (Some(hotspot), Some(_), Some(_)) => Some(focal_point(&id, &hotspot, rect)),
            _ => None,
        };
        match (focal, self.fit) {
            (Some((fx, fy)), fit) => {
                params.push(("fit", fit.unwrap_or(Fit::Crop).to_string()));
                params.push(("crop", "focalpoint".to_string()));
                params.push(("fp-x", format_fraction(fx)));
                params.push(("fp-y", format_fraction(fy)));
            }
            (None, Some(fit)) => params.push(("fit", fit.to_string())),
            (None, None) => {}
        }

        if !params.is_empty() {
            let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        Ok(url)
    }
}

/// Source-pixel rectangle selected by a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

/// Pixel rectangle for `crop`, or `None` when the crop keeps the whole image.
fn crop_rect(id: &AssetId, crop: &Crop) -> Option<Rect> {
    let w = f64::from(id.width);
    let h = f64::from(id.height);
    let left = (crop.left.clamp(0.0, 1.0) * w).round();
    let top = (crop.top.clamp(0.0, 1.0) * h).round();
    let width = (w - crop.right.clamp(0.0, 1.0) * w - left).round();
    let height = (h - crop.bottom.clamp(0.0, 1.0) * h - top).round();
    if width < 1.0 || height < 1.0 {
        return None;
    }
    let rect = Rect {
        left: left as u32,
        top: top as u32,
        width: width as u32,
        height: height as u32,
    };
    let whole = rect.left == 0 && rect.top == 0 && rect.width == id.width && rect.height == id.height;
    (!whole).then_some(rect)
}

/// Hotspot centre relative to the (possibly cropped) image, clamped to 0–1.
fn focal_point(id: &AssetId, hotspot: &Hotspot, rect: Option<Rect>) -> (f64, f64) {
    let x = hotspot.x * f64::from(id.width);
    let y = hotspot.y * f64::from(id.height);
    let (fx, fy) = match rect {
        Some(r) => (
            (x - f64::from(r.left)) / f64::from(r.width),
            (y - f64::from(r.top)) / f64::from(r.height),
        ),
        None => (hotspot.x, hotspot.y),
    };
    (fx.clamp(0.0, 1.0), fy.clamp(0.0, 1.0))
}

/// Fractions printed with at most three decimals and no trailing zeros.
fn format_fraction(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

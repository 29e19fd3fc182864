//! Read queries and the page-ready payloads they produce.
//!
//! Every page is fed by one named query. A [`ContentQuery`] knows its GROQ
//! text and parameters (used by the HTTP client) and is also what the
//! in-memory [`Dataset`](crate::dataset::Dataset) evaluates natively. Both
//! sources return the same JSON shape, and the typed methods on
//! [`ContentSource`] decode it into the projections below, so the decoding
//! path is shared.
//!
//! | Query | Filter | Order | Used by |
//! |-------|--------|-------|---------|
//! | `Articles` | `noticia` with a slug | `fechaPublicacion desc` | article listing |
//! | `ArticleBySlug` | exact slug match | `fechaPublicacion desc`, first | article detail |
//! | `ArticleSlugs` | `noticia` with a slug | none | route enumeration |
//! | `ActiveBanners` | `banner` with `activo == true` | `posicion asc` | carousel |
//! | `BannerById` | exact id | first | preview |
//! | `Homepage` | banners + latest N articles | none | homepage, one round trip |
//! | `Courses` | `course` | `fechaInicio asc` | course listing |
//! | `Presidents` | `presidente` | `periodo.añoDesde desc` | president listing |
//! | `AllDocuments` | the four schema types, no drafts | none | `check` |
//!
//! Empty results are valid. A slug or id that matches nothing is `None`.

use crate::image::ImageField;
use crate::link::Link;
use crate::portable_text::BodyBlock;
use crate::schema::{Audience, Periodo, Slug};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

// ============================================================================
// GROQ
// ============================================================================

/// Image projection: expand the asset, keep editor metadata.
pub const IMAGE_PROJECTION: &str = "{ asset->, alt, caption, hotspot, crop }";

/// Link projection: resolve an internal target one level deep.
pub const LINK_PROJECTION: &str = "{ tipo, url, slug-> { _id, titulo, slug } }";

const ARTICLE_FILTER: &str = r#"_type == "noticia" && defined(slug.current)"#;
const BANNER_FILTER: &str = r#"_type == "banner" && activo == true"#;

fn article_summary_projection() -> String {
    format!("{{ _id, titulo, slug, fechaPublicacion, portada {IMAGE_PROJECTION} }}")
}

fn banner_projection(with_activo: bool) -> String {
    let activo = if with_activo { " activo," } else { "" };
    format!(
        "{{ _id, titulo, imagen {IMAGE_PROJECTION}, posicion,{activo} link {LINK_PROJECTION} }}"
    )
}

/// A named read query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentQuery {
    Articles,
    ArticleBySlug(String),
    ArticleSlugs,
    ActiveBanners,
    BannerById(String),
    Homepage { article_count: usize },
    Courses,
    Presidents,
    AllDocuments,
}

impl ContentQuery {
    /// Short name for logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            ContentQuery::Articles => "articles",
            ContentQuery::ArticleBySlug(_) => "article-by-slug",
            ContentQuery::ArticleSlugs => "article-slugs",
            ContentQuery::ActiveBanners => "active-banners",
            ContentQuery::BannerById(_) => "banner-by-id",
            ContentQuery::Homepage { .. } => "homepage",
            ContentQuery::Courses => "courses",
            ContentQuery::Presidents => "presidents",
            ContentQuery::AllDocuments => "all-documents",
        }
    }

    /// GROQ text sent to the content API.
    pub fn groq(&self) -> String {
        match self {
            ContentQuery::Articles => format!(
                "*[{ARTICLE_FILTER}] | order(fechaPublicacion desc) {}",
                article_summary_projection()
            ),
            ContentQuery::ArticleBySlug(_) => format!(
                r#"*[_type == "noticia" && slug.current == $slug] | order(fechaPublicacion desc) [0] {{ _id, titulo, slug, fechaPublicacion, portada {IMAGE_PROJECTION}, contenido[] {{ ..., _type == "image" => {IMAGE_PROJECTION} }} }}"#
            ),
            ContentQuery::ArticleSlugs => {
                format!(r#"*[{ARTICLE_FILTER}] {{ "slug": slug.current }}"#)
            }
            ContentQuery::ActiveBanners => format!(
                "*[{BANNER_FILTER}] | order(posicion asc) {}",
                banner_projection(false)
            ),
            ContentQuery::BannerById(_) => format!(
                r#"*[_type == "banner" && _id == $id][0] {}"#,
                banner_projection(true)
            ),
            ContentQuery::Homepage { article_count } => format!(
                r#"{{ "banners": *[{BANNER_FILTER}] | order(posicion asc) {}, "noticias": *[{ARTICLE_FILTER}] | order(fechaPublicacion desc) [0...{article_count}] {} }}"#,
                banner_projection(false),
                article_summary_projection()
            ),
            ContentQuery::Courses => format!(
                r#"*[_type == "course"] | order(fechaInicio asc) {{ _id, titulo, slug, publicoObjetivo, imagenPortada {IMAGE_PROJECTION}, fechaInicio, fechaFin, descripcionCorta }}"#
            ),
            ContentQuery::Presidents => format!(
                r#"*[_type == "presidente"] | order(periodo.añoDesde desc) {{ _id, nombreCompleto, slug, periodo, retrato {IMAGE_PROJECTION}, biografia }}"#
            ),
            ContentQuery::AllDocuments => r#"*[_type in ["noticia", "banner", "course", "presidente"] && !(_id in path("drafts.**"))]"#.to_string(),
        }
    }

    /// Query parameters as `(name, JSON value)` pairs, without the `$`.
    pub fn params(&self) -> Vec<(&'static str, serde_json::Value)> {
        match self {
            ContentQuery::ArticleBySlug(slug) => vec![("slug", serde_json::Value::from(slug.as_str()))],
            ContentQuery::BannerById(id) => vec![("id", serde_json::Value::from(id.as_str()))],
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// Projections
// ============================================================================

/// Article as shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub titulo: String,
    pub slug: Slug,
    #[serde(rename = "fechaPublicacion", default, deserialize_with = "invalid_as_none")]
    pub fecha_publicacion: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "invalid_as_none")]
    pub portada: Option<ImageField>,
}

/// Article with its full body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDetail {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub titulo: String,
    pub slug: Slug,
    #[serde(rename = "fechaPublicacion", default, deserialize_with = "invalid_as_none")]
    pub fecha_publicacion: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "invalid_as_none")]
    pub portada: Option<ImageField>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contenido: Vec<BodyBlock>,
}

/// Active banner with its link target resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannerPopulated {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub titulo: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub imagen: ImageField,
    /// `None` when missing or not an integer; such banners sort last.
    #[serde(default, deserialize_with = "invalid_as_none")]
    pub posicion: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activo: Option<bool>,
    #[serde(default)]
    pub link: Option<Link>,
}

/// Everything the homepage shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomepageBundle {
    #[serde(default, deserialize_with = "null_as_default")]
    pub banners: Vec<BannerPopulated>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub noticias: Vec<ArticleSummary>,
}

/// Course as shown in the course listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub titulo: String,
    #[serde(default)]
    pub slug: Option<Slug>,
    #[serde(rename = "publicoObjetivo", default)]
    pub publico_objetivo: Option<String>,
    #[serde(rename = "imagenPortada", default, deserialize_with = "invalid_as_none")]
    pub imagen_portada: Option<ImageField>,
    #[serde(rename = "fechaInicio", default, deserialize_with = "invalid_as_none")]
    pub fecha_inicio: Option<DateTime<Utc>>,
    #[serde(rename = "fechaFin", default, deserialize_with = "invalid_as_none")]
    pub fecha_fin: Option<DateTime<Utc>>,
    #[serde(rename = "descripcionCorta", default)]
    pub descripcion_corta: Option<String>,
}

impl CourseSummary {
    pub fn audience(&self) -> Option<Audience> {
        self.publico_objetivo.as_deref().and_then(Audience::parse)
    }
}

/// President as shown in the president listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresidentSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "nombreCompleto", default, deserialize_with = "null_as_default")]
    pub nombre_completo: String,
    #[serde(default)]
    pub slug: Option<Slug>,
    #[serde(default, deserialize_with = "invalid_as_none")]
    pub periodo: Option<Periodo>,
    #[serde(default, deserialize_with = "invalid_as_none")]
    pub retrato: Option<ImageField>,
    #[serde(default)]
    pub biografia: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlugRow {
    slug: Option<String>,
}

/// GROQ yields `null` for missing fields; treat that like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A value of the wrong shape reads as missing instead of failing the whole
/// result. Used for fields the pages can render without.
fn invalid_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

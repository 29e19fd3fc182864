//! Content schema: document types and their write-time rules.
//!
//! The CMS enforces these rules in the editor. They are restated here so the
//! `check` command can audit a dataset: documents written before a rule
//! existed, imported data, or anything edited through the raw API can still
//! violate them, and rendering only degrades around such data.
//!
//! | Type | Document | Key rules |
//! |------|----------|-----------|
//! | `noticia` | [`NewsArticle`] | title 10–100 chars, unique URL-safe slug, publication date, alt text on images |
//! | `banner` | [`Banner`] | title 3–60 chars, image with alt, positive integer position, valid link |
//! | `course` | [`Course`] | title, slug, target audience, end not before start |
//! | `presidente` | [`President`] | full name, slug, term start 1800–2100, term end not before start |
//!
//! Documents are decoded leniently (every field optional) so a single bad
//! field shows up as a [`Violation`] instead of hiding the whole document.

use crate::image::{Asset, ImageField};
use crate::link::Reference;
use crate::portable_text::BodyBlock;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

pub const NOTICIA: &str = "noticia";
pub const BANNER: &str = "banner";
pub const COURSE: &str = "course";
pub const PRESIDENTE: &str = "presidente";

/// Document types the site reads.
pub const SCHEMA_TYPES: [&str; 4] = [NOTICIA, BANNER, COURSE, PRESIDENTE];

/// Maximum slug length the editor generates.
pub const SLUG_MAX_LEN: usize = 96;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static HTTP_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").expect("valid regex"));

/// Derive a slug from a title.
///
/// Lowercases, strips diacritics (NFD + combining marks removed), drops
/// anything that isn't a word character, whitespace or hyphen, and joins
/// words with hyphens:
///
/// - `"Inauguración del Año Académico"` → `"inauguracion-del-ano-academico"`
/// - `"¡Becas 2026!"` → `"becas-2026"`
pub fn slugify(input: &str) -> String {
    let folded: String = input
        .to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect();
    let cleaned = NON_SLUG_CHARS.replace_all(&folded, "");
    let hyphenated = WHITESPACE_RUN.replace_all(cleaned.trim(), "-");
    hyphenated.chars().take(SLUG_MAX_LEN).collect()
}

/// Whether `slug` can be used verbatim as a path segment.
pub fn is_url_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.chars().count() <= SLUG_MAX_LEN
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Slug field value (`{ "current": "..." }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    pub current: String,
}

/// Fields every stored document carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub doc_type: String,
    #[serde(rename = "_createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "_updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
}

/// `noticia`: a news article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub slug: Option<Slug>,
    #[serde(rename = "fechaPublicacion", default)]
    pub fecha_publicacion: Option<DateTime<Utc>>,
    #[serde(default)]
    pub portada: Option<ImageField>,
    #[serde(default)]
    pub contenido: Option<Vec<BodyBlock>>,
}

/// `banner`: a homepage carousel slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub imagen: Option<ImageField>,
    #[serde(default)]
    pub posicion: Option<serde_json::Number>,
    #[serde(default)]
    pub activo: Option<bool>,
    #[serde(default)]
    pub link: Option<LinkField>,
}

/// A link as stored, before any resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkField {
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub slug: Option<Reference>,
}

/// Who a course is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Personas,
    Empresas,
    Ambos,
}

impl Audience {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "personas" => Some(Audience::Personas),
            "empresas" => Some(Audience::Empresas),
            "ambos" => Some(Audience::Ambos),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Audience::Personas => "Público general",
            Audience::Empresas => "Empresas",
            Audience::Ambos => "Personas y empresas",
        }
    }
}

/// `course`: a course offered by the institution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub slug: Option<Slug>,
    #[serde(rename = "publicoObjetivo", default)]
    pub publico_objetivo: Option<String>,
    #[serde(rename = "imagenPortada", default)]
    pub imagen_portada: Option<ImageField>,
    #[serde(rename = "fechaInicio", default)]
    pub fecha_inicio: Option<DateTime<Utc>>,
    #[serde(rename = "fechaFin", default)]
    pub fecha_fin: Option<DateTime<Utc>>,
    #[serde(rename = "descripcionCorta", default)]
    pub descripcion_corta: Option<String>,
    #[serde(default)]
    pub contenido: Option<Vec<BodyBlock>>,
    #[serde(rename = "archivosAdjuntos", default)]
    pub archivos_adjuntos: Vec<Attachment>,
}

/// A downloadable file attached to a course.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub asset: Option<Asset>,
    #[serde(rename = "nombreVisible", default)]
    pub nombre_visible: Option<String>,
}

/// `presidente`: a past or current president of the institution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct President {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    #[serde(rename = "nombreCompleto", default)]
    pub nombre_completo: Option<String>,
    #[serde(default)]
    pub slug: Option<Slug>,
    #[serde(default)]
    pub periodo: Option<Periodo>,
    #[serde(default)]
    pub retrato: Option<ImageField>,
    #[serde(default)]
    pub biografia: Option<String>,
}

/// Term of office in years. An open end means the current president.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periodo {
    #[serde(rename = "añoDesde", default)]
    pub desde: Option<i64>,
    #[serde(rename = "añoHasta", default)]
    pub hasta: Option<i64>,
}

impl fmt::Display for Periodo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.desde, self.hasta) {
            (Some(desde), Some(hasta)) => write!(f, "{desde} - {hasta}"),
            (Some(desde), None) => write!(f, "{desde} - Presente"),
            (None, Some(hasta)) => write!(f, "? - {hasta}"),
            (None, None) => Ok(()),
        }
    }
}

/// Any document of a known schema type.
#[derive(Debug, Clone)]
pub enum Document {
    NewsArticle(NewsArticle),
    Banner(Banner),
    Course(Course),
    President(President),
}

impl Document {
    /// Decode a raw document. Returns `Ok(None)` for types outside the schema
    /// (image assets, system documents).
    pub fn from_value(value: serde_json::Value) -> Result<Option<Self>, serde_json::Error> {
        let doc_type = value
            .get("_type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        let document = match doc_type.as_str() {
            NOTICIA => Document::NewsArticle(serde_json::from_value(value)?),
            BANNER => Document::Banner(serde_json::from_value(value)?),
            COURSE => Document::Course(serde_json::from_value(value)?),
            PRESIDENTE => Document::President(serde_json::from_value(value)?),
            _ => return Ok(None),
        };
        Ok(Some(document))
    }

    pub fn meta(&self) -> &DocumentMeta {
        match self {
            Document::NewsArticle(d) => &d.meta,
            Document::Banner(d) => &d.meta,
            Document::Course(d) => &d.meta,
            Document::President(d) => &d.meta,
        }
    }

    /// Rule violations of this document on its own.
    pub fn validate(&self) -> Vec<Violation> {
        let mut v = Violations::new(self.meta());
        match self {
            Document::NewsArticle(d) => validate_article(d, &mut v),
            Document::Banner(d) => validate_banner(d, &mut v),
            Document::Course(d) => validate_course(d, &mut v),
            Document::President(d) => validate_president(d, &mut v),
        }
        v.into_inner()
    }
}

/// One broken rule on one document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub document_id: String,
    pub document_type: String,
    pub field: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} · {}: {}",
            self.document_type, self.document_id, self.field, self.message
        )
    }
}

struct Violations<'a> {
    meta: &'a DocumentMeta,
    found: Vec<Violation>,
}

impl<'a> Violations<'a> {
    fn new(meta: &'a DocumentMeta) -> Self {
        Self {
            meta,
            found: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.found.push(Violation {
            document_id: self.meta.id.clone(),
            document_type: self.meta.doc_type.clone(),
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn into_inner(self) -> Vec<Violation> {
        self.found
    }
}

fn check_text_len(v: &mut Violations, field: &str, value: Option<&str>, min: usize, max: usize) {
    match value.map(str::trim) {
        None | Some("") => v.push(field, "is required"),
        Some(text) => {
            let len = text.chars().count();
            if len < min {
                v.push(field, format!("must be at least {min} characters (has {len})"));
            } else if len > max {
                v.push(field, format!("must be at most {max} characters (has {len})"));
            }
        }
    }
}

fn check_required_text(v: &mut Violations, field: &str, value: Option<&str>) {
    if value.is_none_or(|s| s.trim().is_empty()) {
        v.push(field, "is required");
    }
}

fn check_slug(v: &mut Violations, slug: Option<&Slug>) {
    match slug {
        None => v.push("slug", "is required"),
        Some(slug) if slug.current.is_empty() => v.push("slug", "is required"),
        Some(slug) if !is_url_safe_slug(&slug.current) => v.push(
            "slug",
            format!("\"{}\" is not URL-safe (expected \"{}\")", slug.current, slugify(&slug.current)),
        ),
        Some(_) => {}
    }
}

fn check_image(v: &mut Violations, field: &str, image: &ImageField, alt_required: bool) {
    if image.asset.as_ref().and_then(Asset::asset_id).is_none() {
        v.push(field, "has no image asset");
    }
    if alt_required && image.alt.as_deref().is_none_or(|a| a.trim().is_empty()) {
        v.push(&format!("{field}.alt"), "alternative text is required");
    }
}

fn check_body_images(v: &mut Violations, field: &str, blocks: &[BodyBlock]) {
    for (i, block) in blocks.iter().enumerate() {
        if let BodyBlock::Image(image) = block {
            check_image(v, &format!("{field}[{i}]"), image, true);
        }
    }
}

fn validate_article(d: &NewsArticle, v: &mut Violations) {
    check_text_len(v, "titulo", d.titulo.as_deref(), 10, 100);
    check_slug(v, d.slug.as_ref());
    if d.fecha_publicacion.is_none() {
        v.push("fechaPublicacion", "is required");
    }
    if let Some(portada) = &d.portada {
        check_image(v, "portada", portada, true);
    }
    match &d.contenido {
        Some(blocks) if !blocks.is_empty() => check_body_images(v, "contenido", blocks),
        _ => v.push("contenido", "is required"),
    }
}

fn validate_banner(d: &Banner, v: &mut Violations) {
    check_text_len(v, "titulo", d.titulo.as_deref(), 3, 60);
    match &d.imagen {
        Some(imagen) => check_image(v, "imagen", imagen, true),
        None => v.push("imagen", "is required"),
    }
    match &d.posicion {
        None => v.push("posicion", "is required"),
        Some(n) => match n.as_i64() {
            Some(p) if p > 0 => {}
            Some(_) => v.push("posicion", "must be a positive number"),
            None => v.push("posicion", "must be an integer"),
        },
    }
    if let Some(link) = &d.link {
        match link.tipo.as_deref() {
            None | Some("none") => {}
            Some("external") => match link.url.as_deref() {
                None | Some("") => v.push("link.url", "is required for external links"),
                Some(url) if !HTTP_URL.is_match(url) => {
                    v.push("link.url", "must start with http:// or https://")
                }
                Some(_) => {}
            },
            Some("internal") => {
                if link.slug.is_none() {
                    v.push("link.slug", "an article must be selected for internal links");
                }
            }
            Some(other) => v.push("link.tipo", format!("unknown link type \"{other}\"")),
        }
    }
}

fn validate_course(d: &Course, v: &mut Violations) {
    check_required_text(v, "titulo", d.titulo.as_deref());
    check_slug(v, d.slug.as_ref());
    match d.publico_objetivo.as_deref() {
        None => v.push("publicoObjetivo", "is required"),
        Some(value) if Audience::parse(value).is_none() => v.push(
            "publicoObjetivo",
            format!("\"{value}\" is not one of personas, empresas, ambos"),
        ),
        Some(_) => {}
    }
    if let (Some(start), Some(end)) = (d.fecha_inicio, d.fecha_fin) {
        if end < start {
            v.push("fechaFin", "must not be before fechaInicio");
        }
    }
    if let Some(blocks) = &d.contenido {
        for (i, block) in blocks.iter().enumerate() {
            if let BodyBlock::Image(image) = block {
                check_image(v, &format!("contenido[{i}]"), image, false);
            }
        }
    }
}

fn validate_president(d: &President, v: &mut Violations) {
    check_required_text(v, "nombreCompleto", d.nombre_completo.as_deref());
    check_slug(v, d.slug.as_ref());
    let periodo = d.periodo.unwrap_or_default();
    match periodo.desde {
        None => v.push("periodo.añoDesde", "is required"),
        Some(year) if !(1800..=2100).contains(&year) => {
            v.push("periodo.añoDesde", "must be between 1800 and 2100")
        }
        Some(_) => {}
    }
    if let (Some(desde), Some(hasta)) = (periodo.desde, periodo.hasta) {
        if hasta < desde {
            v.push("periodo.añoHasta", "must not be before añoDesde");
        }
    }
}

/// Validate a whole dataset: every document on its own, plus rules that span
/// documents (unique article slugs, internal links pointing at articles).
///
/// Documents that can't be decoded at all are reported as a violation on the
/// `document` field.
pub fn validate_all(values: &[serde_json::Value]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut documents = Vec::new();

    for value in values {
        match Document::from_value(value.clone()) {
            Ok(Some(document)) => documents.push(document),
            Ok(None) => {}
            Err(e) => violations.push(Violation {
                document_id: value
                    .get("_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("?")
                    .to_string(),
                document_type: value
                    .get("_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("?")
                    .to_string(),
                field: "document".to_string(),
                message: format!("could not be read: {e}"),
            }),
        }
    }

    for document in &documents {
        violations.extend(document.validate());
    }

    let article_ids: HashSet<&str> = documents
        .iter()
        .filter_map(|d| match d {
            Document::NewsArticle(a) => Some(a.meta.id.as_str()),
            _ => None,
        })
        .collect();

    let mut slug_owners: HashMap<&str, &str> = HashMap::new();
    for document in &documents {
        match document {
            Document::NewsArticle(article) => {
                let Some(slug) = article.slug.as_ref().filter(|s| !s.current.is_empty()) else {
                    continue;
                };
                if let Some(owner) = slug_owners.insert(&slug.current, &article.meta.id) {
                    violations.push(Violation {
                        document_id: article.meta.id.clone(),
                        document_type: NOTICIA.to_string(),
                        field: "slug".to_string(),
                        message: format!("\"{}\" is already used by {owner}", slug.current),
                    });
                }
            }
            Document::Banner(banner) => {
                let target = banner
                    .link
                    .as_ref()
                    .filter(|l| l.tipo.as_deref() == Some("internal"))
                    .and_then(|l| l.slug.as_ref());
                if let Some(reference) = target {
                    if !article_ids.contains(reference.id.as_str()) {
                        violations.push(Violation {
                            document_id: banner.meta.id.clone(),
                            document_type: BANNER.to_string(),
                            field: "link.slug".to_string(),
                            message: format!("points at missing article {}", reference.id),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    violations
}

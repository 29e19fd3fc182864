//! HTML site generation.
//!
//! Stage 2 of the build pipeline. Takes the fetched [`Snapshot`] and writes
//! the final static site.
//!
//! ## Generated Pages
//!
//! | Route | Content |
//! |-------|---------|
//! | `/` | banner carousel + latest articles |
//! | `/noticias/` | every article, newest first |
//! | `/noticias/{slug}/` | article detail with its rich-text body |
//! | `/cursos/` | courses by start date |
//! | `/presidentes/` | presidents, most recent first |
//! | `/404.html` | not-found page |
//!
//! Article detail pages are independent and rendered in parallel with rayon.
//! Articles whose slug is not URL-safe are skipped (and reported) rather than
//! written to a path derived from editor input.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── 404.html
//! ├── assets/
//! │   ├── style.3f9c2a1b.css      # content-hashed
//! │   └── carousel.8d01e7aa.js
//! ├── noticias/
//! │   ├── index.html
//! │   └── inauguracion-del-ano-academico/index.html
//! ├── cursos/index.html
//! ├── presidentes/index.html
//! └── favicon.ico                  # from public/, copied verbatim
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: base styles (colors and layout injected from config)
//! - `static/carousel.js`: carousel navigation and autoplay
//!
//! Both are written under `assets/` with a short content hash in the file
//! name, so they can be cached forever.
//!
//! ## Images
//!
//! Nothing is downloaded or resized locally: every `<img>` points at the
//! image CDN through [`ImageUrlBuilder`]. An image whose asset can't be
//! resolved is left out of the page.

use crate::carousel::{SlideImage, render_carousel};
use crate::config::{self, ConfigError, SiteConfig};
use crate::image::{Fit, ImageField, ImageUrlBuilder, Variant};
use crate::link::ARTICLE_ROUTE_PREFIX;
use crate::portable_text::{plain_text, render_body};
use crate::query::{ArticleDetail, ArticleSummary, CourseSummary, PresidentSummary};
use crate::schema::is_url_safe_slug;
use crate::types::Snapshot;
use chrono::{DateTime, Datelike, Utc};
use maud::{DOCTYPE, Markup, html};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("copying public files: {0}")]
    Walk(#[from] walkdir::Error),
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const CAROUSEL_JS: &str = include_str!("../static/carousel.js");

/// Cover images in cards and article headers are cropped to 16:9.
const COVER_WIDTH: u32 = 800;
const COVER_HEIGHT: u32 = 450;
/// Portrait crop on the presidents page.
const PORTRAIT_SIZE: u32 = 320;
/// Longest meta description, in characters.
const DESCRIPTION_LEN: usize = 160;

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// A page that was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub title: String,
    /// Output path relative to the output directory.
    pub path: String,
}

/// What a generate run produced.
#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    pub pages: Vec<PageReport>,
    /// Article pages written.
    pub articles: usize,
    /// Slugs not rendered because they are not URL-safe.
    pub skipped: Vec<String>,
    /// Hashed asset paths.
    pub assets: Vec<String>,
    /// Files copied from `public/`.
    pub public_files: usize,
}

/// Top-level navigation sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Home,
    News,
    Courses,
    Presidents,
    Other,
}

const NAV: [(Section, &str, &str); 4] = [
    (Section::Home, "Inicio", "/"),
    (Section::News, "Noticias", "/noticias/"),
    (Section::Courses, "Cursos", "/cursos/"),
    (Section::Presidents, "Presidentes", "/presidentes/"),
];

/// Everything page renderers share.
struct Site<'a> {
    config: &'a SiteConfig,
    images: ImageUrlBuilder,
    css_href: String,
    js_href: String,
}

/// Read a snapshot written by `fetch`.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, GenerateError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write the whole site for `snapshot` into `output_dir`, then copy
/// `public_dir` (if it exists) on top.
pub fn generate(
    snapshot: &Snapshot,
    output_dir: &Path,
    public_dir: Option<&Path>,
) -> Result<GenerateReport, GenerateError> {
    let config = &snapshot.config;
    let project_id = config.require_project_id()?;
    let images = ImageUrlBuilder::new(project_id, &config.cms.dataset)
        .with_base_url(&config.images.cdn_url);

    fs::create_dir_all(output_dir.join("assets"))?;
    let mut report = GenerateReport::default();

    let css = format!(
        "{}\n\n{}\n\n{}",
        config::generate_color_css(&config.colors),
        config::generate_theme_css(&config.theme, &config.images),
        CSS_STATIC
    );
    let css_href = write_asset(output_dir, "style", "css", &css)?;
    let js_href = write_asset(output_dir, "carousel", "js", CAROUSEL_JS)?;
    report.assets = vec![css_href.clone(), js_href.clone()];

    let site = Site {
        config,
        images,
        css_href,
        js_href,
    };

    let listing_pages = [
        (config.site.title.clone(), "index.html", render_index(&site, snapshot)),
        ("Noticias".to_string(), "noticias/index.html", render_news_list(&site, &snapshot.listing)),
        ("Cursos".to_string(), "cursos/index.html", render_courses(&site, &snapshot.courses)),
        (
            "Presidentes".to_string(),
            "presidentes/index.html",
            render_presidents(&site, &snapshot.presidents),
        ),
        ("Página no encontrada".to_string(), "404.html", render_not_found(&site)),
    ];
    for (title, path, markup) in listing_pages {
        write_page(output_dir, path, markup)?;
        report.pages.push(PageReport {
            title,
            path: path.to_string(),
        });
    }

    let (routable, skipped): (Vec<&ArticleDetail>, Vec<&ArticleDetail>) = snapshot
        .articles
        .iter()
        .partition(|a| is_url_safe_slug(&a.slug.current));
    for article in &skipped {
        tracing::warn!(article = %article.id, slug = %article.slug.current, "slug is not URL-safe, page skipped");
        report.skipped.push(article.slug.current.clone());
    }

    let article_pages = routable
        .par_iter()
        .map(|article| {
            let path = format!("noticias/{}/index.html", article.slug.current);
            write_page(output_dir, &path, render_article(&site, article))?;
            Ok(PageReport {
                title: article.titulo.clone(),
                path,
            })
        })
        .collect::<Result<Vec<_>, GenerateError>>()?;
    report.articles = article_pages.len();
    report.pages.extend(article_pages);

    if let Some(public) = public_dir.filter(|p| p.is_dir()) {
        report.public_files = copy_public(public, output_dir)?;
    }

    tracing::info!(
        pages = report.pages.len(),
        skipped = report.skipped.len(),
        public_files = report.public_files,
        output = %output_dir.display(),
        "site generated"
    );
    Ok(report)
}

fn write_page(output_dir: &Path, relative: &str, markup: Markup) -> Result<(), GenerateError> {
    let path = output_dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, markup.into_string())?;
    tracing::debug!(path = relative, "page written");
    Ok(())
}

/// `assets/{stem}.{hash}.{ext}` for `content`.
pub fn hashed_asset_name(stem: &str, ext: &str, content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let hash: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!("assets/{stem}.{hash}.{ext}")
}

/// Write an asset and return its absolute URL path.
fn write_asset(output_dir: &Path, stem: &str, ext: &str, content: &str) -> Result<String, GenerateError> {
    let name = hashed_asset_name(stem, ext, content);
    fs::write(output_dir.join(&name), content)?;
    Ok(format!("/{name}"))
}

/// Copy every file under `public` into `output_dir`, keeping relative paths.
fn copy_public(public: &Path, output_dir: &Path) -> Result<usize, GenerateError> {
    let mut copied = 0;
    for entry in WalkDir::new(public).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(public)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(entry.file_name()));
        let dest = output_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &dest)?;
        copied += 1;
    }
    Ok(copied)
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// `2 de marzo de 2026`
pub fn format_date(date: &DateTime<Utc>) -> String {
    format!(
        "{} de {} de {}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

/// Route of an article detail page.
pub fn article_href(slug: &str) -> String {
    format!("{ARTICLE_ROUTE_PREFIX}{slug}/")
}

/// First `max` characters of `text`, cut at a word boundary.
fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    let trimmed = match cut.rfind(' ') {
        Some(i) => &cut[..i],
        None => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end_matches([',', '.', ';', ':']))
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(
    site: &Site,
    title: &str,
    description: &str,
    canonical_path: Option<&str>,
    section: Section,
    with_script: bool,
    content: Markup,
) -> Markup {
    let site_title = &site.config.site.title;
    let full_title = if title == site_title {
        title.to_string()
    } else {
        format!("{title} | {site_title}")
    };
    let canonical = site
        .config
        .site
        .base_url
        .as_deref()
        .zip(canonical_path)
        .map(|(base, path)| format!("{}{}", base.trim_end_matches('/'), path));

    html! {
        (DOCTYPE)
        html lang=(site.config.site.language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (full_title) }
                meta name="description" content=(description);
                @if let Some(url) = &canonical {
                    link rel="canonical" href=(url);
                }
                link rel="stylesheet" href=(site.css_href);
                @if with_script {
                    script src=(site.js_href) defer {}
                }
            }
            body {
                a.skip-link href="#contenido" { "Saltar al contenido" }
                (site_header(site, section))
                main #contenido {
                    (content)
                }
                (site_footer(site))
            }
        }
    }
}

/// Renders the site header with the section navigation
fn site_header(site: &Site, current: Section) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (site.config.site.title) }
            nav.site-nav aria-label="Principal" {
                ul {
                    @for (section, label, href) in NAV {
                        li {
                            @if section == current {
                                a href=(href) aria-current="page" { (label) }
                            } @else {
                                a href=(href) { (label) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn site_footer(site: &Site) -> Markup {
    html! {
        footer.site-footer {
            p { (site.config.site.title) }
        }
    }
}

/// `<img>` for a cover image cropped to 16:9, or nothing.
fn cover_image(site: &Site, image: &ImageField, fallback_alt: &str, eager: bool) -> Option<Markup> {
    let src = site
        .images
        .image(image)
        .width(COVER_WIDTH)
        .height(COVER_HEIGHT)
        .fit(Fit::Crop)
        .auto_format()
        .url();
    let src = match src {
        Ok(src) => src,
        Err(e) => {
            tracing::warn!(error = %e, alt = fallback_alt, "cover image omitted");
            return None;
        }
    };
    let variants: Vec<Variant> = site
        .config
        .images
        .cover_variants
        .iter()
        .map(|v| Variant {
            height: v.height.or(Some(v.width * COVER_HEIGHT / COVER_WIDTH)),
            ..*v
        })
        .collect();
    let srcset = site.images.srcset(image, &variants).ok();
    Some(html! {
        img src=(src) srcset=[srcset] sizes="(max-width: 700px) 100vw, 400px"
            alt=(image.alt_or(fallback_alt)) width=(COVER_WIDTH) height=(COVER_HEIGHT)
            loading=(if eager { "eager" } else { "lazy" });
    })
}

fn article_card(site: &Site, article: &ArticleSummary) -> Markup {
    let href = article_href(&article.slug.current);
    let cover = article
        .portada
        .as_ref()
        .and_then(|p| cover_image(site, p, &article.titulo, false));
    html! {
        article.card {
            a.card-link href=(href) {
                @if let Some(cover) = cover {
                    div.card-image { (cover) }
                } @else {
                    div.card-image.card-image-empty {}
                }
                div.card-body {
                    h3.card-title { (article.titulo) }
                    @if let Some(date) = &article.fecha_publicacion {
                        time datetime=(date.to_rfc3339()) { (format_date(date)) }
                    }
                }
            }
        }
    }
}

fn article_grid(site: &Site, articles: &[ArticleSummary]) -> Markup {
    let articles: Vec<&ArticleSummary> = articles
        .iter()
        .filter(|a| is_url_safe_slug(&a.slug.current))
        .collect();
    html! {
        @if articles.is_empty() {
            p.empty-state { "Todavía no hay noticias publicadas." }
        } @else {
            div.card-grid {
                @for article in &articles {
                    (article_card(site, article))
                }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the homepage: carousel and latest articles
fn render_index(site: &Site, snapshot: &Snapshot) -> Markup {
    let images = &site.config.images;
    let carousel = render_carousel(
        &snapshot.homepage.banners,
        &site.images,
        SlideImage {
            width: images.banner_width,
            height: images.banner_height,
            variants: &images.banner_variants,
        },
        &site.config.carousel,
    );
    let has_carousel = !snapshot.homepage.banners.is_empty();

    let content = html! {
        (carousel)
        section.latest {
            h2 { "Últimas noticias" }
            (article_grid(site, &snapshot.homepage.noticias))
            @if !snapshot.homepage.noticias.is_empty() {
                p.more { a href="/noticias/" { "Ver todas las noticias" } }
            }
        }
    };

    base_document(
        site,
        &site.config.site.title,
        &site.config.site.description,
        Some("/"),
        Section::Home,
        has_carousel,
        content,
    )
}

/// Renders the article listing
fn render_news_list(site: &Site, articles: &[ArticleSummary]) -> Markup {
    let content = html! {
        header.page-header { h1 { "Noticias" } }
        (article_grid(site, articles))
    };
    base_document(
        site,
        "Noticias",
        "Todas las noticias del instituto.",
        Some("/noticias/"),
        Section::News,
        false,
        content,
    )
}

/// Renders an article detail page
fn render_article(site: &Site, article: &ArticleDetail) -> Markup {
    let description = excerpt(&plain_text(&article.contenido), DESCRIPTION_LEN);
    let cover = article
        .portada
        .as_ref()
        .and_then(|p| cover_image(site, p, &article.titulo, true).map(|img| (img, p.caption.clone())));
    let body = render_body(&article.contenido, &site.images, &site.config.images.body_variants);
    let href = article_href(&article.slug.current);

    let content = html! {
        article.article {
            header.article-header {
                h1 { (article.titulo) }
                @if let Some(date) = &article.fecha_publicacion {
                    time datetime=(date.to_rfc3339()) { (format_date(date)) }
                }
            }
            @if let Some((img, caption)) = cover {
                figure.article-cover {
                    (img)
                    @if let Some(caption) = caption {
                        figcaption { (caption) }
                    }
                }
            }
            div.article-body { (body) }
            footer.article-footer {
                a href="/noticias/" { "← Volver a noticias" }
            }
        }
    };
    base_document(
        site,
        &article.titulo,
        &description,
        Some(&href),
        Section::News,
        false,
        content,
    )
}

fn course_dates(course: &CourseSummary) -> Option<String> {
    match (&course.fecha_inicio, &course.fecha_fin) {
        (Some(start), Some(end)) => Some(format!("Del {} al {}", format_date(start), format_date(end))),
        (Some(start), None) => Some(format!("Desde el {}", format_date(start))),
        (None, Some(end)) => Some(format!("Hasta el {}", format_date(end))),
        (None, None) => None,
    }
}

/// Renders the course listing
fn render_courses(site: &Site, courses: &[CourseSummary]) -> Markup {
    let content = html! {
        header.page-header { h1 { "Cursos" } }
        @if courses.is_empty() {
            p.empty-state { "No hay cursos disponibles por el momento." }
        } @else {
            div.card-grid {
                @for course in courses {
                    article.card.course {
                        @if let Some(img) = course.imagen_portada.as_ref().and_then(|i| cover_image(site, i, &course.titulo, false)) {
                            div.card-image { (img) }
                        }
                        div.card-body {
                            h3.card-title { (course.titulo) }
                            @if let Some(audience) = course.audience() {
                                p.badge { (audience.label()) }
                            }
                            @if let Some(dates) = course_dates(course) {
                                p.course-dates { (dates) }
                            }
                            @if let Some(text) = &course.descripcion_corta {
                                p { (text) }
                            }
                        }
                    }
                }
            }
        }
    };
    base_document(
        site,
        "Cursos",
        "Cursos y capacitaciones para personas y empresas.",
        Some("/cursos/"),
        Section::Courses,
        false,
        content,
    )
}

fn portrait(site: &Site, president: &PresidentSummary) -> Option<Markup> {
    let image = president.retrato.as_ref()?;
    let src = site
        .images
        .image(image)
        .width(PORTRAIT_SIZE)
        .height(PORTRAIT_SIZE)
        .fit(Fit::Crop)
        .auto_format()
        .url()
        .inspect_err(|e| tracing::warn!(president = %president.id, error = %e, "portrait omitted"))
        .ok()?;
    Some(html! {
        img.portrait src=(src) alt=(image.alt_or(&president.nombre_completo))
            width=(PORTRAIT_SIZE) height=(PORTRAIT_SIZE) loading="lazy";
    })
}

/// Renders the president listing
fn render_presidents(site: &Site, presidents: &[PresidentSummary]) -> Markup {
    let content = html! {
        header.page-header { h1 { "Presidentes" } }
        @if presidents.is_empty() {
            p.empty-state { "Todavía no hay presidentes cargados." }
        } @else {
            ol.president-list {
                @for president in presidents {
                    li.president {
                        @if let Some(img) = portrait(site, president) {
                            (img)
                        }
                        div {
                            h2 { (president.nombre_completo) }
                            @if let Some(periodo) = &president.periodo {
                                p.period { (periodo.to_string()) }
                            }
                            @if let Some(bio) = &president.biografia {
                                p { (bio) }
                            }
                        }
                    }
                }
            }
        }
    };
    base_document(
        site,
        "Presidentes",
        "Presidentes de la institución.",
        Some("/presidentes/"),
        Section::Presidents,
        false,
        content,
    )
}

/// Renders the 404 page
fn render_not_found(site: &Site) -> Markup {
    let content = html! {
        section.not-found {
            h1 { "Página no encontrada" }
            p { "La página que buscás no existe o fue movida." }
            p { a href="/" { "Volver al inicio" } }
        }
    };
    base_document(
        site,
        "Página no encontrada",
        "Página no encontrada.",
        None,
        Section::Other,
        false,
        content,
    )
}

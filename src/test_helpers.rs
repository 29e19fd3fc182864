//! Shared test utilities for the campus-press test suite.
//!
//! Document builders produce raw CMS documents (the shape stored in the
//! content lake and in exports). Each builder returns a document that passes
//! schema validation, so tests only spell out the field they break.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let dataset = Dataset::from_documents(vec![
//!     article_doc("n1", "Una noticia de prueba", "una-noticia", "2026-03-01T10:00:00Z"),
//!     banner_doc("b1", "Admisiones", 1, true, json!({ "tipo": "none" })),
//!     image_asset_doc(),
//! ]);
//! ```

use crate::config::SiteConfig;
use crate::dataset::Dataset;
use crate::image::{Asset, ImageField};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// A well-formed image asset id (2000×3000 JPEG).
pub const TEST_ASSET: &str = "image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg";

// =========================================================================
// Fixture setup
// =========================================================================

/// Path of the NDJSON export fixture.
pub fn fixture_export() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/export")
}

/// The export fixture, loaded.
pub fn fixture_dataset() -> Dataset {
    Dataset::load(&fixture_export()).unwrap()
}

/// Default config with a project id, so image URLs can be built.
pub fn test_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.cms.project_id = "proj".to_string();
    config.site.title = "Sitio Educativo".to_string();
    config
}

// =========================================================================
// Document builders
// =========================================================================

fn image_ref(alt: &str) -> Value {
    json!({
        "_type": "image",
        "asset": { "_type": "reference", "_ref": TEST_ASSET },
        "alt": alt
    })
}

/// The `sanity.imageAsset` document behind [`TEST_ASSET`].
pub fn image_asset_doc() -> Value {
    json!({
        "_id": TEST_ASSET,
        "_type": "sanity.imageAsset",
        "url": "https://cdn.sanity.io/images/proj/production/Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000.jpg",
        "metadata": { "dimensions": { "width": 2000, "height": 3000 } }
    })
}

/// A valid `noticia` with a one-paragraph body.
pub fn article_doc(id: &str, titulo: &str, slug: &str, fecha: &str) -> Value {
    json!({
        "_id": id,
        "_type": "noticia",
        "_createdAt": fecha,
        "_updatedAt": fecha,
        "titulo": titulo,
        "slug": { "_type": "slug", "current": slug },
        "fechaPublicacion": fecha,
        "contenido": [{
            "_type": "block",
            "_key": "p1",
            "style": "normal",
            "markDefs": [],
            "children": [{ "_type": "span", "_key": "s1", "text": format!("Texto de {titulo}."), "marks": [] }]
        }]
    })
}

/// A valid `banner` with an image and the given raw link object.
pub fn banner_doc(id: &str, titulo: &str, posicion: i64, activo: bool, link: Value) -> Value {
    json!({
        "_id": id,
        "_type": "banner",
        "titulo": titulo,
        "imagen": image_ref("Estudiantes en el patio"),
        "posicion": posicion,
        "activo": activo,
        "link": link
    })
}

/// A valid `course`.
pub fn course_doc(id: &str, titulo: &str, fecha_inicio: Option<&str>) -> Value {
    json!({
        "_id": id,
        "_type": "course",
        "titulo": titulo,
        "slug": { "current": crate::schema::slugify(titulo) },
        "publicoObjetivo": "personas",
        "fechaInicio": fecha_inicio,
        "descripcionCorta": format!("Curso de {titulo}")
    })
}

/// A valid `presidente`.
pub fn president_doc(id: &str, nombre: &str, desde: i64, hasta: Option<i64>) -> Value {
    json!({
        "_id": id,
        "_type": "presidente",
        "nombreCompleto": nombre,
        "slug": { "current": crate::schema::slugify(nombre) },
        "periodo": { "añoDesde": desde, "añoHasta": hasta },
        "retrato": image_ref(nombre)
    })
}

/// An image field pointing at [`TEST_ASSET`].
pub fn test_image(alt: Option<&str>) -> ImageField {
    ImageField {
        asset: Some(Asset {
            reference: Some(TEST_ASSET.to_string()),
            ..Asset::default()
        }),
        alt: alt.map(str::to_string),
        ..ImageField::default()
    }
}

//! In-memory content source backed by a dataset export.
//!
//! `sanity dataset export` writes one JSON document per line (`data.ndjson`,
//! inside the export tarball). Loading that file gives a complete offline
//! copy of the content: articles, banners, courses, presidents, and the
//! `sanity.imageAsset` documents their images reference.
//!
//! [`Dataset`] answers every [`ContentQuery`] by evaluating its filter,
//! ordering, projection and one-level reference expansion (`asset->`,
//! `slug->`) directly in Rust, producing the same JSON the content API would.
//! Builds can run without network access, and every projection is testable.
//!
//! Only published documents are visible: ids under `drafts.` are dropped at
//! load time. Dereferencing a missing document yields `null`, like GROQ.

use crate::query::{ContentQuery, ContentSource, QueryError};
use crate::schema::{BANNER, COURSE, NOTICIA, PRESIDENTE, SCHEMA_TYPES};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the documents inside an extracted export.
pub const EXPORT_FILENAME: &str = "data.ndjson";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
    #[error("line {line}: document has no _id")]
    MissingId { line: usize },
}

static NULL: Value = Value::Null;

/// Published documents of one dataset.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    documents: Vec<Value>,
    by_id: HashMap<String, usize>,
    origin: String,
}

impl Dataset {
    /// Build from already-parsed documents. Drafts and documents without an
    /// `_id` are dropped; a later document with the same id replaces an
    /// earlier one.
    pub fn from_documents(documents: Vec<Value>) -> Self {
        let mut dataset = Dataset {
            origin: "memory".to_string(),
            ..Dataset::default()
        };
        for document in documents {
            dataset.insert(document);
        }
        dataset
    }

    /// Parse NDJSON text, one document per non-empty line.
    pub fn from_ndjson(text: &str) -> Result<Self, DatasetError> {
        let mut dataset = Dataset {
            origin: "memory".to_string(),
            ..Dataset::default()
        };
        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            let document: Value = serde_json::from_str(line).map_err(|source| DatasetError::Json {
                line: line_no,
                source,
            })?;
            if document.get("_id").and_then(Value::as_str).is_none() {
                return Err(DatasetError::MissingId { line: line_no });
            }
            dataset.insert(document);
        }
        Ok(dataset)
    }

    /// Load an export: either the `data.ndjson` file itself or the directory
    /// an export tarball was extracted into.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = if path.is_dir() {
            path.join(EXPORT_FILENAME)
        } else {
            path.to_path_buf()
        };
        let text = fs::read_to_string(&file)?;
        let mut dataset = Self::from_ndjson(&text)?;
        dataset.origin = file.display().to_string();
        tracing::debug!(path = %file.display(), documents = dataset.len(), "loaded dataset export");
        Ok(dataset)
    }

    fn insert(&mut self, document: Value) {
        let Some(id) = document.get("_id").and_then(Value::as_str) else {
            return;
        };
        if id.starts_with("drafts.") {
            return;
        }
        let id = id.to_string();
        match self.by_id.get(&id) {
            Some(&index) => self.documents[index] = document,
            None => {
                self.by_id.insert(id, self.documents.len());
                self.documents.push(document);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.by_id.get(id).map(|&i| &self.documents[i])
    }

    fn of_type<'a>(&'a self, doc_type: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.documents
            .iter()
            .filter(move |d| d.get("_type").and_then(Value::as_str) == Some(doc_type))
    }

    /// Follow a `{ "_ref": ... }` value. Anything else, or a dangling
    /// reference, is `null`.
    fn deref(&self, reference: &Value) -> Value {
        reference
            .get("_ref")
            .and_then(Value::as_str)
            .and_then(|id| self.get(id))
            .cloned()
            .unwrap_or(Value::Null)
    }

    // ------------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------------

    fn project_image(&self, image: &Value) -> Value {
        if !image.is_object() {
            return Value::Null;
        }
        json!({
            "asset": self.deref(field(image, "asset")),
            "alt": field(image, "alt"),
            "caption": field(image, "caption"),
            "hotspot": field(image, "hotspot"),
            "crop": field(image, "crop"),
        })
    }

    fn project_link(&self, link: &Value) -> Value {
        if !link.is_object() {
            return Value::Null;
        }
        let target = self.deref(field(link, "slug"));
        let slug = if target.is_object() {
            pick(&target, &["_id", "titulo", "slug"])
        } else {
            Value::Null
        };
        json!({
            "tipo": field(link, "tipo"),
            "url": field(link, "url"),
            "slug": slug,
        })
    }

    fn article_summary(&self, doc: &Value) -> Value {
        let mut out = pick(doc, &["_id", "titulo", "slug", "fechaPublicacion"]);
        out["portada"] = self.project_image(field(doc, "portada"));
        out
    }

    fn article_detail(&self, doc: &Value) -> Value {
        let mut out = self.article_summary(doc);
        out["contenido"] = match field(doc, "contenido") {
            Value::Array(blocks) => Value::Array(
                blocks
                    .iter()
                    .map(|block| {
                        let mut block = block.clone();
                        if field(&block, "_type").as_str() == Some("image") {
                            let asset = self.deref(field(&block, "asset"));
                            block["asset"] = asset;
                        }
                        block
                    })
                    .collect(),
            ),
            _ => Value::Null,
        };
        out
    }

    fn banner(&self, doc: &Value, with_activo: bool) -> Value {
        let mut out = pick(doc, &["_id", "titulo", "posicion"]);
        out["imagen"] = self.project_image(field(doc, "imagen"));
        if with_activo {
            out["activo"] = field(doc, "activo").clone();
        }
        out["link"] = self.project_link(field(doc, "link"));
        out
    }

    fn course(&self, doc: &Value) -> Value {
        let mut out = pick(
            doc,
            &["_id", "titulo", "slug", "publicoObjetivo", "fechaInicio", "fechaFin", "descripcionCorta"],
        );
        out["imagenPortada"] = self.project_image(field(doc, "imagenPortada"));
        out
    }

    fn president(&self, doc: &Value) -> Value {
        let mut out = pick(doc, &["_id", "nombreCompleto", "slug", "periodo", "biografia"]);
        out["retrato"] = self.project_image(field(doc, "retrato"));
        out
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    fn published_articles(&self) -> Vec<&Value> {
        let mut articles: Vec<&Value> = self
            .of_type(NOTICIA)
            .filter(|d| !path(d, "slug.current").is_null())
            .collect();
        articles.sort_by(|a, b| {
            nulls_last(
                timestamp(field(a, "fechaPublicacion")),
                timestamp(field(b, "fechaPublicacion")),
                |x, y| y.cmp(x),
            )
        });
        articles
    }

    fn active_banners(&self) -> Vec<&Value> {
        let mut banners: Vec<&Value> = self
            .of_type(BANNER)
            .filter(|d| field(d, "activo") == &Value::Bool(true))
            .collect();
        banners.sort_by(|a, b| {
            nulls_last(
                field(a, "posicion").as_f64(),
                field(b, "posicion").as_f64(),
                |x, y| x.total_cmp(y),
            )
        });
        banners
    }

    fn evaluate(&self, query: &ContentQuery) -> Value {
        match query {
            ContentQuery::Articles => Value::Array(
                self.published_articles()
                    .into_iter()
                    .map(|d| self.article_summary(d))
                    .collect(),
            ),
            ContentQuery::ArticleBySlug(slug) => self
                .published_articles()
                .into_iter()
                .find(|d| path(d, "slug.current").as_str() == Some(slug.as_str()))
                .map(|d| self.article_detail(d))
                .unwrap_or(Value::Null),
            ContentQuery::ArticleSlugs => Value::Array(
                self.of_type(NOTICIA)
                    .filter(|d| !path(d, "slug.current").is_null())
                    .map(|d| json!({ "slug": path(d, "slug.current") }))
                    .collect(),
            ),
            ContentQuery::ActiveBanners => Value::Array(
                self.active_banners()
                    .into_iter()
                    .map(|d| self.banner(d, false))
                    .collect(),
            ),
            ContentQuery::BannerById(id) => self
                .get(id)
                .filter(|d| field(d, "_type").as_str() == Some(BANNER))
                .map(|d| self.banner(d, true))
                .unwrap_or(Value::Null),
            ContentQuery::Homepage { article_count } => json!({
                "banners": self.evaluate(&ContentQuery::ActiveBanners),
                "noticias": self
                    .published_articles()
                    .into_iter()
                    .take(*article_count)
                    .map(|d| self.article_summary(d))
                    .collect::<Vec<_>>(),
            }),
            ContentQuery::Courses => {
                let mut courses: Vec<&Value> = self.of_type(COURSE).collect();
                courses.sort_by(|a, b| {
                    nulls_last(
                        timestamp(field(a, "fechaInicio")),
                        timestamp(field(b, "fechaInicio")),
                        |x, y| x.cmp(y),
                    )
                });
                Value::Array(courses.into_iter().map(|d| self.course(d)).collect())
            }
            ContentQuery::Presidents => {
                let mut presidents: Vec<&Value> = self.of_type(PRESIDENTE).collect();
                presidents.sort_by(|a, b| {
                    nulls_last(
                        path(a, "periodo.añoDesde").as_i64(),
                        path(b, "periodo.añoDesde").as_i64(),
                        |x, y| y.cmp(x),
                    )
                });
                Value::Array(presidents.into_iter().map(|d| self.president(d)).collect())
            }
            ContentQuery::AllDocuments => Value::Array(
                self.documents
                    .iter()
                    .filter(|d| {
                        field(d, "_type")
                            .as_str()
                            .is_some_and(|t| SCHEMA_TYPES.contains(&t))
                    })
                    .cloned()
                    .collect(),
            ),
        }
    }
}

impl ContentSource for Dataset {
    fn run(&self, query: &ContentQuery) -> Result<Value, QueryError> {
        tracing::debug!(query = query.name(), "evaluating against dataset export");
        Ok(self.evaluate(query))
    }

    fn describe(&self) -> String {
        format!("export {} ({} documents)", self.origin, self.len())
    }
}

/// Top-level field, `null` when absent.
fn field<'a>(value: &'a Value, key: &str) -> &'a Value {
    value.get(key).unwrap_or(&NULL)
}

/// Dotted path lookup (`slug.current`), `null` when any step is missing.
fn path<'a>(value: &'a Value, dotted: &str) -> &'a Value {
    dotted.split('.').fold(value, |current, key| field(current, key))
}

/// Object with the named fields; missing ones are `null`.
fn pick(value: &Value, keys: &[&str]) -> Value {
    let mut out = Map::new();
    for key in keys {
        out.insert((*key).to_string(), field(value, key).clone());
    }
    Value::Object(out)
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Order two optional keys with `cmp`, placing missing keys after present ones.
fn nulls_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

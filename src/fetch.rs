//! Stage 1: run every query the site needs and collect the results.
//!
//! ```text
//! homepage bundle ─┐
//! article listing ─┤
//! article slugs ───┼─▶ article_by_slug × N ─┐
//! courses ─────────┤                        ├─▶ Snapshot
//! presidents ──────┘────────────────────────┘
//! ```
//!
//! Works against any [`ContentSource`], so the live API and an offline export
//! produce the same snapshot.

use crate::config::SiteConfig;
use crate::query::{ContentSource, QueryError};
use crate::types::Snapshot;
use chrono::Utc;
use std::collections::HashSet;

pub fn fetch(source: &dyn ContentSource, config: &SiteConfig) -> Result<Snapshot, QueryError> {
    tracing::info!(source = %source.describe(), "fetching content");

    let homepage = source.homepage_bundle(config.homepage.article_count)?;
    let listing = source.list_articles()?;

    let mut seen = HashSet::new();
    let mut articles = Vec::new();
    for slug in source.list_article_slugs()? {
        if !seen.insert(slug.clone()) {
            tracing::warn!(%slug, "duplicate article slug, keeping the first match");
            continue;
        }
        match source.article_by_slug(&slug)? {
            Some(article) => articles.push(article),
            None => tracing::warn!(%slug, "slug listed but article not found"),
        }
    }

    let courses = source.list_courses()?;
    let presidents = source.list_presidents()?;

    let mut config = config.clone();
    config.cms.token = None;

    tracing::info!(
        banners = homepage.banners.len(),
        articles = articles.len(),
        courses = courses.len(),
        presidents = presidents.len(),
        "content fetched"
    );

    Ok(Snapshot {
        source: source.describe(),
        fetched_at: Utc::now(),
        homepage,
        listing,
        articles,
        courses,
        presidents,
        config,
    })
}

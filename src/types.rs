//! Shared types used across pipeline stages.
//!
//! The [`Snapshot`] is written by `fetch` and read by `generate`, so it must
//! be identical on both sides. It is plain JSON and meant to be inspected.

use crate::config::SiteConfig;
use crate::query::{ArticleDetail, ArticleSummary, CourseSummary, HomepageBundle, PresidentSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the snapshot inside the temp directory.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Every payload the generator needs, fetched in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Endpoint or export the content came from.
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    /// Banners and latest articles for `/`.
    pub homepage: HomepageBundle,
    /// Every routable article, newest first, for `/noticias/`.
    pub listing: Vec<ArticleSummary>,
    /// Full articles for `/noticias/{slug}/`.
    pub articles: Vec<ArticleDetail>,
    pub courses: Vec<CourseSummary>,
    pub presidents: Vec<PresidentSummary>,
    /// Configuration the snapshot was fetched with, credentials removed.
    pub config: SiteConfig,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.homepage.banners.is_empty()
            && self.listing.is_empty()
            && self.courses.is_empty()
            && self.presidents.is_empty()
    }
}

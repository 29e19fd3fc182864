//! Banner and content links.
//!
//! A link stored in the CMS is an object `{ tipo, url?, slug? }` where `tipo`
//! is one of `none`, `internal` or `external`. The editor only shows the field
//! that matches `tipo`, and write-time validation in [`crate::schema`] makes
//! sure it is filled in. Nothing stops old or hand-edited documents from
//! breaking those rules, so the wire shape is converted into [`Link`] without
//! ever failing: anything that doesn't describe a usable destination becomes
//! [`Link::None`].
//!
//! ## Reference shapes
//!
//! An internal link points at a `noticia`. Depending on the query that
//! produced it the target is either a bare reference (`{ "_ref": "..." }`)
//! or the article itself resolved one level deep (`slug-> { _id, titulo,
//! slug }`). Both are kept as distinct variants of [`ArticleTarget`]; only a
//! resolved target yields a real route.
//!
//! ```text
//! none                         → no destination, same tab
//! external  https://x.org      → "https://x.org", new tab
//! internal  resolved "abc"     → "/noticias/abc", same tab
//! internal  bare reference     → "#" (logged: the query didn't resolve it)
//! ```

use crate::schema::Slug;
use serde::{Deserialize, Serialize};

/// Route prefix for article detail pages.
pub const ARTICLE_ROUTE_PREFIX: &str = "/noticias/";

/// Placeholder destination for internal links whose target was not resolved.
pub const UNRESOLVED_HREF: &str = "#";

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLink", into = "RawLink")]
pub enum Link {
    /// No destination; the content renders without an anchor.
    None,
    /// Navigation to an article on this site.
    Internal { target: ArticleTarget },
    /// Navigation to another site, opened in a new tab.
    External { url: String },
}

/// The article an internal link points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleTarget {
    /// A reference the query layer left unresolved.
    Reference(Reference),
    /// The referenced article, projected to the fields routing needs.
    Resolved(LinkedArticle),
}

/// A pointer to another document by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub id: String,
}

/// An article reached through `slug->` in a link projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedArticle {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub slug: Option<Slug>,
}

/// Wire shape of a link object as stored in the CMS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tipo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slug: Option<serde_json::Value>,
}

impl From<RawLink> for Link {
    fn from(raw: RawLink) -> Self {
        match raw.tipo.as_deref() {
            Some("external") => match raw.url {
                Some(url) if !url.trim().is_empty() => Link::External { url },
                _ => Link::None,
            },
            Some("internal") => raw
                .slug
                .filter(|value| !value.is_null())
                .and_then(|value| serde_json::from_value::<ArticleTarget>(value).ok())
                .map(|target| Link::Internal { target })
                .unwrap_or(Link::None),
            _ => Link::None,
        }
    }
}

impl From<Link> for RawLink {
    fn from(link: Link) -> Self {
        match link {
            Link::None => RawLink {
                tipo: Some("none".to_string()),
                ..RawLink::default()
            },
            Link::External { url } => RawLink {
                tipo: Some("external".to_string()),
                url: Some(url),
                slug: None,
            },
            Link::Internal { target } => RawLink {
                tipo: Some("internal".to_string()),
                url: None,
                slug: serde_json::to_value(target).ok(),
            },
        }
    }
}

/// Anchor attributes for a link that should be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkProps {
    pub href: String,
    pub target: Option<&'static str>,
    pub rel: Option<&'static str>,
}

/// Destination URL of a link, or `None` when nothing should be linked.
pub fn resolve(link: Option<&Link>) -> Option<String> {
    match link? {
        Link::None => None,
        Link::External { url } => Some(url.clone()),
        Link::Internal { target } => Some(internal_href(target)),
    }
}

fn internal_href(target: &ArticleTarget) -> String {
    match target {
        ArticleTarget::Resolved(LinkedArticle {
            slug: Some(slug), ..
        }) if !slug.current.is_empty() => {
            format!("{}{}", ARTICLE_ROUTE_PREFIX, slug.current)
        }
        ArticleTarget::Resolved(article) => {
            tracing::warn!(article = %article.id, "linked article has no slug");
            UNRESOLVED_HREF.to_string()
        }
        ArticleTarget::Reference(reference) => {
            tracing::warn!(
                reference = %reference.id,
                "internal link reference was not resolved by the query"
            );
            UNRESOLVED_HREF.to_string()
        }
    }
}

/// Whether the destination should open in a new browsing context.
pub fn opens_in_new_tab(link: Option<&Link>) -> bool {
    matches!(link, Some(Link::External { .. }))
}

/// Anchor attributes for `link`, or `None` when the content should render
/// without an anchor.
pub fn link_props(link: Option<&Link>) -> Option<LinkProps> {
    let href = resolve(link)?;
    if opens_in_new_tab(link) {
        Some(LinkProps {
            href,
            target: Some("_blank"),
            rel: Some("noopener noreferrer"),
        })
    } else {
        Some(LinkProps {
            href,
            target: None,
            rel: None,
        })
    }
}

/// Whether `link` describes a destination at all.
pub fn should_render_as_link(link: Option<&Link>) -> bool {
    resolve(link).is_some()
}

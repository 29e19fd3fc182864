//! Rich text bodies (portable text) and their HTML rendering.
//!
//! A body is a JSON array of typed blocks. The site uses two kinds:
//!
//! ```text
//! { "_type": "block", "style": "h2", "children": [spans], "markDefs": [...] }
//! { "_type": "image", "asset": {...}, "alt": "...", "caption": "..." }
//! ```
//!
//! Text blocks carry a style (`normal`, `h2`, `h3`, `blockquote`), an optional
//! `listItem` (`bullet`, `number`), and spans. A span's `marks` name either a
//! decorator (`strong`, `em`, `underline`, `code`, `strike-through`) or the
//! `_key` of an entry in the block's `markDefs` (link annotations).
//! Consecutive list items of the same kind are grouped into one `<ul>`/`<ol>`.
//!
//! Block types the site doesn't know are skipped.

use crate::image::{ImageField, ImageUrlBuilder, Variant};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

/// Width of the fallback `src` for images embedded in a body.
const BODY_IMAGE_WIDTH: u32 = 1200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum BodyBlock {
    #[serde(rename = "block")]
    Text(TextBlock),
    #[serde(rename = "image")]
    Image(ImageField),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub children: Vec<Span>,
    #[serde(rename = "markDefs", default)]
    pub mark_defs: Vec<MarkDef>,
    #[serde(rename = "listItem", default, skip_serializing_if = "Option::is_none")]
    pub list_item: Option<String>,
}

fn default_style() -> String {
    "normal".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub marks: Vec<String>,
}

/// Annotation referenced from span marks by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl TextBlock {
    fn is_blank(&self) -> bool {
        self.children.iter().all(|s| s.text.trim().is_empty())
    }
}

/// Plain text of all text blocks, paragraphs separated by a space.
pub fn plain_text(blocks: &[BodyBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            BodyBlock::Text(text) => Some(
                text.children
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<String>(),
            ),
            _ => None,
        })
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a body to HTML.
pub fn render_body(blocks: &[BodyBlock], images: &ImageUrlBuilder, variants: &[Variant]) -> Markup {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < blocks.len() {
        match &blocks[i] {
            BodyBlock::Text(block) if block.list_item.is_some() => {
                let kind = block.list_item.as_deref().unwrap_or_default();
                let mut items = Vec::new();
                while let Some(BodyBlock::Text(item)) = blocks.get(i) {
                    if item.list_item.as_deref() != Some(kind) {
                        break;
                    }
                    items.push(item);
                    i += 1;
                }
                parts.push(render_list(kind, &items));
                continue;
            }
            BodyBlock::Text(block) => parts.push(render_text_block(block)),
            BodyBlock::Image(image) => parts.push(render_image(image, images, variants)),
            BodyBlock::Unsupported => {}
        }
        i += 1;
    }

    html! {
        @for part in &parts {
            (part)
        }
    }
}

fn render_list(kind: &str, items: &[&TextBlock]) -> Markup {
    html! {
        @if kind == "number" {
            ol {
                @for item in items {
                    li { (render_spans(item)) }
                }
            }
        } @else {
            ul {
                @for item in items {
                    li { (render_spans(item)) }
                }
            }
        }
    }
}

fn render_text_block(block: &TextBlock) -> Markup {
    if block.is_blank() {
        return html! {};
    }
    let content = render_spans(block);
    match block.style.as_str() {
        "h1" | "h2" => html! { h2 { (content) } },
        "h3" => html! { h3 { (content) } },
        "h4" => html! { h4 { (content) } },
        "blockquote" => html! { blockquote { p { (content) } } },
        _ => html! { p { (content) } },
    }
}

fn render_spans(block: &TextBlock) -> Markup {
    html! {
        @for span in &block.children {
            (apply_marks(render_text(&span.text), &span.marks, &block.mark_defs))
        }
    }
}

/// Text with line breaks turned into `<br>`.
fn render_text(text: &str) -> Markup {
    html! {
        @for (i, line) in text.split('\n').enumerate() {
            @if i > 0 { br; }
            (line)
        }
    }
}

fn apply_marks(inner: Markup, marks: &[String], defs: &[MarkDef]) -> Markup {
    let Some((outer, rest)) = marks.split_first() else {
        return inner;
    };
    let inner = apply_marks(inner, rest, defs);
    match outer.as_str() {
        "strong" => html! { strong { (inner) } },
        "em" => html! { em { (inner) } },
        "underline" => html! { u { (inner) } },
        "code" => html! { code { (inner) } },
        "strike-through" => html! { s { (inner) } },
        key => match defs.iter().find(|d| d.key == key) {
            Some(def) if def.kind == "link" => render_annotation_link(def, inner),
            _ => inner,
        },
    }
}

fn render_annotation_link(def: &MarkDef, inner: Markup) -> Markup {
    let Some(href) = def.href.as_deref().filter(|h| is_allowed_href(h)) else {
        return inner;
    };
    let external = href.starts_with("http://") || href.starts_with("https://");
    html! {
        @if external {
            a href=(href) target="_blank" rel="noopener noreferrer" { (inner) }
        } @else {
            a href=(href) { (inner) }
        }
    }
}

fn is_allowed_href(href: &str) -> bool {
    ["http://", "https://", "mailto:", "tel:"]
        .iter()
        .any(|scheme| href.starts_with(scheme))
}

fn render_image(image: &ImageField, images: &ImageUrlBuilder, variants: &[Variant]) -> Markup {
    let src = match images.image(image).width(BODY_IMAGE_WIDTH).auto_format().url() {
        Ok(src) => src,
        Err(e) => {
            tracing::warn!(error = %e, "skipping body image");
            return html! {};
        }
    };
    let srcset = images.srcset(image, variants).ok().filter(|s| !s.is_empty());
    html! {
        figure.body-image {
            img src=(src) srcset=[srcset] sizes="(max-width: 800px) 100vw, 800px"
                alt=(image.alt.as_deref().unwrap_or_default()) loading="lazy";
            @if let Some(caption) = &image.caption {
                figcaption { (caption) }
            }
        }
    }
}

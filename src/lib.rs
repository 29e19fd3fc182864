//! # Campus Press
//!
//! A static site generator for an institutional news site whose content lives
//! in a headless CMS. Editors write news articles, homepage banners, courses
//! and president profiles in the CMS; this crate queries that content and
//! renders it to plain HTML.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Fetch     CMS API / export  →  snapshot.json   (GROQ queries → page payloads)
//! 2. Generate  snapshot.json     →  dist/           (final HTML site)
//!
//!    Build   = Fetch + Generate
//!    Check   = schema validation over every document
//!    Deploy  = role-gated POST to the rebuild webhook
//! ```
//!
//! The snapshot is human-readable JSON, so a broken page can be traced to the
//! payload it was rendered from without touching the CMS again.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`schema`] | Document types, slug rules and write-time validation |
//! | [`query`] | GROQ queries, projection types and the [`query::ContentSource`] trait |
//! | [`client`] | `ContentSource` over the CMS HTTP query API |
//! | [`dataset`] | `ContentSource` over an NDJSON export, evaluated in memory |
//! | [`fetch`] | Stage 1: run every query into a [`types::Snapshot`] |
//! | [`link`] | Banner link model and destination resolution |
//! | [`image`] | CDN image URLs with crop, hotspot and size transforms |
//! | [`portable_text`] | Rich-text article bodies to HTML |
//! | [`carousel`] | Banner carousel state machine and markup |
//! | [`generate`] | Stage 2: renders every page with Maud |
//! | [`studio`] | Editor roles, tool visibility and document action guards |
//! | [`deploy`] | The publish action: confirmation, webhook, notifications |
//! | [`config`] | `config.toml` loading, env overrides, validation, CSS generation |
//! | [`types`] | The snapshot shared between stages |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Two Content Sources, One Query Language
//!
//! Every query is written once, in GROQ. The live client sends it to the CMS;
//! the export dataset evaluates the same query shape in memory. Both return the
//! raw JSON result and share the decoding in [`query`], so offline builds and
//! tests exercise exactly the projection types production uses.
//!
//! ## Links Are a Sum Type
//!
//! A banner link is `none`, `internal` (an article reference) or `external`
//! (a URL). Each variant carries only its own fields, so a link can't be
//! "external without a URL" once decoded. Malformed stored links decode to
//! `none`; the [`schema`] validator is where they get reported.
//!
//! ## No Local Image Processing
//!
//! The CMS image CDN does resizing, cropping and format negotiation. Pages
//! only carry URLs built by [`image::ImageUrlBuilder`], so a build never
//! downloads an image.

pub mod carousel;
pub mod client;
pub mod config;
pub mod dataset;
pub mod deploy;
pub mod fetch;
pub mod generate;
pub mod image;
pub mod link;
pub mod output;
pub mod portable_text;
pub mod query;
pub mod schema;
pub mod studio;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

//! CLI output formatting for every command.
//!
//! Output is **content-centric**: each line leads with what an editor would
//! recognise (an article title, a banner name) and shows routes or ids as
//! secondary context.
//!
//! # Output Format
//!
//! ## Fetch
//!
//! ```text
//! Source: export fixtures/export/data.ndjson (16 documents)
//! Banners
//!     001 Inauguración del año académico → /noticias/inauguracion-del-ano-academico
//!     002 Admisiones abiertas → https://www.example.edu/admisiones (new tab)
//! Articles
//!     001 Inauguración del año académico (2 de marzo de 2026)
//!     002 Programa de becas 2026 (15 de febrero de 2026)
//! Courses: 2
//! Presidents: 2
//! ```
//!
//! ## Generate
//!
//! ```text
//! Inicio → index.html
//! Noticias → noticias/index.html
//!     001 Inauguración del año académico → noticias/inauguracion-del-ano-academico/index.html
//! Skipped (slug is not URL-safe)
//!     ../../etc
//! Generated 8 pages (3 articles), 2 assets, 1 public file
//! ```
//!
//! ## Check
//!
//! ```text
//! noticia n-sin-slug · slug: is required
//! 1 problem in 16 documents
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::deploy::{DeployOutcome, Notification, NotificationStatus, Notifier};
use crate::generate::{GenerateReport, format_date};
use crate::link::{UNRESOLVED_HREF, link_props};
use crate::schema::Violation;
use crate::types::Snapshot;
use chrono::{DateTime, Utc};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Fetch
// ============================================================================

/// Format a fetched snapshot as an inventory of what the site will show.
pub fn format_fetch_output(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = vec![format!("Source: {}", snapshot.source)];

    if !snapshot.homepage.banners.is_empty() {
        lines.push("Banners".to_string());
        for (i, banner) in snapshot.homepage.banners.iter().enumerate() {
            let header = format!("{}{} {}", indent(1), format_index(i + 1), banner.titulo);
            let line = match link_props(banner.link.as_ref()) {
                Some(props) if props.href == UNRESOLVED_HREF => format!("{header} (unresolved link)"),
                Some(props) if props.target.is_some() => {
                    format!("{header} \u{2192} {} (new tab)", props.href)
                }
                Some(props) => format!("{header} \u{2192} {}", props.href),
                None => header,
            };
            lines.push(line);
        }
    }

    if !snapshot.listing.is_empty() {
        lines.push("Articles".to_string());
        for (i, article) in snapshot.listing.iter().enumerate() {
            let date = article
                .fecha_publicacion
                .as_ref()
                .map(|d| format!(" ({})", format_date(d)))
                .unwrap_or_default();
            lines.push(format!(
                "{}{} {}{}",
                indent(1),
                format_index(i + 1),
                article.titulo,
                date
            ));
        }
    }

    lines.push(format!("Courses: {}", snapshot.courses.len()));
    lines.push(format!("Presidents: {}", snapshot.presidents.len()));
    if snapshot.is_empty() {
        lines.push("No published content found".to_string());
    }
    lines
}

pub fn print_fetch_output(snapshot: &Snapshot) {
    for line in format_fetch_output(snapshot) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate
// ============================================================================

/// Format the pages written by a generate run.
///
/// Article pages are nested under the news listing, numbered in the order
/// they were rendered.
pub fn format_generate_output(report: &GenerateReport) -> Vec<String> {
    let mut lines = Vec::new();
    let mut article_index = 0;

    for page in &report.pages {
        if page.path.starts_with("noticias/") && page.path != "noticias/index.html" {
            article_index += 1;
            lines.push(format!(
                "{}{} {} \u{2192} {}",
                indent(1),
                format_index(article_index),
                page.title,
                page.path
            ));
        } else {
            lines.push(format!("{} \u{2192} {}", page.title, page.path));
        }
    }

    if !report.skipped.is_empty() {
        lines.push("Skipped (slug is not URL-safe)".to_string());
        for slug in &report.skipped {
            lines.push(format!("{}{}", indent(1), slug));
        }
    }

    lines.push(format!(
        "Generated {} ({}), {}, {}",
        plural(report.pages.len(), "page", "pages"),
        plural(report.articles, "article", "articles"),
        plural(report.assets.len(), "asset", "assets"),
        plural(report.public_files, "public file", "public files"),
    ));
    lines
}

pub fn print_generate_output(report: &GenerateReport) {
    for line in format_generate_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format schema violations, one per line, with a summary.
pub fn format_check_output(violations: &[Violation], document_count: usize) -> Vec<String> {
    let mut lines: Vec<String> = violations.iter().map(ToString::to_string).collect();
    let documents = plural(document_count, "document", "documents");
    if violations.is_empty() {
        lines.push(format!("No problems in {documents}"));
    } else {
        lines.push(format!(
            "{} in {documents}",
            plural(violations.len(), "problem", "problems")
        ));
    }
    lines
}

pub fn print_check_output(violations: &[Violation], document_count: usize) {
    for line in format_check_output(violations, document_count) {
        println!("{}", line);
    }
}

// ============================================================================
// Deploy
// ============================================================================

pub fn format_notification(notification: &Notification) -> Vec<String> {
    let marker = match notification.status {
        NotificationStatus::Success => "\u{2713}",
        NotificationStatus::Error => "\u{2717}",
    };
    vec![
        format!("{marker} {}", notification.title),
        format!("{}{}", indent(1), notification.description),
    ]
}

pub fn format_deploy_outcome(outcome: &DeployOutcome) -> String {
    match outcome {
        DeployOutcome::Forbidden => "Only administrators can publish".to_string(),
        DeployOutcome::AlreadyRunning => "A deploy is already in progress".to_string(),
        DeployOutcome::Cancelled => "Publish cancelled".to_string(),
        DeployOutcome::Started { at } => format!("Deploy started at {}", format_timestamp(at)),
        DeployOutcome::Failed(reason) => format!("Deploy failed: {reason}"),
    }
}

pub fn format_last_deploy(at: Option<&DateTime<Utc>>) -> String {
    match at {
        Some(at) => format!("Last deploy: {}", format_timestamp(at)),
        None => "Last deploy: never".to_string(),
    }
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Prints deploy notifications to stderr, where they don't mix with
/// command output.
#[derive(Debug, Default)]
pub struct TerminalNotifier {
    pub shown: usize,
}

impl Notifier for TerminalNotifier {
    fn notify(&mut self, notification: Notification) {
        for line in format_notification(&notification) {
            eprintln!("{}", line);
        }
        self.shown += 1;
    }
}

// ============================================================================
// Tests
// ============================================================================

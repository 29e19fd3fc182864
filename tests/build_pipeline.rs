//! End-to-end pipeline tests: run the binary against the fixture export.
//!
//! Run with: `cargo test --test build_pipeline`

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const ENV_OVERRIDES: [&str; 6] = [
    "SANITY_PROJECT_ID",
    "SANITY_DATASET",
    "SANITY_API_VERSION",
    "SANITY_API_TOKEN",
    "DEPLOY_HOOK_URL",
    "SITE_URL",
];

fn root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Run `campus-press` with the fixture config and export, writing into `work`.
fn run(work: &Path, args: &[&str]) -> Output {
    let root = root();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_campus-press"));
    cmd.args(args)
        .arg("--config")
        .arg(root.join("fixtures/config.toml"))
        .arg("--export")
        .arg(root.join("fixtures/export"))
        .arg("--output")
        .arg(work.join("dist"))
        .arg("--temp-dir")
        .arg(work.join("temp"))
        .arg("--public")
        .arg(work.join("public"))
        .env("RUST_LOG", "off");
    for key in ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd.output().expect("failed to run campus-press")
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

#[test]
fn build_writes_the_whole_site() {
    let work = TempDir::new().unwrap();
    fs::create_dir_all(work.path().join("public")).unwrap();
    fs::write(work.path().join("public/robots.txt"), "User-agent: *\n").unwrap();

    let out = run(work.path(), &["build"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let dist = work.path().join("dist");
    for page in [
        "index.html",
        "404.html",
        "noticias/index.html",
        "noticias/inauguracion-del-ano-academico/index.html",
        "noticias/becas-2026-abre-la-convocatoria/index.html",
        "noticias/torneo-interescolar-de-atletismo/index.html",
        "cursos/index.html",
        "presidentes/index.html",
        "robots.txt",
    ] {
        assert!(dist.join(page).is_file(), "missing {page}");
    }
    assert!(work.path().join("temp/snapshot.json").is_file());
    assert!(stdout(&out).contains("==> Build complete"));
}

#[test]
fn homepage_carousel_orders_active_banners() {
    let work = TempDir::new().unwrap();
    assert!(run(work.path(), &["build"]).status.success());
    let index = read(work.path().join("dist/index.html"));

    let first = index.find("Nuevo año académico").expect("position 1 banner");
    let second = index.find("Admisiones abiertas").expect("position 2 banner");
    assert!(first < second, "banners out of order");
    assert!(!index.contains("Vacaciones de invierno"), "inactive banner rendered");

    assert!(index.contains(r#"data-slides="2""#));
    assert!(index.contains(r#"href="/noticias/inauguracion-del-ano-academico""#));
    assert!(index.contains(
        r#"href="https://www.example.edu/admisiones" target="_blank" rel="noopener noreferrer""#
    ));
    assert!(index.contains("carousel-prev"));
    assert!(index.contains("/assets/carousel."));
}

#[test]
fn listing_excludes_articles_without_slug() {
    let work = TempDir::new().unwrap();
    assert!(run(work.path(), &["build"]).status.success());
    let listing = read(work.path().join("dist/noticias/index.html"));

    assert!(!listing.contains("Borrador publicado sin slug"));
    assert!(!listing.contains("cambios sin publicar"), "draft leaked into listing");
    let newest = listing.find("Inauguración del Año Académico").unwrap();
    let oldest = listing.find("Torneo interescolar de atletismo").unwrap();
    assert!(newest < oldest);
}

#[test]
fn article_page_renders_body_and_cover() {
    let work = TempDir::new().unwrap();
    assert!(run(work.path(), &["build"]).status.success());
    let page = read(
        work.path()
            .join("dist/noticias/inauguracion-del-ano-academico/index.html"),
    );

    assert!(page.contains("<h1>Inauguración del Año Académico</h1>"));
    assert!(page.contains("2 de marzo de 2026"));
    assert!(page.contains("https://cdn.sanity.io/images/proj/production/Cover3Hash0003-1600x900.jpg?"));
    assert!(page.contains(
        r#"<link rel="canonical" href="https://www.example.edu/noticias/inauguracion-del-ano-academico/">"#
    ));
    assert!(page.contains("<h2>"));
    assert!(page.contains("<blockquote>"));
}

#[test]
fn courses_and_presidents_pages() {
    let work = TempDir::new().unwrap();
    assert!(run(work.path(), &["build"]).status.success());

    let courses = read(work.path().join("dist/cursos/index.html"));
    let excel = courses.find("Excel para la gestión").unwrap();
    let oratoria = courses.find("Oratoria").unwrap();
    assert!(excel < oratoria, "undated course should come last");
    assert!(courses.contains("Empresas"));

    let presidents = read(work.path().join("dist/presidentes/index.html"));
    assert!(presidents.contains("2019 - Presente"));
    assert!(presidents.contains("2011 - 2019"));
    assert!(presidents.find("María García").unwrap() < presidents.find("Jorge López").unwrap());
}

// ---------------------------------------------------------------------------
// fetch / generate as separate stages
// ---------------------------------------------------------------------------

#[test]
fn fetch_then_generate_matches_build() {
    let work = TempDir::new().unwrap();
    let fetched = run(work.path(), &["fetch"]);
    assert!(fetched.status.success());
    assert!(stdout(&fetched).contains("Banners"));

    let snapshot = read(work.path().join("temp/snapshot.json"));
    assert!(!snapshot.contains("\"token\""));

    let generated = run(work.path(), &["generate"]);
    assert!(generated.status.success());
    assert!(stdout(&generated).contains("Generated"));
    assert!(work.path().join("dist/index.html").is_file());
}

#[test]
fn generate_without_snapshot_fails() {
    let work = TempDir::new().unwrap();
    let out = run(work.path(), &["generate"]);
    assert!(!out.status.success());
}

// ---------------------------------------------------------------------------
// check / gen-config
// ---------------------------------------------------------------------------

#[test]
fn check_reports_fixture_violations() {
    let work = TempDir::new().unwrap();
    let out = run(work.path(), &["check"]);
    assert!(!out.status.success());
    let text = stdout(&out);
    assert!(text.contains("noticia n-sin-slug"), "{text}");
    assert!(!text.contains("drafts."), "drafts are not validated");
}

#[test]
fn gen_config_output_is_a_valid_config() {
    let work = TempDir::new().unwrap();
    let out = run(work.path(), &["gen-config"]);
    assert!(out.status.success());
    let overlay: toml::Value = toml::from_str(&stdout(&out)).unwrap();
    let config = campus_press::config::resolve_config(Some(overlay), |_| None).unwrap();
    assert_eq!(config.homepage.article_count, 6);
}

#[test]
fn deploy_without_hook_url_fails() {
    let work = TempDir::new().unwrap();
    let out = run(work.path(), &["deploy", "--role", "administrator", "--yes"]);
    assert!(!out.status.success());
}

//! Browser tests for the banner carousel script.
//!
//! Run with: `cargo test --test browser_carousel -- --ignored`
//!
//! Pages link their assets with root-relative URLs, so the generated site is
//! served over a tiny HTTP server instead of `file://`.

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn site_dir() -> &'static Path {
    static SITE: OnceLock<TempDir> = OnceLock::new();
    SITE.get_or_init(|| {
        let work = TempDir::new().expect("temp dir");
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let status = Command::new(env!("CARGO_BIN_EXE_campus-press"))
            .args(["build", "--config"])
            .arg(root.join("fixtures/config.toml"))
            .arg("--export")
            .arg(root.join("fixtures/export"))
            .arg("--output")
            .arg(work.path().join("dist"))
            .arg("--temp-dir")
            .arg(work.path().join("temp"))
            .status()
            .expect("failed to run campus-press");
        assert!(status.success(), "fixture build failed");
        work
    })
    .path()
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        _ => "application/octet-stream",
    }
}

/// Serve `dist/` forever on a background thread.
fn base_url() -> &'static str {
    static URL: OnceLock<String> = OnceLock::new();
    URL.get_or_init(|| {
        let dist = site_dir().join("dist");
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let mut reader = BufReader::new(&stream);
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut header = String::new();
                    match reader.read_line(&mut header) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if header == "\r\n" => break,
                        Ok(_) => {}
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let mut file = dist.join(path.trim_start_matches('/'));
                if file.is_dir() {
                    file = file.join("index.html");
                }
                let mut stream = &stream;
                match std::fs::read(&file) {
                    Ok(body) => {
                        let _ = write!(
                            stream,
                            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            content_type(&file),
                            body.len()
                        );
                        let _ = stream.write_all(&body);
                    }
                    Err(_) => {
                        let _ = write!(
                            stream,
                            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        );
                    }
                }
            }
        });
        url
    })
}

fn browser() -> &'static Browser {
    static B: OnceLock<Browser> = OnceLock::new();
    B.get_or_init(|| {
        Browser::new(LaunchOptions {
            window_size: Some((1280, 800)),
            ..Default::default()
        })
        .expect("failed to launch Chrome")
    })
}

fn load_index() -> Arc<Tab> {
    let tab = browser().new_tab().unwrap();
    tab.navigate_to(&format!("{}/", base_url()))
        .unwrap()
        .wait_until_navigated()
        .unwrap();
    tab
}

fn eval(tab: &Tab, js: &str) -> serde_json::Value {
    tab.evaluate(js, false)
        .expect("failed to evaluate JS")
        .value
        .expect("no value returned")
}

const SELECTED: &str =
    "Number(document.querySelector('.carousel-dot.is-selected').getAttribute('data-index'))";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn first_slide_selected_on_load() {
    let tab = load_index();
    assert_eq!(eval(&tab, SELECTED), 0);
    let hidden = eval(
        &tab,
        "document.querySelectorAll('.carousel-slide[aria-hidden=\"true\"]').length",
    );
    assert_eq!(hidden, 1);
}

#[test]
#[ignore]
fn next_and_prev_loop() {
    let tab = load_index();
    eval(&tab, "document.querySelector('.carousel-next').click(); true");
    assert_eq!(eval(&tab, SELECTED), 1);
    eval(&tab, "document.querySelector('.carousel-next').click(); true");
    assert_eq!(eval(&tab, SELECTED), 0, "next from the last slide wraps");
    eval(&tab, "document.querySelector('.carousel-prev').click(); true");
    assert_eq!(eval(&tab, SELECTED), 1, "prev from the first slide wraps");
}

#[test]
#[ignore]
fn dot_jumps_and_updates_aria() {
    let tab = load_index();
    eval(&tab, "document.querySelectorAll('.carousel-dot')[1].click(); true");
    assert_eq!(eval(&tab, SELECTED), 1);
    let current = eval(
        &tab,
        "document.querySelectorAll('.carousel-dot')[1].getAttribute('aria-current')",
    );
    assert_eq!(current, "true");
    let first_hidden = eval(
        &tab,
        "document.querySelectorAll('.carousel-slide')[0].getAttribute('aria-hidden')",
    );
    assert_eq!(first_hidden, "true");
}

#[test]
#[ignore]
fn arrow_keys_navigate() {
    let tab = load_index();
    let key = |k: &str| {
        format!(
            "document.querySelector('.carousel').dispatchEvent(new KeyboardEvent('keydown', {{ key: '{k}' }})); true"
        )
    };
    eval(&tab, &key("ArrowRight"));
    assert_eq!(eval(&tab, SELECTED), 1);
    eval(&tab, &key("ArrowLeft"));
    assert_eq!(eval(&tab, SELECTED), 0);
}

#[test]
#[ignore]
fn click_while_hovering_keeps_autoplay_paused() {
    let tab = load_index();
    eval(
        &tab,
        "document.querySelector('.carousel').dispatchEvent(new PointerEvent('pointerenter')); true",
    );
    eval(&tab, "document.querySelector('.carousel-next').click(); true");
    assert_eq!(eval(&tab, SELECTED), 1);
    // Longer than the 5 s default delay.
    thread::sleep(Duration::from_millis(6500));
    assert_eq!(eval(&tab, SELECTED), 1, "autoplay resumed under the pointer");
}

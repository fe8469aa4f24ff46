//! Shared helpers for the CLI integration tests.

#![allow(dead_code, clippy::unwrap_used, deprecated)] // cargo_bin deprecation

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use assert_cmd::Command;

/// A `symscan-cli` command isolated from the user's configuration.
///
/// Runs in `dir`, with `HOME` and `XDG_CONFIG_HOME` pointing inside it,
/// and without proxies so requests reach the local fake backend.
pub fn symscan(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("symscan-cli").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("SYMSCAN_BACKEND_URL")
        .env_remove("RUST_LOG");
    for var in ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"] {
        cmd.env_remove(var);
    }
    cmd
}

/// Write a small document into `dir` and return its name.
pub fn write_plan(dir: &Path, name: &str) -> String {
    std::fs::write(dir.join(name), b"%PDF-1.4 floor plan").unwrap();
    name.to_owned()
}

/// A request seen by [`FakeBackend`].
#[derive(Debug, Clone)]
pub struct Seen {
    /// `"GET /results"` style request line.
    pub route: String,
    /// Raw request body.
    pub body: Vec<u8>,
}

/// Minimal HTTP/1.1 server answering each route from a table.
///
/// Every response closes the connection. Routes without an entry
/// answer 404.
pub struct FakeBackend {
    base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeBackend {
    /// Serve `routes`, keyed by `"METHOD /path"`, on an ephemeral port.
    pub fn start(routes: HashMap<String, (u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                serve(stream, &routes, &log);
            }
        });

        Self { base_url, seen }
    }

    /// A backend where every stage succeeds.
    pub fn healthy() -> Self {
        Self::start(healthy_routes())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request lines in arrival order.
    pub fn routes(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.route.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

/// Routes for a backend where every stage succeeds.
pub fn healthy_routes() -> HashMap<String, (u16, String)> {
    let results = r#"{
        "summary": {"total_pages": 2, "items_found": 2, "total_detections": 3},
        "detections": [
            {"class_name": "Door", "confidence": 0.9, "page": 1},
            {"class_name": "Socket Outlet", "confidence": 0.5, "page": 1},
            {"class_name": "Door", "confidence": 0.7, "page": 2}
        ],
        "pages": [
            {"page": 1, "url": "/outputs/run_1/page_1.jpg"},
            {"page": 2, "url": "/outputs/run_1/page_2.jpg"}
        ]
    }"#;
    [
        ("GET /reset", r#"{"status": "ok"}"#),
        ("POST /upload", r#"{"status": "Complete", "filename": "plan.pdf"}"#),
        ("GET /preprocess", r#"{"status": "ok", "pages": 2}"#),
        ("GET /load_model", r#"{"status": "ok"}"#),
        ("GET /inference", r#"{"status": "ok", "run_dir": "run_1"}"#),
        ("GET /results", results),
    ]
    .into_iter()
    .map(|(route, body)| (route.to_owned(), (200, body.to_owned())))
    .collect()
}

/// Answer one request, logging it before the response is written.
fn serve(
    stream: TcpStream,
    routes: &HashMap<String, (u16, String)>,
    log: &Mutex<Vec<Seen>>,
) -> Option<()> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let route = format!("{} {}", parts.next()?, parts.next()?);

    let mut content_length = 0usize;
    let mut chunked = false;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "transfer-encoding" => chunked = value.to_ascii_lowercase().contains("chunked"),
                _ => {}
            }
        }
    }

    let mut body = Vec::new();
    if chunked {
        loop {
            let mut size = String::new();
            reader.read_line(&mut size).ok()?;
            let hex = size.trim().split(';').next().unwrap_or("0");
            let n = usize::from_str_radix(hex, 16).ok()?;
            let mut chunk = vec![0; n + 2];
            reader.read_exact(&mut chunk).ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    } else {
        body.resize(content_length, 0);
        reader.read_exact(&mut body).ok()?;
    }

    let (status, payload) = routes
        .get(&route)
        .cloned()
        .unwrap_or_else(|| (404, r#"{"detail": "Not Found"}"#.to_owned()));
    log.lock().unwrap().push(Seen { route, body });

    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        if status < 400 { "OK" } else { "Error" },
        payload.len(),
    );
    let mut stream = stream;
    stream.write_all(response.as_bytes()).ok()?;
    stream.flush().ok()
}

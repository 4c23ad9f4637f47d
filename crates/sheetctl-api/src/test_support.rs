//! Shared test doubles: recording collaborators and a loopback token endpoint.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::oauth::{CodePrompt, UrlOpener};

static TEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Returns a unique scratch path for a token file.
pub(crate) fn temp_token_path() -> PathBuf {
    let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut path = std::env::temp_dir();
    path.push(format!(
        "sheetctl-test-{}-{}.json",
        std::process::id(),
        counter
    ));
    path
}

/// A [`UrlOpener`] that records every URL instead of opening a browser.
#[derive(Clone, Default)]
pub(crate) struct RecordingOpener {
    urls: Arc<Mutex<Vec<String>>>,
}

impl RecordingOpener {
    pub(crate) fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// A [`UrlOpener`] that always fails, for the manual-navigation fallback path.
#[derive(Clone, Default)]
pub(crate) struct FailingOpener;

impl UrlOpener for FailingOpener {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        Err(std::io::Error::other("no browser available"))
    }
}

/// A [`CodePrompt`] that replies with a fixed code and counts invocations.
#[derive(Clone)]
pub(crate) struct ScriptedPrompt {
    code: String,
    count: Arc<AtomicUsize>,
}

impl ScriptedPrompt {
    pub(crate) fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl CodePrompt for ScriptedPrompt {
    fn prompt_line(&self, _prompt: &str) -> std::io::Result<String> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(self.code.clone())
    }
}

/// A loopback HTTP endpoint serving a canned response to every request.
pub(crate) struct TokenServer {
    pub(crate) url: String,
    pub(crate) hits: Arc<AtomicUsize>,
}

/// Spawns a loopback endpoint that answers every request with `status` and
/// `body`. The listener thread lives for the duration of the test process.
pub(crate) fn token_server(status: u16, body: &str) -> TokenServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let body = body.to_string();

    let thread_hits = hits.clone();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            thread_hits.fetch_add(1, Ordering::SeqCst);
            read_request(&mut stream);

            let reason = if status < 400 { "OK" } else { "Bad Request" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    TokenServer {
        url: format!("http://{}/token", addr),
        hits,
    }
}

/// Reads a full HTTP request (headers plus Content-Length body) so the client
/// never sees the connection close mid-write.
fn read_request(stream: &mut TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];

    let header_end = loop {
        match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => {
                data.extend_from_slice(&buf[..n]);
                if let Some(pos) = find_subslice(&data, b"\r\n\r\n") {
                    break pos + 4;
                }
            }
            Err(_) => return,
        }
    };

    let headers = String::from_utf8_lossy(&data[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body_read = data.len() - header_end;
    while body_read < content_length {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => body_read += n,
            Err(_) => break,
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

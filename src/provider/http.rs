//! Shared HTTP client, SSE framing, and auth utilities.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::StrandError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            })
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> StrandError {
    match status {
        401 | 403 => StrandError::Authentication(error_message(body)),
        429 => StrandError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => StrandError::api(status, error_message(body)),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

/// Incremental SSE framing: feed raw chunks, get complete `data` payloads.
///
/// Bytes are buffered until a full line arrives, so a UTF-8 sequence split
/// across chunks is decoded whole.
#[derive(Debug, Default)]
pub struct SseBuffer {
    buffer: Vec<u8>,
    pending: Vec<String>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk; returns payloads of every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = decode_line(raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if !self.pending.is_empty() {
                    events.push(self.pending.join("\n"));
                    self.pending.clear();
                }
                continue;
            }
            if let Some(data) = line.strip_prefix("data:") {
                self.pending.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
        }
        events
    }

    /// Flush an event left unterminated when the stream closed.
    pub fn finish(mut self) -> Option<String> {
        let tail = decode_line(std::mem::take(&mut self.buffer));
        if let Some(data) = tail.trim_end().strip_prefix("data:") {
            self.pending.push(data.trim_start().to_string());
        }
        (!self.pending.is_empty()).then(|| self.pending.join("\n"))
    }
}

/// A complete line that still is not UTF-8 is genuinely malformed; keep what
/// can be read.
fn decode_line(raw: Vec<u8>) -> String {
    String::from_utf8(raw)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

//! Per-request view used to pick the next hop.
//!
//! # Responsibilities
//! - Extract the routing-relevant parts (host, path) of an incoming request
//! - Derive the next-hop target URL
//! - Render the human-readable preamble written ahead of a forwarded reply

use std::fmt::Write as _;

use axum::http::{header::HOST, HeaderMap, Request};

use crate::config::ForwardMode;

/// The terminal path: requests here end the chain.
pub const ROOT_PATH: &str = "/";

/// Host, path and headers of one incoming request.
#[derive(Debug, Clone)]
pub struct HopRequest {
    host: String,
    path: String,
    headers: HeaderMap,
}

impl HopRequest {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let host = request
            .headers()
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| request.uri().authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self {
            host,
            path: request.uri().path().to_string(),
            headers: request.headers().clone(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_terminal(&self) -> bool {
        self.path == ROOT_PATH
    }

    /// Absolute URL of the next hop. The path already starts with `/`.
    pub fn target(&self, mode: ForwardMode) -> String {
        match mode {
            ForwardMode::Host => format!("http://{}{}", self.host, self.path),
            ForwardMode::Path => format!("http:/{}", self.path),
        }
    }

    /// Text written before the upstream reply.
    ///
    /// `Host` is reported on its own line and left out of the header list.
    pub fn preamble(&self, target: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Current Host: {}", self.host);
        out.push_str("Current Request Headers...\n");
        for name in self.headers.keys() {
            if *name == HOST {
                continue;
            }
            let values: Vec<_> = self
                .headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect();
            let _ = writeln!(out, "{}: [{}]", name, values.join(" "));
        }
        let _ = writeln!(out, "Making upstream GET {}", target);
        out.push_str("Reply...\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, host: &str) -> HopRequest {
        let req = Request::builder()
            .uri(path)
            .header(HOST, host)
            .header("accept", "*/*")
            .header("x-multi", "a")
            .header("x-multi", "b")
            .body(())
            .unwrap();
        HopRequest::from_request(&req)
    }

    #[test]
    fn root_is_terminal() {
        assert!(request("/", "h:1").is_terminal());
        assert!(!request("/x", "h:1").is_terminal());
        assert!(!request("/x/", "h:1").is_terminal());
    }

    #[test]
    fn host_mode_uses_host_header() {
        let hop = request("/a/b", "127.0.0.1:9001");
        assert_eq!(hop.target(ForwardMode::Host), "http://127.0.0.1:9001/a/b");
    }

    #[test]
    fn query_is_not_forwarded() {
        let hop = request("/a?x=1", "h:1");
        assert_eq!(hop.target(ForwardMode::Host), "http://h:1/a");
    }

    #[test]
    fn path_mode_uses_first_segment() {
        let hop = request("/next:8001/last:8002/", "ignored:1");
        assert_eq!(hop.target(ForwardMode::Path), "http://next:8001/last:8002/");
    }

    #[test]
    fn host_falls_back_to_authority() {
        let req = Request::builder()
            .uri("http://authority:7000/x")
            .body(())
            .unwrap();
        let hop = HopRequest::from_request(&req);
        assert_eq!(hop.host(), "authority:7000");
    }

    #[test]
    fn preamble_lists_headers() {
        let hop = request("/x", "h:1");
        let target = hop.target(ForwardMode::Host);
        let preamble = hop.preamble(&target);

        assert!(preamble.starts_with("Current Host: h:1\nCurrent Request Headers...\n"));
        assert!(preamble.contains("accept: [*/*]\n"));
        assert!(preamble.contains("x-multi: [a b]\n"));
        assert!(!preamble.contains("host: ["));
        assert!(preamble.ends_with("Making upstream GET http://h:1/x\nReply...\n"));
    }
}

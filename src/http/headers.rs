//! Header classification and copying for forwarded traffic.
//!
//! # Responsibilities
//! - Split inbound headers into content headers and request headers
//! - Drop excluded (host and hop-by-hop) headers on the way out
//! - Strip `Transfer-Encoding` from upstream responses
//! - Track this instance's hops in `Via` so forwarding cycles terminate
//!
//! # Design Decisions
//! - Content headers describe a body, so they only travel with one
//!   (POST, PUT, PATCH); a GET never carries `Content-Length` upstream
//! - Every other header is copied verbatim, repeated values included

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

/// Which part of an outbound message a header belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderClass {
    Content,
    Request,
}

/// Classify a header name.
pub fn classify(name: &HeaderName) -> HeaderClass {
    match name.as_str() {
        "allow" | "content-disposition" | "content-encoding" | "content-language"
        | "content-length" | "content-location" | "content-md5" | "content-range"
        | "content-type" | "expires" | "last-modified" => HeaderClass::Content,
        _ => HeaderClass::Request,
    }
}

/// Returns true for methods whose inbound body is streamed upstream.
pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Parse configured header names, skipping ones that are not valid.
pub fn parse_exclusions(names: &[String]) -> Vec<HeaderName> {
    names
        .iter()
        .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
        .collect()
}

/// Inbound headers split by class.
#[derive(Debug, Default)]
pub struct OutboundHeaders {
    pub request: HeaderMap,
    pub content: HeaderMap,
}

impl OutboundHeaders {
    /// Split `source` into request and content headers, leaving out `excluded`.
    pub fn split(source: &HeaderMap, excluded: &[HeaderName]) -> Self {
        let mut headers = Self::default();
        for (name, value) in source {
            if excluded.contains(name) {
                continue;
            }
            let target = match classify(name) {
                HeaderClass::Content => &mut headers.content,
                HeaderClass::Request => &mut headers.request,
            };
            target.append(name.clone(), value.clone());
        }
        headers
    }

    /// Write the headers into an outbound request. Content headers are only
    /// written when the request carries a body.
    pub fn apply(self, target: &mut HeaderMap, with_body: bool) {
        target.extend(self.request);
        if with_body {
            target.extend(self.content);
        }
    }
}

/// Number of `Via` entries in `headers` received by `instance`.
pub fn via_hops(headers: &HeaderMap, instance: &str) -> usize {
    headers
        .get_all(header::VIA)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter(|entry| entry.split_whitespace().nth(1) == Some(instance))
        .count()
}

/// Carry the inbound `Via` chain onto `target` and add this hop.
///
/// The chain is rebuilt from `inbound` so a `via` exclusion cannot reset it.
pub fn append_via(target: &mut HeaderMap, inbound: &HeaderMap, instance: &str) {
    target.remove(header::VIA);
    for value in inbound.get_all(header::VIA) {
        target.append(header::VIA, value.clone());
    }
    if let Ok(value) = HeaderValue::from_str(&format!("1.1 {instance}")) {
        target.append(header::VIA, value);
    }
}

/// Remove headers that must not be relayed from an upstream response.
pub fn strip_response_headers(headers: &mut HeaderMap) {
    headers.remove(header::TRANSFER_ENCODING);
}

//! Content negotiation for entity responses.
//!
//! # Selection Order
//! 1. Query parameter `f` or `out` naming `siren`, `json` or `xml`
//! 2. `Accept` header substrings (`application/json`, `*/json`, `text/json`,
//!    `application/xml`, `*/xml`, `text/xml`)
//! 3. `application/vnd.siren+json`
//!
//! The character encoding comes from `Accept-Charset` (highest `q` wins, ties go
//! to the earlier entry, unknown names fall back to UTF-8).

use axum::http::{header, HeaderMap};

use crate::http::request::QueryParams;

/// Serialization format of an entity response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaFormat {
    #[default]
    Siren,
    Json,
    Xml,
}

impl MediaFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            MediaFormat::Siren => "application/vnd.siren+json",
            MediaFormat::Json => "application/json",
            MediaFormat::Xml => "application/xml",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "siren" => Some(MediaFormat::Siren),
            "json" => Some(MediaFormat::Json),
            "xml" => Some(MediaFormat::Xml),
            _ => None,
        }
    }

    fn from_accept(accept: &str) -> Self {
        let accept = accept.to_ascii_lowercase();
        if accept.contains("application/json")
            || accept.contains("*/json")
            || accept.contains("text/json")
        {
            MediaFormat::Json
        } else if accept.contains("application/xml")
            || accept.contains("*/xml")
            || accept.contains("text/xml")
        {
            MediaFormat::Xml
        } else {
            MediaFormat::Siren
        }
    }
}

/// Character encodings an entity body can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
    Ascii,
}

impl Charset {
    /// Look up a charset by its (case-insensitive) IANA name or common alias.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" | "*" => Some(Charset::Utf8),
            "utf-16" | "utf-16le" | "unicode" => Some(Charset::Utf16Le),
            "utf-16be" | "unicodefffe" => Some(Charset::Utf16Be),
            "iso-8859-1" | "latin1" | "l1" => Some(Charset::Latin1),
            "us-ascii" | "ascii" => Some(Charset::Ascii),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Utf16Le => "utf-16",
            Charset::Utf16Be => "utf-16BE",
            Charset::Latin1 => "iso-8859-1",
            Charset::Ascii => "us-ascii",
        }
    }

    /// Encode text; characters outside a single-byte charset become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Charset::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Charset::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            Charset::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
        }
    }

    /// Pick the charset from an `Accept-Charset` header value.
    pub fn from_accept_charset(value: &str) -> Self {
        let mut best: Option<(&str, f32)> = None;
        for entry in value.split(',') {
            let mut parts = entry.split(';');
            let name = parts.next().unwrap_or_default().trim();
            if name.is_empty() {
                continue;
            }
            let quality = parts
                .filter_map(|param| {
                    let (key, value) = param.split_once('=')?;
                    key.trim()
                        .eq_ignore_ascii_case("q")
                        .then(|| value.trim().parse::<f32>().ok())
                        .flatten()
                })
                .next()
                .unwrap_or(1.0);
            if quality <= 0.0 {
                continue;
            }
            if best.map_or(true, |(_, q)| quality > q) {
                best = Some((name, quality));
            }
        }

        best.and_then(|(name, _)| Charset::from_name(name))
            .unwrap_or_default()
    }
}

/// The outcome of negotiating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Negotiated {
    pub format: MediaFormat,
    pub charset: Charset,
}

impl Negotiated {
    /// `Content-Type` header value, including the charset.
    pub fn content_type(&self) -> String {
        format!("{}; charset={}", self.format.media_type(), self.charset.name())
    }
}

/// Negotiate format and charset from request headers and query string.
pub fn negotiate(headers: &HeaderMap, query: Option<&str>) -> Negotiated {
    let params = QueryParams::parse(query);
    let forced = ["f", "out"]
        .iter()
        .filter_map(|key| params.get(key))
        .find_map(MediaFormat::from_name);

    let format = forced.unwrap_or_else(|| {
        headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(MediaFormat::from_accept)
            .find(|format| *format != MediaFormat::Siren)
            .unwrap_or_default()
    });

    let charset = headers
        .get(header::ACCEPT_CHARSET)
        .and_then(|v| v.to_str().ok())
        .map(Charset::from_accept_charset)
        .unwrap_or_default();

    Negotiated { format, charset }
}

//! `#EXTVLCOPT` / `#EXTHTTP` header directives.
//!
//! IPTV playlists attach request headers to the next media URL with one of
//! two directive styles:
//!
//! ```text
//! #EXTVLCOPT:http-user-agent=VLC/3.0
//! #EXTVLCOPT:http-header=X-Token: abc
//! #EXTHTTP:{"Referer":"https://site.example/","Origin":"https://site.example"}
//! ```
//!
//! [`PendingHeaders`] accumulates them until a media URL consumes the set,
//! at which point they are appended to the rewritten URL as `h_*` query
//! parameters.

use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const VLC_OPT_PREFIX: &str = "#EXTVLCOPT:";
pub const HTTP_HEADERS_PREFIX: &str = "#EXTHTTP:";

/// Result of parsing the body of an `#EXTVLCOPT:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VlcOption {
    /// An option that maps to an HTTP request header
    Header { name: String, value: String },
    /// A well-formed option that carries no header (e.g. `network-caching`)
    Ignored,
    /// No `key=value` shape
    Malformed,
}

/// Result of parsing the body of an `#EXTHTTP:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpHeaders {
    Parsed(PendingHeaders),
    Failed(String),
}

/// Ordered header name → value mapping waiting for the next media URL.
///
/// Assigning an existing name overwrites its value in place, so iteration
/// order is the order names were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingHeaders {
    entries: Vec<(String, String)>,
}

impl PendingHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Feed one trimmed playlist line into the set.
    ///
    /// Returns `true` when the line is a header directive (and must be passed
    /// through verbatim), `false` otherwise. Malformed directives never fail:
    /// a broken `#EXTVLCOPT` leaves the set untouched, a broken `#EXTHTTP`
    /// empties it.
    pub fn accumulate(&mut self, line: &str) -> bool {
        if let Some(option) = line.strip_prefix(VLC_OPT_PREFIX) {
            match parse_vlc_option(option) {
                VlcOption::Header { name, value } => {
                    debug!("Header from #EXTVLCOPT: {}: {}", name, value);
                    self.set(name, value);
                }
                VlcOption::Ignored => {}
                VlcOption::Malformed => {
                    debug!("Ignoring #EXTVLCOPT without key=value: {}", line);
                }
            }
            return true;
        }

        if let Some(json) = line.strip_prefix(HTTP_HEADERS_PREFIX) {
            match parse_http_headers(json) {
                HttpHeaders::Parsed(headers) => {
                    debug!("Replacing pending headers from #EXTHTTP ({} headers)", headers.len());
                    *self = headers;
                }
                HttpHeaders::Failed(reason) => {
                    warn!("Failed to parse #EXTHTTP '{}': {}", line, reason);
                    self.clear();
                }
            }
            return true;
        }

        false
    }

    /// Render the set as `&h_{name}={value}` query parameters.
    ///
    /// Names are percent-encoded once, values twice; the extractor service
    /// decodes them in that shape.
    pub fn to_query_params(&self) -> String {
        let mut params = String::new();
        for (name, value) in self.iter() {
            params.push_str("&h_");
            params.push_str(&percent_encode(name));
            params.push('=');
            params.push_str(&percent_encode(&percent_encode(value)));
        }
        params
    }

    /// Append the pending headers to `url` and empty the set.
    pub fn apply_to(&mut self, url: &mut String) {
        if !self.is_empty() {
            url.push_str(&self.to_query_params());
        }
        self.clear();
    }
}

impl FromIterator<(String, String)> for PendingHeaders {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = PendingHeaders::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

/// Parse the text after `#EXTVLCOPT:`.
pub fn parse_vlc_option(option: &str) -> VlcOption {
    let Some((key, value)) = option.split_once('=') else {
        return VlcOption::Malformed;
    };
    let key = key.trim();
    let value = value.trim();

    if key == "http-header" {
        if let Some((name, header_value)) = value.split_once(':') {
            return VlcOption::Header {
                name: name.trim().to_string(),
                value: header_value.trim().to_string(),
            };
        }
    }

    if let Some(suffix) = key.strip_prefix("http-") {
        return VlcOption::Header {
            name: header_case(suffix),
            value: value.to_string(),
        };
    }

    VlcOption::Ignored
}

/// Parse the JSON object after `#EXTHTTP:`.
///
/// String values are used verbatim, numbers and booleans by their JSON text.
/// Anything else (null, arrays, nested objects, non-object roots) fails.
pub fn parse_http_headers(json: &str) -> HttpHeaders {
    let object: Map<String, Value> = match serde_json::from_str(json) {
        Ok(object) => object,
        Err(e) => return HttpHeaders::Failed(e.to_string()),
    };

    let mut headers = PendingHeaders::new();
    for (name, value) in object {
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return HttpHeaders::Failed(format!(
                    "unsupported value for header '{}': {}",
                    name, other
                ));
            }
        };
        headers.set(name, value);
    }
    HttpHeaders::Parsed(headers)
}

/// `user-agent` → `User-Agent`
fn header_case(name: &str) -> String {
    name.split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("-")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Percent-encode everything except unreserved characters and `/`.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0x0f) as usize]));
            }
        }
    }
    out
}

const HEX: [u8; 16] = *b"0123456789ABCDEF";

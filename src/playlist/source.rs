//! Request payload parsing.
//!
//! The payload is the raw query string of a `/proxy` request:
//!
//! ```text
//! https://mfp.example.com:secret&http://provider.example/list.m3u;https://other.example&http://x/y.m3u
//! ```
//!
//! Definitions are separated by `;`. Each is `base[:secret]&source_url`.

use super::rewrite::RewriteContext;

/// One playlist to fetch, rewrite and merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDefinition {
    pub destination_base: String,
    pub shared_secret: Option<String>,
    pub source_url: String,
}

impl PlaylistDefinition {
    pub fn rewrite_context(&self) -> RewriteContext {
        RewriteContext::new(self.destination_base.clone(), self.shared_secret.clone())
    }
}

/// A parsed payload element, kept in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionEntry {
    Valid(PlaylistDefinition),
    /// A definition without `&`, carried verbatim for the skip marker
    Invalid(String),
}

/// Split the payload into ordered definitions.
///
/// Every `;`-separated segment is kept, so an empty one (trailing `;`) comes
/// back as an invalid entry.
pub fn parse_payload(payload: &str) -> Vec<DefinitionEntry> {
    payload.split(';').map(parse_definition).collect()
}

/// Parse a single `base[:secret]&source_url` definition.
pub fn parse_definition(definition: &str) -> DefinitionEntry {
    let Some((creds, source_url)) = definition.split_once('&') else {
        return DefinitionEntry::Invalid(definition.to_string());
    };

    let (base, shared_secret) = split_credentials(creds);

    DefinitionEntry::Valid(PlaylistDefinition {
        destination_base: base.trim_end_matches('/').to_string(),
        shared_secret: shared_secret.map(str::to_string),
        source_url: source_url.to_string(),
    })
}

/// Separate an optional trailing `:secret` from the destination base.
///
/// The tail after the last `:` is a port when it is all digits and part of the
/// scheme when it starts with `//`; neither is a secret. An empty tail is an
/// empty secret.
fn split_credentials(creds: &str) -> (&str, Option<&str>) {
    match creds.rsplit_once(':') {
        Some((base, tail)) if is_secret(tail) => (base, Some(tail)),
        _ => (creds, None),
    }
}

fn is_secret(tail: &str) -> bool {
    if tail.starts_with("//") {
        return false;
    }
    tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit())
}

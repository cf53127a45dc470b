//! Media URL classification and rewriting.
//!
//! With a shared secret, URLs are routed to the matching extractor/proxy
//! endpoint by the first rule in [`RULES`] whose predicate matches; URLs no
//! rule claims are left as they are. Without a secret every URL goes through
//! the generic `/proxy/m3u` endpoint.
//!
//! The source URL is embedded verbatim (not percent-encoded) because the
//! downstream service reads the raw `d=`/`url=` tail.

use tracing::debug;

/// Per-playlist rewrite configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    /// Scheme, host and optional port of the extractor service, no trailing slash
    pub destination_base: String,
    /// `api_password` for the extractor; `None` selects no-password mode
    pub shared_secret: Option<String>,
}

impl RewriteContext {
    pub fn new(destination_base: impl Into<String>, shared_secret: Option<String>) -> Self {
        Self {
            destination_base: destination_base.into(),
            shared_secret,
        }
    }
}

/// One entry of the ordered classification table
pub struct RewriteRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    /// Builds the rewritten URL from `(base, secret, url)`
    pub build: fn(&str, &str, &str) -> String,
}

/// Classification rules in priority order; first match wins.
pub static RULES: &[RewriteRule] = &[
    RewriteRule {
        name: "vixcloud",
        matches: is_vixsrc,
        build: vixcloud_extractor,
    },
    RewriteRule {
        name: "hls",
        matches: is_hls,
        build: hls_proxy,
    },
    RewriteRule {
        name: "mpd",
        matches: is_mpd,
        build: mpd_proxy,
    },
    RewriteRule {
        name: "dlhd",
        matches: is_php,
        build: dlhd_extractor,
    },
];

fn is_vixsrc(url: &str) -> bool {
    url.contains("vixsrc.to")
}

fn is_hls(url: &str) -> bool {
    url.contains(".m3u8")
}

fn is_mpd(url: &str) -> bool {
    url.contains(".mpd")
}

fn is_php(url: &str) -> bool {
    url.contains(".php")
}

fn vixcloud_extractor(base: &str, secret: &str, url: &str) -> String {
    format!(
        "{}/extractor/video?host=VixCloud&redirect_stream=true&api_password={}&d={}",
        base, secret, url
    )
}

fn hls_proxy(base: &str, secret: &str, url: &str) -> String {
    format!(
        "{}/proxy/hls/manifest.m3u8?api_password={}&d={}",
        base, secret, url
    )
}

fn mpd_proxy(base: &str, secret: &str, url: &str) -> String {
    format!(
        "{}/proxy/mpd/manifest.m3u8?api_password={}&d={}",
        base, secret, url
    )
}

fn dlhd_extractor(base: &str, secret: &str, url: &str) -> String {
    format!(
        "{}/extractor/video?host=DLHD&redirect_stream=true&api_password={}&d={}",
        base, secret, url
    )
}

/// Whether a trimmed playlist line is a bare media URL.
pub fn is_media_url(line: &str) -> bool {
    !line.is_empty()
        && !line.starts_with('#')
        && (line.contains("http://") || line.contains("https://"))
}

/// First rule matching `url`, if any.
pub fn classify(url: &str) -> Option<&'static RewriteRule> {
    RULES.iter().find(|rule| (rule.matches)(url))
}

/// Rewrite one media URL for the given context.
pub fn rewrite_url(url: &str, context: &RewriteContext) -> String {
    let base = &context.destination_base;

    let Some(secret) = context.shared_secret.as_deref() else {
        debug!("Rewriting without password: {}", url);
        return format!("{}/proxy/m3u?url={}", base, url);
    };

    match classify(url) {
        Some(rule) => {
            debug!("Rewriting with rule '{}': {}", rule.name, url);
            (rule.build)(base, secret, url)
        }
        None => {
            debug!("No rewrite rule matched, passing through: {}", url);
            url.to_string()
        }
    }
}

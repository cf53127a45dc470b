//! Handler-level tests using tower::ServiceExt::oneshot.
//!
//! Tests the full Axum router (middleware + handlers) without binding a TCP
//! listener. Playlist sources come from an in-memory fetcher.

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use futures_util::stream;
use http_body_util::BodyExt;
use playlist_proxy::config::{Config, DEFAULT_USER_AGENT};
use playlist_proxy::error::FetchError;
use playlist_proxy::fetch::{LineStream, PlaylistFetcher};
use playlist_proxy::server::build_router_with_state;
use playlist_proxy::server::state::AppState;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

/// Build a test config with sensible defaults.
fn test_config() -> Config {
    Config {
        port: 0,
        is_dev: true,
        fetch_timeout_secs: 5,
        fetch_max_attempts: 1,
        user_agent: DEFAULT_USER_AGENT.to_string(),
        accept_invalid_certs: false,
    }
}

/// Serves fixed bodies; unknown URLs fail with 404.
struct StaticFetcher(HashMap<String, String>);

#[async_trait]
impl PlaylistFetcher for StaticFetcher {
    async fn fetch_lines(&self, url: &str) -> Result<LineStream, FetchError> {
        let body = self.0.get(url).cloned().ok_or_else(|| FetchError::Status {
            status: 404,
            url: url.to_string(),
        })?;
        let lines: Vec<Result<String, FetchError>> = body
            .split_inclusive('\n')
            .map(|l| Ok(l.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(lines)))
    }
}

fn app(sources: &[(&str, &str)]) -> Router {
    let fetcher = StaticFetcher(
        sources
            .iter()
            .map(|(url, body)| (url.to_string(), body.to_string()))
            .collect(),
    );
    build_router_with_state(AppState::with_fetcher(test_config(), Arc::new(fetcher)))
}

async fn body_text(resp: axum::response::Response) -> String {
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&body).into_owned()
}

// ── Health endpoint ─────────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_200_with_json() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = app(&[]).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["uptime_seconds"].is_number());
}

#[tokio::test]
async fn root_path_returns_health() {
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();

    let resp = app(&[]).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ── Version header ──────────────────────────────────────────────────────────

#[tokio::test]
async fn all_responses_include_version_header() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = app(&[]).oneshot(req).await.unwrap();
    let version = resp
        .headers()
        .get("x-playlist-proxy-version")
        .expect("missing X-Playlist-Proxy-Version header");

    assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
}

// ── 404 for unknown routes ──────────────────────────────────────────────────

#[tokio::test]
async fn unknown_route_returns_404() {
    let req = Request::builder()
        .uri("/builder")
        .body(Body::empty())
        .unwrap();

    let resp = app(&[]).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Proxy endpoint ──────────────────────────────────────────────────────────

#[tokio::test]
async fn proxy_without_query_is_bad_request() {
    for uri in ["/proxy", "/proxy?"] {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app(&[]).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {}", uri);
    }
}

#[tokio::test]
async fn proxy_streams_rewritten_playlist_with_download_headers() {
    let app = app(&[(
        "http://src.example.com/list.m3u",
        "#EXTM3U\n#EXTINF:-1,News\n#EXTVLCOPT:http-user-agent=VLC\nhttp://cdn.example.com/news.m3u8\n",
    )]);

    let req = Request::builder()
        .uri("/proxy?https://mfp.example.com:pw&http://src.example.com/list.m3u")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(
        resp.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"playlist.m3u\""
    );

    assert_eq!(
        body_text(resp).await,
        concat!(
            "#EXTM3U\n",
            "#EXTINF:-1,News\n",
            "#EXTVLCOPT:http-user-agent=VLC\n",
            "https://mfp.example.com/proxy/hls/manifest.m3u8?api_password=pw&d=http://cdn.example.com/news.m3u8&h_User-Agent=VLC\n",
        )
    );
}

#[tokio::test]
async fn proxy_merges_sources_and_reports_failures_inline() {
    let app = app(&[
        ("http://a.example/1.m3u", "#EXTM3U\nhttp://cdn/a.ts\n"),
        ("http://b.example/2.m3u", "#EXTM3U\nhttp://cdn/b.ts\n"),
    ]);

    let req = Request::builder()
        .uri("/proxy?http://d&http://a.example/1.m3u;broken;http://d&http://gone.example/x.m3u;http://d&http://b.example/2.m3u")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(
        body_text(resp).await,
        concat!(
            "#EXTM3U\n",
            "http://d/proxy/m3u?url=http://cdn/a.ts\n",
            "# SKIPPED Invalid Definition: broken\n",
            "# ERROR processing playlist http://gone.example/x.m3u: HTTP 404 for url: http://gone.example/x.m3u\n",
            "http://d/proxy/m3u?url=http://cdn/b.ts\n",
        )
    );
}

#[tokio::test]
async fn proxy_with_only_separators_streams_skip_markers() {
    let req = Request::builder()
        .uri("/proxy?;")
        .body(Body::empty())
        .unwrap();

    let resp = app(&[]).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_text(resp).await,
        "# SKIPPED Invalid Definition: \n# SKIPPED Invalid Definition: \n"
    );
}

#[tokio::test]
async fn proxy_with_empty_secret_uses_password_routes() {
    let app = app(&[("http://a.example/1.m3u", "#EXTM3U\nhttp://cdn/a.m3u8\n")]);

    let req = Request::builder()
        .uri("/proxy?https://mfp.example.com:&http://a.example/1.m3u")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(
        body_text(resp).await,
        concat!(
            "#EXTM3U\n",
            "https://mfp.example.com/proxy/hls/manifest.m3u8?api_password=&d=http://cdn/a.m3u8\n",
        )
    );
}

#[tokio::test]
async fn proxy_allows_any_origin() {
    let app = app(&[("http://a.example/1.m3u", "#EXTM3U\n")]);

    let req = Request::builder()
        .uri("/proxy?http://d&http://a.example/1.m3u")
        .header("origin", "https://player.example")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

// ── Metrics ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn metrics_endpoint_renders_prometheus_text() {
    let app = app(&[("http://a.example/1.m3u", "#EXTM3U\nhttp://cdn/a.m3u8\n")]);

    let req = Request::builder()
        .uri("/proxy?http://d:pw&http://a.example/1.m3u")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let _ = body_text(resp).await;

    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let text = body_text(resp).await;
    assert!(text.contains("playlist_proxy_requests_total"));
    assert!(text.contains("playlist_proxy_lines_rewritten_total"));
}

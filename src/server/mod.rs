pub mod handlers;
pub mod state;

use crate::{config::Config, error::Result};
use axum::{
    Router,
    http::{HeaderName, HeaderValue},
    middleware,
    response::Response,
    routing::get,
};
use state::AppState;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Response header carrying the crate version
pub const VERSION_HEADER: &str = "x-playlist-proxy-version";

/// Build the router with the reqwest-backed fetcher.
pub async fn build_router(config: Config) -> Result<Router> {
    let state = AppState::new(config)?;
    Ok(build_router_with_state(state))
}

/// Build the router around prepared state (tests inject their own fetcher).
pub fn build_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::serve_metrics))
        .route("/proxy", get(handlers::playlist::serve_proxy))
        .layer(middleware::map_response(add_version_header))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn add_version_header(mut response: Response) -> Response {
    response.headers_mut().insert(
        HeaderName::from_static(VERSION_HEADER),
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    let app = build_router(config).await?;

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🚀 Server listening on http://{}", addr);
    info!(
        "Usage: http://{}/proxy?https://mfp.example.com:password&http://provider.example/playlist.m3u",
        addr
    );

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

use crate::{
    config::Config,
    fetch::{HttpFetcher, PlaylistFetcher},
    metrics,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Outbound playlist fetcher (shared connection pool)
    pub fetcher: Arc<dyn PlaylistFetcher>,
    /// Prometheus handle used by the `/metrics` endpoint
    pub metrics: PrometheusHandle,
    /// Process start, for the health endpoint
    pub started_at: Instant,
}

impl AppState {
    /// Create state with the reqwest-backed fetcher
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create state around any fetcher implementation
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn PlaylistFetcher>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            metrics: metrics::install(),
            started_at: Instant::now(),
        }
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::metrics;

/// Errors surfaced by the HTTP layer before a response body has started.
///
/// Once the merged playlist is streaming, failures are reported inline as
/// comment lines instead (see [`crate::playlist::merge`]).
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Missing playlist definitions in query string")]
    MissingPayload,

    #[error("Failed to build HTTP client: {0}")]
    ClientBuildError(#[from] reqwest::Error),
}

/// Failure to obtain the lines of a remote playlist.
///
/// Covers transport errors (DNS, TLS, connect, timeout), non-2xx statuses and
/// errors while reading the body after the response started.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} for url: {url}")]
    Status { status: u16, url: String },

    #[error("{0}")]
    Body(String),
}

impl FetchError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(e) if e.is_timeout() => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Body(_) => "body",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::MissingPayload => StatusCode::BAD_REQUEST,
            ProxyError::ClientBuildError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        metrics::record_request(status.as_u16());

        (status, format!("{}\n", self)).into_response()
    }
}

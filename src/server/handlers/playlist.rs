use crate::{
    error::{ProxyError, Result},
    metrics,
    playlist::{merge_playlists, parse_payload},
    server::state::AppState,
};
use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use std::convert::Infallible;
use std::time::Instant;
use tracing::info;

/// Serve the merged, rewritten playlist for every definition in the query.
///
/// The raw query string is the payload; it is not form-decoded because source
/// URLs carry their own `&` and `=`. The body streams as sources are fetched.
pub async fn serve_proxy(
    RawQuery(query): RawQuery,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();

    let payload = query
        .filter(|q| !q.is_empty())
        .ok_or(ProxyError::MissingPayload)?;

    let entries = parse_payload(&payload);

    info!("Streaming merged playlist for {} definition(s)", entries.len());

    let lines = merge_playlists(entries, state.fetcher.clone());
    let body = Body::from_stream(lines.map(Ok::<_, Infallible>));

    metrics::record_request(200);
    metrics::record_duration(start);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/vnd.apple.mpegurl"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"playlist.m3u\"",
            ),
        ],
        body,
    )
        .into_response())
}

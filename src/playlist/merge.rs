//! Multi-playlist merging.
//!
//! Definitions are processed strictly in order, one fetch at a time. The
//! output keeps a single leading `#EXTM3U`: the first one seen is emitted,
//! and any later segment that opens with its own `#EXTM3U` has it dropped.
//! Fetch failures become `# ERROR ...` comment lines so one dead source never
//! takes the whole response down.

use futures_util::{Stream, StreamExt, pin_mut};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::lines::rewrite_stream;
use super::source::DefinitionEntry;
use crate::error::FetchError;
use crate::fetch::PlaylistFetcher;
use crate::metrics;

/// Emit a progress log every this many bytes.
pub const LOG_INTERVAL_BYTES: u64 = 10 * 1024 * 1024;

/// Lines longer than this are logged as suspicious.
pub const LONG_LINE_THRESHOLD: usize = 10_000;

/// Whether a line is the `#EXTM3U` playlist header (attributes allowed).
pub fn is_extm3u(line: &str) -> bool {
    match line.trim().strip_prefix("#EXTM3U") {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

pub fn skipped_marker(definition: &str) -> String {
    format!("# SKIPPED Invalid Definition: {}\n", definition)
}

pub fn error_marker(source_url: &str, error: &FetchError) -> String {
    format!("# ERROR processing playlist {}: {}\n", source_url, error)
}

/// Header bookkeeping and byte accounting for one merged response.
#[derive(Debug, Default)]
pub struct MergeState {
    header_emitted: bool,
    first_line_of_segment: bool,
    segment_lines: u64,
    bytes_emitted: u64,
    last_milestone: u64,
}

impl MergeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header_emitted(&self) -> bool {
        self.header_emitted
    }

    pub fn bytes_emitted(&self) -> u64 {
        self.bytes_emitted
    }

    /// Lines produced by the current segment so far, suppressed ones included.
    pub fn segment_lines(&self) -> u64 {
        self.segment_lines
    }

    pub fn begin_segment(&mut self) {
        self.first_line_of_segment = true;
        self.segment_lines = 0;
    }

    /// Decide whether a rewritten line of the current segment is emitted.
    pub fn accept(&mut self, line: String) -> Option<String> {
        let first = std::mem::replace(&mut self.first_line_of_segment, false);
        self.segment_lines += 1;

        let header = is_extm3u(&line);
        if !self.header_emitted {
            if header {
                self.header_emitted = true;
            }
        } else if first && header {
            debug!("Dropping #EXTM3U at start of merged segment");
            return None;
        }

        if line.len() > LONG_LINE_THRESHOLD {
            warn!(
                "Very long line ({} bytes, line {} of segment): {:.100}",
                line.len(),
                self.segment_lines,
                line
            );
        }

        self.record(&line);
        Some(line)
    }

    /// Close the current segment. A segment with content but no header of
    /// its own still claims the header slot for the rest of the response.
    pub fn end_segment(&mut self) {
        if self.segment_lines > 0 && !self.header_emitted {
            self.header_emitted = true;
        }
    }

    /// Account for a line emitted outside segment processing (markers).
    pub fn record(&mut self, line: &str) {
        let len = line.len() as u64;
        self.bytes_emitted += len;
        metrics::record_bytes_streamed(len);

        let milestone = self.bytes_emitted / LOG_INTERVAL_BYTES;
        if milestone > self.last_milestone {
            self.last_milestone = milestone;
            info!(
                "Merged output reached {:.2} MB",
                self.bytes_emitted as f64 / (1024.0 * 1024.0)
            );
        }
    }
}

/// Fetch, rewrite and merge every definition into one lazy line stream.
///
/// Nothing is fetched until the stream is polled, and dropping the stream
/// (client disconnect) drops any in-flight response with it.
pub fn merge_playlists(
    entries: Vec<DefinitionEntry>,
    fetcher: Arc<dyn PlaylistFetcher>,
) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        let mut state = MergeState::new();
        let total = entries.len();

        for (index, entry) in entries.into_iter().enumerate() {
            let definition = match entry {
                DefinitionEntry::Valid(definition) => definition,
                DefinitionEntry::Invalid(raw) => {
                    warn!("[{}/{}] Skipping definition without '&': {}", index + 1, total, raw);
                    metrics::record_definition("skipped");
                    let marker = skipped_marker(&raw);
                    state.record(&marker);
                    yield marker;
                    continue;
                }
            };

            let source_url = definition.source_url.clone();
            match &definition.shared_secret {
                Some(secret) => info!(
                    "[{}/{}] Processing {} via {} (password {})",
                    index + 1, total, source_url, definition.destination_base, "*".repeat(secret.len())
                ),
                None => info!(
                    "[{}/{}] Processing {} via {} (no password)",
                    index + 1, total, source_url, definition.destination_base
                ),
            }

            state.begin_segment();
            let mut failure = None;

            match fetcher.fetch_lines(&source_url).await {
                Ok(lines) => {
                    let rewritten = rewrite_stream(lines, definition.rewrite_context());
                    pin_mut!(rewritten);

                    while let Some(next) = rewritten.next().await {
                        match next {
                            Ok(line) => {
                                if let Some(line) = state.accept(line) {
                                    yield line;
                                }
                            }
                            Err(e) => {
                                failure = Some(e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => failure = Some(e),
            }

            match failure {
                Some(e) => {
                    warn!(
                        "[{}/{}] Error processing playlist {} after {} lines: {}",
                        index + 1, total, source_url, state.segment_lines(), e
                    );
                    metrics::record_definition("fetch_error");
                    metrics::record_fetch_error(e.kind());
                    let marker = error_marker(&source_url, &e);
                    state.record(&marker);
                    yield marker;
                }
                None => {
                    info!(
                        "[{}/{}] Finished {} ({} lines)",
                        index + 1, total, source_url, state.segment_lines()
                    );
                    metrics::record_definition("ok");
                }
            }

            state.end_segment();
        }

        info!("Merged {} definitions, {} bytes", total, state.bytes_emitted());
    }
}

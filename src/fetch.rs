//! Outbound playlist fetching.
//!
//! [`PlaylistFetcher`] is the seam between the merge pipeline and the
//! network: it turns a URL into a lazy stream of text lines. [`HttpFetcher`]
//! is the reqwest implementation; tests plug in in-memory fetchers.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt, pin_mut};
use reqwest::{Client, header};
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::FetchError;
use crate::http_retry::{RetryConfig, send_with_retry};

/// Lines of one remote playlist, each ending in its original terminator.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, FetchError>> + Send>>;

/// Source of playlist lines
#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    /// Start fetching `url`.
    ///
    /// Fails before yielding anything when the request cannot be sent or the
    /// response is not 2xx. Errors while reading the body are yielded as the
    /// last stream item.
    async fn fetch_lines(&self, url: &str) -> Result<LineStream, FetchError>;
}

/// reqwest-backed fetcher with a shared connection pool
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Build the outbound client from configuration.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            retry: RetryConfig {
                max_attempts: config.fetch_max_attempts,
                ..RetryConfig::default()
            },
        })
    }
}

#[async_trait]
impl PlaylistFetcher for HttpFetcher {
    async fn fetch_lines(&self, url: &str) -> Result<LineStream, FetchError> {
        let response = send_with_retry(&self.client, url, &self.retry).await?;
        debug!("Streaming playlist body from {} ({})", url, response.status());
        Ok(Box::pin(split_lines(response.bytes_stream())))
    }
}

/// Incremental `\n` splitter over arbitrary byte chunks.
///
/// Bytes are decoded per complete line, so multi-byte UTF-8 sequences split
/// across chunks survive; invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    /// Add a chunk and return every line it completed, terminators included.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos + 1);
            if self.buffer.is_empty() {
                lines.push(String::from_utf8_lossy(head).into_owned());
            } else {
                self.buffer.extend_from_slice(head);
                lines.push(String::from_utf8_lossy(&self.buffer).into_owned());
                self.buffer.clear();
            }
            rest = tail;
        }
        self.buffer.extend_from_slice(rest);
        lines
    }

    /// Flush a trailing line that had no terminator, giving it a `\n`.
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let mut line = String::from_utf8_lossy(&self.buffer).into_owned();
        line.push('\n');
        Some(line)
    }
}

/// Turn a stream of body chunks into a stream of lines.
///
/// A chunk error is yielded once and ends the stream.
pub fn split_lines<St, B, E>(body: St) -> impl Stream<Item = Result<String, FetchError>>
where
    St: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<FetchError>,
{
    async_stream::stream! {
        pin_mut!(body);
        let mut splitter = LineSplitter::default();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for line in splitter.push(bytes.as_ref()) {
                        yield Ok(line);
                    }
                }
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }

        if let Some(line) = splitter.finish() {
            yield Ok(line);
        }
    }
}

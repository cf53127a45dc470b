//! Line-at-a-time playlist rewriting.
//!
//! [`LineRewriter`] owns the header state for exactly one playlist stream.
//! [`rewrite_lines`] and [`rewrite_stream`] wrap it as lazy iterator/stream
//! adapters so a playlist is never held in memory as a whole.

use futures_util::{Stream, StreamExt};

use super::headers::PendingHeaders;
use super::rewrite::{RewriteContext, is_media_url, rewrite_url};
use crate::metrics;

/// Stateful rewriter for a single playlist.
#[derive(Debug, Clone)]
pub struct LineRewriter {
    context: RewriteContext,
    headers: PendingHeaders,
}

impl LineRewriter {
    pub fn new(context: RewriteContext) -> Self {
        Self {
            context,
            headers: PendingHeaders::new(),
        }
    }

    pub fn context(&self) -> &RewriteContext {
        &self.context
    }

    /// Headers collected since the last media URL.
    pub fn pending_headers(&self) -> &PendingHeaders {
        &self.headers
    }

    /// Rewrite one raw line, terminator included.
    ///
    /// Directive and metadata lines come back unchanged. Media URL lines are
    /// rewritten, get the pending headers appended and keep the original
    /// terminator.
    pub fn rewrite_line(&mut self, raw: &str) -> String {
        let (content, terminator) = split_terminator(raw);
        let logical = content.trim();

        if self.headers.accumulate(logical) {
            return raw.to_string();
        }

        if is_media_url(logical) {
            let mut rewritten = rewrite_url(logical, &self.context);
            self.headers.apply_to(&mut rewritten);
            rewritten.push_str(terminator);
            metrics::record_line_rewritten();
            return rewritten;
        }

        raw.to_string()
    }
}

/// Split a line into its content and its `\r\n` / `\n` / empty terminator.
fn split_terminator(raw: &str) -> (&str, &str) {
    if let Some(content) = raw.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = raw.strip_suffix('\n') {
        (content, "\n")
    } else {
        (raw, "")
    }
}

/// Iterator adapter produced by [`rewrite_lines`].
pub struct RewrittenLines<I> {
    inner: I,
    rewriter: LineRewriter,
}

impl<I, S> Iterator for RewrittenLines<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner
            .next()
            .map(|line| self.rewriter.rewrite_line(line.as_ref()))
    }
}

/// Rewrite a synchronous sequence of raw lines.
pub fn rewrite_lines<I, S>(lines: I, context: RewriteContext) -> RewrittenLines<I::IntoIter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    RewrittenLines {
        inner: lines.into_iter(),
        rewriter: LineRewriter::new(context),
    }
}

/// Rewrite a fallible stream of raw lines. Errors pass through untouched.
pub fn rewrite_stream<St, E>(
    lines: St,
    context: RewriteContext,
) -> impl Stream<Item = Result<String, E>>
where
    St: Stream<Item = Result<String, E>>,
{
    let mut rewriter = LineRewriter::new(context);
    lines.map(move |line| line.map(|l| rewriter.rewrite_line(&l)))
}

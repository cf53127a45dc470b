//! Streaming M3U rewrite-and-merge pipeline.
//!
//! `source` parses the request payload, `headers` and `rewrite` implement the
//! per-line rules, `lines` composes them into a lazy rewriter and `merge`
//! drives one rewriter per source into a single playlist.

pub mod headers;
pub mod lines;
pub mod merge;
pub mod rewrite;
pub mod source;

pub use lines::{LineRewriter, rewrite_lines, rewrite_stream};
pub use merge::{MergeState, merge_playlists};
pub use rewrite::RewriteContext;
pub use source::{DefinitionEntry, PlaylistDefinition, parse_payload};

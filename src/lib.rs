//! Pagegrab Core Library
//!
//! Downloads files that web pages only reference indirectly: each source
//! page is fetched, its `<script>` blocks are scanned for a
//! `window.open("...")` download link, and the linked file is streamed to a
//! local directory. Many pages are processed concurrently and a failure on
//! one never affects the others.
//!
//! # Architecture
//!
//! - [`download`] - HTTP client, filename resolution, streamed writes
//! - [`extract`] - Download link extraction from page content
//! - [`pipeline`] - Per-link processing and the bounded worker pool
//! - [`input`] - Loading the list of source links
//! - [`progress`] - Progress reporting hooks

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod extract;
pub mod input;
pub mod pipeline;
pub mod progress;
mod user_agent;

// Re-export commonly used types
pub use download::{ClientConfig, DownloadError, HttpClient};
pub use extract::{LinkExtractor, WindowOpenExtractor};
pub use input::{InputError, load_links, parse_links};
pub use pipeline::{
    DEFAULT_CONCURRENCY, DispatchError, DispatchSummary, Dispatcher, DownloadOutcome,
    DownloadTarget, FetchStage, LinkProcessor, PageProcessor,
};
pub use progress::{NoopReporter, ProgressReporter, TracingReporter, TransferId};

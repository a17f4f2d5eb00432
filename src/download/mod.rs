//! HTTP fetching, filename resolution, and streamed file writing.
//!
//! # Features
//!
//! - Page fetches and streamed file requests with non-2xx mapped to errors
//! - Filename resolution from Content-Disposition headers with URL fallback
//! - Fixed-size chunked writes with per-chunk progress callbacks
//! - Configurable timeouts (30s connect, 5min read by default)
//!
//! # Example
//!
//! ```no_run
//! use pagegrab_core::download::{HttpClient, resolve_filename, write_stream};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let response = client.open_stream("https://example.com/file.zip").await?;
//! let filename = resolve_filename(response.headers(), response.url());
//! let path = Path::new("./downloads").join(&filename);
//! let bytes = write_stream(response.into_body_stream(), &path, |_delta| {}).await?;
//! println!("Downloaded {bytes} bytes to {}", path.display());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod filename;
mod writer;

pub use client::{ClientConfig, HttpClient, StreamingResponse};
pub use constants::{
    CHUNK_SIZE, CONNECT_TIMEOUT_SECS, FALLBACK_FILENAME, PAGE_TIMEOUT_SECS, READ_TIMEOUT_SECS,
};
pub use error::DownloadError;
pub use filename::resolve_filename;
pub use writer::write_stream;

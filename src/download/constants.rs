//! Constants for the download module (timeouts, chunking).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default total deadline for fetching a source page (60 seconds).
pub const PAGE_TIMEOUT_SECS: u64 = 60;

/// Size of each chunk written to disk and reported as progress.
pub const CHUNK_SIZE: usize = 1024;

/// Filename used when neither headers nor URL yield a usable name.
pub const FALLBACK_FILENAME: &str = "download.bin";

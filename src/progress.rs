//! Progress reporting hooks for streamed downloads.
//!
//! The pipeline only emits events; rendering is up to the implementation.
//! The library ships a no-op and a `tracing`-backed reporter; the CLI adds
//! terminal progress bars.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

static NEXT_TRANSFER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one file transfer across its progress events.
///
/// Two links may resolve to the same filename; the id keeps their events apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(u64);

impl TransferId {
    /// Allocates an id not handed out before in this process.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_TRANSFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receives per-file progress events. Called concurrently from workers.
///
/// Every transfer that sees `on_start` ends with exactly one of
/// `on_complete` or `on_failed`.
pub trait ProgressReporter: Send + Sync {
    /// A download is about to start. `total_bytes` is 0 when unknown.
    fn on_start(&self, _id: TransferId, _filename: &str, _total_bytes: u64) {}

    /// A chunk of `delta` bytes was written.
    fn on_chunk(&self, id: TransferId, filename: &str, total_bytes: u64, delta: u64);

    /// The file was fully written to `path`.
    fn on_complete(&self, id: TransferId, filename: &str, path: &Path);

    /// The transfer stopped before the file was complete.
    fn on_failed(&self, _id: TransferId, _filename: &str) {}
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_chunk(&self, _id: TransferId, _filename: &str, _total_bytes: u64, _delta: u64) {}

    fn on_complete(&self, _id: TransferId, _filename: &str, _path: &Path) {}
}

/// Logs starts and completions at `info`, chunks not at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn on_start(&self, id: TransferId, filename: &str, total_bytes: u64) {
        debug!(transfer = %id, filename, total_bytes, "download started");
    }

    fn on_chunk(&self, _id: TransferId, _filename: &str, _total_bytes: u64, _delta: u64) {}

    fn on_complete(&self, id: TransferId, filename: &str, path: &Path) {
        info!(transfer = %id, filename, path = %path.display(), "Downloaded");
    }

    fn on_failed(&self, id: TransferId, filename: &str) {
        warn!(transfer = %id, filename, "download incomplete");
    }
}

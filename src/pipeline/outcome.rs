//! Per-link results of the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

/// Which network request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Fetching the source page.
    Page,
    /// Fetching the extracted download URL.
    File,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Page => "page",
            Self::File => "file",
        })
    }
}

/// Where an extracted download will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// The extracted download URL.
    pub url: String,
    /// Safe single-component filename.
    pub filename: String,
    /// `output_dir/filename`.
    pub destination: PathBuf,
}

impl DownloadTarget {
    /// Builds a target for `filename` inside `output_dir`.
    #[must_use]
    pub fn new(url: impl Into<String>, filename: impl Into<String>, output_dir: &Path) -> Self {
        let filename = filename.into();
        let destination = output_dir.join(&filename);
        Self {
            url: url.into(),
            filename,
            destination,
        }
    }
}

/// Terminal result of processing one source link.
///
/// Causes are kept as rendered strings so outcomes stay `Clone` and can be
/// sent across tasks without dragging the transport error types along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File written.
    Success {
        source: String,
        path: PathBuf,
        bytes_written: u64,
    },
    /// Page fetched but it contained no download link.
    NoLinkFound { source: String },
    /// A request failed at `stage`.
    NetworkError {
        source: String,
        stage: FetchStage,
        cause: String,
    },
    /// Writing the file failed.
    IoError {
        source: String,
        path: PathBuf,
        cause: String,
    },
    /// Processing stopped abnormally before producing a result.
    Aborted { source: String, cause: String },
}

impl DownloadOutcome {
    /// The source link this outcome belongs to.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Success { source, .. }
            | Self::NoLinkFound { source }
            | Self::NetworkError { source, .. }
            | Self::IoError { source, .. }
            | Self::Aborted { source, .. } => source,
        }
    }

    /// True only for [`DownloadOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Aggregate counts over a run's outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub succeeded: usize,
    pub no_link: usize,
    pub network_failed: usize,
    pub io_failed: usize,
    pub aborted: usize,
    pub bytes_written: u64,
}

impl DispatchSummary {
    /// Tallies a slice of outcomes.
    #[must_use]
    pub fn from_outcomes(outcomes: &[DownloadOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut summary, outcome| {
            match outcome {
                DownloadOutcome::Success { bytes_written, .. } => {
                    summary.succeeded += 1;
                    summary.bytes_written += bytes_written;
                }
                DownloadOutcome::NoLinkFound { .. } => summary.no_link += 1,
                DownloadOutcome::NetworkError { .. } => summary.network_failed += 1,
                DownloadOutcome::IoError { .. } => summary.io_failed += 1,
                DownloadOutcome::Aborted { .. } => summary.aborted += 1,
            }
            summary
        })
    }

    /// Number of outcomes tallied.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.no_link + self.network_failed + self.io_failed + self.aborted
    }

    /// Number of outcomes that were not a success.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded
    }
}

//! Processing of a single source link: page → link → file on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::outcome::{DownloadOutcome, DownloadTarget, FetchStage};
use crate::download::{DownloadError, HttpClient, resolve_filename, write_stream};
use crate::extract::LinkExtractor;
use crate::progress::{ProgressReporter, TransferId};

/// Turns one source link into exactly one [`DownloadOutcome`].
///
/// Implementations must not panic or return early without an outcome;
/// the dispatcher relies on that to account for every link.
#[async_trait]
pub trait LinkProcessor: Send + Sync {
    /// Processes `link` to completion.
    async fn process(&self, link: &str) -> DownloadOutcome;
}

/// Fetches a page, extracts its download link, and streams the file to disk.
pub struct PageProcessor {
    client: HttpClient,
    extractor: Arc<dyn LinkExtractor>,
    reporter: Arc<dyn ProgressReporter>,
    output_dir: PathBuf,
}

impl std::fmt::Debug for PageProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageProcessor")
            .field("client", &self.client)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl PageProcessor {
    /// Creates a processor writing into `output_dir`.
    ///
    /// The directory is expected to exist.
    #[must_use]
    pub fn new(
        client: HttpClient,
        extractor: Arc<dyn LinkExtractor>,
        reporter: Arc<dyn ProgressReporter>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            extractor,
            reporter,
            output_dir: output_dir.into(),
        }
    }

    /// Directory downloads are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn download(&self, link: &str, url: &str) -> DownloadOutcome {
        let response = match self.client.open_stream(url).await {
            Ok(response) => response,
            Err(e) => return network_error(link, FetchStage::File, &e),
        };

        let filename = resolve_filename(response.headers(), response.url());
        let target = DownloadTarget::new(url, filename, &self.output_dir);
        let total = response.content_length();
        debug!(
            url = %target.url,
            path = %target.destination.display(),
            total,
            "streaming file"
        );

        let transfer = TransferId::next();
        self.reporter.on_start(transfer, &target.filename, total);
        let reporter = &self.reporter;
        let filename = target.filename.as_str();
        let result = write_stream(response.into_body_stream(), &target.destination, |delta| {
            reporter.on_chunk(transfer, filename, total, delta);
        })
        .await;
        if result.is_err() {
            self.reporter.on_failed(transfer, &target.filename);
        }

        match result {
            Ok(bytes_written) => {
                self.reporter
                    .on_complete(transfer, &target.filename, &target.destination);
                info!(
                    source = %link,
                    path = %target.destination.display(),
                    bytes = bytes_written,
                    "download complete"
                );
                DownloadOutcome::Success {
                    source: link.to_string(),
                    path: target.destination,
                    bytes_written,
                }
            }
            Err(e) if e.is_io() => {
                warn!(source = %link, path = %target.destination.display(), error = %e, "write failed");
                DownloadOutcome::IoError {
                    source: link.to_string(),
                    path: target.destination,
                    cause: e.to_string(),
                }
            }
            Err(e) => network_error(link, FetchStage::File, &e),
        }
    }
}

#[async_trait]
impl LinkProcessor for PageProcessor {
    #[instrument(skip(self), fields(source = %link))]
    async fn process(&self, link: &str) -> DownloadOutcome {
        let page = match self.client.fetch_page(link).await {
            Ok(page) => page,
            Err(e) => return network_error(link, FetchStage::Page, &e),
        };

        let Some(url) = self.extractor.extract(&page) else {
            info!(source = %link, "Download URL not found");
            return DownloadOutcome::NoLinkFound {
                source: link.to_string(),
            };
        };
        debug!(download_url = %url, "extracted download URL");

        self.download(link, &url).await
    }
}

fn network_error(link: &str, stage: FetchStage, error: &DownloadError) -> DownloadOutcome {
    warn!(source = %link, %stage, error = %error, "Failed to download");
    DownloadOutcome::NetworkError {
        source: link.to_string(),
        stage,
        cause: error.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::extract::WindowOpenExtractor;
    use crate::progress::NoopReporter;

    #[tokio::test]
    async fn test_invalid_source_link_is_page_network_error() {
        let dir = TempDir::new().unwrap();
        let processor = PageProcessor::new(
            HttpClient::new(),
            Arc::new(WindowOpenExtractor::new()),
            Arc::new(NoopReporter),
            dir.path(),
        );

        let outcome = processor.process("not a url").await;

        match outcome {
            DownloadOutcome::NetworkError { source, stage, .. } => {
                assert_eq!(source, "not a url");
                assert_eq!(stage, FetchStage::Page);
            }
            other => panic!("expected NetworkError, got {other:?}"),
        }
        assert_eq!(processor.output_dir(), dir.path());
    }
}

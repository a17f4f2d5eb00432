//! Bounded worker pool that drives every source link through a processor.
//!
//! A producer task feeds links into a bounded queue in input order; a fixed
//! number of worker tasks pull from it and send outcomes back on a result
//! channel. A slow or failing link only ever occupies its own worker.
//!
//! # Cancellation
//!
//! The [`CancellationToken`] passed to [`Dispatcher::run_until_cancelled`]
//! stops the producer and makes workers stop taking new links. Links already
//! being processed run to completion; links never handed to a worker produce
//! no outcome.
//!
//! Each link is processed in its own task, so a panic inside a processor is
//! reported as [`DownloadOutcome::Aborted`] for that link and the worker
//! carries on with the next one.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::outcome::{DispatchSummary, DownloadOutcome};
use super::page::LinkProcessor;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default number of workers.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Error type for dispatcher construction.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Runs a [`LinkProcessor`] over many links with a fixed worker count.
pub struct Dispatcher {
    processor: Arc<dyn LinkProcessor>,
    concurrency: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with `concurrency` workers.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidConcurrency`] if the value is outside
    /// 1..=100.
    #[instrument(level = "debug", skip(processor))]
    pub fn new(
        processor: Arc<dyn LinkProcessor>,
        concurrency: usize,
    ) -> Result<Self, DispatchError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(DispatchError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self {
            processor,
            concurrency,
        })
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Processes every link; returns one outcome per link in completion order.
    pub async fn run(&self, links: Vec<String>) -> Vec<DownloadOutcome> {
        self.run_until_cancelled(links, CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops taking new links once `cancel` fires.
    #[instrument(skip(self, links, cancel), fields(links = links.len(), concurrency = self.concurrency))]
    pub async fn run_until_cancelled(
        &self,
        links: Vec<String>,
        cancel: CancellationToken,
    ) -> Vec<DownloadOutcome> {
        let total = links.len();
        info!(total, "starting dispatch");

        let (work_tx, work_rx) = mpsc::channel::<String>(self.concurrency);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();

        let producer = tokio::spawn(feed_links(links, work_tx, cancel.clone()));

        let workers: Vec<_> = (0..self.concurrency)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&self.processor),
                    Arc::clone(&work_rx),
                    result_tx.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        // Only workers hold senders now; the receiver ends once they all exit.
        drop(result_tx);
        // Once every worker is gone the queue closes and the producer stops.
        drop(work_rx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = result_rx.recv().await {
            outcomes.push(outcome);
        }

        if let Err(e) = producer.await {
            warn!(error = %e, "link producer task panicked");
        }
        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "dispatch worker panicked");
            }
        }

        let summary = DispatchSummary::from_outcomes(&outcomes);
        info!(
            succeeded = summary.succeeded,
            no_link = summary.no_link,
            network_failed = summary.network_failed,
            io_failed = summary.io_failed,
            aborted = summary.aborted,
            unprocessed = total - outcomes.len(),
            "dispatch complete"
        );

        outcomes
    }
}

async fn feed_links(links: Vec<String>, work_tx: mpsc::Sender<String>, cancel: CancellationToken) {
    for link in links {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("cancelled; no further links will be queued");
                return;
            }
            sent = work_tx.send(link) => {
                if sent.is_err() {
                    // All workers are gone.
                    return;
                }
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    processor: Arc<dyn LinkProcessor>,
    work_rx: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::UnboundedSender<DownloadOutcome>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            link = next_link(&work_rx) => link,
        };
        let Some(link) = next else {
            break;
        };

        debug!(worker_id, link = %link, "processing link");
        let outcome = process_isolated(Arc::clone(&processor), link).await;
        if results.send(outcome).is_err() {
            break;
        }
    }
    debug!(worker_id, "worker exiting");
}

/// Runs one link in its own task so a panic costs only that link.
async fn process_isolated(processor: Arc<dyn LinkProcessor>, link: String) -> DownloadOutcome {
    let task_link = link.clone();
    match tokio::spawn(async move { processor.process(&task_link).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(link = %link, error = %e, "link processing panicked");
            DownloadOutcome::Aborted {
                source: link,
                cause: format!("processing panicked: {e}"),
            }
        }
    }
}

async fn next_link(work_rx: &Mutex<mpsc::Receiver<String>>) -> Option<String> {
    work_rx.lock().await.recv().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::pipeline::outcome::FetchStage;

    /// Succeeds for every link after `delay`, failing links containing "bad".
    struct FakeProcessor {
        delay: Duration,
        current: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FakeProcessor {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LinkProcessor for FakeProcessor {
        async fn process(&self, link: &str) -> DownloadOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.current.fetch_sub(1, Ordering::SeqCst);

            if link.contains("bad") {
                DownloadOutcome::NetworkError {
                    source: link.to_string(),
                    stage: FetchStage::Page,
                    cause: "refused".to_string(),
                }
            } else {
                DownloadOutcome::Success {
                    source: link.to_string(),
                    path: PathBuf::from(link),
                    bytes_written: 1,
                }
            }
        }
    }

    /// Panics on links containing "boom", succeeds otherwise.
    struct PanickingProcessor;

    #[async_trait]
    impl LinkProcessor for PanickingProcessor {
        async fn process(&self, link: &str) -> DownloadOutcome {
            assert!(!link.contains("boom"), "processor failed on {link}");
            DownloadOutcome::NoLinkFound {
                source: link.to_string(),
            }
        }
    }

    fn links(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example.com/{i}")).collect()
    }

    #[test]
    fn test_dispatcher_new_valid_concurrency() {
        let processor = Arc::new(FakeProcessor::new(Duration::ZERO));
        assert_eq!(Dispatcher::new(processor.clone(), 1).unwrap().concurrency(), 1);
        assert_eq!(Dispatcher::new(processor.clone(), 5).unwrap().concurrency(), 5);
        assert_eq!(Dispatcher::new(processor, 100).unwrap().concurrency(), 100);
    }

    #[test]
    fn test_dispatcher_new_invalid_concurrency() {
        let processor = Arc::new(FakeProcessor::new(Duration::ZERO));
        assert!(matches!(
            Dispatcher::new(processor.clone(), 0),
            Err(DispatchError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            Dispatcher::new(processor, 101),
            Err(DispatchError::InvalidConcurrency { value: 101 })
        ));
    }

    #[tokio::test]
    async fn test_every_link_yields_exactly_one_outcome() {
        let processor = Arc::new(FakeProcessor::new(Duration::from_millis(1)));
        let dispatcher = Dispatcher::new(processor.clone(), 3).unwrap();
        let input = links(17);

        let outcomes = dispatcher.run(input.clone()).await;

        assert_eq!(outcomes.len(), 17);
        let covered: HashSet<&str> = outcomes.iter().map(DownloadOutcome::source).collect();
        let expected: HashSet<&str> = input.iter().map(String::as_str).collect();
        assert_eq!(covered, expected);
        assert_eq!(processor.calls.load(Ordering::SeqCst), 17);
    }

    #[tokio::test]
    async fn test_empty_input_returns_no_outcomes() {
        let dispatcher =
            Dispatcher::new(Arc::new(FakeProcessor::new(Duration::ZERO)), 5).unwrap();
        assert!(dispatcher.run(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let processor = Arc::new(FakeProcessor::new(Duration::from_millis(20)));
        let dispatcher = Dispatcher::new(processor.clone(), 2).unwrap();

        let outcomes = dispatcher.run(links(8)).await;

        assert_eq!(outcomes.len(), 8);
        let peak = processor.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency {peak} exceeded limit");
        assert_eq!(peak, 2, "both workers should have been busy at once");
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_other_links() {
        let processor = Arc::new(FakeProcessor::new(Duration::from_millis(1)));
        let dispatcher = Dispatcher::new(processor, 2).unwrap();
        let mut input = links(4);
        input.insert(2, "https://bad.example/".to_string());

        let outcomes = dispatcher.run(input).await;
        let summary = DispatchSummary::from_outcomes(&outcomes);

        assert_eq!(summary.total(), 5);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.network_failed, 1);
    }

    #[tokio::test]
    async fn test_panicking_links_are_aborted_and_others_complete() {
        let dispatcher = Dispatcher::new(Arc::new(PanickingProcessor), 2).unwrap();
        let input: Vec<String> = ["boom1", "boom2", "a", "b", "c"]
            .into_iter()
            .map(String::from)
            .collect();

        let outcomes = tokio::time::timeout(Duration::from_secs(10), dispatcher.run(input))
            .await
            .expect("dispatch must finish even when processors panic");

        assert_eq!(outcomes.len(), 5);
        let summary = DispatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.aborted, 2);
        assert_eq!(summary.no_link, 3);
        let aborted: HashSet<&str> = outcomes
            .iter()
            .filter(|o| matches!(o, DownloadOutcome::Aborted { .. }))
            .map(DownloadOutcome::source)
            .collect();
        assert_eq!(aborted, HashSet::from(["boom1", "boom2"]));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_processes_nothing() {
        let processor = Arc::new(FakeProcessor::new(Duration::from_millis(1)));
        let dispatcher = Dispatcher::new(processor.clone(), 2).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcomes = dispatcher.run_until_cancelled(links(10), cancel).await;

        assert!(outcomes.is_empty());
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_stops_new_work_and_finishes_in_flight() {
        let processor = Arc::new(FakeProcessor::new(Duration::from_millis(50)));
        let dispatcher = Dispatcher::new(processor.clone(), 2).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(75)).await;
            trigger.cancel();
        });

        let outcomes = dispatcher.run_until_cancelled(links(20), cancel).await;

        let calls = processor.calls.load(Ordering::SeqCst);
        assert!(calls < 20, "cancellation should stop new work, got {calls} calls");
        assert_eq!(outcomes.len(), calls, "every started link must report an outcome");
    }
}

//! Terminal progress bars for concurrent downloads.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use pagegrab_core::{ProgressReporter, TransferId};

const BAR_TEMPLATE: &str =
    "{msg:30!} {bar:40.cyan/blue} {bytes:>10}/{total_bytes:<10} {bytes_per_sec:>12} {eta:>4}";
const COUNTER_TEMPLATE: &str = "{spinner} {msg:30!} {bytes:>10} {bytes_per_sec:>12}";

/// One bar per transfer in flight; byte counter spinner when the size is unknown.
#[derive(Debug, Default)]
pub(crate) struct ProgressBars {
    multi: MultiProgress,
    bars: Mutex<HashMap<TransferId, ProgressBar>>,
}

impl ProgressBars {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn new_bar(&self, filename: &str, total_bytes: u64) -> ProgressBar {
        let bar = if total_bytes > 0 {
            ProgressBar::new(total_bytes).with_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::new_spinner().with_style(
                ProgressStyle::with_template(COUNTER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            )
        };
        bar.set_message(filename.to_string());
        self.multi.add(bar)
    }

    fn take(&self, id: TransferId) -> Option<ProgressBar> {
        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }
}

impl ProgressReporter for ProgressBars {
    fn on_start(&self, id: TransferId, filename: &str, total_bytes: u64) {
        let bar = self.new_bar(filename, total_bytes);
        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, bar);
    }

    fn on_chunk(&self, id: TransferId, filename: &str, total_bytes: u64, delta: u64) {
        let mut bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        bars.entry(id)
            .or_insert_with(|| self.new_bar(filename, total_bytes))
            .inc(delta);
    }

    fn on_complete(&self, id: TransferId, _filename: &str, path: &Path) {
        if let Some(bar) = self.take(id) {
            bar.finish_and_clear();
        }
        let _ = self.multi.println(format!("Downloaded: {}", path.display()));
    }

    fn on_failed(&self, id: TransferId, _filename: &str) {
        if let Some(bar) = self.take(id) {
            bar.abandon();
        }
    }
}

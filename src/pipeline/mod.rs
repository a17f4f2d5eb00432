//! The concurrent fetch → extract → download pipeline.
//!
//! - [`PageProcessor`] handles one source link end to end
//! - [`Dispatcher`] runs a processor over all links with bounded concurrency
//! - [`DownloadOutcome`] is the per-link result; exactly one per processed link

mod dispatcher;
mod outcome;
mod page;

pub use dispatcher::{DEFAULT_CONCURRENCY, DispatchError, Dispatcher};
pub use outcome::{DispatchSummary, DownloadOutcome, DownloadTarget, FetchStage};
pub use page::{LinkProcessor, PageProcessor};

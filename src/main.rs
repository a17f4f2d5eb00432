//! CLI entry point for pagegrab.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pagegrab_core::{
    DispatchSummary, Dispatcher, HttpClient, PageProcessor, ProgressReporter, TracingReporter,
    WindowOpenExtractor, load_links,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod progress_bars;

use app_config::Settings;
use cli::Args;
use progress_bars::ProgressBars;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(args.default_log_level());

    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_default_file_config()?;
    let settings = Settings::resolve(&args, file_config.as_ref());
    debug!(?settings, "settings resolved");

    let links = match load_links(&settings.links_file) {
        Ok(links) => links,
        Err(e) => {
            // Missing or unreadable input is reported, not fatal.
            warn!("{e}");
            return Ok(());
        }
    };

    if links.is_empty() {
        info!(path = %settings.links_file.display(), "No links found in input file");
        return Ok(());
    }

    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!(
            "Failed to create output directory '{}'",
            settings.output_dir.display()
        )
    })?;

    let reporter: Arc<dyn ProgressReporter> =
        if !args.no_progress && !args.quiet && io::stderr().is_terminal() {
            Arc::new(ProgressBars::new())
        } else {
            Arc::new(TracingReporter)
        };

    let processor = PageProcessor::new(
        HttpClient::with_config(settings.client),
        Arc::new(WindowOpenExtractor::new()),
        reporter,
        settings.output_dir.clone(),
    );
    let dispatcher = Dispatcher::new(Arc::new(processor), settings.concurrency)?;

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    info!(
        links = links.len(),
        concurrency = settings.concurrency,
        output_dir = %settings.output_dir.display(),
        "Starting downloads"
    );
    let outcomes = dispatcher.run_until_cancelled(links, cancel).await;

    let summary = DispatchSummary::from_outcomes(&outcomes);
    info!(
        processed = summary.total(),
        downloaded = summary.succeeded,
        no_link = summary.no_link,
        failed = summary.failed(),
        bytes = summary.bytes_written,
        "Done"
    );

    // Partial success is normal operation; per-link failures were already reported.
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_env_filter(filter)
        .try_init();
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing in-flight downloads");
            cancel.cancel();
        }
    });
}

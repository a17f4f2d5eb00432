//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download the files that web pages link to through `window.open(...)`.
///
/// Reads one page URL per line from LINKS_FILE, fetches each page, finds its
/// embedded download link, and saves the file into the output directory.
#[derive(Parser, Debug)]
#[command(name = "pagegrab")]
#[command(author, version, about)]
pub struct Args {
    /// File with one page URL per line (blank lines are skipped)
    #[arg(default_value = "links.txt")]
    pub links_file: PathBuf,

    /// Directory to save downloaded files into [default: ./downloads]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of pages processed concurrently (1-100) [default: 5]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// HTTP connect timeout in seconds (1-3600) [default: 30]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// HTTP read timeout in seconds (1-3600) [default: 300]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Total deadline for fetching each page, in seconds (1-3600) [default: 60]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub page_timeout: Option<u64>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

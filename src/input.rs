//! Loading the list of source page links.
//!
//! One link per line; surrounding whitespace is trimmed and blank lines are
//! skipped. Order is preserved.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors loading the link list.
#[derive(Debug, Error)]
pub enum InputError {
    /// The links file does not exist.
    #[error("{} file not found.", path.display())]
    Missing {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The links file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Reads links from a text file.
///
/// # Errors
///
/// [`InputError::Missing`] when the file does not exist, [`InputError::Read`]
/// for any other read failure.
pub fn load_links(path: &Path) -> Result<Vec<String>, InputError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            InputError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            InputError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let links = parse_links(&raw);
    debug!(path = %path.display(), links = links.len(), "loaded links");
    Ok(links)
}

/// Splits text into trimmed, non-empty lines.
#[must_use]
pub fn parse_links(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

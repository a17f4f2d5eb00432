//! Streaming file writer with fixed-size chunking and progress callbacks.
//!
//! The body is consumed as it arrives and written out in [`CHUNK_SIZE`]
//! pieces; at most one incoming chunk plus one outgoing piece is held in
//! memory regardless of file size.
//!
//! Bytes land in a temporary `.part` file next to the destination, unique to
//! this call, which is renamed over the destination only after the body has
//! been fully written. A failed transfer therefore never touches a file some
//! other transfer produced at the same path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::constants::CHUNK_SIZE;
use super::error::DownloadError;

/// Suffix of in-progress files.
const PART_SUFFIX: &str = ".part";

static NEXT_PART_ID: AtomicU64 = AtomicU64::new(0);

/// Unique sibling temp path: `name.<pid>-<n>.part`.
fn part_path(destination: &Path) -> PathBuf {
    let id = NEXT_PART_ID.fetch_add(1, Ordering::Relaxed);
    let mut name = destination
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(format!(".{}-{id}{PART_SUFFIX}", std::process::id()));
    destination.with_file_name(name)
}

/// Streams `body` into a file at `destination`, returning bytes written.
///
/// `on_progress` is called once per written chunk with that chunk's length.
/// An existing file at `destination` is replaced only on success. If the
/// stream or a write fails, the partial temp file is removed and the error
/// returned; `destination` is left as it was.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] when the file cannot be created or written,
/// or whatever error the body stream yields (normally [`DownloadError::Network`]).
pub async fn write_stream<S, B, F>(
    body: S,
    destination: &Path,
    mut on_progress: F,
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, DownloadError>>,
    B: AsRef<[u8]>,
    F: FnMut(u64),
{
    let part = part_path(destination);
    let file = File::create(&part)
        .await
        .map_err(|e| DownloadError::io(destination, e))?;

    let result = match stream_chunks(file, body, destination, &mut on_progress).await {
        Ok(written) => tokio::fs::rename(&part, destination)
            .await
            .map(|()| written)
            .map_err(|e| DownloadError::io(destination, e)),
        Err(e) => Err(e),
    };

    if result.is_err() {
        debug!(path = %part.display(), "cleaning up partial file after error");
        let _ = tokio::fs::remove_file(&part).await;
    }

    result
}

/// Consumes the file handle so it is closed on every return path.
async fn stream_chunks<S, B, F>(
    file: File,
    body: S,
    destination: &Path,
    on_progress: &mut F,
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, DownloadError>>,
    B: AsRef<[u8]>,
    F: FnMut(u64),
{
    let mut writer = BufWriter::new(file);
    let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE);
    let mut bytes_written: u64 = 0;
    let mut body = std::pin::pin!(body);

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        let mut data = chunk.as_ref();

        while !data.is_empty() {
            let take = (CHUNK_SIZE - pending.len()).min(data.len());
            pending.extend_from_slice(&data[..take]);
            data = &data[take..];

            if pending.len() == CHUNK_SIZE {
                bytes_written +=
                    write_chunk(&mut writer, &pending, destination, on_progress).await?;
                pending.clear();
            }
        }
    }

    if !pending.is_empty() {
        bytes_written += write_chunk(&mut writer, &pending, destination, on_progress).await?;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(destination, e))?;

    Ok(bytes_written)
}

async fn write_chunk<F>(
    writer: &mut BufWriter<File>,
    chunk: &[u8],
    destination: &Path,
    on_progress: &mut F,
) -> Result<u64, DownloadError>
where
    F: FnMut(u64),
{
    writer
        .write_all(chunk)
        .await
        .map_err(|e| DownloadError::io(destination, e))?;
    let len = chunk.len() as u64;
    on_progress(len);
    Ok(len)
}

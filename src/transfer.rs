use std::{
    fs::{self, File},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use crate::http::{Client, RequestError};
use crate::EventHandler;

/// Default size of the copy buffer for file transfers.
pub(crate) const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// A progress event is emitted roughly every this many bytes.
const PROGRESS_INTERVAL: u64 = 100 * 1024 * 1024;

#[derive(thiserror::Error, Debug)]
pub enum TransferError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("I/O error in {1}: {0}")]
    Io(io::Error, PathBuf),
}

/// Download `url` to `destination`.
///
/// Parent directories of the destination are created if needed. The
/// body is written incrementally in `chunk_size` blocks. On any failure
/// the partially-written file is removed before the error is returned,
/// so a failed transfer never leaves a truncated file behind.
pub(crate) fn download<E: EventHandler>(
    client: &mut Client<E>,
    url: &str,
    destination: &Path,
    chunk_size: usize,
) -> Result<PathBuf, TransferError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| TransferError::Io(e, parent.to_owned()))?;
    }

    let response = client.get_stream(url)?;

    let total = response
        .header("Content-Length")
        .and_then(|l| l.parse::<u64>().ok());

    let events = client.events();
    events.download_start(url, total);

    // Removes the file unless the transfer completes, covering both
    // error returns and panics while the body is being written.
    let mut partial = PartialFile::new(destination);

    let file =
        File::create(destination).map_err(|e| TransferError::Io(e, destination.to_owned()))?;

    write_body(response.into_reader(), file, chunk_size, total, events)
        .map_err(|e| TransferError::Io(e, destination.to_owned()))?;

    partial.keep();

    Ok(destination.to_owned())
}

fn write_body(
    mut body: impl Read,
    mut file: File,
    chunk_size: usize,
    total: Option<u64>,
    events: &impl EventHandler,
) -> io::Result<()> {
    let mut chunk = vec![0u8; chunk_size];
    let mut written = 0u64;
    let mut next_progress = PROGRESS_INTERVAL;

    loop {
        let n = body.read(&mut chunk)?;

        if n == 0 {
            file.flush()?;
            events.download_progress(written, total);
            return Ok(());
        }

        file.write_all(&chunk[..n])?;
        written += n as u64;

        if written >= next_progress {
            events.download_progress(written, total);
            next_progress += PROGRESS_INTERVAL;
        }
    }
}

/// Remove `path` on drop, unless [`keep`][Self::keep] was called.
struct PartialFile<'a> {
    path: &'a Path,
    keep: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        PartialFile { path, keep: false }
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.keep && self.path.exists() {
            let _ = fs::remove_file(self.path);
        }
    }
}

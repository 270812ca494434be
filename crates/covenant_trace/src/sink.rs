//! The per-worker recycling file sink.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::event::TraceEvent;

/// Sentinel returned by [`RecyclingFileSink::snapshot_to`] when the copy
/// could not be made.
pub const SNAPSHOT_FAILED: &str = "SNAPSHOT_FAILED";

const BUFFER_SIZE: usize = 4096;

/// Buffered NDJSON journal under `<root>/logs/workers/worker-<id>.ndjson`.
///
/// The sink is single-threaded per worker. All IO is single-attempt: a write
/// failure is swallowed so test execution stays alive. If the journal cannot
/// be opened at all the sink goes into a zombie state and every operation
/// silently no-ops.
///
/// Critical events (everything except `Design`) bypass the buffer so they
/// reach disk before the next instruction of the target runs.
#[derive(Debug)]
pub struct RecyclingFileSink {
    root: PathBuf,
    path: PathBuf,
    file: Option<File>,
    buffer: Vec<u8>,
    /// Whether the drop-time flush hook is still armed. `close` disarms it.
    hooked: bool,
}

impl RecyclingFileSink {
    pub fn open(root: &Path, worker_id: usize) -> Self {
        let path = root
            .join("logs")
            .join("workers")
            .join(format!("worker-{worker_id}.ndjson"));
        let file = path
            .parent()
            .map(std::fs::create_dir_all)
            .transpose()
            .and_then(|_| OpenOptions::new().append(true).create(true).open(&path))
            .map_err(|error| {
                debug!(?path, %error, "journal unavailable, sink disabled");
            })
            .ok();
        Self {
            root: root.to_owned(),
            path,
            file,
            buffer: Vec::with_capacity(BUFFER_SIZE),
            hooked: true,
        }
    }

    /// Path of the journal file, whether or not it could be opened.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_zombie(&self) -> bool {
        self.file.is_none()
    }

    pub fn emit(&mut self, event: &TraceEvent) {
        if self.file.is_none() {
            return;
        }
        let payload = event.to_ndjson_line().into_bytes();
        if event.is_critical() || payload.len() > BUFFER_SIZE {
            self.force_flush();
            self.write_direct(&payload);
        } else if self.buffer.len() + payload.len() > BUFFER_SIZE {
            self.force_flush();
            self.buffer.extend_from_slice(&payload);
        } else {
            self.buffer.extend_from_slice(&payload);
        }
    }

    /// Empties the buffer to disk. One attempt, errors swallowed.
    pub fn force_flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.buffer);
        self.write_direct(&pending);
    }

    /// Truncates the journal to zero length for the next test.
    pub fn reset(&mut self) {
        self.buffer.clear();
        if let Some(file) = &self.file {
            if let Err(error) = file.set_len(0) {
                debug!(%error, "journal reset failed");
            }
        }
    }

    /// Flushes and copies the current journal content to `<root>/<target>`.
    /// Returns the absolute snapshot path, or [`SNAPSHOT_FAILED`].
    pub fn snapshot_to(&mut self, target: &str) -> String {
        self.force_flush();
        let destination = self.root.join(target);
        let copied = destination
            .parent()
            .map(std::fs::create_dir_all)
            .transpose()
            .and_then(|_| std::fs::copy(&self.path, &destination));
        match copied {
            Ok(_) => destination
                .canonicalize()
                .unwrap_or(destination)
                .display()
                .to_string(),
            Err(error) => {
                debug!(?destination, %error, "snapshot failed");
                SNAPSHOT_FAILED.to_owned()
            }
        }
    }

    /// Disarms the drop hook and closes the handle.
    pub fn close(&mut self) {
        self.force_flush();
        self.hooked = false;
        self.file = None;
    }

    fn write_direct(&mut self, payload: &[u8]) {
        if let Some(file) = &mut self.file {
            if let Err(error) = file.write_all(payload) {
                debug!(%error, "journal write failed");
            }
        }
    }
}

impl Drop for RecyclingFileSink {
    fn drop(&mut self) {
        if self.hooked {
            self.force_flush();
        }
    }
}

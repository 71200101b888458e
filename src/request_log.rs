//! Append-only sink for raw request bodies.
//!
//! Every request body is written as one record, byte for byte, followed by
//! a newline. Writes run on tokio's blocking pool so a slow disk never
//! stalls connection tasks, and a mutex keeps records from interleaving.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Shared request body log.
pub struct RequestLog {
    sink: Sink,
}

impl RequestLog {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), "Request log opened");
        Ok(Self::from_writer(file))
    }

    /// Wrap an arbitrary writer.
    pub fn from_writer<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Append one request body and wait until it is flushed.
    ///
    /// Write failures are reported through `tracing` and otherwise ignored.
    pub async fn record(&self, body: &[u8]) {
        let mut line = Vec::with_capacity(body.len() + 1);
        line.extend_from_slice(body);
        line.push(b'\n');

        let sink = Arc::clone(&self.sink);
        let written = tokio::task::spawn_blocking(move || {
            let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            sink.write_all(&line).and_then(|()| sink.flush())
        })
        .await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, bytes = body.len(), "Failed to write request log"),
            Err(e) => warn!(error = %e, bytes = body.len(), "Request log writer task failed"),
        }
    }
}

impl std::fmt::Debug for RequestLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLog").finish_non_exhaustive()
    }
}

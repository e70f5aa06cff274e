//! Byte-granular load progress shared between a loader thread and the UI.

use std::{
    fs::File,
    io::{self, Read},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result};
use parking_lot::Mutex;

/// Chunk size for progress-reporting reads.
const READ_CHUNK: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    /// `None` until the job has sized its files.
    pub total: Option<u64>,
}

impl LoadProgress {
    pub fn is_started(&self) -> bool {
        self.total.is_some()
    }

    /// Rounded percentage in [0, 100]. A job that has not started is at 0;
    /// an empty job counts as complete.
    pub fn percent(&self) -> u8 {
        match self.total {
            None => 0,
            Some(0) => 100,
            Some(total) => {
                let pct = (self.loaded as f64 / total as f64 * 100.0).round();
                pct.clamp(0.0, 100.0) as u8
            }
        }
    }
}

/// Cloneable handle to one job's progress counters.
#[derive(Clone, Debug, Default)]
pub struct SharedProgress(Arc<Mutex<LoadProgress>>);

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LoadProgress {
        *self.0.lock()
    }

    pub fn begin(&self, total: u64) {
        *self.0.lock() = LoadProgress {
            loaded: 0,
            total: Some(total),
        };
    }

    pub fn advance(&self, bytes: u64) {
        let mut p = self.0.lock();
        p.loaded += bytes;
        // Files may grow between stat and read.
        if p.total.is_none_or(|total| p.loaded > total) {
            p.total = Some(p.loaded);
        }
    }
}

/// [`Read`] adapter that reports every byte it yields.
pub struct ProgressReader<R> {
    inner: R,
    progress: SharedProgress,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, progress: SharedProgress) -> Self {
        Self { inner, progress }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.progress.advance(n as u64);
        Ok(n)
    }
}

/// Read a whole file in chunks, advancing `progress` as bytes arrive.
pub fn read_with_progress(path: &Path, progress: &SharedProgress) -> Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = ProgressReader::new(file, progress.clone());
    let mut out = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader
            .read(&mut chunk)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out)
}

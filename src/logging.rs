use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ── SyncLogWriter ────────────────────────────────────────

/// A `MakeWriter` that drops everything until a sync log file is attached
/// through its [`SyncLogHandle`].
///
/// The subscriber is installed before the config (and so the log location)
/// is known; commands that never sync keep discarding.
#[derive(Clone)]
pub struct SyncLogWriter {
    file: Arc<Mutex<Option<File>>>,
}

/// Attaches the sync log file to a [`SyncLogWriter`].
#[derive(Clone)]
pub struct SyncLogHandle {
    file: Arc<Mutex<Option<File>>>,
}

fn lock(file: &Mutex<Option<File>>) -> MutexGuard<'_, Option<File>> {
    file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SyncLogWriter {
    pub fn new() -> (Self, SyncLogHandle) {
        let file = Arc::new(Mutex::new(None));
        (Self { file: file.clone() }, SyncLogHandle { file })
    }
}

impl SyncLogHandle {
    /// Open `path` in append mode and start writing to it.
    pub fn attach(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        *lock(&self.file) = Some(file);
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.file).is_some()
    }
}

/// Per-event writer handed out by [`SyncLogWriter`].
pub struct SyncLogEvent {
    file: Arc<Mutex<Option<File>>>,
}

impl Write for SyncLogEvent {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match lock(&self.file).as_mut() {
            Some(f) => f.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match lock(&self.file).as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SyncLogWriter {
    type Writer = SyncLogEvent;

    fn make_writer(&'a self) -> Self::Writer {
        SyncLogEvent {
            file: self.file.clone(),
        }
    }
}

// ── subscriber ───────────────────────────────────────────

/// Install the global subscriber: stderr output (debug with `--verbose`,
/// otherwise `RUST_LOG` on top of `pvenotes=info`) plus the sync log, which
/// always records `pvenotes=debug` once attached.
pub fn init(verbose: bool) -> SyncLogHandle {
    let terminal_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("pvenotes=info".parse().expect("valid log directive"))
    };

    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(terminal_filter);

    let (writer, handle) = SyncLogWriter::new();
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(EnvFilter::new("pvenotes=debug"));

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .init();

    handle
}

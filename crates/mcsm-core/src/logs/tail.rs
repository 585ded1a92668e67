//! Live tailing of a growing log file.
//!
//! One background task per watched file reads appended bytes whenever the
//! file watcher fires (or the poll interval elapses), reassembles complete
//! lines, and groups them into records. A record is only delivered once the
//! next record's header shows up, because continuation lines may still be
//! on their way.

use super::entry::{parse_record, LogEntry};
use crate::config::LogConfig;
use crate::{McsmError, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

struct WatchTask {
    stop_tx: oneshot::Sender<bool>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TailState {
    next_id: u64,
    subscribers: Vec<(u64, mpsc::UnboundedSender<LogEntry>)>,
    task: Option<WatchTask>,
}

impl TailState {
    fn broadcast(&mut self, entry: LogEntry) {
        self.subscribers
            .retain(|(_, tx)| tx.send(entry.clone()).is_ok());
    }
}

/// The reference-counted watch shared by every tail of one file.
pub(crate) struct TailShared {
    path: PathBuf,
    state: Mutex<TailState>,
}

impl TailShared {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(TailState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TailState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn is_watching(&self) -> bool {
        self.lock().task.is_some()
    }

    /// Register a subscriber, starting the watch if it is the first.
    pub(crate) async fn subscribe(shared: &Arc<Self>) -> Result<LogTail> {
        // Measure before registering so nothing appended after this call is missed.
        let start_offset = match fs::metadata(&shared.path).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(McsmError::io_with_path(e, &shared.path)),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = shared.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push((id, tx));

        if state.task.is_none() {
            let (stop_tx, stop_rx) = oneshot::channel();
            let handle = tokio::spawn(watch_file(Arc::clone(shared), start_offset, stop_rx));
            state.task = Some(WatchTask { stop_tx, handle });
            info!("Started tailing {}", shared.path.display());
        }
        debug!(
            "Tail subscriber {} added to {} ({} active)",
            id,
            shared.path.display(),
            state.subscribers.len()
        );

        Ok(LogTail {
            id,
            receiver: rx,
            shared: Arc::clone(shared),
            active: true,
        })
    }

    /// Drop a subscriber; returns the watch task if it was the last one.
    fn remove(&self, id: u64) -> Option<WatchTask> {
        let mut state = self.lock();
        state.subscribers.retain(|(sub_id, _)| *sub_id != id);
        if state.subscribers.is_empty() {
            let task = state.task.take();
            if task.is_some() {
                info!("Stopped tailing {}", self.path.display());
            }
            task
        } else {
            None
        }
    }

    /// If `id` is the only subscriber, detach the watch task so it can be
    /// stopped while the subscriber is still registered.
    fn take_task_if_last(&self, id: u64) -> Option<WatchTask> {
        let mut state = self.lock();
        match state.subscribers.as_slice() {
            [(only, _)] if *only == id => state.task.take(),
            _ => None,
        }
    }
}

/// A live subscription to records appended to a log file.
///
/// Dropping the tail unsubscribes it; the pending record is discarded.
/// [`LogTail::unwatch`] unsubscribes and, for the last subscriber, also
/// delivers the pending record.
pub struct LogTail {
    id: u64,
    receiver: mpsc::UnboundedReceiver<LogEntry>,
    shared: Arc<TailShared>,
    active: bool,
}

impl LogTail {
    /// Wait for the next completed record.
    ///
    /// Returns `None` once the watch has stopped and everything was received.
    pub async fn next(&mut self) -> Option<LogEntry> {
        self.receiver.recv().await
    }

    /// A completed record if one is already waiting.
    pub fn try_next(&mut self) -> Option<LogEntry> {
        self.receiver.try_recv().ok()
    }

    /// Unsubscribe and return every record not yet received.
    pub async fn unwatch(mut self) -> Vec<LogEntry> {
        self.active = false;

        if let Some(task) = self.shared.take_task_if_last(self.id) {
            let _ = task.stop_tx.send(true);
            if let Err(e) = task.handle.await {
                warn!("Tail task for {} ended abnormally: {}", self.shared.path.display(), e);
            }
            info!("Stopped tailing {}", self.shared.path.display());
        }
        // Any task detached above has already been stopped.
        if let Some(task) = self.shared.remove(self.id) {
            let _ = task.stop_tx.send(false);
        }

        let mut remaining = Vec::new();
        while let Ok(entry) = self.receiver.try_recv() {
            remaining.push(entry);
        }
        remaining
    }
}

impl Drop for LogTail {
    fn drop(&mut self) {
        if self.active {
            if let Some(task) = self.shared.remove(self.id) {
                let _ = task.stop_tx.send(false);
            }
        }
    }
}

/// Incremental reader that yields complete lines appended since last time.
struct LineReader {
    path: PathBuf,
    offset: u64,
    partial: Vec<u8>,
}

impl LineReader {
    fn new(path: PathBuf, offset: u64) -> Self {
        Self {
            path,
            offset,
            partial: Vec::new(),
        }
    }

    async fn read_lines(&mut self) -> std::io::Result<Vec<String>> {
        let len = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        if len < self.offset {
            debug!("{} was truncated; reading from the start", self.path.display());
            self.offset = 0;
            self.partial.clear();
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut appended = Vec::new();
        file.take(len - self.offset).read_to_end(&mut appended).await?;
        self.offset += appended.len() as u64;
        self.partial.extend_from_slice(&appended);

        let mut lines = Vec::new();
        while let Some(newline) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=newline).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        Ok(lines)
    }
}

/// Group lines into records, delivering each record once it is superseded.
fn accept_lines(shared: &TailShared, pending: &mut Option<String>, lines: Vec<String>) {
    let mut completed = Vec::new();
    for line in lines.into_iter().filter(|line| !line.is_empty()) {
        if line.starts_with('[') {
            if let Some(done) = pending.replace(line) {
                completed.push(parse_record(&done));
            }
        } else {
            match pending {
                Some(record) => {
                    record.push('\n');
                    record.push_str(&line);
                }
                None => *pending = Some(line),
            }
        }
    }

    if !completed.is_empty() {
        let mut state = shared.lock();
        for entry in completed {
            state.broadcast(entry);
        }
    }
}

fn start_watcher(path: &Path) -> Option<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        if result.is_ok() {
            let _ = event_tx.send(());
        }
    });

    let mut watcher = match watcher {
        Ok(watcher) => watcher,
        Err(e) => {
            warn!("Failed to create file watcher, polling instead: {}", e);
            return None;
        }
    };

    // Watch the directory so rotation (remove + recreate) keeps firing.
    let target = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(path);
    if let Err(e) = watcher.watch(target, RecursiveMode::NonRecursive) {
        warn!("Failed to watch {:?}, polling instead: {}", target, e);
        return None;
    }
    Some((watcher, event_rx))
}

async fn next_event(events: &mut Option<mpsc::UnboundedReceiver<()>>) -> Option<()> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn watch_file(
    shared: Arc<TailShared>,
    start_offset: u64,
    mut stop_rx: oneshot::Receiver<bool>,
) {
    let path = shared.path.clone();
    let (watcher, events) = match start_watcher(&path) {
        Some((watcher, events)) => (Some(watcher), Some(events)),
        None => (None, None),
    };
    // Keeps the OS watch alive for the lifetime of this task.
    let _watcher = watcher;
    let mut events = events;

    let mut reader = LineReader::new(path.clone(), start_offset);
    let mut pending: Option<String> = None;
    let mut poll = tokio::time::interval(LogConfig::TAIL_POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let flush = loop {
        tokio::select! {
            stop = &mut stop_rx => break stop.unwrap_or(false),
            event = next_event(&mut events) => {
                if event.is_none() {
                    debug!("File watcher for {} closed; polling only", path.display());
                    events = None;
                }
            }
            _ = poll.tick() => {}
        }

        match reader.read_lines().await {
            Ok(lines) => accept_lines(&shared, &mut pending, lines),
            Err(e) => warn!("Failed to read {}: {}", path.display(), e),
        }
    };

    if flush {
        match reader.read_lines().await {
            Ok(lines) => accept_lines(&shared, &mut pending, lines),
            Err(e) => warn!("Failed to read {}: {}", path.display(), e),
        }
        if let Some(record) = pending.take() {
            shared.lock().broadcast(parse_record(&record));
        }
    }
    debug!("Tail task for {} finished", path.display());
}

//! Streaming a remote resource into a local file with progress reporting.
//!
//! Progress is time-based: an event at the start, at most one per
//! [`NetworkConfig::TRANSFER_PROGRESS_INTERVAL`] while bytes flow, and one at
//! the end. A failure part-way through leaves the partial file in place.

use super::client::extract_domain;
use super::remote::{RemoteResource, RemoteStream};
use crate::config::NetworkConfig;
use crate::document::Document;
use crate::{McsmError, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Progress information for a transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// Bytes written so far.
    pub transferred: u64,
    /// Expected total bytes.
    pub total: u64,
    /// Percentage complete (0-100).
    pub percentage: f64,
    /// Smoothed speed in bytes per second.
    pub speed_bytes_per_sec: f64,
    /// Estimated time remaining in seconds.
    pub eta_seconds: Option<f64>,
}

impl TransferProgress {
    pub fn new(transferred: u64, total: u64, speed: f64) -> Self {
        let percentage = if total > 0 {
            (transferred as f64 / total as f64 * 100.0).min(100.0)
        } else {
            100.0
        };

        let eta_seconds = if speed > 0.0 && transferred < total {
            Some((total - transferred) as f64 / speed)
        } else {
            None
        };

        Self {
            transferred,
            total,
            percentage,
            speed_bytes_per_sec: speed,
            eta_seconds,
        }
    }
}

/// Overrides for what the server suggests.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    pub filename: Option<String>,
    pub encoding: Option<String>,
    pub expected_length: Option<u64>,
}

impl TransferOptions {
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_expected_length(mut self, length: u64) -> Self {
        self.expected_length = Some(length);
        self
    }
}

/// Result of a completed transfer.
#[derive(Debug)]
pub struct Transferred {
    /// Document bound to the written file; nothing is cached yet.
    pub document: Document<Vec<u8>>,
    pub file_name: String,
    pub bytes: u64,
    /// The explicit encoding, else the server's charset.
    pub encoding: Option<String>,
}

impl Transferred {
    pub fn path(&self) -> &Path {
        self.document.path()
    }
}

/// Exponentially smoothed transfer speed.
struct SpeedTracker {
    last_sample: Instant,
    bytes_since_sample: u64,
    smoothed: Option<f64>,
}

impl SpeedTracker {
    fn new() -> Self {
        Self {
            last_sample: Instant::now(),
            bytes_since_sample: 0,
            smoothed: None,
        }
    }

    fn record(&mut self, bytes: u64) {
        self.bytes_since_sample += bytes;
    }

    /// Fold the bytes seen since the previous sample into the average.
    fn sample(&mut self) -> f64 {
        let elapsed = self.last_sample.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let instantaneous = self.bytes_since_sample as f64 / elapsed;
            let alpha = NetworkConfig::SPEED_SMOOTHING;
            self.smoothed = Some(match self.smoothed {
                Some(previous) => alpha * instantaneous + (1.0 - alpha) * previous,
                None => instantaneous,
            });
            self.last_sample = Instant::now();
            self.bytes_since_sample = 0;
        }
        self.smoothed.unwrap_or(0.0)
    }
}

/// Pick the local file name: explicit first, then the server's suggestion.
fn resolve_filename(options: &TransferOptions, stream: &RemoteStream) -> Option<String> {
    options
        .filename
        .clone()
        .filter(|name| !name.trim().is_empty())
        .or_else(|| stream.metadata.suggested_filename.clone())
}

/// Copy `remote`'s body into `dest_dir`.
///
/// Fails with [`McsmError::AmbiguousFilename`] before creating anything when
/// no file name can be resolved, and with [`McsmError::ProgressUnavailable`]
/// when `progress_tx` is given but the total length is unknown.
pub async fn transfer<T>(
    remote: &RemoteResource<T>,
    dest_dir: &Path,
    options: TransferOptions,
    progress_tx: Option<UnboundedSender<TransferProgress>>,
) -> Result<Transferred>
where
    T: Clone + Send + Sync + 'static,
{
    transfer_with_interval(
        remote,
        dest_dir,
        options,
        progress_tx,
        NetworkConfig::TRANSFER_PROGRESS_INTERVAL,
    )
    .await
}

pub(crate) async fn transfer_with_interval<T>(
    remote: &RemoteResource<T>,
    dest_dir: &Path,
    options: TransferOptions,
    progress_tx: Option<UnboundedSender<TransferProgress>>,
    progress_interval: Duration,
) -> Result<Transferred>
where
    T: Clone + Send + Sync + 'static,
{
    let url = remote.url().to_string();
    let stream = remote.open().await?;

    let file_name = resolve_filename(&options, &stream)
        .ok_or_else(|| McsmError::AmbiguousFilename { url: url.clone() })?;

    let total = options.expected_length.or(stream.metadata.expected_length);
    let progress = match (progress_tx, total) {
        (Some(tx), Some(total)) => Some((tx, total)),
        (Some(_), None) => return Err(McsmError::ProgressUnavailable { url }),
        (None, _) => None,
    };
    let encoding = options
        .encoding
        .clone()
        .or_else(|| stream.metadata.suggested_encoding.clone());

    let destination = dest_dir.join(&file_name);
    let transfer_error = |message: String| McsmError::Transfer {
        url: url.clone(),
        path: destination.clone(),
        message,
    };

    fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| McsmError::io_with_path(e, dest_dir))?;
    let mut file = File::create(&destination)
        .await
        .map_err(|e| transfer_error(format!("Failed to create file: {}", e)))?;

    info!("Transferring {} to {}", url, destination.display());

    let mut transferred: u64 = 0;
    let mut last_progress_update = Instant::now();
    let mut speed_tracker = SpeedTracker::new();
    let mut body = stream.response.bytes_stream();

    if let Some((tx, total)) = &progress {
        let _ = tx.send(TransferProgress::new(0, *total, 0.0));
    }

    while let Some(chunk_result) = body.next().await {
        let chunk =
            chunk_result.map_err(|e| transfer_error(format!("Error reading stream: {}", e)))?;

        file.write_all(&chunk)
            .await
            .map_err(|e| transfer_error(format!("Failed to write: {}", e)))?;

        transferred += chunk.len() as u64;
        speed_tracker.record(chunk.len() as u64);

        if last_progress_update.elapsed() >= progress_interval {
            if let Some((tx, total)) = &progress {
                let speed = speed_tracker.sample();
                let _ = tx.send(TransferProgress::new(transferred, *total, speed));
            }
            last_progress_update = Instant::now();
        }
    }

    file.flush()
        .await
        .map_err(|e| transfer_error(format!("Failed to flush: {}", e)))?;
    file.sync_all()
        .await
        .map_err(|e| transfer_error(format!("Failed to sync: {}", e)))?;

    if let Some((tx, total)) = &progress {
        let speed = speed_tracker.sample();
        let _ = tx.send(TransferProgress::new(transferred, *total, speed));
    }

    debug!("Transferred {} bytes from {}", transferred, extract_domain(&url));

    Ok(Transferred {
        document: Document::raw(PathBuf::from(&destination)),
        file_name,
        bytes: transferred,
        encoding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::HttpClient;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_transfer_progress() {
        let progress = TransferProgress::new(50, 100, 10.0);
        assert_eq!(progress.percentage, 50.0);
        assert_eq!(progress.eta_seconds, Some(5.0)); // 50 remaining / 10 speed

        let done = TransferProgress::new(100, 100, 10.0);
        assert_eq!(done.percentage, 100.0);
        assert_eq!(done.eta_seconds, None);
    }

    #[test]
    fn test_transfer_progress_zero_speed_has_no_eta() {
        let progress = TransferProgress::new(0, 100, 0.0);
        assert_eq!(progress.percentage, 0.0);
        assert_eq!(progress.eta_seconds, None);
    }

    async fn serve(body: &'static [u8], disposition: Option<&str>) -> MockServer {
        let server = MockServer::start().await;
        let mut response = ResponseTemplate::new(200).set_body_bytes(body);
        if let Some(value) = disposition {
            response = response.insert_header("content-disposition", value);
        }
        Mock::given(method("GET"))
            .and(path("/artifact"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    fn remote(server: &MockServer) -> RemoteResource<Vec<u8>> {
        RemoteResource::raw(
            HttpClient::new().unwrap(),
            format!("{}/artifact", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_ambiguous_filename_creates_no_file() {
        let server = serve(b"data", None).await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("downloads");

        let err = transfer(&remote(&server), &dest, TransferOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, McsmError::AmbiguousFilename { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_suggested_filename_is_used() {
        let server = serve(b"jar bytes", Some("attachment; filename=\"server.jar\"")).await;
        let temp_dir = TempDir::new().unwrap();

        let done = transfer(&remote(&server), temp_dir.path(), TransferOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(done.file_name, "server.jar");
        assert_eq!(done.bytes, 9);
        assert_eq!(done.document.read().await.unwrap(), b"jar bytes");
    }

    #[tokio::test]
    async fn test_explicit_filename_wins() {
        let server = serve(b"jar bytes", Some("attachment; filename=\"server.jar\"")).await;
        let temp_dir = TempDir::new().unwrap();

        let options = TransferOptions::default().with_filename("minecraft_server.1.13.1.jar");
        let done = transfer(&remote(&server), temp_dir.path(), options, None)
            .await
            .unwrap();
        assert_eq!(done.file_name, "minecraft_server.1.13.1.jar");
        assert!(temp_dir.path().join("minecraft_server.1.13.1.jar").exists());
        assert!(!temp_dir.path().join("server.jar").exists());
    }

    #[tokio::test]
    async fn test_progress_events_end_at_total() {
        let body: &'static [u8] = &[7u8; 4096];
        let server = serve(body, None).await;
        let temp_dir = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let options = TransferOptions::default().with_filename("blob.bin");
        let done = transfer_with_interval(
            &remote(&server),
            temp_dir.path(),
            options,
            Some(tx),
            Duration::ZERO,
        )
        .await
        .unwrap();
        assert_eq!(done.bytes, 4096);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events.len() >= 2);
        assert_eq!(events[0].transferred, 0);
        let last = events.last().unwrap();
        assert_eq!(last.transferred, 4096);
        assert_eq!(last.total, 4096);
        assert_eq!(last.percentage, 100.0);
        assert!(events.windows(2).all(|w| w[0].transferred <= w[1].transferred));
    }

    #[tokio::test]
    async fn test_remote_error_status_creates_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let temp_dir = TempDir::new().unwrap();

        let options = TransferOptions::default().with_filename("x.jar");
        let err = transfer(&remote(&server), temp_dir.path(), options, None)
            .await
            .unwrap_err();
        assert!(matches!(err, McsmError::RemoteFetch { status: 404, .. }));
        assert!(!temp_dir.path().join("x.jar").exists());
    }

    /// Serve one chunked response (no Content-Length), pausing between chunks.
    async fn serve_chunked(chunks: usize, chunk_size: usize, pause: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for _ in 0..chunks {
                let mut chunk = format!("{:x}\r\n", chunk_size).into_bytes();
                chunk.extend(std::iter::repeat(b'z').take(chunk_size));
                chunk.extend_from_slice(b"\r\n");
                if socket.write_all(&chunk).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
                tokio::time::sleep(pause).await;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.flush().await;
        });
        format!("http://{}/artifact", addr)
    }

    #[tokio::test]
    async fn test_progress_without_length_fails_before_creating_file() {
        let url = serve_chunked(2, 16, Duration::ZERO).await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("downloads");
        let remote = RemoteResource::raw(HttpClient::new().unwrap(), url);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let options = TransferOptions::default().with_filename("blob.bin");
        let err = transfer(&remote, &dest, options, Some(tx))
            .await
            .unwrap_err();
        assert!(matches!(err, McsmError::ProgressUnavailable { .. }));
        assert!(!dest.exists());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_progress_is_throttled_by_time() {
        let chunks = 40;
        let chunk_size = 512;
        let url = serve_chunked(chunks, chunk_size, Duration::from_millis(10)).await;
        let temp_dir = TempDir::new().unwrap();
        let remote = RemoteResource::raw(HttpClient::new().unwrap(), url);
        let total = (chunks * chunk_size) as u64;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let options = TransferOptions::default()
            .with_filename("blob.bin")
            .with_expected_length(total);
        let done = transfer(&remote, temp_dir.path(), options, Some(tx))
            .await
            .unwrap();
        assert_eq!(done.bytes, total);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        // Start, end, and roughly one per interval in between.
        assert!(events.len() >= 2);
        assert!(events.len() < chunks / 2, "{} events", events.len());
        assert_eq!(events[0].transferred, 0);
        assert_eq!(events.last().unwrap().transferred, total);
    }
}

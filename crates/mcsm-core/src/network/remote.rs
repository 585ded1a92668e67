//! Read-only documents fetched over HTTP.

use super::client::HttpClient;
use crate::document::{Codec, JsonCodec, RawCodec, TextCodec};
use crate::{McsmError, Result};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// What the server said about a resource, from its response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// From `Content-Disposition`, reduced to a bare file name.
    pub suggested_filename: Option<String>,
    /// The `charset` parameter of `Content-Type`.
    pub suggested_encoding: Option<String>,
    /// `Content-Length`.
    pub expected_length: Option<u64>,
}

impl RemoteMetadata {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

        Self {
            suggested_filename: header_str(CONTENT_DISPOSITION).and_then(parse_content_disposition),
            suggested_encoding: header_str(CONTENT_TYPE).and_then(parse_charset),
            expected_length: header_str(CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()),
        }
    }
}

static FILENAME_EXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*\s*=\s*(?:[\w!#$&+.^`|~-]+)?'[^']*'([^;\s]+)"#)
        .expect("filename* regex must compile")
});

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*(?:"((?:[^"\\]|\\.)*)"|([^;\s]+))"#)
        .expect("filename regex must compile")
});

static CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i);\s*charset\s*=\s*"?([^";\s]+)"?"#).expect("charset regex must compile")
});

/// Suggested file name from a `Content-Disposition` value.
///
/// The extended `filename*` form wins over plain `filename`. Directory
/// components are stripped so the result is always a bare name.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let extended = FILENAME_EXT_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| urlencoding::decode(m.as_str()).ok())
        .map(|decoded| decoded.into_owned());

    let name = extended.or_else(|| {
        let caps = FILENAME_RE.captures(value)?;
        caps.get(1)
            .map(|m| m.as_str().replace("\\\"", "\""))
            .or_else(|| caps.get(2).map(|m| m.as_str().to_string()))
    })?;

    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base.to_string())
    }
}

fn parse_charset(value: &str) -> Option<String> {
    CHARSET_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// A GET response whose body has not been consumed yet.
pub struct RemoteStream {
    pub response: Response,
    pub metadata: RemoteMetadata,
}

/// A read-only, fetch-backed document.
///
/// The body is fetched at most once; later reads are served from the cache
/// until [`RemoteResource::reload`] forces a new request. Metadata is
/// recorded from whichever request ran last.
pub struct RemoteResource<T> {
    url: String,
    headers: Vec<(String, String)>,
    client: HttpClient,
    codec: Arc<dyn Codec<T>>,
    cache: Mutex<Option<T>>,
    metadata: std::sync::Mutex<Option<RemoteMetadata>>,
}

impl RemoteResource<Vec<u8>> {
    pub fn raw(client: HttpClient, url: impl Into<String>) -> Self {
        Self::new(client, url, RawCodec)
    }
}

impl RemoteResource<String> {
    pub fn text(client: HttpClient, url: impl Into<String>) -> Self {
        Self::new(client, url, TextCodec)
    }
}

impl<T: DeserializeOwned + serde::Serialize + Clone + Send + Sync + 'static> RemoteResource<T> {
    /// A remote JSON document.
    pub fn json(client: HttpClient, url: impl Into<String>) -> Self {
        Self::new(client, url, JsonCodec::new())
    }
}

impl<T: Clone + Send + Sync + 'static> RemoteResource<T> {
    pub fn new(client: HttpClient, url: impl Into<String>, codec: impl Codec<T> + 'static) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            client,
            codec: Arc::new(codec),
            cache: Mutex::new(None),
            metadata: std::sync::Mutex::new(None),
        }
    }

    /// Add a request header sent with every fetch.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Metadata from the last request, if any has been made.
    pub fn metadata(&self) -> Option<RemoteMetadata> {
        self.metadata
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn record_metadata(&self, metadata: &RemoteMetadata) {
        let mut slot = self
            .metadata
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(metadata.clone());
    }

    /// Send the request and return the unread response.
    ///
    /// Used for streaming; does not touch the value cache.
    pub async fn open(&self) -> Result<RemoteStream> {
        let response = self.client.get_with_headers(&self.url, &self.headers).await?;
        let metadata = RemoteMetadata::from_headers(response.headers());
        self.record_metadata(&metadata);
        Ok(RemoteStream { response, metadata })
    }

    async fn fetch(&self) -> Result<T> {
        let RemoteStream { response, .. } = self.open().await?;
        let bytes = response.bytes().await.map_err(|e| McsmError::Network {
            message: format!("Failed to read body of {}: {}", self.url, e),
            source: Some(e),
        })?;
        info!("Fetched {} ({} bytes)", self.url, bytes.len());
        self.codec.parse(&bytes, Path::new(&self.url))
    }

    /// The parsed body, fetched on first use.
    pub async fn read(&self) -> Result<T> {
        let mut cache = self.cache.lock().await;
        if let Some(value) = cache.as_ref() {
            debug!("Serving {} from cache", self.url);
            return Ok(value.clone());
        }
        let value = self.fetch().await?;
        *cache = Some(value.clone());
        Ok(value)
    }

    /// Fetch again even if a value is cached.
    pub async fn reload(&self) -> Result<T> {
        let mut cache = self.cache.lock().await;
        let value = self.fetch().await?;
        *cache = Some(value.clone());
        Ok(value)
    }
}

impl<T> std::fmt::Debug for RemoteResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteResource")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

//! Cached, validated documents bound to one file path.
//!
//! A [`Document`] composes a [`Codec`] (parse/serialize) and a [`Validator`]
//! over raw file I/O with a lazy read-through cache. [`CollectionDocument`]
//! specializes it to record lists with uniqueness keys.
//!
//! Each `Document` owns its cache. Two instances pointed at the same path do
//! not see each other's writes, so share one instance (behind an `Arc`) per
//! logical file.

mod atomic;
mod codec;
mod collection;
mod validate;

pub use atomic::write_atomic;
pub use codec::{Codec, JsonCodec, RawCodec, TextCodec};
pub use collection::CollectionDocument;
pub use validate::{AcceptAll, AllOf, Presence, RequirePresent, UniqueKeys, Validator};

use crate::{McsmError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

type Fallback<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A typed, cached view of one file.
pub struct Document<T> {
    path: PathBuf,
    codec: Arc<dyn Codec<T>>,
    validator: Arc<dyn Validator<T>>,
    fallback: Option<Fallback<T>>,
    writable: bool,
    cache: Mutex<Option<T>>,
    /// Serializes writes so the file ends up holding the last cached value.
    write_lock: Mutex<()>,
}

impl Document<Vec<u8>> {
    /// Untyped byte document; rejects empty writes.
    pub fn raw(path: impl Into<PathBuf>) -> Self {
        Self::new(path, RawCodec)
    }
}

impl Document<String> {
    /// UTF-8 text document; rejects empty writes.
    pub fn text(path: impl Into<PathBuf>) -> Self {
        Self::new(path, TextCodec)
    }
}

impl<T> Document<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a document with the default validator, which rejects empty or
    /// falsy values.
    pub fn new(path: impl Into<PathBuf>, codec: impl Codec<T> + 'static) -> Self
    where
        T: Presence,
    {
        Self::validated(path, codec, RequirePresent)
    }

    /// Create a document with an explicit validator.
    pub fn validated(
        path: impl Into<PathBuf>,
        codec: impl Codec<T> + 'static,
        validator: impl Validator<T> + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            codec: Arc::new(codec),
            validator: Arc::new(validator),
            fallback: None,
            writable: true,
            cache: Mutex::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Value returned by `read` when the file does not exist.
    pub fn with_fallback(mut self, fallback: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Make every `write` fail with [`McsmError::ReadOnly`].
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The final path component, lossily converted.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Read the raw bytes from disk, bypassing the cache and the codec.
    pub async fn read_raw(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                McsmError::FileNotFound(self.path.clone())
            } else {
                McsmError::io_with_path(e, &self.path)
            }
        })
    }

    async fn load(&self) -> Result<T> {
        match self.read_raw().await {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), self.path.display());
                self.codec.parse(&bytes, &self.path)
            }
            Err(McsmError::FileNotFound(path)) => match &self.fallback {
                Some(fallback) => Ok(fallback()),
                None => Err(McsmError::FileNotFound(path)),
            },
            Err(e) => Err(e),
        }
    }

    /// Read the value, populating the cache from disk on a miss.
    pub async fn read(&self) -> Result<T> {
        let mut cache = self.cache.lock().await;
        if let Some(value) = cache.as_ref() {
            return Ok(value.clone());
        }
        let value = self.load().await?;
        *cache = Some(value.clone());
        Ok(value)
    }

    /// Read the value from disk even if cached, refreshing the cache.
    pub async fn reload(&self) -> Result<T> {
        let mut cache = self.cache.lock().await;
        let value = self.load().await?;
        *cache = Some(value.clone());
        Ok(value)
    }

    /// The cached value, if any, without touching the disk.
    pub async fn cached(&self) -> Option<T> {
        self.cache.lock().await.clone()
    }

    /// Validate, cache and persist `value`.
    ///
    /// A rejected value leaves the cache and the file unchanged. The cache is
    /// updated before the file is written; if persisting fails the cache is
    /// dropped so the next read goes back to disk. Concurrent writes through
    /// one document are applied one at a time.
    pub async fn write(&self, value: T) -> Result<()> {
        if !self.writable {
            return Err(McsmError::ReadOnly(self.path.clone()));
        }
        self.validator.validate(&value)?;
        let bytes = self.codec.serialize(&value, &self.path)?;

        let _writing = self.write_lock.lock().await;
        *self.cache.lock().await = Some(value);

        if let Err(e) = write_atomic(&self.path, &bytes).await {
            self.invalidate().await;
            return Err(e);
        }
        Ok(())
    }

    /// Remove the backing file (if any) and clear the cache.
    pub async fn delete(&self) -> Result<()> {
        let _writing = self.write_lock.lock().await;
        let mut cache = self.cache.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!("Deleted {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(McsmError::io_with_path(e, &self.path)),
        }
        *cache = None;
        Ok(())
    }

    /// Forget the cached value.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

impl<T> std::fmt::Debug for Document<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("path", &self.path)
            .field("writable", &self.writable)
            .finish_non_exhaustive()
    }
}

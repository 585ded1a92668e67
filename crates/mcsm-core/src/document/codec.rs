//! Parse/serialize layers for documents.

use crate::{McsmError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::Path;

/// Converts between on-disk bytes and a typed value.
///
/// `path` is only used for error context.
pub trait Codec<T>: Send + Sync {
    fn parse(&self, raw: &[u8], path: &Path) -> Result<T>;
    fn serialize(&self, value: &T, path: &Path) -> Result<Vec<u8>>;
}

/// Identity codec for raw byte documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec<Vec<u8>> for RawCodec {
    fn parse(&self, raw: &[u8], _path: &Path) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn serialize(&self, value: &Vec<u8>, _path: &Path) -> Result<Vec<u8>> {
        Ok(value.clone())
    }
}

/// UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec<String> for TextCodec {
    fn parse(&self, raw: &[u8], path: &Path) -> Result<String> {
        String::from_utf8(raw.to_vec()).map_err(|e| McsmError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn serialize(&self, value: &String, _path: &Path) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }
}

/// Pretty-printed JSON (two-space indent).
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn parse(&self, raw: &[u8], path: &Path) -> Result<T> {
        serde_json::from_slice(raw).map_err(|e| McsmError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn serialize(&self, value: &T, _path: &Path) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(value)?)
    }
}

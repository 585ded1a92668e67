//! `server.properties`: Java-style `key=value` settings read by the server.

use mcsm_core::config::generated_header;
use mcsm_core::document::{AcceptAll, Codec, Document};
use mcsm_core::{McsmError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    /// Interpret a raw value. Empty values have no value at all.
    ///
    /// Numbers are only recognized when they print back exactly as written,
    /// so `level-seed=007` or `1e5` stay text.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        match raw {
            "true" => return Some(Self::Bool(true)),
            "false" => return Some(Self::Bool(false)),
            _ => {}
        }
        if let Ok(number) = raw.parse::<f64>() {
            if number.is_finite() && number.to_string() == raw {
                return Some(Self::Number(number));
            }
        }
        Some(Self::Text(raw.to_string()))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", value),
            Self::Number(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Parsed properties; `None` means the key is present with an empty value.
pub type ServerProperties = BTreeMap<String, Option<PropertyValue>>;

/// Line-based codec for `.properties` files.
///
/// Blank lines and `#` comments are skipped. Only the first `=` separates
/// key from value. Written files start with a generated `#` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesCodec;

impl Codec<ServerProperties> for PropertiesCodec {
    fn parse(&self, raw: &[u8], path: &Path) -> Result<ServerProperties> {
        let text = std::str::from_utf8(raw).map_err(|e| McsmError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut properties = ServerProperties::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').unwrap_or((line, ""));
            properties.insert(key.trim().to_string(), PropertyValue::parse(value.trim()));
        }
        Ok(properties)
    }

    fn serialize(&self, value: &ServerProperties, _path: &Path) -> Result<Vec<u8>> {
        let mut out = format!("#{}\n", generated_header());
        for (key, value) in value {
            let value = value.as_ref().map(ToString::to_string).unwrap_or_default();
            out.push_str(&format!("{}={}\n", key, value));
        }
        Ok(out.into_bytes())
    }
}

/// The server properties document. A missing file reads as empty.
pub struct ServerPropertiesFile {
    document: Document<ServerProperties>,
}

impl ServerPropertiesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            document: Document::validated(path, PropertiesCodec, AcceptAll)
                .with_fallback(ServerProperties::new),
        }
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub async fn read(&self) -> Result<ServerProperties> {
        self.document.read().await
    }

    pub async fn reload(&self) -> Result<ServerProperties> {
        self.document.reload().await
    }

    pub async fn write(&self, properties: ServerProperties) -> Result<()> {
        self.document.write(properties).await
    }

    /// The value of `key`; `None` when the key is absent or empty.
    pub async fn get(&self, key: &str) -> Result<Option<PropertyValue>> {
        Ok(self.read().await?.get(key).cloned().flatten())
    }

    pub async fn set(&self, key: impl Into<String>, value: Option<PropertyValue>) -> Result<()> {
        let mut properties = self.read().await?;
        properties.insert(key.into(), value);
        self.write(properties).await
    }

    /// Remove `key`; returns whether it was present.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let mut properties = self.read().await?;
        if properties.remove(key).is_none() {
            return Ok(false);
        }
        self.write(properties).await?;
        Ok(true)
    }
}

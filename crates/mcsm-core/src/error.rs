//! Error types for mcsm.
//!
//! Every variant carries the identifiers (path, url, key, status) a caller
//! needs to render a precise message without re-deriving context.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mcsm.
#[derive(Debug, Error)]
pub enum McsmError {
    // Document errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{collection} is unique by its \"{key}\" property; two entries share the {key} \"{value}\"")]
    Duplicate {
        collection: String,
        key: String,
        value: String,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{0} is not writable")]
    ReadOnly(PathBuf),

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("While fetching {url}, an HTTP error ({status}) was returned")]
    RemoteFetch { url: String, status: u16 },

    #[error("Could not determine a file name for {url}; none was given and the server suggested none")]
    AmbiguousFilename { url: String },

    #[error("Progress was requested for {url}, but its length is unknown")]
    ProgressUnavailable { url: String },

    #[error("Transfer of {url} to {path} failed: {message}")]
    Transfer {
        url: String,
        path: PathBuf,
        message: String,
    },

    // Installation errors
    #[error("Instance is already installed{}", version_suffix(.version_id))]
    AlreadyInstalled { version_id: Option<String> },

    #[error("Instance at {directory} is not installed")]
    NotInstalled { directory: PathBuf },

    #[error("An installation is already running for {directory}")]
    InstallInProgress { directory: PathBuf },

    #[error("There is no release with ID \"{version_id}\"")]
    VersionNotFound { version_id: String },

    #[error("No server download available for version {version_id}")]
    NoServerDownload { version_id: String },

    // Mod errors
    #[error("Mod is not yet installed: {path}")]
    ModNotInstalled { path: PathBuf },
}

fn version_suffix(version_id: &Option<String>) -> String {
    version_id
        .as_deref()
        .map(|v| format!(" (version {v})"))
        .unwrap_or_default()
}

/// Result type alias for mcsm operations.
pub type Result<T> = std::result::Result<T, McsmError>;

impl From<std::io::Error> for McsmError {
    fn from(err: std::io::Error) -> Self {
        McsmError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for McsmError {
    fn from(err: serde_json::Error) -> Self {
        McsmError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for McsmError {
    fn from(err: reqwest::Error) -> Self {
        McsmError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl McsmError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        McsmError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        McsmError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True when the underlying file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, McsmError::FileNotFound(_))
    }

    /// Check if retrying the operation might succeed.
    ///
    /// Nothing in this crate retries on its own; this is for callers that do.
    pub fn is_retryable(&self) -> bool {
        match self {
            McsmError::Network { .. } | McsmError::Transfer { .. } => true,
            McsmError::RemoteFetch { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = McsmError::RemoteFetch {
            url: "https://example.com/a.json".into(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "While fetching https://example.com/a.json, an HTTP error (404) was returned"
        );

        let err = McsmError::AlreadyInstalled {
            version_id: Some("1.13.1".into()),
        };
        assert_eq!(err.to_string(), "Instance is already installed (version 1.13.1)");

        let err = McsmError::AlreadyInstalled { version_id: None };
        assert_eq!(err.to_string(), "Instance is already installed");
    }

    #[test]
    fn test_duplicate_names_key_and_value() {
        let err = McsmError::Duplicate {
            collection: "whitelist.json".into(),
            key: "name".into(),
            value: "Notch".into(),
        };
        let message = err.to_string();
        assert!(message.contains("\"name\""));
        assert!(message.contains("\"Notch\""));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(McsmError::RemoteFetch {
            url: "u".into(),
            status: 503
        }
        .is_retryable());
        assert!(!McsmError::RemoteFetch {
            url: "u".into(),
            status: 404
        }
        .is_retryable());
        assert!(!McsmError::FileNotFound(PathBuf::from("/x")).is_retryable());
    }
}

//! Network utilities for remote documents and file transfers.
//!
//! This module provides:
//! - HTTP client with mcsm defaults and status checking
//! - Read-only remote documents with header-derived metadata
//! - Streaming transfer into a local file with progress tracking

mod client;
mod remote;
mod transfer;

pub use client::{extract_domain, HttpClient};
pub use remote::{parse_content_disposition, RemoteMetadata, RemoteResource, RemoteStream};
pub use transfer::{transfer, TransferOptions, TransferProgress, Transferred};

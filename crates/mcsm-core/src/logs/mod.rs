//! Server log files: tokenizing, listing and live tailing.

mod document;
mod entry;
mod manager;
mod tail;

pub use document::{LogCodec, LogDocument};
pub use entry::{parse_log, parse_record, split_records, LogEntry, Severity};
pub use manager::LogManager;
pub use tail::LogTail;

//! Log record splitting and tokenizing.
//!
//! A record is one or more bracketed header tokens followed by free text:
//!
//! ```text
//! [12:00:01] [Server thread/INFO] [FML]: Loading properties
//! ```
//!
//! Physical lines that do not start with `[` continue the previous record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity from the `thread/LEVEL` header token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    #[serde(untagged)]
    Other(String),
}

impl Severity {
    pub fn parse(level: &str) -> Self {
        match level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Severity::Trace,
            "DEBUG" => Severity::Debug,
            "INFO" => Severity::Info,
            "WARN" | "WARNING" => Severity::Warn,
            "ERROR" => Severity::Error,
            "FATAL" => Severity::Fatal,
            _ => Severity::Other(level.trim().to_string()),
        }
    }

    /// Ordering rank for minimum-level filters. `None` for unknown levels.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Severity::Trace => Some(0),
            Severity::Debug => Some(1),
            Severity::Info => Some(2),
            Severity::Warn => Some(3),
            Severity::Error => Some(4),
            Severity::Fatal => Some(5),
            Severity::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
            Severity::Other(level) => level,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// First header token; empty when the record has no header.
    pub timestamp: String,
    pub thread: Option<String>,
    /// Only set when the second header token carries a `/LEVEL` suffix.
    pub severity: Option<Severity>,
    /// Remaining header tokens, first occurrence order, no repeats.
    pub categories: Vec<String>,
    pub body: String,
}

impl LogEntry {
    /// Severity for display and filtering; records without one count as INFO.
    pub fn effective_severity(&self) -> Severity {
        self.severity.clone().unwrap_or(Severity::Info)
    }

    /// Whether this entry is at or above `minimum`. Unknown levels always pass.
    pub fn is_at_least(&self, minimum: &Severity) -> bool {
        match (self.effective_severity().rank(), minimum.rank()) {
            (Some(level), Some(min)) => level >= min,
            _ => true,
        }
    }
}

/// Split raw log text into logical records.
///
/// Lines are trimmed and blank lines dropped. A line not starting with `[`
/// is appended to the previous record with a newline; one appearing before
/// any header starts a record of its own.
pub fn split_records(raw: &str) -> Vec<String> {
    let mut records: Vec<String> = Vec::new();
    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match records.last_mut() {
            Some(record) if !line.starts_with('[') => {
                record.push('\n');
                record.push_str(line);
            }
            _ => records.push(line.to_string()),
        }
    }
    records
}

/// Scan the leading bracket tokens of a record.
///
/// Returns the bracket contents and the byte offset where the body starts.
/// Brackets nested inside a header token stay part of that token's text.
fn scan_header(record: &str) -> (Vec<String>, usize) {
    let mut brackets = Vec::new();
    let mut depth = 0usize;
    let mut buffer = String::new();
    let mut body_start = record.len();

    for (index, ch) in record.char_indices() {
        match ch {
            '[' => {
                if depth > 0 {
                    buffer.push(ch);
                }
                depth += 1;
            }
            ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    brackets.push(std::mem::take(&mut buffer));
                } else {
                    buffer.push(ch);
                }
            }
            _ if depth > 0 => buffer.push(ch),
            ch if ch.is_whitespace() => {}
            _ => {
                body_start = index;
                break;
            }
        }
    }

    if depth > 0 {
        // Unterminated header token: keep what was read.
        brackets.push(buffer);
    }
    (brackets, body_start)
}

/// Tokenize one logical record.
pub fn parse_record(record: &str) -> LogEntry {
    let (brackets, body_start) = scan_header(record);
    let mut tokens = brackets.into_iter();

    let timestamp = tokens.next().unwrap_or_default().trim().to_string();

    let (thread, severity) = match tokens.next() {
        Some(token) => match token.split_once('/') {
            Some((thread, level)) => (Some(thread.trim().to_string()), Some(Severity::parse(level))),
            None => (Some(token.trim().to_string()), None),
        },
        None => (None, None),
    };

    let mut categories: Vec<String> = Vec::new();
    for token in tokens {
        let token = token.trim().to_string();
        if !token.is_empty() && !categories.contains(&token) {
            categories.push(token);
        }
    }

    let body = record[body_start..].trim_start();
    let body = body.strip_prefix(':').unwrap_or(body).trim().to_string();

    LogEntry {
        timestamp,
        thread,
        severity,
        categories,
        body,
    }
}

/// Split and tokenize a whole log.
pub fn parse_log(raw: &str) -> Vec<LogEntry> {
    split_records(raw).iter().map(|r| parse_record(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
[17:16:52] [Server thread/INFO]: Loading properties
[17:16:52] [Server thread/WARN]: server.properties does not exist
[17:16:52] [Server thread/INFO]: Default game type: SURVIVAL
Example to test multi-line entries
Which might happen with errors %TEST%

[17:16:52] [Server thread/INFO]: Generating keypair
";

    #[test]
    fn test_multiline_record_and_severity() {
        let entries =
            parse_log("[12:00:01] [Server thread/INFO]: hello\nworld\n[12:00:02] [Server thread/WARN]: next");
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].timestamp, "12:00:01");
        assert_eq!(entries[0].thread.as_deref(), Some("Server thread"));
        assert_eq!(entries[0].severity, Some(Severity::Info));
        assert_eq!(entries[0].body, "hello\nworld");

        assert_eq!(entries[1].severity, Some(Severity::Warn));
        assert_eq!(entries[1].body, "next");
    }

    #[test]
    fn test_split_records_drops_blank_lines() {
        let records = split_records(SAMPLE);
        assert_eq!(records.len(), 4);
        assert!(records[2].contains("%TEST%"));
        assert!(records[2].contains("\nWhich might"));
        assert!(!records[3].contains("%TEST%"));
    }

    #[test]
    fn test_windows_line_endings() {
        let records = split_records("[a] [b/INFO]: one\r\ntwo\r\n[c] [d/INFO]: three\r\n");
        assert_eq!(records, vec!["[a] [b/INFO]: one\ntwo", "[c] [d/INFO]: three"]);
    }

    #[test]
    fn test_categories_deduplicated_in_order() {
        let entry = parse_record("[10:00:00] [main/INFO] [FML] [forge] [FML]: Loaded");
        assert_eq!(entry.categories, vec!["FML", "forge"]);
        assert_eq!(entry.body, "Loaded");
    }

    #[test]
    fn test_thread_without_level_leaves_severity_unset() {
        let entry = parse_record("[10:00:00] [Worker-1]: something");
        assert_eq!(entry.thread.as_deref(), Some("Worker-1"));
        assert_eq!(entry.severity, None);
        assert_eq!(entry.effective_severity(), Severity::Info);
    }

    #[test]
    fn test_brackets_in_body_are_body_text() {
        let entry = parse_record("[10:00:00] [Server thread/INFO]: <Steve> [hi] there");
        assert!(entry.categories.is_empty());
        assert_eq!(entry.body, "<Steve> [hi] there");
    }

    #[test]
    fn test_nested_brackets_stay_in_token() {
        let entry = parse_record("[10:00:00] [pool-2 [inner]/ERROR]: boom");
        assert_eq!(entry.thread.as_deref(), Some("pool-2 [inner]"));
        assert_eq!(entry.severity, Some(Severity::Error));
    }

    #[test]
    fn test_leading_continuation_is_own_record() {
        let entries = parse_log("stray line\n[1] [t/INFO]: x");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp, "");
        assert_eq!(entries[0].body, "stray line");
    }

    #[test]
    fn test_minimum_level_filter() {
        let warn = parse_record("[1] [t/WARN]: w");
        let info = parse_record("[1] [t]: i");
        assert!(warn.is_at_least(&Severity::Info));
        assert!(!info.is_at_least(&Severity::Warn));
        assert_eq!(Severity::parse("custom").as_str(), "custom");
    }
}

//! Tracing subscriber setup for binaries built on this crate.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn builder(debug: bool) -> tracing_subscriber::fmt::SubscriberBuilder<
    tracing_subscriber::fmt::format::DefaultFields,
    tracing_subscriber::fmt::format::Format<tracing_subscriber::fmt::format::Compact>,
> {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
}

/// Install the global subscriber. Panics if one is already set.
pub fn init(debug: bool) {
    builder(debug).init();
}

/// Install the global subscriber unless one is already set.
///
/// Returns `false` when another subscriber was installed first.
pub fn try_init(debug: bool) -> bool {
    builder(debug).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = try_init(true);
        assert!(!try_init(false));
    }
}

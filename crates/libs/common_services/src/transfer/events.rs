use regex::Regex;
use std::sync::LazyLock;

static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(ERROR|CRITICAL)\b|^Traceback ").expect("Invalid error line regex")
});
static WARNING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bWARN(ING)?\b").expect("Invalid warning line regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransferLogLevel {
    Info,
    Warning,
    Error,
}

/// One line of output from a running transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub level: TransferLogLevel,
    pub message: String,
}

/// Receives transfer output while the transfer is still running.
///
/// Called from inside the transfer loop, so implementations must not block.
pub trait TransferEventSink: Send + Sync {
    fn emit(&self, event: TransferEvent);
}

/// Drops every event.
pub struct NullSink;

impl TransferEventSink for NullSink {
    fn emit(&self, _event: TransferEvent) {}
}

#[must_use]
pub fn classify_line(line: &str) -> TransferLogLevel {
    if ERROR_LINE.is_match(line) {
        TransferLogLevel::Error
    } else if WARNING_LINE.is_match(line) {
        TransferLogLevel::Warning
    } else {
        TransferLogLevel::Info
    }
}

impl TransferEvent {
    #[must_use]
    pub fn from_line(line: &str) -> Self {
        Self {
            level: classify_line(line),
            message: line.trim_end().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_uploader_log_lines() {
        assert_eq!(
            classify_line("2025-03-01 10:00:00 ERROR    Could not connect to server"),
            TransferLogLevel::Error
        );
        assert_eq!(
            classify_line("2025-03-01 10:00:00 CRITICAL Upload aborted"),
            TransferLogLevel::Error
        );
        assert_eq!(
            classify_line("Traceback (most recent call last):"),
            TransferLogLevel::Error
        );
        assert_eq!(
            classify_line("2025-03-01 10:00:01 WARNING  Sample S2 already exists"),
            TransferLogLevel::Warning
        );
        assert_eq!(
            classify_line("2025-03-01 10:00:02 INFO     Uploading S1"),
            TransferLogLevel::Info
        );
        // Substrings of other words don't count.
        assert_eq!(classify_line("no ERRORS found"), TransferLogLevel::Info);
    }
}

use std::sync::Mutex;

/// Sink for user-facing status and diagnostic messages.
///
/// Every entry point receives its logger explicitly; the engine keeps no
/// ambient logging state of its own.
pub trait Logger {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Default sink forwarding to the `log` facade, so binaries pick messages up
/// with whatever `log` backend they initialize (e.g. `env_logger`).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl Logger for LogSink {
    fn info(&self, msg: &str) {
        log::info!("{msg}");
    }

    fn warn(&self, msg: &str) {
        log::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        log::error!("{msg}");
    }
}

/// Severity tag for [`MemoryLogger`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Test sink that records every message for later assertions.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, msg: &str) {
        self.records
            .lock()
            .expect("logger mutex poisoned")
            .push((level, msg.to_string()));
    }

    /// All recorded messages in order, regardless of level.
    pub fn lines(&self) -> Vec<String> {
        self.records
            .lock()
            .expect("logger mutex poisoned")
            .iter()
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// Only the messages recorded at `level`.
    pub fn lines_at(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .expect("logger mutex poisoned")
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn info(&self, msg: &str) {
        self.push(LogLevel::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(LogLevel::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(LogLevel::Error, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_logger_records_in_order_and_filters_by_level() {
        let logger = MemoryLogger::new();
        logger.info("one");
        logger.warn("two");
        logger.info("three");

        assert_eq!(logger.lines(), vec!["one", "two", "three"]);
        assert_eq!(logger.lines_at(LogLevel::Warn), vec!["two"]);
    }
}

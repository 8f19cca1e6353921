//! `log` backend that feeds the in-app console

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const MAX_CONSOLE_LINES: usize = 500;
pub const ENV_LOG_LEVEL: &str = "R1_LOG";

/// Last few hundred formatted log lines, shared with the UI
#[derive(Debug, Default)]
pub struct ConsoleBuffer {
    lines: Mutex<VecDeque<String>>,
}

impl ConsoleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        lines.push_back(line);
        while lines.len() > MAX_CONSOLE_LINES {
            lines.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        lines.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

pub fn format_line(time: &str, level: Level, message: &str) -> String {
    format!("[{}] [{}] {}", time, level, message)
}

pub struct ConsoleLogger {
    buffer: Arc<ConsoleBuffer>,
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(buffer: Arc<ConsoleBuffer>, level: LevelFilter) -> Self {
        Self { buffer, level }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        let line = format_line(&time, record.level(), &record.args().to_string());
        if record.level() <= Level::Warn {
            eprintln!("{}", line);
        }
        self.buffer.push(line);
    }

    fn flush(&self) {}
}

pub fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}

/// Level from `R1_LOG`, Info when unset or unparseable
pub fn level_from_env() -> LevelFilter {
    std::env::var(ENV_LOG_LEVEL)
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(LevelFilter::Info)
}

/// Install the console logger and hand back its buffer.
/// A second call keeps the first logger.
pub fn init(level: LevelFilter) -> Arc<ConsoleBuffer> {
    let buffer = Arc::new(ConsoleBuffer::new());
    let logger = ConsoleLogger::new(buffer.clone(), level);
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
    buffer
}

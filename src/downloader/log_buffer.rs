//! Shared live log line buffer.
//!
//! A bounded in-memory buffer of formatted log lines for UI consumers. The
//! buffer holds at most [`LOG_CAPACITY`] lines; when the cap is exceeded it is
//! trimmed down to the most recent [`LOG_TRIM_TO`] in one step, so trimming
//! happens in bursts instead of on every append.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Maximum number of retained log lines
pub(crate) const LOG_CAPACITY: usize = 200;

/// Number of lines kept after a trim
pub(crate) const LOG_TRIM_TO: usize = 100;

/// Cloneable handle to the shared log line buffer
///
/// The lock is held only for push/trim/read; formatting happens outside it.
#[derive(Clone)]
pub(crate) struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
    pub(crate) fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(LOG_CAPACITY))),
        }
    }

    /// Append a formatted `[HH:MM:SS] [LEVEL] message` line
    ///
    /// Returns the formatted line so the caller can forward it to event
    /// subscribers.
    pub(crate) fn push(&self, level: &str, message: &str) -> String {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let line = format!("[{timestamp}] [{level}] {message}");

        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push_back(line.clone());
        if lines.len() > LOG_CAPACITY {
            let excess = lines.len() - LOG_TRIM_TO;
            lines.drain(..excess);
        }

        line
    }

    /// The most recent `limit` lines, oldest first
    pub(crate) fn recent(&self, limit: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        let skip = lines.len().saturating_sub(limit);
        lines.iter().skip(skip).cloned().collect()
    }

    /// Number of retained lines
    pub(crate) fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

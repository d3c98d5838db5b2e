//! User-facing diagnostic channel.
//!
//! Discovery failures and descriptor stderr go here, separate from the
//! internal debug log. The sink is injected into the registry.

use std::io::Write;
use std::sync::Mutex;

pub const CHANNEL_NAME: &str = "Gobl Auto Detection";

pub trait DiagnosticSink: Send + Sync {
    fn append_line(&self, line: &str);

    /// Bring the channel to the user's attention.
    fn reveal(&self);
}

/// Writes diagnostics to standard error.
#[derive(Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn append_line(&self, line: &str) {
        let mut err = std::io::stderr().lock();
        for l in line.lines() {
            let _ = writeln!(err, "[{}] {}", CHANNEL_NAME, l);
        }
    }

    fn reveal(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Keeps diagnostics in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
    reveals: Mutex<usize>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn reveal_count(&self) -> usize {
        self.reveals.lock().map(|r| *r).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty() && self.reveal_count() == 0
    }
}

impl DiagnosticSink for BufferSink {
    fn append_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }

    fn reveal(&self) {
        if let Ok(mut reveals) = self.reveals.lock() {
            *reveals += 1;
        }
    }
}

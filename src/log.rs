//! File-backed debug log for discovery, kept apart from the user-facing
//! diagnostic channel.
//!
//! Entries go to `~/.gobl-tasks/gobl-tasks.log` once [`init_with_debug`] has
//! run; before that every macro is a no-op, so library users and tests stay
//! silent. `--debug` or `GOBL_TASKS_DEBUG=1` lowers the threshold to DEBUG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static THRESHOLD: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn enabled(self) -> bool {
        self as u8 <= THRESHOLD.load(Ordering::Relaxed)
    }
}

fn debug_requested_by_env() -> bool {
    matches!(
        std::env::var("GOBL_TASKS_DEBUG").as_deref().map(str::to_ascii_lowercase).as_deref(),
        Ok("1") | Ok("true")
    )
}

/// Start logging, truncating the previous session's file.
pub fn init_with_debug(debug: bool) {
    let threshold = if debug || debug_requested_by_env() {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    THRESHOLD.store(threshold as u8, Ordering::SeqCst);

    let Some(dir) = dirs::home_dir().map(|h| h.join(".gobl-tasks")) else {
        return;
    };
    let path = dir.join("gobl-tasks.log");
    if std::fs::create_dir_all(&dir).is_ok() && std::fs::write(&path, "").is_ok() {
        let _ = LOG_PATH.set(path);
    }
}

/// Append one entry. Used through the `glog*` macros.
pub fn write(level: LogLevel, msg: &str) {
    if !level.enabled() {
        return;
    }
    let Some(path) = LOG_PATH.get() else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().append(true).open(path) {
        let _ = writeln!(
            file,
            "{} {:<5} {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            level.label(),
            msg
        );
    }
}

#[macro_export]
macro_rules! glog {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! glog_error {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Error, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! glog_warn {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! glog_debug {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! glog_trace {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Trace, &format!($($arg)*))
    };
}

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Watch error: {0}")]
    Notify(#[from] notify::Error),

    /// The external tool failed to spawn, exited non-zero or was killed.
    /// Whatever it wrote before failing is kept for diagnostics.
    #[error("Process failed: {cause}")]
    Process {
        cause: String,
        stdout: String,
        stderr: String,
    },

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    pub fn process(cause: impl Into<String>) -> Self {
        Error::Process {
            cause: cause.into(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

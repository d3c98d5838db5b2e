use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{glog_debug, Error, Result};

pub const DEFAULT_DESCRIPTOR: &str = "gobl.go";
pub const DEFAULT_COMMAND: &str = "go run gobl.go";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// File name of the build descriptor looked up at each root.
    #[serde(default = "default_descriptor")]
    pub descriptor: String,
    /// Invocation template. Run bare to enumerate, with a task name to execute.
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub roots: Vec<String>,
    pub timeout_secs: Option<u64>,
    /// Drop repeated identifiers within one root, keeping the first.
    #[serde(default)]
    pub dedupe: bool,
}

fn default_descriptor() -> String {
    DEFAULT_DESCRIPTOR.to_string()
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            descriptor: default_descriptor(),
            command: default_command(),
            roots: Vec::new(),
            timeout_secs: None,
            dedupe: false,
        }
    }
}

impl Config {
    pub fn app_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".gobl-tasks"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("config.toml"))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Configured roots with `~/` expanded, in declaration order.
    pub fn effective_roots(&self) -> Vec<PathBuf> {
        self.roots.iter().map(|r| expand_tilde(r)).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.descriptor.trim().is_empty() {
            return Err(Error::Validation("descriptor cannot be empty".to_string()));
        }
        if self.command.trim().is_empty() {
            return Err(Error::Validation("command cannot be empty".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(Error::Validation(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        glog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            glog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        glog_debug!(
            "Config loaded: descriptor={}, command={}, roots={:?}, timeout_secs={:?}, dedupe={}",
            config.descriptor,
            config.command,
            config.roots,
            config.timeout_secs,
            config.dedupe
        );
        Ok(config)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

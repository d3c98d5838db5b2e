//! Discovery of tasks defined by a gobl build descriptor.
//!
//! A workspace root with a `gobl.go` file is asked for its task listing,
//! which is parsed, classified into build/test groups and cached until the
//! descriptor changes on disk. [`TaskRegistry`] is the entry point.

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod log;
pub mod process;
pub mod registry;
pub mod task;
pub mod watch;

pub use error::{Error, Result};
pub use registry::TaskRegistry;
pub use task::{DiscoveryResult, HostTask, RunSpec, TaskDefinition, TaskGroup, TaskIdentifier, TaskRecord};

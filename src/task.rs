//! Task data model shared by discovery, the cache and the host boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Task kind reported to the host for every discovered task.
pub const TASK_KIND: &str = "gobl";

/// A task name exactly as the descriptor reported it (after leading
/// whitespace is trimmed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskIdentifier(String);

impl TaskIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskIdentifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Semantic group a task is presented under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskGroup {
    Build,
    Test,
}

impl TaskGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskGroup::Build => "build",
            TaskGroup::Test => "test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub identifier: TaskIdentifier,
    pub group: Option<TaskGroup>,
    pub origin_root: PathBuf,
}

/// Every task discovered for one root, in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiscoveryResult {
    pub root: PathBuf,
    pub tasks: Vec<TaskRecord>,
}

impl DiscoveryResult {
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tasks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.identifier.as_str()).collect()
    }
}

/// A resolved external command: where to run it and what to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    pub working_directory: PathBuf,
    pub command_line: String,
}

impl RunSpec {
    /// The enumeration invocation: the template with no task argument.
    pub fn enumerate(template: &str, root: &Path) -> Self {
        Self {
            working_directory: root.to_path_buf(),
            command_line: template.to_string(),
        }
    }

    /// The execution invocation for one task. The identifier is not checked
    /// against any discovery result.
    pub fn for_task(template: &str, identifier: &TaskIdentifier, root: &Path) -> Self {
        Self {
            working_directory: root.to_path_buf(),
            command_line: format!("{} {}", template, identifier),
        }
    }
}

/// Typed definition object exchanged with the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub task: String,
}

impl TaskDefinition {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            kind: TASK_KIND.to_string(),
            task: task.into(),
        }
    }
}

/// A task in the form the host presents and launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostTask {
    pub definition: TaskDefinition,
    pub display_name: String,
    pub source: &'static str,
    pub group: Option<TaskGroup>,
    pub root: PathBuf,
    pub run_spec: RunSpec,
}

//! Task registry: the facade the host talks to.
//!
//! Lists tasks across every configured root and resolves task identifiers
//! into runnable commands. A root whose discovery fails contributes no tasks
//! and a single diagnostic; it never fails the listing as a whole.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;

use crate::cache::DiscoveryCache;
use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::discovery::Discoverer;
use crate::process::{Runner, ShellRunner};
use crate::task::{HostTask, RunSpec, TaskDefinition, TaskIdentifier, TaskRecord, TASK_KIND};
use crate::watch::WatchHandle;
use crate::{glog_error, Result};

pub use crate::discovery::FAILURE_LINE;

pub struct TaskRegistry {
    roots: Vec<PathBuf>,
    command: String,
    cache: Arc<DiscoveryCache>,
}

impl TaskRegistry {
    pub fn new(
        config: &Config,
        roots: Vec<PathBuf>,
        runner: Arc<dyn Runner>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let discoverer = Discoverer::new(config, runner, diagnostics);
        Self {
            roots,
            command: config.command.clone(),
            cache: Arc::new(DiscoveryCache::new(Arc::new(discoverer))),
        }
    }

    /// Registry running the real shell, with the configured timeout.
    pub fn from_config(config: &Config, roots: Vec<PathBuf>, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        let runner = ShellRunner::new().with_timeout(config.timeout());
        Self::new(config, roots, Arc::new(runner), diagnostics)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    /// All tasks of all roots, in root order then listing order.
    ///
    /// Roots are discovered concurrently; the call returns once every root
    /// has settled.
    pub async fn list_tasks(&self) -> Vec<TaskRecord> {
        let outcomes = join_all(self.roots.iter().map(|root| self.cache.get_tasks(root))).await;

        let mut tasks = Vec::new();
        for (root, outcome) in self.roots.iter().zip(outcomes) {
            match outcome {
                Ok(result) => tasks.extend(result.tasks.iter().cloned()),
                // Already on the diagnostic channel, once per discovery.
                Err(e) => glog_error!("Skipping {}: {}", root.display(), e),
            }
        }
        tasks
    }

    /// The command that executes `identifier` in `root`. The identifier is
    /// not checked against discovered tasks.
    pub fn resolve(&self, identifier: &TaskIdentifier, root: &Path) -> RunSpec {
        RunSpec::for_task(&self.command, identifier, root)
    }

    pub fn host_task(&self, record: &TaskRecord) -> HostTask {
        HostTask {
            definition: TaskDefinition::new(record.identifier.as_str()),
            display_name: record.identifier.to_string(),
            source: TASK_KIND,
            group: record.group,
            root: record.origin_root.clone(),
            run_spec: self.resolve(&record.identifier, &record.origin_root),
        }
    }

    /// Every discovered task in host form.
    pub async fn provide_tasks(&self) -> Vec<HostTask> {
        self.list_tasks()
            .await
            .iter()
            .map(|record| self.host_task(record))
            .collect()
    }

    /// Rebuild a host task from a definition the host kept around.
    ///
    /// Returns `None` for definitions of another kind or without a task name.
    pub fn resolve_task(&self, definition: &TaskDefinition, root: &Path) -> Option<HostTask> {
        if definition.kind != TASK_KIND || definition.task.is_empty() {
            return None;
        }
        let identifier = TaskIdentifier::new(definition.task.as_str());
        Some(HostTask {
            definition: definition.clone(),
            display_name: definition.task.clone(),
            source: TASK_KIND,
            group: crate::discovery::classify(&definition.task),
            root: root.to_path_buf(),
            run_spec: self.resolve(&identifier, root),
        })
    }

    /// Invalidate a root's cached tasks whenever its descriptor changes.
    pub fn watch(&self) -> Result<WatchHandle> {
        self.watch_with(|_| {})
    }

    pub fn watch_with<F>(&self, on_change: F) -> Result<WatchHandle>
    where
        F: Fn(&Path) + Send + 'static,
    {
        WatchHandle::spawn(&self.roots, self.cache.clone(), on_change)
    }
}

//! Task discovery for a single root.
//!
//! Discovery locates the descriptor, runs it in listing mode, parses the
//! listing and classifies each task. Caching lives in [`crate::cache`].

pub mod classify;
pub mod locator;
pub mod parser;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::process::Runner;
use crate::task::{DiscoveryResult, RunSpec, TaskRecord};
use crate::{glog, glog_debug, glog_error, glog_trace, glog_warn, Error, Result};

pub use classify::classify;
pub use parser::parse;

/// Closing line of every failure block on the diagnostic channel.
pub const FAILURE_LINE: &str = "Auto detecting gobl tasks failed.";

pub struct Discoverer {
    descriptor: String,
    command: String,
    dedupe: bool,
    runner: Arc<dyn Runner>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Discoverer {
    pub fn new(config: &Config, runner: Arc<dyn Runner>, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            descriptor: config.descriptor.clone(),
            command: config.command.clone(),
            dedupe: config.dedupe,
            runner,
            diagnostics,
        }
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Discover the tasks of `root`.
    ///
    /// A root without a descriptor yields an empty result and never spawns a
    /// process. Stderr from a successful run is forwarded to the diagnostic
    /// channel. A failure is reported there once and then returned.
    pub async fn discover(&self, root: &Path) -> Result<DiscoveryResult> {
        let outcome = self.enumerate(root).await;
        if let Err(e) = &outcome {
            self.report_failure(root, e);
        }
        outcome
    }

    async fn enumerate(&self, root: &Path) -> Result<DiscoveryResult> {
        if !locator::exists(root, &self.descriptor).await {
            glog_debug!("No {} in {}, skipping", self.descriptor, root.display());
            return Ok(DiscoveryResult::empty(root));
        }

        let spec = RunSpec::enumerate(&self.command, root);
        glog!("Discovering tasks in {} via `{}`", root.display(), spec.command_line);
        let output = self
            .runner
            .run(&spec.command_line, &spec.working_directory)
            .await?;

        if !output.stderr.is_empty() {
            glog_warn!("{} wrote to stderr in {}", self.descriptor, root.display());
            self.diagnostics.append_line(&output.stderr);
            self.diagnostics.reveal();
        }
        glog_trace!("Listing for {}:\n{}", root.display(), output.stdout);

        let mut seen = HashSet::new();
        let tasks: Vec<TaskRecord> = parse(&output.stdout)
            .filter(|id| !self.dedupe || seen.insert(id.clone()))
            .map(|identifier| TaskRecord {
                group: classify(identifier.as_str()),
                identifier,
                origin_root: root.to_path_buf(),
            })
            .collect();

        glog!("Discovered {} tasks in {}", tasks.len(), root.display());
        Ok(DiscoveryResult {
            root: root.to_path_buf(),
            tasks,
        })
    }

    fn report_failure(&self, root: &Path, error: &Error) {
        glog_error!("Task discovery failed in {}: {}", root.display(), error);
        match error {
            Error::Process { stdout, stderr, .. } => {
                if !stderr.is_empty() {
                    self.diagnostics.append_line(stderr);
                }
                if !stdout.is_empty() {
                    self.diagnostics.append_line(stdout);
                }
            }
            other => self.diagnostics.append_line(&other.to_string()),
        }
        self.diagnostics.append_line(FAILURE_LINE);
        self.diagnostics.reveal();
    }
}

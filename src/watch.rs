//! Descriptor file watching.
//!
//! Each root directory is watched non-recursively and events are filtered
//! down to the descriptor file. Matching create, modify and remove events
//! invalidate that root's cache entry through a channel drained on the
//! tokio runtime. Dropping the [`WatchHandle`] stops everything.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cache::DiscoveryCache;
use crate::{glog, glog_debug, glog_warn, Result};

/// A descriptor change observed for a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorChanged {
    pub root: PathBuf,
}

/// Map a raw notify event to the roots whose descriptor it touches.
fn changed_roots(event: &Event, roots: &[PathBuf], descriptor: &str) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
        _ => return Vec::new(),
    }

    let mut hits = Vec::new();
    for path in &event.paths {
        let is_descriptor = path
            .file_name()
            .map(|name| name.to_string_lossy() == descriptor)
            .unwrap_or(false);
        if !is_descriptor {
            continue;
        }
        if let Some(root) = roots.iter().find(|r| path.parent() == Some(r.as_path())) {
            if !hits.contains(root) {
                hits.push(root.clone());
            }
        }
    }
    hits
}

/// Watches descriptor files and emits [`DescriptorChanged`] events.
pub struct DescriptorWatcher {
    watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl DescriptorWatcher {
    /// Start watching `roots` for changes to `descriptor`.
    ///
    /// Roots that do not exist are skipped. Paths are canonicalized so event
    /// paths reported by the OS match.
    pub fn start(
        roots: &[PathBuf],
        descriptor: &str,
        event_tx: mpsc::UnboundedSender<DescriptorChanged>,
    ) -> Result<Self> {
        let watched: Vec<PathBuf> = roots
            .iter()
            .filter_map(|r| match r.canonicalize() {
                Ok(path) if path.is_dir() => Some(path),
                _ => {
                    glog_warn!("Not watching {}: not a directory", r.display());
                    None
                }
            })
            .collect();

        let originals: Vec<(PathBuf, PathBuf)> = roots
            .iter()
            .filter_map(|r| r.canonicalize().ok().map(|c| (c, r.clone())))
            .collect();
        let filter_roots = watched.clone();
        let descriptor = descriptor.to_string();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        glog_warn!("watch error: {}", e);
                        return;
                    }
                };
                for canonical in changed_roots(&event, &filter_roots, &descriptor) {
                    // Report the root as the caller named it.
                    let root = originals
                        .iter()
                        .find(|(c, _)| *c == canonical)
                        .map(|(_, original)| original.clone())
                        .unwrap_or(canonical);
                    glog_debug!("descriptor changed in {} ({:?})", root.display(), event.kind);
                    let _ = event_tx.send(DescriptorChanged { root });
                }
            },
            Config::default(),
        )?;

        for path in &watched {
            watcher.watch(path, RecursiveMode::NonRecursive)?;
        }
        glog!("Watching {} root(s)", watched.len());

        Ok(Self { watcher, watched })
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    fn unwatch_all(&mut self) {
        for path in &self.watched {
            let _ = self.watcher.unwatch(path);
        }
    }
}

/// Keeps a root watch alive. Dropping it releases the OS watch and stops
/// invalidating the cache.
pub struct WatchHandle {
    watcher: Option<DescriptorWatcher>,
    cancel: CancellationToken,
}

impl WatchHandle {
    /// Watch `roots` and invalidate `cache` on every descriptor change.
    ///
    /// `on_change` is called after each invalidation. Must be called from
    /// within a tokio runtime.
    pub fn spawn<F>(roots: &[PathBuf], cache: Arc<DiscoveryCache>, on_change: F) -> Result<Self>
    where
        F: Fn(&Path) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<DescriptorChanged>();
        let watcher = DescriptorWatcher::start(roots, cache.discoverer().descriptor(), tx)?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(DescriptorChanged { root }) => {
                            cache.invalidate(&root);
                            on_change(&root);
                        }
                        None => break,
                    },
                }
            }
            glog_debug!("watch drain task stopped");
        });

        Ok(Self {
            watcher: Some(watcher),
            cancel,
        })
    }

    pub fn watched(&self) -> &[PathBuf] {
        self.watcher.as_ref().map(|w| w.watched()).unwrap_or(&[])
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(mut watcher) = self.watcher.take() {
            watcher.unwatch_all();
            glog!("Stopped watching {} root(s)", watcher.watched().len());
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

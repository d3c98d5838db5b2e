//! Per-root discovery cache.
//!
//! Each root moves through `Empty -> Pending -> Populated`. While a root is
//! Pending every caller awaits the same spawned discovery, so at most one
//! enumeration process runs per root. Invalidation drops the entry whatever
//! its state; the next query starts a fresh discovery.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::task::AbortHandle;

use crate::discovery::Discoverer;
use crate::task::DiscoveryResult;
use crate::{glog_debug, Error};

/// Outcome shared between every caller of one discovery.
pub type DiscoveryOutcome = std::result::Result<Arc<DiscoveryResult>, Arc<Error>>;

type SharedDiscovery = Shared<BoxFuture<'static, DiscoveryOutcome>>;

enum Entry {
    Pending {
        generation: u64,
        discovery: SharedDiscovery,
        abort: AbortHandle,
    },
    Populated(Arc<DiscoveryResult>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Empty,
    Pending,
    Populated,
}

/// Entry map shared between the cache and its spawned discoveries.
#[derive(Default)]
struct Entries(Mutex<HashMap<PathBuf, Entry>>);

impl Entries {
    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Entry>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a finished discovery, unless the entry was invalidated or
    /// replaced while it ran.
    fn settle(&self, root: &Path, generation: u64, outcome: &DiscoveryOutcome) {
        let mut entries = self.lock();
        let current = matches!(
            entries.get(root),
            Some(Entry::Pending { generation: g, .. }) if *g == generation
        );
        if !current {
            return;
        }
        match outcome {
            Ok(result) => {
                glog_debug!("cache {} -> Populated ({} tasks)", root.display(), result.len());
                entries.insert(root.to_path_buf(), Entry::Populated(result.clone()));
            }
            Err(e) => {
                glog_debug!("cache {} -> Empty after failure: {}", root.display(), e);
                entries.remove(root);
            }
        }
    }
}

pub struct DiscoveryCache {
    discoverer: Arc<Discoverer>,
    entries: Arc<Entries>,
    next_generation: AtomicU64,
}

impl DiscoveryCache {
    pub fn new(discoverer: Arc<Discoverer>) -> Self {
        Self {
            discoverer,
            entries: Arc::new(Entries::default()),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn discoverer(&self) -> &Discoverer {
        &self.discoverer
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, Entry>> {
        self.entries.lock()
    }

    /// Tasks for `root`, from cache or from a (possibly shared) discovery.
    ///
    /// Must be called from within a tokio runtime. Failed discoveries are
    /// not cached.
    pub async fn get_tasks(&self, root: &Path) -> DiscoveryOutcome {
        let discovery = {
            let mut entries = self.entries();
            match entries.get(root) {
                Some(Entry::Populated(result)) => {
                    glog_debug!("cache hit for {}", root.display());
                    return Ok(result.clone());
                }
                Some(Entry::Pending { discovery, .. }) => {
                    glog_debug!("joining in-flight discovery for {}", root.display());
                    discovery.clone()
                }
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
                    let (discovery, abort) = self.spawn_discovery(root, generation);
                    glog_debug!("cache {} -> Pending (gen {})", root.display(), generation);
                    entries.insert(
                        root.to_path_buf(),
                        Entry::Pending {
                            generation,
                            discovery: discovery.clone(),
                            abort,
                        },
                    );
                    discovery
                }
            }
        };

        discovery.await
    }

    /// Spawn the discovery for `root`. The task settles its own entry, so
    /// the cache moves on even when every caller has given up waiting.
    fn spawn_discovery(&self, root: &Path, generation: u64) -> (SharedDiscovery, AbortHandle) {
        let discoverer = self.discoverer.clone();
        let entries = self.entries.clone();
        let owned_root = root.to_path_buf();
        let handle = tokio::spawn(async move {
            let outcome: DiscoveryOutcome = discoverer
                .discover(&owned_root)
                .await
                .map(Arc::new)
                .map_err(Arc::new);
            // The spawner still holds the lock until the Pending entry is in.
            entries.settle(&owned_root, generation, &outcome);
            outcome
        });
        let abort = handle.abort_handle();
        let discovery = async move {
            handle
                .await
                .unwrap_or_else(|join| Err(Arc::new(Error::TaskJoin(join.to_string()))))
        }
        .boxed()
        .shared();
        (discovery, abort)
    }

    /// Forget whatever is cached for `root`. Does not start a discovery.
    pub fn invalidate(&self, root: &Path) {
        if self.entries().remove(root).is_some() {
            glog_debug!("cache {} -> Empty (invalidated)", root.display());
        }
    }

    pub fn invalidate_all(&self) {
        self.entries().clear();
        glog_debug!("cache cleared");
    }

    pub fn state(&self, root: &Path) -> EntryState {
        match self.entries().get(root) {
            None => EntryState::Empty,
            Some(Entry::Pending { .. }) => EntryState::Pending,
            Some(Entry::Populated(_)) => EntryState::Populated,
        }
    }

    /// The cached result for `root`, if one is populated.
    pub fn peek(&self, root: &Path) -> Option<Arc<DiscoveryResult>> {
        match self.entries().get(root) {
            Some(Entry::Populated(result)) => Some(result.clone()),
            _ => None,
        }
    }
}

impl Drop for DiscoveryCache {
    fn drop(&mut self) {
        for entry in self.entries().values() {
            if let Entry::Pending { abort, .. } = entry {
                abort.abort();
            }
        }
    }
}

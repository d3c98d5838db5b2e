use std::path::{Path, PathBuf};

use crate::glog_trace;

/// Path of the descriptor file under `root`.
pub fn descriptor_path(root: &Path, descriptor: &str) -> PathBuf {
    root.join(descriptor)
}

/// Whether `root` holds a descriptor file. A missing root, or any stat
/// error, counts as absent.
pub async fn exists(root: &Path, descriptor: &str) -> bool {
    let path = descriptor_path(root, descriptor);
    let found = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    glog_trace!("locator: {} exists={}", path.display(), found);
    found
}

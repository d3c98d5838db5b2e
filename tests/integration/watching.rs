//! Descriptor edits invalidate cached discovery.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use gobl_tasks::cache::EntryState;
use gobl_tasks::config::Config;

use crate::fixtures::{registry_with, FakeRunner, TestRoot};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_descriptor_edit_invalidates_cache() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, "Tasks:\nbuild\n", "");
    let (registry, _) = registry_with(&Config::default(), &[&root], runner.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = registry
        .watch_with(move |changed| {
            let _ = tx.send(changed.to_path_buf());
        })
        .unwrap();
    assert_eq!(handle.watched().len(), 1);

    assert_eq!(registry.list_tasks().await.len(), 1);
    assert_eq!(registry.cache().state(&root.path), EntryState::Populated);

    runner.succeed(&root.path, "Tasks:\nbuild\ntest\n", "");
    root.write_descriptor("package main\n// edited\n");

    let changed = tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("no change notification")
        .unwrap();
    assert_eq!(changed, root.path);
    assert_eq!(registry.cache().state(&root.path), EntryState::Empty);

    assert_eq!(registry.list_tasks().await.len(), 2);
    assert_eq!(runner.calls_for(&root.path), 2);
}

#[tokio::test]
async fn test_descriptor_delete_empties_listing() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, "Tasks:\nbuild\n", "");
    let (registry, _) = registry_with(&Config::default(), &[&root], runner.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _handle = registry
        .watch_with(move |changed| {
            let _ = tx.send(changed.to_path_buf());
        })
        .unwrap();

    assert_eq!(registry.list_tasks().await.len(), 1);
    std::fs::remove_file(root.path.join("gobl.go")).unwrap();
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("no change notification");

    assert!(registry.list_tasks().await.is_empty());
    assert_eq!(runner.calls_for(&root.path), 1);
}

#[tokio::test]
async fn test_unrelated_files_do_not_invalidate() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, "Tasks:\nbuild\n", "");
    let (registry, _) = registry_with(&Config::default(), &[&root], runner.clone());
    let _handle = registry.watch().unwrap();

    registry.list_tasks().await;
    root.write("main.go", "package main\n");
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(registry.cache().state(&root.path), EntryState::Populated);
    registry.list_tasks().await;
    assert_eq!(runner.calls_for(&root.path), 1);
}

#[tokio::test]
async fn test_closed_handle_stops_invalidating() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, "Tasks:\nbuild\n", "");
    let (registry, _) = registry_with(&Config::default(), &[&root], runner.clone());

    let handle = registry.watch().unwrap();
    registry.list_tasks().await;
    handle.close();

    root.write_descriptor("package main\n// edited\n");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(registry.cache().state(&root.path), EntryState::Populated);
}

//! Listing and resolution through the registry facade.

use std::sync::Arc;
use std::time::Duration;

use gobl_tasks::cache::EntryState;
use gobl_tasks::config::Config;
use gobl_tasks::registry::FAILURE_LINE;
use gobl_tasks::{TaskGroup, TaskIdentifier};

use crate::fixtures::{registry_with, FakeRunner, TestRoot};

const LISTING: &str = "Tasks in project:\nbuild\ntest-unit\nlint\n";

#[tokio::test]
async fn test_listing_scenario() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, LISTING, "");
    let (registry, sink) = registry_with(&Config::default(), &[&root], runner.clone());

    let tasks = registry.list_tasks().await;
    let summary: Vec<_> = tasks
        .iter()
        .map(|t| (t.identifier.as_str(), t.group))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("build", Some(TaskGroup::Build)),
            ("test-unit", Some(TaskGroup::Test)),
            ("lint", None),
        ]
    );
    assert!(tasks.iter().all(|t| t.origin_root == root.path));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_empty_root_spawns_nothing() {
    let root = TestRoot::empty();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, LISTING, "");
    let (registry, sink) = registry_with(&Config::default(), &[&root], runner.clone());

    assert!(registry.list_tasks().await.is_empty());
    assert_eq!(runner.total_calls(), 0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_failing_root_is_isolated() {
    let broken = TestRoot::with_descriptor();
    let healthy = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.fail(&broken.path, "partial output", "gobl.go:3: syntax error");
    runner.succeed(&healthy.path, "Tasks:\nbuild\nlint\n", "");
    let (registry, sink) = registry_with(&Config::default(), &[&broken, &healthy], runner.clone());

    let tasks = registry.list_tasks().await;
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.origin_root == healthy.path));
    assert_eq!(
        sink.lines(),
        vec!["gobl.go:3: syntax error", "partial output", FAILURE_LINE]
    );
    assert_eq!(sink.reveal_count(), 1);
}

#[tokio::test]
async fn test_failed_root_retried_on_next_listing() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.fail(&root.path, "", "boom");
    let (registry, _sink) = registry_with(&Config::default(), &[&root], runner.clone());

    assert!(registry.list_tasks().await.is_empty());
    runner.succeed(&root.path, LISTING, "");
    assert_eq!(registry.list_tasks().await.len(), 3);
    assert_eq!(runner.calls_for(&root.path), 2);
}

#[tokio::test]
async fn test_concurrent_listings_share_one_process_per_root() {
    let a = TestRoot::with_descriptor();
    let b = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::with_delay(Duration::from_millis(50)));
    runner.succeed(&a.path, LISTING, "");
    runner.succeed(&b.path, "Tasks:\ncompile\n", "");
    let (registry, _sink) = registry_with(&Config::default(), &[&a, &b], runner.clone());

    let (first, second) = tokio::join!(registry.list_tasks(), registry.list_tasks());
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
    assert_eq!(runner.calls_for(&a.path), 1);
    assert_eq!(runner.calls_for(&b.path), 1);
}

#[tokio::test]
async fn test_concurrent_listings_report_one_failure() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::with_delay(Duration::from_millis(50)));
    runner.fail(&root.path, "", "gobl.go:3: syntax error");
    let (registry, sink) = registry_with(&Config::default(), &[&root], runner.clone());

    let (first, second) = tokio::join!(registry.list_tasks(), registry.list_tasks());
    assert!(first.is_empty() && second.is_empty());
    assert_eq!(runner.calls_for(&root.path), 1);
    assert_eq!(sink.lines(), vec!["gobl.go:3: syntax error", FAILURE_LINE]);
    assert_eq!(sink.reveal_count(), 1);
}

#[tokio::test]
async fn test_results_concatenate_in_root_order() {
    let a = TestRoot::with_descriptor();
    let b = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&a.path, "Tasks:\nfirst\n", "");
    runner.succeed(&b.path, "Tasks:\nsecond\n", "");
    let (registry, _sink) = registry_with(&Config::default(), &[&a, &b], runner);

    let names: Vec<_> = registry
        .list_tasks()
        .await
        .into_iter()
        .map(|t| t.identifier.to_string())
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn test_invalidation_triggers_fresh_process() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, LISTING, "");
    let (registry, _sink) = registry_with(&Config::default(), &[&root], runner.clone());

    registry.list_tasks().await;
    registry.list_tasks().await;
    assert_eq!(runner.calls_for(&root.path), 1);

    registry.cache().invalidate(&root.path);
    assert_eq!(registry.cache().state(&root.path), EntryState::Empty);
    runner.succeed(&root.path, "Tasks:\nwatch\n", "");

    let tasks = registry.list_tasks().await;
    assert_eq!(runner.calls_for(&root.path), 2);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].identifier, TaskIdentifier::new("watch"));
    assert_eq!(tasks[0].group, Some(TaskGroup::Build));
}

#[tokio::test]
async fn test_duplicate_identifiers_preserved_unless_deduped() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, "Tasks:\nbuild\nbuild\n", "");

    let (registry, _) = registry_with(&Config::default(), &[&root], runner.clone());
    assert_eq!(registry.list_tasks().await.len(), 2);

    let deduping = Config {
        dedupe: true,
        ..Default::default()
    };
    let (registry, _) = registry_with(&deduping, &[&root], runner);
    assert_eq!(registry.list_tasks().await.len(), 1);
}

#[tokio::test]
async fn test_stderr_on_success_reported_once_per_discovery() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, LISTING, "warning: deprecated flag");
    let (registry, sink) = registry_with(&Config::default(), &[&root], runner);

    assert_eq!(registry.list_tasks().await.len(), 3);
    assert_eq!(registry.list_tasks().await.len(), 3);
    assert_eq!(sink.lines(), vec!["warning: deprecated flag"]);
    assert_eq!(sink.reveal_count(), 1);
}

#[tokio::test]
async fn test_host_tasks_carry_run_specs() {
    let root = TestRoot::with_descriptor();
    let runner = Arc::new(FakeRunner::new());
    runner.succeed(&root.path, LISTING, "");
    let config = Config {
        command: "go run ./gobl.go".to_string(),
        ..Default::default()
    };
    let (registry, _) = registry_with(&config, &[&root], runner);

    let commands: Vec<_> = registry
        .provide_tasks()
        .await
        .into_iter()
        .map(|t| t.run_spec.command_line)
        .collect();
    assert_eq!(
        commands,
        vec![
            "go run ./gobl.go build",
            "go run ./gobl.go test-unit",
            "go run ./gobl.go lint",
        ]
    );
}

mod common;

use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{
    ai_config, fast_config, init_test_tracing, processor, urls, CountingProbe, FixedProbe,
    MockClassifier, MockFetcher,
};
use prospector_core::api::{
    AiConfig, ActiveTaskPolicy, CreateOutcome, ErrorKind, Stage, TaskKind, TaskStatus,
};
use prospector_core::task::CANCELLED_MESSAGE;

#[tokio::test]
async fn twenty_urls_with_five_timeouts() {
    init_test_tracing();
    let cfg = fast_config();
    let all = urls("site", 20);
    let slow: Vec<String> = all.iter().step_by(4).cloned().collect();
    assert_eq!(slow.len(), 5);

    let fetcher = Arc::new(MockFetcher::new().with_timeouts(slow));
    let classifier = Arc::new(MockClassifier::default());
    let proc = processor(&cfg, fetcher, classifier.clone());
    let registry = proc.registry().clone();

    let outcome = registry
        .create(all, TaskKind::Classify, ai_config())
        .await
        .unwrap();
    proc.run(outcome.task_id()).await.unwrap();

    let task = registry.get(outcome.task_id()).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.results.len(), 15);
    assert_eq!(task.errors.len(), 5);
    assert!(task
        .errors
        .iter()
        .all(|e| e.error_kind == ErrorKind::TimeoutError && e.stage == Stage::Crawling));
    assert_eq!(task.progress.completed, 20);
    assert!(task.currently_processing.is_empty());
    assert!(task.completed_at.is_some());
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 15);
}

#[tokio::test]
async fn produced_counts_survive_trimming() {
    let mut cfg = fast_config();
    cfg.tasks.max_results_per_task = 3;
    cfg.tasks.max_errors_per_task = 2;
    cfg.tasks.batch_size = 4;

    let all = urls("trim", 10);
    let fetcher = Arc::new(MockFetcher::new().with_timeouts(all[..4].to_vec()));
    let proc = processor(&cfg, fetcher, Arc::new(MockClassifier::default()));
    let registry = proc.registry().clone();

    let id = registry
        .create(all, TaskKind::CrawlOnly, AiConfig::default())
        .await
        .unwrap()
        .task_id()
        .to_string();
    proc.run(&id).await.unwrap();

    let task = registry.get(&id).await.unwrap();
    assert!(task.results.len() <= 3);
    assert!(task.errors.len() <= 2);
    assert_eq!(task.produced.results, 6);
    assert_eq!(task.produced.errors, 4);
    assert_eq!(task.produced.results + task.produced.errors, 10);

    // newest results are the ones kept
    let kept: Vec<&str> = task.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(kept, vec!["https://trim7.test", "https://trim8.test", "https://trim9.test"]);
}

#[tokio::test]
async fn crawl_only_never_calls_the_classifier() {
    let cfg = fast_config();
    let classifier = Arc::new(MockClassifier::default());
    let proc = processor(&cfg, Arc::new(MockFetcher::new()), classifier.clone());
    let registry = proc.registry().clone();

    let id = registry
        .create(urls("plain", 3), TaskKind::CrawlOnly, AiConfig::default())
        .await
        .unwrap()
        .task_id()
        .to_string();
    proc.run(&id).await.unwrap();

    let task = registry.get(&id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.results.iter().all(|r| r.classification.is_none()));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn classify_task_without_key_fails_before_crawling() {
    let cfg = fast_config();
    let fetcher = Arc::new(MockFetcher::new());
    let proc = processor(&cfg, fetcher.clone(), Arc::new(MockClassifier::default()));
    let registry = proc.registry().clone();

    let id = registry
        .create(urls("nokey", 3), TaskKind::Classify, AiConfig::default())
        .await
        .unwrap()
        .task_id()
        .to_string();
    proc.run(&id).await.unwrap();

    let task = registry.get(&id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.errors.len(), 1);
    assert_eq!(task.errors[0].stage, Stage::Initialization);
    assert_eq!(task.errors[0].error_kind, ErrorKind::ConfigError);
    assert_eq!(task.produced.results + task.produced.errors, 0);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancel_stops_all_appends() {
    init_test_tracing();
    let mut cfg = fast_config();
    cfg.tasks.batch_size = 4;
    cfg.tasks.concurrency_normal = 2;

    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(40)));
    let proc = processor(&cfg, fetcher, Arc::new(MockClassifier::default()));
    let registry = proc.registry().clone();

    let id = registry
        .create(urls("cancel", 40), TaskKind::CrawlOnly, AiConfig::default())
        .await
        .unwrap()
        .task_id()
        .to_string();
    let handle = proc.spawn(id.clone());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(registry.cancel(&id).await.unwrap());
    let at_cancel = registry.get(&id).await.unwrap();

    handle.await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after = registry.get(&id).await.unwrap();

    assert_eq!(after.status, TaskStatus::Failed);
    assert_eq!(after.results.len(), at_cancel.results.len());
    assert_eq!(after.errors.len(), at_cancel.errors.len());
    assert_eq!(after.produced, at_cancel.produced);
    assert!(after.currently_processing.is_empty());
    assert!(after.produced.results < 40);
    assert_eq!(
        after.errors.last().map(|e| e.message.as_str()),
        Some(CANCELLED_MESSAGE)
    );

    // a second cancel is a no-op
    assert!(!registry.cancel(&id).await.unwrap());
}

#[tokio::test]
async fn status_and_results_are_idempotent() {
    let cfg = fast_config();
    let fetcher = Arc::new(MockFetcher::new().with_timeouts(vec!["https://same1.test".to_string()]));
    let proc = processor(&cfg, fetcher, Arc::new(MockClassifier::default()));
    let registry = proc.registry().clone();

    let id = registry
        .create(urls("same", 4), TaskKind::Classify, ai_config())
        .await
        .unwrap()
        .task_id()
        .to_string();
    proc.run(&id).await.unwrap();

    let s1 = serde_json::to_string(&registry.status(&id).await.unwrap()).unwrap();
    let s2 = serde_json::to_string(&registry.status(&id).await.unwrap()).unwrap();
    assert_eq!(s1, s2);

    let r1 = serde_json::to_string(&registry.results(&id).await.unwrap()).unwrap();
    let r2 = serde_json::to_string(&registry.results(&id).await.unwrap()).unwrap();
    assert_eq!(r1, r2);
}

#[tokio::test]
async fn capacity_eviction_removes_only_the_oldest_terminal_task() {
    let mut cfg = fast_config();
    cfg.tasks.active_task_policy = ActiveTaskPolicy::AlwaysCreate;
    let proc = processor(&cfg, Arc::new(MockFetcher::new()), Arc::new(MockClassifier::default()));
    let registry = proc.registry().clone();

    let mut ids = Vec::new();
    for i in 0..50 {
        let id = registry
            .create(vec![format!("https://cap{i}.test")], TaskKind::CrawlOnly, AiConfig::default())
            .await
            .unwrap()
            .task_id()
            .to_string();
        proc.run(&id).await.unwrap();
        ids.push(id);
    }
    assert_eq!(registry.len().await, 50);

    let newest = registry
        .create(vec!["https://cap50.test".into()], TaskKind::CrawlOnly, AiConfig::default())
        .await
        .unwrap();

    assert_eq!(registry.len().await, 50);
    assert!(registry.get(&ids[0]).await.is_err());
    assert!(registry.get(&ids[1]).await.is_ok());
    assert_eq!(
        registry.get(newest.task_id()).await.unwrap().status,
        TaskStatus::Pending
    );
}

#[tokio::test]
async fn urls_merged_into_a_running_task_are_processed() {
    let mut cfg = fast_config();
    cfg.tasks.batch_size = 2;
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(30)));
    let proc = processor(&cfg, fetcher, Arc::new(MockClassifier::default()));
    let registry = proc.registry().clone();

    let first = registry
        .create(urls("first", 4), TaskKind::CrawlOnly, AiConfig::default())
        .await
        .unwrap();
    let handle = proc.spawn(first.task_id().to_string());

    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = registry
        .create(urls("second", 3), TaskKind::CrawlOnly, AiConfig::default())
        .await
        .unwrap();
    assert_eq!(
        second,
        CreateOutcome::AddedToExisting {
            task_id: first.task_id().to_string(),
            added: 3,
            total_urls: 7,
        }
    );

    handle.await.unwrap();
    let task = registry.get(first.task_id()).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.produced.results, 7);
    assert_eq!(task.progress, prospector_core::task::Progress { completed: 7, total: 7 });
}

#[tokio::test]
async fn critical_memory_pressure_still_completes() {
    let mut cfg = fast_config();
    cfg.tasks.memory_check_interval = 2;
    cfg.tasks.batch_size = 2;
    let proc = processor(&cfg, Arc::new(MockFetcher::new()), Arc::new(MockClassifier::default()))
        .with_probe(Arc::new(FixedProbe(Some(900))));
    let registry = proc.registry().clone();

    let id = registry
        .create(urls("mem", 6), TaskKind::CrawlOnly, AiConfig::default())
        .await
        .unwrap()
        .task_id()
        .to_string();
    proc.run(&id).await.unwrap();

    let task = registry.get(&id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.produced.results, 6);
}

#[tokio::test]
async fn memory_is_sampled_every_interval_across_batches() {
    let mut cfg = fast_config();
    cfg.tasks.batch_size = 20;
    cfg.tasks.memory_check_interval = 50;
    let probe = Arc::new(CountingProbe::default());
    let proc = processor(&cfg, Arc::new(MockFetcher::new()), Arc::new(MockClassifier::default()))
        .with_probe(probe.clone());
    let registry = proc.registry().clone();

    let id = registry
        .create(urls("cadence", 300), TaskKind::CrawlOnly, AiConfig::default())
        .await
        .unwrap()
        .task_id()
        .to_string();
    proc.run(&id).await.unwrap();

    assert_eq!(registry.get(&id).await.unwrap().status, TaskStatus::Completed);
    assert_eq!(probe.samples.load(Ordering::SeqCst), 6);
}

mod common;

use common::*;
use enricher::cache::{CacheClient, InMemoryCache};
use enricher::enrichment::{cache_key, EnrichmentPipeline, ProcessRunner};
use enricher::error::AppError;
use enricher::fanout::FanOut;
use enricher::models::{DataType, EnrichmentRequest};
use enricher::registry::{PluginRegistry, RegistryIndex};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn url_request(data: &str) -> EnrichmentRequest {
    EnrichmentRequest::new("https://hooks.example.com/results", data, DataType::Url)
}

fn plugin_names(results: &[enricher::models::EnrichmentResult]) -> Vec<String> {
    let mut names: Vec<String> = results
        .iter()
        .map(|r| r.report["plugin"].as_str().unwrap_or_default().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_type_without_plugins_is_an_error() {
    let h = harness(vec![plugin("whois", vec![DataType::Url])], FakeRunner::new());

    let request = EnrichmentRequest::new("https://hooks.example.com", "/tmp/x", DataType::File);
    let err = h.pipeline.execute(&request).await.unwrap_err();

    assert!(matches!(err, AppError::NoEnricher(DataType::File)));
    assert_eq!(err.to_string(), "no enricher for type FILE");
    assert_eq!(h.runner.total_calls(), 0);
}

#[tokio::test]
async fn test_only_disabled_plugins_is_empty_success() {
    let h = harness(
        vec![
            plugin("a", vec![DataType::Hash]).disabled(),
            plugin("b", vec![DataType::Hash]).disabled(),
        ],
        FakeRunner::new(),
    );

    let request = EnrichmentRequest::new("https://hooks.example.com", "d41d8cd9", DataType::Hash);
    let outcome = h.pipeline.execute(&request).await.unwrap();

    assert!(outcome.results.is_empty());
    assert!(outcome.error.is_none());
    assert_eq!(h.runner.total_calls(), 0);
}

#[tokio::test]
async fn test_disabled_plugins_are_skipped() {
    let h = harness(
        vec![
            plugin("on", vec![DataType::Url]),
            plugin("off", vec![DataType::Url]).disabled(),
        ],
        FakeRunner::new(),
    );

    let outcome = h.pipeline.execute(&url_request("a.example")).await.unwrap();

    assert_eq!(plugin_names(&outcome.results), vec!["on"]);
    assert_eq!(h.runner.calls("off"), 0);
}

#[tokio::test]
async fn test_identical_request_served_from_cache() {
    let h = harness(
        vec![plugin("a", vec![DataType::Url]), plugin("b", vec![DataType::Url])],
        FakeRunner::new(),
    );
    let request = url_request("evil.example");

    let first = h.pipeline.execute(&request).await.unwrap();
    assert_eq!(h.runner.total_calls(), 2);

    let second = h.pipeline.execute(&request).await.unwrap();
    assert_eq!(h.runner.total_calls(), 2);
    assert!(second.error.is_none());
    assert_eq!(plugin_names(&first.results), plugin_names(&second.results));

    for result in &second.results {
        assert!(result.errors.is_empty());
        assert_eq!(result.report["data"], json!("evil.example"));
    }
}

#[tokio::test]
async fn test_different_data_is_not_a_cache_hit() {
    let h = harness(vec![plugin("a", vec![DataType::Url])], FakeRunner::new());

    h.pipeline.execute(&url_request("one.example")).await.unwrap();
    h.pipeline.execute(&url_request("two.example")).await.unwrap();

    assert_eq!(h.runner.calls("a"), 2);
}

#[tokio::test]
async fn test_partial_failure_returns_successes_and_error() {
    let h = harness(
        vec![
            plugin("a", vec![DataType::Url]),
            plugin("b", vec![DataType::Url]),
            plugin("c", vec![DataType::Url]),
            plugin("d", vec![DataType::Url]),
        ],
        FakeRunner::new().failing("b").failing("d"),
    );

    let outcome = h.pipeline.execute(&url_request("x.example")).await.unwrap();

    assert_eq!(plugin_names(&outcome.results), vec!["a", "c"]);
    let error = outcome.error.expect("failures must be reported");
    let mut sources = error.sources();
    sources.sort();
    assert_eq!(sources, vec!["b", "d"]);
    assert!(error.to_string().contains("boom"));
}

#[tokio::test]
async fn test_successes_cached_with_plugin_ttl() {
    let h = harness(
        vec![plugin("short", vec![DataType::Url]).with_cache_ttl(1)],
        FakeRunner::new(),
    );
    let request = url_request("ttl.example");
    let key = cache_key("short", "ttl.example", DataType::Url);

    h.pipeline.execute(&request).await.unwrap();
    let cached = h.cache.get(&key).await.unwrap();
    let report: serde_json::Value = serde_json::from_slice(&cached).unwrap();
    assert_eq!(report["plugin"], json!("short"));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(matches!(h.cache.get(&key).await, Err(AppError::NotFound(_))));

    h.pipeline.execute(&request).await.unwrap();
    assert_eq!(h.runner.calls("short"), 2);
}

#[tokio::test]
async fn test_failures_are_never_cached() {
    let h = harness(
        vec![plugin("ok", vec![DataType::Url]), plugin("bad", vec![DataType::Url])],
        FakeRunner::new().failing("bad"),
    );
    let request = url_request("retry.example");

    h.pipeline.execute(&request).await.unwrap();
    assert!(h
        .cache
        .get(&cache_key("bad", "retry.example", DataType::Url))
        .await
        .is_err());

    let outcome = h.pipeline.execute(&request).await.unwrap();
    assert_eq!(h.runner.calls("bad"), 2);
    assert_eq!(h.runner.calls("ok"), 1);
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn test_only_uncached_plugin_runs() {
    let h = harness(
        vec![plugin("a", vec![DataType::Url]), plugin("b", vec![DataType::Url])],
        FakeRunner::new(),
    );

    let cached = serde_json::to_vec(&json!({"plugin": "a", "data": "cached"})).unwrap();
    h.cache
        .set(&cache_key("a", "site.example", DataType::Url), cached)
        .await
        .unwrap();

    let outcome = h.pipeline.execute(&url_request("site.example")).await.unwrap();

    assert_eq!(h.runner.calls("a"), 0);
    assert_eq!(h.runner.calls("b"), 1);
    assert_eq!(plugin_names(&outcome.results), vec!["a", "b"]);
    assert!(outcome.error.is_none());

    let from_cache = outcome
        .results
        .iter()
        .find(|r| r.report["plugin"] == json!("a"))
        .unwrap();
    assert_eq!(from_cache.report["data"], json!("cached"));
}

#[tokio::test]
async fn test_undecodable_cache_entry_is_a_miss() {
    let h = harness(vec![plugin("a", vec![DataType::Url])], FakeRunner::new());
    h.cache
        .set(&cache_key("a", "junk.example", DataType::Url), b"not json".to_vec())
        .await
        .unwrap();

    let outcome = h.pipeline.execute(&url_request("junk.example")).await.unwrap();

    assert_eq!(h.runner.calls("a"), 1);
    assert_eq!(outcome.results.len(), 1);
}

#[tokio::test]
async fn test_cache_backend_errors_are_soft() {
    let registry = Arc::new(PluginRegistry::from_index(RegistryIndex::from_plugins(vec![
        plugin("a", vec![DataType::Url]),
    ])));
    let runner = Arc::new(FakeRunner::new());
    let pipeline = EnrichmentPipeline::new(
        registry,
        Arc::new(BrokenCache),
        runner.clone(),
        FanOut::unbounded(),
    );

    let outcome = pipeline.execute(&url_request("down.example")).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.error.is_none());
    assert_eq!(runner.calls("a"), 1);
}

#[tokio::test]
async fn test_plugin_concurrency_is_bounded() {
    let plugins: Vec<_> = (0..6)
        .map(|i| plugin(&format!("p{}", i), vec![DataType::Username]))
        .collect();
    let registry = Arc::new(PluginRegistry::from_index(RegistryIndex::from_plugins(plugins)));
    let runner = Arc::new(FakeRunner::new().with_delay(Duration::from_millis(30)));
    let pipeline = EnrichmentPipeline::new(
        registry,
        Arc::new(InMemoryCache::new()),
        runner.clone(),
        FanOut::new(2),
    );

    let request = EnrichmentRequest::new("https://hooks.example.com", "jdoe", DataType::Username);
    let outcome = pipeline.execute(&request).await.unwrap();

    assert_eq!(outcome.results.len(), 6);
    assert!(runner.peak() <= 2);
}

#[tokio::test]
async fn test_process_plugins_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    write_plugin_dir(
        root.path(),
        "reputation",
        &manifest_json("reputation", &["URL"]),
        Some(&echo_script("reputation")),
    );
    write_plugin_dir(
        root.path(),
        "crashy",
        &manifest_json("crashy", &["URL"]),
        Some("echo 'missing API key' >&2\nexit 2"),
    );

    let registry = Arc::new(PluginRegistry::new(root.path(), "settings.json"));
    let pipeline = EnrichmentPipeline::new(
        registry,
        Arc::new(InMemoryCache::new()),
        Arc::new(ProcessRunner::new(Duration::from_secs(10))),
        FanOut::unbounded(),
    );

    let outcome = pipeline.execute(&url_request("phish.example")).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].report["plugin"], json!("reputation"));
    assert_eq!(outcome.results[0].report["data"], json!("phish.example"));

    let error = outcome.error.unwrap();
    assert_eq!(error.sources(), vec!["crashy"]);
    assert!(error.to_string().contains("missing API key"));
}

#[tokio::test]
async fn test_execution_deadline_fails_only_slow_plugin() {
    let root = tempfile::tempdir().unwrap();
    write_plugin_dir(
        root.path(),
        "fast",
        &manifest_json("fast", &["HASH"]),
        Some(&echo_script("fast")),
    );

    let mut slow = manifest_json("slow", &["HASH"]);
    slow["executionTimeout"] = json!(1);
    write_plugin_dir(
        root.path(),
        "slow",
        &slow,
        Some(&format!("sleep 5\n{}", echo_script("slow"))),
    );

    let registry = Arc::new(PluginRegistry::new(root.path(), "settings.json"));
    let pipeline = EnrichmentPipeline::new(
        registry,
        Arc::new(InMemoryCache::new()),
        Arc::new(ProcessRunner::new(Duration::from_secs(30))),
        FanOut::unbounded(),
    );

    let request = EnrichmentRequest::new("https://hooks.example.com", "e3b0c442", DataType::Hash);
    let started = std::time::Instant::now();
    let outcome = pipeline.execute(&request).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(plugin_names(&outcome.results), vec!["fast"]);

    let error = outcome.error.unwrap();
    assert_eq!(error.sources(), vec!["slow"]);
    assert!(matches!(error.failures()[0].error, AppError::Timeout(_)));
}

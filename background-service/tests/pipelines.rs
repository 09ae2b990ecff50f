use async_trait::async_trait;
use background_service::{
    Collaborators, DiscoveryMode, Notifier, Orchestrator, PipelineKind, RedditDiscovery, RunStatus,
};
use chrono::{Duration, Utc};
use content_store::{InMemoryDocumentStore, InMemorySeenRegistry, SeenRegistry};
use llm_interface::GenerationChain;
use outreach_core::{AppConfig, CoreError, RawPost, RecordStatus, RecordType, SourceError};
use source_client::{FetchQuery, PostSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serves the same posts for the `solana` listing and nothing elsewhere.
struct FixedSource {
    posts: Vec<RawPost>,
    fail_origin: Option<&'static str>,
}

#[async_trait]
impl PostSource for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<RawPost>, CoreError> {
        match query {
            FetchQuery::Listing { origin, .. } if Some(origin.as_str()) == self.fail_origin => {
                Err(SourceError::ServerError { status_code: 503 }.into())
            }
            FetchQuery::Listing { origin, .. } if origin == "solana" => Ok(self.posts.clone()),
            _ => Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, text: &str) -> Result<(), CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(text.to_string());
        }
        Ok(())
    }
}

struct Harness {
    config: AppConfig,
    deps: Collaborators,
    store: Arc<InMemoryDocumentStore>,
    seen: Arc<InMemorySeenRegistry>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(posts: Vec<RawPost>) -> Harness {
    harness_with(posts, None)
}

fn harness_with(posts: Vec<RawPost>, fail_origin: Option<&'static str>) -> Harness {
    let mut config = AppConfig::default();
    config.discovery.call_delay_ms = 0;
    config.hackernews.enabled = false;
    config.reddit.search_terms.clear();
    config.notion.retry_base_delay_ms = 1;

    let store = Arc::new(InMemoryDocumentStore::new());
    let seen = Arc::new(InMemorySeenRegistry::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let deps = Collaborators {
        reddit: Arc::new(FixedSource { posts, fail_origin }),
        hackernews: None,
        generator: Arc::new(GenerationChain::from_config(&config.generation)),
        store: store.clone(),
        seen: seen.clone(),
        notifier: notifier.clone(),
    };

    Harness {
        config,
        deps,
        store,
        seen,
        notifier,
    }
}

fn scenario_post(hours_old: i64) -> RawPost {
    RawPost {
        id: "t3_abc123".to_string(),
        title: "Best API for Solana wallet data".to_string(),
        body: "Which API do people use? I need a wallet api that returns token balances."
            .to_string(),
        origin: "solana".to_string(),
        author: "sol_builder".to_string(),
        score: 15,
        num_comments: 4,
        created_at: Utc::now() - Duration::hours(hours_old),
        permalink: "https://www.reddit.com/r/solana/comments/abc123/best_api/".to_string(),
    }
}

#[tokio::test]
async fn test_scenario_post_becomes_one_write() {
    let h = harness(vec![scenario_post(2)]);
    let discovery = RedditDiscovery::new(&h.config, &h.deps);

    let outcome = discovery.run(DiscoveryMode::Live).await.unwrap();
    assert_eq!(outcome.opportunities.len(), 1);

    let opportunity = &outcome.opportunities[0];
    assert!((45..=75).contains(&opportunity.score), "score {}", opportunity.score);
    assert!(opportunity.matched_keywords.contains("wallet api"));
    assert!(!opportunity.response.as_deref().unwrap_or_default().trim().is_empty());

    assert_eq!(h.store.create_calls(), 1);
    let records = h.store.records().await;
    assert_eq!(records[0].record.record_type, RecordType::RedditOpportunity);
    assert_eq!(records[0].record.status, RecordStatus::Generated);
    assert_eq!(records[0].record.priority, opportunity.score);

    assert!(outcome.counters.notified);
    assert_eq!(h.notifier.calls.load(Ordering::SeqCst), 1);
    assert!(h.seen.has_seen("t3_abc123").await.unwrap());
}

#[tokio::test]
async fn test_second_run_surfaces_nothing_new() {
    let h = harness(vec![scenario_post(2)]);
    let discovery = RedditDiscovery::new(&h.config, &h.deps);

    discovery.run(DiscoveryMode::Live).await.unwrap();
    let second = discovery.run(DiscoveryMode::Live).await.unwrap();

    assert!(second.opportunities.is_empty());
    assert_eq!(second.counters.already_seen, 1);
    assert_eq!(h.store.create_calls(), 1);
    assert_eq!(h.notifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stale_post_is_rejected() {
    let h = harness(vec![scenario_post(24 * 10)]);
    let discovery = RedditDiscovery::new(&h.config, &h.deps);

    let outcome = discovery.run(DiscoveryMode::Live).await.unwrap();
    assert!(outcome.opportunities.is_empty());
    assert_eq!(outcome.counters.rejected, 1);
    assert_eq!(h.store.create_calls(), 0);
}

#[tokio::test]
async fn test_empty_batch_sends_no_notification() {
    let h = harness(Vec::new());
    let discovery = RedditDiscovery::new(&h.config, &h.deps);

    let outcome = discovery.run(DiscoveryMode::Live).await.unwrap();
    assert!(!outcome.counters.notified);
    assert_eq!(h.notifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failing_origin_is_a_partial_failure() {
    let h = harness_with(vec![scenario_post(2)], Some("ethdev"));
    let orchestrator = Orchestrator::new(&h.config, h.deps.clone());

    let report = orchestrator.run(PipelineKind::Reddit).await;
    assert_eq!(report.status, RunStatus::PartialFailure);
    assert_eq!(report.counters.fetch_failures, 1);
    assert_eq!(report.counters.persisted, 1);
}

#[tokio::test]
async fn test_clear_cache_allows_rediscovery() {
    let h = harness(vec![scenario_post(2)]);
    let orchestrator = Orchestrator::new(&h.config, h.deps.clone());

    let first = orchestrator.run(PipelineKind::Reddit).await;
    assert_eq!(first.status, RunStatus::Success);
    assert_eq!(first.counters.persisted, 1);

    assert_eq!(orchestrator.clear_cache().await.unwrap(), 1);
    let again = orchestrator.run(PipelineKind::Reddit).await;
    assert_eq!(again.counters.persisted, 1);
    assert_eq!(h.store.create_calls(), 2);
}

#[tokio::test]
async fn test_run_all_runs_each_pipeline() {
    let h = harness(vec![scenario_post(2)]);
    let orchestrator = Orchestrator::new(&h.config, h.deps.clone());

    let report = orchestrator.run_all().await;
    assert_eq!(report.pipeline, PipelineKind::All);
    assert_eq!(report.stages.len(), 3);
    assert_eq!(report.status, RunStatus::Success);

    // reddit opportunity, blog post, social post
    assert_eq!(h.store.create_calls(), 3);
    let records = h.store.records().await;
    let blog = records
        .iter()
        .find(|s| s.record.record_type == RecordType::BlogPost)
        .unwrap();
    assert_eq!(blog.record.status, RecordStatus::ReadyToPublish);
}

use crate::{FetchQuery, PostSource};
use futures::future::join_all;
use outreach_core::{CoreError, DiscoveryConfig, ErrorExt, ErrorRecovery, RawPost, Stage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Calls in flight at once. 1 keeps them strictly sequential.
    pub concurrency: usize,
    /// Minimum spacing between the starts of successive calls.
    pub call_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            call_delay: Duration::from_secs(2),
            call_timeout: Duration::from_secs(20),
        }
    }
}

impl From<&DiscoveryConfig> for SchedulerConfig {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            call_delay: Duration::from_millis(config.call_delay_ms),
            call_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }
}

/// Hands out call slots no closer together than `spacing`.
#[derive(Debug)]
struct CallPacer {
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl CallPacer {
    fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let start = match *next_slot {
            Some(slot) if slot > now => {
                debug!("Pacing source call, waiting {:?}", slot - now);
                sleep_until(slot).await;
                slot
            }
            _ => now,
        };
        *next_slot = Some(start + self.spacing);
    }
}

/// Per-query results of one batch, in query order.
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub results: Vec<Vec<RawPost>>,
    pub failed_calls: usize,
}

impl FetchBatch {
    pub fn total_posts(&self) -> usize {
        self.results.iter().map(Vec::len).sum()
    }
}

/// Runs batches of queries against a source under a concurrency limit, a
/// call spacing and a per-call timeout. A failed call yields an empty result
/// and never affects its siblings.
#[derive(Debug, Clone)]
pub struct FetchScheduler {
    config: SchedulerConfig,
    semaphore: Arc<Semaphore>,
    pacer: Arc<CallPacer>,
}

impl FetchScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let concurrency = config.concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            pacer: Arc::new(CallPacer::new(config.call_delay)),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub async fn run(&self, source: &dyn PostSource, queries: &[FetchQuery]) -> FetchBatch {
        let outcomes = join_all(queries.iter().map(|query| self.fetch_one(source, query))).await;

        let mut batch = FetchBatch::default();
        for outcome in outcomes {
            match outcome {
                Ok(posts) => batch.results.push(posts),
                Err(()) => {
                    batch.failed_calls += 1;
                    batch.results.push(Vec::new());
                }
            }
        }

        info!(
            source = source.name(),
            queries = queries.len(),
            posts = batch.total_posts(),
            failed = batch.failed_calls,
            "Fetch batch complete"
        );
        batch
    }

    async fn fetch_one(&self, source: &dyn PostSource, query: &FetchQuery) -> Result<Vec<RawPost>, ()> {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Err(()),
        };
        self.pacer.wait_turn().await;

        let result = match timeout(self.config.call_timeout, source.fetch(query)).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout {
                seconds: self.config.call_timeout.as_secs(),
            }),
        };

        result.map_err(|error| {
            let strategy = ErrorRecovery::determine_strategy(&error, Stage::Fetch);
            warn!(
                source = source.name(),
                query = %query,
                code = %error.error_code(),
                ?strategy,
                "Source call failed, continuing with an empty result: {}",
                error
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use outreach_core::{SourceError, TimeWindow};
    use std::sync::Mutex as StdMutex;

    struct ScriptedSource {
        calls: StdMutex<Vec<(String, std::time::Instant)>>,
        hang_on: Option<String>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                hang_on: None,
            }
        }
    }

    fn post(id: &str) -> RawPost {
        RawPost {
            id: id.to_string(),
            title: id.to_string(),
            body: String::new(),
            origin: "test".to_string(),
            author: "a".to_string(),
            score: 1,
            num_comments: 0,
            created_at: Utc::now(),
            permalink: format!("https://example.com/{}", id),
        }
    }

    #[async_trait]
    impl PostSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self, query: &FetchQuery) -> Result<Vec<RawPost>, CoreError> {
            let label = query.to_string();
            self.calls
                .lock()
                .unwrap()
                .push((label.clone(), std::time::Instant::now()));

            if self.hang_on.as_deref() == Some(label.as_str()) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            match query {
                FetchQuery::Listing { origin, .. } if origin == "broken" => {
                    Err(CoreError::Source(SourceError::InvalidResponse {
                        details: "truncated".to_string(),
                    }))
                }
                FetchQuery::Listing { origin, .. } => Ok(vec![post(&format!("{}-1", origin))]),
                FetchQuery::Search { term, .. } => Ok(vec![post(term), post(&format!("{}-2", term))]),
            }
        }
    }

    fn queries(origins: &[&str]) -> Vec<FetchQuery> {
        origins
            .iter()
            .map(|o| FetchQuery::listing(*o, 10, TimeWindow::Hours(48)))
            .collect()
    }

    fn fast(concurrency: usize, delay_ms: u64) -> FetchScheduler {
        FetchScheduler::new(SchedulerConfig {
            concurrency,
            call_delay: Duration::from_millis(delay_ms),
            call_timeout: Duration::from_millis(200),
        })
    }

    #[tokio::test]
    async fn test_failures_yield_empty_results_in_order() {
        let source = ScriptedSource::new();
        let scheduler = fast(1, 0);

        let batch = scheduler
            .run(&source, &queries(&["solana", "broken", "ethdev"]))
            .await;

        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.results[0][0].id, "solana-1");
        assert!(batch.results[1].is_empty());
        assert_eq!(batch.results[2][0].id, "ethdev-1");
        assert_eq!(batch.failed_calls, 1);
        assert_eq!(batch.total_posts(), 2);
    }

    #[tokio::test]
    async fn test_sequential_calls_are_spaced() {
        let source = ScriptedSource::new();
        let scheduler = fast(1, 40);

        scheduler.run(&source, &queries(&["a", "b", "c"])).await;

        let calls = source.calls.lock().unwrap();
        let labels: Vec<_> = calls.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["listing:a", "listing:b", "listing:c"]);
        for pair in calls.windows(2) {
            assert!(pair[1].1.duration_since(pair[0].1) >= Duration::from_millis(35));
        }
    }

    #[tokio::test]
    async fn test_timed_out_call_does_not_block_siblings() {
        let mut source = ScriptedSource::new();
        source.hang_on = Some("listing:slow".to_string());
        let scheduler = fast(2, 0);

        let batch = scheduler
            .run(&source, &queries(&["slow", "solana"]))
            .await;

        assert!(batch.results[0].is_empty());
        assert_eq!(batch.results[1].len(), 1);
        assert_eq!(batch.failed_calls, 1);
    }

    #[test]
    fn test_config_from_discovery_settings() {
        let config = SchedulerConfig::from(&DiscoveryConfig::default());
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.call_delay, Duration::from_secs(2));
        assert_eq!(config.call_timeout, Duration::from_secs(20));
    }
}

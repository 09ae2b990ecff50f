//! Reddit opportunity discovery: fetch, filter, score, deduplicate, rank,
//! then respond, persist and notify.

use crate::notify::{notify_batch, Notifier};
use crate::publish::Publisher;
use crate::respond::ResponseDispatcher;
use crate::{Collaborators, RunCounters};
use chrono::{DateTime, Utc};
use content_store::SeenRegistry;
use outreach_core::{
    AppConfig, ContentRecord, CoreError, ErrorExt, Opportunity, RawPost, RetryConfig, SourceConfig,
    TimeWindow,
};
use relevance_engine::{RelevanceFilter, Rule, Scorer, Verdict};
use serde::{Deserialize, Serialize};
use source_client::{FetchQuery, FetchScheduler, PostSource, SchedulerConfig};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Recent posts inside the freshness window.
    Live,
    /// Top posts of the last `months` months.
    Backfill { months: u32 },
}

#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// Dispatched opportunities, highest score first.
    pub opportunities: Vec<Opportunity>,
    pub counters: RunCounters,
}

/// Where queries go and which source config judges their results.
#[derive(Debug, Clone)]
struct QueryPlan {
    reddit: Vec<(FetchQuery, SourceConfig)>,
    hackernews: Vec<(FetchQuery, SourceConfig)>,
}

pub struct RedditDiscovery {
    reddit: Arc<dyn PostSource>,
    hackernews: Option<Arc<dyn PostSource>>,
    scheduler: FetchScheduler,
    filter: RelevanceFilter,
    scorer: Scorer,
    seen: Arc<dyn SeenRegistry>,
    responder: ResponseDispatcher,
    publisher: Publisher,
    notifier: Arc<dyn Notifier>,
    subreddits: Vec<SourceConfig>,
    search_terms: Vec<String>,
    search_source: SourceConfig,
    hackernews_terms: Vec<String>,
    hackernews_source: SourceConfig,
    freshness_hours: u32,
    top_n: usize,
}

impl RedditDiscovery {
    pub fn new(config: &AppConfig, deps: &Collaborators) -> Self {
        let freshness = TimeWindow::Hours(config.discovery.freshness_hours);
        let hackernews = if config.hackernews.enabled {
            deps.hackernews.clone()
        } else {
            None
        };

        Self {
            reddit: deps.reddit.clone(),
            hackernews,
            scheduler: FetchScheduler::new(SchedulerConfig::from(&config.discovery)),
            filter: RelevanceFilter::new(Rule::from_config(&config.rules), freshness),
            scorer: Scorer::new(
                config.scoring.clone(),
                config.discovery.min_opportunity_score,
            ),
            seen: deps.seen.clone(),
            responder: ResponseDispatcher::new(
                deps.generator.clone(),
                config.generation.audience.clone(),
            ),
            publisher: Publisher::new(
                deps.store.clone(),
                RetryConfig::persistence(
                    config.notion.retry_attempts,
                    config.notion.retry_base_delay_ms,
                ),
            ),
            notifier: deps.notifier.clone(),
            subreddits: config.reddit.subreddits.clone(),
            search_terms: config.reddit.search_terms.clone(),
            search_source: config.reddit.search.clone(),
            hackernews_terms: config.hackernews.search_terms.clone(),
            hackernews_source: config.hackernews.source_config(),
            freshness_hours: config.discovery.freshness_hours,
            top_n: config.discovery.top_n,
        }
    }

    pub fn window(&self, mode: DiscoveryMode) -> TimeWindow {
        match mode {
            DiscoveryMode::Live => TimeWindow::Hours(self.freshness_hours),
            DiscoveryMode::Backfill { months } => TimeWindow::Months(months.max(1)),
        }
    }

    fn plan(&self, window: TimeWindow) -> QueryPlan {
        let reddit = self
            .subreddits
            .iter()
            .map(|source| {
                (
                    FetchQuery::listing(source.origin.clone(), source.max_posts, window),
                    source.clone(),
                )
            })
            .chain(self.search_terms.iter().map(|term| {
                (
                    FetchQuery::search(term.clone(), self.search_source.max_posts, window),
                    self.search_source.clone(),
                )
            }))
            .collect();

        let hackernews = match self.hackernews {
            Some(_) => self
                .hackernews_terms
                .iter()
                .map(|term| {
                    (
                        FetchQuery::search(term.clone(), self.hackernews_source.max_posts, window),
                        self.hackernews_source.clone(),
                    )
                })
                .collect(),
            None => Vec::new(),
        };

        QueryPlan { reddit, hackernews }
    }

    async fn fetch_all(
        &self,
        plan: QueryPlan,
        counters: &mut RunCounters,
    ) -> Vec<(RawPost, SourceConfig)> {
        let mut candidates = Vec::new();
        let mut groups = vec![(Some(self.reddit.clone()), plan.reddit)];
        groups.push((self.hackernews.clone(), plan.hackernews));

        for (source, planned) in groups {
            let Some(source) = source else { continue };
            if planned.is_empty() {
                continue;
            }

            let (queries, configs): (Vec<FetchQuery>, Vec<SourceConfig>) =
                planned.into_iter().unzip();
            let batch = self.scheduler.run(source.as_ref(), &queries).await;
            counters.fetch_failures += batch.failed_calls;

            for (posts, config) in batch.results.into_iter().zip(configs) {
                counters.fetched += posts.len();
                candidates.extend(posts.into_iter().map(|post| (post, config.clone())));
            }
        }
        candidates
    }

    /// Filter, score and deduplicate, keeping fetch order.
    async fn select(
        &self,
        candidates: Vec<(RawPost, SourceConfig)>,
        filter: &RelevanceFilter,
        now: DateTime<Utc>,
        counters: &mut RunCounters,
    ) -> Vec<Opportunity> {
        let mut in_run = HashSet::new();
        let mut selected = Vec::new();

        for (post, source) in candidates {
            let matched = match filter.evaluate(&post, &source, now) {
                Verdict::Accepted { matched } => matched,
                Verdict::Rejected(_) => {
                    counters.rejected += 1;
                    continue;
                }
            };
            counters.accepted += 1;

            let Some(score) = self.scorer.evaluate(&post, &matched, &source, now) else {
                counters.below_threshold += 1;
                continue;
            };

            if !in_run.insert(post.id.clone()) {
                counters.duplicates += 1;
                continue;
            }
            match self.seen.has_seen(&post.id).await {
                Ok(true) => {
                    counters.already_seen += 1;
                    continue;
                }
                Ok(false) => {}
                Err(error) => {
                    error.log_warn();
                    warn!(post_id = %post.id, "Seen lookup failed, skipping post");
                    counters.seen_failures += 1;
                    continue;
                }
            }

            debug!(post_id = %post.id, origin = %post.origin, score, "Opportunity candidate");
            selected.push(Opportunity::new(post, matched, score));
        }
        selected
    }

    /// Mark each opportunity seen, dropping the ones the registry could not
    /// record so they surface again on a later run.
    async fn claim(
        &self,
        opportunities: Vec<Opportunity>,
        counters: &mut RunCounters,
    ) -> Vec<Opportunity> {
        let mut claimed = Vec::with_capacity(opportunities.len());
        for opportunity in opportunities {
            if let Err(error) = self.seen.mark_seen(opportunity.id()).await {
                error.log_warn();
                warn!(post_id = %opportunity.id(), "Could not mark post seen, skipping");
                counters.seen_failures += 1;
                continue;
            }
            claimed.push(opportunity);
        }
        claimed
    }

    pub async fn run(&self, mode: DiscoveryMode) -> Result<DiscoveryOutcome, CoreError> {
        let now = Utc::now();
        let window = self.window(mode);
        let filter = self.filter.with_freshness(window);
        let mut counters = RunCounters::default();

        self.responder.chain().begin_run();
        info!(?mode, ?window, "Starting Reddit discovery");

        let candidates = self.fetch_all(self.plan(window), &mut counters).await;
        let mut ranked = self.select(candidates, &filter, now, &mut counters).await;

        // Stable sort keeps fetch order among equal scores
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(self.top_n);

        let mut opportunities = self.claim(ranked, &mut counters).await;
        counters.dispatched = opportunities.len();

        for opportunity in &mut opportunities {
            let keywords: Vec<String> = opportunity.matched_keywords.iter().cloned().collect();
            let (response, fell_back) = self.responder.respond(opportunity, &keywords).await;
            if fell_back {
                counters.generation_fallbacks += 1;
            }
            opportunity.response = Some(response);
        }

        let records: Vec<ContentRecord> = opportunities
            .iter()
            .map(ContentRecord::from_opportunity)
            .collect();
        let report = self.publisher.publish_batch(&records).await;
        counters.persisted = report.written();
        counters.persist_failures = report.failed + report.skipped;

        counters.notified = notify_batch(self.notifier.as_ref(), &opportunities).await;

        info!(
            fetched = counters.fetched,
            accepted = counters.accepted,
            dispatched = counters.dispatched,
            persisted = counters.persisted,
            "Reddit discovery complete"
        );
        Ok(DiscoveryOutcome {
            opportunities,
            counters,
        })
    }
}

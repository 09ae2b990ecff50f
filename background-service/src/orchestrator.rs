use crate::content::{BlogPipeline, SocialPipeline};
use crate::discovery::{DiscoveryMode, RedditDiscovery};
use crate::{Collaborators, RunCounters};
use chrono::{DateTime, Utc};
use content_store::SeenRegistry;
use outreach_core::{AppConfig, CoreError, ErrorExt, ScheduleConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Reddit,
    RedditBackfill,
    Blog,
    Social,
    All,
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineKind::Reddit => "reddit",
            PipelineKind::RedditBackfill => "reddit_backfill",
            PipelineKind::Blog => "blog",
            PipelineKind::Social => "social",
            PipelineKind::All => "all",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialFailure,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub pipeline: PipelineKind,
    pub status: RunStatus,
    pub message: String,
    pub counters: RunCounters,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Per-pipeline reports of an `all` run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<RunReport>,
}

impl RunReport {
    fn from_result(
        pipeline: PipelineKind,
        started_at: DateTime<Utc>,
        clock: Instant,
        result: Result<RunCounters, CoreError>,
    ) -> Self {
        let (status, message, counters) = match result {
            Ok(counters) if counters.failures() == 0 => (
                RunStatus::Success,
                format!(
                    "{} run complete: {} dispatched, {} persisted",
                    pipeline, counters.dispatched, counters.persisted
                ),
                counters,
            ),
            Ok(counters) => (
                RunStatus::PartialFailure,
                format!(
                    "{} run finished with {} fetch failures and {} persistence failures",
                    pipeline, counters.fetch_failures, counters.persist_failures
                ),
                counters,
            ),
            Err(e) => {
                e.log_error();
                (
                    RunStatus::Error,
                    format!("{} run failed: {}", pipeline, e.user_friendly_message()),
                    RunCounters::default(),
                )
            }
        };

        Self {
            run_id: Uuid::new_v4(),
            pipeline,
            status,
            message,
            counters,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            stages: Vec::new(),
        }
    }

    fn combine(started_at: DateTime<Utc>, clock: Instant, stages: Vec<RunReport>) -> Self {
        let mut counters = RunCounters::default();
        for stage in &stages {
            counters.merge(&stage.counters);
        }

        let failed = stages.iter().filter(|s| s.status == RunStatus::Error).count();
        let status = if failed == stages.len() && !stages.is_empty() {
            RunStatus::Error
        } else if failed > 0 || stages.iter().any(|s| s.status != RunStatus::Success) {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        };
        let message = stages
            .iter()
            .map(|s| s.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            run_id: Uuid::new_v4(),
            pipeline: PipelineKind::All,
            status,
            message,
            counters,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            stages,
        }
    }
}

/// Owns the pipelines and runs them one at a time.
pub struct Orchestrator {
    discovery: RedditDiscovery,
    blog: BlogPipeline,
    social: SocialPipeline,
    seen: Arc<dyn SeenRegistry>,
    schedule: ScheduleConfig,
    backfill_months: u32,
    run_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(config: &AppConfig, deps: Collaborators) -> Self {
        Self {
            discovery: RedditDiscovery::new(config, &deps),
            blog: BlogPipeline::new(config, &deps),
            social: SocialPipeline::new(config, &deps),
            seen: deps.seen.clone(),
            schedule: config.schedule.clone(),
            backfill_months: config.discovery.backfill_months,
            run_lock: Mutex::new(()),
        }
    }

    /// Waits for any run in progress, then runs `kind`.
    pub async fn run(&self, kind: PipelineKind) -> RunReport {
        let _guard = self.run_lock.lock().await;
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(pipeline = %kind, "Pipeline run started");

        let report = match kind {
            PipelineKind::All => {
                let mut stages = Vec::new();
                for stage in [PipelineKind::Reddit, PipelineKind::Blog, PipelineKind::Social] {
                    let stage_started = Utc::now();
                    let stage_clock = Instant::now();
                    let result = self.execute(stage).await;
                    stages.push(RunReport::from_result(stage, stage_started, stage_clock, result));
                }
                RunReport::combine(started_at, clock, stages)
            }
            single => {
                let result = self.execute(single).await;
                RunReport::from_result(single, started_at, clock, result)
            }
        };

        match report.status {
            RunStatus::Success => info!(pipeline = %kind, duration_ms = report.duration_ms, "{}", report.message),
            RunStatus::PartialFailure => warn!(pipeline = %kind, duration_ms = report.duration_ms, "{}", report.message),
            RunStatus::Error => error!(pipeline = %kind, duration_ms = report.duration_ms, "{}", report.message),
        }
        report
    }

    pub async fn run_all(&self) -> RunReport {
        self.run(PipelineKind::All).await
    }

    async fn execute(&self, kind: PipelineKind) -> Result<RunCounters, CoreError> {
        match kind {
            PipelineKind::Reddit => Ok(self.discovery.run(DiscoveryMode::Live).await?.counters),
            PipelineKind::RedditBackfill => Ok(self
                .discovery
                .run(DiscoveryMode::Backfill {
                    months: self.backfill_months,
                })
                .await?
                .counters),
            PipelineKind::Blog => self.blog.run().await,
            PipelineKind::Social => self.social.run().await,
            PipelineKind::All => Err(CoreError::InvalidInput {
                message: "nested all-pipelines run".to_string(),
            }),
        }
    }

    /// Forget every seen post id. Returns how many were removed.
    pub async fn clear_cache(&self) -> Result<usize, CoreError> {
        let _guard = self.run_lock.lock().await;
        let removed = self.seen.len().await?;
        self.seen.clear().await?;
        info!(removed, "Seen-post registry cleared");
        Ok(removed)
    }

    /// One periodic task per pipeline with a non-zero interval. The first run
    /// of each happens one interval after start.
    pub fn spawn_schedule(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        if !self.schedule.enabled {
            info!("Pipeline schedule disabled");
            return Vec::new();
        }

        let intervals = [
            (PipelineKind::Reddit, self.schedule.reddit_interval_minutes),
            (PipelineKind::Blog, self.schedule.blog_interval_minutes),
            (PipelineKind::Social, self.schedule.social_interval_minutes),
        ];

        intervals
            .into_iter()
            .filter(|(_, minutes)| *minutes > 0)
            .map(|(kind, minutes)| {
                let orchestrator = Arc::clone(self);
                info!(pipeline = %kind, minutes, "Scheduling pipeline");
                tokio::spawn(async move {
                    let mut ticker = interval(Duration::from_secs(minutes * 60));
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        orchestrator.run(kind).await;
                    }
                })
            })
            .collect()
    }
}

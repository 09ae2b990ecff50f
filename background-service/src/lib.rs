//! The pipelines and the orchestrator that schedules them.

pub mod content;
pub mod discovery;
pub mod notify;
pub mod orchestrator;
pub mod publish;
pub mod respond;

use content_store::{DocumentStore, SeenRegistry};
use llm_interface::GenerationChain;
use serde::Serialize;
use source_client::PostSource;
use std::sync::Arc;

pub use content::{BlogPipeline, SocialPipeline};
pub use discovery::{DiscoveryMode, DiscoveryOutcome, RedditDiscovery};
pub use notify::{format_summary, notify_batch, NoopNotifier, Notifier, SlackWebhook};
pub use orchestrator::{Orchestrator, PipelineKind, RunReport, RunStatus};
pub use publish::{PublishReport, Publisher};
pub use respond::ResponseDispatcher;

/// External collaborators shared by every pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub reddit: Arc<dyn PostSource>,
    pub hackernews: Option<Arc<dyn PostSource>>,
    pub generator: Arc<GenerationChain>,
    pub store: Arc<dyn DocumentStore>,
    pub seen: Arc<dyn SeenRegistry>,
    pub notifier: Arc<dyn Notifier>,
}

/// What one pipeline run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub fetched: usize,
    pub fetch_failures: usize,
    pub rejected: usize,
    pub accepted: usize,
    pub below_threshold: usize,
    pub duplicates: usize,
    pub already_seen: usize,
    pub seen_failures: usize,
    pub dispatched: usize,
    pub generation_fallbacks: usize,
    pub persisted: usize,
    pub persist_failures: usize,
    pub status_updates: usize,
    pub notified: bool,
}

impl RunCounters {
    pub fn failures(&self) -> usize {
        self.fetch_failures + self.seen_failures + self.persist_failures
    }

    pub fn merge(&mut self, other: &RunCounters) {
        self.fetched += other.fetched;
        self.fetch_failures += other.fetch_failures;
        self.rejected += other.rejected;
        self.accepted += other.accepted;
        self.below_threshold += other.below_threshold;
        self.duplicates += other.duplicates;
        self.already_seen += other.already_seen;
        self.seen_failures += other.seen_failures;
        self.dispatched += other.dispatched;
        self.generation_fallbacks += other.generation_fallbacks;
        self.persisted += other.persisted;
        self.persist_failures += other.persist_failures;
        self.status_updates += other.status_updates;
        self.notified |= other.notified;
    }
}

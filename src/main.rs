use background_service::{Collaborators, NoopNotifier, Notifier, Orchestrator, SlackWebhook};
use content_store::{
    DocumentStore, InMemoryDocumentStore, InMemorySeenRegistry, NotionStore, SeenRegistry,
    SqliteSeenRegistry,
};
use control_api::AppState;
use llm_interface::GenerationChain;
use outreach_core::{AppConfig, CoreError, ErrorExt};
use source_client::{HackerNewsClient, PostSource, RedditClient};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "outreach=info,outreach_core=info,source_client=info,\
relevance_engine=info,llm_interface=info,content_store=info,background_service=info,\
control_api=info,tower_http=info";

async fn seen_registry(config: &AppConfig) -> Arc<dyn SeenRegistry> {
    match config.dedup.sqlite_url.as_deref() {
        Some(url) => match SqliteSeenRegistry::connect(url).await {
            Ok(registry) => return Arc::new(registry),
            Err(e) => {
                e.log_error();
                error!("Seen-post database unavailable, falling back to memory");
            }
        },
        None => info!("SEEN_DB_URL not set, seen posts kept in memory"),
    }
    Arc::new(InMemorySeenRegistry::new())
}

fn document_store(config: &AppConfig) -> Arc<dyn DocumentStore> {
    match NotionStore::new(&config.notion) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Notion disabled ({}), records kept in memory", e);
            Arc::new(InMemoryDocumentStore::new())
        }
    }
}

fn notifier(config: &AppConfig) -> Arc<dyn Notifier> {
    match config.slack.webhook_url.as_deref() {
        Some(url) => match SlackWebhook::new(url, Duration::from_secs(10)) {
            Ok(slack) => return Arc::new(slack),
            Err(e) => {
                e.log_error();
            }
        },
        None => info!("SLACK_WEBHOOK_URL not set, notifications disabled"),
    }
    Arc::new(NoopNotifier)
}

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    info!("Starting outreach agent");

    let config_path = std::env::var("OUTREACH_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).map_err(|e| {
        error!("Configuration error: {}", e);
        CoreError::from(e)
    })?;

    let timeout = Duration::from_secs(config.discovery.request_timeout_secs);
    let reddit: Arc<dyn PostSource> = Arc::new(
        RedditClient::new(&config.reddit.base_url, &config.reddit.user_agent, timeout)?,
    );
    let hackernews = if config.hackernews.enabled {
        let client =
            HackerNewsClient::new(&config.hackernews.base_url, &config.reddit.user_agent, timeout)?;
        Some(Arc::new(client) as Arc<dyn PostSource>)
    } else {
        None
    };

    let deps = Collaborators {
        reddit,
        hackernews,
        generator: Arc::new(GenerationChain::from_config(&config.generation)),
        store: document_store(&config),
        seen: seen_registry(&config).await,
        notifier: notifier(&config),
    };

    let orchestrator = Arc::new(Orchestrator::new(&config, deps));
    let schedule = orchestrator.spawn_schedule();
    info!(tasks = schedule.len(), "Pipeline schedule started");

    let addr = format!("{}:{}", config.server.host, config.server.port)
        .parse::<SocketAddr>()
        .map_err(|e| CoreError::InvalidInput {
            message: format!("invalid listen address: {e}"),
        })?;
    let state = AppState { orchestrator };

    tokio::select! {
        result = control_api::serve(addr, state) => {
            if let Err(e) = result {
                e.log_error();
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    for task in schedule {
        task.abort();
    }
    Ok(())
}

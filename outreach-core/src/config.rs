//! Application configuration.
//!
//! Settings come from a TOML file (`outreach.toml`, or the path in
//! `OUTREACH_CONFIG`) layered over built-in defaults. Secrets and deploy
//! settings are taken from the environment. A missing credential is not a
//! configuration error: the collaborator that needs it is disabled instead.

use crate::{ConfigError, SourceConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "outreach.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub reddit: RedditConfig,
    pub hackernews: HackerNewsConfig,
    pub discovery: DiscoveryConfig,
    pub rules: RuleConfig,
    pub scoring: ScoreWeights,
    pub generation: GenerationConfig,
    pub notion: NotionConfig,
    pub slack: SlackConfig,
    pub dedup: DedupConfig,
    pub schedule: ScheduleConfig,
    pub blog: BlogConfig,
    pub social: SocialConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub base_url: String,
    pub user_agent: String,
    pub subreddits: Vec<SourceConfig>,
    /// Free-text terms searched across all of Reddit.
    pub search_terms: Vec<String>,
    /// Filter settings applied to search hits from unconfigured subreddits.
    pub search: SourceConfig,
}

impl Default for RedditConfig {
    fn default() -> Self {
        let subreddit = |origin: &str, min_score: i64, quality_multiplier: f64| SourceConfig {
            origin: origin.to_string(),
            keywords: Vec::new(),
            max_posts: 25,
            min_score,
            quality_multiplier,
        };

        Self {
            base_url: "https://www.reddit.com".to_string(),
            user_agent: "outreach-agent/0.1 (opportunity discovery)".to_string(),
            subreddits: vec![
                subreddit("ethdev", 1, 1.5),
                subreddit("solana", 1, 1.3),
                subreddit("algotrading", 2, 1.4),
                subreddit("CryptoTechnology", 2, 1.3),
                subreddit("defi", 2, 1.2),
                subreddit("web3", 1, 1.2),
                subreddit("CryptoCurrency", 5, 1.0),
            ],
            search_terms: vec![
                "crypto api".to_string(),
                "blockchain data api".to_string(),
                "wallet api".to_string(),
                "token price api".to_string(),
            ],
            search: SourceConfig {
                origin: "reddit-search".to_string(),
                keywords: Vec::new(),
                max_posts: 25,
                min_score: 1,
                quality_multiplier: 1.0,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HackerNewsConfig {
    pub enabled: bool,
    pub base_url: String,
    pub search_terms: Vec<String>,
    pub max_posts: u32,
    pub min_points: i64,
    pub quality_multiplier: f64,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://hnrss.org".to_string(),
            search_terms: vec!["crypto api".to_string(), "blockchain data".to_string()],
            max_posts: 20,
            min_points: 2,
            quality_multiplier: 1.1,
        }
    }
}

impl HackerNewsConfig {
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            origin: "hackernews".to_string(),
            keywords: Vec::new(),
            max_posts: self.max_posts,
            min_score: self.min_points,
            quality_multiplier: self.quality_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Maximum post age for live discovery.
    pub freshness_hours: u32,
    /// Maximum post age for historical backfill.
    pub backfill_months: u32,
    /// Accepted posts scoring below this are discarded.
    pub min_opportunity_score: u8,
    /// Opportunities dispatched per run, best first.
    pub top_n: usize,
    /// Concurrent source calls. 1 keeps fetches sequential.
    pub concurrency: usize,
    /// Minimum spacing between successive source calls.
    pub call_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            freshness_hours: 48,
            backfill_months: 3,
            min_opportunity_score: 40,
            top_n: 10,
            concurrency: 1,
            call_delay_ms: 2000,
            request_timeout_secs: 20,
        }
    }
}

/// Term lists behind the relevance rule. Matching is case-insensitive
/// substring matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub topic_terms: Vec<String>,
    pub intent_terms: Vec<String>,
    pub disqualify_terms: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        let terms = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            topic_terms: terms(&[
                "crypto api",
                "blockchain api",
                "wallet api",
                "token api",
                "price api",
                "nft api",
                "defi api",
                "market data",
                "on-chain data",
                "onchain data",
                "blockchain data",
                "token balances",
                "transaction history",
                "price feed",
                "ohlcv",
                "wallet data",
            ]),
            intent_terms: terms(&[
                "?",
                "which api",
                "best api",
                "recommend",
                "looking for",
                "any suggestions",
                "alternative to",
                "how do i",
                "how can i",
                "is there an api",
                "need an api",
            ]),
            disqualify_terms: terms(&[
                "giveaway",
                "airdrop",
                "presale",
                "pump",
                "to the moon",
                "price prediction",
                "shill",
                "referral code",
                "[hiring]",
            ]),
        }
    }
}

/// Named coefficients of the opportunity score. This table is the only thing
/// that changes when scoring needs tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub engagement_weight: f64,
    pub engagement_cap: f64,
    pub comment_weight: f64,
    pub comment_cap: f64,
    pub keyword_weight: f64,
    pub question_bonus: f64,
    pub technical_bonus: f64,
    pub recent_bonus: f64,
    pub recent_hours: u32,
    pub fresh_bonus: f64,
    pub fresh_hours: u32,
    pub question_terms: Vec<String>,
    pub technical_terms: Vec<String>,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        let terms = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            engagement_weight: 0.5,
            engagement_cap: 30.0,
            comment_weight: 2.0,
            comment_cap: 20.0,
            keyword_weight: 10.0,
            question_bonus: 5.0,
            technical_bonus: 5.0,
            recent_bonus: 10.0,
            recent_hours: 6,
            fresh_bonus: 5.0,
            fresh_hours: 24,
            question_terms: terms(&["?", "which", "recommend", "looking for", "how do"]),
            technical_terms: terms(&[
                "endpoint",
                "sdk",
                "rpc",
                "websocket",
                "rate limit",
                "json",
                "webhook",
                "latency",
                "historical data",
                "indexer",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub claude_model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub audience: String,
    pub product_name: String,
    pub product_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_base_url: "https://api.anthropic.com/v1".to_string(),
            claude_model: "claude-3-5-haiku-latest".to_string(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            max_tokens: 1200,
            timeout_secs: 30,
            audience: "crypto developers and data engineers".to_string(),
            product_name: "the crypto data API".to_string(),
            product_url: "https://example.com/crypto-data-api".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    pub api_key: Option<String>,
    pub database_id: Option<String>,
    pub base_url: String,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            database_id: None,
            base_url: "https://api.notion.com/v1".to_string(),
            retry_attempts: 3,
            retry_base_delay_ms: 1000,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// When set, seen post ids are kept in SQLite instead of memory.
    pub sqlite_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub reddit_interval_minutes: u64,
    pub blog_interval_minutes: u64,
    pub social_interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reddit_interval_minutes: 60,
            blog_interval_minutes: 24 * 60,
            social_interval_minutes: 12 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogTopic {
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub difficulty: u8,
    #[serde(default)]
    pub traffic_potential: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    pub posts_per_run: usize,
    pub topics: Vec<BlogTopic>,
}

impl Default for BlogConfig {
    fn default() -> Self {
        let topic = |topic: &str, keywords: &[&str], difficulty: u8, traffic_potential: u32| {
            BlogTopic {
                topic: topic.to_string(),
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
                difficulty,
                traffic_potential,
            }
        };
        Self {
            posts_per_run: 1,
            topics: vec![
                topic(
                    "How to fetch wallet token balances across chains",
                    &["wallet api", "token balances", "multichain"],
                    35,
                    2400,
                ),
                topic(
                    "Building a crypto portfolio tracker with a market data API",
                    &["portfolio tracker", "crypto api", "price feed"],
                    40,
                    3100,
                ),
                topic(
                    "Historical OHLCV data for backtesting trading strategies",
                    &["ohlcv", "historical data", "backtesting"],
                    45,
                    1900,
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    pub posts_per_run: usize,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self { posts_per_run: 3 }
    }
}

impl AppConfig {
    /// Load from `path`, or from `outreach.toml` when it exists, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Override secrets and deploy settings from `lookup` (the process
    /// environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
            self.generation.anthropic_api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.generation.openai_api_key = Some(key);
        }
        if let Some(key) = non_empty("NOTION_API_KEY") {
            self.notion.api_key = Some(key);
        }
        if let Some(id) = non_empty("NOTION_DATABASE_ID") {
            self.notion.database_id = Some(id);
        }
        if let Some(url) = non_empty("SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = Some(url);
        }
        if let Some(url) = non_empty("SEEN_DB_URL") {
            self.dedup.sqlite_url = Some(url);
        }
        if let Some(host) = non_empty("OUTREACH_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                value: port.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| Err(ConfigError::ValidationFailed { reason });

        if self.discovery.top_n == 0 {
            return fail("discovery.top_n must be at least 1".to_string());
        }
        if self.discovery.concurrency == 0 {
            return fail("discovery.concurrency must be at least 1".to_string());
        }
        if self.discovery.freshness_hours == 0 {
            return fail("discovery.freshness_hours must be at least 1".to_string());
        }
        if self.discovery.min_opportunity_score > 100 {
            return fail("discovery.min_opportunity_score must be within 0..=100".to_string());
        }

        let origins = self
            .reddit
            .subreddits
            .iter()
            .chain(std::iter::once(&self.reddit.search));
        for source in origins {
            if source.origin.trim().is_empty() {
                return fail("every reddit source needs a non-empty origin".to_string());
            }
            if source.max_posts == 0 || source.max_posts > 100 {
                return fail(format!(
                    "max_posts for {} must be within 1..=100",
                    source.origin
                ));
            }
            if !(1.0..=1.5).contains(&source.quality_multiplier) {
                return fail(format!(
                    "quality_multiplier for {} must be within 1.0..=1.5",
                    source.origin
                ));
            }
        }

        if self.generation.timeout_secs == 0 || self.notion.timeout_secs == 0 {
            return fail("timeouts must be at least one second".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.discovery.freshness_hours, 48);
        assert_eq!(config.discovery.concurrency, 1);
        assert!(config.generation.anthropic_api_key.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            [discovery]
            top_n = 5
            min_opportunity_score = 35

            [[reddit.subreddits]]
            origin = "solana"
            keywords = ["helius", "rpc"]
            min_score = 3
            quality_multiplier = 1.3
        "#;

        let config = AppConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.discovery.top_n, 5);
        assert_eq!(config.discovery.min_opportunity_score, 35);
        assert_eq!(config.discovery.freshness_hours, 48);
        assert_eq!(config.reddit.subreddits.len(), 1);
        assert_eq!(config.reddit.subreddits[0].max_posts, 25);
        assert_eq!(config.reddit.subreddits[0].keywords, vec!["helius", "rpc"]);
        assert_eq!(config.scoring, ScoreWeights::default());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result = AppConfig::from_toml_str("[discovery\ntop_n = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("NOTION_API_KEY", "secret_abc"),
            ("NOTION_DATABASE_ID", "db123"),
            ("SLACK_WEBHOOK_URL", "https://hooks.slack.com/services/T/B/X"),
            ("OPENAI_API_KEY", "  "),
            ("PORT", "9090"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.notion.api_key.as_deref(), Some("secret_abc"));
        assert_eq!(config.notion.database_id.as_deref(), Some("db123"));
        assert!(config.slack.webhook_url.is_some());
        assert!(config.generation.openai_api_key.is_none());
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|key| (key == "PORT").then(|| "eighty".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.discovery.top_n = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.reddit.subreddits[0].origin = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.reddit.subreddits[0].quality_multiplier = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = AppConfig::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outreach.toml");
        std::fs::write(&path, "[schedule]\nenabled = false\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert!(!config.schedule.enabled);
        assert_eq!(config.schedule.reddit_interval_minutes, 60);
    }
}

//! Blog and social content pipelines.

use crate::publish::Publisher;
use crate::{Collaborators, RunCounters};
use chrono::Utc;
use content_store::RecordQuery;
use llm_interface::{ContentType, GenerationChain, GenerationRequest};
use outreach_core::{
    AppConfig, BlogTopic, ContentRecord, CoreError, ErrorExt, RecordStatus, RecordType,
    RetryConfig, StoredRecord,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

fn publisher(config: &AppConfig, deps: &Collaborators) -> Publisher {
    Publisher::new(
        deps.store.clone(),
        RetryConfig::persistence(
            config.notion.retry_attempts,
            config.notion.retry_base_delay_ms,
        ),
    )
}

/// Easier topics are worth doing first.
fn blog_priority(topic: &BlogTopic) -> u8 {
    100u8.saturating_sub(topic.difficulty)
}

/// Rotates through the configured topics, `posts_per_run` at a time.
pub struct BlogPipeline {
    chain: Arc<GenerationChain>,
    publisher: Publisher,
    topics: Vec<BlogTopic>,
    posts_per_run: usize,
    audience: String,
    cursor: AtomicUsize,
}

impl BlogPipeline {
    pub fn new(config: &AppConfig, deps: &Collaborators) -> Self {
        Self {
            chain: deps.generator.clone(),
            publisher: publisher(config, deps),
            topics: config.blog.topics.clone(),
            posts_per_run: config.blog.posts_per_run,
            audience: config.generation.audience.clone(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Topics for the next run, advancing the rotation.
    fn next_topics(&self) -> Vec<BlogTopic> {
        if self.topics.is_empty() {
            return Vec::new();
        }
        let count = self.posts_per_run.min(self.topics.len());
        let start = self.cursor.fetch_add(count, Ordering::SeqCst);
        (0..count)
            .map(|i| self.topics[(start + i) % self.topics.len()].clone())
            .collect()
    }

    pub async fn run(&self) -> Result<RunCounters, CoreError> {
        let mut counters = RunCounters::default();
        let topics = self.next_topics();
        if topics.is_empty() {
            info!("No blog topics configured, nothing to generate");
            return Ok(counters);
        }

        self.chain.begin_run();
        let mut records = Vec::with_capacity(topics.len());
        for topic in &topics {
            let request = GenerationRequest {
                content_type: ContentType::BlogPost,
                topic: topic.topic.clone(),
                keywords: topic.keywords.clone(),
                audience: self.audience.clone(),
                context: format!("Target keywords: {}", topic.keywords.join(", ")),
            };
            let outcome = self.chain.generate(&request).await;
            if outcome.fell_back {
                counters.generation_fallbacks += 1;
            }

            let title = match outcome.content.title.trim() {
                "" => topic.topic.clone(),
                title => title.to_string(),
            };
            records.push(ContentRecord {
                title,
                record_type: RecordType::BlogPost,
                priority: blog_priority(topic),
                status: RecordStatus::Generated,
                keywords: topic.keywords.clone(),
                body: outcome.content.body,
                difficulty: topic.difficulty,
                traffic_potential: topic.traffic_potential,
                url: None,
                created_at: Utc::now(),
            });
        }
        counters.dispatched = records.len();

        let report = self.publisher.publish_batch(&records).await;
        counters.persisted = report.written();
        counters.persist_failures = report.failed + report.skipped;

        info!(generated = counters.dispatched, persisted = counters.persisted, "Blog pipeline complete");
        Ok(counters)
    }
}

/// Writes a social post for each generated blog post and marks the blog post
/// ready to publish.
pub struct SocialPipeline {
    chain: Arc<GenerationChain>,
    publisher: Publisher,
    posts_per_run: usize,
    audience: String,
}

impl SocialPipeline {
    pub fn new(config: &AppConfig, deps: &Collaborators) -> Self {
        Self {
            chain: deps.generator.clone(),
            publisher: publisher(config, deps),
            posts_per_run: config.social.posts_per_run,
            audience: config.generation.audience.clone(),
        }
    }

    fn request_for(&self, blog: &StoredRecord) -> GenerationRequest {
        let record = &blog.record;
        let mut context = format!("Promote the blog post \"{}\".", record.title);
        if let Some(url) = &record.url {
            context.push_str(&format!(" Link: {}", url));
        }
        let excerpt: String = record.body.chars().take(600).collect();
        if !excerpt.trim().is_empty() {
            context.push_str("\n\n");
            context.push_str(excerpt.trim());
        }

        GenerationRequest {
            content_type: ContentType::SocialPost,
            topic: record.title.clone(),
            keywords: record.keywords.clone(),
            audience: self.audience.clone(),
            context,
        }
    }

    pub async fn run(&self) -> Result<RunCounters, CoreError> {
        let mut counters = RunCounters::default();
        if self.posts_per_run == 0 {
            return Ok(counters);
        }

        let query = RecordQuery::new(RecordType::BlogPost, RecordStatus::Generated, self.posts_per_run);
        let blogs = self.publisher.store().query(&query).await?;
        counters.fetched = blogs.len();
        if blogs.is_empty() {
            info!("No generated blog posts waiting for social posts");
            return Ok(counters);
        }

        self.chain.begin_run();
        let mut records = Vec::with_capacity(blogs.len());
        for blog in &blogs {
            let outcome = self.chain.generate(&self.request_for(blog)).await;
            if outcome.fell_back {
                counters.generation_fallbacks += 1;
            }
            records.push(ContentRecord {
                title: format!("Social: {}", blog.record.title),
                record_type: RecordType::SocialPost,
                priority: blog.record.priority,
                status: RecordStatus::Generated,
                keywords: blog.record.keywords.clone(),
                body: outcome.content.body,
                difficulty: 0,
                traffic_potential: blog.record.traffic_potential,
                url: blog.record.url.clone(),
                created_at: Utc::now(),
            });
        }
        counters.dispatched = records.len();

        let report = self.publisher.publish_batch(&records).await;
        counters.persisted = report.written();
        counters.persist_failures = report.failed + report.skipped;

        for (blog, written) in blogs.iter().zip(&report.page_ids) {
            if written.is_none() {
                continue;
            }
            match self
                .publisher
                .update_status(&blog.page_id, RecordStatus::ReadyToPublish)
                .await
            {
                Ok(()) => counters.status_updates += 1,
                Err(e) => {
                    e.log_error();
                    warn!(page_id = %blog.page_id, "Social post written but blog status not updated");
                    counters.persist_failures += 1;
                }
            }
        }

        info!(
            social_posts = counters.persisted,
            promoted = counters.status_updates,
            "Social pipeline complete"
        );
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoopNotifier;
    use async_trait::async_trait;
    use content_store::{DocumentStore, InMemoryDocumentStore, InMemorySeenRegistry};
    use outreach_core::RawPost;
    use source_client::{FetchQuery, PostSource};

    struct EmptySource;

    #[async_trait]
    impl PostSource for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        async fn fetch(&self, _query: &FetchQuery) -> Result<Vec<RawPost>, CoreError> {
            Ok(Vec::new())
        }
    }

    fn deps(store: Arc<InMemoryDocumentStore>) -> Collaborators {
        Collaborators {
            reddit: Arc::new(EmptySource),
            hackernews: None,
            generator: Arc::new(GenerationChain::from_config(&Default::default())),
            store,
            seen: Arc::new(InMemorySeenRegistry::new()),
            notifier: Arc::new(NoopNotifier),
        }
    }

    #[tokio::test]
    async fn test_blog_rotation_wraps_around() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut config = AppConfig::default();
        config.blog.posts_per_run = 2;
        let blog = BlogPipeline::new(&config, &deps(store.clone()));

        blog.run().await.unwrap();
        blog.run().await.unwrap();

        let titles: Vec<String> = store
            .records()
            .await
            .into_iter()
            .map(|s| s.record.title)
            .collect();
        let topics: Vec<String> = config.blog.topics.iter().map(|t| t.topic.clone()).collect();
        assert_eq!(
            titles,
            vec![
                topics[0].clone(),
                topics[1].clone(),
                topics[2].clone(),
                topics[0].clone()
            ]
        );
    }

    #[tokio::test]
    async fn test_social_promotes_generated_blogs() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let config = AppConfig::default();
        let deps = deps(store.clone());
        BlogPipeline::new(&config, &deps).run().await.unwrap();

        let counters = SocialPipeline::new(&config, &deps).run().await.unwrap();
        assert_eq!(counters.persisted, 1);
        assert_eq!(counters.status_updates, 1);

        let ready = store
            .query(&RecordQuery::new(RecordType::BlogPost, RecordStatus::ReadyToPublish, 10))
            .await
            .unwrap();
        assert_eq!(ready.len(), 1);
        let social = store
            .query(&RecordQuery::new(RecordType::SocialPost, RecordStatus::Generated, 10))
            .await
            .unwrap();
        assert_eq!(social.len(), 1);

        // Nothing left to promote
        let again = SocialPipeline::new(&config, &deps).run().await.unwrap();
        assert_eq!(again.persisted, 0);
    }
}

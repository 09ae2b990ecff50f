use async_trait::async_trait;
use chrono::Utc;
use outreach_core::{CoreError, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Post ids already surfaced as opportunities. Marking is idempotent and
/// entries only go away through [`SeenRegistry::clear`].
#[async_trait]
pub trait SeenRegistry: Send + Sync {
    async fn has_seen(&self, post_id: &str) -> Result<bool, CoreError>;

    async fn mark_seen(&self, post_id: &str) -> Result<(), CoreError>;

    async fn clear(&self) -> Result<(), CoreError>;

    async fn len(&self) -> Result<usize, CoreError>;
}

/// Process-lifetime registry. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySeenRegistry {
    ids: Mutex<HashSet<String>>,
}

impl InMemorySeenRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeenRegistry for InMemorySeenRegistry {
    async fn has_seen(&self, post_id: &str) -> Result<bool, CoreError> {
        Ok(self.ids.lock().await.contains(post_id))
    }

    async fn mark_seen(&self, post_id: &str) -> Result<(), CoreError> {
        self.ids.lock().await.insert(post_id.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CoreError> {
        self.ids.lock().await.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, CoreError> {
        Ok(self.ids.lock().await.len())
    }
}

/// Registry persisted in a SQLite table so restarts keep their dedup state.
#[derive(Debug, Clone)]
pub struct SqliteSeenRegistry {
    pool: Arc<SqlitePool>,
}

fn sql_error(e: sqlx::Error) -> CoreError {
    CoreError::Store(StoreError::Sql(e))
}

impl SqliteSeenRegistry {
    /// Open (creating if needed) the database at `url`, e.g.
    /// `sqlite://seen.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sql_error)?
            .create_if_missing(true);

        // Every in-memory connection is its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(sql_error)?;

        let registry = Self {
            pool: Arc::new(pool),
        };
        registry.run_migrations().await?;
        info!(url, "Seen-post registry ready");
        Ok(registry)
    }

    async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS seen_posts (
                post_id TEXT PRIMARY KEY,
                seen_at INTEGER NOT NULL
            )",
        )
        .execute(&*self.pool)
        .await
        .map_err(sql_error)?;
        Ok(())
    }
}

#[async_trait]
impl SeenRegistry for SqliteSeenRegistry {
    async fn has_seen(&self, post_id: &str) -> Result<bool, CoreError> {
        let row = sqlx::query("SELECT 1 FROM seen_posts WHERE post_id = ?")
            .bind(post_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(sql_error)?;
        Ok(row.is_some())
    }

    async fn mark_seen(&self, post_id: &str) -> Result<(), CoreError> {
        sqlx::query("INSERT OR IGNORE INTO seen_posts (post_id, seen_at) VALUES (?, ?)")
            .bind(post_id)
            .bind(Utc::now().timestamp())
            .execute(&*self.pool)
            .await
            .map_err(sql_error)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM seen_posts")
            .execute(&*self.pool)
            .await
            .map_err(sql_error)?;
        info!(removed = result.rows_affected(), "Cleared seen-post registry");
        Ok(())
    }

    async fn len(&self) -> Result<usize, CoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM seen_posts")
            .fetch_one(&*self.pool)
            .await
            .map_err(sql_error)?;
        let count: i64 = row.try_get("count").map_err(sql_error)?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise(registry: &dyn SeenRegistry) {
        assert!(!registry.has_seen("abc123").await.unwrap());

        registry.mark_seen("abc123").await.unwrap();
        registry.mark_seen("abc123").await.unwrap();
        assert!(registry.has_seen("abc123").await.unwrap());
        assert_eq!(registry.len().await.unwrap(), 1);

        registry.mark_seen("hn_42").await.unwrap();
        assert_eq!(registry.len().await.unwrap(), 2);

        registry.clear().await.unwrap();
        assert!(!registry.has_seen("abc123").await.unwrap());
        assert_eq!(registry.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_registry_is_idempotent() {
        exercise(&InMemorySeenRegistry::new()).await;
    }

    #[tokio::test]
    async fn test_sqlite_registry_is_idempotent() {
        let registry = SqliteSeenRegistry::connect("sqlite::memory:").await.unwrap();
        exercise(&registry).await;
    }
}

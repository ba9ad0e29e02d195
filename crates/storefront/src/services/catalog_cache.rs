//! In-memory category cache.
//!
//! The category list (with product counts) is read on nearly every page of
//! the front end and changes only through the back office, so it is cached
//! with a TTL and invalidated by admin writes.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use crate::db::{CategoryRepository, RepositoryError};
use crate::models::Category;

/// Cached category list.
#[derive(Clone)]
pub struct CategoryCache {
    cache: Cache<&'static str, Arc<Vec<Category>>>,
}

const ALL_KEY: &str = "categories:all";

impl CategoryCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();
        Self { cache }
    }

    /// All categories, loading from the database on a miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the load fails; failures are not cached.
    pub async fn get_or_load(&self, pool: &PgPool) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(categories) = self.cache.get(ALL_KEY).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(CategoryRepository::new(pool).list().await?);
        self.cache.insert(ALL_KEY, Arc::clone(&categories)).await;
        Ok(categories)
    }

    /// Drop the cached list so the next read reloads it.
    pub async fn invalidate(&self) {
        self.cache.invalidate(ALL_KEY).await;
    }

    #[cfg(test)]
    async fn prime(&self, categories: Vec<Category>) {
        self.cache.insert(ALL_KEY, Arc::new(categories)).await;
    }
}

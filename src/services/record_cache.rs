use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::models::VotingRecord;
use crate::services::airtable::{AirtableError, RecordSource};

const MASTER_KEY: &str = "voting_locations";

/// Holds the unfiltered master record collection
///
/// The collection is loaded from the record source on the first request
/// (and again after the TTL lapses) and shared read-only afterwards.
#[derive(Clone)]
pub struct RecordCache {
    cache: Cache<&'static str, Arc<Vec<VotingRecord>>>,
}

impl RecordCache {
    pub fn new(ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Get the master collection, loading it on a miss
    pub async fn get_or_load(
        &self,
        source: &dyn RecordSource,
    ) -> Result<Arc<Vec<VotingRecord>>, AirtableError> {
        if let Some(records) = self.cache.get(MASTER_KEY).await {
            tracing::trace!("Record cache hit ({} records)", records.len());
            return Ok(records);
        }

        tracing::debug!("Record cache miss, fetching from source");
        let records = Arc::new(source.fetch_all().await?);
        self.cache.insert(MASTER_KEY, Arc::clone(&records)).await;

        Ok(records)
    }

    /// Drop the cached collection so the next request reloads it
    pub async fn invalidate(&self) {
        self.cache.invalidate(MASTER_KEY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource for CountingSource {
        async fn fetch_all(&self) -> Result<Vec<VotingRecord>, AirtableError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![VotingRecord {
                id: "rec1".to_string(),
                created_time: None,
                fields: Default::default(),
            }])
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RecordSource for FailingSource {
        async fn fetch_all(&self) -> Result<Vec<VotingRecord>, AirtableError> {
            Err(AirtableError::NotConfigured)
        }
    }

    #[tokio::test]
    async fn test_loads_once() {
        let cache = RecordCache::new(300);
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };

        let first = cache.get_or_load(&source).await.unwrap();
        let second = cache.get_or_load(&source).await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        cache.get_or_load(&source).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = RecordCache::new(300);
        assert!(cache.get_or_load(&FailingSource).await.is_err());

        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        assert!(cache.get_or_load(&source).await.is_ok());
    }
}

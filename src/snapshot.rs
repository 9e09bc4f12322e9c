use crate::backend_client::BackendClient;
use crate::errors::AppError;
use crate::models::LeadRecord;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Holds the current lead snapshot between requests.
///
/// The snapshot is only ever replaced as a whole: a refresh or a status update
/// invalidates it and the next read fetches a fresh copy.
///
/// Entries are keyed by generation. `invalidate` moves to a new generation, so a
/// fetch that was already running lands under the old key and is never served.
#[derive(Clone)]
pub struct SnapshotStore {
    backend: BackendClient,
    limit: usize,
    generation: Arc<AtomicU64>,
    cache: Cache<u64, Arc<Vec<LeadRecord>>>,
}

impl SnapshotStore {
    pub fn new(backend: BackendClient, limit: usize, ttl: Duration) -> Self {
        let cache = Cache::builder().time_to_live(ttl).max_capacity(4).build();
        Self {
            backend,
            limit,
            generation: Arc::new(AtomicU64::new(0)),
            cache,
        }
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Returns the cached snapshot, fetching it from the backend when absent or expired.
    ///
    /// Concurrent misses share a single backend fetch.
    pub async fn current(&self) -> Result<Arc<Vec<LeadRecord>>, AppError> {
        let generation = self.generation.load(Ordering::Acquire);

        if let Some(snapshot) = self.cache.get(&generation).await {
            tracing::debug!("Snapshot cache hit ({} leads)", snapshot.len());
            return Ok(snapshot);
        }

        let snapshot = self
            .cache
            .try_get_with(generation, async {
                let records = self.backend.fetch_records(self.limit).await?;
                tracing::debug!(
                    "Fetched snapshot generation {} ({} leads)",
                    generation,
                    records.len()
                );
                Ok::<_, AppError>(Arc::new(records))
            })
            .await
            .map_err(|e| (*e).clone())?;

        // Invalidated while fetching: drop the entry so nobody reads it later
        if self.generation.load(Ordering::Acquire) != generation {
            self.cache.invalidate(&generation).await;
        }

        Ok(snapshot)
    }

    /// Drops the cached snapshot so the next read refetches it.
    pub async fn invalidate(&self) {
        let previous = self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate(&previous).await;
        tracing::info!("Lead snapshot invalidated (generation {})", previous + 1);
    }
}

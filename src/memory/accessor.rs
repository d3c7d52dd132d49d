//! Memory Accessor
//!
//! The analytics engine's sole data source. Wraps a `MemoryStore` and
//! hands out normalized working sets: newest-first, sentiment clamped,
//! absent fields defaulted. Fetch failures propagate unmodified; the
//! engine treats them as "analytics unavailable", never retries.

use crate::memory::store::{MemoryStore, StoreResult};
use crate::memory::types::MemoryRecord;
use std::sync::Arc;

/// Per-module record filter, applied after fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every record
    All,
    /// Only records mentioning at least one person
    WithPeople,
    /// Only records carrying an embedding vector
    WithEmbedding,
}

impl RecordFilter {
    /// Whether a record passes this filter
    pub fn matches(&self, record: &MemoryRecord) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::WithPeople => !record.people.is_empty(),
            RecordFilter::WithEmbedding => record.embedding.is_some(),
        }
    }
}

/// Normalizing facade over a memory store
pub struct MemoryAccessor {
    store: Arc<dyn MemoryStore>,
    fetch_limit: usize,
}

impl MemoryAccessor {
    /// Create an accessor with the given working-set bound
    pub fn new(store: Arc<dyn MemoryStore>, fetch_limit: usize) -> Self {
        Self { store, fetch_limit }
    }

    /// Fetch a user's working set, newest-first, filtered
    pub async fn fetch(
        &self,
        user_id: &str,
        filter: RecordFilter,
    ) -> StoreResult<Vec<MemoryRecord>> {
        let mut records = self
            .store
            .fetch_memories(user_id, Some(self.fetch_limit))
            .await?;

        records.retain(|r| filter.matches(r));
        for record in &mut records {
            if let Some(s) = record.sentiment {
                record.sentiment = Some(s.clamp(-1.0, 1.0));
            }
        }

        tracing::debug!(
            user_id = %user_id,
            count = records.len(),
            filter = ?filter,
            "Fetched memory working set"
        );

        Ok(records)
    }

    /// Total records stored for a user
    pub async fn count(&self, user_id: &str) -> StoreResult<usize> {
        self.store.count(user_id).await
    }
}

/// Records sorted oldest-first, for trajectory computations
pub fn chronological(records: &[MemoryRecord]) -> Vec<&MemoryRecord> {
    let mut ordered: Vec<&MemoryRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.created_at);
    ordered
}

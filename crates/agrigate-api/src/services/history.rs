//! In-memory chat transcript storage.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use agrigate_core::defaults;
use agrigate_core::{HistoryEntry, HistoryStore, Result};

/// Process-local [`HistoryStore`] keeping the most recent entries per user.
///
/// Transcripts are lost on restart. Deployments with a document database
/// provide their own store behind the same trait.
pub struct InMemoryHistoryStore {
    capacity: usize,
    transcripts: RwLock<HashMap<String, VecDeque<HistoryEntry>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(defaults::HISTORY_MAX_ENTRIES)
    }

    /// Keep at most `capacity` entries per user, dropping the oldest.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            transcripts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, user_id: &str, entries: Vec<HistoryEntry>) -> Result<()> {
        let mut transcripts = self.transcripts.write().await;
        let transcript = transcripts.entry(user_id.to_string()).or_default();
        transcript.extend(entries);
        while transcript.len() > self.capacity {
            transcript.pop_front();
        }
        Ok(())
    }

    async fn history(&self, user_id: &str) -> Result<Vec<HistoryEntry>> {
        let transcripts = self.transcripts.read().await;
        Ok(transcripts
            .get(user_id)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, user_id: &str) -> Result<()> {
        self.transcripts.write().await.remove(user_id);
        Ok(())
    }
}

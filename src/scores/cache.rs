//! ScoreCache: bounded in-memory cache of normalized score cards.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::normalize::{ScoreCard, normalize_scores};
use crate::error::ScoreError;
use crate::store::ProfileStore;

#[derive(Default)]
struct Entries {
    cards: HashMap<Uuid, ScoreCard>,
    /// Insertion order, oldest first.
    order: VecDeque<Uuid>,
}

/// Score cards keyed by scan id. The oldest entry is evicted when full.
pub struct ScoreCache {
    capacity: usize,
    entries: RwLock<Entries>,
}

impl ScoreCache {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            entries: RwLock::new(Entries::default()),
        })
    }

    pub async fn get(&self, scan_id: Uuid) -> Option<ScoreCard> {
        self.entries.read().await.cards.get(&scan_id).cloned()
    }

    pub async fn insert(&self, scan_id: Uuid, card: ScoreCard) {
        let mut entries = self.entries.write().await;
        if entries.cards.insert(scan_id, card).is_some() {
            return;
        }
        entries.order.push_back(scan_id);

        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.cards.remove(&oldest);
                debug!(scan_id = %oldest, "Evicted score card");
            }
        }
    }

    /// Get the card for `scan_id`, normalizing the stored analysis on a miss.
    pub async fn get_or_load(
        &self,
        scan_id: Uuid,
        store: &dyn ProfileStore,
    ) -> Result<ScoreCard, ScoreError> {
        if let Some(card) = self.get(scan_id).await {
            return Ok(card);
        }

        let scan = store
            .get_scan(scan_id)
            .await?
            .ok_or(ScoreError::ScanNotFound { id: scan_id })?;
        let card = normalize_scores(&scan.analysis)?;
        self.insert(scan_id, card.clone()).await;
        Ok(card)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.cards.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.cards.is_empty()
    }
}

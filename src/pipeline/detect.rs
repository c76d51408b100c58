// src/pipeline/detect.rs

//! Change detection cycle.
//!
//! One cycle fetches the current items, compares them with the recorded
//! snapshot and replaces the snapshot when something new appeared. The
//! fetch runs without holding the store lock; load, compare and save run
//! under it, so overlapping cycles never report the same item twice.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use url::Url;

use crate::error::{DetectError, StoreError};
use crate::models::{Item, ItemSet};
use crate::services::ContentSource;
use crate::storage::ItemStore;

use super::diff::calculate_diff;

/// Outcome of a successful detection cycle.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Items not present in the previous snapshot, in page order
    pub new_items: Vec<Item>,
    /// Number of items fetched
    pub fetched: usize,
    /// Recorded items no longer on the page
    pub removed: usize,
    /// Whether the snapshot was replaced
    pub persisted: bool,
    pub checked_at: DateTime<Utc>,
}

impl Detection {
    pub fn has_new(&self) -> bool {
        !self.new_items.is_empty()
    }
}

/// Owns the item store and decides what counts as new.
pub struct ChangeDetector {
    target: Url,
    source: Box<dyn ContentSource>,
    store: Mutex<Box<dyn ItemStore>>,
}

impl ChangeDetector {
    pub fn new(target: Url, source: Box<dyn ContentSource>, store: Box<dyn ItemStore>) -> Self {
        Self {
            target,
            source,
            store: Mutex::new(store),
        }
    }

    /// Watched URL.
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Run one detection cycle.
    pub async fn detect(&self) -> Result<Detection, DetectError> {
        let current = self.source.fetch(&self.target).await.map_err(|e| {
            log::warn!("Fetch from {} failed: {}", self.target, e);
            DetectError::FetchFailed(e)
        })?;

        let store = self.store.lock().await;
        let stored = store.load().await.map_err(|e| {
            log::error!("Snapshot at {} is unreadable: {}", store.location(), e);
            DetectError::StoreCorrupt(e)
        })?;

        let diff = calculate_diff(&stored, &current);
        log::info!(
            "Cycle: {} fetched, {} recorded, {} new, {} gone",
            current.len(),
            stored.len(),
            diff.added.len(),
            diff.removed.len()
        );

        let mut detection = Detection {
            fetched: current.len(),
            removed: diff.removed.len(),
            persisted: false,
            checked_at: Utc::now(),
            new_items: diff.added,
        };
        if !detection.has_new() {
            return Ok(detection);
        }

        if let Err(source) = store.save(&current).await {
            log::error!(
                "Found {} new item(s) but could not update {}: {}. They will be reported again next cycle.",
                detection.new_items.len(),
                store.location(),
                source
            );
            return Err(DetectError::StoreWriteFailed {
                new_items: detection.new_items,
                source,
            });
        }

        detection.persisted = true;
        Ok(detection)
    }

    /// Read the recorded snapshot under the store lock.
    pub async fn snapshot(&self) -> Result<ItemSet, StoreError> {
        self.store.lock().await.load().await
    }

    /// Location of the underlying store, for logs.
    pub async fn store_location(&self) -> String {
        self.store.lock().await.location()
    }
}

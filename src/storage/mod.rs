//! Storage abstractions for the last seen snapshot.
//!
//! Only one snapshot is ever kept: the item set observed by the most recent
//! detection cycle that found something new. There is no history.

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::ItemSet;

// Re-export for convenience
pub use local::FileStore;
pub use memory::MemoryStore;

/// Trait for snapshot storage backends.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Load the recorded snapshot.
    ///
    /// Returns an empty set when nothing has been recorded yet. Existing
    /// state that cannot be read is an error, never an empty set.
    async fn load(&self) -> Result<ItemSet, StoreError>;

    /// Replace the recorded snapshot.
    ///
    /// Either the whole new set is durably written or the previous content
    /// is left untouched.
    async fn save(&self, items: &ItemSet) -> Result<(), StoreError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewBatch, NewNotification, NewQueueItem, NotificationBatch, QueueItem};

pub use memory::{MemorySink, MemoryStore};
pub use postgres::PgStore;

/// Durable persistence for batches and queue items.
///
/// Everything the delivery engine needs reduces to simple CRUD plus a few
/// atomic single-row operations: a conditional claim, conditional status
/// stamps, and counter increments. All concurrency safety lives behind this
/// trait; the engine itself never does read-modify-write on shared state.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_batch(&self, new: NewBatch) -> Result<NotificationBatch, StoreError>;

    async fn find_batch(&self, id: Uuid) -> Result<Option<NotificationBatch>, StoreError>;

    /// Insert a chunk of queue items. Returns the number of rows written.
    async fn enqueue_items(&self, items: &[NewQueueItem]) -> Result<u64, StoreError>;

    /// Claim up to `limit` pending items, oldest first, optionally scoped to
    /// one batch. The claim flips each item to `processing` and increments
    /// `attempts` in the same conditional update, so two concurrent passes
    /// cannot both claim the same item and a crash mid-delivery never
    /// under-counts attempts.
    async fn claim_pending(
        &self,
        batch_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<QueueItem>, StoreError>;

    async fn mark_item_sent(&self, id: Uuid) -> Result<(), StoreError>;

    /// Release a claimed item back to `pending` after a failed attempt that
    /// still has retries left, recording the failure reason.
    async fn release_item(&self, id: Uuid, error: &str) -> Result<(), StoreError>;

    async fn mark_item_failed(&self, id: Uuid, error: &str) -> Result<(), StoreError>;

    /// Count pending items, scoped to one batch or system-wide.
    async fn pending_count(&self, batch_id: Option<Uuid>) -> Result<i64, StoreError>;

    /// Conditionally move a batch `pending -> processing`, stamping
    /// `started_at`. Returns false if the batch was not in `pending`
    /// (including when it does not exist), so concurrent passes never
    /// double-stamp.
    async fn mark_batch_processing(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Conditionally move a batch `processing -> completed`, stamping
    /// `completed_at`. Returns false unless the batch was in `processing`.
    async fn mark_batch_completed(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn increment_processed(&self, batch_id: Uuid) -> Result<(), StoreError>;

    async fn increment_failed(&self, batch_id: Uuid) -> Result<(), StoreError>;
}

/// Insert-only materialization of user-visible notifications — the actual
/// delivery channel as far as the engine is concerned.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &NewNotification) -> Result<(), DeliveryError>;
}

/// A per-item delivery failure, recoverable until attempts run out.
#[derive(Debug)]
pub struct DeliveryError {
    pub message: String,
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<String> for DeliveryError {
    fn from(s: String) -> Self {
        DeliveryError { message: s }
    }
}

impl From<&str> for DeliveryError {
    fn from(s: &str) -> Self {
        DeliveryError {
            message: s.to_string(),
        }
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    BatchStatus, ItemStatus, NewBatch, NewNotification, NewQueueItem, NotificationBatch, QueueItem,
};
use crate::store::{DeliveryError, NotificationSink, Store};

/// In-process store with the same transition semantics as `PgStore`.
///
/// Backs the test suite and local development; the `set_fail_enqueue` hook
/// exercises the partial fan-out path that is otherwise only reachable
/// through a real storage outage.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_enqueue: AtomicBool,
}

#[derive(Default)]
struct Inner {
    batches: HashMap<Uuid, NotificationBatch>,
    // Insertion order doubles as creation order, which keeps claims FIFO.
    items: Vec<QueueItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `enqueue_items` call fail.
    pub fn set_fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all queue items, in creation order.
    pub async fn items(&self) -> Vec<QueueItem> {
        self.inner.lock().await.items.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_batch(&self, new: NewBatch) -> Result<NotificationBatch, StoreError> {
        let batch = NotificationBatch {
            id: Uuid::now_v7(),
            job_type: new.job_type,
            total_count: new.total_count,
            processed_count: 0,
            failed_count: 0,
            status: BatchStatus::Pending,
            metadata: new.metadata,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.inner.lock().await.batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    async fn find_batch(&self, id: Uuid) -> Result<Option<NotificationBatch>, StoreError> {
        Ok(self.inner.lock().await.batches.get(&id).cloned())
    }

    async fn enqueue_items(&self, items: &[NewQueueItem]) -> Result<u64, StoreError> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("enqueue failure injected".to_string()));
        }

        let mut inner = self.inner.lock().await;
        for item in items {
            inner.items.push(QueueItem {
                id: Uuid::now_v7(),
                batch_id: item.batch_id,
                user_id: item.user_id.clone(),
                notification_type: item.notification_type.clone(),
                notification_data: item.notification_data.clone(),
                status: ItemStatus::Pending,
                attempts: 0,
                max_attempts: item.max_attempts,
                error_message: None,
                created_at: Utc::now(),
                processed_at: None,
            });
        }
        Ok(items.len() as u64)
    }

    async fn claim_pending(
        &self,
        batch_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<QueueItem>, StoreError> {
        let mut inner = self.inner.lock().await;
        let mut claimed = Vec::new();

        for item in inner.items.iter_mut() {
            if claimed.len() as i64 >= limit {
                break;
            }
            if item.status != ItemStatus::Pending {
                continue;
            }
            if batch_id.is_some() && item.batch_id != batch_id {
                continue;
            }
            item.status = ItemStatus::Processing;
            item.attempts += 1;
            claimed.push(item.clone());
        }

        Ok(claimed)
    }

    async fn mark_item_sent(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(item) = inner.items.iter_mut().find(|i| i.id == id) {
            if item.status.can_become(ItemStatus::Sent) {
                item.status = ItemStatus::Sent;
                item.processed_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn release_item(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(item) = inner.items.iter_mut().find(|i| i.id == id) {
            if item.status.can_become(ItemStatus::Pending) {
                item.status = ItemStatus::Pending;
                item.error_message = Some(error.to_string());
            }
        }
        Ok(())
    }

    async fn mark_item_failed(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(item) = inner.items.iter_mut().find(|i| i.id == id) {
            if item.status.can_become(ItemStatus::Failed) {
                item.status = ItemStatus::Failed;
                item.error_message = Some(error.to_string());
                item.processed_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn pending_count(&self, batch_id: Option<Uuid>) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        let count = inner
            .items
            .iter()
            .filter(|i| i.status == ItemStatus::Pending)
            .filter(|i| batch_id.is_none() || i.batch_id == batch_id)
            .count();
        Ok(count as i64)
    }

    async fn mark_batch_processing(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(batch) = inner.batches.get_mut(&id) {
            if batch.status.can_become(BatchStatus::Processing) {
                batch.status = BatchStatus::Processing;
                batch.started_at = Some(Utc::now());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn mark_batch_completed(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(batch) = inner.batches.get_mut(&id) {
            if batch.status.can_become(BatchStatus::Completed) {
                batch.status = BatchStatus::Completed;
                batch.completed_at = Some(Utc::now());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn increment_processed(&self, batch_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(batch) = inner.batches.get_mut(&batch_id) {
            batch.processed_count += 1;
        }
        Ok(())
    }

    async fn increment_failed(&self, batch_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(batch) = inner.batches.get_mut(&batch_id) {
            batch.failed_count += 1;
        }
        Ok(())
    }
}

/// In-process delivery channel that records every notification it accepts
/// and can be told to reject deliveries, globally or per recipient.
#[derive(Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<NewNotification>>,
    fail_all: AtomicBool,
    fail_users: Mutex<HashSet<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every delivery until reset.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Reject deliveries for one recipient.
    pub async fn fail_user(&self, user_id: &str) {
        self.fail_users.lock().await.insert(user_id.to_string());
    }

    /// Everything delivered so far, in delivery order.
    pub async fn delivered(&self) -> Vec<NewNotification> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn deliver(&self, notification: &NewNotification) -> Result<(), DeliveryError> {
        if self.fail_all.load(Ordering::SeqCst)
            || self.fail_users.lock().await.contains(&notification.user_id)
        {
            return Err(DeliveryError::from(format!(
                "delivery rejected for user {}",
                notification.user_id
            )));
        }

        self.delivered.lock().await.push(notification.clone());
        Ok(())
    }
}

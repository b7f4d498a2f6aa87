use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewBatch, NewNotification, NewQueueItem, NotificationBatch, QueueItem};
use crate::store::{DeliveryError, NotificationSink, Store};

/// Postgres-backed store. Also serves as the production notification sink:
/// delivery means inserting into the `notifications` table, which the
/// member-facing apps read.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_batch(&self, new: NewBatch) -> Result<NotificationBatch, StoreError> {
        let batch = sqlx::query_as::<_, NotificationBatch>(
            "INSERT INTO notification_batches (job_type, total_count, metadata)
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&new.job_type)
        .bind(new.total_count)
        .bind(&new.metadata)
        .fetch_one(&self.pool)
        .await?;
        Ok(batch)
    }

    async fn find_batch(&self, id: Uuid) -> Result<Option<NotificationBatch>, StoreError> {
        let batch = sqlx::query_as::<_, NotificationBatch>(
            "SELECT * FROM notification_batches WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    async fn enqueue_items(&self, items: &[NewQueueItem]) -> Result<u64, StoreError> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::new(
            "INSERT INTO notification_queue
             (batch_id, user_id, notification_type, notification_data, max_attempts) ",
        );
        builder.push_values(items, |mut row, item| {
            row.push_bind(item.batch_id)
                .push_bind(&item.user_id)
                .push_bind(&item.notification_type)
                .push_bind(&item.notification_data)
                .push_bind(item.max_attempts);
        });

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Single conditional update so two concurrent passes cannot claim the
    /// same item; SKIP LOCKED keeps them from blocking on each other.
    async fn claim_pending(
        &self,
        batch_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<QueueItem>, StoreError> {
        let items = sqlx::query_as::<_, QueueItem>(
            "UPDATE notification_queue SET status = 'processing', attempts = attempts + 1
             WHERE id IN (
                 SELECT id FROM notification_queue
                 WHERE status = 'pending'
                   AND ($1::uuid IS NULL OR batch_id = $1)
                 ORDER BY created_at ASC
                 LIMIT $2
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING *",
        )
        .bind(batch_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn mark_item_sent(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE notification_queue SET status = 'sent', processed_at = now()
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn release_item(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE notification_queue SET status = 'pending', error_message = $2
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_item_failed(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE notification_queue
             SET status = 'failed', error_message = $2, processed_at = now()
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pending_count(&self, batch_id: Option<Uuid>) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notification_queue
             WHERE status = 'pending' AND ($1::uuid IS NULL OR batch_id = $1)",
        )
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_batch_processing(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notification_batches SET status = 'processing', started_at = now()
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_batch_completed(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notification_batches SET status = 'completed', completed_at = now()
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_processed(&self, batch_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE notification_batches SET processed_count = processed_count + 1
             WHERE id = $1",
        )
        .bind(batch_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_failed(&self, batch_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE notification_batches SET failed_count = failed_count + 1
             WHERE id = $1",
        )
        .bind(batch_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for PgStore {
    async fn deliver(&self, notification: &NewNotification) -> Result<(), DeliveryError> {
        sqlx::query(
            "INSERT INTO notifications (user_id, notification_type, title, message, data)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&notification.user_id)
        .bind(&notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.data)
        .execute(&self.pool)
        .await
        .map_err(|e| DeliveryError::from(format!("Failed to insert notification: {e}")))?;
        Ok(())
    }
}

use uuid::Uuid;

use crate::delivery::processor;
use crate::delivery::{DEFAULT_MAX_ATTEMPTS, FANOUT_CHUNK_SIZE};
use crate::error::AppError;
use crate::models::{NewBatch, NewQueueItem};
use crate::state::AppState;

pub struct CreateBatchOutcome {
    pub batch_id: Uuid,
    /// Queue rows actually written. Can fall short of the batch's
    /// `total_count` when a chunk insert fails (logged, not fatal).
    pub total_queued: i64,
    /// Items delivered by the synchronous first pass.
    pub processed: i64,
}

/// Create a batch and fan its recipients out into queue items.
///
/// The batch row is written first and carries the requested recipient count;
/// a chunk that fails to insert is skipped so the rest of the batch still
/// goes out. Ends with one processor pass scoped to the new batch, so small
/// batches finish without waiting for the poller.
pub async fn create_batch(
    state: &AppState,
    user_ids: &[String],
    notification_type: &str,
    notification_data: serde_json::Value,
    pass_size: i64,
) -> Result<CreateBatchOutcome, AppError> {
    if user_ids.is_empty() {
        return Err(AppError::BadRequest(
            "user_ids must not be empty".to_string(),
        ));
    }
    if pass_size < 0 {
        return Err(AppError::BadRequest(
            "batch_size must not be negative".to_string(),
        ));
    }

    let batch = state
        .store
        .create_batch(NewBatch {
            job_type: notification_type.to_string(),
            total_count: user_ids.len() as i32,
            metadata: notification_data.clone(),
        })
        .await?;

    tracing::info!(
        "Created batch {} (job_type={}, recipients={})",
        batch.id,
        batch.job_type,
        user_ids.len()
    );

    let mut total_queued: i64 = 0;
    for chunk in user_ids.chunks(FANOUT_CHUNK_SIZE) {
        let items: Vec<NewQueueItem> = chunk
            .iter()
            .map(|user_id| NewQueueItem {
                batch_id: Some(batch.id),
                user_id: user_id.clone(),
                notification_type: notification_type.to_string(),
                notification_data: notification_data.clone(),
                max_attempts: DEFAULT_MAX_ATTEMPTS,
            })
            .collect();

        match state.store.enqueue_items(&items).await {
            Ok(written) => total_queued += written as i64,
            Err(e) => {
                tracing::error!(
                    "Failed to enqueue chunk of {} items for batch {}: {e}",
                    items.len(),
                    batch.id
                );
            }
        }
    }

    let pass = processor::run_pass(state, Some(batch.id), pass_size).await?;

    Ok(CreateBatchOutcome {
        batch_id: batch.id,
        total_queued,
        processed: pass.processed,
    })
}

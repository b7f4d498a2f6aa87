use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewNotification, QueueItem};
use crate::state::AppState;

pub struct PassOutcome {
    pub processed: i64,
    pub failed: i64,
    /// Pending items left after the pass: scoped to the batch if one was
    /// given, system-wide otherwise. Callers use this to decide whether to
    /// schedule another pass.
    pub remaining: i64,
}

/// Run one delivery pass over up to `limit` pending items.
///
/// The claim itself flips items to `processing` and bumps `attempts`, so the
/// count holds even if the process dies mid-delivery. Delivery failures
/// never abort the pass: the item goes back to `pending` while retries
/// remain, or to `failed` once attempts are exhausted. At-least-once, not
/// exactly-once — a crash between delivery and the `sent` stamp means the
/// notification is materialized again on retry.
pub async fn run_pass(
    state: &AppState,
    batch_id: Option<Uuid>,
    limit: i64,
) -> Result<PassOutcome, AppError> {
    // Postgres rejects a negative LIMIT; fail it as bad input instead of a
    // store error, and keep both adapters behaving identically.
    if limit < 0 {
        return Err(AppError::BadRequest(
            "batch_size must not be negative".to_string(),
        ));
    }

    if let Some(id) = batch_id {
        if state.store.mark_batch_processing(id).await? {
            tracing::debug!("Batch {id} moved to processing");
        }
    }

    let items = state.store.claim_pending(batch_id, limit).await?;

    let mut processed: i64 = 0;
    let mut failed: i64 = 0;
    // Batches seen during a system-wide pass; they get the same status
    // bookkeeping a scoped pass gives its batch.
    let mut touched: Vec<Uuid> = Vec::new();

    for item in &items {
        if batch_id.is_none() {
            if let Some(owner) = item.batch_id {
                if !touched.contains(&owner) {
                    if state.store.mark_batch_processing(owner).await? {
                        tracing::debug!("Batch {owner} moved to processing");
                    }
                    touched.push(owner);
                }
            }
        }

        tracing::debug!(
            "Delivering queue item {} (user={}, type={}, attempt {}/{})",
            item.id,
            item.user_id,
            item.notification_type,
            item.attempts,
            item.max_attempts
        );

        let notification = materialize(item);
        match state.sink.deliver(&notification).await {
            Ok(()) => {
                if let Err(e) = state.store.mark_item_sent(item.id).await {
                    tracing::error!("Failed to mark item {} sent: {e}", item.id);
                }
                if let Some(owner) = item.batch_id {
                    if let Err(e) = state.store.increment_processed(owner).await {
                        tracing::error!("Failed to bump processed_count for batch {owner}: {e}");
                    }
                }
                processed += 1;
            }
            Err(e) => {
                tracing::warn!(
                    "Delivery failed for item {} (user={}, attempt {}/{}): {e}",
                    item.id,
                    item.user_id,
                    item.attempts,
                    item.max_attempts
                );
                if item.attempts < item.max_attempts {
                    if let Err(e) = state.store.release_item(item.id, &e.message).await {
                        tracing::error!("Failed to release item {}: {e}", item.id);
                    }
                } else {
                    if let Err(e) = state.store.mark_item_failed(item.id, &e.message).await {
                        tracing::error!("Failed to mark item {} failed: {e}", item.id);
                    }
                    if let Some(owner) = item.batch_id {
                        if let Err(e) = state.store.increment_failed(owner).await {
                            tracing::error!("Failed to bump failed_count for batch {owner}: {e}");
                        }
                    }
                    failed += 1;
                }
            }
        }
    }

    let remaining = match batch_id {
        Some(id) => {
            let pending = state.store.pending_count(Some(id)).await?;
            if pending == 0 && state.store.mark_batch_completed(id).await? {
                tracing::info!("Batch {id} completed");
            }
            pending
        }
        None => {
            for owner in touched {
                if state.store.pending_count(Some(owner)).await? == 0
                    && state.store.mark_batch_completed(owner).await?
                {
                    tracing::info!("Batch {owner} completed");
                }
            }
            state.store.pending_count(None).await?
        }
    };

    Ok(PassOutcome {
        processed,
        failed,
        remaining,
    })
}

/// Turn a queue item into the concrete notification a user will see,
/// defaulting title and message when the payload omits them.
fn materialize(item: &QueueItem) -> NewNotification {
    let title = item
        .notification_data
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("New notification")
        .to_string();
    let message = item
        .notification_data
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("You have a new notification")
        .to_string();

    NewNotification {
        user_id: item.user_id.clone(),
        notification_type: item.notification_type.clone(),
        title,
        message,
        data: item.notification_data.clone(),
    }
}

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::NotificationBatch;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BatchStatusReport {
    #[serde(flatten)]
    pub batch: NotificationBatch,
    pub pending_count: i64,
}

/// Read-only progress snapshot: the batch row plus a live count of items
/// still pending. Callers poll; nothing pushes updates.
pub async fn batch_status(state: &AppState, id: Uuid) -> Result<BatchStatusReport, AppError> {
    let batch = state
        .store
        .find_batch(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch not found".to_string()))?;

    let pending_count = state.store.pending_count(Some(id)).await?;

    Ok(BatchStatusReport {
        batch,
        pending_count,
    })
}

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::ServiceAuth;
use crate::delivery::{DEFAULT_JOB_TYPE, DEFAULT_PASS_SIZE, creator, processor, status};
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateBatchRequest {
    pub user_ids: Vec<String>,
    pub notification_type: Option<String>,
    pub notification_data: Option<serde_json::Value>,
    pub batch_size: Option<i64>,
}

#[derive(Serialize)]
pub struct CreateBatchResponse {
    pub batch_id: Uuid,
    pub total_queued: i64,
    pub processed: i64,
}

pub async fn create(
    _auth: ServiceAuth,
    State(state): State<SharedState>,
    Json(req): Json<CreateBatchRequest>,
) -> Result<Json<CreateBatchResponse>, AppError> {
    let notification_type = req
        .notification_type
        .unwrap_or_else(|| DEFAULT_JOB_TYPE.to_string());
    let notification_data = req.notification_data.unwrap_or_else(|| json!({}));
    let pass_size = req.batch_size.unwrap_or(DEFAULT_PASS_SIZE);

    let outcome = creator::create_batch(
        &state,
        &req.user_ids,
        &notification_type,
        notification_data,
        pass_size,
    )
    .await?;

    Ok(Json(CreateBatchResponse {
        batch_id: outcome.batch_id,
        total_queued: outcome.total_queued,
        processed: outcome.processed,
    }))
}

#[derive(Deserialize, Default)]
pub struct ProcessRequest {
    pub batch_id: Option<Uuid>,
    pub batch_size: Option<i64>,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub processed: i64,
    pub remaining: i64,
    pub failed: i64,
}

pub async fn process(
    _auth: ServiceAuth,
    State(state): State<SharedState>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, AppError> {
    let pass_size = req.batch_size.unwrap_or(DEFAULT_PASS_SIZE);
    let outcome = processor::run_pass(&state, req.batch_id, pass_size).await?;

    Ok(Json(ProcessResponse {
        processed: outcome.processed,
        remaining: outcome.remaining,
        failed: outcome.failed,
    }))
}

pub async fn status(
    _auth: ServiceAuth,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<status::BatchStatusReport>, AppError> {
    let report = status::batch_status(&state, id).await?;
    Ok(Json(report))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};
use uuid::Uuid;

/// One recipient's pending delivery unit. Rows are never deleted; terminal
/// items stay behind as an audit trail.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QueueItem {
    pub id: Uuid,
    pub batch_id: Option<Uuid>,
    pub user_id: String,
    pub notification_type: String,
    pub notification_data: serde_json::Value,
    pub status: ItemStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewQueueItem {
    pub batch_id: Option<Uuid>,
    pub user_id: String,
    pub notification_type: String,
    pub notification_data: serde_json::Value,
    pub max_attempts: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Sent => "sent",
            ItemStatus::Failed => "failed",
        }
    }

    /// Legal transitions: pending -> processing, then processing -> sent,
    /// processing -> pending (failed attempt, retries left) or
    /// processing -> failed (attempts exhausted). Sent and failed are terminal.
    pub fn can_become(self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::Processing)
                | (ItemStatus::Processing, ItemStatus::Sent)
                | (ItemStatus::Processing, ItemStatus::Pending)
                | (ItemStatus::Processing, ItemStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Sent | ItemStatus::Failed)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "processing" => Ok(ItemStatus::Processing),
            "sent" => Ok(ItemStatus::Sent),
            "failed" => Ok(ItemStatus::Failed),
            other => Err(format!("unknown queue item status: {other}")),
        }
    }
}

// Stored as TEXT; delegate to the str impls.
impl Type<Postgres> for ItemStatus {
    fn type_info() -> PgTypeInfo {
        <&str as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <&str as Type<Postgres>>::compatible(ty)
    }
}

impl Encode<'_, Postgres> for ItemStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> Decode<'r, Postgres> for ItemStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<Postgres>>::decode(value)?;
        s.parse().map_err(Into::into)
    }
}

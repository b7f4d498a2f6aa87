use serde::Serialize;

/// A concrete user-visible notification, materialized from a queue item.
/// The member-facing apps read these; this service only writes them.
#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

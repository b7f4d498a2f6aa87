pub mod batch;
pub mod notification;
pub mod queue_item;

pub use batch::{BatchStatus, NewBatch, NotificationBatch};
pub use notification::NewNotification;
pub use queue_item::{ItemStatus, NewQueueItem, QueueItem};

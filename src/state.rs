use std::sync::Arc;

use crate::config::Config;
use crate::store::{NotificationSink, Store};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sink: Arc<dyn NotificationSink>,
    pub config: Config,
}

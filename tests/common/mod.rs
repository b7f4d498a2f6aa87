use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use notifier::config::Config;
use notifier::state::SharedState;
use notifier::store::{MemorySink, MemoryStore};

pub const SERVICE_KEY: &str = "test-service-key";

/// A running test server backed by the in-memory store and sink, both kept
/// around so tests can inject faults and inspect what happened.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub sink: Arc<MemorySink>,
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        service_key: SERVICE_KEY.to_string(),
        host: [127, 0, 0, 1].into(),
        port: 0,
        log_level: "warn".to_string(),
        poll_interval: Duration::from_secs(1),
    }
}

/// App state wired to fresh in-memory adapters, for tests that drive the
/// delivery engine directly instead of going through HTTP.
pub fn engine_state() -> (SharedState, Arc<MemoryStore>, Arc<MemorySink>) {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(MemorySink::new());
    let state = notifier::build_state(store.clone(), sink.clone(), test_config());
    (state, store, sink)
}

pub async fn spawn_app() -> TestApp {
    let (state, store, sink) = engine_state();
    let app = notifier::build_app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server died");
    });

    TestApp {
        addr,
        client: Client::new(),
        store,
        sink,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Create a batch, return (body, status).
    pub async fn create_batch(&self, user_ids: &[&str], batch_size: Option<i64>) -> (Value, StatusCode) {
        let mut body = json!({ "user_ids": user_ids });
        if let Some(size) = batch_size {
            body["batch_size"] = json!(size);
        }
        self.post("/api/v1/batches", &body).await
    }

    /// Create a batch with an explicit type and payload.
    pub async fn create_batch_with(
        &self,
        user_ids: &[&str],
        notification_type: &str,
        data: Value,
        batch_size: Option<i64>,
    ) -> (Value, StatusCode) {
        let mut body = json!({
            "user_ids": user_ids,
            "notification_type": notification_type,
            "notification_data": data,
        });
        if let Some(size) = batch_size {
            body["batch_size"] = json!(size);
        }
        self.post("/api/v1/batches", &body).await
    }

    /// Run one processing pass, return (body, status).
    pub async fn process(&self, batch_id: Option<&str>, batch_size: Option<i64>) -> (Value, StatusCode) {
        let mut body = json!({});
        if let Some(id) = batch_id {
            body["batch_id"] = json!(id);
        }
        if let Some(size) = batch_size {
            body["batch_size"] = json!(size);
        }
        self.post("/api/v1/batches/process", &body).await
    }

    /// Fetch batch status, return (body, status).
    pub async fn status(&self, batch_id: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(&format!("/api/v1/batches/{batch_id}")))
            .header("x-service-key", SERVICE_KEY)
            .send()
            .await
            .expect("status request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    async fn post(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .header("x-service-key", SERVICE_KEY)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

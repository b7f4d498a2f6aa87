mod common;

use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

// ── Health & auth boundary ──────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn rejects_missing_service_key() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/v1/batches"))
        .json(&json!({ "user_ids": ["alice"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejects_wrong_service_key() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url(&format!("/api/v1/batches/{}", Uuid::now_v7())))
        .header("x-service-key", "not-the-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn accepts_bearer_credential() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/v1/batches/process"))
        .bearer_auth(common::SERVICE_KEY)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ── Batch creation ──────────────────────────────────────────────

#[tokio::test]
async fn create_batch_fans_out_per_recipient() {
    let app = common::spawn_app().await;

    // batch_size 0 keeps the synchronous first pass from claiming anything,
    // so the freshly fanned-out items are observable.
    let (body, status) = app.create_batch(&["a", "b", "c"], Some(0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_queued"], 3);
    assert_eq!(body["processed"], 0);

    let items = app.store.items().await;
    assert_eq!(items.len(), 3);
    for item in &items {
        assert_eq!(item.status.as_str(), "pending");
        assert_eq!(item.attempts, 0);
    }

    let (status_body, _) = app.status(body["batch_id"].as_str().unwrap()).await;
    assert_eq!(status_body["total_count"], 3);
    assert_eq!(status_body["pending_count"], 3);
}

#[tokio::test]
async fn create_batch_rejects_empty_user_ids() {
    let app = common::spawn_app().await;

    let (body, status) = app.create_batch(&[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("user_ids"));

    // Rejected before any writes
    assert!(app.store.items().await.is_empty());
}

#[tokio::test]
async fn create_batch_rejects_negative_batch_size() {
    let app = common::spawn_app().await;

    let (body, status) = app.create_batch(&["alice", "bob"], Some(-1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("batch_size"));

    // Rejected before the batch row or any queue rows are written.
    assert!(app.store.items().await.is_empty());
}

#[tokio::test]
async fn payload_title_and_message_reach_the_sink() {
    let app = common::spawn_app().await;

    let data = json!({ "title": "Shift updated", "message": "Check the roster" });
    let (body, status) = app
        .create_batch_with(&["alice"], "shift_update", data.clone(), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 1);

    let delivered = app.sink.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].notification_type, "shift_update");
    assert_eq!(delivered[0].title, "Shift updated");
    assert_eq!(delivered[0].message, "Check the roster");
    assert_eq!(delivered[0].data, data);
}

#[tokio::test]
async fn single_pass_drains_small_batch() {
    let app = common::spawn_app().await;

    let (body, status) = app.create_batch(&["u1", "u2", "u3", "u4", "u5"], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_queued"], 5);
    assert_eq!(body["processed"], 5);

    let (status_body, _) = app.status(body["batch_id"].as_str().unwrap()).await;
    assert_eq!(status_body["status"], "completed");
    assert_eq!(status_body["processed_count"], 5);
    assert_eq!(status_body["failed_count"], 0);
    assert_eq!(status_body["pending_count"], 0);

    assert_eq!(app.sink.delivered().await.len(), 5);
}

// ── Processing passes ───────────────────────────────────────────

#[tokio::test]
async fn bounded_pass_leaves_remainder() {
    let app = common::spawn_app().await;

    let (body, _) = app.create_batch(&["u1", "u2", "u3", "u4", "u5"], Some(0)).await;
    let batch_id = body["batch_id"].as_str().unwrap().to_string();

    let (pass, status) = app.process(Some(&batch_id), Some(2)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pass["processed"], 2);
    assert_eq!(pass["remaining"], 3);
    assert_eq!(pass["failed"], 0);

    let (status_body, _) = app.status(&batch_id).await;
    assert_eq!(status_body["status"], "processing");
    assert_eq!(status_body["processed_count"], 2);

    // Counters never exceed the requested total at any observed point.
    let total = status_body["total_count"].as_i64().unwrap();
    let mut done = status_body["processed_count"].as_i64().unwrap()
        + status_body["failed_count"].as_i64().unwrap();
    assert!(done <= total);

    // Two more passes drain the rest.
    let (pass, _) = app.process(Some(&batch_id), Some(2)).await;
    assert_eq!(pass["processed"], 2);
    assert_eq!(pass["remaining"], 1);

    let (pass, _) = app.process(Some(&batch_id), Some(2)).await;
    assert_eq!(pass["processed"], 1);
    assert_eq!(pass["remaining"], 0);

    let (status_body, _) = app.status(&batch_id).await;
    assert_eq!(status_body["status"], "completed");
    assert_eq!(status_body["processed_count"], 5);
    done = status_body["processed_count"].as_i64().unwrap()
        + status_body["failed_count"].as_i64().unwrap();
    assert_eq!(done, total);
}

#[tokio::test]
async fn retries_until_attempts_exhausted() {
    let app = common::spawn_app().await;
    app.sink.set_fail_all(true);

    let (body, _) = app.create_batch(&["unlucky"], Some(0)).await;
    let batch_id = body["batch_id"].as_str().unwrap().to_string();

    // First two failed attempts put the item back in the queue.
    for expected_attempts in 1..=2 {
        let (pass, _) = app.process(Some(&batch_id), None).await;
        assert_eq!(pass["processed"], 0);
        assert_eq!(pass["failed"], 0);
        assert_eq!(pass["remaining"], 1);

        let item = &app.store.items().await[0];
        assert_eq!(item.attempts, expected_attempts);
        assert_eq!(item.status.as_str(), "pending");
        assert!(item.error_message.is_some());
    }

    // Third failure exhausts max_attempts.
    let (pass, _) = app.process(Some(&batch_id), None).await;
    assert_eq!(pass["failed"], 1);
    assert_eq!(pass["remaining"], 0);

    let item = &app.store.items().await[0];
    assert_eq!(item.status.as_str(), "failed");
    assert_eq!(item.attempts, 3);

    // failed_count incremented exactly once, not once per attempt.
    let (status_body, _) = app.status(&batch_id).await;
    assert_eq!(status_body["status"], "completed");
    assert_eq!(status_body["failed_count"], 1);
    assert_eq!(status_body["processed_count"], 0);
}

#[tokio::test]
async fn mixed_success_and_failure() {
    let app = common::spawn_app().await;
    app.sink.fail_user("bob").await;

    let (body, _) = app.create_batch(&["alice", "bob"], None).await;
    let batch_id = body["batch_id"].as_str().unwrap().to_string();
    assert_eq!(body["processed"], 1);

    // Bob needs two more passes to run out of attempts.
    app.process(Some(&batch_id), None).await;
    let (pass, _) = app.process(Some(&batch_id), None).await;
    assert_eq!(pass["failed"], 1);

    let (status_body, _) = app.status(&batch_id).await;
    assert_eq!(status_body["status"], "completed");
    assert_eq!(status_body["processed_count"], 1);
    assert_eq!(status_body["failed_count"], 1);
    assert_eq!(status_body["pending_count"], 0);

    let delivered = app.sink.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].user_id, "alice");
}

#[tokio::test]
async fn process_rejects_negative_batch_size() {
    let app = common::spawn_app().await;

    let (body, status) = app.process(None, Some(-1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("batch_size"));
}

#[tokio::test]
async fn process_unknown_batch_returns_zeros() {
    let app = common::spawn_app().await;

    let id = Uuid::now_v7().to_string();
    let (pass, status) = app.process(Some(&id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pass["processed"], 0);
    assert_eq!(pass["remaining"], 0);
    assert_eq!(pass["failed"], 0);
}

#[tokio::test]
async fn system_wide_pass_drains_all_batches() {
    let app = common::spawn_app().await;

    let (first, _) = app.create_batch(&["a1", "a2"], Some(0)).await;
    let (second, _) = app.create_batch(&["b1", "b2", "b3"], Some(0)).await;

    let (pass, _) = app.process(None, None).await;
    assert_eq!(pass["processed"], 5);
    assert_eq!(pass["remaining"], 0);

    for body in [&first, &second] {
        let (status_body, _) = app.status(body["batch_id"].as_str().unwrap()).await;
        assert_eq!(status_body["status"], "completed");
    }
}

// ── Status reporting ────────────────────────────────────────────

#[tokio::test]
async fn status_is_idempotent_between_passes() {
    let app = common::spawn_app().await;

    let (body, _) = app.create_batch(&["x", "y"], Some(0)).await;
    let batch_id = body["batch_id"].as_str().unwrap().to_string();

    let (first, status) = app.status(&batch_id).await;
    assert_eq!(status, StatusCode::OK);
    let (second, _) = app.status(&batch_id).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn status_unknown_batch_returns_404() {
    let app = common::spawn_app().await;

    let (body, status) = app.status(&Uuid::now_v7().to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use proctord::{build_router, AppState, Config};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

fn temp_data_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn test_router(prefix: &str) -> Router {
    let config = Config {
        data_dir: temp_data_dir(prefix),
        bind: "127.0.0.1:0".to_string(),
        room_capacity: 16,
    };
    let state = AppState::new(config).expect("app state");
    build_router(state)
}

async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get_json(app: &Router, path: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn fresh_org_first_violation_counts_from_one() {
    let app = test_router("proctord-flow-fresh");

    let (status, body) = post_json(
        &app,
        "/report_violation",
        json!({ "org_id": "ABC123", "user_id": "U1", "type": "face_outside_webcam_frame" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["count"], 1);

    let (status, summary) = get_json(&app, "/violation_summary/ABC123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["U1"]["name"], "placeholder");
    assert_eq!(summary["U1"]["face_outside_webcam_frame"], 1);
}

#[tokio::test]
async fn report_then_summary_shows_exactly_one_increment() {
    let app = test_router("proctord-flow-roundtrip");

    post_json(
        &app,
        "/report_violation",
        json!({ "org_id": "ABC123", "user_id": "U1", "type": "eye_outside_frame" }),
    )
    .await;
    let (_, before) = get_json(&app, "/violation_summary/ABC123").await;

    let (status, body) = post_json(
        &app,
        "/report_violation",
        json!({ "org_id": "ABC123", "user_id": "U1", "type": "eye_outside_frame" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = get_json(&app, "/violation_summary/ABC123").await;
    let prev = before["U1"]["eye_outside_frame"].as_u64().expect("before");
    let next = after["U1"]["eye_outside_frame"].as_u64().expect("after");
    assert_eq!(next, prev + 1);
    // The pull path reflects at least what the reporting call returned.
    assert!(next >= body["count"].as_u64().expect("count"));
}

#[tokio::test]
async fn registered_name_resolves_on_first_violation() {
    let app = test_router("proctord-flow-name");

    // Provision the org via the register path, which requires it to exist:
    // report first (lazy provision), then register and report a second user.
    post_json(
        &app,
        "/report_violation",
        json!({ "org_id": "ABC123", "user_id": "U0", "type": "eye_outside_frame" }),
    )
    .await;

    let (status, _) = post_json(
        &app,
        "/register_user",
        json!({ "org_id": "ABC123", "exam_id": "U1", "name": "Alice" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    post_json(
        &app,
        "/report_violation",
        json!({ "org_id": "ABC123", "user_id": "U1", "type": "eye_outside_frame" }),
    )
    .await;
    let (_, summary) = get_json(&app, "/violation_summary/ABC123").await;
    assert_eq!(summary["U1"]["name"], "Alice");
}

#[tokio::test]
async fn missing_fields_are_rejected_with_400() {
    let app = test_router("proctord-flow-validate");

    for body in [
        json!({ "user_id": "U1", "type": "eye_outside_frame" }),
        json!({ "org_id": "ABC123", "type": "eye_outside_frame" }),
        json!({ "org_id": "ABC123", "user_id": "U1" }),
        json!({ "org_id": "ABC123", "user_id": "", "type": "eye_outside_frame" }),
    ] {
        let (status, resp) = post_json(&app, "/report_violation", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["status"], "error");
        assert_eq!(resp["code"], "bad_params");
    }
}

#[tokio::test]
async fn summary_of_unknown_org_is_empty_object() {
    let app = test_router("proctord-flow-empty");

    let (status, summary) = get_json(&app, "/violation_summary/ZZZ999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary, json!({}));
}

#[tokio::test]
async fn path_escaping_org_id_is_rejected() {
    let app = test_router("proctord-flow-path");

    let (status, _) = post_json(
        &app,
        "/report_violation",
        json!({ "org_id": "..%2Fup", "user_id": "U1", "type": "eye_outside_frame" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn garbage_org_ids_are_rejected_before_any_state_exists() {
    let data_dir = temp_data_dir("proctord-flow-garbage");
    let config = Config {
        data_dir: data_dir.clone(),
        bind: "127.0.0.1:0".to_string(),
        room_capacity: 16,
    };
    let state = AppState::new(config).expect("app state");
    let app = build_router(state);

    let bad_ids = ["x", "toolongtoolong", "has space", "a/b/c", &"A".repeat(4096)];
    for bad in bad_ids {
        let (status, resp) = post_json(
            &app,
            "/report_violation",
            json!({ "org_id": bad, "user_id": "U1", "type": "eye_outside_frame" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted org_id {bad:?}");
        assert_eq!(resp["code"], "bad_params");
    }

    // Nothing was provisioned for any of them: the data dir holds only the
    // credentials database, no org directories.
    let dirs = std::fs::read_dir(&data_dir)
        .expect("read data dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .count();
    assert_eq!(dirs, 0, "rejected reports must not create org state");
}

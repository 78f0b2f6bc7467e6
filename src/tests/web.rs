use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tower::ServiceExt;

use super::fixtures::site_snapshot;
use crate::{app::Library, config::Config, web::router};

fn create_router() -> (Router, Arc<RwLock<Library>>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let mut library = Library::new(tmp.path());
    library.run_queue();

    let library = Arc::new(RwLock::new(library));
    (router(library.clone(), Config::default()), library, tmp)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status() {
    let (app, _library, _tmp) = create_router();

    let (status, body) = call(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"version": env!("CARGO_PKG_VERSION")}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_then_search() {
    let (app, library, tmp) = create_router();
    site_snapshot(
        tmp.path(),
        "a.tar",
        "000000000000002a",
        "https://a.example/",
        "Web Page",
        "served over http",
    );

    let (status, _) = call(&app, "POST", "/api/index/update", Some(json!({"path": "a.tar"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // drain the queue
    tokio::task::block_in_place(|| library.blocking_write().close()).unwrap();

    let (status, body) = call(
        &app,
        "POST",
        "/api/search",
        Some(json!({"query": "served", "highlight": true, "maxCount": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["uid"], json!(42));
    assert_eq!(matches[0]["url"], json!("https://a.example/"));
    assert_eq!(matches[0]["title"], json!("Web Page"));
    assert!(matches[0]["snippet"].as_str().unwrap().contains("<b>served</b>"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_missing_snapshot() {
    let (app, _library, _tmp) = create_router();

    let (status, body) = call(
        &app,
        "POST",
        "/api/index/update",
        Some(json!({"path": "missing.tar"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing.tar"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_outside_library_is_refused() {
    let (app, _library, _tmp) = create_router();
    let elsewhere = tempfile::tempdir().unwrap();
    let path = site_snapshot(
        elsewhere.path(),
        "other.tar",
        "0000000000000001",
        "https://other.example/",
        "Other",
        "elsewhere",
    );

    let (status, body) = call(&app, "POST", "/api/index/update", Some(json!({"path": path}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("outside the library"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_query_is_bad_request() {
    let (app, _library, _tmp) = create_router();

    let (status, body) = call(&app, "POST", "/api/search", Some(json!({"query": "\"open"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid query"));
}

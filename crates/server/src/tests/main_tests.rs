use super::*;
use axum::{body, body::Body, http::Request};
use chrono::Utc;
use shared::{domain::NewPost, protocol::TOTAL_COUNT_HEADER};
use tower::ServiceExt;

async fn test_app() -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    for (title, author) in [("First", "alice"), ("Second", "bob"), ("Third", "alice")] {
        storage
            .create_post(&NewPost::new(title, author, "body"), Utc::now())
            .await
            .expect("seed");
    }
    let api = ApiContext {
        storage: storage.clone(),
    };
    let app = build_router(Arc::new(AppState { api }), 64 * 1024);
    (app, storage)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _storage) = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn list_route_pages_and_reports_total_header() {
    let (app, _storage) = test_app().await;
    let request = Request::get("/posts?_page=1&_limit=2&_sort=title&_order=desc&q=")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("3")
    );

    let body = json_body(response).await;
    let titles: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|post| post["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Third", "Second"]);
}

#[tokio::test]
async fn list_route_filters_by_search_text() {
    let (app, _storage) = test_app().await;
    let request = Request::get("/posts?q=alice")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(
        response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("2")
    );
}

#[tokio::test]
async fn list_route_rejects_unknown_sort_field() {
    let (app, _storage) = test_app().await;
    let request = Request::get("/posts?_sort=secret")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "validation");
    assert!(body["message"].as_str().expect("message").contains("secret"));
}

#[tokio::test]
async fn create_route_returns_created_post_with_server_stamp() {
    let (app, storage) = test_app().await;
    let request = Request::post("/posts")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "title": "A",
                "author": "B",
                "body": "C",
                "lastUpdated": "1999-01-01T00:00:00Z"
            })
            .to_string(),
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["id"], 4);
    assert_ne!(body["lastUpdated"], "1999-01-01T00:00:00Z");
    assert_eq!(storage.count_posts().await.expect("count"), 4);
}

#[tokio::test]
async fn patch_route_updates_only_sent_fields() {
    let (app, _storage) = test_app().await;
    let request = Request::patch("/posts/2")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "title": "Renamed", "lastUpdated": "2024-01-01T00:00:00Z" })
                .to_string(),
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["author"], "bob");
}

#[tokio::test]
async fn delete_route_returns_not_found_for_missing_post() {
    let (app, _storage) = test_app().await;
    let request = Request::delete("/posts/42")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["message"], "post 42 not found");
}

#[tokio::test]
async fn delete_route_removes_post() {
    let (app, storage) = test_app().await;
    let request = Request::delete("/posts/1")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(storage.count_posts().await.expect("count"), 2);
}

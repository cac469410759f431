use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{harness, payload, Harness, Reply, StubFetcher};
use crate::auth::AccessTokens;
use crate::cache::cache_key;
use crate::storage::{BackendMemory, StorageManager};
use crate::web;

struct TestApp {
    router: Router,
    fetcher: Arc<StubFetcher>,
    storage: Arc<BackendMemory>,
}

fn app(reply: Reply, tokens: AccessTokens) -> TestApp {
    let Harness {
        service,
        fetcher,
        storage,
        ..
    } = harness(reply);

    TestApp {
        router: web::router(Arc::new(service), tokens),
        fetcher,
        storage,
    }
}

fn locked() -> AccessTokens {
    AccessTokens {
        edit: Some("edit-secret".to_string()),
        admin: Some("admin-secret".to_string()),
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
    };
    (status, body)
}

fn import_request(url: &str, token: Option<&str>) -> Request<Body> {
    request(
        Method::POST,
        "/api/videos/import",
        token,
        Some(json!({ "url": url })),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_returns_record() {
    let app = app(Reply::Payload(payload("walkoff")), AccessTokens::default());

    let (status, body) = send(
        &app.router,
        import_request("https://www.mlb.com/video/walkoff", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "walkoff");
    assert_eq!(body["videoUrl"], "https://cuts.mlb.com/walkoff.mp4");
    assert_eq!(body["duration"], 90);
    assert!(body["posterUrl"].as_str().unwrap().ends_with("/poster01.jpg"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_errors_map_to_status_codes() {
    let app = app(Reply::Status(StatusCode::NOT_FOUND), AccessTokens::default());

    let (status, body) = send(&app.router, import_request("https://example.com/x", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_url");

    let (status, body) = send(
        &app.router,
        import_request("https://www.mlb.com/video/gone", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "fetch_failed");
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_body_errors_keep_error_shape() {
    let app = app(Reply::Payload(payload("walkoff")), AccessTokens::default());
    let raw = |content_type: Option<&str>, body: &str| {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/videos/import");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    };

    let (status, body) = send(&app.router, raw(Some("application/json"), "{oops")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = send(&app.router, raw(None, "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_url");

    let (status, body) = send(
        &app.router,
        raw(None, r#"{"url":"https://www.mlb.com/video/walkoff"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "walkoff");
    assert_eq!(app.fetcher.calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_requires_edit_token() {
    let app = app(Reply::Payload(payload("walkoff")), locked());
    let url = "https://www.mlb.com/video/walkoff";

    let (status, body) = send(&app.router, import_request(url, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let (status, _) = send(&app.router, import_request(url, Some("wrong"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.fetcher.calls(), 0);

    let (status, _) = send(&app.router, import_request(url, Some("edit-secret"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, import_request(url, Some("admin-secret"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.fetcher.calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_validate_never_errors() {
    let app = app(Reply::Payload(payload("walkoff")), AccessTokens::default());

    let (status, body) = send(
        &app.router,
        request(
            Method::GET,
            "/api/videos/validate?url=https%3A%2F%2Fwww.mlb.com%2Fvideo%2Fabc123",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": true, "slug": "abc123" }));

    for uri in [
        "/api/videos/validate",
        "/api/videos/validate?url=",
        "/api/videos/validate?url=%ZZ%",
        "/api/videos/validate?other=1",
    ] {
        let (status, body) = send(&app.router, request(Method::GET, uri, None, None)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!({ "valid": false, "slug": null }), "{uri}");
    }

    assert_eq!(app.fetcher.calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_cache_needs_admin() {
    let app = app(Reply::Payload(payload("clip")), locked());

    let (status, _) = send(
        &app.router,
        request(Method::DELETE, "/api/videos/cache", Some("edit-secret"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app.router,
        request(Method::DELETE, "/api/videos/cache", Some("admin-secret"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "cleared": 0 }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_cache_by_body_query_and_all() {
    let app = app(Reply::Payload(payload("clip")), AccessTokens::default());
    for slug in ["a", "b", "c", "d"] {
        let (status, _) = send(
            &app.router,
            import_request(&format!("https://www.mlb.com/video/{slug}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    app.storage.write("unrelated", b"keep me").unwrap();

    let (status, body) = send(
        &app.router,
        request(
            Method::DELETE,
            "/api/videos/cache",
            None,
            Some(json!({ "slug": "a" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 1);
    assert!(!app.storage.exists(&cache_key("a")));

    let (_, body) = send(
        &app.router,
        request(Method::DELETE, "/api/videos/cache?slug=b", None, None),
    )
    .await;
    assert_eq!(body["cleared"], 1);

    let (status, body) = send(
        &app.router,
        request(Method::DELETE, "/api/videos/cache", None, Some(json!("{oops"))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (_, body) = send(
        &app.router,
        request(Method::DELETE, "/api/videos/cache", None, Some(json!({ "slug": " " }))),
    )
    .await;
    assert_eq!(body, json!({ "success": true, "cleared": 2 }));
    assert_eq!(app.storage.list(), vec!["unrelated".to_string()]);
}

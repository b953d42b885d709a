//! HTTP-level tests for the axum router, driven with `tower::ServiceExt`.

#![cfg(feature = "axum-integration")]

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{local_harness, unwritable_harness};
use html2pdf_gateway::integrations::axum::{AppState, router};
use html2pdf_gateway::service::GENERIC_ERROR_MESSAGE;
use serde_json::Value;
use tower::ServiceExt;

const HOST: &str = "pdf.test:3000";
const LIMIT: usize = 64 * 1024;

async fn app() -> (Router, common::Harness) {
    app_over(local_harness().await)
}

fn app_over(h: common::Harness) -> (Router, common::Harness) {
    let app = router(
        AppState::new(h.service.clone(), h.sessions.clone()),
        LIMIT,
    );
    (app, h)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(body: &str) -> Request<Body> {
    Request::post("/api/v1/pdf")
        .header(header::HOST, HOST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn download_path(url: &str) -> &str {
    url.strip_prefix(&format!("http://{}", HOST)).unwrap()
}

fn filename_of(url: &str) -> &str {
    url.rsplit('/').next().unwrap()
}

#[tokio::test]
async fn test_create_and_download_once() {
    let (app, _h) = app().await;

    let response = app
        .clone()
        .oneshot(post_json(r#"{"html":"<h1>Hi</h1>"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with(&format!("http://{}/api/v1/pdf/download/", HOST)));
    assert!(url.ends_with(".pdf"));

    let response = app
        .clone()
        .oneshot(Request::get(download_path(&url)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"")
    );
    let pdf = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(pdf.starts_with(b"%PDF-"));

    let response = app
        .oneshot(Request::get(download_path(&url)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "File not found or expired");
}

#[tokio::test]
async fn test_forwarded_proto_is_used_in_link() {
    let (app, _h) = app().await;

    let request = Request::post("/api/v1/pdf")
        .header(header::HOST, "pdf.example.com")
        .header("x-forwarded-proto", "https")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("url=https%3A%2F%2Fexample.com"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert!(
        body["data"]["url"]
            .as_str()
            .unwrap()
            .starts_with("https://pdf.example.com/api/v1/pdf/download/")
    );
}

#[tokio::test]
async fn test_multipart_upload() {
    let (app, h) = app().await;

    let boundary = "X-BOUNDARY";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"htmlFile\"; filename=\"page.html\"\r\n\
         Content-Type: text/html\r\n\r\n\
         <p>from upload</p>\r\n\
         --{b}--\r\n",
        b = boundary
    );
    let request = Request::post("/api/v1/pdf")
        .header(header::HOST, HOST)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(h.engine.exports(), 1);
}

#[tokio::test]
async fn test_missing_input_is_bad_request() {
    let (app, h) = app().await;

    let response = app.oneshot(post_json("{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(h.engine.launches(), 0);
}

#[tokio::test]
async fn test_render_failure_reports_error_status() {
    let (app, h) = app().await;
    h.engine.set_fail_export(true);

    let response = app
        .oneshot(post_json(r#"{"url":"https://example.com"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().starts_with("PDF rendering failed"));
}

#[tokio::test]
async fn test_storage_failure_hides_details() {
    let (app, h) = app_over(unwritable_harness());

    let response = app
        .oneshot(post_json(r#"{"html":"<h1>Hi</h1>"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.engine.exports(), 1);

    let body = json_body(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_abandoned_download_keeps_artifact() {
    let (app, h) = app().await;

    let response = app
        .clone()
        .oneshot(post_json(r#"{"html":"<h1>Hi</h1>"}"#))
        .await
        .unwrap();
    let body = json_body(response).await;
    let url = body["data"]["url"].as_str().unwrap().to_string();

    // Client goes away before reading the body.
    let response = app
        .clone()
        .oneshot(Request::get(download_path(&url)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    drop(response);
    tokio::task::yield_now().await;

    assert!(h.store.file_exists(filename_of(&url)).await.unwrap());

    let response = app
        .oneshot(Request::get(download_path(&url)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let pdf = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert!(!h.store.file_exists(filename_of(&url)).await.unwrap());
}

#[tokio::test]
async fn test_download_traversal_rejected() {
    let (app, _h) = app().await;

    let response = app
        .oneshot(
            Request::get("/api/v1/pdf/download/..%2Fsecret.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route() {
    let (app, _h) = app().await;

    let response = app
        .oneshot(Request::get("/nope?x=1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Can't find /nope?x=1 on this server!");
}

#[tokio::test]
async fn test_health_reports_session() {
    let (app, h) = app().await;
    h.sessions.warmup().await.unwrap();

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["engine"], "mock");
    assert_eq!(body["session"]["live"], true);
    assert_eq!(body["session"]["launches"], 1);
}

mod common;

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use rust_site_scraper::api::models::{ScrapeResult, ScrapeStatus, ScrapeUpdate, TaskState, TaskStatus, UpdateStatus};
use rust_site_scraper::api::routes::create_router;
use rust_site_scraper::client::sse::SseDecoder;
use rust_site_scraper::config::Config;
use rust_site_scraper::AppState;

use common::{page_url, small_site};

fn app(mode: &str) -> Router {
    let config = Config::from_lookup(|key| match key {
        "DELIVERY_MODE" => Some(mode.to_string()),
        "REQUEST_DELAY_MS" => Some("0".to_string()),
        _ => None,
    })
    .unwrap();
    create_router(AppState::new(config).unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_scrape(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/scrape")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn immediate_scrape_returns_results_and_stores_them() {
    let site = small_site().await;
    let app = app("immediate");

    let (status, _, body) = send(&app, post_scrape(json!({ "url": page_url(&site, "/"), "max_workers": 5 }))).await;
    assert_eq!(status, StatusCode::OK);
    let result: ScrapeResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.status, ScrapeStatus::Completed);
    assert_eq!(result.job_id, Some(1));
    assert_eq!(result.content.len(), 3);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.total_pages_scraped, Some(3));
    assert_eq!(result.url_tree.as_ref().unwrap().node_count(), 4);
    assert!(result.formatted_content.as_ref().unwrap().starts_with("{\n  \"content\""));

    let (status, _, body) = send(&app, get("/show_content/1")).await;
    assert_eq!(status, StatusCode::OK);
    let stored: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stored["total_pages_attempted"], 4);
    assert_eq!(stored["start_url"], page_url(&site, "/"));

    let (status, headers, body) = send(&app, get("/download/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=scraped_content_1.json"
    );
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("application/json"));
    assert_eq!(String::from_utf8(body).unwrap(), result.formatted_content.unwrap());
}

#[tokio::test]
async fn blank_and_malformed_urls_are_rejected() {
    let app = app("immediate");

    let (status, _, body) = send(&app, post_scrape(json!({ "url": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "status": "error", "message": "Please enter a valid URL" }));

    let (status, _, body) = send(&app, post_scrape(json!({ "url": "ftp://files.test/" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: ScrapeResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.status, ScrapeStatus::Error);
    assert!(body.message.unwrap().contains("Unsupported URL scheme"));
}

#[tokio::test]
async fn unreadable_request_bodies_use_the_error_body() {
    let app = app("immediate");

    let (status, _, body) = send(&app, post_scrape(json!({ "max_workers": 5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: ScrapeResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.status, ScrapeStatus::Error);
    let message = body.message.unwrap();
    assert!(message.starts_with("Invalid scrape request"));
    assert!(message.contains("url"));

    let request = Request::builder()
        .method("POST")
        .uri("/scrape")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = app("polled");

    for uri in ["/task_status/nope", "/scrape_updates/nope", "/show_content/9", "/download/9"] {
        let (status, _, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "error");
    }

    let (_, _, body) = send(&app, get("/download/9")).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Content not found");
}

#[tokio::test]
async fn polled_scrape_runs_in_the_background() {
    let site = small_site().await;
    let app = app("polled");

    let (status, _, body) = send(&app, post_scrape(json!({ "url": page_url(&site, "/") }))).await;
    assert_eq!(status, StatusCode::OK);
    let started: ScrapeResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(started.status, ScrapeStatus::TaskStarted);
    let task_id = started.task_id.expect("task id");

    let mut finished = None;
    for _ in 0..200 {
        let (status, _, body) = send(&app, get(&format!("/task_status/{}", task_id))).await;
        assert_eq!(status, StatusCode::OK);
        let task: TaskStatus = serde_json::from_slice(&body).unwrap();
        if task.state.is_terminal() {
            finished = Some(task);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let task = finished.expect("task finished");
    assert_eq!(task.state, TaskState::Success);
    let result = task.result.unwrap();
    assert_eq!(result.job_id, started.job_id);
    assert_eq!(result.content.len(), 3);

    let (status, _, _) = send(&app, get(&format!("/download/{}", started.job_id.unwrap()))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn streamed_scrape_ends_with_a_completed_update() {
    let site = small_site().await;
    let app = app("streamed");

    let (_, _, body) = send(&app, post_scrape(json!({ "url": page_url(&site, "/") }))).await;
    let started: ScrapeResult = serde_json::from_slice(&body).unwrap();
    let task_id = started.task_id.unwrap();

    let (status, headers, body) = send(&app, get(&format!("/scrape_updates/{}", task_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/event-stream"));

    let updates: Vec<ScrapeUpdate> = SseDecoder::new()
        .push(&body)
        .iter()
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();
    assert!(!updates.is_empty());

    let last = updates.last().unwrap();
    assert_eq!(last.status, UpdateStatus::Completed);
    assert_eq!(last.pages_scraped, 3);
    assert_eq!(last.result.as_ref().unwrap().content.len(), 3);
    assert!(updates[..updates.len() - 1].iter().all(|u| u.status != UpdateStatus::Completed));
}

#[tokio::test]
async fn health_check() {
    let (status, _, body) = send(&app("immediate"), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

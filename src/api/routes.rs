use axum::{
    routing::{get, post},
    Router,
    extract::{rejection::JsonRejection, Json, Path, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::Stream;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{Result, AppError};
use crate::api::models::{download_filename, ScrapeReport, ScrapeRequest, ScrapeResult, TaskStatus};
use crate::api::response;
use crate::config::DeliveryMode;
use crate::crawler::{parse_start_url, CrawlJob, NoProgress};
use crate::store::JobStatus;
use crate::tasks::run_scrape_task;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/scrape", post(scrape_handler))
        .route("/task_status/:task_id", get(task_status_handler))
        .route("/scrape_updates/:task_id", get(scrape_updates_handler))
        .route("/show_content/:job_id", get(show_content_handler))
        .route("/download/:job_id", get(download_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn scrape_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = payload.map_err(|rejection| {
        AppError::ValidationError(format!("Invalid scrape request: {}", rejection.body_text()))
    })?;
    let job = CrawlJob::from_request(&req, &state.config.crawl);
    if job.start_url.is_empty() {
        return Err(AppError::ValidationError("Please enter a valid URL".to_string()));
    }
    parse_start_url(&job.start_url)?;

    info!("Processing {} scrape request for URL: {}", state.config.delivery_mode, job.start_url);
    match state.config.delivery_mode {
        DeliveryMode::Immediate => scrape_inline(&state, job).await,
        DeliveryMode::Polled | DeliveryMode::Streamed => Ok(start_task(&state, job).into_response()),
    }
}

async fn scrape_inline(state: &AppState, job: CrawlJob) -> Result<Response> {
    let start_time = std::time::Instant::now();
    let job_id = state.store.create_job(&job.start_url);

    // The whole crawl shares one deadline
    let result = tokio::time::timeout(
        state.config.scrape_timeout,
        state.crawler.crawl(&job, &NoProgress),
    ).await;
    info!("Scrape of {} took {:?}", job.start_url, start_time.elapsed());

    match result {
        Ok(Ok(report)) => {
            let formatted = format_report(&report)?;
            state.store.save_content(job_id, report.clone());
            state.store.update_job_status(job_id, JobStatus::Completed);
            Ok(response::success(ScrapeResult::completed(job_id, report, formatted)).into_response())
        }
        Ok(Err(err)) => {
            warn!("Scrape of {} failed: {}", job.start_url, err);
            state.store.update_job_status(job_id, JobStatus::Failed);
            Err(err)
        }
        Err(_) => {
            warn!("Scrape of {} timed out after {:?}", job.start_url, state.config.scrape_timeout);
            state.store.update_job_status(job_id, JobStatus::Failed);
            Err(AppError::Timeout("Request processing timed out".to_string()))
        }
    }
}

fn start_task(state: &AppState, job: CrawlJob) -> impl IntoResponse {
    let job_id = state.store.create_job(&job.start_url);
    let task_id = state.tasks.create();
    info!("Started task {} for job {}", task_id, job_id);

    tokio::spawn(run_scrape_task(
        state.crawler.clone(),
        state.store.clone(),
        state.tasks.clone(),
        task_id.clone(),
        job_id,
        job,
    ));

    response::success(ScrapeResult::task_started(task_id, job_id))
}

async fn task_status_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatus>> {
    state
        .tasks
        .snapshot(&task_id)
        .map(|snapshot| Json(snapshot.to_status()))
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

async fn scrape_updates_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let mut rx = state
        .tasks
        .subscribe(&task_id)
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    let stream = async_stream::stream! {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            let finished = snapshot.is_finished();
            yield Event::default().json_data(snapshot.to_update());
            if finished || rx.changed().await.is_err() {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn show_content_handler(
    State(state): State<AppState>,
    Path(job_id): Path<u64>,
) -> Result<Json<ScrapeReport>> {
    state
        .store
        .get_content(job_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Content not found".to_string()))
}

async fn download_handler(
    State(state): State<AppState>,
    Path(job_id): Path<u64>,
) -> Result<Response> {
    let job = state
        .store
        .get_job(job_id)
        .ok_or_else(|| AppError::NotFound("Content not found".to_string()))?;
    let report = job
        .content
        .ok_or_else(|| AppError::NotFound("Content not found".to_string()))?;
    info!(
        "Serving download of job {} ({}, {}, created {})",
        job.id,
        job.url,
        job.status.as_str(),
        job.created_at.to_rfc3339()
    );
    let formatted = format_report(&report)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", download_filename(job_id)),
            ),
        ],
        formatted,
    )
        .into_response())
}

/// Pretty JSON with object keys sorted at every level.
pub fn format_report(report: &ScrapeReport) -> Result<String> {
    let value = sort_keys(serde_json::to_value(report)?);
    Ok(serde_json::to_string_pretty(&value)?)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

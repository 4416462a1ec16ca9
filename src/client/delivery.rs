//! How the final result of a submission reaches the controller.
//!
//! A deployment picks one strategy. `Immediate` expects the result in the
//! submit response; `Polled` and `Streamed` expect a task id and follow the
//! task until it finishes. Every failure ends the submission, nothing is
//! retried.

use futures::StreamExt;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::api::models::{
    PageContent, ScrapeResult, ScrapeStatus, TaskResult, TaskState, TreeNode, UpdateStatus,
};
use crate::client::api::ScrapeApi;
use crate::config::DeliveryMode;
use crate::error::{AppError, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultDelivery {
    #[default]
    Immediate,
    Polled { interval: Duration },
    Streamed,
}

impl ResultDelivery {
    pub fn from_mode(mode: DeliveryMode, poll_interval: Duration) -> Self {
        match mode {
            DeliveryMode::Immediate => ResultDelivery::Immediate,
            DeliveryMode::Polled => ResultDelivery::Polled { interval: poll_interval },
            DeliveryMode::Streamed => ResultDelivery::Streamed,
        }
    }

    /// Turns the submit response into the final result, following the task
    /// when the strategy calls for it. `on_event` sees intermediate progress.
    pub async fn deliver(
        &self,
        api: &dyn ScrapeApi,
        submitted: ScrapeResult,
        on_event: &mut dyn FnMut(DeliveryEvent),
    ) -> Result<FinalResult> {
        if submitted.status == ScrapeStatus::Error {
            return Err(backend_failure(submitted.message));
        }

        match *self {
            ResultDelivery::Immediate => immediate(submitted),
            ResultDelivery::Polled { interval } => poll(api, submitted, interval, on_event).await,
            ResultDelivery::Streamed => stream(api, submitted, on_event).await,
        }
    }
}

/// Progress observed while a task is still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    Status(String),
    Tree(TreeNode),
}

/// What the controller renders once a submission succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResult {
    pub job_id: Option<u64>,
    pub content: Vec<PageContent>,
    pub errors: Vec<String>,
    pub url_tree: Option<TreeNode>,
    pub formatted_content: Option<String>,
}

impl FinalResult {
    fn from_response(result: ScrapeResult) -> Self {
        Self {
            job_id: result.job_id,
            content: result.content,
            errors: result.errors,
            url_tree: result.url_tree,
            formatted_content: result.formatted_content,
        }
    }

    fn from_task(result: TaskResult, job_id: Option<u64>) -> Self {
        Self {
            job_id: result.job_id.or(job_id),
            content: result.content,
            errors: result.errors,
            url_tree: result.url_tree,
            formatted_content: None,
        }
    }
}

fn backend_failure(message: Option<String>) -> AppError {
    AppError::BackendError(message.unwrap_or_else(|| "Failed to scrape website".to_string()))
}

fn immediate(submitted: ScrapeResult) -> Result<FinalResult> {
    match submitted.status {
        ScrapeStatus::Completed | ScrapeStatus::Success => Ok(FinalResult::from_response(submitted)),
        ScrapeStatus::TaskStarted => Err(AppError::BackendError(
            "Server started a background task but this client expects an immediate result".to_string(),
        )),
        ScrapeStatus::Error => Err(backend_failure(submitted.message)),
    }
}

fn task_id(submitted: &ScrapeResult) -> Result<String> {
    match (&submitted.status, &submitted.task_id) {
        (ScrapeStatus::TaskStarted, Some(task_id)) => Ok(task_id.clone()),
        (ScrapeStatus::TaskStarted, None) => {
            Err(AppError::BackendError("Server started a task without a task id".to_string()))
        }
        _ => Err(AppError::BackendError(
            "Server returned a result directly but this client expects a background task".to_string(),
        )),
    }
}

async fn poll(
    api: &dyn ScrapeApi,
    submitted: ScrapeResult,
    interval: Duration,
    on_event: &mut dyn FnMut(DeliveryEvent),
) -> Result<FinalResult> {
    let task_id = task_id(&submitted)?;
    // tokio intervals cannot have a zero period
    let interval = if interval.is_zero() { DEFAULT_POLL_INTERVAL } else { interval };
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let status = api.task_status(&task_id).await?;
        debug!("Task {} is {:?}: {}", task_id, status.state, status.status);

        match status.state {
            TaskState::Pending | TaskState::Progress => {
                on_event(DeliveryEvent::Status(format!("Scraping in progress... {}", status.status)));
            }
            TaskState::Success => {
                let result = status.result.ok_or_else(|| {
                    AppError::BackendError("Task finished without a result".to_string())
                })?;
                return Ok(FinalResult::from_task(result, submitted.job_id));
            }
            TaskState::Failure | TaskState::Unknown => {
                let detail = if status.status.is_empty() {
                    "Task failed".to_string()
                } else {
                    format!("Task failed: {}", status.status)
                };
                return Err(AppError::BackendError(detail));
            }
        }
    }
}

async fn stream(
    api: &dyn ScrapeApi,
    submitted: ScrapeResult,
    on_event: &mut dyn FnMut(DeliveryEvent),
) -> Result<FinalResult> {
    let task_id = task_id(&submitted)?;
    let mut updates = api.scrape_updates(&task_id).await?;

    while let Some(update) = updates.next().await {
        let update = update?;
        if let Some(tree) = &update.url_tree {
            on_event(DeliveryEvent::Tree(tree.clone()));
        }

        match update.status {
            UpdateStatus::Started | UpdateStatus::Progress => {
                on_event(DeliveryEvent::Status(format!(
                    "Scraping in progress... {} pages scraped",
                    update.pages_scraped
                )));
            }
            UpdateStatus::Completed => {
                let result = update.result.ok_or_else(|| {
                    AppError::BackendError("Task finished without a result".to_string())
                })?;
                let mut result = FinalResult::from_task(result, submitted.job_id);
                if result.url_tree.is_none() {
                    result.url_tree = update.url_tree;
                }
                return Ok(result);
            }
            UpdateStatus::Error => return Err(backend_failure(update.message)),
        }
    }

    Err(AppError::StreamError("connection closed before the scrape completed".to_string()))
}
